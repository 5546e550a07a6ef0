//! Generic resource CRUD commands.
//!
//! `opsdesk get products`, `opsdesk create shipment --attach bon.jpg`, etc.
//! Every command checks the signed-in user's capability for the action
//! before touching the backend.

use std::path::Path;

use anyhow::Result;
use opsdesk_client::{Action, Attachment, Console, Resource};
use opsdesk_core::filter_job_roles;
use serde_json::Value;

use super::print_value;

fn parse_resource(name: &str) -> Result<Resource> {
    name.parse::<Resource>().map_err(|e| anyhow::anyhow!(e))
}

fn parse_body(json_body: &str) -> Result<Value> {
    let body: Value =
        serde_json::from_str(json_body).map_err(|e| anyhow::anyhow!("Invalid JSON: {}", e))?;
    if !body.is_object() {
        anyhow::bail!("JSON body must be an object.");
    }
    Ok(body)
}

fn load_attachment(resource: Resource, path: Option<&Path>) -> Result<Option<Attachment>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let field = resource
        .attachment_field()
        .ok_or_else(|| anyhow::anyhow!("{} does not accept file attachments.", resource))?;
    Ok(Some(Attachment::from_path(field, path)?))
}

async fn require(console: &Console, resource: Resource, action: Action) -> Result<()> {
    console.require(&resource.permission(action)).await?;
    Ok(())
}

/// Rows of a list response, which is either a bare array or wrapped in
/// `{"data": [...]}`.
fn rows(list: &Value) -> &[Value] {
    match list {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

/// GET a resource (list or get by ID).
pub async fn get(
    console: &Console,
    resource: &str,
    id: Option<&str>,
    search: Option<&str>,
    output_json: bool,
) -> Result<()> {
    let resource = parse_resource(resource)?;
    require(console, resource, Action::View).await?;

    if let Some(id) = id {
        let item = console.get(resource, id).await?;
        return print_value(&item, output_json);
    }

    let list = console.list(resource).await?;
    match search {
        Some(term) if resource == Resource::Jobs => {
            let matched: Vec<Value> = filter_job_roles(rows(&list), term)
                .into_iter()
                .cloned()
                .collect();
            print_value(&Value::Array(matched), output_json)
        }
        Some(_) => anyhow::bail!("--search is only supported for jobs."),
        None => print_value(&list, output_json),
    }
}

/// CREATE a resource.
pub async fn create(
    console: &Console,
    resource: &str,
    json_body: &str,
    attach: Option<&Path>,
    output_json: bool,
) -> Result<()> {
    let resource = parse_resource(resource)?;
    let body = parse_body(json_body)?;
    let attachment = load_attachment(resource, attach)?;
    require(console, resource, Action::Add).await?;

    let result = console.create(resource, &body, attachment).await?;
    println!("{} created.", resource);
    print_value(&result, output_json)
}

/// UPDATE a resource.
pub async fn update(
    console: &Console,
    resource: &str,
    id: &str,
    json_body: &str,
    attach: Option<&Path>,
    output_json: bool,
) -> Result<()> {
    let resource = parse_resource(resource)?;
    let body = parse_body(json_body)?;
    let attachment = load_attachment(resource, attach)?;
    require(console, resource, Action::Edit).await?;

    let result = console.update(resource, id, &body, attachment).await?;
    println!("{} {} updated.", resource, id);
    print_value(&result, output_json)
}

/// DELETE a resource.
pub async fn delete(console: &Console, resource: &str, id: &str) -> Result<()> {
    let resource = parse_resource(resource)?;
    require(console, resource, Action::Delete).await?;

    console.delete(resource, id).await?;
    println!("{} {} deleted.", resource, id);
    Ok(())
}
