//! Permission partitioning.
//!
//! The backend hands out a flat list of permission codes such as
//! `employee_view`, `employee_edit`, `job_task_delete`. Editors that assign
//! permissions render them grouped per resource ("manage employee",
//! "manage job task", ...). [`partition`] infers the resource from each
//! code and builds those groups.
//!
//! Inference rule, per code split on `_`:
//!
//! ```text
//! employee_view          -> employee        (known action suffix stripped)
//! mission_repair_delete  -> mission_repair
//! stock_report           -> stock           (unknown suffix: first token)
//! admin                  -> admin           (single token: first token)
//! ""                     -> others
//! ```
//!
//! A single-token code therefore forms its own one-member group rather than
//! landing in `others`. Only records with an empty or missing name end up
//! there.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::model::Permission;

/// Action suffixes recognized as the `<action>` part of `<resource>_<action>`.
pub const ACTION_SUFFIXES: [&str; 4] = ["view", "add", "edit", "delete"];

/// A UI-only grouping of permissions sharing an inferred resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionGroup {
    /// `manage_<resource>`; unique within one [`Partition`].
    pub key: String,
    /// i18n lookup key for the group heading.
    pub label_key: String,
    pub resource: String,
    /// Members in the order they appeared in the input.
    pub children: Vec<Permission>,
}

/// Result of [`partition`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Partition {
    /// Sorted ascending by `resource` using [`locale_cmp`].
    pub groups: Vec<PermissionGroup>,
    /// Permissions no resource could be inferred for, in input order.
    pub others: Vec<Permission>,
}

impl Partition {
    pub fn group(&self, resource: &str) -> Option<&PermissionGroup> {
        self.groups.iter().find(|g| g.resource == resource)
    }
}

/// Infer the resource a permission code belongs to.
///
/// Returns an empty string when nothing can be inferred.
pub fn infer_resource(name: &str) -> &str {
    let (head, last) = match name.rfind('_') {
        Some(idx) => (&name[..idx], &name[idx + 1..]),
        None => ("", name),
    };
    if ACTION_SUFFIXES.contains(&last) {
        head
    } else {
        name.split('_').next().unwrap_or_default()
    }
}

/// Group permissions by inferred resource. Pure; the input is not touched.
///
/// Records without a `name` are routed to `others` so that every input
/// record appears exactly once in the result.
pub fn partition(permissions: &[Permission]) -> Partition {
    let mut order: Vec<&str> = Vec::new();
    let mut by_resource: HashMap<&str, Vec<Permission>> = HashMap::new();
    let mut others = Vec::new();

    for perm in permissions {
        let resource = match perm.name.as_deref() {
            Some(name) => infer_resource(name),
            None => {
                debug!("permission {} has no name, placing in others", perm.id);
                ""
            }
        };

        if resource.is_empty() {
            others.push(perm.clone());
            continue;
        }

        by_resource
            .entry(resource)
            .or_insert_with(|| {
                order.push(resource);
                Vec::new()
            })
            .push(perm.clone());
    }

    let mut groups: Vec<PermissionGroup> = order
        .into_iter()
        .map(|resource| PermissionGroup {
            key: format!("manage_{}", resource),
            label_key: format!("permissions.manage_{}", resource),
            resource: resource.to_string(),
            children: by_resource.remove(resource).unwrap_or_default(),
        })
        .collect();
    groups.sort_by(|a, b| locale_cmp(&a.resource, &b.resource));

    Partition { groups, others }
}

/// Collation class: punctuation and whitespace, then digits, then letters.
fn char_class(c: char) -> u8 {
    if c.is_alphabetic() {
        2
    } else if c.is_numeric() {
        1
    } else {
        0
    }
}

fn primary_key(c: char) -> (u8, char) {
    (char_class(c), c.to_lowercase().next().unwrap_or(c))
}

/// Locale-style string comparison.
///
/// Approximates the CLDR root collation: comparison is
/// case-insensitive first (with punctuation before digits before letters),
/// lowercase sorts before uppercase on a tie, and code point order decides
/// anything left.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(primary_key)
        .cmp(b.chars().map(primary_key))
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}
