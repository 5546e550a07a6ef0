use serde_json::Value;

fn field<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .and_then(Value::as_str)
}

/// Filter job role records by a free-text search term.
///
/// An empty term keeps everything. Otherwise a role matches when the
/// lowercased term occurs in its name, description or company email
/// (case-insensitive), or in its company phone.
pub fn filter_job_roles<'a>(roles: &'a [Value], term: &str) -> Vec<&'a Value> {
    if term.is_empty() {
        return roles.iter().collect();
    }
    let term = term.to_lowercase();
    let contains = |text: Option<&str>| {
        text.map(|t| t.to_lowercase().contains(&term)).unwrap_or(false)
    };

    roles
        .iter()
        .filter(|role| {
            contains(field(role, &["name"]))
                || contains(field(role, &["description"]))
                || contains(field(role, &["company", "email"]))
                || field(role, &["company", "phone"])
                    .map(|p| p.contains(&term))
                    .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roles() -> Vec<Value> {
        vec![
            json!({"name": "Warehouse Manager", "description": "Runs stock",
                   "company": {"email": "ops@acme.ma", "phone": "0612345678"}}),
            json!({"name": "Technician", "description": null,
                   "company": {"email": "tech@other.ma", "phone": "0700000000"}}),
            json!({"name": "Driver"}),
        ]
    }

    #[test]
    fn empty_term_keeps_all() {
        let roles = roles();
        assert_eq!(filter_job_roles(&roles, "").len(), 3);
    }

    #[test]
    fn matches_name_description_email_and_phone() {
        let roles = roles();
        let name = |v: &&Value| v["name"].as_str().unwrap_or_default().to_string();

        let hits: Vec<String> = filter_job_roles(&roles, "MANAGER").iter().map(name).collect();
        assert_eq!(hits, vec!["Warehouse Manager"]);

        let hits: Vec<String> = filter_job_roles(&roles, "stock").iter().map(name).collect();
        assert_eq!(hits, vec!["Warehouse Manager"]);

        let hits: Vec<String> = filter_job_roles(&roles, "other.ma").iter().map(name).collect();
        assert_eq!(hits, vec!["Technician"]);

        let hits: Vec<String> = filter_job_roles(&roles, "0700").iter().map(name).collect();
        assert_eq!(hits, vec!["Technician"]);

        assert!(filter_job_roles(&roles, "nobody").is_empty());
    }
}
