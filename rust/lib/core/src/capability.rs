use std::collections::HashSet;

use crate::model::UserProfile;

/// The set of permission codes granted to the signed-in user.
///
/// Built from the cached `["me"]` profile; UI surfaces and CLI commands
/// ask it `has(code)` and hide or refuse the action when it says no.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    codes: HashSet<String>,
}

impl Capabilities {
    /// No profile means nothing is granted.
    pub fn from_profile(profile: Option<&UserProfile>) -> Self {
        let codes = profile
            .map(|p| p.tasks.iter().map(|t| t.code.clone()).collect())
            .unwrap_or_default();
        Self { codes }
    }

    pub fn has(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    pub fn has_any(&self, codes: &[&str]) -> bool {
        codes.iter().any(|c| self.has(c))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Granted codes, sorted for stable display.
    pub fn sorted(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.codes.iter().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(codes: &[&str]) -> UserProfile {
        let tasks: Vec<serde_json::Value> = codes
            .iter()
            .map(|c| serde_json::json!({ "code": c }))
            .collect();
        serde_json::from_value(serde_json::json!({ "id": 1, "tasks": tasks })).unwrap()
    }

    #[test]
    fn grants_exactly_the_profile_tasks() {
        let p = profile(&["employee_view", "product_add"]);
        let caps = Capabilities::from_profile(Some(&p));
        assert!(caps.has("employee_view"));
        assert!(caps.has("product_add"));
        assert!(!caps.has("employee_edit"));
        assert!(caps.has_any(&["shipment_view", "product_add"]));
        assert_eq!(caps.sorted(), vec!["employee_view", "product_add"]);
    }

    #[test]
    fn no_profile_grants_nothing() {
        let caps = Capabilities::from_profile(None);
        assert!(caps.is_empty());
        assert!(!caps.has("employee_view"));
    }
}
