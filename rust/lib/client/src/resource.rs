//! Backend resources and their REST endpoints.
//!
//! The backend routes are not uniform: collections are plural while items
//! are usually singular, job tasks use verb-style paths, and the supplier
//! routes are spelled `suplier`. All of that is pinned down here so the
//! rest of the client deals in [`Resource`] values only.

use std::fmt;
use std::str::FromStr;

use crate::cache::QueryKey;

/// CRUD action, as used in permission codes (`<resource>_<action>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    View,
    Add,
    Edit,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Add => "add",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Categories,
    Employees,
    Jobs,
    JobTasks,
    Locations,
    MissionRepairs,
    Products,
    Shipments,
    StockMovements,
    Suppliers,
    TechnicalMissions,
}

impl Resource {
    pub const ALL: [Resource; 11] = [
        Resource::Categories,
        Resource::Employees,
        Resource::Jobs,
        Resource::JobTasks,
        Resource::Locations,
        Resource::MissionRepairs,
        Resource::Products,
        Resource::Shipments,
        Resource::StockMovements,
        Resource::Suppliers,
        Resource::TechnicalMissions,
    ];

    /// Canonical CLI name.
    pub fn name(&self) -> &'static str {
        match self {
            Resource::Categories => "categories",
            Resource::Employees => "employees",
            Resource::Jobs => "jobs",
            Resource::JobTasks => "job-tasks",
            Resource::Locations => "locations",
            Resource::MissionRepairs => "mission-repairs",
            Resource::Products => "products",
            Resource::Shipments => "shipments",
            Resource::StockMovements => "stock-movements",
            Resource::Suppliers => "suppliers",
            Resource::TechnicalMissions => "technical-missions",
        }
    }

    /// Resource part of the permission codes guarding this resource.
    pub fn permission_resource(&self) -> &'static str {
        match self {
            Resource::Categories => "category",
            Resource::Employees => "employee",
            Resource::Jobs => "job",
            Resource::JobTasks => "job_task",
            Resource::Locations => "location",
            Resource::MissionRepairs => "mission_repair",
            Resource::Products => "product",
            Resource::Shipments => "shipment",
            Resource::StockMovements => "stock_movement",
            Resource::Suppliers => "supplier",
            Resource::TechnicalMissions => "technical_mission",
        }
    }

    /// Permission code for `action` on this resource, e.g. `product_add`.
    pub fn permission(&self, action: Action) -> String {
        format!("{}_{}", self.permission_resource(), action.as_str())
    }

    /// Root of this resource's cache keys; mutations invalidate everything
    /// under it.
    pub fn cache_key(&self) -> QueryKey {
        let root = match self {
            Resource::Categories => "categories",
            Resource::Employees => "employees",
            Resource::Jobs => "jobs",
            Resource::JobTasks => "jobsTask",
            Resource::Locations => "locations",
            Resource::MissionRepairs => "missionRepairs",
            Resource::Products => "products",
            Resource::Shipments => "shipments",
            Resource::StockMovements => "stockMovements",
            Resource::Suppliers => "suppliers",
            Resource::TechnicalMissions => "technicalMissions",
        };
        QueryKey::new([root])
    }

    /// Other resources whose cached lists go stale when an item of this one
    /// is deleted. Deleting a shipment deletes the products it brought in.
    pub fn delete_cascades(&self) -> &'static [Resource] {
        match self {
            Resource::Shipments => &[Resource::Products],
            _ => &[],
        }
    }

    /// Form field carrying the file for resources that accept one.
    pub fn attachment_field(&self) -> Option<&'static str> {
        match self {
            Resource::Products => Some("image"),
            Resource::Shipments => Some("bon_image"),
            _ => None,
        }
    }

    /// Creates and updates are sent as multipart forms.
    pub fn is_multipart(&self) -> bool {
        self.attachment_field().is_some()
    }

    pub fn list_path(&self) -> &'static str {
        match self {
            Resource::Categories => "/categories",
            Resource::Employees => "/employees",
            Resource::Jobs => "/jobs",
            Resource::JobTasks => "/jobTasks",
            Resource::Locations => "/locations",
            Resource::MissionRepairs => "/mission-repairs",
            Resource::Products => "/products",
            Resource::Shipments => "/shipments",
            Resource::StockMovements => "/stock-movements",
            Resource::Suppliers => "/supliers",
            Resource::TechnicalMissions => "/technical-missions",
        }
    }

    pub fn create_path(&self) -> &'static str {
        match self {
            Resource::Categories => "/category",
            Resource::Employees => "/employee",
            Resource::Jobs => "/jobs",
            Resource::JobTasks => "/addJobTasks",
            Resource::Locations => "/location",
            Resource::MissionRepairs => "/mission-repair",
            Resource::Products => "/product",
            Resource::Shipments => "/shipment",
            Resource::StockMovements => "/stock-movements",
            Resource::Suppliers => "/suplier",
            Resource::TechnicalMissions => "/technical-mission",
        }
    }

    /// Path for single-item calls. Job tasks have one prefix per verb.
    pub fn item_path(&self, action: Action, id: &str) -> String {
        let prefix = match (self, action) {
            (Resource::JobTasks, Action::Edit) => "/updateJobTasks",
            (Resource::JobTasks, Action::Delete) => "/deleteJobTasks",
            (Resource::JobTasks, _) => "/jobTasks",
            (Resource::Jobs, _) => "/jobs",
            (Resource::StockMovements, _) => "/stock-movements",
            _ => self.create_path(),
        };
        format!("{}/{}", prefix, id)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = String;

    /// Accepts the canonical name plus singular and snake_case spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace('_', "-");
        let resource = match normalized.as_str() {
            "category" | "categories" => Resource::Categories,
            "employee" | "employees" => Resource::Employees,
            "job" | "jobs" | "job-role" | "job-roles" => Resource::Jobs,
            "job-task" | "job-tasks" | "jobtask" | "jobtasks" => Resource::JobTasks,
            "location" | "locations" => Resource::Locations,
            "mission-repair" | "mission-repairs" => Resource::MissionRepairs,
            "product" | "products" => Resource::Products,
            "shipment" | "shipments" => Resource::Shipments,
            "stock-movement" | "stock-movements" | "stock" => Resource::StockMovements,
            "supplier" | "suppliers" => Resource::Suppliers,
            "technical-mission" | "technical-missions" => Resource::TechnicalMissions,
            _ => return Err(format!("unknown resource type: {}", s)),
        };
        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irregular_paths() {
        assert_eq!(Resource::Suppliers.list_path(), "/supliers");
        assert_eq!(Resource::Suppliers.item_path(Action::Edit, "4"), "/suplier/4");
        assert_eq!(Resource::JobTasks.create_path(), "/addJobTasks");
        assert_eq!(Resource::JobTasks.item_path(Action::Edit, "9"), "/updateJobTasks/9");
        assert_eq!(Resource::JobTasks.item_path(Action::Delete, "9"), "/deleteJobTasks/9");
        assert_eq!(Resource::Products.item_path(Action::View, "1"), "/product/1");
        assert_eq!(Resource::StockMovements.item_path(Action::View, "2"), "/stock-movements/2");
        assert_eq!(Resource::Jobs.item_path(Action::Delete, "3"), "/jobs/3");
    }

    #[test]
    fn names_roundtrip_through_from_str() {
        for r in Resource::ALL {
            assert_eq!(r.name().parse::<Resource>().unwrap(), r);
        }
        assert_eq!("stock_movement".parse::<Resource>().unwrap(), Resource::StockMovements);
        assert_eq!("Product".parse::<Resource>().unwrap(), Resource::Products);
        assert!("widgets".parse::<Resource>().is_err());
    }

    #[test]
    fn permission_codes() {
        assert_eq!(Resource::Products.permission(Action::Add), "product_add");
        assert_eq!(Resource::JobTasks.permission(Action::View), "job_task_view");
        assert_eq!(Resource::MissionRepairs.permission(Action::Delete), "mission_repair_delete");
    }

    #[test]
    fn multipart_resources() {
        assert_eq!(Resource::Products.attachment_field(), Some("image"));
        assert_eq!(Resource::Shipments.attachment_field(), Some("bon_image"));
        assert!(!Resource::Employees.is_multipart());
        assert_eq!(Resource::Shipments.delete_cascades(), &[Resource::Products]);
    }
}
