//! Domain types and pure rules shared by the console client and CLI.
//!
//! Nothing in this crate performs I/O: the permission partitioner, the
//! capability set and the job role filter are all functions of data the
//! caller already holds.

pub mod capability;
pub mod filter;
pub mod model;
pub mod permissions;

pub use capability::Capabilities;
pub use filter::filter_job_roles;
pub use model::{Permission, RecordId, Task, UserProfile};
pub use permissions::{locale_cmp, partition, Partition, PermissionGroup, ACTION_SUFFIXES};
