pub mod acl;
pub mod behavior;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod hook;
pub mod model;
pub mod permissions;
pub mod rules;

pub use acl::{AclPropagator, NoopAcl};
pub use config::Config;
pub use engine::{run_closure, AutomapContext, RunOutcome};
pub use error::{AutomapError, Result};
pub use hook::{create_relationship, CreatedRelationship};
pub use model::{Edge, EntityType, Stub, TriggerEdge};
pub use permissions::{AllowAll, PermissionGate};
pub use rules::RuleTable;
