//! Access-control propagation contract.
//!
//! After a successful flush the engine hands the ids of the newly created
//! relationship rows to the ACL propagator, which derives cascading access
//! grants. Everything past that call is outside this crate.

use crate::error::Result;

pub trait AclPropagator {
    fn propagate(&self, new_edge_ids: &[i64]) -> Result<()>;
}

/// Does nothing. For embedders without an access-control layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAcl;

impl AclPropagator for NoopAcl {
    fn propagate(&self, _new_edge_ids: &[i64]) -> Result<()> {
        Ok(())
    }
}
