//! Permission gate consulted per candidate edge.
//!
//! A denial is not an error: the candidate is silently pruned from
//! expansion. A small fixed set of unordered type pairs bypasses the gate
//! entirely because those mappings must succeed even when the acting user
//! lacks edit rights on one endpoint.

use crate::model::{EntityType, Stub};

/// Update-permission check on both endpoints of a candidate edge.
pub trait PermissionGate {
    fn can_link(&self, a: &Stub, b: &Stub) -> bool;
}

/// Permits every link. For embedders without a permission engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn can_link(&self, _a: &Stub, _b: &Stub) -> bool {
        true
    }
}

/// Unordered type pairs mapped without consulting the gate.
/// Issue-to-Audit mapping must succeed regardless of audit edit rights.
const PERMISSION_EXEMPT_PAIRS: &[(EntityType, EntityType)] =
    &[(EntityType::Audit, EntityType::Issue)];

/// True if the unordered type pair is on the allow-without-permission list.
pub fn exempt_pair(a: EntityType, b: EntityType) -> bool {
    PERMISSION_EXEMPT_PAIRS
        .iter()
        .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
}
