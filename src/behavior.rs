//! Per-type propagation behavior for aggregate entity types.
//!
//! A few types aggregate child records (a section aggregates the controls
//! and objectives filed under it; an assessment aggregates findings for its
//! audit). Automapping ripples across such a type from child up to parent
//! only, never back down: an edge landing on an aggregate must not fan out
//! to the aggregate's children.

use crate::model::{EntityType, Stub};

impl EntityType {
    /// Types whose propagation is directed (child to parent only).
    pub fn is_aggregate(&self) -> bool {
        matches!(self, EntityType::Section | EntityType::Assessment)
    }

    /// Parent types an aggregate may propagate toward.
    pub fn aggregate_parents(&self) -> &'static [EntityType] {
        match self {
            EntityType::Section => &[EntityType::Regulation, EntityType::Standard],
            EntityType::Assessment => &[EntityType::Audit],
            _ => &[],
        }
    }
}

/// Veto predicate consulted when expanding through an aggregate vertex.
///
/// `via` is the vertex being traversed, `candidate` the neighbor about to be
/// connected back to `src`. Returns true to block the hop.
pub fn veto_propagation(_src: &Stub, via: &Stub, candidate: &Stub) -> bool {
    if !via.entity_type.is_aggregate() {
        return false;
    }
    !via.entity_type
        .aggregate_parents()
        .contains(&candidate.entity_type)
}
