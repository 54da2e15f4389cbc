//! Core graph vocabulary: typed entity stubs, canonical edges, and the
//! persisted row shapes for relationships and automapping audit records.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::error::{AutomapError, Result};

/// Closed set of entity types participating in automapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Program,
    Control,
    Objective,
    Audit,
    Issue,
    Regulation,
    Standard,
    Section,
    Assessment,
}

impl EntityType {
    /// Stable name used in persisted columns and rule lookups.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Program => "Program",
            EntityType::Control => "Control",
            EntityType::Objective => "Objective",
            EntityType::Audit => "Audit",
            EntityType::Issue => "Issue",
            EntityType::Regulation => "Regulation",
            EntityType::Standard => "Standard",
            EntityType::Section => "Section",
            EntityType::Assessment => "Assessment",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = AutomapError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Program" => Ok(EntityType::Program),
            "Control" => Ok(EntityType::Control),
            "Objective" => Ok(EntityType::Objective),
            "Audit" => Ok(EntityType::Audit),
            "Issue" => Ok(EntityType::Issue),
            "Regulation" => Ok(EntityType::Regulation),
            "Standard" => Ok(EntityType::Standard),
            "Section" => Ok(EntityType::Section),
            "Assessment" => Ok(EntityType::Assessment),
            other => Err(AutomapError::InvalidInput(format!(
                "Unknown entity type: {}",
                other
            ))),
        }
    }
}

/// Lightweight `(type, id)` identity reference to an entity.
///
/// The graph vertex type. Ordered by type name, then id; this total order
/// canonicalizes edges so no unordered pair is ever stored twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stub {
    pub entity_type: EntityType,
    pub id: i64,
}

impl Stub {
    pub fn new(entity_type: EntityType, id: i64) -> Self {
        Self { entity_type, id }
    }
}

impl Ord for Stub {
    fn cmp(&self, other: &Self) -> Ordering {
        self.entity_type
            .as_str()
            .cmp(other.entity_type.as_str())
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Stub {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

/// Unordered stub pair stored in its canonical orientation
/// (`source <= destination` under the stub total order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    source: Stub,
    destination: Stub,
}

impl Edge {
    /// Canonicalize an unordered pair.
    pub fn new(a: Stub, b: Stub) -> Self {
        if a <= b {
            Self {
                source: a,
                destination: b,
            }
        } else {
            Self {
                source: b,
                destination: a,
            }
        }
    }

    pub fn source(&self) -> Stub {
        self.source
    }

    pub fn destination(&self) -> Stub {
        self.destination
    }

    /// Unordered type pair in canonical orientation.
    pub fn type_pair(&self) -> (EntityType, EntityType) {
        (self.source.entity_type, self.destination.entity_type)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.source, self.destination)
    }
}

/// The already-committed relationship row that seeds a closure run.
#[derive(Debug, Clone, Copy)]
pub struct TriggerEdge {
    pub id: i64,
    pub source: Stub,
    pub destination: Stub,
}

impl TriggerEdge {
    /// The trigger as a canonical edge, for comparison against candidates.
    pub fn edge(&self) -> Edge {
        Edge::new(self.source, self.destination)
    }
}

/// A persisted relationship row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub source_type: String,
    pub source_id: i64,
    pub destination_type: String,
    pub destination_id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub modified_by_id: Option<i64>,
    pub automapping_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub context_id: Option<i64>,
    pub status: Option<String>,
    pub is_external: bool,
}

impl Relationship {
    /// Load one persisted relationship row.
    pub fn by_id(conn: &Connection, id: i64) -> Result<Self> {
        conn.query_row(
            "SELECT id, source_type, source_id, destination_type, destination_id, \
             created_at, updated_at, modified_by_id, automapping_id, parent_id, \
             context_id, status, is_external FROM relationships WHERE id = ?1",
            params![id],
            |row| {
                Ok(Self {
                    id: row.get(0)?,
                    source_type: row.get(1)?,
                    source_id: row.get(2)?,
                    destination_type: row.get(3)?,
                    destination_id: row.get(4)?,
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                    modified_by_id: row.get(7)?,
                    automapping_id: row.get(8)?,
                    parent_id: row.get(9)?,
                    context_id: row.get(10)?,
                    status: row.get(11)?,
                    is_external: row.get::<_, i64>(12)? != 0,
                })
            },
        )
        .map_err(AutomapError::Database)
    }
}

/// One audit row per triggering edge, created at most once per closure run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Automapping {
    pub id: i64,
    pub relationship_id: i64,
    pub source_type: String,
    pub source_id: i64,
    pub destination_type: String,
    pub destination_id: i64,
    pub modified_by_id: Option<i64>,
    pub created_at: String,
}

impl Automapping {
    /// Load one automapping audit row.
    pub fn by_id(conn: &Connection, id: i64) -> Result<Self> {
        conn.query_row(
            "SELECT id, relationship_id, source_type, source_id, destination_type, \
             destination_id, modified_by_id, created_at FROM automappings WHERE id = ?1",
            params![id],
            |row| {
                Ok(Self {
                    id: row.get(0)?,
                    relationship_id: row.get(1)?,
                    source_type: row.get(2)?,
                    source_id: row.get(3)?,
                    destination_type: row.get(4)?,
                    destination_id: row.get(5)?,
                    modified_by_id: row.get(6)?,
                    created_at: row.get(7)?,
                })
            },
        )
        .map_err(AutomapError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_roundtrip() {
        for t in [
            EntityType::Program,
            EntityType::Control,
            EntityType::Objective,
            EntityType::Audit,
            EntityType::Issue,
            EntityType::Regulation,
            EntityType::Standard,
            EntityType::Section,
            EntityType::Assessment,
        ] {
            assert_eq!(EntityType::from_str(t.as_str()).unwrap(), t);
        }
        assert!(EntityType::from_str("Widget").is_err());
    }

    #[test]
    fn test_stub_order_by_type_name_then_id() {
        let audit = Stub::new(EntityType::Audit, 9);
        let control = Stub::new(EntityType::Control, 1);
        // "Audit" < "Control" lexicographically, regardless of id
        assert!(audit < control);

        let c1 = Stub::new(EntityType::Control, 1);
        let c2 = Stub::new(EntityType::Control, 2);
        assert!(c1 < c2);
    }

    #[test]
    fn test_edge_canonical_orientation() {
        let program = Stub::new(EntityType::Program, 5);
        let control = Stub::new(EntityType::Control, 3);

        let e1 = Edge::new(program, control);
        let e2 = Edge::new(control, program);
        assert_eq!(e1, e2);
        // "Control" < "Program"
        assert_eq!(e1.source(), control);
        assert_eq!(e1.destination(), program);
    }

    #[test]
    fn test_trigger_edge_canonicalizes() {
        let trigger = TriggerEdge {
            id: 1,
            source: Stub::new(EntityType::Program, 1),
            destination: Stub::new(EntityType::Control, 1),
        };
        assert_eq!(trigger.edge().source().entity_type, EntityType::Control);
    }
}
