//! Persists an accepted edge set: one automapping audit row, a batch of
//! INSERT OR IGNORE relationship rows, parent-context denormalization, and
//! revision-log entries for everything actually inserted.
//!
//! Concurrent overlapping runs are handled entirely here: the uniqueness
//! constraint on the unordered pair columns silently absorbs duplicates, and
//! absorbed rows contribute no id, no revision, and no ACL work.

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::model::{Edge, EntityType, TriggerEdge};

/// Write the accepted edges and their audit record. Returns the ids of the
/// relationship rows actually created. Empty input writes nothing.
pub fn flush(
    conn: &Connection,
    trigger: &TriggerEdge,
    accepted: &[Edge],
    modified_by_id: Option<i64>,
) -> Result<Vec<i64>> {
    if accepted.is_empty() {
        return Ok(Vec::new());
    }

    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO automappings (relationship_id, source_type, source_id, \
         destination_type, destination_id, modified_by_id, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            trigger.id,
            trigger.source.entity_type.as_str(),
            trigger.source.id,
            trigger.destination.entity_type.as_str(),
            trigger.destination.id,
            modified_by_id,
            now,
        ],
    )?;
    let automapping_id = conn.last_insert_rowid();
    record_revision(
        conn,
        "Automapping",
        automapping_id,
        modified_by_id,
        &now,
        &serde_json::json!({
            "relationship_id": trigger.id,
            "source": trigger.source.to_string(),
            "destination": trigger.destination.to_string(),
        }),
    )?;

    let trigger_edge = trigger.edge();
    let mut new_ids = Vec::new();

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO relationships (source_type, source_id, \
         destination_type, destination_id, created_at, updated_at, \
         modified_by_id, automapping_id, parent_id, is_external) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
    )?;

    for edge in accepted {
        // The triggering edge is already persisted
        if *edge == trigger_edge {
            continue;
        }
        let (s, d) = (edge.source(), edge.destination());
        let changed = stmt.execute(params![
            s.entity_type.as_str(),
            s.id,
            d.entity_type.as_str(),
            d.id,
            now,
            now,
            modified_by_id,
            automapping_id,
            trigger.id,
        ])?;
        // changed == 0: a concurrent run committed this pair first
        if changed != 1 {
            continue;
        }
        let id = conn.last_insert_rowid();
        new_ids.push(id);

        if edge.type_pair() == (EntityType::Audit, EntityType::Issue) {
            denormalize_audit_context(conn, id, s.id, d.id)?;
        }

        record_revision(
            conn,
            "Relationship",
            id,
            modified_by_id,
            &now,
            &serde_json::json!({
                "source": s.to_string(),
                "destination": d.to_string(),
                "automapping_id": automapping_id,
                "parent_id": trigger.id,
            }),
        )?;
    }
    drop(stmt);

    log::info!(
        "Automapping {} flushed {} derived edge(s) for relationship {}",
        automapping_id,
        new_ids.len(),
        trigger.id
    );

    Ok(new_ids)
}

/// Copy the audit's grouping context onto the issue it was just mapped to,
/// both on the issue's object row and on the new relationship row.
fn denormalize_audit_context(
    conn: &Connection,
    relationship_id: i64,
    audit_id: i64,
    issue_id: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE objects SET context_id = \
         (SELECT context_id FROM objects WHERE object_type = 'Audit' AND object_id = ?1) \
         WHERE object_type = 'Issue' AND object_id = ?2",
        params![audit_id, issue_id],
    )?;
    conn.execute(
        "UPDATE relationships SET context_id = \
         (SELECT context_id FROM objects WHERE object_type = 'Audit' AND object_id = ?1) \
         WHERE id = ?2",
        params![audit_id, relationship_id],
    )?;
    Ok(())
}

/// Register a newly inserted row with the generic change log.
pub fn record_revision(
    conn: &Connection,
    resource_type: &str,
    resource_id: i64,
    modified_by_id: Option<i64>,
    created_at: &str,
    content: &serde_json::Value,
) -> Result<()> {
    conn.execute(
        "INSERT INTO revisions (resource_type, resource_id, action, content, \
         modified_by_id, created_at) VALUES (?1, ?2, 'created', ?3, ?4, ?5)",
        params![
            resource_type,
            resource_id,
            content.to_string(),
            modified_by_id,
            created_at,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;
    use crate::model::EntityType::*;
    use crate::model::{Automapping, Relationship, Stub};
    use std::path::Path;
    use tempfile::TempDir;

    fn setup_conn() -> (Connection, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("test.db")).unwrap();
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        migrate::run_migrations(&mut conn, &migrations_dir).unwrap();
        (conn, temp_dir)
    }

    fn insert_trigger(conn: &Connection, source: Stub, destination: Stub) -> TriggerEdge {
        conn.execute(
            "INSERT INTO relationships (source_type, source_id, destination_type, destination_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, datetime('now'), datetime('now'))",
            params![
                source.entity_type.as_str(),
                source.id,
                destination.entity_type.as_str(),
                destination.id
            ],
        )
        .unwrap();
        TriggerEdge {
            id: conn.last_insert_rowid(),
            source,
            destination,
        }
    }

    #[test]
    fn test_empty_flush_writes_nothing() {
        let (conn, _temp) = setup_conn();
        let trigger = insert_trigger(&conn, Stub::new(Control, 1), Stub::new(Program, 1));

        let ids = flush(&conn, &trigger, &[], None).unwrap();
        assert!(ids.is_empty());

        let automappings: i64 = conn
            .query_row("SELECT COUNT(*) FROM automappings", [], |r| r.get(0))
            .unwrap();
        assert_eq!(automappings, 0);
    }

    #[test]
    fn test_flush_writes_edges_audit_record_and_revisions() {
        let (conn, _temp) = setup_conn();
        let trigger = insert_trigger(&conn, Stub::new(Control, 1), Stub::new(Program, 1));
        let accepted = vec![Edge::new(Stub::new(Control, 1), Stub::new(Objective, 7))];

        let ids = flush(&conn, &trigger, &accepted, Some(99)).unwrap();
        assert_eq!(ids.len(), 1);

        let rel = Relationship::by_id(&conn, ids[0]).unwrap();
        assert_eq!(rel.parent_id, Some(trigger.id));
        assert_eq!(rel.modified_by_id, Some(99));
        assert!(!rel.is_external);

        let automapping = Automapping::by_id(&conn, rel.automapping_id.unwrap()).unwrap();
        assert_eq!(automapping.relationship_id, trigger.id);
        assert_eq!(automapping.source_type, "Control");
        assert_eq!(automapping.modified_by_id, Some(99));

        // One revision for the automapping, one per created relationship
        let revisions: i64 = conn
            .query_row("SELECT COUNT(*) FROM revisions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(revisions, 2);
    }

    #[test]
    fn test_flush_skips_trigger_and_absorbs_duplicates() {
        let (conn, _temp) = setup_conn();
        let control = Stub::new(Control, 1);
        let program = Stub::new(Program, 1);
        let objective = Stub::new(Objective, 7);
        let trigger = insert_trigger(&conn, control, program);

        // Simulate a concurrent run having already committed this pair
        conn.execute(
            "INSERT INTO relationships (source_type, source_id, destination_type, destination_id, created_at, updated_at) \
             VALUES ('Control', 1, 'Objective', 7, datetime('now'), datetime('now'))",
            [],
        )
        .unwrap();

        let accepted = vec![
            Edge::new(program, control), // coincides with the trigger
            Edge::new(control, objective),
        ];
        let ids = flush(&conn, &trigger, &accepted, None).unwrap();
        assert!(ids.is_empty());

        // Still exactly one row per unordered pair
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM relationships", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_audit_issue_denormalization() {
        let (conn, _temp) = setup_conn();
        conn.execute(
            "INSERT INTO objects (object_type, object_id, context_id) VALUES ('Audit', 5, 77)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO objects (object_type, object_id, context_id) VALUES ('Issue', 9, NULL)",
            [],
        )
        .unwrap();

        let assessment = Stub::new(Assessment, 2);
        let issue = Stub::new(Issue, 9);
        let audit = Stub::new(Audit, 5);
        let trigger = insert_trigger(&conn, assessment, issue);

        let ids = flush(&conn, &trigger, &[Edge::new(audit, issue)], None).unwrap();
        assert_eq!(ids.len(), 1);

        let issue_context: i64 = conn
            .query_row(
                "SELECT context_id FROM objects WHERE object_type = 'Issue' AND object_id = 9",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(issue_context, 77);

        let rel = Relationship::by_id(&conn, ids[0]).unwrap();
        assert_eq!(rel.context_id, Some(77));
    }
}
