//! Commit-time entry point.
//!
//! The storage layer's contract is: when a new relationship edge commits,
//! synchronously run the closure engine inside the same write transaction,
//! before it finalizes. [`create_relationship`] realizes that contract for
//! embedders: it inserts the edge, runs the closure, commits, and hands the
//! new edge ids to the ACL propagator. A validation failure from the run
//! rolls the whole transaction back, triggering edge included.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::params;

use crate::db::Db;
use crate::engine::flush::record_revision;
use crate::engine::{self, AutomapContext, RunOutcome};
use crate::error::{AutomapError, Result};
use crate::model::{Edge, Stub, TriggerEdge};

/// Result of committing one relationship.
#[derive(Debug)]
pub struct CreatedRelationship {
    /// Row id of the relationship between the two stubs.
    pub id: i64,
    /// False when the pair was already mapped; no closure runs in that case.
    pub created: bool,
    pub outcome: RunOutcome,
}

/// Create a relationship edge and compute its automapping closure in one
/// write transaction.
pub async fn create_relationship(
    db: &Db,
    ctx: Arc<AutomapContext>,
    a: Stub,
    b: Stub,
) -> Result<CreatedRelationship> {
    if a == b {
        return Err(AutomapError::InvalidInput(format!(
            "Cannot relate {} to itself",
            a
        )));
    }

    let run_ctx = Arc::clone(&ctx);
    let result = db
        .with_connection(move |conn| {
            let tx = conn.transaction()?;
            let edge = Edge::new(a, b);
            let (s, d) = (edge.source(), edge.destination());
            let now = Utc::now().to_rfc3339();

            let changed = tx.execute(
                "INSERT OR IGNORE INTO relationships (source_type, source_id, \
                 destination_type, destination_id, created_at, updated_at, \
                 modified_by_id, is_external) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
                params![
                    s.entity_type.as_str(),
                    s.id,
                    d.entity_type.as_str(),
                    d.id,
                    now,
                    now,
                    run_ctx.modified_by_id,
                ],
            )?;

            if changed == 0 {
                // Pair already mapped; its closure was computed when it was
                let id: i64 = tx.query_row(
                    "SELECT id FROM relationships WHERE source_type = ?1 AND source_id = ?2 \
                     AND destination_type = ?3 AND destination_id = ?4",
                    params![s.entity_type.as_str(), s.id, d.entity_type.as_str(), d.id],
                    |r| r.get(0),
                )?;
                tx.commit()?;
                return Ok(CreatedRelationship {
                    id,
                    created: false,
                    outcome: RunOutcome::Flushed {
                        new_edge_ids: Vec::new(),
                    },
                });
            }

            let id = tx.last_insert_rowid();
            record_revision(
                &tx,
                "Relationship",
                id,
                run_ctx.modified_by_id,
                &now,
                &serde_json::json!({
                    "source": s.to_string(),
                    "destination": d.to_string(),
                }),
            )?;

            let trigger = TriggerEdge {
                id,
                source: s,
                destination: d,
            };
            let outcome = engine::run_closure(&tx, &run_ctx, trigger)?;
            tx.commit()?;

            Ok(CreatedRelationship {
                id,
                created: true,
                outcome,
            })
        })
        .await?;

    if let RunOutcome::Flushed { new_edge_ids } = &result.outcome {
        if !new_edge_ids.is_empty() {
            log::debug!(
                "Propagating ACLs for {} automapped edge(s)",
                new_edge_ids.len()
            );
            ctx.acl.propagate(new_edge_ids)?;
        }
    }

    Ok(result)
}
