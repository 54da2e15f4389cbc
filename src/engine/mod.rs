//! Closure engine: context, run orchestration, and outcome types.
//!
//! One run per triggering edge. The run executes synchronously inside the
//! write transaction that committed the trigger; all collaborators arrive
//! through an explicit [`AutomapContext`], never ambient state.

pub mod cache;
pub mod closure;
pub mod flush;

use rusqlite::Connection;

use crate::acl::{AclPropagator, NoopAcl};
use crate::error::Result;
use crate::model::TriggerEdge;
use crate::permissions::{AllowAll, PermissionGate};
use crate::rules::RuleTable;

pub use closure::{ClosureEngine, Expansion};

/// Everything a closure run consults besides the graph itself.
pub struct AutomapContext {
    pub rules: RuleTable,
    pub gate: Box<dyn PermissionGate + Send + Sync>,
    pub acl: Box<dyn AclPropagator + Send + Sync>,
    /// Hard cap on edges accepted per run.
    pub count_limit: usize,
    /// Acting user recorded on every row this run creates.
    pub modified_by_id: Option<i64>,
}

impl AutomapContext {
    pub fn new(rules: RuleTable) -> Self {
        Self {
            rules,
            gate: Box::new(AllowAll),
            acl: Box::new(NoopAcl),
            count_limit: 10_000,
            modified_by_id: None,
        }
    }

    pub fn with_gate(mut self, gate: impl PermissionGate + Send + Sync + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }

    pub fn with_acl(mut self, acl: impl AclPropagator + Send + Sync + 'static) -> Self {
        self.acl = Box::new(acl);
        self
    }

    pub fn with_count_limit(mut self, count_limit: usize) -> Self {
        self.count_limit = count_limit;
        self
    }

    pub fn with_modified_by(mut self, user_id: i64) -> Self {
        self.modified_by_id = Some(user_id);
        self
    }
}

/// Terminal state of one closure run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Run finished within the limit and flushed (possibly zero edges).
    Flushed { new_edge_ids: Vec<i64> },
    /// Run exceeded the count limit; derived work was discarded. The
    /// triggering edge itself stays committed.
    Overflowed { attempted: usize },
}

/// Compute and persist the closure of one committed edge.
///
/// Must be called inside the transaction that committed `trigger`, before it
/// finalizes. A validation failure propagates as `Err` and is expected to
/// roll back that transaction, triggering edge included.
pub fn run_closure(
    conn: &Connection,
    ctx: &AutomapContext,
    trigger: TriggerEdge,
) -> Result<RunOutcome> {
    let engine = ClosureEngine::new(conn, ctx, trigger);
    match engine.expand()? {
        Expansion::Overflowed { attempted } => {
            log::error!(
                "Automapping overflow for relationship {}: {} accepted edges exceed limit {}; discarding run",
                trigger.id,
                attempted,
                ctx.count_limit
            );
            Ok(RunOutcome::Overflowed { attempted })
        }
        Expansion::Complete(accepted) => {
            let new_edge_ids = flush::flush(conn, &trigger, &accepted, ctx.modified_by_id)?;
            Ok(RunOutcome::Flushed { new_edge_ids })
        }
    }
}
