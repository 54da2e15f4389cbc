//! Bounded BFS closure over candidate edges.
//!
//! Seeded from a freshly committed relationship, the engine ripples outward
//! one hop at a time: each accepted edge is re-seeded in both directions
//! until the frontier empties, an already-connected vertex cuts the branch,
//! the count limit trips, or the single-audit invariant aborts the run.

use std::collections::{HashSet, VecDeque};

use rusqlite::Connection;

use crate::behavior::veto_propagation;
use crate::engine::cache::AdjacencyCache;
use crate::engine::AutomapContext;
use crate::error::{AutomapError, Result};
use crate::model::{Edge, EntityType, Stub, TriggerEdge};
use crate::permissions::exempt_pair;

/// Terminal expansion states. Validation failures take the error path
/// instead and roll back the enclosing transaction.
#[derive(Debug)]
pub enum Expansion {
    /// Accepted edges in acceptance order, ready to flush. May be empty.
    Complete(Vec<Edge>),
    /// Count limit exceeded; the accumulated work was discarded.
    Overflowed { attempted: usize },
}

pub struct ClosureEngine<'a> {
    conn: &'a Connection,
    ctx: &'a AutomapContext,
    trigger: TriggerEdge,
    cache: AdjacencyCache,
    queue: VecDeque<Edge>,
    queued: HashSet<Edge>,
    processed: HashSet<Edge>,
    accepted: Vec<Edge>,
}

impl<'a> ClosureEngine<'a> {
    pub fn new(conn: &'a Connection, ctx: &'a AutomapContext, trigger: TriggerEdge) -> Self {
        Self {
            conn,
            ctx,
            trigger,
            cache: AdjacencyCache::new(),
            queue: VecDeque::new(),
            queued: HashSet::new(),
            processed: HashSet::new(),
            accepted: Vec::new(),
        }
    }

    /// Run the expansion to one of its terminal states.
    pub fn expand(mut self) -> Result<Expansion> {
        self.step(self.trigger.source, self.trigger.destination)?;
        self.step(self.trigger.destination, self.trigger.source)?;

        while let Some(edge) = self.queue.pop_front() {
            self.queued.remove(&edge);

            if self.accepted.len() > self.ctx.count_limit {
                return Ok(Expansion::Overflowed {
                    attempted: self.accepted.len(),
                });
            }
            if self.processed.contains(&edge) {
                continue;
            }

            let (u, v) = (edge.source(), edge.destination());
            let permitted = exempt_pair(u.entity_type, v.entity_type)
                || self.ctx.gate.can_link(&u, &v);
            if !permitted {
                log::debug!("Automapping skipped {} (permission denied)", edge);
                self.processed.insert(edge);
                continue;
            }

            let created = self.ensure_relationship(edge)?;
            self.processed.insert(edge);
            if created {
                self.step(u, v)?;
                self.step(v, u)?;
            }
        }

        // The breach may land on the last queue item, after the loop's own
        // check; recheck before handing the set over for flushing
        if self.accepted.len() > self.ctx.count_limit {
            return Ok(Expansion::Overflowed {
                attempted: self.accepted.len(),
            });
        }

        Ok(Expansion::Complete(self.accepted))
    }

    /// Accept `edge` unless its endpoints are already adjacent. An existing
    /// edge cuts the branch: its own closure is assumed complete.
    fn ensure_relationship(&mut self, edge: Edge) -> Result<bool> {
        let (u, v) = (edge.source(), edge.destination());
        self.ensure_cached(&[u, v])?;

        if self.cache.are_adjacent(&u, &v) {
            return Ok(false);
        }

        self.check_single_audit(&u, &v)?;

        log::debug!("Automapping accepted {}", edge);
        self.accepted.push(edge);
        self.cache.add_edge(u, v);
        Ok(true)
    }

    /// One expansion hop: connect `v`'s rule-eligible neighbors back to `u`.
    fn step(&mut self, u: Stub, v: Stub) -> Result<()> {
        let allowed: HashSet<EntityType> =
            match self.ctx.rules.lookup(u.entity_type, v.entity_type) {
                Some(types) => types.clone(),
                None => return Ok(()),
            };

        self.ensure_cached(&[v])?;
        let neighbors: Vec<Stub> = self
            .cache
            .get(&v)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();

        for w in neighbors {
            if w == u || !allowed.contains(&w.entity_type) {
                continue;
            }
            if v.entity_type.is_aggregate() && veto_propagation(&u, &v, &w) {
                continue;
            }
            let candidate = Edge::new(w, u);
            if !self.processed.contains(&candidate) && !self.queued.contains(&candidate) {
                self.queued.insert(candidate);
                self.queue.push_back(candidate);
            }
        }

        Ok(())
    }

    /// Bulk-load neighbor sets for `targets` plus the entire pending
    /// frontier, so one round trip covers every stub about to be inspected.
    fn ensure_cached(&mut self, targets: &[Stub]) -> Result<()> {
        let mut wanted: Vec<Stub> = targets
            .iter()
            .copied()
            .filter(|s| !self.cache.is_loaded(s))
            .collect();
        if wanted.is_empty() {
            return Ok(());
        }
        for edge in &self.queue {
            for stub in [edge.source(), edge.destination()] {
                if !self.cache.is_loaded(&stub) {
                    wanted.push(stub);
                }
            }
        }
        self.cache.bulk_load(self.conn, &wanted, None)
    }

    /// An issue maps to at most one audit. Deriving an edge between an
    /// issue and a second audit aborts the entire run.
    fn check_single_audit(&self, u: &Stub, v: &Stub) -> Result<()> {
        let (audit, issue) = match (u.entity_type, v.entity_type) {
            (EntityType::Audit, EntityType::Issue) => (u, v),
            (EntityType::Issue, EntityType::Audit) => (v, u),
            _ => return Ok(()),
        };

        if let Some(neighbors) = self.cache.get(issue) {
            if neighbors
                .iter()
                .any(|n| n.entity_type == EntityType::Audit && n.id != audit.id)
            {
                return Err(AutomapError::Validation(format!(
                    "{} is already mapped to a different audit; refusing to map it to {}",
                    issue, audit
                )));
            }
        }
        Ok(())
    }
}
