//! Run-scoped batched adjacency cache over the relationships table.
//!
//! BFS expansion would otherwise issue one neighbor query per vertex; the
//! engine instead bulk-loads the whole pending frontier in a single OR-chain
//! query per expansion round. The cache is private to one closure run and is
//! dropped with the engine, since the run's own writes invalidate it.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use rusqlite::Connection;

use crate::error::Result;
use crate::model::{EntityType, Stub};

#[derive(Debug, Default)]
pub struct AdjacencyCache {
    neighbors: HashMap<Stub, HashSet<Stub>>,
    loaded: HashSet<Stub>,
}

impl AdjacencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether neighbor data for this stub has been fetched.
    pub fn is_loaded(&self, stub: &Stub) -> bool {
        self.loaded.contains(stub)
    }

    /// Cached neighbor set. None if the stub was never bulk-loaded.
    /// Every loaded stub has an entry, possibly empty.
    pub fn get(&self, stub: &Stub) -> Option<&HashSet<Stub>> {
        if !self.loaded.contains(stub) {
            return None;
        }
        self.neighbors.get(stub)
    }

    /// Adjacency test in both directions. Both stubs should be loaded.
    pub fn are_adjacent(&self, a: &Stub, b: &Stub) -> bool {
        self.neighbors.get(a).is_some_and(|n| n.contains(b))
            || self.neighbors.get(b).is_some_and(|n| n.contains(a))
    }

    /// Optimistically record an edge accepted mid-run so later adjacency
    /// checks see it. Only touches entries that are already loaded.
    pub fn add_edge(&mut self, a: Stub, b: Stub) {
        if self.loaded.contains(&a) {
            self.neighbors.entry(a).or_default().insert(b);
        }
        if self.loaded.contains(&b) {
            self.neighbors.entry(b).or_default().insert(a);
        }
    }

    /// Populate neighbor sets for every stub in `stubs` with one query,
    /// optionally restricted to neighbors of `allowed_types`. Already-loaded
    /// stubs are skipped; results merge into the run-scoped map.
    pub fn bulk_load(
        &mut self,
        conn: &Connection,
        stubs: &[Stub],
        allowed_types: Option<&HashSet<EntityType>>,
    ) -> Result<()> {
        let pending: Vec<Stub> = stubs
            .iter()
            .copied()
            .filter(|s| !self.loaded.contains(s))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let endpoint_clause = pending
            .iter()
            .map(|_| "(source_type = ? AND source_id = ?) OR (destination_type = ? AND destination_id = ?)")
            .collect::<Vec<_>>()
            .join(" OR ");

        let mut query = format!(
            "SELECT source_type, source_id, destination_type, destination_id \
             FROM relationships WHERE ({})",
            endpoint_clause
        );

        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        for stub in &pending {
            params.push(Box::new(stub.entity_type.as_str()));
            params.push(Box::new(stub.id));
            params.push(Box::new(stub.entity_type.as_str()));
            params.push(Box::new(stub.id));
        }

        // Coarse row reducer only: a row survives if either endpoint type is
        // allowed. The real restriction is neighbor-side, applied in the
        // merge below, since a row can match through the requested stub's
        // own type while its far side is disallowed.
        if let Some(types) = allowed_types {
            let placeholders = types.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            query.push_str(&format!(
                " AND (source_type IN ({0}) OR destination_type IN ({0}))",
                placeholders
            ));
            // IN-list bound twice: once per endpoint column
            for _ in 0..2 {
                for t in types {
                    params.push(Box::new(t.as_str()));
                }
            }
        }

        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let requested: HashSet<Stub> = pending.iter().copied().collect();
        let mut edges = Vec::new();
        for row in rows {
            let (st, sid, dt, did) = row?;
            let s = Stub::new(EntityType::from_str(&st)?, sid);
            let d = Stub::new(EntityType::from_str(&dt)?, did);
            edges.push((s, d));
        }

        for stub in &pending {
            self.loaded.insert(*stub);
            self.neighbors.entry(*stub).or_default();
        }
        let permits = |t: EntityType| allowed_types.map_or(true, |a| a.contains(&t));
        for (s, d) in edges {
            if requested.contains(&s) && permits(d.entity_type) {
                self.neighbors.entry(s).or_default().insert(d);
            }
            if requested.contains(&d) && permits(s.entity_type) {
                self.neighbors.entry(d).or_default().insert(s);
            }
        }

        Ok(())
    }
}
