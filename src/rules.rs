//! Declarative propagation rule table.
//!
//! `lookup(a, b)` answers: when propagating from an `a`–`b` edge, which
//! entity types sitting on the far side of `b` may be connected back to `a`.
//! An empty answer means no propagation along that edge direction. The
//! closure engine queries both directions of every edge independently.

use std::collections::{HashMap, HashSet};

use crate::model::EntityType;

#[derive(Debug, Default, Clone)]
pub struct RuleTable {
    rules: HashMap<(EntityType, EntityType), HashSet<EntityType>>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule for both orientations of the evaluated edge:
    /// `lookup(a, b)` and `lookup(b, a)` will both yield `targets`.
    pub fn rule(&mut self, a: EntityType, b: EntityType, targets: &[EntityType]) -> &mut Self {
        self.rule_directed(a, b, targets);
        self.rule_directed(b, a, targets);
        self
    }

    /// Register a rule for a single orientation only.
    pub fn rule_directed(
        &mut self,
        a: EntityType,
        b: EntityType,
        targets: &[EntityType],
    ) -> &mut Self {
        self.rules
            .entry((a, b))
            .or_default()
            .extend(targets.iter().copied());
        self
    }

    /// Eligible far-side types for a `(a, b)` edge, if any.
    pub fn lookup(&self, a: EntityType, b: EntityType) -> Option<&HashSet<EntityType>> {
        self.rules.get(&(a, b)).filter(|s| !s.is_empty())
    }

    /// Standard GRC rule set: program scope propagates across controls,
    /// objectives and directives; an issue raised on an assessment ripples
    /// up to the assessment's audit (never the reverse, per the aggregate
    /// propagation direction).
    pub fn grc_defaults() -> Self {
        use EntityType::*;
        let mut table = Self::new();
        table
            .rule(Program, Control, &[Objective])
            .rule(Program, Objective, &[Control])
            .rule(Program, Regulation, &[Section])
            .rule(Program, Standard, &[Section])
            .rule(Section, Objective, &[Control])
            .rule_directed(Issue, Assessment, &[Audit]);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EntityType::*;

    #[test]
    fn test_rule_registers_both_orientations() {
        let mut table = RuleTable::new();
        table.rule(Program, Control, &[Objective]);

        assert!(table.lookup(Program, Control).unwrap().contains(&Objective));
        assert!(table.lookup(Control, Program).unwrap().contains(&Objective));
    }

    #[test]
    fn test_rule_directed_is_one_way() {
        let mut table = RuleTable::new();
        table.rule_directed(Issue, Assessment, &[Audit]);

        assert!(table.lookup(Issue, Assessment).unwrap().contains(&Audit));
        assert!(table.lookup(Assessment, Issue).is_none());
    }

    #[test]
    fn test_empty_lookup_is_none() {
        let table = RuleTable::new();
        assert!(table.lookup(Program, Control).is_none());
    }

    #[test]
    fn test_grc_defaults_cover_program_scope() {
        let table = RuleTable::grc_defaults();
        assert!(table.lookup(Control, Program).unwrap().contains(&Objective));
        assert!(table.lookup(Issue, Assessment).unwrap().contains(&Audit));
    }
}
