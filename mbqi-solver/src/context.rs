//! Contract with the enclosing solver context.
//!
//! The quantifier engine never owns the clause database, the congruence
//! structure or the literal mapping. It reaches them through
//! [`QuantifierContext`]. [`RecordingContext`] is a self-contained
//! implementation that owns a candidate model and records the clauses it
//! receives, for embedders without a full search core and for tests.

use mbqi_core::ast::{TermId, TermKind, TermManager};
use mbqi_core::config::SolverConfig;
use mbqi_core::literal::Lit;
use mbqi_core::model::{Model, ValueClasses};
use rustc_hash::{FxHashMap, FxHashSet};

/// Services the MBQI engine needs from the solver it is embedded in.
pub trait QuantifierContext {
    /// Literals of the quantifiers asserted with universal force: a
    /// positive `forall` or a negated `exists`.
    fn universal_literals(&self) -> Vec<Lit>;

    /// Formula behind the variable of `lit`.
    fn literal_term(&self, lit: Lit) -> Option<TermId>;

    /// Whether `term` is relevant to the current search.
    fn is_relevant(&self, term: TermId) -> bool;

    /// Positive literal for `term`, registering it if needed.
    fn mk_literal(&mut self, term: TermId) -> Lit;

    /// Add a clause to the search core.
    fn add_clause(&mut self, clause: &[Lit]);

    /// Fill `model` with the candidate model of the current assignment.
    fn update_model(&mut self, tm: &mut TermManager, model: &mut Model);

    /// Ground terms grouped by model value.
    fn value_classes(&self) -> &ValueClasses;

    /// Solver configuration.
    fn config(&self) -> &SolverConfig;
}

/// Standalone context that owns its candidate model and records clauses.
#[derive(Debug, Clone, Default)]
pub struct RecordingContext {
    config: SolverConfig,
    model: Model,
    universal: Vec<Lit>,
    lit_terms: Vec<TermId>,
    term_lits: FxHashMap<TermId, Lit>,
    irrelevant: FxHashSet<TermId>,
    classes: ValueClasses,
    clauses: Vec<Vec<Lit>>,
}

impl RecordingContext {
    /// Create a context around a candidate model.
    pub fn new(config: SolverConfig, model: Model) -> Self {
        Self {
            config,
            model,
            ..Self::default()
        }
    }

    /// Assert a quantifier. `forall` is asserted positively and `exists`
    /// negatively, so both have universal force.
    pub fn assert_quantifier(&mut self, tm: &TermManager, q: TermId) -> Lit {
        let lit = self.mk_literal(q);
        let is_exists = matches!(
            tm.get(q).map(|t| &t.kind),
            Some(TermKind::Exists { .. })
        );
        let lit = if is_exists { !lit } else { lit };
        if !self.universal.contains(&lit) {
            self.universal.push(lit);
        }
        lit
    }

    /// Register a ground term in the class of its model value.
    pub fn add_ground_term(&mut self, tm: &mut TermManager, t: TermId) -> Option<TermId> {
        let value = self.model.eval_with(tm, t, true)?;
        self.classes.add(value, t);
        Some(value)
    }

    /// Mark a term relevant or irrelevant.
    pub fn set_relevant(&mut self, term: TermId, relevant: bool) {
        if relevant {
            self.irrelevant.remove(&term);
        } else {
            self.irrelevant.insert(term);
        }
    }

    /// Clauses received so far.
    pub fn clauses(&self) -> &[Vec<Lit>] {
        &self.clauses
    }

    /// Candidate model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Mutable candidate model.
    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }
}

impl QuantifierContext for RecordingContext {
    fn universal_literals(&self) -> Vec<Lit> {
        self.universal.clone()
    }

    fn literal_term(&self, lit: Lit) -> Option<TermId> {
        self.lit_terms.get(lit.var() as usize).copied()
    }

    fn is_relevant(&self, term: TermId) -> bool {
        !self.irrelevant.contains(&term)
    }

    fn mk_literal(&mut self, term: TermId) -> Lit {
        if let Some(&lit) = self.term_lits.get(&term) {
            return lit;
        }
        let lit = Lit::positive(self.lit_terms.len() as u32);
        self.lit_terms.push(term);
        self.term_lits.insert(term, lit);
        lit
    }

    fn add_clause(&mut self, clause: &[Lit]) {
        self.clauses.push(clause.to_vec());
    }

    fn update_model(&mut self, _tm: &mut TermManager, model: &mut Model) {
        *model = self.model.clone();
    }

    fn value_classes(&self) -> &ValueClasses {
        &self.classes
    }

    fn config(&self) -> &SolverConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_literals_are_stable() {
        let mut tm = TermManager::new();
        let b = tm.sorts.bool_sort;
        let p = tm.mk_const("p", b);
        let q = tm.mk_const("q", b);
        let mut ctx = RecordingContext::default();
        let lp = ctx.mk_literal(p);
        let lq = ctx.mk_literal(q);
        assert_ne!(lp, lq);
        assert_eq!(ctx.mk_literal(p), lp);
        assert_eq!(ctx.literal_term(!lq), Some(q));
    }

    #[test]
    fn test_exists_is_asserted_negatively() {
        let mut tm = TermManager::new();
        let u = tm.mk_uninterpreted_sort("U");
        let x = tm.mk_var("x", u);
        let a = tm.mk_const("a", u);
        let body = tm.mk_eq(x, a);
        let name = tm.intern("x");
        let ex = tm.mk_exists(smallvec![(name, u)], body);
        let mut ctx = RecordingContext::default();
        let lit = ctx.assert_quantifier(&tm, ex);
        assert!(lit.is_negative());
        assert_eq!(ctx.universal_literals(), vec![lit]);
        assert!(ctx.is_relevant(ex));
        ctx.set_relevant(ex, false);
        assert!(!ctx.is_relevant(ex));
    }

    #[test]
    fn test_ground_terms_are_grouped_by_value() {
        let mut tm = TermManager::new();
        let u = tm.mk_uninterpreted_sort("U");
        let a = tm.mk_const("a", u);
        let b = tm.mk_const("b", u);
        let u0 = tm.mk_value(u, 0);
        let mut model = Model::new();
        for t in [a, b] {
            let decl = tm.const_decl(t).expect("constant");
            model.register_decl(decl, u0);
        }
        let mut ctx = RecordingContext::new(SolverConfig::default(), model);
        assert_eq!(ctx.add_ground_term(&mut tm, a), Some(u0));
        assert_eq!(ctx.add_ground_term(&mut tm, b), Some(u0));
        assert_eq!(ctx.value_classes().class(u0), &[a, b]);
    }
}
