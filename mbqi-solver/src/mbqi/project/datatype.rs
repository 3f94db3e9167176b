//! Datatype projection.
//!
//! Datatype constants are eliminated by solving equalities. The
//! substitution can leave accessors applied to constructor terms, which
//! are reduced afterwards: selectors return the field, testers fold to a
//! constant and equalities between constructor terms split into their
//! fields.

use super::{ProjectPlugin, solve_eq};
use mbqi_core::ast::{FuncId, FuncKind, SortFamily, TermId, TermKind, TermManager};
use mbqi_core::model::Model;
use mbqi_core::statistics::Statistics;
use rustc_hash::FxHashMap;
use std::fmt;

/// Statistics for datatype projection
#[derive(Debug, Clone, Default)]
pub struct DatatypeProjectStats {
    /// Constants solved from an equality
    pub num_solved: usize,
    /// Accessor applications reduced
    pub num_reductions: usize,
}

impl fmt::Display for DatatypeProjectStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Datatype Projection Statistics:")?;
        writeln!(f, "  Solved: {}", self.num_solved)?;
        writeln!(f, "  Reductions: {}", self.num_reductions)
    }
}

/// Projection plugin for datatype constants.
#[derive(Debug, Default)]
pub struct DatatypeProjector {
    stats: DatatypeProjectStats,
}

impl DatatypeProjector {
    /// Create a new datatype projector
    pub fn new() -> Self {
        Self::default()
    }

    /// Get statistics
    pub fn stats(&self) -> &DatatypeProjectStats {
        &self.stats
    }

    fn reduce(&mut self, tm: &mut TermManager, fmls: &mut Vec<TermId>) -> bool {
        let mut cache = FxHashMap::default();
        let before = self.stats.num_reductions;
        let mut out = Vec::with_capacity(fmls.len());
        for &f in fmls.iter() {
            let r = self.reduce_term(tm, f, &mut cache);
            let mut parts = Vec::new();
            tm.flatten_and(r, &mut parts);
            for p in parts {
                if !out.contains(&p) {
                    out.push(p);
                }
            }
        }
        *fmls = out;
        self.stats.num_reductions > before
    }

    fn reduce_term(
        &mut self,
        tm: &mut TermManager,
        t: TermId,
        cache: &mut FxHashMap<TermId, TermId>,
    ) -> TermId {
        if let Some(&r) = cache.get(&t) {
            return r;
        }
        let children = tm.children(t);
        let new: Vec<TermId> = children
            .iter()
            .map(|&c| self.reduce_term(tm, c, cache))
            .collect();
        let rebuilt = if new.as_slice() == children.as_slice() {
            t
        } else {
            tm.with_children(t, &new)
        };
        let result = match self.reduce_top(tm, rebuilt) {
            Some(r) => {
                self.stats.num_reductions += 1;
                r
            }
            None => rebuilt,
        };
        cache.insert(t, result);
        result
    }

    /// One reduction step at the root of `t`.
    fn reduce_top(&mut self, tm: &mut TermManager, t: TermId) -> Option<TermId> {
        match tm.get(t).map(|t| t.kind.clone())? {
            TermKind::Apply { func, args } => {
                let kind = tm.func(func)?.kind;
                let &arg = args.first()?;
                let (ctor, fields) = constructor_app(tm, arg)?;
                match kind {
                    FuncKind::Selector { ctor: owner, field } if owner == ctor => {
                        fields.get(field).copied()
                    }
                    FuncKind::Tester(owner) => Some(tm.mk_bool(owner == ctor)),
                    _ => None,
                }
            }
            TermKind::Eq(a, b) => {
                let (ca, fa) = constructor_app(tm, a)?;
                let (cb, fb) = constructor_app(tm, b)?;
                if ca != cb {
                    return Some(tm.mk_false());
                }
                let eqs: Vec<TermId> = fa
                    .iter()
                    .zip(fb.iter())
                    .map(|(&x, &y)| tm.mk_eq(x, y))
                    .collect();
                Some(tm.mk_and(eqs))
            }
            _ => None,
        }
    }
}

/// Constructor and fields of a constructor application.
fn constructor_app(tm: &TermManager, t: TermId) -> Option<(FuncId, Vec<TermId>)> {
    match tm.get(t).map(|t| &t.kind)? {
        TermKind::Apply { func, args }
            if tm.func(*func).is_some_and(|d| d.kind == FuncKind::Constructor) =>
        {
            Some((*func, args.to_vec()))
        }
        _ => None,
    }
}

impl ProjectPlugin for DatatypeProjector {
    fn family(&self) -> SortFamily {
        SortFamily::Datatype
    }

    fn collect_statistics(&self, st: &mut Statistics) {
        st.update("datatype-project-solved", self.stats.num_solved as u64);
        st.update("datatype-project-reductions", self.stats.num_reductions as u64);
    }

    fn apply(
        &mut self,
        tm: &mut TermManager,
        _model: &Model,
        vars: &mut Vec<TermId>,
        fmls: &mut Vec<TermId>,
    ) -> bool {
        let targets: Vec<TermId> = vars
            .iter()
            .copied()
            .filter(|&v| tm.family(tm.sort(v)) == SortFamily::Datatype)
            .collect();
        let mut changed = false;
        for x in targets {
            if solve_eq(tm, x, fmls) {
                vars.retain(|&v| v != x);
                self.stats.num_solved += 1;
                changed = true;
            }
        }
        self.reduce(tm, fmls) || changed
    }
}
