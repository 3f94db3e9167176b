//! Array projection.
//!
//! Array constants are eliminated by solving equalities. Reads over
//! writes left behind by the substitution are then reduced with the
//! model deciding whether the indices coincide:
//! `select(store(a, i, v), j)` becomes `v` under `i = j` and
//! `select(a, j)` under `i != j`, and the deciding literal is kept.

use super::{ProjectPlugin, solve_eq};
use mbqi_core::ast::{SortFamily, TermId, TermKind, TermManager};
use mbqi_core::model::Model;
use mbqi_core::statistics::Statistics;
use rustc_hash::FxHashMap;
use std::fmt;

/// Statistics for array projection
#[derive(Debug, Clone, Default)]
pub struct ArrayProjectStats {
    /// Constants solved from an equality
    pub num_solved: usize,
    /// Read-over-write reductions
    pub num_reductions: usize,
}

impl fmt::Display for ArrayProjectStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Array Projection Statistics:")?;
        writeln!(f, "  Solved: {}", self.num_solved)?;
        writeln!(f, "  Read-over-write: {}", self.num_reductions)
    }
}

/// Projection plugin for array constants.
#[derive(Debug, Default)]
pub struct ArrayProjector {
    stats: ArrayProjectStats,
}

impl ArrayProjector {
    /// Create a new array projector
    pub fn new() -> Self {
        Self::default()
    }

    /// Get statistics
    pub fn stats(&self) -> &ArrayProjectStats {
        &self.stats
    }

    /// Reduce every read over a write in `fmls`.
    fn reduce_read_over_write(
        &mut self,
        tm: &mut TermManager,
        model: &Model,
        fmls: &mut Vec<TermId>,
    ) -> bool {
        let mut changed = false;
        while let Some((redex, array, i, v, j)) = find_redex(tm, fmls) {
            let eq = tm.mk_eq(i, j);
            let (replacement, side) = if model.is_true(tm, eq) {
                (v, eq)
            } else {
                let read = tm.mk_select(array, j);
                (read, tm.mk_not(eq))
            };
            let mut map = FxHashMap::default();
            map.insert(redex, replacement);
            for f in fmls.iter_mut() {
                *f = tm.replace(*f, &map);
            }
            if !(tm.is_value(i) && tm.is_value(j)) && !fmls.contains(&side) {
                fmls.push(side);
            }
            self.stats.num_reductions += 1;
            changed = true;
        }
        changed
    }
}

/// First `select(store(a, i, v), j)` in `fmls`.
fn find_redex(
    tm: &TermManager,
    fmls: &[TermId],
) -> Option<(TermId, TermId, TermId, TermId, TermId)> {
    for &f in fmls {
        for t in tm.subterms(f) {
            let Some(TermKind::Select(store, j)) = tm.get(t).map(|t| &t.kind) else {
                continue;
            };
            if let Some(TermKind::Store(a, i, v)) = tm.get(*store).map(|t| &t.kind) {
                return Some((t, *a, *i, *v, *j));
            }
        }
    }
    None
}

impl ProjectPlugin for ArrayProjector {
    fn family(&self) -> SortFamily {
        SortFamily::Array
    }

    fn collect_statistics(&self, st: &mut Statistics) {
        st.update("array-project-solved", self.stats.num_solved as u64);
        st.update("array-project-reductions", self.stats.num_reductions as u64);
    }

    fn apply(
        &mut self,
        tm: &mut TermManager,
        model: &Model,
        vars: &mut Vec<TermId>,
        fmls: &mut Vec<TermId>,
    ) -> bool {
        let targets: Vec<TermId> = vars
            .iter()
            .copied()
            .filter(|&v| tm.family(tm.sort(v)) == SortFamily::Array)
            .collect();
        let mut changed = false;
        for x in targets {
            if solve_eq(tm, x, fmls) {
                vars.retain(|&v| v != x);
                self.stats.num_solved += 1;
                changed = true;
            }
        }
        self.reduce_read_over_write(tm, model, fmls) || changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solved_array_reduces_reads() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let arr = tm.mk_array_sort(int, int);
        let a = tm.mk_const("A", arr);
        let b = tm.mk_const("B", arr);
        let k = tm.mk_const("k", int);
        let one = tm.mk_int(1);
        let two = tm.mk_int(2);
        let five = tm.mk_int(5);

        let mut model = Model::new();
        let decl = tm.const_decl(k).expect("constant");
        model.register_decl(decl, one);

        let stored = tm.mk_store(b, one, five);
        let def = tm.mk_eq(a, stored);
        let read = tm.mk_select(a, k);
        let gt = tm.mk_gt(read, two);
        let mut fmls = vec![def, gt];
        let mut vars = vec![a];
        let mut plugin = ArrayProjector::new();
        assert!(plugin.apply(&mut tm, &model, &mut vars, &mut fmls));
        assert!(vars.is_empty());

        let reduced = tm.mk_gt(five, two);
        let index_eq = tm.mk_eq(one, k);
        assert_eq!(fmls, vec![reduced, index_eq]);
        assert_eq!(plugin.stats().num_reductions, 1);
    }

    #[test]
    fn test_distinct_indices_read_through() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let arr = tm.mk_array_sort(int, int);
        let b = tm.mk_const("B", arr);
        let k = tm.mk_const("k", int);
        let one = tm.mk_int(1);
        let three = tm.mk_int(3);
        let five = tm.mk_int(5);

        let mut model = Model::new();
        let decl = tm.const_decl(k).expect("constant");
        model.register_decl(decl, three);

        let stored = tm.mk_store(b, one, five);
        let read = tm.mk_select(stored, k);
        let eq = tm.mk_eq(read, five);
        let mut fmls = vec![eq];
        let mut plugin = ArrayProjector::new();
        assert!(plugin.apply(&mut tm, &model, &mut Vec::new(), &mut fmls));

        let inner = tm.mk_select(b, k);
        let expected = tm.mk_eq(inner, five);
        let index_eq = tm.mk_eq(one, k);
        let index_ne = tm.mk_not(index_eq);
        assert_eq!(fmls, vec![expected, index_ne]);
    }
}
