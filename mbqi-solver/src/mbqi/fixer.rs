//! Argument restriction and inversion for uninterpreted functions.
//!
//! The engine asks a [`ModelFixer`] how the arguments of a free function
//! application may be bounded, and which ground term stands for a value.
//! [`DefaultModelFixer`] answers from the finite graphs of the candidate
//! model: the values recorded at an argument position form a sorted
//! "projection" of that position.

use mbqi_core::ast::{FuncId, SortKind, TermId, TermKind, TermManager};
use mbqi_core::model::{Model, ValueClasses};
use mbqi_core::statistics::Statistics;
use std::cmp::Ordering;
use std::fmt;

/// Restriction and inversion hooks used by the quantifier engine.
pub trait ModelFixer {
    /// Formula bounding argument `index` of `app`. `true` when there is
    /// nothing to restrict.
    fn restrict_arg(
        &mut self,
        tm: &mut TermManager,
        model: &Model,
        app: TermId,
        index: usize,
    ) -> TermId;

    /// Push constraints on argument `index` of the ground application `app`
    /// that hold for every value inducing the same function result as
    /// `value`.
    fn invert_arg(
        &mut self,
        tm: &mut TermManager,
        model: &Model,
        classes: &ValueClasses,
        app: TermId,
        index: usize,
        value: TermId,
        out: &mut Vec<TermId>,
    );

    /// Ground term with model value `value` that can replace `app`.
    fn invert_app(
        &mut self,
        tm: &mut TermManager,
        model: &Model,
        classes: &ValueClasses,
        app: TermId,
        value: TermId,
    ) -> TermId;

    /// Complete a model once it has been accepted.
    fn finalize(&mut self, tm: &mut TermManager, model: &mut Model);

    /// Report fixer counters.
    fn collect_statistics(&self, _st: &mut Statistics) {}
}

/// Statistics for model fixing
#[derive(Debug, Clone, Default)]
pub struct FixerStats {
    /// Restrictions produced
    pub num_restrictions: usize,
    /// Argument inversions
    pub num_arg_inversions: usize,
    /// Application inversions
    pub num_app_inversions: usize,
    /// Function interpretations completed by `finalize`
    pub num_completed: usize,
}

impl fmt::Display for FixerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model Fixer Statistics:")?;
        writeln!(f, "  Restrictions: {}", self.num_restrictions)?;
        writeln!(f, "  Arg inversions: {}", self.num_arg_inversions)?;
        writeln!(f, "  App inversions: {}", self.num_app_inversions)?;
        writeln!(f, "  Completed interpretations: {}", self.num_completed)
    }
}

/// Model fixer working off function graphs and value classes.
#[derive(Debug, Default)]
pub struct DefaultModelFixer {
    stats: FixerStats,
}

impl DefaultModelFixer {
    /// Create a new model fixer
    pub fn new() -> Self {
        Self::default()
    }

    /// Get statistics
    pub fn stats(&self) -> &FixerStats {
        &self.stats
    }

    /// Distinct values recorded at argument `index` of `func`, sorted.
    fn projection(tm: &TermManager, model: &Model, func: FuncId, index: usize) -> Vec<TermId> {
        let Some(interp) = model.func_interp(func) else {
            return Vec::new();
        };
        let mut values: Vec<TermId> = Vec::new();
        for entry in &interp.entries {
            if let Some(&v) = entry.args.get(index)
                && !values.contains(&v)
            {
                values.push(v);
            }
        }
        values.sort_by(|&a, &b| compare_values(tm, a, b));
        values
    }

    /// Ground representative of `value`, or the value itself.
    fn term_for(classes: &ValueClasses, value: TermId) -> TermId {
        classes.class(value).first().copied().unwrap_or(value)
    }
}

fn compare_values(tm: &TermManager, a: TermId, b: TermId) -> Ordering {
    match (tm.int_value(a), tm.int_value(b)) {
        (Some(x), Some(y)) => x.cmp(y),
        _ => a.cmp(&b),
    }
}

fn app_arg(tm: &TermManager, app: TermId, index: usize) -> Option<(FuncId, TermId)> {
    match tm.get(app).map(|t| &t.kind) {
        Some(TermKind::Apply { func, args }) => Some((*func, *args.get(index)?)),
        _ => None,
    }
}

impl ModelFixer for DefaultModelFixer {
    fn restrict_arg(
        &mut self,
        tm: &mut TermManager,
        model: &Model,
        app: TermId,
        index: usize,
    ) -> TermId {
        let Some((func, arg)) = app_arg(tm, app, index) else {
            return tm.mk_true();
        };
        if matches!(tm.sort_kind(tm.sort(arg)), Some(SortKind::Bool)) {
            return tm.mk_true();
        }
        let values = Self::projection(tm, model, func, index);
        if values.is_empty() {
            return tm.mk_true();
        }
        self.stats.num_restrictions += 1;
        let eqs: Vec<TermId> = values.iter().map(|&v| tm.mk_eq(arg, v)).collect();
        tm.mk_or(eqs)
    }

    fn invert_arg(
        &mut self,
        tm: &mut TermManager,
        model: &Model,
        classes: &ValueClasses,
        app: TermId,
        index: usize,
        value: TermId,
        out: &mut Vec<TermId>,
    ) {
        let Some((func, arg)) = app_arg(tm, app, index) else {
            return;
        };
        self.stats.num_arg_inversions += 1;
        if tm.int_value(value).is_some() {
            let values = Self::projection(tm, model, func, index);
            let lo = values
                .iter()
                .rev()
                .find(|&&v| compare_values(tm, v, value) != Ordering::Greater)
                .copied();
            let hi = values
                .iter()
                .find(|&&v| compare_values(tm, v, value) == Ordering::Greater)
                .copied();
            if let Some(lo) = lo {
                let bound = tm.mk_le(lo, arg);
                out.push(bound);
            }
            if let Some(hi) = hi {
                let bound = tm.mk_lt(arg, hi);
                out.push(bound);
            }
            return;
        }
        let rep = Self::term_for(classes, value);
        let eq = tm.mk_eq(arg, rep);
        if !tm.is_true(eq) {
            out.push(eq);
        }
    }

    fn invert_app(
        &mut self,
        tm: &mut TermManager,
        _model: &Model,
        classes: &ValueClasses,
        app: TermId,
        value: TermId,
    ) -> TermId {
        self.stats.num_app_inversions += 1;
        let class = classes.class(value);
        let func = match tm.get(app).map(|t| &t.kind) {
            Some(TermKind::Apply { func, .. }) => Some(*func),
            _ => None,
        };
        let same_func = class.iter().copied().find(|&t| {
            t != app
                && matches!(
                    tm.get(t).map(|t| &t.kind),
                    Some(TermKind::Apply { func: f, .. }) if Some(*f) == func
                )
        });
        same_func
            .or_else(|| class.iter().copied().find(|&t| t != app))
            .unwrap_or(value)
    }

    fn finalize(&mut self, _tm: &mut TermManager, model: &mut Model) {
        let partial: Vec<FuncId> = model
            .funcs()
            .filter(|(_, interp)| interp.is_partial())
            .map(|(f, _)| f)
            .collect();
        for func in partial {
            if let Some(interp) = model.func_interp_mut(func)
                && let Some(default) = interp.max_occurrence_result()
            {
                interp.set_else(default);
                self.stats.num_completed += 1;
            }
        }
    }

    fn collect_statistics(&self, st: &mut Statistics) {
        st.update("fixer-restrictions", self.stats.num_restrictions as u64);
        st.update("fixer-arg-inversions", self.stats.num_arg_inversions as u64);
        st.update("fixer-app-inversions", self.stats.num_app_inversions as u64);
        st.update("fixer-completed", self.stats.num_completed as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbqi_core::model::FuncInterp;

    fn int_model(tm: &mut TermManager) -> (Model, FuncId) {
        let int = tm.sorts.int_sort;
        let g = tm.declare_fun("g", &[int], int);
        let mut interp = FuncInterp::new();
        for (a, r) in [(7, 1), (2, 5), (9, 5)] {
            let a = tm.mk_int(a);
            let r = tm.mk_int(r);
            interp.add_entry(vec![a], r);
        }
        let mut model = Model::new();
        model.register_func(g, interp);
        (model, g)
    }

    #[test]
    fn test_restrict_arg_lists_recorded_values() {
        let mut tm = TermManager::new();
        let (model, g) = int_model(&mut tm);
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let gx = tm.mk_app(g, vec![x]);
        let mut fixer = DefaultModelFixer::new();
        let restriction = fixer.restrict_arg(&mut tm, &model, gx, 0);
        let eqs: Vec<TermId> = [2, 7, 9]
            .into_iter()
            .map(|v| {
                let v = tm.mk_int(v);
                tm.mk_eq(x, v)
            })
            .collect();
        assert_eq!(restriction, tm.mk_or(eqs));
        let out_of_range = fixer.restrict_arg(&mut tm, &model, gx, 3);
        assert!(tm.is_true(out_of_range));
    }

    #[test]
    fn test_invert_arg_brackets_integer_values() {
        let mut tm = TermManager::new();
        let (model, g) = int_model(&mut tm);
        let c = tm.mk_const("c", tm.sorts.int_sort);
        let gc = tm.mk_app(g, vec![c]);
        let four = tm.mk_int(4);
        let mut fixer = DefaultModelFixer::new();
        let mut out = Vec::new();
        fixer.invert_arg(&mut tm, &model, &ValueClasses::new(), gc, 0, four, &mut out);
        let two = tm.mk_int(2);
        let seven = tm.mk_int(7);
        let lo = tm.mk_le(two, c);
        let hi = tm.mk_lt(c, seven);
        assert_eq!(out, vec![lo, hi]);
    }

    #[test]
    fn test_invert_app_prefers_same_function() {
        let mut tm = TermManager::new();
        let u = tm.mk_uninterpreted_sort("U");
        let f = tm.declare_fun("f", &[u], u);
        let a = tm.mk_const("a", u);
        let b = tm.mk_const("b", u);
        let sk = tm.mk_const("sk", u);
        let fb = tm.mk_app(f, vec![b]);
        let fsk = tm.mk_app(f, vec![sk]);
        let v = tm.mk_value(u, 0);
        let mut classes = ValueClasses::new();
        classes.add(v, a);
        classes.add(v, fb);
        let mut fixer = DefaultModelFixer::new();
        let model = Model::new();
        assert_eq!(fixer.invert_app(&mut tm, &model, &classes, fsk, v), fb);
        let other = tm.mk_value(u, 1);
        assert_eq!(fixer.invert_app(&mut tm, &model, &classes, fsk, other), other);
    }

    #[test]
    fn test_finalize_completes_partial_functions() {
        let mut tm = TermManager::new();
        let (mut model, g) = int_model(&mut tm);
        let mut fixer = DefaultModelFixer::new();
        fixer.finalize(&mut tm, &mut model);
        let five = tm.mk_int(5);
        let interp = model.func_interp(g).expect("interp");
        assert_eq!(interp.else_value, Some(five));
        assert_eq!(fixer.stats().num_completed, 1);
    }
}
