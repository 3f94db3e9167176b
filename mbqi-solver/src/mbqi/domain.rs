//! Domain restrictions for arguments of free function applications.
//!
//! Theory projection only sees ground atoms, so arguments of free
//! functions that depend on bound variables are first confined to the
//! region of the domain the candidate model describes. The symbolic form
//! bounds the counterexample search in the oracle; the ground form
//! characterizes one counterexample for the fallback instantiation.

use crate::mbqi::fixer::ModelFixer;
use crate::mbqi::skeleton::QBody;
use crate::oracle::Oracle;
use mbqi_core::ast::TermManager;
use mbqi_core::model::{Model, ValueClasses};
use tracing::trace;

/// Restrict every argument position of `qb.var_args` to the values the
/// model records for it.
///
/// The restriction is evaluated in `model`, instantiated with the Skolem
/// constants and asserted into `oracle`; its symbolic form is kept in
/// `qb.domain_eqs`. Stops at the first restriction that cannot be
/// evaluated, leaving the oracle check that follows to decide.
pub fn add_domain_eqs(
    tm: &mut TermManager,
    model: &Model,
    fixer: &mut dyn ModelFixer,
    oracle: &mut dyn Oracle,
    qb: &mut QBody,
) {
    qb.domain_eqs.clear();
    for &(app, index) in &qb.var_args {
        let bounds = fixer.restrict_arg(tm, model, app, index);
        if tm.is_true(bounds) {
            continue;
        }
        let vbounds = qb.instantiate(tm, bounds);
        let Some(mbounds) = model.eval_expr(tm, bounds, true) else {
            return;
        };
        let mbounds = qb.instantiate(tm, mbounds);
        trace!(target: "mbqi", bounds = %tm.display(mbounds), "domain restriction");
        oracle.assert_expr(mbounds);
        qb.domain_eqs.push(vbounds);
    }
}

/// Record the Skolem values of `mdl` in `candidate` and bound the
/// arguments of `qb.var_args` around their values in it.
pub fn add_domain_bounds(
    tm: &mut TermManager,
    candidate: &mut Model,
    mdl: &Model,
    fixer: &mut dyn ModelFixer,
    classes: &ValueClasses,
    qb: &mut QBody,
) {
    qb.domain_eqs.clear();
    for &v in &qb.vars {
        if let Some(value) = mdl.eval_with(tm, v, true)
            && let Some(decl) = tm.const_decl(v)
        {
            candidate.register_decl(decl, value);
        }
    }
    for &(app, index) in &qb.var_args {
        let term = qb.instantiate(tm, app);
        let Some(&arg) = tm.children(term).get(index) else {
            continue;
        };
        let Some(value) = candidate.eval_with(tm, arg, true) else {
            continue;
        };
        fixer.invert_arg(tm, candidate, classes, term, index, value, &mut qb.domain_eqs);
    }
    if !qb.domain_eqs.is_empty() {
        trace!(target: "mbqi", count = qb.domain_eqs.len(), "domain bounds");
    }
}
