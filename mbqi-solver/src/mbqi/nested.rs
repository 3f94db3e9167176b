//! Replacement of free applications over Skolem constants.
//!
//! `F[g(t)]` becomes `F[s] & g(t) = s` where `t` mentions Skolem
//! constants, `s` is ground and both have the same model value. Theory
//! plugins can then project the constants out of `F[s]` without looking
//! inside `g`.

use crate::mbqi::fixer::ModelFixer;
use crate::mbqi::skeleton::QBody;
use mbqi_core::ast::{TermId, TermManager};
use mbqi_core::model::{Model, ValueClasses};
use rustc_hash::FxHashMap;

/// Replace the applications of `qb.var_args` in `fmls` by ground terms of
/// the same value and append the defining equalities.
pub fn eliminate_nested_vars(
    tm: &mut TermManager,
    model: &Model,
    fixer: &mut dyn ModelFixer,
    classes: &ValueClasses,
    qb: &QBody,
    fmls: &mut Vec<TermId>,
) {
    if qb.var_args.is_empty() {
        return;
    }
    let mut rep: FxHashMap<TermId, TermId> = FxHashMap::default();
    let mut eqs = Vec::new();
    for &(app, _) in &qb.var_args {
        let term = qb.instantiate(tm, app);
        if rep.contains_key(&term) {
            continue;
        }
        let Some(value) = model.eval_with(tm, term, true) else {
            continue;
        };
        let s = fixer.invert_app(tm, model, classes, term, value);
        if s == term {
            continue;
        }
        rep.insert(term, s);
        let eq = tm.mk_eq(term, s);
        eqs.push(eq);
    }
    for f in fmls.iter_mut() {
        *f = tm.replace(*f, &rep);
    }
    fmls.extend(eqs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mbqi::fixer::DefaultModelFixer;
    use crate::mbqi::skeleton::SkeletonCache;
    use crate::oracle::EnumOracle;
    use mbqi_core::model::FuncInterp;
    use smallvec::smallvec;

    #[test]
    fn test_application_replaced_by_class_member() {
        let mut tm = TermManager::new();
        let u = tm.mk_uninterpreted_sort("U");
        let f = tm.declare_fun("f", &[u], u);
        let x = tm.mk_var("x", u);
        let a = tm.mk_const("a", u);
        let b = tm.mk_const("b", u);
        let fx = tm.mk_app(f, vec![x]);
        let body = tm.mk_eq(fx, a);
        let name = tm.intern("x");
        let q = tm.mk_forall(smallvec![(name, u)], body);

        let u0 = tm.mk_value(u, 0);
        let u1 = tm.mk_value(u, 1);
        let mut interp = FuncInterp::new();
        interp.add_entry(vec![u0], u0);
        interp.add_entry(vec![u1], u1);
        let fb = tm.mk_app(f, vec![b]);
        let mut model = Model::new();
        model.register_func(f, interp);
        model.register_decl(tm.const_decl(a).expect("a"), u0);
        model.register_decl(tm.const_decl(b).expect("b"), u1);

        let mut cache = SkeletonCache::new();
        let mut oracle = EnumOracle::default();
        let qb = cache
            .specialize(&mut tm, &mut oracle, &model, q)
            .expect("skeleton")
            .clone();
        let sk = qb.vars[0];
        model.register_decl(tm.const_decl(sk).expect("skolem"), u1);

        let mut classes = ValueClasses::new();
        classes.add(u0, a);
        classes.add(u1, b);
        classes.add(u1, fb);

        let mut fixer = DefaultModelFixer::new();
        let mut fmls = qb.vbody.clone();
        eliminate_nested_vars(&mut tm, &model, &mut fixer, &classes, &qb, &mut fmls);

        let fsk = tm.mk_app(f, vec![sk]);
        let eq_fb_a = tm.mk_eq(fb, a);
        let replaced = tm.mk_not(eq_fb_a);
        let def = tm.mk_eq(fsk, fb);
        assert_eq!(fmls, vec![replaced, def]);
    }
}
