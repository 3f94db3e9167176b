//! Property-based tests for the instantiation loop
//!
//! `forall x:U. f(x) = a` over a universe of two to four elements, with a
//! random table for `f`:
//! - The check is refuted exactly when the table leaves `a`
//! - No check adds more clauses than the counterexample budget
//! - Every instance is ground and true in the candidate model

use mbqi_core::ast::{TermId, TermManager};
use mbqi_core::config::SolverConfig;
use mbqi_core::literal::LBool;
use mbqi_core::model::{FuncInterp, Model};
use mbqi_solver::{EnumOracle, Mbqi, QuantifierContext, RecordingContext};
use proptest::prelude::*;
use smallvec::smallvec;

struct Setup {
    tm: TermManager,
    ctx: RecordingContext,
    q: TermId,
    consts: Vec<TermId>,
}

fn setup(table: &[usize], a_idx: usize, max_cex: u32) -> Setup {
    let n = table.len();
    let mut tm = TermManager::new();
    let u = tm.mk_uninterpreted_sort("U");
    let elems: Vec<TermId> = (0..n as u32).map(|i| tm.mk_value(u, i)).collect();
    let f = tm.declare_fun("f", &[u], u);
    let a = tm.mk_const("a", u);

    let mut model = Model::new();
    model.set_universe(u, elems.clone());
    let mut interp = FuncInterp::new();
    for (i, &r) in table.iter().enumerate() {
        interp.add_entry(vec![elems[i]], elems[r]);
    }
    model.register_func(f, interp);

    let mut consts = vec![a];
    let decl = tm.const_decl(a).expect("constant");
    model.register_decl(decl, elems[a_idx]);
    for (i, &e) in elems.iter().enumerate() {
        let c = tm.mk_const(&format!("c{i}"), u);
        let decl = tm.const_decl(c).expect("constant");
        model.register_decl(decl, e);
        consts.push(c);
    }

    let x = tm.mk_var("x", u);
    let fx = tm.mk_app(f, vec![x]);
    let body = tm.mk_eq(fx, a);
    let name = tm.intern("x");
    let q = tm.mk_forall(smallvec![(name, u)], body);

    let config = SolverConfig {
        mbqi_max_cexs: max_cex,
        ..SolverConfig::default()
    };
    let mut ctx = RecordingContext::new(config, model);
    for &c in &consts {
        ctx.add_ground_term(&mut tm, c).expect("constant has a value");
    }
    ctx.assert_quantifier(&tm, q);
    Setup { tm, ctx, q, consts }
}

fn table_strategy() -> impl Strategy<Value = (Vec<usize>, usize)> {
    (2usize..5).prop_flat_map(|n| (prop::collection::vec(0..n, n), 0..n))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Refuted exactly when some element is not mapped to `a`
    #[test]
    fn outcome_matches_table((table, a_idx) in table_strategy(), max_cex in 1u32..4) {
        let Setup { mut tm, mut ctx, .. } = setup(&table, a_idx, max_cex);
        let config = ctx.config().clone();
        let mut mbqi = Mbqi::new(&config, Box::new(EnumOracle::new(config.oracle_max_assignments)))
            .expect("valid config");
        let result = mbqi.run(&mut tm, &mut ctx);
        let violated = table.iter().any(|&r| r != a_idx);
        prop_assert_eq!(result, if violated { LBool::False } else { LBool::True });
        prop_assert_eq!(ctx.clauses().is_empty(), !violated);
    }

    /// At most `max_cex` clauses per check
    #[test]
    fn clauses_are_bounded((table, a_idx) in table_strategy(), max_cex in 1u32..4) {
        let Setup { mut tm, mut ctx, q, .. } = setup(&table, a_idx, max_cex);
        let config = ctx.config().clone();
        let mut mbqi = Mbqi::new(&config, Box::new(EnumOracle::new(config.oracle_max_assignments)))
            .expect("valid config");
        mbqi.check_forall(&mut tm, &mut ctx, q);
        prop_assert!(ctx.clauses().len() <= max_cex as usize);
        prop_assert_eq!(mbqi.stats().num_instantiations, ctx.clauses().len() as u64);
    }

    /// Instances are ground, use only known constants and hold in the model
    #[test]
    fn instances_hold_in_model((table, a_idx) in table_strategy(), max_cex in 1u32..4) {
        let Setup { mut tm, mut ctx, q, consts } = setup(&table, a_idx, max_cex);
        let config = ctx.config().clone();
        let mut mbqi = Mbqi::new(&config, Box::new(EnumOracle::new(config.oracle_max_assignments)))
            .expect("valid config");
        mbqi.check_forall(&mut tm, &mut ctx, q);
        let qlit = ctx.mk_literal(q);
        for clause in ctx.clauses().to_vec() {
            prop_assert_eq!(clause.len(), 2);
            prop_assert_eq!(clause[0], !qlit);
            let inst = ctx.literal_term(clause[1]).expect("registered instance");
            prop_assert!(tm.is_ground(inst));
            prop_assert!(tm.uninterp_consts(inst).iter().all(|c| consts.contains(c)));
            prop_assert!(ctx.model().is_true(&mut tm, inst));
        }
    }
}
