//! The MBQI controller.
//!
//! [`Mbqi::run`] visits every relevant quantifier with universal force
//! and folds the per-quantifier outcomes of [`Mbqi::check_forall`]:
//! any refutation makes the pass `False`, otherwise any inconclusive check
//! makes it `Undef`. After each pass the counterexample budget grows by
//! the configured increment, so later passes search further.

use crate::context::QuantifierContext;
use crate::mbqi::MbqiStats;
use crate::mbqi::choose::TermChooser;
use crate::mbqi::domain::{add_domain_bounds, add_domain_eqs};
use crate::mbqi::fixer::{DefaultModelFixer, ModelFixer};
use crate::mbqi::project::{ProjectPlugin, Projector};
use crate::mbqi::skeleton::{SkeletonCache, flatten_quantifier};
use crate::oracle::{Oracle, ScopedPush};
use mbqi_core::ast::{TermId, TermKind, TermManager};
use mbqi_core::config::SolverConfig;
use mbqi_core::error::MbqiResult;
use mbqi_core::literal::{LBool, Lit};
use mbqi_core::model::Model;
use mbqi_core::statistics::Statistics;
use tracing::{debug, trace};

/// Model-based quantifier instantiation engine.
pub struct Mbqi {
    cache: SkeletonCache,
    projector: Projector,
    fixer: Box<dyn ModelFixer>,
    oracle: Box<dyn Oracle>,
    chooser: TermChooser,
    model: Option<Model>,
    max_cex: u32,
    stats: MbqiStats,
}

impl Mbqi {
    /// Create an engine around an oracle, with the default model fixer and
    /// the arithmetic, datatype and array projection plugins.
    pub fn new(config: &SolverConfig, oracle: Box<dyn Oracle>) -> MbqiResult<Self> {
        config.validate()?;
        Ok(Self {
            cache: SkeletonCache::new(),
            projector: Projector::with_default_plugins(),
            fixer: Box::new(DefaultModelFixer::new()),
            oracle,
            chooser: TermChooser::new(config.random_seed),
            model: None,
            max_cex: config.mbqi_max_cexs,
            stats: MbqiStats::new(),
        })
    }

    /// Replace the model fixer.
    #[must_use]
    pub fn with_fixer(mut self, fixer: Box<dyn ModelFixer>) -> Self {
        self.fixer = fixer;
        self
    }

    /// Register a projection plugin. At most one per sort family.
    pub fn add_plugin(&mut self, plugin: Box<dyn ProjectPlugin>) -> MbqiResult<()> {
        self.projector.add_plugin(plugin)
    }

    /// Get statistics
    pub fn stats(&self) -> &MbqiStats {
        &self.stats
    }

    /// Current counterexample budget per quantifier.
    pub fn max_cex(&self) -> u32 {
        self.max_cex
    }

    /// Cached quantifier skeletons.
    pub fn skeletons(&self) -> &SkeletonCache {
        &self.cache
    }

    /// Candidate model of the current pass, once built.
    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    /// Reset the counterexample budget at the start of a search.
    pub fn init_search(&mut self, ctx: &dyn QuantifierContext) -> MbqiResult<()> {
        let config = ctx.config();
        config.validate()?;
        self.max_cex = config.mbqi_max_cexs;
        Ok(())
    }

    /// Build the candidate model of the current pass if not done yet.
    pub fn init_model(&mut self, tm: &mut TermManager, ctx: &mut dyn QuantifierContext) {
        if self.model.is_some() {
            return;
        }
        let mut model = Model::new();
        ctx.update_model(tm, &mut model);
        self.model = Some(model);
    }

    /// Complete an accepted model.
    pub fn finalize_model(&mut self, tm: &mut TermManager, model: &mut Model) {
        self.fixer.finalize(tm, model);
    }

    /// Report engine, projection, fixer and oracle statistics.
    pub fn collect_statistics(&self, st: &mut Statistics) {
        self.oracle.collect_statistics(st);
        self.projector.collect_statistics(st);
        self.fixer.collect_statistics(st);
        st.update("q-num-instantiations", self.stats.num_instantiations);
        st.update("mbqi-checks", self.stats.num_checks as u64);
        st.update("mbqi-loop-instances", self.stats.num_loop_instances as u64);
        st.update("mbqi-fallback-instances", self.stats.num_fallback_instances as u64);
    }

    /// Open a scope for skeletons created from now on.
    pub fn push_scope(&mut self) {
        self.cache.push_scope();
    }

    /// Drop the skeletons created in the `n` innermost scopes.
    pub fn pop_scope(&mut self, n: usize) {
        self.cache.pop_scope(n);
    }

    /// Drop every skeleton and the candidate model.
    pub fn reset(&mut self) {
        self.cache.reset();
        self.model = None;
    }

    /// Check every relevant quantifier with universal force.
    ///
    /// `False` when some quantifier received an instance, `Undef` when
    /// some check was inconclusive, `True` otherwise.
    pub fn run(&mut self, tm: &mut TermManager, ctx: &mut dyn QuantifierContext) -> LBool {
        let mut result = LBool::True;
        self.model = None;
        for lit in ctx.universal_literals() {
            let Some(q) = ctx.literal_term(lit) else {
                continue;
            };
            if !tm.is_quantifier(q) || !ctx.is_relevant(q) {
                continue;
            }
            self.init_model(tm, ctx);
            match self.check_forall(tm, ctx, q) {
                LBool::False => result = LBool::False,
                LBool::Undef if result == LBool::True => result = LBool::Undef,
                _ => {}
            }
        }
        self.max_cex = self.max_cex.saturating_add(ctx.config().mbqi_max_cexs);
        debug!(target: "mbqi", %result, max_cex = self.max_cex, "mbqi pass");
        result
    }

    /// Check one quantifier against the candidate model.
    ///
    /// `True` when the model satisfies it, `False` when instantiation
    /// clauses were added, `Undef` when the check was inconclusive.
    pub fn check_forall(
        &mut self,
        tm: &mut TermManager,
        ctx: &mut dyn QuantifierContext,
        q: TermId,
    ) -> LBool {
        self.stats.num_checks += 1;
        let before = self.stats.num_instantiations;
        let result = self.check_quantifier(tm, ctx, q);
        match result {
            LBool::True => self.stats.num_satisfied += 1,
            LBool::False => self.stats.num_refuted += 1,
            LBool::Undef => self.stats.num_unknown += 1,
        }
        debug!(
            target: "mbqi",
            quantifier = %tm.display(q),
            %result,
            instances = self.stats.num_instantiations - before,
            "check_forall"
        );
        result
    }

    fn check_quantifier(
        &mut self,
        tm: &mut TermManager,
        ctx: &mut dyn QuantifierContext,
        q: TermId,
    ) -> LBool {
        self.init_model(tm, ctx);
        let q_flat = flatten_quantifier(tm, q);
        let Self {
            cache,
            projector,
            fixer,
            oracle,
            chooser,
            model,
            max_cex,
            stats,
        } = self;
        let Some(model) = model.as_mut() else {
            return LBool::Undef;
        };

        let mut sp = ScopedPush::new(oracle.as_mut());
        let Some(qb) = cache.specialize(tm, &mut *sp, model, q_flat) else {
            trace!(target: "mbqi", "body cannot be evaluated in the model");
            return LBool::Undef;
        };
        let Some(mbody) = qb.mbody else {
            return LBool::Undef;
        };
        if tm.is_false(mbody) {
            return LBool::True;
        }
        sp.assert_expr(mbody);
        match sp.check_sat(tm) {
            LBool::Undef => return LBool::Undef,
            LBool::False => return LBool::True,
            LBool::True => {}
        }
        let Some(mdl0) = sp.model() else {
            return LBool::Undef;
        };

        let is_exists = matches!(tm.get(q).map(|t| &t.kind), Some(TermKind::Exists { .. }));
        let qlit = ctx.mk_literal(q);
        let qlit = if is_exists { !qlit } else { qlit };

        let mut count = 0u32;
        let mut emitted: Vec<TermId> = Vec::new();
        if !qb.var_args.is_empty() {
            let mut inner = ScopedPush::new(&mut *sp);
            add_domain_eqs(tm, model, fixer.as_mut(), &mut *inner, qb);
            while count < *max_cex && inner.check_sat(tm) == LBool::True {
                let Some(mdl1) = inner.model() else {
                    break;
                };
                let Some(proj) = projector.solver_project(
                    tm,
                    model,
                    &mdl1,
                    qb,
                    fixer.as_mut(),
                    chooser,
                    ctx.value_classes(),
                ) else {
                    break;
                };
                let Some(blocked) = block_witness(tm, &qb.vars, &mdl1) else {
                    break;
                };
                if emitted.contains(&proj) {
                    trace!(target: "mbqi", instance = %tm.display(proj), "project-duplicate");
                } else {
                    trace!(target: "mbqi", instance = %tm.display(proj), "project");
                    add_instance(ctx, stats, qlit, proj);
                    stats.num_loop_instances += 1;
                    emitted.push(proj);
                }
                inner.assert_expr(blocked);
                count += 1;
            }
        }

        if count == 0 {
            add_domain_bounds(tm, model, &mdl0, fixer.as_mut(), ctx.value_classes(), qb);
            let Some(proj) = projector.solver_project(
                tm,
                model,
                &mdl0,
                qb,
                fixer.as_mut(),
                chooser,
                ctx.value_classes(),
            ) else {
                return LBool::Undef;
            };
            trace!(target: "mbqi", instance = %tm.display(proj), "project-base");
            add_instance(ctx, stats, qlit, proj);
            stats.num_fallback_instances += 1;
        }
        LBool::False
    }
}

/// `not (sk1 = v1 and ... and skn = vn)` for the Skolem values in `mdl`.
/// Instances only mention ground terms of the context, so the next
/// counterexample is excluded over the Skolem constants.
fn block_witness(tm: &mut TermManager, vars: &[TermId], mdl: &Model) -> Option<TermId> {
    let mut eqs = Vec::with_capacity(vars.len());
    for &sk in vars {
        let value = mdl.eval_with(tm, sk, true)?;
        eqs.push(tm.mk_eq(sk, value));
    }
    let witness = tm.mk_and(eqs);
    Some(tm.mk_not(witness))
}

/// Add `not q or not instance`.
fn add_instance(ctx: &mut dyn QuantifierContext, stats: &mut MbqiStats, qlit: Lit, proj: TermId) {
    stats.num_instantiations += 1;
    let plit = ctx.mk_literal(proj);
    ctx.add_clause(&[!qlit, !plit]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RecordingContext;
    use crate::oracle::EnumOracle;
    use mbqi_core::ast::SortFamily;
    use mbqi_core::error::MbqiError;
    use mbqi_core::model::FuncInterp;
    use smallvec::smallvec;

    fn engine(config: &SolverConfig) -> Mbqi {
        Mbqi::new(config, Box::new(EnumOracle::new(config.oracle_max_assignments)))
            .expect("valid config")
    }

    /// forall x:U. P(x) where P is true everywhere.
    fn satisfied(tm: &mut TermManager) -> (TermId, Model) {
        let u = tm.mk_uninterpreted_sort("U");
        let b = tm.sorts.bool_sort;
        let p = tm.declare_fun("P", &[u], b);
        let x = tm.mk_var("x", u);
        let px = tm.mk_app(p, vec![x]);
        let name = tm.intern("x");
        let q = tm.mk_forall(smallvec![(name, u)], px);
        let mut interp = FuncInterp::new();
        let t = tm.mk_true();
        interp.set_else(t);
        let mut model = Model::new();
        model.register_func(p, interp);
        (q, model)
    }

    #[test]
    fn test_budget_grows_after_each_pass() {
        let mut tm = TermManager::new();
        let config = SolverConfig::thorough();
        let mut ctx = RecordingContext::new(config.clone(), Model::new());
        let mut mbqi = engine(&config);
        mbqi.init_search(&ctx).expect("valid config");
        assert_eq!(mbqi.max_cex(), 4);
        assert_eq!(mbqi.run(&mut tm, &mut ctx), LBool::True);
        assert_eq!(mbqi.max_cex(), 8);
        mbqi.init_search(&ctx).expect("valid config");
        assert_eq!(mbqi.max_cex(), 4);
    }

    #[test]
    fn test_model_is_built_only_for_relevant_quantifiers() {
        let mut tm = TermManager::new();
        let (q, model) = satisfied(&mut tm);
        let config = SolverConfig::default();
        let mut ctx = RecordingContext::new(config.clone(), model);
        ctx.assert_quantifier(&tm, q);
        ctx.set_relevant(q, false);
        let mut mbqi = engine(&config);
        assert_eq!(mbqi.run(&mut tm, &mut ctx), LBool::True);
        assert!(mbqi.model().is_none());
        assert_eq!(mbqi.stats().num_checks, 0);

        ctx.set_relevant(q, true);
        assert_eq!(mbqi.run(&mut tm, &mut ctx), LBool::True);
        assert!(mbqi.model().is_some());
        assert_eq!(mbqi.stats().num_satisfied, 1);
        assert!(ctx.clauses().is_empty());
    }

    #[test]
    fn test_duplicate_plugin_is_an_error() {
        let mut mbqi = engine(&SolverConfig::default());
        let err = mbqi.add_plugin(Box::new(crate::mbqi::ArithProjector::new()));
        assert_eq!(err, Err(MbqiError::DuplicatePlugin(SortFamily::Arith)));
    }

    #[test]
    fn test_finalize_model_completes_functions() {
        let mut tm = TermManager::new();
        let u = tm.mk_uninterpreted_sort("U");
        let f = tm.declare_fun("f", &[u], u);
        let u0 = tm.mk_value(u, 0);
        let u1 = tm.mk_value(u, 1);
        let mut interp = FuncInterp::new();
        interp.add_entry(vec![u0], u1);
        let mut model = Model::new();
        model.register_func(f, interp);
        let mut mbqi = engine(&SolverConfig::default());
        mbqi.finalize_model(&mut tm, &mut model);
        assert_eq!(
            model.func_interp(f).and_then(|i| i.else_value),
            Some(u1)
        );
    }

    #[test]
    fn test_statistics_report_instantiations() {
        let mut tm = TermManager::new();
        let (q, model) = satisfied(&mut tm);
        let config = SolverConfig::default();
        let mut ctx = RecordingContext::new(config.clone(), model);
        ctx.assert_quantifier(&tm, q);
        let mut mbqi = engine(&config);
        mbqi.run(&mut tm, &mut ctx);
        let mut st = Statistics::new();
        mbqi.collect_statistics(&mut st);
        assert_eq!(st.get("q-num-instantiations"), Some(0));
    }

    #[test]
    fn test_non_quantifier_literal_is_skipped() {
        let mut tm = TermManager::new();
        let b = tm.sorts.bool_sort;
        let p = tm.mk_const("p", b);
        let config = SolverConfig::default();
        let mut ctx = RecordingContext::new(config.clone(), Model::new());
        ctx.assert_quantifier(&tm, p);
        let mut mbqi = engine(&config);
        assert_eq!(mbqi.run(&mut tm, &mut ctx), LBool::True);
        assert_eq!(mbqi.stats().num_checks, 0);
    }

    #[test]
    fn test_scopes_drop_skeletons() {
        let mut tm = TermManager::new();
        let (q, model) = satisfied(&mut tm);
        let config = SolverConfig::default();
        let mut ctx = RecordingContext::new(config.clone(), model);
        let mut mbqi = engine(&config);
        mbqi.push_scope();
        assert_eq!(mbqi.check_forall(&mut tm, &mut ctx, q), LBool::True);
        assert_eq!(mbqi.skeletons().len(), 1);
        mbqi.pop_scope(1);
        assert!(mbqi.skeletons().is_empty());
        mbqi.reset();
        assert!(mbqi.model().is_none());
    }
}
