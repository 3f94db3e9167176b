//! Model-based projection of Skolem constants.
//!
//! Given a model that satisfies the negated quantifier body, projection
//! removes the Skolem constants from the body and returns a ground
//! formula that still holds in the model. Theory plugins eliminate the
//! constants of their sort family by solving equalities; whatever they
//! leave behind is replaced by a ground term whose value agrees with the
//! model.
//!
//! ## Pipeline
//!
//! 1. Skolem values are copied from the counterexample model into the
//!    candidate model
//! 2. Before the first plugin runs, the domain equations are added, nested
//!    function applications are replaced and the body is reduced to
//!    literals true in the model
//! 3. Plugins run per sort family
//! 4. Remaining constants become ground representatives of their values

mod arith;
mod array;
mod datatype;
mod literals;

pub use arith::ArithProjector;
pub use array::ArrayProjector;
pub use datatype::DatatypeProjector;
pub use literals::extract_literals;

use crate::mbqi::choose::TermChooser;
use crate::mbqi::fixer::ModelFixer;
use crate::mbqi::nested::eliminate_nested_vars;
use crate::mbqi::skeleton::QBody;
use mbqi_core::ast::{SortFamily, TermId, TermKind, TermManager};
use mbqi_core::error::{MbqiError, MbqiResult};
use mbqi_core::model::{Model, ValueClasses};
use mbqi_core::statistics::Statistics;
use rustc_hash::FxHashMap;
use std::fmt;
use tracing::trace;

/// Theory-specific projection of constants of one sort family.
pub trait ProjectPlugin {
    /// Sort family handled by the plugin.
    fn family(&self) -> SortFamily;

    /// Eliminate constants of the plugin's family from `fmls`. Eliminated
    /// constants are removed from `vars`. Returns whether anything changed.
    fn apply(
        &mut self,
        tm: &mut TermManager,
        model: &Model,
        vars: &mut Vec<TermId>,
        fmls: &mut Vec<TermId>,
    ) -> bool;

    /// Report plugin counters.
    fn collect_statistics(&self, _st: &mut Statistics) {}
}

/// Projection plugins indexed by sort family. At most one per family.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: FxHashMap<SortFamily, Box<dyn ProjectPlugin>>,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin. Fails when its family already has one.
    pub fn add(&mut self, plugin: Box<dyn ProjectPlugin>) -> MbqiResult<()> {
        let family = plugin.family();
        if self.plugins.contains_key(&family) {
            return Err(MbqiError::DuplicatePlugin(family));
        }
        self.plugins.insert(family, plugin);
        Ok(())
    }

    /// Plugin for a family.
    pub fn get_mut(&mut self, family: SortFamily) -> Option<&mut (dyn ProjectPlugin + 'static)> {
        self.plugins.get_mut(&family).map(|p| p.as_mut())
    }

    /// Whether a plugin is registered for `family`.
    pub fn contains(&self, family: SortFamily) -> bool {
        self.plugins.contains_key(&family)
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Report the counters of every plugin, in family order.
    pub fn collect_statistics(&self, st: &mut Statistics) {
        let mut families: Vec<SortFamily> = self.plugins.keys().copied().collect();
        families.sort();
        for family in families {
            if let Some(plugin) = self.plugins.get(&family) {
                plugin.collect_statistics(st);
            }
        }
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut families: Vec<SortFamily> = self.plugins.keys().copied().collect();
        families.sort();
        f.debug_struct("PluginRegistry")
            .field("families", &families)
            .finish()
    }
}

/// Statistics for projection
#[derive(Debug, Clone, Default)]
pub struct ProjectStats {
    /// Projection calls
    pub num_calls: usize,
    /// Calls that produced a ground formula
    pub num_projected: usize,
    /// Constants replaced by a model value representative
    pub num_value_replacements: usize,
}

impl fmt::Display for ProjectStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Projection Statistics:")?;
        writeln!(f, "  Calls: {}", self.num_calls)?;
        writeln!(f, "  Projected: {}", self.num_projected)?;
        writeln!(f, "  Value replacements: {}", self.num_value_replacements)
    }
}

/// Projects Skolem constants out of a specialized quantifier body.
#[derive(Debug, Default)]
pub struct Projector {
    plugins: PluginRegistry,
    stats: ProjectStats,
}

impl Projector {
    /// Create a projector without plugins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a projector with the arithmetic, datatype and array plugins.
    pub fn with_default_plugins() -> Self {
        let mut projector = Self::new();
        let defaults: [Box<dyn ProjectPlugin>; 3] = [
            Box::new(ArithProjector::new()),
            Box::new(DatatypeProjector::new()),
            Box::new(ArrayProjector::new()),
        ];
        for plugin in defaults {
            // Families are distinct, registration cannot fail.
            let _ = projector.plugins.add(plugin);
        }
        projector
    }

    /// Register a plugin.
    pub fn add_plugin(&mut self, plugin: Box<dyn ProjectPlugin>) -> MbqiResult<()> {
        self.plugins.add(plugin)
    }

    /// Registered plugins.
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Get statistics
    pub fn stats(&self) -> &ProjectStats {
        &self.stats
    }

    /// Report projection and plugin counters.
    pub fn collect_statistics(&self, st: &mut Statistics) {
        st.update("project-calls", self.stats.num_calls as u64);
        st.update("project-successes", self.stats.num_projected as u64);
        st.update("project-value-replacements", self.stats.num_value_replacements as u64);
        self.plugins.collect_statistics(st);
    }

    /// Ground formula implied by the negated body of `qb` under `mdl`.
    ///
    /// The Skolem values of `mdl` are recorded in `candidate`. Returns
    /// `None` when a Skolem value cannot be obtained or when a constant
    /// survives projection.
    #[allow(clippy::too_many_arguments)]
    pub fn solver_project(
        &mut self,
        tm: &mut TermManager,
        candidate: &mut Model,
        mdl: &Model,
        qb: &QBody,
        fixer: &mut dyn ModelFixer,
        chooser: &mut TermChooser,
        classes: &ValueClasses,
    ) -> Option<TermId> {
        self.stats.num_calls += 1;
        for &v in &qb.vars {
            let value = mdl.eval_with(tm, v, true)?;
            let decl = tm.const_decl(v)?;
            candidate.register_decl(decl, value);
        }
        let mut model = candidate.scoped_completion(true);

        let mut fmls = qb.vbody.clone();
        let mut vars = qb.vars.clone();
        let mut extracted = false;
        for &v in &qb.vars {
            if !vars.contains(&v) {
                continue;
            }
            let family = tm.family(tm.sort(v));
            let Some(plugin) = self.plugins.get_mut(family) else {
                continue;
            };
            if !extracted {
                fmls.extend(qb.domain_eqs.iter().copied());
                eliminate_nested_vars(tm, &model, fixer, classes, qb, &mut fmls);
                extract_literals(tm, &model, &mut fmls);
                extracted = true;
            }
            if plugin.apply(tm, &model, &mut vars, &mut fmls) {
                trace!(target: "mbqi", %family, remaining = vars.len(), "plugin projected");
            }
        }

        let mut rep: FxHashMap<TermId, TermId> = FxHashMap::default();
        for &v in &vars {
            let value = model.eval_with(tm, v, true)?;
            let value = model.unfold_as_array(tm, value);
            let term = chooser.replace_model_value(tm, classes, value);
            rep.insert(v, term);
            if value != term {
                rep.insert(value, term);
            }
            self.stats.num_value_replacements += 1;
        }
        drop(model);
        let fmls: Vec<TermId> = fmls.into_iter().map(|f| tm.replace(f, &rep)).collect();
        let result = tm.mk_and(fmls);
        if qb.vars.iter().any(|&v| tm.contains(result, v)) {
            return None;
        }
        self.stats.num_projected += 1;
        Some(result)
    }
}

/// Solve an equality `var = t` with `var` not occurring in `t`, substitute
/// `t` for `var` in the remaining formulas and drop the equality.
pub fn solve_eq(tm: &mut TermManager, var: TermId, fmls: &mut Vec<TermId>) -> bool {
    let mut solution = None;
    for (k, &f) in fmls.iter().enumerate() {
        let Some(TermKind::Eq(a, b)) = tm.get(f).map(|t| t.kind.clone()) else {
            continue;
        };
        if a == var && !tm.contains(b, var) {
            solution = Some((k, b));
            break;
        }
        if b == var && !tm.contains(a, var) {
            solution = Some((k, a));
            break;
        }
    }
    let Some((k, t)) = solution else {
        return false;
    };
    fmls.remove(k);
    substitute_var(tm, var, t, fmls);
    true
}

/// Replace `var` by `t` in every formula of `fmls`.
pub(crate) fn substitute_var(tm: &mut TermManager, var: TermId, t: TermId, fmls: &mut [TermId]) {
    let mut map = FxHashMap::default();
    map.insert(var, t);
    for f in fmls.iter_mut() {
        *f = tm.replace(*f, &map);
    }
}
