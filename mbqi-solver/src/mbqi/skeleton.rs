//! Quantifier skeletons and their scoped cache.
//!
//! A skeleton is built once per quantifier: one fresh Skolem constant per
//! bound variable, the negated body over those constants split into
//! conjuncts, and the argument positions of free function applications
//! that depend on the bound variables. The model-evaluated body is
//! refreshed on every call since the candidate model changes between
//! passes.

use crate::oracle::Oracle;
use lasso::Spur;
use mbqi_core::ast::{BoundVars, TermId, TermKind, TermManager};
use mbqi_core::model::Model;
use rustc_hash::FxHashMap;
use tracing::trace;

/// Skeleton of a quantifier.
#[derive(Debug, Clone)]
pub struct QBody {
    /// The (flattened) quantifier
    pub quantifier: TermId,
    /// Body over the bound variables
    pub body: TermId,
    /// Bound variables
    pub bound: BoundVars,
    /// Skolem constants, one per bound variable
    pub vars: Vec<TermId>,
    /// Negated body over the Skolem constants, as conjuncts
    pub vbody: Vec<TermId>,
    /// Negated body evaluated in the current model. `None` until the
    /// first successful evaluation.
    pub mbody: Option<TermId>,
    /// Free function applications over bound variables, with the indices
    /// of their non-ground arguments that are not free applications
    pub var_args: Vec<(TermId, usize)>,
    /// Domain restrictions over the Skolem constants for the current
    /// instantiation attempt
    pub domain_eqs: Vec<TermId>,
    /// Whether the quantifier is universal
    pub is_forall: bool,
    subst: FxHashMap<Spur, TermId>,
}

impl QBody {
    /// Replace the bound variables of `t` by the Skolem constants.
    pub fn instantiate(&self, tm: &mut TermManager, t: TermId) -> TermId {
        tm.substitute(t, &self.subst)
    }

    fn build(tm: &mut TermManager, q: TermId) -> Option<Self> {
        let (bound, body, is_forall) = match tm.get(q).map(|t| t.kind.clone())? {
            TermKind::Forall { vars, body } => (vars, body, true),
            TermKind::Exists { vars, body } => (vars, body, false),
            _ => return None,
        };
        let mut vars = Vec::with_capacity(bound.len());
        let mut subst = FxHashMap::default();
        for &(name, sort) in &bound {
            let prefix = tm.resolve(name).to_string();
            let sk = tm.mk_fresh_const(&prefix, sort);
            vars.push(sk);
            subst.insert(name, sk);
        }
        let ground = tm.substitute(body, &subst);
        let fml = if is_forall { tm.mk_not(ground) } else { ground };
        let mut vbody = Vec::new();
        tm.flatten_and(fml, &mut vbody);
        let var_args = extract_var_args(tm, body);
        Some(Self {
            quantifier: q,
            body,
            bound,
            vars,
            vbody,
            mbody: None,
            var_args,
            domain_eqs: Vec::new(),
            is_forall,
            subst,
        })
    }
}

/// Argument positions of free function applications in `body` holding a
/// non-ground term that is not itself a free application.
fn extract_var_args(tm: &TermManager, body: TermId) -> Vec<(TermId, usize)> {
    let mut out = Vec::new();
    for s in tm.subterms(body) {
        if tm.is_ground(s) || !tm.is_uninterp(s) {
            continue;
        }
        let Some(TermKind::Apply { args, .. }) = tm.get(s).map(|t| &t.kind) else {
            continue;
        };
        for (i, &arg) in args.iter().enumerate() {
            if !tm.is_ground(arg) && !tm.is_uninterp(arg) {
                out.push((s, i));
            }
        }
    }
    out
}

/// Merge directly nested quantifiers of the same kind into one
/// (`forall x. forall y. p` becomes `forall x y. p`). Nesting that
/// rebinds a name is left alone.
pub fn flatten_quantifier(tm: &mut TermManager, q: TermId) -> TermId {
    let Some((mut vars, mut body, is_forall)) = (match tm.get(q).map(|t| t.kind.clone()) {
        Some(TermKind::Forall { vars, body }) => Some((vars, body, true)),
        Some(TermKind::Exists { vars, body }) => Some((vars, body, false)),
        _ => None,
    }) else {
        return q;
    };
    let mut merged = false;
    loop {
        let inner = match tm.get(body).map(|t| t.kind.clone()) {
            Some(TermKind::Forall { vars, body }) if is_forall => (vars, body),
            Some(TermKind::Exists { vars, body }) if !is_forall => (vars, body),
            _ => break,
        };
        let (inner_vars, inner_body) = inner;
        if inner_vars
            .iter()
            .any(|(n, _)| vars.iter().any(|(m, _)| m == n))
        {
            break;
        }
        vars.extend(inner_vars);
        body = inner_body;
        merged = true;
    }
    if !merged {
        return q;
    }
    if is_forall {
        tm.mk_forall(vars, body)
    } else {
        tm.mk_exists(vars, body)
    }
}

/// Skeletons indexed by quantifier, with scopes mirroring the decision
/// levels of the enclosing context.
#[derive(Debug, Clone, Default)]
pub struct SkeletonCache {
    bodies: Vec<QBody>,
    index: FxHashMap<TermId, usize>,
    scopes: Vec<usize>,
}

impl SkeletonCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached skeletons.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Skeleton of `q`, if cached.
    pub fn get(&self, q: TermId) -> Option<&QBody> {
        self.index.get(&q).and_then(|&i| self.bodies.get(i))
    }

    /// Open a scope.
    pub fn push_scope(&mut self) {
        self.scopes.push(self.bodies.len());
    }

    /// Close `n` scopes, dropping the skeletons created inside them.
    pub fn pop_scope(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let keep = self.scopes.len().saturating_sub(n);
        let Some(&mark) = self.scopes.get(keep) else {
            return;
        };
        self.scopes.truncate(keep);
        for qb in self.bodies.drain(mark..) {
            self.index.remove(&qb.quantifier);
        }
    }

    /// Number of open scopes.
    pub fn num_scopes(&self) -> usize {
        self.scopes.len()
    }

    /// Drop every skeleton and scope.
    pub fn reset(&mut self) {
        self.bodies.clear();
        self.index.clear();
        self.scopes.clear();
    }

    /// Skeleton of `q` with `mbody` evaluated in `model`.
    ///
    /// Skolem constants ranging over an uninterpreted sort with a known
    /// universe are restricted to it in `oracle`. Returns `None` when `q`
    /// is not a quantifier or its body cannot be evaluated in `model`.
    pub fn specialize(
        &mut self,
        tm: &mut TermManager,
        oracle: &mut dyn Oracle,
        model: &Model,
        q: TermId,
    ) -> Option<&mut QBody> {
        let slot = match self.index.get(&q) {
            Some(&i) => i,
            None => {
                let qb = QBody::build(tm, q)?;
                self.bodies.push(qb);
                let i = self.bodies.len() - 1;
                self.index.insert(q, i);
                i
            }
        };
        let qb = self.bodies.get_mut(slot)?;

        // The oracle scope that received the restriction is gone by the
        // next call, so it is asserted again every time.
        for &sk in &qb.vars {
            let sort = tm.sort(sk);
            if model.has_uninterpreted_sort(sort) {
                let eqs: Vec<TermId> = model
                    .universe(sort)
                    .iter()
                    .map(|&u| tm.mk_eq(sk, u))
                    .collect();
                let restriction = tm.mk_or(eqs);
                oracle.assert_expr(restriction);
            }
        }

        let evaluated = model.eval_expr(tm, qb.body, true)?;
        let mbody = qb.instantiate(tm, evaluated);
        let mbody = if qb.is_forall { tm.mk_not(mbody) } else { mbody };
        trace!(target: "mbqi", mbody = %tm.display(mbody), "specialized");
        qb.mbody = Some(mbody);
        Some(qb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::EnumOracle;
    use smallvec::smallvec;

    fn forall_px(tm: &mut TermManager) -> (TermId, TermId) {
        let u = tm.mk_uninterpreted_sort("U");
        let b = tm.sorts.bool_sort;
        let p = tm.declare_fun("P", &[u], b);
        let x = tm.mk_var("x", u);
        let px = tm.mk_app(p, vec![x]);
        let name = tm.intern("x");
        let q = tm.mk_forall(smallvec![(name, u)], px);
        (q, px)
    }

    #[test]
    fn test_skeleton_negates_universal_body() {
        let mut tm = TermManager::new();
        let (q, px) = forall_px(&mut tm);
        let mut cache = SkeletonCache::new();
        let mut oracle = EnumOracle::default();
        let model = Model::new();
        let qb = cache
            .specialize(&mut tm, &mut oracle, &model, q)
            .expect("skeleton");
        assert!(qb.is_forall);
        assert_eq!(qb.vars.len(), 1);
        let sk = qb.vars[0];
        assert!(tm.is_uninterp_const(sk));
        let psk = qb.instantiate(&mut tm, px);
        let expected = tm.mk_not(psk);
        assert_eq!(qb.vbody, vec![expected]);
        assert_eq!(qb.var_args, vec![(px, 0)]);
    }

    #[test]
    fn test_specialize_is_cached() {
        let mut tm = TermManager::new();
        let (q, _) = forall_px(&mut tm);
        let mut cache = SkeletonCache::new();
        let mut oracle = EnumOracle::default();
        let model = Model::new();
        let first = cache
            .specialize(&mut tm, &mut oracle, &model, q)
            .map(|qb| (qb.vars.clone(), qb.vbody.clone()))
            .expect("skeleton");
        let second = cache
            .specialize(&mut tm, &mut oracle, &model, q)
            .map(|qb| (qb.vars.clone(), qb.vbody.clone()))
            .expect("skeleton");
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_universe_restriction_is_asserted() {
        let mut tm = TermManager::new();
        let (q, _) = forall_px(&mut tm);
        let u = tm.mk_uninterpreted_sort("U");
        let elems: Vec<TermId> = (0..3).map(|i| tm.mk_value(u, i)).collect();
        let mut model = Model::new();
        model.set_universe(u, elems.clone());
        let mut cache = SkeletonCache::new();
        let mut oracle = EnumOracle::default();
        let sk = cache
            .specialize(&mut tm, &mut oracle, &model, q)
            .map(|qb| qb.vars[0])
            .expect("skeleton");
        let eqs: Vec<TermId> = elems.iter().map(|&e| tm.mk_eq(sk, e)).collect();
        let restriction = tm.mk_or(eqs);
        assert_eq!(oracle.assertions(), &[restriction]);
    }

    #[test]
    fn test_var_args_skip_ground_and_free_arguments() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let g = tm.declare_fun("g", &[int, int, int], int);
        let h = tm.declare_fun("h", &[int], int);
        let x = tm.mk_var("x", int);
        let c = tm.mk_const("c", int);
        let one = tm.mk_int(1);
        let x1 = tm.mk_add(vec![x, one]);
        let hx = tm.mk_app(h, vec![x]);
        // in g(x + 1, h(x), c) the free application and the constant are skipped
        let app = tm.mk_app(g, vec![x1, hx, c]);
        let zero = tm.mk_int(0);
        let body = tm.mk_gt(app, zero);
        assert_eq!(extract_var_args(&tm, body), vec![(hx, 0), (app, 0)]);
    }

    #[test]
    fn test_pop_scope_drops_newer_skeletons() {
        let mut tm = TermManager::new();
        let (q, _) = forall_px(&mut tm);
        let mut cache = SkeletonCache::new();
        let mut oracle = EnumOracle::default();
        let model = Model::new();
        cache.push_scope();
        assert!(cache.specialize(&mut tm, &mut oracle, &model, q).is_some());
        assert!(cache.get(q).is_some());
        cache.pop_scope(1);
        assert!(cache.get(q).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.num_scopes(), 0);
    }

    #[test]
    fn test_flatten_nested_universals() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let y = tm.mk_var("y", int);
        let lt = tm.mk_lt(x, y);
        let nx = tm.intern("x");
        let ny = tm.intern("y");
        let inner = tm.mk_forall(smallvec![(ny, int)], lt);
        let outer = tm.mk_forall(smallvec![(nx, int)], inner);
        let flat = flatten_quantifier(&mut tm, outer);
        let expected = tm.mk_forall(smallvec![(nx, int), (ny, int)], lt);
        assert_eq!(flat, expected);

        let shadowed = tm.mk_forall(smallvec![(nx, int)], outer);
        assert_eq!(flatten_quantifier(&mut tm, shadowed), shadowed);
    }
}
