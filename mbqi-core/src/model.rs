//! Candidate models: interpretations, evaluation and model completion.
//!
//! A [`Model`] interprets uninterpreted constants and functions, records
//! the finite universe chosen for each uninterpreted sort, and evaluates
//! terms against that interpretation. Evaluation comes in two flavours:
//!
//! - [`Model::eval`] reduces a term to a value, or fails.
//! - [`Model::eval_expr`] is partial: bound variables and symbols without
//!   interpretation stay symbolic, and applications of interpreted
//!   functions to symbolic arguments unfold into an `ite` chain over the
//!   function's entries.
//!
//! With model completion enabled, any symbol without interpretation
//! evaluates to the default value of its sort.

use crate::ast::{Args, FuncId, FuncKind, SortId, SortKind, TermId, TermKind, TermManager};
use num_bigint::BigInt;
use num_traits::{One, Zero};
use rustc_hash::FxHashMap;
use std::ops::{Deref, DerefMut};

/// Recursion limit when building default values of datatypes.
const MAX_DEFAULT_DEPTH: usize = 8;

/// One point of a function graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncEntry {
    /// Argument values
    pub args: Args,
    /// Result value
    pub result: TermId,
}

/// Finite graph of a function plus an optional default.
#[derive(Debug, Clone, Default)]
pub struct FuncInterp {
    /// Explicit points, first match wins
    pub entries: Vec<FuncEntry>,
    /// Value outside the explicit points
    pub else_value: Option<TermId>,
}

impl FuncInterp {
    /// Create an empty interpretation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a point to the graph.
    pub fn add_entry(&mut self, args: impl IntoIterator<Item = TermId>, result: TermId) {
        self.entries.push(FuncEntry {
            args: args.into_iter().collect(),
            result,
        });
    }

    /// Set the default value.
    pub fn set_else(&mut self, value: TermId) {
        self.else_value = Some(value);
    }

    /// Whether the interpretation has no default.
    pub fn is_partial(&self) -> bool {
        self.else_value.is_none()
    }

    /// Look up the value at `args`.
    pub fn lookup(&self, args: &[TermId]) -> Option<TermId> {
        self.entries
            .iter()
            .find(|e| e.args.as_slice() == args)
            .map(|e| e.result)
            .or(self.else_value)
    }

    /// Most frequent result among the entries. Ties go to the result seen
    /// first.
    pub fn max_occurrence_result(&self) -> Option<TermId> {
        let mut counts: FxHashMap<TermId, usize> = FxHashMap::default();
        let mut best: Option<(TermId, usize)> = None;
        for entry in &self.entries {
            let count = counts.entry(entry.result).or_insert(0);
            *count += 1;
            match best {
                Some((_, n)) if n >= *count => {}
                _ => best = Some((entry.result, *count)),
            }
        }
        best.map(|(t, _)| t)
    }
}

/// Interpretation of uninterpreted symbols.
#[derive(Debug, Clone, Default)]
pub struct Model {
    consts: FxHashMap<FuncId, TermId>,
    funcs: FxHashMap<FuncId, FuncInterp>,
    universes: FxHashMap<SortId, Vec<TermId>>,
    completion: bool,
}

impl Model {
    /// Create an empty model with completion disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpret a 0-ary declaration.
    pub fn register_decl(&mut self, decl: FuncId, value: TermId) {
        self.consts.insert(decl, value);
    }

    /// Interpret a function declaration.
    pub fn register_func(&mut self, decl: FuncId, interp: FuncInterp) {
        self.funcs.insert(decl, interp);
    }

    /// Value of a 0-ary declaration.
    pub fn const_value(&self, decl: FuncId) -> Option<TermId> {
        self.consts.get(&decl).copied()
    }

    /// Interpretation of a function.
    pub fn func_interp(&self, decl: FuncId) -> Option<&FuncInterp> {
        self.funcs.get(&decl)
    }

    /// Mutable interpretation of a function.
    pub fn func_interp_mut(&mut self, decl: FuncId) -> Option<&mut FuncInterp> {
        self.funcs.get_mut(&decl)
    }

    /// All function interpretations.
    pub fn funcs(&self) -> impl Iterator<Item = (FuncId, &FuncInterp)> {
        self.funcs.iter().map(|(&f, i)| (f, i))
    }

    /// All constant interpretations.
    pub fn consts(&self) -> impl Iterator<Item = (FuncId, TermId)> + '_ {
        self.consts.iter().map(|(&f, &v)| (f, v))
    }

    /// Fix the universe of an uninterpreted sort.
    pub fn set_universe(&mut self, sort: SortId, elems: Vec<TermId>) {
        self.universes.insert(sort, elems);
    }

    /// Universe of an uninterpreted sort.
    pub fn universe(&self, sort: SortId) -> &[TermId] {
        self.universes.get(&sort).map_or(&[], |u| u.as_slice())
    }

    /// Whether the model fixes a non-empty universe for `sort`.
    pub fn has_uninterpreted_sort(&self, sort: SortId) -> bool {
        self.universes.get(&sort).is_some_and(|u| !u.is_empty())
    }

    /// Whether model completion is enabled.
    pub fn completion(&self) -> bool {
        self.completion
    }

    /// Enable or disable model completion.
    pub fn set_completion(&mut self, on: bool) {
        self.completion = on;
    }

    /// Switch completion for the lifetime of the returned guard.
    pub fn scoped_completion(&mut self, on: bool) -> CompletionScope<'_> {
        let previous = self.completion;
        self.completion = on;
        CompletionScope {
            model: self,
            previous,
        }
    }

    /// Evaluate `t` to a value using the model's completion flag.
    pub fn eval(&self, tm: &mut TermManager, t: TermId) -> Option<TermId> {
        self.eval_with(tm, t, self.completion)
    }

    /// Evaluate `t` to a value.
    pub fn eval_with(&self, tm: &mut TermManager, t: TermId, completion: bool) -> Option<TermId> {
        let mut ev = Evaluator::new(self, completion);
        let r = ev.eval(tm, t);
        if ev.failed || !tm.is_value(r) {
            return None;
        }
        Some(r)
    }

    /// Partially evaluate `t`. Bound variables stay symbolic.
    pub fn eval_expr(&self, tm: &mut TermManager, t: TermId, completion: bool) -> Option<TermId> {
        let mut ev = Evaluator::new(self, completion);
        let r = ev.eval(tm, t);
        if ev.failed { None } else { Some(r) }
    }

    /// Whether `t` evaluates to `true`.
    pub fn is_true(&self, tm: &mut TermManager, t: TermId) -> bool {
        self.eval(tm, t).is_some_and(|v| tm.is_true(v))
    }

    /// Whether `t` evaluates to `false`.
    pub fn is_false(&self, tm: &mut TermManager, t: TermId) -> bool {
        self.eval(tm, t).is_some_and(|v| tm.is_false(v))
    }

    /// Replace an `as-array` value by an explicit store chain over a
    /// constant array. Other terms are returned unchanged.
    pub fn unfold_as_array(&self, tm: &mut TermManager, t: TermId) -> TermId {
        let Some(TermKind::AsArray(func)) = tm.get(t).map(|t| t.kind.clone()) else {
            return t;
        };
        let sort = tm.sort(t);
        let Some(elem) = (match tm.sort_kind(sort) {
            Some(SortKind::Array { elem, .. }) => Some(*elem),
            _ => None,
        }) else {
            return t;
        };
        let Some(interp) = self.funcs.get(&func) else {
            return t;
        };
        let base_value = match interp.else_value {
            Some(v) => v,
            None => match self.default_value(tm, elem) {
                Some(v) => v,
                None => return t,
            },
        };
        let mut result = tm.mk_const_array(sort, base_value);
        for entry in interp.entries.iter().rev() {
            if let Some(&index) = entry.args.first() {
                result = tm.mk_store(result, index, entry.result);
            }
        }
        normalize_array(tm, result)
    }

    /// Default value of a sort used by model completion.
    pub fn default_value(&self, tm: &mut TermManager, sort: SortId) -> Option<TermId> {
        self.default_value_at(tm, sort, 0)
    }

    fn default_value_at(&self, tm: &mut TermManager, sort: SortId, depth: usize) -> Option<TermId> {
        if depth > MAX_DEFAULT_DEPTH {
            return None;
        }
        let kind = tm.sort_kind(sort)?.clone();
        match kind {
            SortKind::Bool => Some(tm.mk_false()),
            SortKind::Int => Some(tm.mk_int(0)),
            SortKind::Uninterpreted(_) => Some(
                self.universe(sort)
                    .first()
                    .copied()
                    .unwrap_or_else(|| tm.mk_value(sort, 0)),
            ),
            SortKind::Array { elem, .. } => {
                let v = self.default_value_at(tm, elem, depth + 1)?;
                Some(tm.mk_const_array(sort, v))
            }
            SortKind::Datatype(_) => {
                let ctors = tm.constructors(sort).to_vec();
                'ctor: for ctor in ctors {
                    let domain = match tm.func(ctor) {
                        Some(d) => d.domain.clone(),
                        None => continue,
                    };
                    let mut args = Args::new();
                    for field in domain {
                        match self.default_value_at(tm, field, depth + 1) {
                            Some(v) => args.push(v),
                            None => continue 'ctor,
                        }
                    }
                    return Some(tm.mk_app(ctor, args));
                }
                None
            }
        }
    }
}

/// Restores the completion flag of a [`Model`] when dropped.
pub struct CompletionScope<'a> {
    model: &'a mut Model,
    previous: bool,
}

impl Deref for CompletionScope<'_> {
    type Target = Model;

    fn deref(&self) -> &Model {
        self.model
    }
}

impl DerefMut for CompletionScope<'_> {
    fn deref_mut(&mut self) -> &mut Model {
        self.model
    }
}

impl Drop for CompletionScope<'_> {
    fn drop(&mut self) {
        self.model.completion = self.previous;
    }
}

/// Bring an array value into canonical form: a store chain with indices
/// in ascending id order over a constant array, without stores that
/// repeat the default. Equal array values become the same term.
pub fn normalize_array(tm: &mut TermManager, t: TermId) -> TermId {
    let mut points: Vec<(TermId, TermId)> = Vec::new();
    let mut cur = t;
    loop {
        match tm.get(cur).map(|t| t.kind.clone()) {
            Some(TermKind::Store(a, i, v)) => {
                if !tm.is_value(i) || !tm.is_value(v) {
                    return t;
                }
                if !points.iter().any(|&(j, _)| j == i) {
                    points.push((i, v));
                }
                cur = a;
            }
            Some(TermKind::ConstArray(default)) => {
                let sort = tm.sort(t);
                points.retain(|&(_, v)| v != default);
                points.sort_by_key(|&(i, _)| i);
                let mut result = tm.mk_const_array(sort, default);
                for (i, v) in points {
                    result = tm.mk_store(result, i, v);
                }
                return result;
            }
            _ => return t,
        }
    }
}

/// Read a normalized array value at a value index.
fn select_value(model: &Model, tm: &mut TermManager, array: TermId, index: TermId) -> Option<TermId> {
    let mut cur = array;
    loop {
        match tm.get(cur).map(|t| t.kind.clone())? {
            TermKind::Store(a, i, v) => {
                if i == index {
                    return Some(v);
                }
                if !tm.is_value(i) {
                    return None;
                }
                cur = a;
            }
            TermKind::ConstArray(v) => return Some(v),
            TermKind::AsArray(func) => return model.funcs.get(&func)?.lookup(&[index]),
            _ => return None,
        }
    }
}

/// Evaluation of one term with a shared cache.
struct Evaluator<'a> {
    model: &'a Model,
    completion: bool,
    cache: FxHashMap<TermId, TermId>,
    failed: bool,
}

impl<'a> Evaluator<'a> {
    fn new(model: &'a Model, completion: bool) -> Self {
        Self {
            model,
            completion,
            cache: FxHashMap::default(),
            failed: false,
        }
    }

    fn eval(&mut self, tm: &mut TermManager, t: TermId) -> TermId {
        if let Some(&r) = self.cache.get(&t) {
            return r;
        }
        let r = self.eval_core(tm, t);
        self.cache.insert(t, r);
        r
    }

    fn eval_core(&mut self, tm: &mut TermManager, t: TermId) -> TermId {
        let Some(term) = tm.get(t) else {
            self.failed = true;
            return t;
        };
        let kind = term.kind.clone();
        let sort = term.sort;
        match kind {
            TermKind::True
            | TermKind::False
            | TermKind::IntConst(_)
            | TermKind::Var(_)
            | TermKind::Value(_)
            | TermKind::AsArray(_) => t,
            TermKind::Forall { .. } | TermKind::Exists { .. } => {
                self.failed = true;
                t
            }
            TermKind::Not(a) => {
                let a = self.eval(tm, a);
                tm.mk_not(a)
            }
            TermKind::And(args) => {
                let args: Args = args.iter().map(|&a| self.eval(tm, a)).collect();
                tm.mk_and(args)
            }
            TermKind::Or(args) => {
                let args: Args = args.iter().map(|&a| self.eval(tm, a)).collect();
                tm.mk_or(args)
            }
            TermKind::Implies(a, b) => {
                let a = self.eval(tm, a);
                let b = self.eval(tm, b);
                let na = tm.mk_not(a);
                tm.mk_or(vec![na, b])
            }
            TermKind::Ite(c, a, b) => {
                let c = self.eval(tm, c);
                if tm.is_true(c) {
                    return self.eval(tm, a);
                }
                if tm.is_false(c) {
                    return self.eval(tm, b);
                }
                let a = self.eval(tm, a);
                let b = self.eval(tm, b);
                tm.mk_ite(c, a, b)
            }
            TermKind::Eq(a, b) => {
                let a = self.eval(tm, a);
                let b = self.eval(tm, b);
                if tm.is_value(a) && tm.is_value(b) {
                    let a = normalize_array(tm, a);
                    let b = normalize_array(tm, b);
                    return tm.mk_bool(a == b);
                }
                tm.mk_eq(a, b)
            }
            TermKind::Add(args) => {
                let args: Args = args.iter().map(|&a| self.eval(tm, a)).collect();
                match int_values(tm, &args) {
                    Some(vals) => tm.mk_int(vals.into_iter().fold(BigInt::zero(), |s, v| s + v)),
                    None => tm.mk_add(args),
                }
            }
            TermKind::Mul(args) => {
                let args: Args = args.iter().map(|&a| self.eval(tm, a)).collect();
                match int_values(tm, &args) {
                    Some(vals) => tm.mk_int(vals.into_iter().fold(BigInt::one(), |s, v| s * v)),
                    None => tm.mk_mul(args),
                }
            }
            TermKind::Sub(a, b) => {
                let a = self.eval(tm, a);
                let b = self.eval(tm, b);
                match (tm.int_value(a), tm.int_value(b)) {
                    (Some(x), Some(y)) => {
                        let r = x - y;
                        tm.mk_int(r)
                    }
                    _ => tm.mk_sub(a, b),
                }
            }
            TermKind::Neg(a) => {
                let a = self.eval(tm, a);
                match tm.int_value(a) {
                    Some(x) => {
                        let r = -x;
                        tm.mk_int(r)
                    }
                    None => tm.mk_neg(a),
                }
            }
            TermKind::Lt(a, b) => self.eval_cmp(tm, a, b, |x, y| x < y, TermManager::mk_lt),
            TermKind::Le(a, b) => self.eval_cmp(tm, a, b, |x, y| x <= y, TermManager::mk_le),
            TermKind::Gt(a, b) => self.eval_cmp(tm, a, b, |x, y| x > y, TermManager::mk_gt),
            TermKind::Ge(a, b) => self.eval_cmp(tm, a, b, |x, y| x >= y, TermManager::mk_ge),
            TermKind::Apply { func, args } => self.eval_app(tm, t, sort, func, &args),
            TermKind::Select(a, i) => {
                let a = self.eval(tm, a);
                let i = self.eval(tm, i);
                if tm.is_value(a) && tm.is_value(i) {
                    let a = normalize_array(tm, a);
                    if let Some(v) = select_value(self.model, tm, a, i) {
                        return v;
                    }
                    if self.completion
                        && let Some(v) = self.model.default_value(tm, sort)
                    {
                        return v;
                    }
                }
                tm.mk_select(a, i)
            }
            TermKind::Store(a, i, v) => {
                let a = self.eval(tm, a);
                let i = self.eval(tm, i);
                let v = self.eval(tm, v);
                let r = tm.mk_store(a, i, v);
                normalize_array(tm, r)
            }
            TermKind::ConstArray(v) => {
                let v = self.eval(tm, v);
                tm.mk_const_array(sort, v)
            }
        }
    }

    fn eval_cmp(
        &mut self,
        tm: &mut TermManager,
        a: TermId,
        b: TermId,
        cmp: fn(&BigInt, &BigInt) -> bool,
        rebuild: fn(&mut TermManager, TermId, TermId) -> TermId,
    ) -> TermId {
        let a = self.eval(tm, a);
        let b = self.eval(tm, b);
        let folded = match (tm.int_value(a), tm.int_value(b)) {
            (Some(x), Some(y)) => Some(cmp(x, y)),
            _ => None,
        };
        match folded {
            Some(v) => tm.mk_bool(v),
            None => rebuild(tm, a, b),
        }
    }

    fn eval_app(
        &mut self,
        tm: &mut TermManager,
        t: TermId,
        sort: SortId,
        func: FuncId,
        args: &[TermId],
    ) -> TermId {
        let Some(decl) = tm.func(func) else {
            self.failed = true;
            return t;
        };
        let kind = decl.kind;
        let range = decl.range;
        let model = self.model;
        let args: Args = args.iter().map(|&a| self.eval(tm, a)).collect();
        match kind {
            FuncKind::Constructor => tm.mk_app(func, args),
            FuncKind::Selector { ctor, field } => {
                let arg = args.first().copied().unwrap_or(t);
                match tm.get(arg).map(|t| t.kind.clone()) {
                    Some(TermKind::Apply { func: f, args: inner }) if f == ctor => {
                        inner.get(field).copied().unwrap_or(t)
                    }
                    _ if tm.is_value(arg) => self.complete(tm, t, range),
                    _ => tm.mk_app(func, args),
                }
            }
            FuncKind::Tester(ctor) => {
                let arg = args.first().copied().unwrap_or(t);
                if tm.is_value(arg)
                    && let Some(TermKind::Apply { func: f, .. }) = tm.get(arg).map(|t| &t.kind)
                {
                    let is_ctor = *f == ctor;
                    return tm.mk_bool(is_ctor);
                }
                tm.mk_app(func, args)
            }
            FuncKind::Uninterpreted if args.is_empty() => match model.const_value(func) {
                Some(v) => v,
                None => self.complete(tm, t, sort),
            },
            FuncKind::Uninterpreted => {
                let Some(interp) = model.func_interp(func) else {
                    let app = tm.mk_app(func, args);
                    return self.complete(tm, app, range);
                };
                if args.iter().all(|&a| tm.is_value(a)) {
                    if let Some(v) = interp.lookup(&args) {
                        return v;
                    }
                    let app = tm.mk_app(func, args);
                    return self.complete(tm, app, range);
                }
                self.unfold_app(tm, func, &args, interp, range)
            }
        }
    }

    /// `f(args)` with symbolic arguments becomes
    /// `ite(args = e1.args, e1.result, ite(..., else))`.
    fn unfold_app(
        &mut self,
        tm: &mut TermManager,
        func: FuncId,
        args: &[TermId],
        interp: &FuncInterp,
        range: SortId,
    ) -> TermId {
        let mut result = match interp.else_value {
            Some(v) => v,
            None => {
                let app = tm.mk_app(func, args.iter().copied());
                self.complete(tm, app, range)
            }
        };
        for entry in interp.entries.iter().rev() {
            let eqs: Vec<TermId> = args
                .iter()
                .zip(entry.args.iter())
                .map(|(&a, &v)| tm.mk_eq(a, v))
                .collect();
            let cond = tm.mk_and(eqs);
            result = tm.mk_ite(cond, entry.result, result);
        }
        result
    }

    /// Value for a symbol without interpretation.
    fn complete(&mut self, tm: &mut TermManager, t: TermId, sort: SortId) -> TermId {
        if !self.completion {
            return t;
        }
        match self.model.default_value(tm, sort) {
            Some(v) => v,
            None => {
                self.failed = true;
                t
            }
        }
    }
}

fn int_values(tm: &TermManager, args: &[TermId]) -> Option<Vec<BigInt>> {
    args.iter().map(|&a| tm.int_value(a).cloned()).collect()
}

/// Equivalence classes of ground terms keyed by their model value.
#[derive(Debug, Clone, Default)]
pub struct ValueClasses {
    classes: FxHashMap<TermId, Vec<TermId>>,
}

impl ValueClasses {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `term` has model value `value`.
    pub fn add(&mut self, value: TermId, term: TermId) {
        let class = self.classes.entry(value).or_default();
        if !class.contains(&term) {
            class.push(term);
        }
    }

    /// Ground terms with value `value`, in insertion order.
    pub fn class(&self, value: TermId) -> &[TermId] {
        self.classes.get(&value).map_or(&[], |c| c.as_slice())
    }

    /// Whether `value` has a non-empty class.
    pub fn contains(&self, value: TermId) -> bool {
        !self.class(value).is_empty()
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class was recorded.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterate over `(value, class)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, &[TermId])> {
        self.classes.iter().map(|(&v, c)| (v, c.as_slice()))
    }
}
