//! Hash-consed terms, sorts and function declarations.
//!
//! Every term lives in a [`TermManager`] arena and is referred to by a
//! [`TermId`]. Construction goes through a hash-consing table, so two terms
//! with the same structure and sort always share one id. The MBQI engine
//! relies on this: quantifier identity, instance identity and the
//! replacement of `f(sk)` applications are all plain id comparisons.

use lasso::{Rodeo, Spur};
use num_bigint::BigInt;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::{SmallVec, smallvec};
use std::fmt;

/// Identifier of a term in a [`TermManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TermId(pub u32);

impl TermId {
    /// Create a term id from its raw index.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw index into the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortId(pub u32);

impl SortId {
    /// Create a sort id from its raw index.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Identifier of a function declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncId(pub u32);

/// Argument list of an n-ary term.
pub type Args = SmallVec<[TermId; 4]>;

/// Bound variables of a quantifier: `(name, sort)` in binding order.
pub type BoundVars = SmallVec<[(Spur, SortId); 4]>;

/// Structure of a sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortKind {
    /// Booleans
    Bool,
    /// Mathematical integers
    Int,
    /// Uninterpreted sort with a name
    Uninterpreted(Spur),
    /// Arrays from `index` to `elem`
    Array {
        /// Index sort
        index: SortId,
        /// Element sort
        elem: SortId,
    },
    /// Algebraic datatype with a name
    Datatype(Spur),
}

/// Theory family of a sort. Projection plugins are keyed by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SortFamily {
    /// Booleans
    Basic,
    /// Integer arithmetic
    Arith,
    /// Arrays
    Array,
    /// Algebraic datatypes
    Datatype,
    /// Uninterpreted sorts
    Uninterpreted,
}

impl fmt::Display for SortFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Arith => write!(f, "arith"),
            Self::Array => write!(f, "array"),
            Self::Datatype => write!(f, "datatype"),
            Self::Uninterpreted => write!(f, "uninterpreted"),
        }
    }
}

/// What a function declaration denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuncKind {
    /// Free symbol interpreted by the model
    Uninterpreted,
    /// Datatype constructor
    Constructor,
    /// Field accessor of a constructor
    Selector {
        /// Constructor owning the field
        ctor: FuncId,
        /// Field position
        field: usize,
    },
    /// Constructor recognizer
    Tester(FuncId),
}

/// A function declaration.
#[derive(Debug, Clone)]
pub struct FuncDecl {
    /// Symbol name
    pub name: Spur,
    /// Argument sorts
    pub domain: SmallVec<[SortId; 4]>,
    /// Result sort
    pub range: SortId,
    /// Declaration kind
    pub kind: FuncKind,
}

/// Selectors and tester generated for a constructor.
#[derive(Debug, Clone, Default)]
pub struct ConstructorInfo {
    /// Field selectors in field order
    pub selectors: Vec<FuncId>,
    /// Recognizer `is-C`
    pub tester: Option<FuncId>,
}

/// Shape of a term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// Boolean true
    True,
    /// Boolean false
    False,
    /// Integer literal
    IntConst(BigInt),
    /// Bound variable
    Var(Spur),
    /// Model-internal element of an uninterpreted sort
    Value(u32),
    /// Negation
    Not(TermId),
    /// Conjunction
    And(Args),
    /// Disjunction
    Or(Args),
    /// Implication
    Implies(TermId, TermId),
    /// If-then-else
    Ite(TermId, TermId, TermId),
    /// Equality
    Eq(TermId, TermId),
    /// Sum
    Add(Args),
    /// Difference
    Sub(TermId, TermId),
    /// Unary minus
    Neg(TermId),
    /// Product
    Mul(Args),
    /// Less than
    Lt(TermId, TermId),
    /// Less or equal
    Le(TermId, TermId),
    /// Greater than
    Gt(TermId, TermId),
    /// Greater or equal
    Ge(TermId, TermId),
    /// Function application (uninterpreted, constructor, selector, tester)
    Apply {
        /// Declaration
        func: FuncId,
        /// Arguments
        args: Args,
    },
    /// Array read
    Select(TermId, TermId),
    /// Array write
    Store(TermId, TermId, TermId),
    /// Constant array
    ConstArray(TermId),
    /// Array given by the graph of a unary function
    AsArray(FuncId),
    /// Universal quantifier
    Forall {
        /// Bound variables
        vars: BoundVars,
        /// Body
        body: TermId,
    },
    /// Existential quantifier
    Exists {
        /// Bound variables
        vars: BoundVars,
        /// Body
        body: TermId,
    },
}

/// A term: its shape and its sort.
#[derive(Debug, Clone)]
pub struct Term {
    /// Shape
    pub kind: TermKind,
    /// Sort
    pub sort: SortId,
}

/// Built-in sorts, created with every manager.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinSorts {
    /// `Bool`
    pub bool_sort: SortId,
    /// `Int`
    pub int_sort: SortId,
}

/// Arena and factory for terms, sorts and declarations.
#[derive(Debug)]
pub struct TermManager {
    terms: Vec<Term>,
    term_cache: FxHashMap<(TermKind, SortId), TermId>,
    sort_kinds: Vec<SortKind>,
    sort_cache: FxHashMap<SortKind, SortId>,
    datatype_ctors: FxHashMap<SortId, Vec<FuncId>>,
    ctor_info: FxHashMap<FuncId, ConstructorInfo>,
    funcs: Vec<FuncDecl>,
    const_decls: FxHashMap<(Spur, SortId), FuncId>,
    names: Rodeo,
    fresh_counter: u32,
    /// Built-in sorts
    pub sorts: BuiltinSorts,
}

impl Default for TermManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TermManager {
    /// Create a manager with the built-in sorts registered.
    pub fn new() -> Self {
        let mut tm = Self {
            terms: Vec::new(),
            term_cache: FxHashMap::default(),
            sort_kinds: Vec::new(),
            sort_cache: FxHashMap::default(),
            datatype_ctors: FxHashMap::default(),
            ctor_info: FxHashMap::default(),
            funcs: Vec::new(),
            const_decls: FxHashMap::default(),
            names: Rodeo::default(),
            fresh_counter: 0,
            sorts: BuiltinSorts {
                bool_sort: SortId(0),
                int_sort: SortId(1),
            },
        };
        tm.sorts.bool_sort = tm.intern_sort(SortKind::Bool);
        tm.sorts.int_sort = tm.intern_sort(SortKind::Int);
        tm
    }

    /// Intern a symbol name.
    pub fn intern(&mut self, name: &str) -> Spur {
        self.names.get_or_intern(name)
    }

    /// Resolve an interned name.
    pub fn resolve(&self, name: Spur) -> &str {
        self.names.resolve(&name)
    }

    /// Number of terms created so far.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether no term was created yet.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    // ----- sorts -------------------------------------------------------

    fn intern_sort(&mut self, kind: SortKind) -> SortId {
        if let Some(&id) = self.sort_cache.get(&kind) {
            return id;
        }
        let id = SortId(self.sort_kinds.len() as u32);
        self.sort_kinds.push(kind.clone());
        self.sort_cache.insert(kind, id);
        id
    }

    /// Declare (or look up) an uninterpreted sort.
    pub fn mk_uninterpreted_sort(&mut self, name: &str) -> SortId {
        let name = self.intern(name);
        self.intern_sort(SortKind::Uninterpreted(name))
    }

    /// Array sort from `index` to `elem`.
    pub fn mk_array_sort(&mut self, index: SortId, elem: SortId) -> SortId {
        self.intern_sort(SortKind::Array { index, elem })
    }

    /// Declare a datatype sort. Constructors are added with
    /// [`TermManager::add_constructor`].
    pub fn declare_datatype(&mut self, name: &str) -> SortId {
        let name = self.intern(name);
        let sort = self.intern_sort(SortKind::Datatype(name));
        self.datatype_ctors.entry(sort).or_default();
        sort
    }

    /// Add a constructor with named fields to a datatype, creating its
    /// selectors and tester.
    pub fn add_constructor(
        &mut self,
        datatype: SortId,
        name: &str,
        fields: &[(&str, SortId)],
    ) -> FuncId {
        let domain: SmallVec<[SortId; 4]> = fields.iter().map(|&(_, s)| s).collect();
        let ctor = self.push_func(name, domain, datatype, FuncKind::Constructor);
        let mut info = ConstructorInfo::default();
        for (field, &(field_name, field_sort)) in fields.iter().enumerate() {
            let sel = self.push_func(
                field_name,
                smallvec![datatype],
                field_sort,
                FuncKind::Selector { ctor, field },
            );
            info.selectors.push(sel);
        }
        let tester_name = format!("is-{}", name);
        let bool_sort = self.sorts.bool_sort;
        info.tester = Some(self.push_func(
            &tester_name,
            smallvec![datatype],
            bool_sort,
            FuncKind::Tester(ctor),
        ));
        self.ctor_info.insert(ctor, info);
        self.datatype_ctors.entry(datatype).or_default().push(ctor);
        ctor
    }

    /// Constructors of a datatype, in declaration order.
    pub fn constructors(&self, datatype: SortId) -> &[FuncId] {
        self.datatype_ctors
            .get(&datatype)
            .map_or(&[], |ctors| ctors.as_slice())
    }

    /// Selectors and tester of a constructor.
    pub fn constructor_info(&self, ctor: FuncId) -> Option<&ConstructorInfo> {
        self.ctor_info.get(&ctor)
    }

    /// Structure of a sort.
    pub fn sort_kind(&self, sort: SortId) -> Option<&SortKind> {
        self.sort_kinds.get(sort.0 as usize)
    }

    /// Theory family of a sort.
    pub fn family(&self, sort: SortId) -> SortFamily {
        match self.sort_kind(sort) {
            Some(SortKind::Int) => SortFamily::Arith,
            Some(SortKind::Array { .. }) => SortFamily::Array,
            Some(SortKind::Datatype(_)) => SortFamily::Datatype,
            Some(SortKind::Uninterpreted(_)) => SortFamily::Uninterpreted,
            Some(SortKind::Bool) | None => SortFamily::Basic,
        }
    }

    /// Whether `sort` is an uninterpreted sort.
    pub fn is_uninterpreted_sort(&self, sort: SortId) -> bool {
        matches!(self.sort_kind(sort), Some(SortKind::Uninterpreted(_)))
    }

    // ----- declarations ------------------------------------------------

    fn push_func(
        &mut self,
        name: &str,
        domain: SmallVec<[SortId; 4]>,
        range: SortId,
        kind: FuncKind,
    ) -> FuncId {
        let name = self.intern(name);
        let id = FuncId(self.funcs.len() as u32);
        self.funcs.push(FuncDecl {
            name,
            domain,
            range,
            kind,
        });
        id
    }

    /// Declare an uninterpreted function.
    pub fn declare_fun(&mut self, name: &str, domain: &[SortId], range: SortId) -> FuncId {
        self.push_func(
            name,
            domain.iter().copied().collect(),
            range,
            FuncKind::Uninterpreted,
        )
    }

    /// Look up a declaration.
    pub fn func(&self, func: FuncId) -> Option<&FuncDecl> {
        self.funcs.get(func.0 as usize)
    }

    // ----- term construction -------------------------------------------

    fn intern_term(&mut self, kind: TermKind, sort: SortId) -> TermId {
        let key = (kind, sort);
        if let Some(&id) = self.term_cache.get(&key) {
            return id;
        }
        let id = TermId(self.terms.len() as u32);
        self.terms.push(Term {
            kind: key.0.clone(),
            sort,
        });
        self.term_cache.insert(key, id);
        id
    }

    /// Look up a term.
    pub fn get(&self, id: TermId) -> Option<&Term> {
        self.terms.get(id.index())
    }

    /// Sort of a term. Unknown ids report `Bool`.
    pub fn sort(&self, id: TermId) -> SortId {
        self.get(id).map_or(self.sorts.bool_sort, |t| t.sort)
    }

    /// `true`
    pub fn mk_true(&mut self) -> TermId {
        let s = self.sorts.bool_sort;
        self.intern_term(TermKind::True, s)
    }

    /// `false`
    pub fn mk_false(&mut self) -> TermId {
        let s = self.sorts.bool_sort;
        self.intern_term(TermKind::False, s)
    }

    /// Boolean literal.
    pub fn mk_bool(&mut self, value: bool) -> TermId {
        if value { self.mk_true() } else { self.mk_false() }
    }

    /// Integer literal.
    pub fn mk_int(&mut self, value: impl Into<BigInt>) -> TermId {
        let s = self.sorts.int_sort;
        self.intern_term(TermKind::IntConst(value.into()), s)
    }

    /// Bound variable.
    pub fn mk_var(&mut self, name: &str, sort: SortId) -> TermId {
        let name = self.intern(name);
        self.intern_term(TermKind::Var(name), sort)
    }

    /// Model value `index` of an uninterpreted sort.
    pub fn mk_value(&mut self, sort: SortId, index: u32) -> TermId {
        self.intern_term(TermKind::Value(index), sort)
    }

    /// Uninterpreted constant, declared on first use.
    pub fn mk_const(&mut self, name: &str, sort: SortId) -> TermId {
        let key = (self.intern(name), sort);
        let func = match self.const_decls.get(&key) {
            Some(&f) => f,
            None => {
                let f = self.declare_fun(name, &[], sort);
                self.const_decls.insert(key, f);
                f
            }
        };
        self.mk_app(func, Args::new())
    }

    /// Fresh uninterpreted constant whose name is derived from `prefix`.
    pub fn mk_fresh_const(&mut self, prefix: &str, sort: SortId) -> TermId {
        loop {
            self.fresh_counter += 1;
            let name = format!("{}!{}", prefix, self.fresh_counter);
            let key = (self.intern(&name), sort);
            if !self.const_decls.contains_key(&key) {
                return self.mk_const(&name, sort);
            }
        }
    }

    /// Negation, folding constants and double negation.
    pub fn mk_not(&mut self, arg: TermId) -> TermId {
        match self.get(arg).map(|t| &t.kind) {
            Some(TermKind::True) => self.mk_false(),
            Some(TermKind::False) => self.mk_true(),
            Some(TermKind::Not(inner)) => *inner,
            _ => {
                let s = self.sorts.bool_sort;
                self.intern_term(TermKind::Not(arg), s)
            }
        }
    }

    /// Conjunction. Drops `true`, collapses on `false`, removes duplicates.
    pub fn mk_and(&mut self, args: impl IntoIterator<Item = TermId>) -> TermId {
        let mut out = Args::new();
        for arg in args {
            match self.get(arg).map(|t| &t.kind) {
                Some(TermKind::True) => {}
                Some(TermKind::False) => return self.mk_false(),
                _ => {
                    if !out.contains(&arg) {
                        out.push(arg);
                    }
                }
            }
        }
        match out.len() {
            0 => self.mk_true(),
            1 => out[0],
            _ => {
                let s = self.sorts.bool_sort;
                self.intern_term(TermKind::And(out), s)
            }
        }
    }

    /// Disjunction. Drops `false`, collapses on `true`, removes duplicates.
    pub fn mk_or(&mut self, args: impl IntoIterator<Item = TermId>) -> TermId {
        let mut out = Args::new();
        for arg in args {
            match self.get(arg).map(|t| &t.kind) {
                Some(TermKind::False) => {}
                Some(TermKind::True) => return self.mk_true(),
                _ => {
                    if !out.contains(&arg) {
                        out.push(arg);
                    }
                }
            }
        }
        match out.len() {
            0 => self.mk_false(),
            1 => out[0],
            _ => {
                let s = self.sorts.bool_sort;
                self.intern_term(TermKind::Or(out), s)
            }
        }
    }

    /// Implication.
    pub fn mk_implies(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let s = self.sorts.bool_sort;
        self.intern_term(TermKind::Implies(lhs, rhs), s)
    }

    /// If-then-else, folding constant conditions and equal branches.
    pub fn mk_ite(&mut self, cond: TermId, then_br: TermId, else_br: TermId) -> TermId {
        match self.get(cond).map(|t| &t.kind) {
            Some(TermKind::True) => return then_br,
            Some(TermKind::False) => return else_br,
            _ => {}
        }
        if then_br == else_br {
            return then_br;
        }
        let s = self.sort(then_br);
        self.intern_term(TermKind::Ite(cond, then_br, else_br), s)
    }

    /// Equality. Arguments are ordered by id; `t = t` folds to `true`.
    pub fn mk_eq(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        if lhs == rhs {
            return self.mk_true();
        }
        let (a, b) = if lhs <= rhs { (lhs, rhs) } else { (rhs, lhs) };
        let s = self.sorts.bool_sort;
        self.intern_term(TermKind::Eq(a, b), s)
    }

    /// Sum.
    pub fn mk_add(&mut self, args: impl IntoIterator<Item = TermId>) -> TermId {
        let args: Args = args.into_iter().collect();
        match args.len() {
            0 => self.mk_int(0),
            1 => args[0],
            _ => {
                let s = self.sorts.int_sort;
                self.intern_term(TermKind::Add(args), s)
            }
        }
    }

    /// Difference.
    pub fn mk_sub(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let s = self.sorts.int_sort;
        self.intern_term(TermKind::Sub(lhs, rhs), s)
    }

    /// Unary minus.
    pub fn mk_neg(&mut self, arg: TermId) -> TermId {
        let s = self.sorts.int_sort;
        self.intern_term(TermKind::Neg(arg), s)
    }

    /// Product.
    pub fn mk_mul(&mut self, args: impl IntoIterator<Item = TermId>) -> TermId {
        let args: Args = args.into_iter().collect();
        match args.len() {
            0 => self.mk_int(1),
            1 => args[0],
            _ => {
                let s = self.sorts.int_sort;
                self.intern_term(TermKind::Mul(args), s)
            }
        }
    }

    /// `lhs < rhs`
    pub fn mk_lt(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let s = self.sorts.bool_sort;
        self.intern_term(TermKind::Lt(lhs, rhs), s)
    }

    /// `lhs <= rhs`
    pub fn mk_le(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let s = self.sorts.bool_sort;
        self.intern_term(TermKind::Le(lhs, rhs), s)
    }

    /// `lhs > rhs`
    pub fn mk_gt(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let s = self.sorts.bool_sort;
        self.intern_term(TermKind::Gt(lhs, rhs), s)
    }

    /// `lhs >= rhs`
    pub fn mk_ge(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let s = self.sorts.bool_sort;
        self.intern_term(TermKind::Ge(lhs, rhs), s)
    }

    /// Application of a declared function.
    pub fn mk_app(&mut self, func: FuncId, args: impl IntoIterator<Item = TermId>) -> TermId {
        let args: Args = args.into_iter().collect();
        let range = self.func(func).map_or(self.sorts.bool_sort, |d| d.range);
        self.intern_term(TermKind::Apply { func, args }, range)
    }

    /// Array read. The sort is the element sort of `array`.
    pub fn mk_select(&mut self, array: TermId, index: TermId) -> TermId {
        let elem = match self.sort_kind(self.sort(array)) {
            Some(SortKind::Array { elem, .. }) => *elem,
            _ => self.sorts.bool_sort,
        };
        self.intern_term(TermKind::Select(array, index), elem)
    }

    /// Array write.
    pub fn mk_store(&mut self, array: TermId, index: TermId, value: TermId) -> TermId {
        let s = self.sort(array);
        self.intern_term(TermKind::Store(array, index, value), s)
    }

    /// Constant array of sort `array_sort` mapping every index to `value`.
    pub fn mk_const_array(&mut self, array_sort: SortId, value: TermId) -> TermId {
        self.intern_term(TermKind::ConstArray(value), array_sort)
    }

    /// Array given by the graph of a unary function.
    pub fn mk_as_array(&mut self, func: FuncId) -> TermId {
        let (index, elem) = match self.func(func) {
            Some(decl) if decl.domain.len() == 1 => (decl.domain[0], decl.range),
            _ => (self.sorts.int_sort, self.sorts.int_sort),
        };
        let sort = self.mk_array_sort(index, elem);
        self.intern_term(TermKind::AsArray(func), sort)
    }

    /// Universal quantifier.
    pub fn mk_forall(&mut self, vars: BoundVars, body: TermId) -> TermId {
        let s = self.sorts.bool_sort;
        self.intern_term(TermKind::Forall { vars, body }, s)
    }

    /// Existential quantifier.
    pub fn mk_exists(&mut self, vars: BoundVars, body: TermId) -> TermId {
        let s = self.sorts.bool_sort;
        self.intern_term(TermKind::Exists { vars, body }, s)
    }

    // ----- inspection --------------------------------------------------

    /// Whether `id` is `true`.
    pub fn is_true(&self, id: TermId) -> bool {
        matches!(self.get(id).map(|t| &t.kind), Some(TermKind::True))
    }

    /// Whether `id` is `false`.
    pub fn is_false(&self, id: TermId) -> bool {
        matches!(self.get(id).map(|t| &t.kind), Some(TermKind::False))
    }

    /// Whether `id` is a quantifier.
    pub fn is_quantifier(&self, id: TermId) -> bool {
        matches!(
            self.get(id).map(|t| &t.kind),
            Some(TermKind::Forall { .. } | TermKind::Exists { .. })
        )
    }

    /// Integer value of a literal.
    pub fn int_value(&self, id: TermId) -> Option<&BigInt> {
        match self.get(id).map(|t| &t.kind) {
            Some(TermKind::IntConst(v)) => Some(v),
            _ => None,
        }
    }

    /// Whether `id` is an application of an uninterpreted declaration
    /// (constants included).
    pub fn is_uninterp(&self, id: TermId) -> bool {
        match self.get(id).map(|t| &t.kind) {
            Some(TermKind::Apply { func, .. }) => self
                .func(*func)
                .is_some_and(|d| d.kind == FuncKind::Uninterpreted),
            _ => false,
        }
    }

    /// Whether `id` is an uninterpreted constant.
    pub fn is_uninterp_const(&self, id: TermId) -> bool {
        matches!(self.get(id).map(|t| &t.kind), Some(TermKind::Apply { args, .. }) if args.is_empty())
            && self.is_uninterp(id)
    }

    /// Declaration of an uninterpreted constant.
    pub fn const_decl(&self, id: TermId) -> Option<FuncId> {
        match self.get(id).map(|t| &t.kind) {
            Some(TermKind::Apply { func, args }) if args.is_empty() && self.is_uninterp(id) => {
                Some(*func)
            }
            _ => None,
        }
    }

    /// Whether `id` is a model value: literals, uninterpreted elements,
    /// constructor terms over values, and arrays built from values.
    pub fn is_value(&self, id: TermId) -> bool {
        let Some(t) = self.get(id) else {
            return false;
        };
        match &t.kind {
            TermKind::True
            | TermKind::False
            | TermKind::IntConst(_)
            | TermKind::Value(_)
            | TermKind::AsArray(_) => true,
            TermKind::ConstArray(v) => self.is_value(*v),
            TermKind::Store(a, i, v) => self.is_value(*a) && self.is_value(*i) && self.is_value(*v),
            TermKind::Apply { func, args } => {
                self.func(*func)
                    .is_some_and(|d| d.kind == FuncKind::Constructor)
                    && args.iter().all(|&a| self.is_value(a))
            }
            _ => false,
        }
    }

    /// Direct children of a term.
    pub fn children(&self, id: TermId) -> Args {
        let Some(t) = self.get(id) else {
            return Args::new();
        };
        match &t.kind {
            TermKind::True
            | TermKind::False
            | TermKind::IntConst(_)
            | TermKind::Var(_)
            | TermKind::Value(_)
            | TermKind::AsArray(_) => Args::new(),
            TermKind::Not(a) | TermKind::Neg(a) | TermKind::ConstArray(a) => smallvec![*a],
            TermKind::And(args)
            | TermKind::Or(args)
            | TermKind::Add(args)
            | TermKind::Mul(args)
            | TermKind::Apply { args, .. } => args.clone(),
            TermKind::Implies(a, b)
            | TermKind::Eq(a, b)
            | TermKind::Sub(a, b)
            | TermKind::Lt(a, b)
            | TermKind::Le(a, b)
            | TermKind::Gt(a, b)
            | TermKind::Ge(a, b)
            | TermKind::Select(a, b) => smallvec![*a, *b],
            TermKind::Ite(a, b, c) | TermKind::Store(a, b, c) => smallvec![*a, *b, *c],
            TermKind::Forall { body, .. } | TermKind::Exists { body, .. } => smallvec![*body],
        }
    }

    /// Rebuild `id` with new children (same kind and arity).
    pub fn with_children(&mut self, id: TermId, children: &[TermId]) -> TermId {
        let Some(t) = self.get(id) else {
            return id;
        };
        let kind = t.kind.clone();
        let sort = t.sort;
        let c = |i: usize| children.get(i).copied().unwrap_or(id);
        match kind {
            TermKind::True
            | TermKind::False
            | TermKind::IntConst(_)
            | TermKind::Var(_)
            | TermKind::Value(_)
            | TermKind::AsArray(_) => id,
            TermKind::Not(_) => self.mk_not(c(0)),
            TermKind::Neg(_) => self.mk_neg(c(0)),
            TermKind::ConstArray(_) => self.mk_const_array(sort, c(0)),
            TermKind::And(_) => self.mk_and(children.iter().copied()),
            TermKind::Or(_) => self.mk_or(children.iter().copied()),
            TermKind::Add(_) => self.mk_add(children.iter().copied()),
            TermKind::Mul(_) => self.mk_mul(children.iter().copied()),
            TermKind::Apply { func, .. } => self.mk_app(func, children.iter().copied()),
            TermKind::Implies(..) => self.mk_implies(c(0), c(1)),
            TermKind::Eq(..) => self.mk_eq(c(0), c(1)),
            TermKind::Sub(..) => self.mk_sub(c(0), c(1)),
            TermKind::Lt(..) => self.mk_lt(c(0), c(1)),
            TermKind::Le(..) => self.mk_le(c(0), c(1)),
            TermKind::Gt(..) => self.mk_gt(c(0), c(1)),
            TermKind::Ge(..) => self.mk_ge(c(0), c(1)),
            TermKind::Select(..) => self.mk_select(c(0), c(1)),
            TermKind::Ite(..) => self.mk_ite(c(0), c(1), c(2)),
            TermKind::Store(..) => self.mk_store(c(0), c(1), c(2)),
            TermKind::Forall { vars, .. } => self.mk_forall(vars, c(0)),
            TermKind::Exists { vars, .. } => self.mk_exists(vars, c(0)),
        }
    }

    /// All sub-terms of `root` (itself included), children before parents,
    /// each listed once.
    pub fn subterms(&self, root: TermId) -> Vec<TermId> {
        let mut out = Vec::new();
        let mut visited = FxHashSet::default();
        let mut stack = vec![(root, false)];
        while let Some((t, expanded)) = stack.pop() {
            if expanded {
                out.push(t);
                continue;
            }
            if !visited.insert(t) {
                continue;
            }
            stack.push((t, true));
            for &c in self.children(t).iter().rev() {
                if !visited.contains(&c) {
                    stack.push((c, false));
                }
            }
        }
        out
    }

    /// Whether `id` contains no bound variable.
    pub fn is_ground(&self, id: TermId) -> bool {
        !self
            .subterms(id)
            .into_iter()
            .any(|t| matches!(self.get(t).map(|t| &t.kind), Some(TermKind::Var(_))))
    }

    /// Whether `target` occurs in `id`.
    pub fn contains(&self, id: TermId, target: TermId) -> bool {
        id == target || self.subterms(id).contains(&target)
    }

    /// Split a formula into conjuncts, pushing negations through `or`.
    pub fn flatten_and(&mut self, fml: TermId, out: &mut Vec<TermId>) {
        let mut todo = vec![fml];
        while let Some(f) = todo.pop() {
            let kind = match self.get(f) {
                Some(t) => t.kind.clone(),
                None => continue,
            };
            match kind {
                TermKind::True => {}
                TermKind::And(args) => todo.extend(args.iter().rev()),
                TermKind::Not(inner) => match self.get(inner).map(|t| t.kind.clone()) {
                    Some(TermKind::Or(args)) => {
                        for &a in args.iter().rev() {
                            let n = self.mk_not(a);
                            todo.push(n);
                        }
                    }
                    Some(TermKind::Implies(a, b)) => {
                        let nb = self.mk_not(b);
                        todo.push(nb);
                        todo.push(a);
                    }
                    _ => {
                        if !out.contains(&f) {
                            out.push(f);
                        }
                    }
                },
                _ => {
                    if !out.contains(&f) {
                        out.push(f);
                    }
                }
            }
        }
    }

    /// Replace bound variables by terms. Variables rebound by a nested
    /// quantifier are left alone inside it.
    pub fn substitute(&mut self, id: TermId, map: &FxHashMap<Spur, TermId>) -> TermId {
        let mut cache = FxHashMap::default();
        self.substitute_rec(id, map, &mut cache)
    }

    fn substitute_rec(
        &mut self,
        id: TermId,
        map: &FxHashMap<Spur, TermId>,
        cache: &mut FxHashMap<TermId, TermId>,
    ) -> TermId {
        if let Some(&r) = cache.get(&id) {
            return r;
        }
        let Some(t) = self.get(id) else {
            return id;
        };
        let result = match t.kind.clone() {
            TermKind::Var(name) => map.get(&name).copied().unwrap_or(id),
            TermKind::Forall { vars, body } | TermKind::Exists { vars, body } => {
                let mut inner = map.clone();
                for (name, _) in &vars {
                    inner.remove(name);
                }
                let body = self.substitute(body, &inner);
                self.with_children(id, &[body])
            }
            _ => {
                let children = self.children(id);
                let new: Args = children
                    .iter()
                    .map(|&c| self.substitute_rec(c, map, cache))
                    .collect();
                if new == children {
                    id
                } else {
                    self.with_children(id, &new)
                }
            }
        };
        cache.insert(id, result);
        result
    }

    /// Simultaneous top-down replacement of sub-terms.
    pub fn replace(&mut self, id: TermId, map: &FxHashMap<TermId, TermId>) -> TermId {
        let mut cache = FxHashMap::default();
        self.replace_rec(id, map, &mut cache)
    }

    fn replace_rec(
        &mut self,
        id: TermId,
        map: &FxHashMap<TermId, TermId>,
        cache: &mut FxHashMap<TermId, TermId>,
    ) -> TermId {
        if let Some(&r) = map.get(&id) {
            return r;
        }
        if let Some(&r) = cache.get(&id) {
            return r;
        }
        let children = self.children(id);
        let new: Args = children
            .iter()
            .map(|&c| self.replace_rec(c, map, cache))
            .collect();
        let result = if new == children {
            id
        } else {
            self.with_children(id, &new)
        };
        cache.insert(id, result);
        result
    }

    /// Uninterpreted constants occurring in `id`, in first-occurrence order.
    pub fn uninterp_consts(&self, id: TermId) -> Vec<TermId> {
        self.subterms(id)
            .into_iter()
            .filter(|&t| self.is_uninterp_const(t))
            .collect()
    }

    /// Display adapter printing SMT-LIB style s-expressions.
    pub fn display(&self, id: TermId) -> TermDisplay<'_> {
        TermDisplay { tm: self, id }
    }

    fn write_term(&self, f: &mut fmt::Formatter<'_>, id: TermId) -> fmt::Result {
        let Some(t) = self.get(id) else {
            return write!(f, "?{}", id.0);
        };
        let nary = |f: &mut fmt::Formatter<'_>, op: &str, args: &[TermId]| -> fmt::Result {
            write!(f, "({}", op)?;
            for &a in args {
                write!(f, " ")?;
                self.write_term(f, a)?;
            }
            write!(f, ")")
        };
        match &t.kind {
            TermKind::True => write!(f, "true"),
            TermKind::False => write!(f, "false"),
            TermKind::IntConst(v) => write!(f, "{}", v),
            TermKind::Var(name) => write!(f, "{}", self.resolve(*name)),
            TermKind::Value(i) => match self.sort_kind(t.sort) {
                Some(SortKind::Uninterpreted(name)) => {
                    write!(f, "{}!val!{}", self.resolve(*name), i)
                }
                _ => write!(f, "val!{}", i),
            },
            TermKind::Not(a) => nary(f, "not", &[*a]),
            TermKind::And(args) => nary(f, "and", args),
            TermKind::Or(args) => nary(f, "or", args),
            TermKind::Implies(a, b) => nary(f, "=>", &[*a, *b]),
            TermKind::Ite(a, b, c) => nary(f, "ite", &[*a, *b, *c]),
            TermKind::Eq(a, b) => nary(f, "=", &[*a, *b]),
            TermKind::Add(args) => nary(f, "+", args),
            TermKind::Sub(a, b) => nary(f, "-", &[*a, *b]),
            TermKind::Neg(a) => nary(f, "-", &[*a]),
            TermKind::Mul(args) => nary(f, "*", args),
            TermKind::Lt(a, b) => nary(f, "<", &[*a, *b]),
            TermKind::Le(a, b) => nary(f, "<=", &[*a, *b]),
            TermKind::Gt(a, b) => nary(f, ">", &[*a, *b]),
            TermKind::Ge(a, b) => nary(f, ">=", &[*a, *b]),
            TermKind::Apply { func, args } => {
                let name = self.func(*func).map_or("?", |d| self.resolve(d.name));
                if args.is_empty() {
                    write!(f, "{}", name)
                } else {
                    nary(f, name, args)
                }
            }
            TermKind::Select(a, i) => nary(f, "select", &[*a, *i]),
            TermKind::Store(a, i, v) => nary(f, "store", &[*a, *i, *v]),
            TermKind::ConstArray(v) => nary(f, "const", &[*v]),
            TermKind::AsArray(func) => {
                let name = self.func(*func).map_or("?", |d| self.resolve(d.name));
                write!(f, "(as-array {})", name)
            }
            TermKind::Forall { vars, body } | TermKind::Exists { vars, body } => {
                let q = if matches!(t.kind, TermKind::Forall { .. }) {
                    "forall"
                } else {
                    "exists"
                };
                write!(f, "({} (", q)?;
                for (i, (name, _)) in vars.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", self.resolve(*name))?;
                }
                write!(f, ") ")?;
                self.write_term(f, *body)?;
                write!(f, ")")
            }
        }
    }
}

/// See [`TermManager::display`].
pub struct TermDisplay<'a> {
    tm: &'a TermManager,
    id: TermId,
}

impl fmt::Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tm.write_term(f, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consing() {
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let one = tm.mk_int(1);
        let a = tm.mk_add(vec![x, one]);
        let b = tm.mk_add(vec![x, one]);
        assert_eq!(a, b);
        assert_ne!(a, tm.mk_add(vec![one, x]));
    }

    #[test]
    fn test_eq_is_symmetric() {
        let mut tm = TermManager::new();
        let a = tm.mk_const("a", tm.sorts.int_sort);
        let b = tm.mk_const("b", tm.sorts.int_sort);
        assert_eq!(tm.mk_eq(a, b), tm.mk_eq(b, a));
        let refl = tm.mk_eq(a, a);
        assert!(tm.is_true(refl));
    }

    #[test]
    fn test_boolean_folding() {
        let mut tm = TermManager::new();
        let p = tm.mk_const("p", tm.sorts.bool_sort);
        let t = tm.mk_true();
        let f = tm.mk_false();
        assert_eq!(tm.mk_and(vec![p, t]), p);
        assert_eq!(tm.mk_and(vec![p, f]), f);
        assert_eq!(tm.mk_or(vec![p, f, p]), p);
        let np = tm.mk_not(p);
        assert_eq!(tm.mk_not(np), p);
        assert_eq!(tm.mk_ite(t, p, np), p);
    }

    #[test]
    fn test_fresh_consts_are_distinct() {
        let mut tm = TermManager::new();
        let u = tm.mk_uninterpreted_sort("U");
        let a = tm.mk_fresh_const("x", u);
        let b = tm.mk_fresh_const("x", u);
        assert_ne!(a, b);
        assert!(tm.is_uninterp_const(a));
        assert_eq!(tm.family(u), SortFamily::Uninterpreted);
    }

    #[test]
    fn test_substitute_respects_shadowing() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let c = tm.mk_const("c", int);
        let inner = tm.mk_gt(x, c);
        let name = tm.intern("x");
        let q = tm.mk_forall(smallvec![(name, int)], inner);
        let body = tm.mk_and(vec![inner, q]);

        let mut map = FxHashMap::default();
        map.insert(name, c);
        let result = tm.substitute(body, &map);
        let expected_inner = tm.mk_gt(c, c);
        let expected = tm.mk_and(vec![expected_inner, q]);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_flatten_and_pushes_negation() {
        let mut tm = TermManager::new();
        let b = tm.sorts.bool_sort;
        let p = tm.mk_const("p", b);
        let q = tm.mk_const("q", b);
        let or = tm.mk_or(vec![p, q]);
        let not_or = tm.mk_not(or);
        let mut out = Vec::new();
        tm.flatten_and(not_or, &mut out);
        let np = tm.mk_not(p);
        let nq = tm.mk_not(q);
        assert_eq!(out, vec![np, nq]);
    }

    #[test]
    fn test_replace_is_simultaneous() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let a = tm.mk_const("a", int);
        let b = tm.mk_const("b", int);
        let sum = tm.mk_add(vec![a, b]);
        let mut map = FxHashMap::default();
        map.insert(a, b);
        map.insert(b, a);
        let swapped = tm.replace(sum, &map);
        assert_eq!(swapped, tm.mk_add(vec![b, a]));
    }

    #[test]
    fn test_ground_and_values() {
        let mut tm = TermManager::new();
        let u = tm.mk_uninterpreted_sort("U");
        let x = tm.mk_var("x", u);
        let v = tm.mk_value(u, 0);
        let eq = tm.mk_eq(x, v);
        assert!(!tm.is_ground(eq));
        assert!(tm.is_ground(v));
        assert!(tm.is_value(v));
        assert!(!tm.is_value(eq));
        assert_eq!(format!("{}", tm.display(v)), "U!val!0");
    }

    #[test]
    fn test_datatype_declaration() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let list = tm.declare_datatype("List");
        let nil = tm.add_constructor(list, "nil", &[]);
        let cons = tm.add_constructor(list, "cons", &[("head", int), ("tail", list)]);
        assert_eq!(tm.constructors(list), &[nil, cons]);
        let info = tm.constructor_info(cons).expect("constructor info");
        assert_eq!(info.selectors.len(), 2);
        assert!(info.tester.is_some());
        let n = tm.mk_app(nil, vec![]);
        assert!(tm.is_value(n));
    }
}
