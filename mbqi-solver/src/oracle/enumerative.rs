//! Bounded enumerative oracle.
//!
//! Free symbols of the asserted formulas ("atoms": uninterpreted constants
//! and ground uninterpreted applications) get a finite candidate list per
//! sort. Assignments are enumerated like an odometer until one satisfies
//! every assertion or the budget runs out.
//!
//! Candidate lists are complete for Booleans and for uninterpreted sorts
//! (every value mentioned plus one fresh element per atom suffices when
//! atoms are constants). Integers, datatypes and arrays only get values
//! near the ones mentioned, and an application reads its result from the
//! first assignment of its argument values, so an exhausted search over
//! such atoms reports `Undef` instead of `False`.
//!
//! Each assignment is checked by evaluating the assertions in a model of
//! the atom values. No ground copy of the assertions is interned.

use super::Oracle;
use mbqi_core::ast::{SortId, SortKind, TermId, TermKind, TermManager};
use mbqi_core::literal::LBool;
use mbqi_core::model::{FuncInterp, Model};
use mbqi_core::statistics::Statistics;
use num_bigint::BigInt;
use num_traits::{One, Zero};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// Counters of the enumerative oracle
#[derive(Debug, Clone, Default)]
pub struct EnumStats {
    /// Number of checks
    pub num_checks: usize,
    /// Checks that found a witness
    pub num_sat: usize,
    /// Checks that proved unsatisfiability
    pub num_unsat: usize,
    /// Checks that gave up
    pub num_unknown: usize,
    /// Assignments tried over all checks
    pub num_assignments: u64,
}

impl fmt::Display for EnumStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Oracle Statistics:")?;
        writeln!(f, "  Checks: {}", self.num_checks)?;
        writeln!(f, "  Sat: {}", self.num_sat)?;
        writeln!(f, "  Unsat: {}", self.num_unsat)?;
        writeln!(f, "  Unknown: {}", self.num_unknown)?;
        writeln!(f, "  Assignments: {}", self.num_assignments)
    }
}

/// Enumerative implementation of [`Oracle`].
#[derive(Debug)]
pub struct EnumOracle {
    assertions: Vec<TermId>,
    scopes: Vec<usize>,
    max_assignments: u64,
    model: Option<Model>,
    stats: EnumStats,
}

impl EnumOracle {
    /// Create an oracle trying at most `max_assignments` assignments per check.
    pub fn new(max_assignments: u64) -> Self {
        Self {
            assertions: Vec::new(),
            scopes: Vec::new(),
            max_assignments,
            model: None,
            stats: EnumStats::default(),
        }
    }

    /// Formulas currently asserted, outermost scope first.
    pub fn assertions(&self) -> &[TermId] {
        &self.assertions
    }

    /// Number of open scopes.
    pub fn num_scopes(&self) -> usize {
        self.scopes.len()
    }

    /// Get statistics
    pub fn stats(&self) -> &EnumStats {
        &self.stats
    }

    /// Free symbols of `roots`, outermost first. Arguments of an atom are
    /// not atoms on their own account.
    fn collect_atoms(tm: &TermManager, roots: &[TermId]) -> Vec<TermId> {
        let mut atoms = Vec::new();
        let mut seen = FxHashSet::default();
        let mut stack: Vec<TermId> = roots.iter().rev().copied().collect();
        while let Some(t) = stack.pop() {
            if !seen.insert(t) {
                continue;
            }
            if tm.is_uninterp(t) {
                atoms.push(t);
                continue;
            }
            for &c in tm.children(t).iter().rev() {
                stack.push(c);
            }
        }
        atoms
    }

    /// Candidate values for atoms of `sort`, and whether the list is
    /// complete.
    fn candidates(
        tm: &mut TermManager,
        sort: SortId,
        mentioned: &[TermId],
        num_atoms: usize,
    ) -> (Vec<TermId>, bool) {
        let kind = tm.sort_kind(sort).cloned();
        match kind {
            Some(SortKind::Bool) => (vec![tm.mk_false(), tm.mk_true()], true),
            Some(SortKind::Uninterpreted(_)) => {
                let mut values = Vec::new();
                let mut next = 0u32;
                for &v in mentioned {
                    if tm.sort(v) != sort {
                        continue;
                    }
                    if let Some(TermKind::Value(i)) = tm.get(v).map(|t| &t.kind) {
                        next = next.max(i + 1);
                        if !values.contains(&v) {
                            values.push(v);
                        }
                    }
                }
                for k in 0..num_atoms as u32 {
                    values.push(tm.mk_value(sort, next + k));
                }
                (values, true)
            }
            Some(SortKind::Int) => {
                let one = BigInt::one();
                let mut ints: Vec<BigInt> = vec![BigInt::zero()];
                for &v in mentioned {
                    if let Some(i) = tm.int_value(v) {
                        ints.push(i - &one);
                        ints.push(i.clone());
                        ints.push(i + &one);
                    }
                }
                ints.sort();
                ints.dedup();
                (ints.into_iter().map(|i| tm.mk_int(i)).collect(), false)
            }
            _ => {
                let mut values: Vec<TermId> = mentioned
                    .iter()
                    .copied()
                    .filter(|&v| tm.sort(v) == sort)
                    .collect();
                values.dedup();
                if let Some(d) = Model::new().default_value(tm, sort)
                    && !values.contains(&d)
                {
                    values.push(d);
                }
                (values, false)
            }
        }
    }

    fn build_model(tm: &mut TermManager, atoms: &[TermId], values: &[TermId]) -> Model {
        let mut model = Model::new();
        let mut apps = Vec::new();
        for (&atom, &value) in atoms.iter().zip(values) {
            match tm.const_decl(atom) {
                Some(decl) => model.register_decl(decl, value),
                None => apps.push((atom, value)),
            }
        }
        let mut interps: FxHashMap<_, FuncInterp> = FxHashMap::default();
        for (atom, value) in apps {
            let Some(TermKind::Apply { func, args }) = tm.get(atom).map(|t| t.kind.clone()) else {
                continue;
            };
            let arg_values: Option<Vec<TermId>> = args
                .iter()
                .map(|&a| model.eval_with(tm, a, true))
                .collect();
            if let Some(arg_values) = arg_values {
                interps.entry(func).or_default().add_entry(arg_values, value);
            }
        }
        for (func, interp) in interps {
            model.register_func(func, interp);
        }
        model
    }
}

impl Default for EnumOracle {
    fn default() -> Self {
        Self::new(100_000)
    }
}

impl Oracle for EnumOracle {
    fn assert_expr(&mut self, fml: TermId) {
        self.assertions.push(fml);
    }

    fn push(&mut self) {
        self.scopes.push(self.assertions.len());
    }

    fn pop(&mut self, n: usize) {
        for _ in 0..n {
            if let Some(mark) = self.scopes.pop() {
                self.assertions.truncate(mark);
            }
        }
        self.model = None;
    }

    fn check_sat(&mut self, tm: &mut TermManager) -> LBool {
        self.model = None;
        self.stats.num_checks += 1;

        let fml = tm.mk_and(self.assertions.iter().copied());
        let atoms = Self::collect_atoms(tm, &[fml]);
        let mentioned: Vec<TermId> = tm
            .subterms(fml)
            .into_iter()
            .filter(|&t| tm.is_value(t))
            .collect();

        let mut complete = true;
        let mut per_sort: FxHashMap<SortId, usize> = FxHashMap::default();
        for &atom in &atoms {
            *per_sort.entry(tm.sort(atom)).or_insert(0) += 1;
            if !tm.is_uninterp_const(atom) {
                complete = false;
            }
        }
        let mut domains = Vec::with_capacity(atoms.len());
        for &atom in &atoms {
            let sort = tm.sort(atom);
            let count = per_sort.get(&sort).copied().unwrap_or(1);
            let (values, exact) = Self::candidates(tm, sort, &mentioned, count);
            complete &= exact;
            domains.push(values);
        }
        if domains.iter().any(|d| d.is_empty()) {
            self.stats.num_unknown += 1;
            return LBool::Undef;
        }

        let mut indices = vec![0usize; domains.len()];
        let mut tried = 0u64;
        loop {
            if tried >= self.max_assignments {
                self.stats.num_unknown += 1;
                return LBool::Undef;
            }
            tried += 1;
            self.stats.num_assignments += 1;

            let values: Vec<TermId> = indices
                .iter()
                .zip(&domains)
                .map(|(&i, d)| d[i])
                .collect();
            let model = Self::build_model(tm, &atoms, &values);
            match model.eval_with(tm, fml, true) {
                Some(v) if tm.is_true(v) => {
                    self.model = Some(model);
                    self.stats.num_sat += 1;
                    return LBool::True;
                }
                Some(_) => {}
                None => complete = false,
            }

            // Increment indices (like odometer)
            let mut carry = true;
            for (i, idx) in indices.iter_mut().enumerate() {
                if carry {
                    *idx += 1;
                    if *idx >= domains[i].len() {
                        *idx = 0;
                    } else {
                        carry = false;
                    }
                }
            }
            if carry {
                break;
            }
        }

        if complete {
            self.stats.num_unsat += 1;
            LBool::False
        } else {
            self.stats.num_unknown += 1;
            LBool::Undef
        }
    }

    fn model(&self) -> Option<Model> {
        self.model.clone()
    }

    fn collect_statistics(&self, st: &mut Statistics) {
        st.update("oracle-checks", self.stats.num_checks as u64);
        st.update("oracle-assignments", self.stats.num_assignments);
    }
}
