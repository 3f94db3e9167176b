//! Auxiliary satisfiability oracle used for counterexample search.
//!
//! The engine only needs an incremental interface: assert formulas, open
//! and close assertion scopes, check, and read back a witness model.
//! [`ScopedPush`] ties a scope to a Rust lifetime so that every exit path
//! of a check pops what it pushed.

mod enumerative;

pub use enumerative::EnumOracle;

use mbqi_core::ast::{TermId, TermManager};
use mbqi_core::literal::LBool;
use mbqi_core::model::Model;
use mbqi_core::statistics::Statistics;
use std::ops::{Deref, DerefMut};

/// Incremental satisfiability service.
pub trait Oracle {
    /// Assert a formula in the current scope.
    fn assert_expr(&mut self, fml: TermId);

    /// Open a new assertion scope.
    fn push(&mut self);

    /// Close the `n` innermost scopes, dropping their assertions.
    fn pop(&mut self, n: usize);

    /// Check the conjunction of all asserted formulas.
    fn check_sat(&mut self, tm: &mut TermManager) -> LBool;

    /// Witness of the last successful check.
    fn model(&self) -> Option<Model>;

    /// Report oracle counters.
    fn collect_statistics(&self, _st: &mut Statistics) {}
}

/// Pushes a scope on creation and pops it when dropped.
pub struct ScopedPush<'a> {
    oracle: &'a mut dyn Oracle,
}

impl<'a> ScopedPush<'a> {
    /// Open a scope on `oracle`.
    pub fn new(oracle: &'a mut dyn Oracle) -> Self {
        oracle.push();
        Self { oracle }
    }
}

impl<'a> Deref for ScopedPush<'a> {
    type Target = dyn Oracle + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.oracle
    }
}

impl DerefMut for ScopedPush<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.oracle
    }
}

impl Drop for ScopedPush<'_> {
    fn drop(&mut self) {
        self.oracle.pop(1);
    }
}
