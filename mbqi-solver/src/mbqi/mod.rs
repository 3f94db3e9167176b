//! Model-Based Quantifier Instantiation (MBQI)
//!
//! Checks universally quantified formulas against the candidate model of
//! the enclosing solver and adds instantiation clauses for the ones the
//! model violates.
//!
//! # Algorithm Overview
//!
//! For each relevant quantifier `forall x. p(x)`:
//!
//! 1. **Specialization**: replace `x` by fresh Skolem constants and
//!    evaluate `not p` in the candidate model, leaving the constants free
//! 2. **Counterexample Search**: ask the auxiliary oracle for Skolem values
//!    satisfying the evaluated body; unsatisfiable means the model is fine
//! 3. **Domain Restriction**: confine arguments of free functions that
//!    depend on `x` to the region the model describes
//! 4. **Projection**: eliminate the Skolem constants from `not p` using the
//!    witness, producing a ground instance that the witness satisfies
//! 5. **Instantiation**: add `not q or not instance` and exclude the
//!    instance from the next oracle check, up to a counterexample budget
//!
//! When no instance comes out of the bounded loop, one fallback instance
//! is built from the first witness with ground domain bounds.
//!
//! # Module Organization
//!
//! - `controller`: the per-quantifier check and the pass over all quantifiers
//! - `skeleton`: Skolemized quantifier bodies and their scoped cache
//! - `domain`: symbolic and ground domain restrictions
//! - `nested`: replacement of free applications over Skolem constants
//! - `project`: projection plugins, literal extraction and orchestration
//! - `fixer`: argument restriction and inversion against the model
//! - `choose`: seeded choice of representative terms

use std::fmt;

pub mod choose;
pub mod controller;
pub mod domain;
pub mod fixer;
pub mod nested;
pub mod project;
pub mod skeleton;

pub use choose::TermChooser;
pub use controller::Mbqi;
pub use fixer::{DefaultModelFixer, FixerStats, ModelFixer};
pub use project::{
    ArithProjector, ArrayProjector, DatatypeProjector, PluginRegistry, ProjectPlugin, Projector,
};
pub use skeleton::{QBody, SkeletonCache};

/// Statistics about MBQI
#[derive(Debug, Clone, Default)]
pub struct MbqiStats {
    /// Number of `check_forall` calls
    pub num_checks: usize,
    /// Quantifiers satisfied by the candidate model
    pub num_satisfied: usize,
    /// Quantifiers refuted by at least one instance
    pub num_refuted: usize,
    /// Inconclusive checks
    pub num_unknown: usize,
    /// Instantiation clauses added
    pub num_instantiations: u64,
    /// Instances from the counterexample loop
    pub num_loop_instances: usize,
    /// Instances from the domain-bounds fallback
    pub num_fallback_instances: usize,
}

impl MbqiStats {
    /// Create new empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for MbqiStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MBQI Statistics:")?;
        writeln!(f, "  Total checks: {}", self.num_checks)?;
        writeln!(f, "  Satisfied: {}", self.num_satisfied)?;
        writeln!(f, "  Refuted: {}", self.num_refuted)?;
        writeln!(f, "  Unknown: {}", self.num_unknown)?;
        writeln!(f, "  Total instantiations: {}", self.num_instantiations)?;
        writeln!(f, "  Loop instances: {}", self.num_loop_instances)?;
        writeln!(f, "  Fallback instances: {}", self.num_fallback_instances)
    }
}
