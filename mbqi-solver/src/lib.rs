//! MBQI Solver - Model-Based Quantifier Instantiation
//!
//! This crate checks quantified formulas against the candidate model of an
//! enclosing solver and produces instantiation clauses for the ones the
//! model violates:
//! - [`Mbqi`]: the engine, one pass per candidate model
//! - [`QuantifierContext`]: what the engine needs from the enclosing solver
//! - [`Oracle`]: the auxiliary satisfiability service used to find
//!   counterexamples, with the bounded enumerative [`EnumOracle`]
//! - [`ProjectPlugin`]: per-theory elimination of Skolem constants
//!
//! # Examples
//!
//! ```
//! use mbqi_core::{LBool, Model, SolverConfig, TermManager};
//! use mbqi_core::model::FuncInterp;
//! use mbqi_solver::{EnumOracle, Mbqi, RecordingContext};
//! use smallvec::smallvec;
//!
//! let mut tm = TermManager::new();
//! let u = tm.mk_uninterpreted_sort("U");
//! let b = tm.sorts.bool_sort;
//! let p = tm.declare_fun("P", &[u], b);
//! let x = tm.mk_var("x", u);
//! let px = tm.mk_app(p, vec![x]);
//! let name = tm.intern("x");
//! let q = tm.mk_forall(smallvec![(name, u)], px);
//!
//! // P is true everywhere, so forall x. P(x) holds.
//! let mut interp = FuncInterp::new();
//! let t = tm.mk_true();
//! interp.set_else(t);
//! let mut model = Model::new();
//! model.register_func(p, interp);
//!
//! let config = SolverConfig::default();
//! let mut ctx = RecordingContext::new(config.clone(), model);
//! ctx.assert_quantifier(&tm, q);
//!
//! let oracle = EnumOracle::new(config.oracle_max_assignments);
//! let mut mbqi = Mbqi::new(&config, Box::new(oracle))?;
//! mbqi.init_search(&ctx)?;
//! assert_eq!(mbqi.run(&mut tm, &mut ctx), LBool::True);
//! assert!(ctx.clauses().is_empty());
//! # Ok::<(), mbqi_core::MbqiError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod mbqi;
pub mod oracle;

pub use context::{QuantifierContext, RecordingContext};
pub use mbqi::{
    DefaultModelFixer, Mbqi, MbqiStats, ModelFixer, ProjectPlugin, Projector, QBody,
    SkeletonCache, TermChooser,
};
pub use oracle::{EnumOracle, Oracle, ScopedPush};
