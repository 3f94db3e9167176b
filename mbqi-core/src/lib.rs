//! MBQI Core - Terms, Sorts, and Candidate Models
//!
//! This crate provides the foundational types shared by the quantifier
//! instantiation engine:
//! - Hash-consed terms with [`TermId`] references
//! - Sorts and their theory families (arithmetic, arrays, datatypes, uninterpreted)
//! - Candidate models with evaluation and model completion
//! - Three-valued results and packed Boolean literals
//! - Solver configuration and the crate error type
//!
//! # Examples
//!
//! ```
//! use mbqi_core::ast::TermManager;
//! use mbqi_core::model::{FuncInterp, Model};
//!
//! let mut tm = TermManager::new();
//! let u = tm.mk_uninterpreted_sort("U");
//! let f = tm.declare_fun("f", &[u], u);
//! let u0 = tm.mk_value(u, 0);
//! let u1 = tm.mk_value(u, 1);
//!
//! let mut interp = FuncInterp::new();
//! interp.add_entry(vec![u0], u1);
//! interp.set_else(u0);
//!
//! let mut model = Model::new();
//! model.register_func(f, interp);
//!
//! let app = tm.mk_app(f, vec![u0]);
//! assert_eq!(model.eval(&mut tm, app), Some(u1));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ast;
pub mod config;
pub mod error;
pub mod literal;
pub mod model;
pub mod statistics;

pub use ast::{SortFamily, SortId, TermId, TermKind, TermManager};
pub use config::SolverConfig;
pub use error::{MbqiError, MbqiResult};
pub use literal::{LBool, Lit};
pub use model::{FuncInterp, Model, ValueClasses};
pub use statistics::Statistics;
