//! Property-based tests for mbqi-solver
//!
//! Representative choice and the instantiation loop over random function
//! tables on small uninterpreted universes.

mod chooser_properties;
mod instantiation_properties;
