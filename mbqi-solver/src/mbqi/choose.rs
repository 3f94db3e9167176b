//! Representative selection for model values.

use mbqi_core::ast::{TermId, TermManager};
use mbqi_core::model::ValueClasses;
use rand::prelude::*;

/// Picks ground terms standing for model values.
///
/// The starting offset into a class is drawn from a seeded generator so
/// repeated instantiations do not all use the first class member, while
/// runs with the same seed stay reproducible.
#[derive(Debug)]
pub struct TermChooser {
    rng: StdRng,
}

impl TermChooser {
    /// Create a chooser with a fixed seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pick a member of `class`. `None` only for an empty class.
    pub fn choose(&mut self, class: &[TermId]) -> Option<TermId> {
        if class.is_empty() {
            return None;
        }
        let start = self.rng.random_range(0..class.len());
        class.get(start).copied()
    }

    /// Replace model values inside `value` by members of their classes.
    /// Values without a class are rebuilt from their replaced children.
    pub fn replace_model_value(
        &mut self,
        tm: &mut TermManager,
        classes: &ValueClasses,
        value: TermId,
    ) -> TermId {
        if let Some(t) = self.choose(classes.class(value)) {
            return t;
        }
        let children = tm.children(value);
        if children.is_empty() {
            return value;
        }
        let replaced: Vec<TermId> = children
            .iter()
            .map(|&c| self.replace_model_value(tm, classes, c))
            .collect();
        if replaced.as_slice() == children.as_slice() {
            value
        } else {
            tm.with_children(value, &replaced)
        }
    }
}

impl Default for TermChooser {
    fn default() -> Self {
        Self::new(0)
    }
}
