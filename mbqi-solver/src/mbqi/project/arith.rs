//! Integer projection.
//!
//! Constants are eliminated by, in order of preference:
//! - an equality `x = t` with `x` not in `t`
//! - a linear equality `x + s = t` or `x - s = t`, solved for `x`
//! - the bounds on `x`: when every literal mentioning `x` compares it
//!   directly against a term, `x` is replaced by the lower bound with the
//!   largest model value (or, without lower bounds, by the smallest upper
//!   bound). The remaining bounds are kept as comparisons against it.

use super::{ProjectPlugin, solve_eq, substitute_var};
use mbqi_core::ast::{SortFamily, TermId, TermKind, TermManager};
use mbqi_core::model::Model;
use mbqi_core::statistics::Statistics;
use num_bigint::BigInt;
use std::fmt;

/// Statistics for integer projection
#[derive(Debug, Clone, Default)]
pub struct ArithProjectStats {
    /// Constants solved from an equality
    pub num_solved: usize,
    /// Constants replaced by a bound
    pub num_bounded: usize,
}

impl fmt::Display for ArithProjectStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Arith Projection Statistics:")?;
        writeln!(f, "  Solved: {}", self.num_solved)?;
        writeln!(f, "  Bounded: {}", self.num_bounded)
    }
}

/// Projection plugin for integer constants.
#[derive(Debug, Default)]
pub struct ArithProjector {
    stats: ArithProjectStats,
}

/// `x >= term` or `x <= term` after integer normalization.
#[derive(Debug, Clone, Copy)]
struct Bound {
    lit: TermId,
    term: TermId,
    lower: bool,
}

impl ArithProjector {
    /// Create a new integer projector
    pub fn new() -> Self {
        Self::default()
    }

    /// Get statistics
    pub fn stats(&self) -> &ArithProjectStats {
        &self.stats
    }

    fn project_bounds(
        &mut self,
        tm: &mut TermManager,
        model: &Model,
        x: TermId,
        fmls: &mut Vec<TermId>,
    ) -> bool {
        let mut bounds = Vec::new();
        for &f in fmls.iter() {
            if !tm.contains(f, x) {
                continue;
            }
            match bound_of(tm, f, x) {
                Some(b) => bounds.push(b),
                None => return false,
            }
        }
        if bounds.is_empty() {
            return false;
        }
        let lower = bounds.iter().any(|b| b.lower);
        let mut best: Option<(Bound, BigInt)> = None;
        for &b in bounds.iter().filter(|b| b.lower == lower) {
            let Some(value) = model
                .eval_with(tm, b.term, true)
                .and_then(|v| tm.int_value(v).cloned())
            else {
                return false;
            };
            let better = match &best {
                None => true,
                Some((_, cur)) => {
                    if lower {
                        value > *cur
                    } else {
                        value < *cur
                    }
                }
            };
            if better {
                best = Some((b, value));
            }
        }
        let Some((chosen, _)) = best else {
            return false;
        };

        let mut out = Vec::with_capacity(fmls.len());
        for &f in fmls.iter() {
            let Some(b) = bounds.iter().find(|b| b.lit == f) else {
                out.push(f);
                continue;
            };
            if b.lit == chosen.lit || b.term == chosen.term {
                continue;
            }
            let lit = if b.lower {
                tm.mk_le(b.term, chosen.term)
            } else {
                tm.mk_le(chosen.term, b.term)
            };
            if !out.contains(&lit) {
                out.push(lit);
            }
        }
        *fmls = out;
        true
    }
}

impl ProjectPlugin for ArithProjector {
    fn family(&self) -> SortFamily {
        SortFamily::Arith
    }

    fn collect_statistics(&self, st: &mut Statistics) {
        st.update("arith-project-solved", self.stats.num_solved as u64);
        st.update("arith-project-bounded", self.stats.num_bounded as u64);
    }

    fn apply(
        &mut self,
        tm: &mut TermManager,
        model: &Model,
        vars: &mut Vec<TermId>,
        fmls: &mut Vec<TermId>,
    ) -> bool {
        let targets: Vec<TermId> = vars
            .iter()
            .copied()
            .filter(|&v| tm.family(tm.sort(v)) == SortFamily::Arith)
            .collect();
        let mut changed = false;
        for x in targets {
            if solve_eq(tm, x, fmls) || solve_linear(tm, x, fmls) {
                self.stats.num_solved += 1;
            } else if self.project_bounds(tm, model, x, fmls) {
                self.stats.num_bounded += 1;
            } else {
                continue;
            }
            vars.retain(|&v| v != x);
            changed = true;
        }
        changed
    }
}

/// Solve `x + s1 + .. = t`, `x - s = t` or `s - x = t` for `x`.
fn solve_linear(tm: &mut TermManager, x: TermId, fmls: &mut Vec<TermId>) -> bool {
    for k in 0..fmls.len() {
        let Some(TermKind::Eq(a, b)) = tm.get(fmls[k]).map(|t| t.kind.clone()) else {
            continue;
        };
        let solution = isolate(tm, x, a, b).or_else(|| isolate(tm, x, b, a));
        if let Some(t) = solution {
            fmls.remove(k);
            substitute_var(tm, x, t, fmls);
            return true;
        }
    }
    false
}

/// Term equal to `x` given `lhs = rhs`, when `x` occurs once at the top of
/// `lhs` and not in `rhs`.
fn isolate(tm: &mut TermManager, x: TermId, lhs: TermId, rhs: TermId) -> Option<TermId> {
    if tm.contains(rhs, x) {
        return None;
    }
    match tm.get(lhs).map(|t| t.kind.clone())? {
        TermKind::Add(args) => {
            let pos = args.iter().position(|&a| a == x)?;
            let rest: Vec<TermId> = args
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != pos)
                .map(|(_, &a)| a)
                .collect();
            if rest.iter().any(|&a| tm.contains(a, x)) {
                return None;
            }
            let sum = tm.mk_add(rest);
            Some(tm.mk_sub(rhs, sum))
        }
        TermKind::Sub(a, s) if a == x && !tm.contains(s, x) => Some(tm.mk_add(vec![rhs, s])),
        TermKind::Sub(s, a) if a == x && !tm.contains(s, x) => Some(tm.mk_sub(s, rhs)),
        _ => None,
    }
}

/// Read `lit` as an integer bound on `x`. Strict bounds are shifted by one.
fn bound_of(tm: &mut TermManager, lit: TermId, x: TermId) -> Option<Bound> {
    let (atom, negated) = match tm.get(lit).map(|t| t.kind.clone())? {
        TermKind::Not(inner) => (inner, true),
        _ => (lit, false),
    };
    // (other side, x is the smaller side, strict)
    let (term, x_below, strict) = match tm.get(atom).map(|t| t.kind.clone())? {
        TermKind::Lt(a, b) if a == x => (b, true, true),
        TermKind::Lt(a, b) if b == x => (a, false, true),
        TermKind::Le(a, b) if a == x => (b, true, false),
        TermKind::Le(a, b) if b == x => (a, false, false),
        TermKind::Gt(a, b) if a == x => (b, false, true),
        TermKind::Gt(a, b) if b == x => (a, true, true),
        TermKind::Ge(a, b) if a == x => (b, false, false),
        TermKind::Ge(a, b) if b == x => (a, true, false),
        _ => return None,
    };
    if tm.contains(term, x) {
        return None;
    }
    // not (x < t) is x >= t, not (x <= t) is x > t
    let (x_below, strict) = if negated {
        (!x_below, !strict)
    } else {
        (x_below, strict)
    };
    let term = if strict {
        let one = tm.mk_int(1);
        if x_below {
            tm.mk_sub(term, one)
        } else {
            tm.mk_add(vec![term, one])
        }
    } else {
        term
    };
    Some(Bound {
        lit,
        term,
        lower: !x_below,
    })
}
