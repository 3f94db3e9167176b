//! Model-based implicant extraction.
//!
//! Reduces a set of formulas that hold in a model to a set of literals
//! that also hold in it and imply the original set. Disjunctions keep one
//! true disjunct, `ite` keeps the branch selected by the model together
//! with the condition, and negations are pushed through the connectives.

use mbqi_core::ast::{TermId, TermKind, TermManager};
use mbqi_core::model::Model;

/// Replace `fmls` by literals true in `model` that imply them. Formulas
/// that cannot be decided in the model are kept as they are.
pub fn extract_literals(tm: &mut TermManager, model: &Model, fmls: &mut Vec<TermId>) {
    let mut todo: Vec<TermId> = fmls.drain(..).rev().collect();
    let mut out: Vec<TermId> = Vec::new();
    while let Some(f) = todo.pop() {
        let Some(kind) = tm.get(f).map(|t| t.kind.clone()) else {
            continue;
        };
        let bool_sort = tm.sorts.bool_sort;
        match kind {
            TermKind::True => {}
            TermKind::And(args) => todo.extend(args.iter().rev()),
            TermKind::Or(args) => match args.iter().copied().find(|&a| model.is_true(tm, a)) {
                Some(a) => todo.push(a),
                None => keep(f, &mut out),
            },
            TermKind::Implies(a, b) => {
                if model.is_false(tm, a) {
                    let na = tm.mk_not(a);
                    todo.push(na);
                } else {
                    todo.push(b);
                }
            }
            TermKind::Ite(c, t, e) if tm.sort(t) == bool_sort => {
                if model.is_true(tm, c) {
                    todo.push(t);
                    todo.push(c);
                } else {
                    let nc = tm.mk_not(c);
                    todo.push(e);
                    todo.push(nc);
                }
            }
            TermKind::Eq(a, b) if tm.sort(a) == bool_sort => {
                if model.is_true(tm, a) {
                    todo.push(b);
                    todo.push(a);
                } else {
                    let na = tm.mk_not(a);
                    let nb = tm.mk_not(b);
                    todo.push(nb);
                    todo.push(na);
                }
            }
            TermKind::Not(inner) => {
                let Some(inner_kind) = tm.get(inner).map(|t| t.kind.clone()) else {
                    continue;
                };
                match inner_kind {
                    TermKind::False => {}
                    TermKind::Not(a) => todo.push(a),
                    TermKind::Or(args) => {
                        for &a in args.iter().rev() {
                            let na = tm.mk_not(a);
                            todo.push(na);
                        }
                    }
                    TermKind::And(args) => {
                        match args.iter().copied().find(|&a| model.is_false(tm, a)) {
                            Some(a) => {
                                let na = tm.mk_not(a);
                                todo.push(na);
                            }
                            None => keep(f, &mut out),
                        }
                    }
                    TermKind::Implies(a, b) => {
                        let nb = tm.mk_not(b);
                        todo.push(nb);
                        todo.push(a);
                    }
                    TermKind::Ite(c, t, e) if tm.sort(t) == bool_sort => {
                        if model.is_true(tm, c) {
                            let nt = tm.mk_not(t);
                            todo.push(nt);
                            todo.push(c);
                        } else {
                            let nc = tm.mk_not(c);
                            let ne = tm.mk_not(e);
                            todo.push(ne);
                            todo.push(nc);
                        }
                    }
                    TermKind::Eq(a, b) if tm.sort(a) == bool_sort => {
                        if model.is_true(tm, a) {
                            let nb = tm.mk_not(b);
                            todo.push(nb);
                            todo.push(a);
                        } else {
                            let na = tm.mk_not(a);
                            todo.push(b);
                            todo.push(na);
                        }
                    }
                    _ => keep(f, &mut out),
                }
            }
            _ => keep(f, &mut out),
        }
    }
    *fmls = out;
}

fn keep(t: TermId, out: &mut Vec<TermId>) {
    if !out.contains(&t) {
        out.push(t);
    }
}
