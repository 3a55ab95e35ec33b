//! Adding clauses to the engine at the top level.
use partial_ref::{partial, PartialRef};

use cachet_formula::Lit;

use crate::context::{parts::*, Context};
use crate::prop::enqueue_these;
use crate::replace::register_equivalence;

/// Add a clause to the current formula.
///
/// Removes duplicate literals, ignores tautological clauses, strips false
/// literals and drops satisfied clauses, then dispatches among empty, unit,
/// binary and long clauses. An empty clause clears the `ok` flag.
///
/// Does not adjust the variable count; that has to happen before calling
/// this.
pub fn add_clause_int(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClausesP,
        mut SolverStateP,
        mut TmpDataP,
        mut TrailP,
        mut WatchlistsP,
    ),
    lits: &[Lit],
) {
    if !ctx.part(SolverStateP).ok {
        return;
    }

    let (tmp, mut ctx) = ctx.split_part_mut(TmpDataP);

    tmp.lits.clear();
    tmp.lits.extend_from_slice(lits);
    tmp.lits.sort_unstable();
    tmp.lits.dedup();

    // Detect tautological clauses
    let mut last = None;
    for &lit in tmp.lits.iter() {
        if last == Some(!lit) {
            return;
        }
        last = Some(lit);
    }

    {
        let assignment = ctx.part(AssignmentP);
        if tmp.lits.iter().any(|&lit| assignment.lit_is_true(lit)) {
            return;
        }
        tmp.lits.retain(|&lit| assignment.lit_is_unk(lit));
    }

    match tmp.lits[..] {
        [] => ctx.part_mut(SolverStateP).ok = false,
        [lit] => {
            enqueue_these(ctx.borrow(), &[lit]);
        }
        [lit_0, lit_1] => {
            ctx.part_mut(WatchlistsP)
                .add_binary_clause([lit_0, lit_1]);
        }
        ref lits => {
            let cref = ctx.part_mut(ClausesP).add_clause(lits);
            ctx.part_mut(WatchlistsP)
                .watch_clause(cref, [lits[0], lits[1]]);
        }
    }
}

/// Add an xor clause to the current formula.
///
/// The literal signs and the values of already assigned variables are folded
/// into the parity, duplicate variables cancel. What remains is an empty,
/// unit or equivalence constraint; longer xors are never produced by the
/// engine core. An equivalence is registered with the replacer and, when
/// `attach` is set, also added as the two implementing binary clauses.
pub fn add_xor_clause_int(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ReplacerP,
        mut SolverStateP,
        mut TmpDataP,
        mut TrailP,
        mut VariablesP,
        mut WatchlistsP,
    ),
    lits: &[Lit],
    rhs: bool,
    attach: bool,
) {
    if !ctx.part(SolverStateP).ok {
        return;
    }

    let mut rhs = rhs;

    let (tmp, mut ctx) = ctx.split_part_mut(TmpDataP);

    tmp.lits.clear();
    {
        let replacer = ctx.part(ReplacerP);
        let assignment = ctx.part(AssignmentP);
        for &lit in lits {
            let lit = replacer.get_lit_replaced_with(lit);
            rhs ^= lit.is_negative();
            match assignment.var_value(lit.var()) {
                Some(value) => rhs ^= value,
                None => tmp.lits.push(lit.var().positive()),
            }
        }
    }

    tmp.lits.sort_unstable();

    // x xor x cancels to zero
    let mut write = 0;
    let mut read = 0;
    while read < tmp.lits.len() {
        if read + 1 < tmp.lits.len() && tmp.lits[read] == tmp.lits[read + 1] {
            read += 2;
        } else {
            tmp.lits[write] = tmp.lits[read];
            write += 1;
            read += 1;
        }
    }
    tmp.lits.truncate(write);

    match tmp.lits[..] {
        [] => {
            if rhs {
                ctx.part_mut(SolverStateP).ok = false;
            }
        }
        [lit] => {
            enqueue_these(ctx.borrow(), &[lit ^ !rhs]);
        }
        [lit_0, lit_1] => {
            register_equivalence(ctx.borrow(), lit_1.var(), lit_0 ^ rhs);
            if attach {
                let watchlists = ctx.part_mut(WatchlistsP);
                watchlists.add_binary_clause([!lit_0, lit_1 ^ rhs]);
                watchlists.add_binary_clause([lit_0, !(lit_1 ^ rhs)]);
            }
        }
        _ => panic!("xor clauses over more than two variables are not supported"),
    }
}
