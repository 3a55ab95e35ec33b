//! Equivalent literal replacement table.
use partial_ref::{partial, PartialRef};

use cachet_formula::{Lit, Var};

use crate::context::{parts::*, Context};
use crate::variables::Removed;

/// Maps literals to the representative of their equivalence class.
///
/// Representatives map to themselves. A replacement registered while its
/// target is later replaced itself leaves a chain in the table; lookups
/// follow chains to the final representative, so they are idempotent and
/// preserve the sign of the queried literal. Chains always point towards
/// lower variable indices and therefore terminate.
#[derive(Default)]
pub struct VarReplacer {
    replaced_with: Vec<Lit>,
}

impl VarReplacer {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        let old_count = self.replaced_with.len();
        self.replaced_with
            .extend((old_count..count).map(|index| Var::from_index(index).positive()));
        self.replaced_with.truncate(count);
    }

    /// The representative literal for a literal.
    pub fn get_lit_replaced_with(&self, mut lit: Lit) -> Lit {
        loop {
            let next = self.replaced_with[lit.index()] ^ lit.is_negative();
            if next == lit {
                return lit;
            }
            lit = next;
        }
    }

    /// Whether a variable is its own representative.
    pub fn is_representative(&self, var: Var) -> bool {
        self.replaced_with[var.index()] == var.positive()
    }

    fn set_replacement(&mut self, replaced: Var, with: Lit) {
        debug_assert!(with.var() < replaced);
        self.replaced_with[replaced.index()] = with;
    }
}

/// Record that `replaced` is equivalent to the literal `with`.
///
/// Marks the replaced variable as queued for replacement. The caller must
/// pass a representative as `with`, so the table stays flat.
pub fn register_equivalence(
    mut ctx: partial!(Context, mut ReplacerP, mut VariablesP),
    replaced: Var,
    with: Lit,
) {
    debug_assert!(ctx.part(ReplacerP).is_representative(with.var()));

    ctx.part_mut(ReplacerP).set_replacement(replaced, with);
    ctx.part_mut(VariablesP)
        .set_removed(replaced, Removed::QueuedReplacer);
}

/// Mark all queued replacements as performed.
///
/// The actual rewriting of clauses is done by the surrounding inprocessing
/// machinery; this transition tells the cache cleaner that the renamed
/// variables are gone for good.
pub fn promote_queued_replacements(mut ctx: partial!(Context, mut VariablesP, ReplacerP)) {
    let (replacer, mut ctx) = ctx.split_part(ReplacerP);
    let variables = ctx.part_mut(VariablesP);

    for index in 0..variables.count() {
        let var = Var::from_index(index);
        if variables.removed(var) == Removed::QueuedReplacer {
            debug_assert!(!replacer.is_representative(var));
            variables.set_removed(var, Removed::Replaced);
        }
    }
}
