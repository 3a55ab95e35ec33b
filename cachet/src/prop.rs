//! Assignment, trail and top level propagation.
use partial_ref::{partial, PartialRef};

use cachet_formula::{Lit, LitIdx, Var};

use crate::context::{parts::*, Context};
use crate::watches::Watch;

/// Current partial assignment.
#[derive(Default)]
pub struct Assignment {
    assignment: Vec<Option<bool>>,
    last_value: Vec<bool>,
}

impl Assignment {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.assignment.resize(count, None);
        self.last_value.resize(count, false);
    }

    /// Value assigned to a variable.
    pub fn var_value(&self, var: Var) -> Option<bool> {
        self.assignment[var.index()]
    }

    /// Value assigned to a literal.
    pub fn lit_value(&self, lit: Lit) -> Option<bool> {
        self.assignment[lit.index()].map(|b| b ^ lit.is_negative())
    }

    pub fn lit_is_true(&self, lit: Lit) -> bool {
        self.assignment[lit.index()] == Some(lit.is_positive())
    }

    pub fn lit_is_false(&self, lit: Lit) -> bool {
        self.assignment[lit.index()] == Some(lit.is_negative())
    }

    pub fn lit_is_unk(&self, lit: Lit) -> bool {
        self.assignment[lit.index()].is_none()
    }

    pub fn assign_lit(&mut self, lit: Lit) {
        self.assignment[lit.index()] = Some(lit.is_positive());
        self.last_value[lit.index()] = lit.is_positive();
    }

    /// Value most recently assigned to a variable.
    ///
    /// Defaults to `false` for variables that were never assigned. Used as
    /// the saved phase when reconstructing a model.
    pub fn last_var_value(&self, var: Var) -> bool {
        self.last_value[var.index()]
    }

    /// Overwrite the saved phase of a variable.
    pub fn set_last_value(&mut self, var: Var, value: bool) {
        self.last_value[var.index()] = value;
    }
}

/// Assignment history.
#[derive(Default)]
pub struct Trail {
    /// All enqueued assignments in order.
    trail: Vec<Lit>,
    /// Next assignment in the trail to propagate.
    queue_head_pos: usize,
    /// Decision levels as trail indices.
    decisions: Vec<LitIdx>,
}

impl Trail {
    /// Return the next assigned literal to propagate and advance the queue.
    pub fn pop_queue(&mut self) -> Option<Lit> {
        let head = self.trail.get(self.queue_head_pos).cloned();
        if head.is_some() {
            self.queue_head_pos += 1;
        }
        head
    }

    /// Assigned literals in assignment order.
    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }

    /// Current decision level.
    ///
    /// The core operates at level zero; levels exist for the surrounding
    /// search, which pushes a decision marker per branching step.
    pub fn current_level(&self) -> usize {
        self.decisions.len()
    }

    /// Start a new decision level.
    pub fn new_decision_level(&mut self) {
        self.decisions.push(self.trail.len() as LitIdx)
    }

    fn push(&mut self, lit: Lit) {
        self.trail.push(lit);
    }
}

/// Enqueue the assignment of true to a literal.
///
/// Updates the assignment and the trail without propagating. The literal must
/// be unassigned.
pub fn enqueue_assignment(
    mut ctx: partial!(Context, mut AssignmentP, mut TrailP),
    lit: Lit,
) {
    let assignment = ctx.part_mut(AssignmentP);
    debug_assert!(assignment.lit_value(lit) == None);

    assignment.assign_lit(lit);
    ctx.part_mut(TrailP).push(lit);
}

/// Propagate all pending assignments over the binary clauses.
///
/// Long clauses are the business of the search-time propagation loop and are
/// not looked at here. Returns the `ok` flag, which is cleared when a binary
/// clause runs empty.
pub fn propagate(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut SolverStateP,
        mut TrailP,
        WatchlistsP,
    ),
) -> bool {
    let (watchlists, mut ctx) = ctx.split_part(WatchlistsP);

    while let Some(lit) = ctx.part_mut(TrailP).pop_queue() {
        for watch in watchlists.watches(lit) {
            let implied = match watch {
                Watch::Binary { implied } => *implied,
                Watch::Long { .. } => continue,
            };

            if ctx.part(AssignmentP).lit_is_false(implied) {
                ctx.part_mut(SolverStateP).ok = false;
                return false;
            } else if ctx.part(AssignmentP).lit_is_unk(implied) {
                enqueue_assignment(ctx.borrow(), implied);
            }
        }
    }

    true
}

/// Add unit clauses at the top level.
///
/// Every literal is assigned and the assignment is closed under binary
/// propagation. A conflicting literal clears the `ok` flag and stops
/// processing.
pub fn enqueue_these(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut SolverStateP,
        mut TrailP,
        WatchlistsP,
    ),
    lits: &[Lit],
) -> bool {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    for &lit in lits {
        if ctx.part(AssignmentP).lit_is_false(lit) {
            ctx.part_mut(SolverStateP).ok = false;
            return false;
        }
        if ctx.part(AssignmentP).lit_is_unk(lit) {
            enqueue_assignment(ctx.borrow(), lit);
        }
    }

    propagate(ctx.borrow())
}
