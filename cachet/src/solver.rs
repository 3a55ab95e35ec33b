//! Public facade over the engine core.
use partial_ref::{partial, IntoPartialRef, IntoPartialRefMut, PartialRef};

use cachet_formula::{Lit, Var};

use crate::cache;
use crate::config::SolverConfig;
use crate::context::{ensure_var_count, parts::*, Context};
use crate::load::{add_clause_int, add_xor_clause_int};
use crate::model;
use crate::prop::enqueue_these;
use crate::replace::promote_queued_replacements;
use crate::stats::RunStats;
use crate::variables::Removed;

/// The engine core behind a simple owned interface.
///
/// Clause addition and unit assignment operate at the top level of an
/// otherwise external search. Inprocessing feeds the implication cache
/// through [`cache_implications`](Solver::cache_implications) and harvests it
/// with [`try_both`](Solver::try_both) and
/// [`clean_cache`](Solver::clean_cache). Removed clauses are recorded so a
/// model of the reduced formula can be lifted back over all original
/// variables.
#[derive(Default)]
pub struct Solver {
    ctx: Box<Context>,
}

impl Solver {
    /// Create a new solver.
    pub fn new() -> Solver {
        Solver::default()
    }

    /// Create a solver with a non-default configuration.
    pub fn with_config(config: SolverConfig) -> Solver {
        let mut solver = Solver::default();
        solver.ctx.solver_config = config;
        solver
    }

    /// Whether the formula is still possibly satisfiable.
    ///
    /// Once this is false every further operation is a no-op.
    pub fn ok(&self) -> bool {
        self.ctx.solver_state.ok
    }

    /// Grow the variable space to at least `count` variables.
    pub fn ensure_var_count(&mut self, count: usize) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ensure_var_count(ctx.borrow(), count);
    }

    /// Allocate a fresh variable.
    pub fn new_var(&mut self) -> Var {
        let count = self.ctx.variables.count();
        self.ensure_var_count(count + 1);
        Var::from_index(count)
    }

    /// Number of variables.
    pub fn var_count(&self) -> usize {
        self.ctx.variables.count()
    }

    /// Value of a literal under the current assignment.
    pub fn value(&self, lit: Lit) -> Option<bool> {
        self.ctx.assignment.lit_value(lit)
    }

    /// Value of a variable under the current assignment.
    pub fn var_value(&self, var: Var) -> Option<bool> {
        self.ctx.assignment.var_value(var)
    }

    /// Add a clause at the top level.
    pub fn add_clause(&mut self, lits: &[Lit]) {
        let var_count = lits.iter().map(|lit| lit.index() + 1).max().unwrap_or(0);
        self.ensure_var_count(var_count);

        let mut ctx = self.ctx.into_partial_ref_mut();
        add_clause_int(ctx.borrow(), lits);
    }

    /// Add an xor clause at the top level.
    ///
    /// Only constraints that simplify to at most two variables are supported
    /// by the core.
    pub fn add_xor_clause(&mut self, lits: &[Lit], rhs: bool) {
        let var_count = lits.iter().map(|lit| lit.index() + 1).max().unwrap_or(0);
        self.ensure_var_count(var_count);

        let mut ctx = self.ctx.into_partial_ref_mut();
        add_xor_clause_int(ctx.borrow(), lits, rhs, true);
    }

    /// Assign literals at the top level and propagate.
    pub fn enqueue_these(&mut self, lits: &[Lit]) -> bool {
        let mut ctx = self.ctx.into_partial_ref_mut();
        enqueue_these(ctx.borrow(), lits)
    }

    /// Set the saved phase of a variable.
    ///
    /// The phase decides the polarity an unconstrained variable receives
    /// during model reconstruction.
    pub fn set_phase(&mut self, var: Var, phase: bool) {
        self.ctx.assignment.set_last_value(var, phase);
    }

    /// Record literals implied by assuming `premise`.
    ///
    /// This is the entry point for probing style inprocessing. `redundant`
    /// marks derivations that passed through a redundant clause. When the
    /// recorded implications show that `premise` implies both polarities of
    /// some variable, its negation is enqueued at the top level right away.
    pub fn cache_implications(&mut self, premise: Lit, implied: &[Lit], redundant: bool) -> bool {
        let mut ctx = self.ctx.into_partial_ref_mut();

        if !ctx.part(SolverConfigP).do_cache || !ctx.part(SolverStateP).ok {
            return ctx.part(SolverStateP).ok;
        }

        let taut = {
            let mut ctx: partial!(Context, mut CacheP, mut TmpDataP) = ctx.borrow();
            let (cache, mut ctx) = ctx.split_part_mut(CacheP);
            let (tmp, _ctx) = ctx.split_part_mut(TmpDataP);

            cache.slot_mut(premise).merge_lits(
                implied,
                None,
                redundant,
                Some(premise.var()),
                &mut tmp.seen,
            )
        };

        if taut {
            enqueue_these(ctx.borrow(), &[!premise]);
        }

        ctx.part(SolverStateP).ok
    }

    /// Find new units and equivalences by joining both cache sides of every
    /// variable.
    pub fn try_both(&mut self) -> bool {
        let mut ctx = self.ctx.into_partial_ref_mut();
        cache::try_both(ctx.borrow())
    }

    /// Drop stale data from the implication cache.
    pub fn clean_cache(&mut self) -> bool {
        let mut ctx = self.ctx.into_partial_ref_mut();
        cache::clean(ctx.borrow())
    }

    /// Degrade every cached implication to redundant.
    pub fn make_cache_all_red(&mut self) {
        self.ctx.cache.make_all_red();
    }

    /// Heap memory used by the implication cache in bytes.
    pub fn cache_mem_used(&self) -> usize {
        self.ctx.cache.mem_used()
    }

    /// Statistics of the most recent [`try_both`](Solver::try_both) round.
    pub fn cache_run_stats(&self) -> &RunStats {
        self.ctx.cache.run_stats()
    }

    /// Statistics accumulated over all rounds.
    pub fn cache_global_stats(&self) -> &RunStats {
        self.ctx.cache.global_stats()
    }

    /// Log how densely populated the implication cache is.
    pub fn log_cache_stats(&self) {
        let mut ctx = self.ctx.into_partial_ref();
        cache::log_stats(ctx.borrow());
    }

    /// Mark all queued equivalences as performed.
    ///
    /// To be called once the surrounding inprocessing has rewritten its
    /// clauses through the replacer.
    pub fn promote_queued_replacements(&mut self) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        promote_queued_replacements(ctx.borrow());
    }

    /// The representative literal for a literal.
    pub fn get_lit_replaced_with(&self, lit: Lit) -> Lit {
        self.ctx.replacer.get_lit_replaced_with(lit)
    }

    /// Removal state of a variable.
    pub fn var_removed(&self, var: Var) -> Removed {
        self.ctx.variables.removed(var)
    }

    /// Remove a variable by resolution.
    ///
    /// The clauses the elimination dropped are recorded for model
    /// reconstruction.
    pub fn eliminate_var(&mut self, var: Var, removed_clauses: &[&[Lit]]) {
        self.ctx.variables.set_removed(var, Removed::Elimed);
        for &clause in removed_clauses {
            debug_assert!(clause.iter().any(|lit| lit.var() == var));
            self.ctx.reconstruction.push_elimed_clause(clause);
        }
    }

    /// Record a clause removed as blocked, its blocking literal first.
    pub fn remove_blocked_clause(&mut self, lits: &[Lit]) {
        self.ctx.reconstruction.push_blocked_clause(lits);
    }

    /// Lift the current assignment to a model over all original variables.
    ///
    /// Returns one literal per variable. Every clause dropped by variable
    /// elimination or blocked clause removal is satisfied by the result, and
    /// nothing already assigned changes its value.
    pub fn reconstruct_model(&self) -> Vec<Lit> {
        let mut ctx = self.ctx.into_partial_ref();
        model::reconstruct_model(ctx.borrow())
    }
}
