//! Model reconstruction over the original variable space.
//!
//! Inprocessing throws clauses away for good: resolution on an eliminated
//! variable and blocked clause elimination both drop clauses that a model of
//! the remaining formula need not satisfy. The reconstruction stack remembers
//! them, and after the search finds a satisfying assignment the extender
//! replays them in reverse removal order, completing the assignment over all
//! original variables without touching anything the search already fixed.
//!
//! The extender is a deliberately small propagation engine: occurrence lists
//! over an owned clause pool, a trail with a queue head, and a deterministic
//! branching rule. There is no conflict analysis and no backtracking. The
//! removed clauses are replayable by construction, so running into a conflict
//! here means the removal bookkeeping was broken and the extender aborts the
//! process.
use log::trace;

use partial_ref::{partial, PartialRef};

use rustc_hash::FxHashMap;

use cachet_formula::{Lit, Var};

use crate::context::{parts::*, Context};

/// A clause dropped by inprocessing, kept for model reconstruction.
pub struct RemovedClause {
    lits: Vec<Lit>,
    blocked: bool,
}

/// Clauses to replay when lifting a model, in removal order.
#[derive(Default)]
pub struct Reconstruction {
    stack: Vec<RemovedClause>,
}

impl Reconstruction {
    /// Record a clause removed by eliminating a variable.
    pub fn push_elimed_clause(&mut self, lits: &[Lit]) {
        self.stack.push(RemovedClause {
            lits: lits.to_vec(),
            blocked: false,
        });
    }

    /// Record a blocked clause, its blocking literal first.
    pub fn push_blocked_clause(&mut self, lits: &[Lit]) {
        debug_assert!(!lits.is_empty());
        self.stack.push(RemovedClause {
            lits: lits.to_vec(),
            blocked: true,
        });
    }

    /// The recorded clauses in removal order.
    pub fn stack(&self) -> &[RemovedClause] {
        &self.stack
    }

    /// Number of recorded clauses.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// A clause owned by the extender.
///
/// `xor_rhs` is `Some(parity)` for xor clauses and `None` for plain ones.
struct ExtClause {
    lits: Vec<Lit>,
    xor_rhs: Option<bool>,
}

/// Completes a partial assignment against replayed removed clauses.
pub struct SolutionExtender {
    assigns: Vec<Option<bool>>,
    trail: Vec<Lit>,
    qhead: usize,
    /// Clause ids, indexed by literal codes. Plain clauses are listed under
    /// their own literals, xor clauses under both polarities of each of
    /// their variables.
    occur: Vec<Vec<usize>>,
    clauses: Vec<ExtClause>,
    /// Branching polarity per variable.
    phase: Vec<bool>,
    /// Branching polarity satisfying the blocking literal of a blocked
    /// clause. Takes precedence over `phase`.
    blocked_phase: FxHashMap<Var, bool>,
}

impl SolutionExtender {
    /// Create an extender over the given number of variables, nothing
    /// assigned.
    pub fn new(var_count: usize) -> SolutionExtender {
        SolutionExtender {
            assigns: vec![None; var_count],
            trail: vec![],
            qhead: 0,
            occur: vec![vec![]; var_count * 2],
            clauses: vec![],
            phase: vec![false; var_count],
            blocked_phase: FxHashMap::default(),
        }
    }

    /// Number of variables.
    pub fn var_count(&self) -> usize {
        self.assigns.len()
    }

    /// Value of a variable.
    pub fn var_value(&self, var: Var) -> Option<bool> {
        self.assigns[var.index()]
    }

    /// Value of a literal.
    pub fn value(&self, lit: Lit) -> Option<bool> {
        self.assigns[lit.index()].map(|b| b ^ lit.is_negative())
    }

    /// Set the branching polarity for a variable.
    pub fn set_default_phase(&mut self, var: Var, phase: bool) {
        self.phase[var.index()] = phase;
    }

    /// Force a literal to true and put it on the trail.
    ///
    /// The literal must be unassigned.
    pub fn enqueue(&mut self, lit: Lit) {
        trace!("extender enqueues {}", lit);
        debug_assert!(self.value(lit).is_none());
        self.assigns[lit.index()] = Some(lit.is_positive());
        self.trail.push(lit);
    }

    /// Add a clause to replay.
    ///
    /// Registers the clause in the occurrence lists. A clause that is unit
    /// under the current assignment enqueues its remaining literal right
    /// away. Returns false when the clause is already falsified.
    pub fn add_clause(&mut self, lits: &[Lit]) -> bool {
        self.add(lits, None)
    }

    /// Add an xor clause, satisfied when the parity of its literal values
    /// equals `rhs`.
    pub fn add_xor_clause(&mut self, lits: &[Lit], rhs: bool) -> bool {
        self.add(lits, Some(rhs))
    }

    /// Add a blocked clause, its blocking literal first.
    ///
    /// Beyond a plain clause this records the branching preference for the
    /// blocking variable: when it comes up for branching, the polarity
    /// satisfying the blocking literal is chosen, which satisfies this clause
    /// no matter what the rest of it looks like.
    pub fn add_blocked_clause(&mut self, lits: &[Lit]) -> bool {
        debug_assert!(!lits.is_empty());
        let blocking = lits[0];
        self.blocked_phase
            .insert(blocking.var(), blocking.is_positive());
        self.add_clause(lits)
    }

    fn add(&mut self, lits: &[Lit], xor_rhs: Option<bool>) -> bool {
        let id = self.clauses.len();

        // In a plain clause repeated literals collapse; in an xor clause they
        // cancel against each other, which the parity arithmetic handles
        let mut clause_lits = Vec::with_capacity(lits.len());
        for &lit in lits {
            if xor_rhs.is_some() || !clause_lits.contains(&lit) {
                clause_lits.push(lit);
            }
        }

        for &lit in clause_lits.iter() {
            self.occur[lit.code()].push(id);
            if xor_rhs.is_some() {
                self.occur[(!lit).code()].push(id);
            }
        }

        self.clauses.push(ExtClause {
            lits: clause_lits,
            xor_rhs,
        });

        match self.assess(id) {
            Assessment::Falsified => false,
            Assessment::Forced(lit) => {
                self.enqueue(lit);
                true
            }
            Assessment::Open => true,
        }
    }

    /// Complete the assignment.
    ///
    /// Alternates exhaustive propagation with deterministic branching until
    /// every variable is assigned. Any fixed branching rule is sound here:
    /// there is no backtracking to interact with, conflicts cannot happen on
    /// replayable clauses.
    pub fn extend(&mut self) {
        loop {
            self.propagate();
            match self.pick_branch_lit() {
                Some(lit) => self.enqueue(lit),
                None => break,
            }
        }
    }

    fn propagate(&mut self) {
        while self.qhead < self.trail.len() {
            let lit = self.trail[self.qhead];
            self.qhead += 1;

            // Clauses containing the negation just lost a literal
            for watch_index in 0..self.occur[(!lit).code()].len() {
                let id = self.occur[(!lit).code()][watch_index];
                match self.assess(id) {
                    Assessment::Falsified => {
                        panic!("model extension ran into a conflict, removed clause bookkeeping is unsound");
                    }
                    Assessment::Forced(forced) => self.enqueue(forced),
                    Assessment::Open => (),
                }
            }
        }
    }

    /// What the current assignment does to a clause.
    fn assess(&self, id: usize) -> Assessment {
        let clause = &self.clauses[id];

        match clause.xor_rhs {
            None => {
                let mut unassigned = None;
                let mut unassigned_count = 0;

                for &lit in clause.lits.iter() {
                    match self.value(lit) {
                        Some(true) => return Assessment::Open,
                        Some(false) => (),
                        None => {
                            unassigned = Some(lit);
                            unassigned_count += 1;
                        }
                    }
                }

                match (unassigned_count, unassigned) {
                    (0, _) => Assessment::Falsified,
                    (1, Some(lit)) => Assessment::Forced(lit),
                    _ => Assessment::Open,
                }
            }
            Some(rhs) => {
                let mut parity = rhs;
                let mut unassigned = None;
                let mut unassigned_count = 0;

                for &lit in clause.lits.iter() {
                    match self.value(lit) {
                        Some(value) => parity ^= value,
                        None => {
                            unassigned = Some(lit);
                            unassigned_count += 1;
                        }
                    }
                }

                match (unassigned_count, unassigned) {
                    // All assigned: leftover parity means the xor fails
                    (0, _) if parity => Assessment::Falsified,
                    (0, _) => Assessment::Open,
                    (1, Some(lit)) => Assessment::Forced(lit ^ !parity),
                    _ => Assessment::Open,
                }
            }
        }
    }

    fn pick_branch_lit(&self) -> Option<Lit> {
        for (index, value) in self.assigns.iter().enumerate() {
            if value.is_none() {
                let var = Var::from_index(index);
                let polarity = self
                    .blocked_phase
                    .get(&var)
                    .copied()
                    .unwrap_or(self.phase[index]);
                return Some(var.lit(polarity));
            }
        }
        None
    }
}

enum Assessment {
    Open,
    Forced(Lit),
    Falsified,
}

/// Lift the current assignment to a model over all original variables.
///
/// Seeds an extender with the assignment and the saved phases, replays the
/// reconstruction stack newest first and completes the assignment. Returns
/// one literal per variable.
pub fn reconstruct_model(
    ctx: partial!(Context, AssignmentP, ReconstructionP, VariablesP),
) -> Vec<Lit> {
    let assignment = ctx.part(AssignmentP);
    let reconstruction = ctx.part(ReconstructionP);
    let var_count = ctx.part(VariablesP).count();

    let mut extender = SolutionExtender::new(var_count);

    for index in 0..var_count {
        let var = Var::from_index(index);
        extender.set_default_phase(var, assignment.last_var_value(var));
        if let Some(value) = assignment.var_value(var) {
            extender.enqueue(var.lit(value));
        }
    }

    for removed in reconstruction.stack().iter().rev() {
        let added = if removed.blocked {
            extender.add_blocked_clause(&removed.lits)
        } else {
            extender.add_clause(&removed.lits)
        };
        assert!(added, "removed clause is falsified by the model it must extend");
    }

    extender.extend();

    (0..var_count)
        .map(|index| {
            let var = Var::from_index(index);
            var.lit(extender.var_value(var).expect("extension left a variable unassigned"))
        })
        .collect()
}
