//! Watchlists over binary and long clauses.
//!
//! `watches[lit]` lists everything that reacts to `lit` becoming true. A
//! binary watch directly names the implied literal of a binary clause. A long
//! watch references a stored clause together with a blocking literal, exactly
//! like the search-time watchlists these feed into. Inprocessing only ever
//! consumes the binary entries; long entries are kept in shape for the
//! surrounding search.
use cachet_formula::Lit;

use crate::clauses::ClauseRef;

/// A single watchlist entry.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Watch {
    /// The other literal of a binary clause.
    ///
    /// Listed under `lit`, this records the binary clause `(¬lit ∨ implied)`.
    Binary { implied: Lit },
    /// A long clause with a blocking literal.
    Long { cref: ClauseRef, blocking: Lit },
}

impl Watch {
    /// The implied literal of a binary watch.
    pub fn binary_implied(self) -> Option<Lit> {
        match self {
            Watch::Binary { implied } => Some(implied),
            Watch::Long { .. } => None,
        }
    }
}

/// Watchlists for all literals.
#[derive(Default)]
pub struct Watchlists {
    watches: Vec<Vec<Watch>>,
    binary_count: usize,
}

impl Watchlists {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.watches.resize(count * 2, vec![]);
    }

    /// Add a binary clause.
    pub fn add_binary_clause(&mut self, lits: [Lit; 2]) {
        for i in 0..2 {
            self.watches[(!lits[i]).code()].push(Watch::Binary {
                implied: lits[i ^ 1],
            });
        }
        self.binary_count += 1;
    }

    /// Start watching a long clause.
    ///
    /// `lits` have to be the first two literals of the referenced clause.
    pub fn watch_clause(&mut self, cref: ClauseRef, lits: [Lit; 2]) {
        for i in 0..2 {
            self.watches[(!lits[i]).code()].push(Watch::Long {
                cref,
                blocking: lits[i ^ 1],
            });
        }
    }

    /// Watch entries for a literal.
    pub fn watches(&self, lit: Lit) -> &[Watch] {
        &self.watches[lit.code()]
    }

    /// Number of binary clauses.
    pub fn binary_count(&self) -> usize {
        self.binary_count
    }
}
