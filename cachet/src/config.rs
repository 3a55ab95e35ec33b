//! Engine configuration.
use serde::{Deserialize, Serialize};

/// Configurable parameters of the engine core.
#[derive(Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Whether discovered literal equivalences are applied. (Default: true)
    ///
    /// When disabled, delayed equivalence clauses are discarded instead of
    /// being handed to the replacer.
    pub find_equiv_lits: bool,

    /// Whether implications are recorded in the cache at all. (Default: true)
    pub do_cache: bool,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            find_equiv_lits: true,
            do_cache: true,
        }
    }
}
