//! Miscellaneous solver state.

/// Miscellaneous solver state.
///
/// The `ok` flag is the engine wide unsat signal: it starts out `true` and is
/// cleared as soon as any operation derives the empty clause. No operation
/// ever sets it back.
pub struct SolverState {
    pub ok: bool,
}

impl Default for SolverState {
    fn default() -> SolverState {
        SolverState { ok: true }
    }
}
