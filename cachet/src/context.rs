//! Central solver data structure.
//!
//! This module defines the `Context` data structure which holds all data used
//! by the engine core. It also contains global notification functions that
//! likely need to be extended when new parts are added.
use partial_ref::{part, partial, PartialRef, PartialRefTarget};

use crate::cache::ImplCache;
use crate::clauses::LongClauses;
use crate::config::SolverConfig;
use crate::model::Reconstruction;
use crate::prop::{Assignment, Trail};
use crate::replace::VarReplacer;
use crate::state::SolverState;
use crate::tmp::TmpData;
use crate::variables::Variables;
use crate::watches::Watchlists;

/// Part declarations for the [`Context`] struct.
pub mod parts {
    use super::*;

    part!(pub AssignmentP: Assignment);
    part!(pub CacheP: ImplCache);
    part!(pub ClausesP: LongClauses);
    part!(pub ReconstructionP: Reconstruction);
    part!(pub ReplacerP: VarReplacer);
    part!(pub SolverConfigP: SolverConfig);
    part!(pub SolverStateP: SolverState);
    part!(pub TmpDataP: TmpData);
    part!(pub TrailP: Trail);
    part!(pub VariablesP: Variables);
    part!(pub WatchlistsP: Watchlists);
}

use parts::*;

/// Central solver data structure.
///
/// This struct contains all data kept by the engine core. Most functions
/// operating on multiple fields of the context use partial references
/// provided by the `partial_ref` crate. This documents the data dependencies
/// and makes the borrow checker happy without the overhead of passing
/// individual references.
#[derive(PartialRefTarget, Default)]
pub struct Context {
    #[part(AssignmentP)]
    pub assignment: Assignment,
    #[part(CacheP)]
    pub cache: ImplCache,
    #[part(ClausesP)]
    pub clauses: LongClauses,
    #[part(ReconstructionP)]
    pub reconstruction: Reconstruction,
    #[part(ReplacerP)]
    pub replacer: VarReplacer,
    #[part(SolverConfigP)]
    pub solver_config: SolverConfig,
    #[part(SolverStateP)]
    pub solver_state: SolverState,
    #[part(TmpDataP)]
    pub tmp_data: TmpData,
    #[part(TrailP)]
    pub trail: Trail,
    #[part(VariablesP)]
    pub variables: Variables,
    #[part(WatchlistsP)]
    pub watchlists: Watchlists,
}

/// Update structures for a new variable count.
pub fn set_var_count(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut CacheP,
        mut ReplacerP,
        mut TmpDataP,
        mut VariablesP,
        mut WatchlistsP,
    ),
    count: usize,
) {
    ctx.part_mut(AssignmentP).set_var_count(count);
    ctx.part_mut(CacheP).set_var_count(count);
    ctx.part_mut(ReplacerP).set_var_count(count);
    ctx.part_mut(TmpDataP).set_var_count(count);
    ctx.part_mut(VariablesP).set_var_count(count);
    ctx.part_mut(WatchlistsP).set_var_count(count);
}

/// Increases the variable count to at least the given value.
pub fn ensure_var_count(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut CacheP,
        mut ReplacerP,
        mut TmpDataP,
        mut VariablesP,
        mut WatchlistsP,
    ),
    count: usize,
) {
    if count > ctx.part(VariablesP).count() {
        set_var_count(ctx.borrow(), count)
    }
}
