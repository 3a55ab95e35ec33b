//! Temporary data.
use cachet_formula::Lit;

/// Temporary data shared by various parts of the engine.
///
/// `seen` and `seen2` are indexed by literal codes. Every user must leave them
/// all-zero on return, on success and failure paths alike, so no operation
/// ever has to re-zero `2 * var_count` entries up front.
#[derive(Default)]
pub struct TmpData {
    pub lits: Vec<Lit>,
    pub seen: Vec<u16>,
    pub seen2: Vec<u16>,
}

impl TmpData {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.seen.resize(count * 2, 0);
        self.seen2.resize(count * 2, 0);
    }

    /// Whether both scratch vectors are all-zero.
    ///
    /// Intended for tests and debug assertions.
    pub fn is_clear(&self) -> bool {
        self.seen.iter().all(|&v| v == 0) && self.seen2.iter().all(|&v| v == 0)
    }
}
