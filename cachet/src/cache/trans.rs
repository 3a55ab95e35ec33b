//! Per literal implication sets.
use std::fmt;

use cachet_formula::{Lit, LitIdx, Var};

/// A cached literal together with its derivation quality.
///
/// Packs a literal code and a single flag into one word. The flag is set when
/// every known derivation of this implication used only irredundant binary
/// clauses. It can only degrade: once a redundant step contributed, no later
/// witness restores it.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct CachedLit {
    data: LitIdx,
}

impl CachedLit {
    /// Create an entry for a literal.
    #[inline]
    pub fn new(lit: Lit, only_irred: bool) -> CachedLit {
        CachedLit {
            data: ((lit.code() as LitIdx) << 1) | (only_irred as LitIdx),
        }
    }

    /// The cached literal.
    #[inline]
    pub fn lit(self) -> Lit {
        Lit::from_code((self.data >> 1) as usize)
    }

    /// Whether the implication is known through irredundant binaries only.
    #[inline]
    pub fn only_irred(self) -> bool {
        (self.data & 1) != 0
    }

    /// Upgrade the entry to an irredundant-only derivation.
    #[inline]
    pub fn set_only_irred(&mut self) {
        self.data |= 1;
    }
}

impl fmt::Debug for CachedLit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.lit(),
            if self.only_irred() { "I" } else { "R" }
        )
    }
}

/// The implications cached for a single source literal.
///
/// Contains every literal known to follow from assuming the source literal,
/// each tagged with the derivation quality flag. The set never contains the
/// source literal or its negation. Both polarities of another variable may
/// appear transiently during a merge; that is the tautology signal reported
/// to the caller.
#[derive(Default)]
pub struct TransCache {
    lits: Vec<CachedLit>,
}

impl TransCache {
    /// The cached entries.
    pub fn entries(&self) -> &[CachedLit] {
        &self.lits
    }

    /// Mutable access for cleaning.
    pub(super) fn entries_mut(&mut self) -> &mut Vec<CachedLit> {
        &mut self.lits
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lits.len()
    }

    /// Allocated capacity in entries.
    pub fn capacity(&self) -> usize {
        self.lits.capacity()
    }

    /// Fold a set of cached entries into this set.
    ///
    /// `redundant` states whether the derivation step that produced the
    /// incoming literals used a redundant clause; it degrades the flag of
    /// everything added. `extra_lit` is one additional literal to fold in.
    /// Literals of the `leave_out` variable are dropped instead of added.
    ///
    /// `seen` is scratch indexed by literal codes, all-zero on entry and on
    /// return. Existing entries deduplicate against the incoming ones, and an
    /// existing entry is upgraded to irredundant-only when the same literal
    /// arrives with the flag set over an irredundant step.
    ///
    /// Returns true when the negation of an existing entry is among the
    /// incoming literals. The combined set then derives both polarities of a
    /// variable from the source literal, which forces the source literal's
    /// negation at the top level.
    pub fn merge(
        &mut self,
        other_lits: &[CachedLit],
        extra_lit: Option<Lit>,
        redundant: bool,
        leave_out: Option<Var>,
        seen: &mut [u16],
    ) -> bool {
        for &other in other_lits {
            seen[other.lit().code()] = 1 + other.only_irred() as u16;
        }

        let taut = self.merge_marks(extra_lit, redundant, seen);

        // Whatever is still marked was not present yet
        for &other in other_lits {
            let lit = other.lit();
            if seen[lit.code()] != 0 {
                if leave_out != Some(lit.var()) {
                    self.lits
                        .push(CachedLit::new(lit, !redundant && other.only_irred()));
                }
                seen[lit.code()] = 0;
            }
        }

        if let Some(extra) = extra_lit {
            if seen[extra.code()] != 0 {
                if leave_out != Some(extra.var()) {
                    self.lits.push(CachedLit::new(extra, !redundant));
                }
                seen[extra.code()] = 0;
            }
        }

        taut
    }

    /// Fold plain literals into this set.
    ///
    /// Like [`merge`](TransCache::merge), but the incoming literals carry no
    /// derivation quality of their own and are added with the flag cleared.
    pub fn merge_lits(
        &mut self,
        other_lits: &[Lit],
        extra_lit: Option<Lit>,
        redundant: bool,
        leave_out: Option<Var>,
        seen: &mut [u16],
    ) -> bool {
        for &lit in other_lits {
            seen[lit.code()] = 1;
        }

        let taut = self.merge_marks(extra_lit, redundant, seen);

        for &lit in other_lits {
            if seen[lit.code()] != 0 {
                if leave_out != Some(lit.var()) {
                    self.lits.push(CachedLit::new(lit, false));
                }
                seen[lit.code()] = 0;
            }
        }

        if let Some(extra) = extra_lit {
            if seen[extra.code()] != 0 {
                if leave_out != Some(extra.var()) {
                    self.lits.push(CachedLit::new(extra, !redundant));
                }
                seen[extra.code()] = 0;
            }
        }

        taut
    }

    /// Deduplicate marked incoming literals against the existing entries.
    ///
    /// Unmarks everything already present, upgrading present entries where
    /// the incoming mark witnesses an irredundant-only derivation. Reports
    /// whether the negation of an existing entry is marked.
    fn merge_marks(&mut self, extra_lit: Option<Lit>, redundant: bool, seen: &mut [u16]) -> bool {
        let mut taut = false;

        if let Some(extra) = extra_lit {
            seen[extra.code()] = 1 + !redundant as u16;
        }

        for entry in self.lits.iter_mut() {
            if !redundant && !entry.only_irred() && seen[entry.lit().code()] == 2 {
                entry.set_only_irred();
            }

            seen[entry.lit().code()] = 0;

            if seen[(!entry.lit()).code()] != 0 {
                taut = true;
            }
        }

        taut
    }

    /// Clear the derivation quality flag on every entry.
    ///
    /// Used when the irredundant clause set shrank and cached derivations can
    /// no longer be trusted to avoid redundant steps.
    pub fn make_all_red(&mut self) {
        for entry in self.lits.iter_mut() {
            *entry = CachedLit::new(entry.lit(), false);
        }
    }

    /// Rewrite every entry through a variable renaming.
    pub fn update_vars(&mut self, outer_to_inter: &[Var]) {
        for entry in self.lits.iter_mut() {
            let lit = entry.lit().map_var(|var| outer_to_inter[var.index()]);
            *entry = CachedLit::new(lit, entry.only_irred());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::{collection, prelude::*};

    use cachet_formula::{lit, lits, var};

    const SCRATCH_LEN: usize = 64;

    fn entry(number: isize, only_irred: bool) -> CachedLit {
        CachedLit::new(Lit::from_dimacs(number), only_irred)
    }

    fn lit_set(cache: &TransCache) -> Vec<(Lit, bool)> {
        let mut set: Vec<_> = cache
            .entries()
            .iter()
            .map(|entry| (entry.lit(), entry.only_irred()))
            .collect();
        set.sort();
        set
    }

    fn cached_lits(max_index: usize) -> impl Strategy<Value = Vec<CachedLit>> {
        collection::vec(
            (
                cachet_formula::lit::strategy::lit(0..max_index),
                proptest::bool::ANY,
            )
                .prop_map(|(lit, flag)| CachedLit::new(lit, flag)),
            0..20,
        )
    }

    /// Entry sets over pairwise distinct variables.
    ///
    /// Cache slots never hold both polarities of a variable outside of a
    /// merge in progress, so this is the shape merge inputs take in practice.
    fn distinct_var_entries(max_index: usize) -> impl Strategy<Value = Vec<CachedLit>> {
        collection::hash_map(
            0..max_index,
            (proptest::bool::ANY, proptest::bool::ANY),
            0..20,
        )
        .prop_map(|entries| {
            entries
                .into_iter()
                .map(|(index, (polarity, flag))| {
                    CachedLit::new(Lit::from_index(index, polarity), flag)
                })
                .collect()
        })
    }

    #[test]
    fn packing_roundtrip() {
        let entry = CachedLit::new(lit!(-7), true);
        assert_eq!(entry.lit(), lit!(-7));
        assert!(entry.only_irred());

        let mut entry = CachedLit::new(lit!(3), false);
        assert!(!entry.only_irred());
        entry.set_only_irred();
        assert_eq!(entry.lit(), lit!(3));
        assert!(entry.only_irred());
    }

    #[test]
    fn merge_detects_tautology() {
        let mut seen = vec![0u16; SCRATCH_LEN];
        let mut cache = TransCache::default();

        assert!(!cache.merge(
            &[entry(2, true), entry(3, false)],
            None,
            false,
            Some(var!(1)),
            &mut seen,
        ));

        assert!(cache.merge(&[entry(-2, false)], None, false, Some(var!(1)), &mut seen));
        assert!(seen.iter().all(|&v| v == 0));
    }

    #[test]
    fn merge_excludes_leave_out_and_dedups() {
        let mut seen = vec![0u16; SCRATCH_LEN];
        let mut cache = TransCache::default();

        cache.merge(
            &[entry(2, true), entry(4, false)],
            Some(lit!(5)),
            false,
            Some(var!(1)),
            &mut seen,
        );
        cache.merge(
            &[entry(2, true), entry(1, true), entry(-1, false)],
            None,
            false,
            Some(var!(1)),
            &mut seen,
        );

        assert_eq!(
            lit_set(&cache),
            vec![(lit!(2), true), (lit!(4), false), (lit!(5), true)]
        );
    }

    #[test]
    fn redundant_step_degrades_the_flag() {
        let mut seen = vec![0u16; SCRATCH_LEN];
        let mut cache = TransCache::default();

        cache.merge(&[entry(2, true)], Some(lit!(3)), true, None, &mut seen);
        assert_eq!(lit_set(&cache), vec![(lit!(2), false), (lit!(3), false)]);

        // A later irredundant witness upgrades the existing entry
        cache.merge(&[entry(2, true)], None, false, None, &mut seen);
        assert_eq!(lit_set(&cache), vec![(lit!(2), true), (lit!(3), false)]);

        // Plain literals never witness an irredundant derivation
        cache.merge_lits(&lits![4], None, false, None, &mut seen);
        assert_eq!(
            lit_set(&cache),
            vec![(lit!(2), true), (lit!(3), false), (lit!(4), false)]
        );
    }

    #[test]
    fn make_all_red_clears_flags() {
        let mut seen = vec![0u16; SCRATCH_LEN];
        let mut cache = TransCache::default();

        cache.merge(&[entry(2, true), entry(3, true)], None, false, None, &mut seen);
        cache.make_all_red();

        assert_eq!(lit_set(&cache), vec![(lit!(2), false), (lit!(3), false)]);
    }

    #[test]
    fn update_vars_keeps_signs_and_flags() {
        let mut seen = vec![0u16; SCRATCH_LEN];
        let mut cache = TransCache::default();

        cache.merge(&[entry(-2, true), entry(3, false)], None, false, None, &mut seen);

        // Swap variables 2 and 3
        let map = [var!(1), var!(3), var!(2), var!(4)];
        cache.update_vars(&map);

        assert_eq!(lit_set(&cache), vec![(lit!(2), false), (lit!(-3), true)]);
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(
            incoming in distinct_var_entries(20),
            redundant in proptest::bool::ANY,
        ) {
            let mut seen = vec![0u16; SCRATCH_LEN];

            let mut once = TransCache::default();
            once.merge(&incoming, None, redundant, None, &mut seen);

            let mut twice = TransCache::default();
            twice.merge(&incoming, None, redundant, None, &mut seen);
            twice.merge(&incoming, None, redundant, None, &mut seen);

            prop_assert_eq!(lit_set(&once), lit_set(&twice));
            prop_assert!(seen.iter().all(|&v| v == 0));
        }

        #[test]
        fn merge_tautology_matches_naive_check(
            existing in distinct_var_entries(10),
            incoming in cached_lits(10),
        ) {
            let mut seen = vec![0u16; SCRATCH_LEN];

            let mut cache = TransCache::default();
            cache.merge(&existing, None, false, None, &mut seen);

            let naive = cache.entries().iter().any(|entry| {
                incoming.iter().any(|other| other.lit() == !entry.lit())
            });

            let taut = cache.merge(&incoming, None, false, None, &mut seen);

            prop_assert_eq!(taut, naive);
            prop_assert!(seen.iter().all(|&v| v == 0));
        }
    }
}
