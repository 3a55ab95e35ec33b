//! Statistics for the implication cache.
use std::ops::AddAssign;

use log::info;

use serde::{Deserialize, Serialize};

/// Counters for one round of cache based inprocessing.
#[derive(Copy, Clone, Default, Debug, Serialize, Deserialize)]
pub struct RunStats {
    /// New unit literals found.
    pub b_prop: u64,
    /// New literal equivalences found.
    pub b_x_prop: u64,
    /// Assignments added to the top level trail.
    pub zero_depth_assigns: u64,
    /// Wall clock seconds spent.
    pub cpu_time: f64,
    /// Number of rounds accumulated into this record.
    pub num_calls: u64,
}

impl RunStats {
    /// Reset all counters.
    pub fn clear(&mut self) {
        *self = RunStats::default();
    }

    /// Log a one line summary.
    pub fn log_short(&self) {
        info!(
            "cache: {} units, {} equivalences, {} zero-depth assigns, T: {:.2}",
            self.b_prop, self.b_x_prop, self.zero_depth_assigns, self.cpu_time
        );
    }
}

impl AddAssign for RunStats {
    fn add_assign(&mut self, other: RunStats) {
        self.b_prop += other.b_prop;
        self.b_x_prop += other.b_x_prop;
        self.zero_depth_assigns += other.zero_depth_assigns;
        self.cpu_time += other.cpu_time;
        self.num_calls += other.num_calls;
    }
}
