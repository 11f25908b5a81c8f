use serde::{Deserialize, Serialize};

/// Seed length assumed by the colinearity filter
pub const COLINEAR_SEED_LENGTH: u32 = 12;

/// Minimum cluster length as a fraction of the read length
pub const MIN_CLUSTER_LENGTH_FRACTION: f64 = 0.01;

/// Minimum fraction of a cluster's query span covered by its seeds
pub const MIN_CLUSTER_COVERAGE: f64 = 0.01;

/// Thresholds for the overlap acceptance cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapParams {
    pub min_num_seeds: i64,
    pub min_percent_cov_bases: f64,
    pub error_rate: f64,
    /// Negative means unconstrained: the larger of the two sequence lengths.
    pub max_allowed_overhang: i64,
    pub overhang_percent: f64,
    pub min_overlap_len: i64,
    pub min_read_len: i64,
    pub min_num_anchor_bases: i64,
}

impl Default for OverlapParams {
    fn default() -> Self {
        OverlapParams {
            min_num_seeds: 4,
            min_percent_cov_bases: 0.1,
            error_rate: 0.45,
            max_allowed_overhang: -1,
            overhang_percent: 0.1,
            min_overlap_len: 100,
            min_read_len: 0,
            min_num_anchor_bases: 0,
        }
    }
}

impl OverlapParams {
    /// Overhang allowance for a pair of sequence lengths
    pub fn max_overhang(&self, read_len: i64, target_len: i64) -> f64 {
        if self.max_allowed_overhang >= 0 {
            self.max_allowed_overhang as f64
        } else {
            read_len.max(target_len) as f64
        }
    }
}
