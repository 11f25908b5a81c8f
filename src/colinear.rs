use crate::breakpoint::{filter_anchor_breakpoints, BreakpointConfig, BreakpointFilterResult};
use crate::overlap::PairwiseOverlap;
use crate::params::{COLINEAR_SEED_LENGTH, MIN_CLUSTER_COVERAGE, MIN_CLUSTER_LENGTH_FRACTION};
use crate::range::Range;
use crate::seed_hit::{read_position, reference_position, SeedHit};

/// Breakpoint filter settings for a read of the given length
pub fn colinear_config(read_len: i64, error_rate: f64) -> BreakpointConfig {
    BreakpointConfig {
        seed_length: COLINEAR_SEED_LENGTH,
        min_cluster_length: (MIN_CLUSTER_LENGTH_FRACTION * read_len as f64) as i64,
        min_cluster_coverage: MIN_CLUSTER_COVERAGE,
        error_rate,
    }
}

/// Run the breakpoint filter over a raw LCSk chain from `hits[begin_hit..end_hit]`
pub fn filter_colinear(
    read_len: i64,
    hits: &[SeedHit],
    begin_hit: usize,
    end_hit: usize,
    raw_chain: &[u32],
    error_rate: f64,
) -> BreakpointFilterResult {
    let config = colinear_config(read_len, error_rate);
    filter_anchor_breakpoints(raw_chain, hits, begin_hit, end_hit, &config)
}

/// Filter `raw_chain` and store the surviving anchors, their cluster ids and
/// the break count on `overlap`.
pub fn apply_colinear_filter(
    overlap: &mut PairwiseOverlap,
    read_len: i64,
    hits: &[SeedHit],
    begin_hit: usize,
    end_hit: usize,
    raw_chain: &[u32],
    error_rate: f64,
) {
    let result = filter_colinear(read_len, hits, begin_hit, end_hit, raw_chain, error_rate);
    overlap.num_sv = result.sv_breaks as i32;
    overlap.lcsk_indices = result.filtered;
    overlap.cluster_ids = result.cluster_ids;
}

/// Fill spans, seed counts and covered bases of `overlap` from its surviving
/// anchors. An overlap without anchors keeps empty spans.
pub fn aggregate_overlap(
    overlap: &mut PairwiseOverlap,
    hits: &[SeedHit],
    begin_hit: usize,
    end_hit: usize,
    raw_chain_len: usize,
    seed_length: u32,
) {
    overlap.num_hits = end_hit.saturating_sub(begin_hit) as i64;
    overlap.lcsk_len = raw_chain_len as i64;
    overlap.num_seeds = overlap.lcsk_indices.len() as i64;

    let Some(window) = hits.get(begin_hit..end_hit) else {
        return;
    };
    let anchors: Vec<&SeedHit> = overlap
        .lcsk_indices
        .iter()
        .filter_map(|&idx| window.get(idx as usize))
        .collect();
    if anchors.is_empty() {
        return;
    }

    let seed_length = seed_length as i64;
    let mut query_positions: Vec<i64> = anchors.iter().map(|hit| read_position(hit)).collect();
    let mut target_positions: Vec<i64> = anchors.iter().map(|hit| reference_position(hit)).collect();
    query_positions.sort_unstable();
    target_positions.sort_unstable();

    overlap.query = span_of(&query_positions, seed_length);
    overlap.target = span_of(&target_positions, seed_length);
    overlap.cov_bases_query = covered_bases(&query_positions, seed_length);
    overlap.cov_bases_target = covered_bases(&target_positions, seed_length);
}

fn span_of(sorted_positions: &[i64], seed_length: i64) -> Range {
    let start = sorted_positions[0];
    let end = sorted_positions[sorted_positions.len() - 1] + seed_length - 1;
    Range::new(start, end)
}

/// Bases covered by the union of `[pos, pos + seed_length)` over sorted positions
pub fn covered_bases(sorted_positions: &[i64], seed_length: i64) -> i64 {
    let mut covered = 0;
    let mut covered_until = i64::MIN;
    for &pos in sorted_positions {
        let seed_end = pos + seed_length;
        if pos >= covered_until {
            covered += seed_length;
        } else if seed_end > covered_until {
            covered += seed_end - covered_until;
        }
        covered_until = covered_until.max(seed_end);
    }
    covered
}
