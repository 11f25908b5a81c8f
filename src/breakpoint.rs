//! Anchor breakpoint filtering
//!
//! Splits an LCSk chain of seed hits into spatially consistent clusters,
//! excising isolated outlier anchors on the way, and counts the colinearity
//! breaks left between the clusters that survive.
//!
//! The chain arrives in the order the LCSk backtrack emits it (decreasing
//! coordinates) and is walked from its tail, so anchors are visited in
//! increasing read/reference order and clusters come out ordered along the
//! reference.

use crate::range::Range;
use crate::seed_hit::{read_position, reference_position, SeedHit};
use log::{debug, warn};

/// Advances up to this many bases on the longer axis are always tolerated.
pub const MAX_TOLERATED_ADVANCE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakpointConfig {
    pub seed_length: u32,
    pub min_cluster_length: i64,
    pub min_cluster_coverage: f64,
    pub error_rate: f64,
}

/// A run of mutually consistent anchors
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub query: Range,
    pub reference: Range,
    pub anchor_count: usize,
    /// Covered-base estimate, `anchor_count * seed_length` once finalized.
    pub coverage: i64,
    /// Chain-relative hit indices in visiting order
    pub members: Vec<u32>,
}

impl Cluster {
    fn open(hit: &SeedHit, idx: u32, seed_length: i64) -> Self {
        let query_start = read_position(hit);
        let reference_start = reference_position(hit);
        Cluster {
            query: Range::new(query_start, query_start + seed_length - 1),
            reference: Range::new(reference_start, reference_start + seed_length - 1),
            anchor_count: 1,
            coverage: 0,
            members: vec![idx],
        }
    }

    fn push(&mut self, hit: &SeedHit, idx: u32, seed_length: i64) {
        self.query.end = read_position(hit) + seed_length - 1;
        self.reference.end = reference_position(hit) + seed_length - 1;
        self.anchor_count += 1;
        self.members.push(idx);
    }

    // Coverage stays as is: one seed length leaves, one arrives.
    fn replace_last(&mut self, hit: &SeedHit, idx: u32, seed_length: i64) {
        self.query.end = read_position(hit) + seed_length - 1;
        self.reference.end = reference_position(hit) + seed_length - 1;
        if self.members.len() == 1 {
            self.query.start = read_position(hit);
            self.reference.start = reference_position(hit);
        }
        if let Some(last) = self.members.last_mut() {
            *last = idx;
        }
    }

    pub fn first(&self) -> u32 {
        self.members[0]
    }

    pub fn last(&self) -> u32 {
        self.members[self.members.len() - 1]
    }

    /// Anchor preceding the last one, if the cluster has two or more
    fn before_last(&self) -> Option<u32> {
        self.members.len().checked_sub(2).map(|i| self.members[i])
    }
}

/// Output of [`filter_anchor_breakpoints`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BreakpointFilterResult {
    /// Surviving chain-relative indices, cluster by cluster
    pub filtered: Vec<u32>,
    /// Cluster ordinal of every entry in `filtered`
    pub cluster_ids: Vec<u32>,
    /// Colinearity breaks between adjacent surviving clusters
    pub sv_breaks: u32,
    pub clusters: Vec<Cluster>,
}

/// Asymmetric-stretch test between an earlier and a later anchor.
///
/// The pair is too far apart when the longer per-axis advance exceeds
/// [`MAX_TOLERATED_ADVANCE`] and either one axis stalls while the other moves,
/// or the two advances diverge by more than `error_rate`.
pub fn distance_too_big(earlier: &SeedHit, later: &SeedHit, seed_length: u32, error_rate: f64) -> bool {
    let seed_length = seed_length as i64;
    let distance_query = (read_position(later) + seed_length) - read_position(earlier);
    let distance_reference = (reference_position(later) + seed_length) - reference_position(earlier);

    let lo = distance_query.abs().min(distance_reference.abs()) as f64;
    let hi = distance_query.abs().max(distance_reference.abs()) as f64;

    hi > MAX_TOLERATED_ADVANCE
        && ((lo == 0.0 && hi != 0.0) || (lo > 0.0 && (hi / lo - 1.0) > error_rate))
}

struct ClusterBuilder<'a> {
    hits: &'a [SeedHit],
    config: &'a BreakpointConfig,
    anchor_error_rate: f64,
    current: Option<Cluster>,
    // Closed by a break that the next anchor has yet to confirm
    parked: Option<Cluster>,
    clusters: Vec<Cluster>,
}

impl<'a> ClusterBuilder<'a> {
    fn new(hits: &'a [SeedHit], config: &'a BreakpointConfig) -> Self {
        ClusterBuilder {
            hits,
            config,
            anchor_error_rate: config.error_rate / 2.0,
            current: None,
            parked: None,
            clusters: Vec::new(),
        }
    }

    fn seed_length(&self) -> i64 {
        self.config.seed_length as i64
    }

    fn too_far(&self, earlier: u32, later: u32, error_rate: f64) -> bool {
        distance_too_big(
            &self.hits[earlier as usize],
            &self.hits[later as usize],
            self.config.seed_length,
            error_rate,
        )
    }

    fn last_accepted(&self) -> Option<u32> {
        self.current.as_ref().map(Cluster::last)
    }

    fn add_anchor(&mut self, idx: u32) {
        let hit = self.hits[idx as usize];
        let seed_length = self.seed_length();

        let Some(predecessor) = self.last_accepted() else {
            self.current = Some(Cluster::open(&hit, idx, seed_length));
            return;
        };

        if !self.too_far(predecessor, idx, self.anchor_error_rate) {
            self.extend_current(&hit, idx);
            return;
        }

        // Two-anchor lookback. Only a cluster of two or more anchors is
        // closed by a break.
        if let Some(before_last) = self.current.as_ref().and_then(Cluster::before_last) {
            if self.too_far(before_last, idx, self.anchor_error_rate) {
                self.break_at(&hit, idx);
            } else {
                self.replace_last(&hit, idx);
            }
            return;
        }

        // A lone anchor that opened a cluster after a break looks back into
        // the parked cluster; otherwise it is repaired in place.
        let parked_fits = self
            .parked
            .as_ref()
            .is_some_and(|parked| !self.too_far(parked.last(), idx, self.anchor_error_rate));
        if parked_fits {
            self.resume_parked(&hit, idx);
        } else {
            self.replace_last(&hit, idx);
        }
    }

    fn replace_last(&mut self, hit: &SeedHit, idx: u32) {
        let seed_length = self.seed_length();
        if let Some(current) = self.current.as_mut() {
            current.replace_last(hit, idx, seed_length);
        }
    }

    fn extend_current(&mut self, hit: &SeedHit, idx: u32) {
        let seed_length = self.seed_length();
        let confirmed = match self.current.as_mut() {
            Some(current) => {
                current.push(hit, idx, seed_length);
                current.members.len() >= 2
            }
            None => false,
        };
        if confirmed {
            self.flush_parked();
        }
    }

    fn break_at(&mut self, hit: &SeedHit, idx: u32) {
        self.flush_parked();
        self.parked = self.current.take();
        self.current = Some(Cluster::open(hit, idx, self.seed_length()));
    }

    // The lone anchor after the last break was the outlier; drop it and
    // continue the cluster it interrupted.
    fn resume_parked(&mut self, hit: &SeedHit, idx: u32) {
        if let Some(outlier) = self.current.take() {
            debug!("Dropping outlier anchor {}", outlier.first());
        }
        let seed_length = self.seed_length();
        self.current = self.parked.take();
        if let Some(current) = self.current.as_mut() {
            current.push(hit, idx, seed_length);
        }
    }

    fn flush_parked(&mut self) {
        if let Some(cluster) = self.parked.take() {
            self.finalize(cluster);
        }
    }

    fn finalize(&mut self, mut cluster: Cluster) {
        cluster.coverage = cluster.anchor_count as i64 * self.seed_length();

        let query_span = cluster.query.span();
        let min_covered_bases = self.config.min_cluster_coverage * query_span as f64;

        if query_span >= self.config.min_cluster_length && cluster.coverage as f64 >= min_covered_bases {
            self.clusters.push(cluster);
        } else {
            debug!(
                "Discarding cluster of {} anchors (query span {}, coverage {})",
                cluster.anchor_count, query_span, cluster.coverage
            );
        }
    }

    fn finish(mut self) -> BreakpointFilterResult {
        self.flush_parked();
        if let Some(cluster) = self.current.take() {
            self.finalize(cluster);
        }

        let sv_breaks = self
            .clusters
            .windows(2)
            .filter(|pair| self.too_far(pair[0].last(), pair[1].first(), self.config.error_rate))
            .count() as u32;

        let mut filtered = Vec::new();
        let mut cluster_ids = Vec::new();
        for (cluster_id, cluster) in self.clusters.iter().enumerate() {
            filtered.extend_from_slice(&cluster.members);
            cluster_ids.extend(std::iter::repeat_n(cluster_id as u32, cluster.members.len()));
        }

        BreakpointFilterResult {
            filtered,
            cluster_ids,
            sv_breaks,
            clusters: self.clusters,
        }
    }
}

/// Cluster an LCSk chain and count colinearity breaks.
///
/// `chain` holds indices relative to `hits[window_start..window_end]`.
/// Anchors pointing outside the window are dropped.
pub fn filter_anchor_breakpoints(
    chain: &[u32],
    hits: &[SeedHit],
    window_start: usize,
    window_end: usize,
    config: &BreakpointConfig,
) -> BreakpointFilterResult {
    let Some(window) = hits.get(window_start..window_end) else {
        warn!(
            "Hit window {}..{} lies outside the {} available seed hits",
            window_start,
            window_end,
            hits.len()
        );
        return BreakpointFilterResult::default();
    };

    let mut builder = ClusterBuilder::new(window, config);
    for &idx in chain.iter().rev() {
        if idx as usize >= window.len() {
            warn!("Skipping anchor {} outside hit window of {}", idx, window.len());
            continue;
        }
        // Sanity guard on the anchor's own footprint
        if builder.too_far(idx, idx, builder.anchor_error_rate) {
            continue;
        }
        builder.add_anchor(idx);
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed_hit::Strand;

    fn make_hits(positions: &[(u32, u32)]) -> Vec<SeedHit> {
        positions
            .iter()
            .map(|&(q, r)| SeedHit::new(q, r, 0, Strand::Forward))
            .collect()
    }

    // Chain in LCSk backtrack order: last hit first
    fn backtrack_chain(n: usize) -> Vec<u32> {
        (0..n as u32).rev().collect()
    }

    fn config(error_rate: f64) -> BreakpointConfig {
        BreakpointConfig {
            seed_length: 12,
            min_cluster_length: 10,
            min_cluster_coverage: 0.01,
            error_rate,
        }
    }

    fn run(hits: &[SeedHit], chain: &[u32], cfg: &BreakpointConfig) -> BreakpointFilterResult {
        filter_anchor_breakpoints(chain, hits, 0, hits.len(), cfg)
    }

    #[test]
    fn test_distance_too_big() {
        let origin = SeedHit::new(0, 0, 0, Strand::Forward);

        // Small absolute gaps are always tolerated
        assert!(!distance_too_big(&origin, &SeedHit::new(80, 10, 0, Strand::Forward), 12, 0.1));
        // One axis stalls while the other advances
        assert!(distance_too_big(&origin, &SeedHit::new(0, 300, 0, Strand::Forward), 0, 0.1));
        // Proportional stretch within / beyond the error rate
        assert!(!distance_too_big(&origin, &SeedHit::new(200, 205, 0, Strand::Forward), 12, 0.1));
        assert!(distance_too_big(&origin, &SeedHit::new(200, 300, 0, Strand::Forward), 12, 0.1));
        // An anchor against itself never fails
        let hit = SeedHit::new(5000, 17, 0, Strand::Forward);
        assert!(!distance_too_big(&hit, &hit, 12, 0.0));
    }

    #[test]
    fn test_single_consistent_cluster() {
        let hits = make_hits(&[(0, 0), (20, 20), (40, 40), (60, 60), (80, 80)]);
        let result = run(&hits, &backtrack_chain(5), &config(0.1));

        assert_eq!(result.filtered, vec![0, 1, 2, 3, 4]);
        assert_eq!(result.cluster_ids, vec![0; 5]);
        assert_eq!(result.sv_breaks, 0);
        assert_eq!(result.clusters.len(), 1);

        let cluster = &result.clusters[0];
        assert_eq!(cluster.query, Range::new(0, 91));
        assert_eq!(cluster.reference, Range::new(0, 91));
        assert_eq!(cluster.anchor_count, 5);
        assert_eq!(cluster.coverage, 60);
    }

    #[test]
    fn test_outlier_anchor_is_excised() {
        let hits = make_hits(&[(0, 0), (20, 20), (42, 200), (220, 220), (240, 240)]);
        let result = run(&hits, &backtrack_chain(5), &config(0.1));

        assert_eq!(result.filtered, vec![0, 1, 3, 4]);
        assert_eq!(result.cluster_ids, vec![0; 4]);
        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.clusters[0].anchor_count, 4);
        assert_eq!(result.sv_breaks, 0);
    }

    #[test]
    fn test_reference_jump_counts_break() {
        let hits = make_hits(&[
            (0, 0),
            (20, 20),
            (40, 40),
            (60, 60),
            (80, 80),
            (82, 380),
            (102, 400),
            (122, 420),
            (142, 440),
            (162, 460),
        ]);
        let result = run(&hits, &backtrack_chain(10), &config(0.1));

        assert_eq!(result.clusters.len(), 2);
        assert_eq!(result.sv_breaks, 1);
        assert_eq!(result.filtered, (0..10).collect::<Vec<u32>>());
        assert_eq!(result.cluster_ids, vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1]);
        assert!(result.clusters[0].reference.end < result.clusters[1].reference.start);
    }

    #[test]
    fn test_predecessor_outlier_is_replaced() {
        // Hit 1 fits hit 0, but hit 2 only fits hit 0
        let hits = make_hits(&[(0, 0), (50, 40), (130, 130), (150, 150)]);
        let result = run(&hits, &backtrack_chain(4), &config(0.1));

        assert_eq!(result.filtered, vec![0, 2, 3]);
        let cluster = &result.clusters[0];
        assert_eq!(cluster.anchor_count, 3);
        assert_eq!(cluster.query, Range::new(0, 161));
        // Coverage is not recomputed on replacement
        assert_eq!(cluster.coverage, 36);
    }

    #[test]
    fn test_leading_outlier_replaces_cluster_start() {
        let hits = make_hits(&[(0, 150), (200, 200), (220, 220), (240, 240)]);
        let result = run(&hits, &backtrack_chain(4), &config(0.1));

        assert_eq!(result.filtered, vec![1, 2, 3]);
        assert_eq!(result.clusters[0].query.start, 200);
        assert_eq!(result.clusters[0].reference.start, 200);
    }

    #[test]
    fn test_consecutive_outliers_after_break() {
        // Two off-diagonal anchors between runs on the same diagonal
        let mut positions = vec![(0, 0), (20, 20), (40, 40), (60, 60), (70, 200), (180, 215)];
        positions.extend((0..31).map(|i| (300 + 20 * i, 300 + 20 * i)));
        let hits = make_hits(&positions);
        let result = run(&hits, &backtrack_chain(hits.len()), &config(0.1));

        assert!(!result.filtered.contains(&4));
        assert!(!result.filtered.contains(&5));
        assert_eq!(result.filtered.len(), 35);
        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.sv_breaks, 0);
        assert_eq!(result.clusters[0].anchor_count, 35);
    }

    #[test]
    fn test_lone_anchor_after_break_is_repaired_in_place() {
        // Genuine break at hit 3; hit 4 fits neither hit 3 nor the first
        // cluster's tail and replaces hit 3 instead of closing it.
        let hits = make_hits(&[
            (0, 0),
            (20, 20),
            (40, 40),
            (60, 600),
            (200, 700),
            (220, 720),
            (240, 740),
        ]);
        let result = run(&hits, &backtrack_chain(7), &config(0.1));

        assert_eq!(result.filtered, vec![0, 1, 2, 4, 5, 6]);
        assert_eq!(result.cluster_ids, vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(result.clusters.len(), 2);
        assert_eq!(result.sv_breaks, 1);
        assert_eq!(result.clusters[1].query.start, 200);
    }

    #[test]
    fn test_short_cluster_is_discarded() {
        let hits = make_hits(&[
            (0, 0),
            (20, 20),
            (40, 400),
            (60, 420),
            (80, 440),
            (100, 460),
            (120, 480),
            (140, 500),
        ]);
        let mut cfg = config(0.1);
        cfg.min_cluster_length = 100;
        let result = run(&hits, &backtrack_chain(8), &cfg);

        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.filtered, vec![2, 3, 4, 5, 6, 7]);
        assert_eq!(result.cluster_ids, vec![0; 6]);
        assert_eq!(result.sv_breaks, 0);
        for cluster in &result.clusters {
            assert!(cluster.query.span() >= cfg.min_cluster_length);
        }
    }

    #[test]
    fn test_sparse_cluster_is_discarded() {
        let hits = make_hits(&[(0, 0), (90, 90), (180, 180)]);
        let mut cfg = config(0.1);
        cfg.min_cluster_coverage = 0.5;
        let result = run(&hits, &backtrack_chain(3), &cfg);

        // 3 seeds cover 36 bases of a 192 base span
        assert!(result.clusters.is_empty());
        assert!(result.filtered.is_empty());
        assert!(result.cluster_ids.is_empty());
    }

    #[test]
    fn test_refiltering_is_stable() {
        let hits = make_hits(&[(0, 0), (20, 20), (42, 200), (220, 220), (240, 240)]);
        let cfg = config(0.1);
        let first = run(&hits, &backtrack_chain(5), &cfg);

        let mut chain = first.filtered.clone();
        chain.reverse();
        let second = run(&hits, &chain, &cfg);

        assert_eq!(second.filtered, first.filtered);
        assert_eq!(second.clusters.len(), first.clusters.len());
        assert_eq!(second.sv_breaks, first.sv_breaks);
    }

    #[test]
    fn test_error_rate_monotonicity() {
        let hits = make_hits(&[
            (0, 0),
            (20, 20),
            (40, 40),
            (60, 60),
            (80, 80),
            (170, 180),
            (190, 200),
            (210, 220),
        ]);
        let chain = backtrack_chain(8);

        let strict = run(&hits, &chain, &config(0.05));
        let default = run(&hits, &chain, &config(0.1));
        let lenient = run(&hits, &chain, &config(0.3));

        assert_eq!((strict.clusters.len(), strict.sv_breaks), (2, 1));
        assert_eq!((default.clusters.len(), default.sv_breaks), (2, 0));
        assert_eq!((lenient.clusters.len(), lenient.sv_breaks), (1, 0));
    }

    #[test]
    fn test_window_offset_and_bounds() {
        let mut hits = make_hits(&[(999, 999), (999, 999)]);
        hits.extend(make_hits(&[(0, 0), (20, 20), (40, 40)]));

        let result = filter_anchor_breakpoints(&[2, 1, 0], &hits, 2, 5, &config(0.1));
        assert_eq!(result.filtered, vec![0, 1, 2]);

        // Anchors past the window are skipped
        let result = filter_anchor_breakpoints(&[7, 2, 1, 0], &hits, 2, 5, &config(0.1));
        assert_eq!(result.filtered, vec![0, 1, 2]);

        let result = filter_anchor_breakpoints(&[0], &hits, 4, 9, &config(0.1));
        assert_eq!(result, BreakpointFilterResult::default());
    }

    #[test]
    fn test_empty_chain() {
        let hits = make_hits(&[(0, 0)]);
        let result = run(&hits, &[], &config(0.1));
        assert_eq!(result, BreakpointFilterResult::default());
    }
}
