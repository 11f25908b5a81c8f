//! Overlap acceptance cascade
//!
//! Checks run in a fixed order and the first failing one wins. A rejected
//! overlap carries a readable reason in `reject_reason`; an accepted one
//! leaves it empty.

use crate::overlap::PairwiseOverlap;
use crate::params::OverlapParams;
use crate::sequence::{IndexMetadata, ReadRecord};
use log::debug;
use std::fmt;

/// Why a candidate overlap was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    ZeroSeeds,
    TooFewSeeds {
        num_seeds: i64,
        min_num_seeds: i64,
    },
    EmptySpan {
        query_dist: i64,
        target_dist: i64,
    },
    LowCoverage {
        percent_cov_bases: f64,
        min_percent_cov_bases: f64,
    },
    LengthRatio {
        divergence: f64,
        error_rate: f64,
    },
    TooFewAnchorBases {
        cov_bases_query: i64,
        cov_bases_target: i64,
        min_num_anchor_bases: i64,
    },
    ShortSequence {
        read_len: i64,
        target_len: i64,
        min_read_len: i64,
    },
    ShortOverlap {
        query_dist: i64,
        target_dist: i64,
        min_overlap_len: i64,
    },
    StartMargin {
        query_start: i64,
        margin_read: i64,
        target_start: i64,
        margin_target: i64,
    },
    EndMargin {
        read_overhang: i64,
        margin_read: i64,
        target_overhang: i64,
        margin_target: i64,
    },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::ZeroSeeds => write!(f, "overlap.num_seeds = 0"),
            RejectReason::TooFewSeeds {
                num_seeds,
                min_num_seeds,
            } => write!(
                f,
                "overlap.num_seeds = {} < min_num_seeds = {}",
                num_seeds, min_num_seeds
            ),
            RejectReason::EmptySpan {
                query_dist,
                target_dist,
            } => write!(
                f,
                "empty span: query.dist() = {}, target.dist() = {}",
                query_dist, target_dist
            ),
            RejectReason::LowCoverage {
                percent_cov_bases,
                min_percent_cov_bases,
            } => write!(
                f,
                "perc_cov_bases = {:.6} < min_percent_cov_bases = {:.6}",
                percent_cov_bases, min_percent_cov_bases
            ),
            RejectReason::LengthRatio {
                divergence,
                error_rate,
            } => write!(f, "(1.0 - ratio) = {:.6} > {:.6}", divergence, error_rate),
            RejectReason::TooFewAnchorBases {
                cov_bases_query,
                cov_bases_target,
                min_num_anchor_bases,
            } => write!(
                f,
                "covered bases: query = {}, target = {}, min_num_anchor_bases = {}",
                cov_bases_query, cov_bases_target, min_num_anchor_bases
            ),
            RejectReason::ShortSequence {
                read_len,
                target_len,
                min_read_len,
            } => write!(
                f,
                "sequence too short: read_len = {}, target_len = {}, min_read_len = {}",
                read_len, target_len, min_read_len
            ),
            RejectReason::ShortOverlap {
                query_dist,
                target_dist,
                min_overlap_len,
            } => write!(
                f,
                "overlap too short: query.dist() = {}, target.dist() = {}, min_overlap_len = {}",
                query_dist, target_dist, min_overlap_len
            ),
            RejectReason::StartMargin {
                query_start,
                margin_read,
                target_start,
                margin_target,
            } => write!(
                f,
                "margin start fail: overlap.query.start = {}, margin_read = {}, overlap.target.start = {}, margin_target = {}",
                query_start, margin_read, target_start, margin_target
            ),
            RejectReason::EndMargin {
                read_overhang,
                margin_read,
                target_overhang,
                margin_target,
            } => write!(
                f,
                "margin end fail: (read_len - overlap.query.end) = {}, margin_read = {}, (target_len - overlap.target.end) = {}, margin_target = {}",
                read_overhang, margin_read, target_overhang, margin_target
            ),
        }
    }
}

/// Shorter span over longer span; 0 when either span is empty.
pub fn length_ratio(overlap: &PairwiseOverlap) -> f64 {
    let dist_query = overlap.query.dist() as f64;
    let dist_target = overlap.target.dist() as f64;
    let longer = dist_query.max(dist_target);
    if longer <= 0.0 {
        return 0.0;
    }
    dist_query.min(dist_target) / longer
}

/// Run the acceptance cascade without touching the overlap
pub fn check_overlap(
    read_len: i64,
    target_len: i64,
    params: &OverlapParams,
    overlap: &PairwiseOverlap,
) -> Result<(), RejectReason> {
    if overlap.num_seeds == 0 {
        return Err(RejectReason::ZeroSeeds);
    }

    if overlap.num_seeds < params.min_num_seeds {
        return Err(RejectReason::TooFewSeeds {
            num_seeds: overlap.num_seeds,
            min_num_seeds: params.min_num_seeds,
        });
    }

    let query_dist = overlap.query.dist();
    let target_dist = overlap.target.dist();
    if query_dist <= 0 || target_dist <= 0 {
        return Err(RejectReason::EmptySpan {
            query_dist,
            target_dist,
        });
    }

    let perc_cov_bases_q = overlap.cov_bases_query as f64 / query_dist as f64;
    let perc_cov_bases_t = overlap.cov_bases_target as f64 / target_dist as f64;
    let percent_cov_bases = perc_cov_bases_q.max(perc_cov_bases_t);
    if percent_cov_bases < params.min_percent_cov_bases {
        return Err(RejectReason::LowCoverage {
            percent_cov_bases,
            min_percent_cov_bases: params.min_percent_cov_bases,
        });
    }

    let divergence = 1.0 - length_ratio(overlap);
    if divergence > params.error_rate {
        return Err(RejectReason::LengthRatio {
            divergence,
            error_rate: params.error_rate,
        });
    }

    let min_cov_bases = params.min_num_anchor_bases;
    if overlap.cov_bases_query < min_cov_bases || overlap.cov_bases_target < min_cov_bases {
        return Err(RejectReason::TooFewAnchorBases {
            cov_bases_query: overlap.cov_bases_query,
            cov_bases_target: overlap.cov_bases_target,
            min_num_anchor_bases: min_cov_bases,
        });
    }

    if read_len < params.min_read_len || target_len < params.min_read_len {
        return Err(RejectReason::ShortSequence {
            read_len,
            target_len,
            min_read_len: params.min_read_len,
        });
    }

    if query_dist < params.min_overlap_len || target_dist < params.min_overlap_len {
        return Err(RejectReason::ShortOverlap {
            query_dist,
            target_dist,
            min_overlap_len: params.min_overlap_len,
        });
    }

    let max_overhang = params.max_overhang(read_len, target_len);
    let margin_read = max_overhang.min(params.overhang_percent * read_len as f64) as i64;
    let margin_target = max_overhang.min(params.overhang_percent * target_len as f64) as i64;

    // The overlap has to reach close to the start of at least one sequence
    if overlap.query.start > margin_read && overlap.target.start > margin_target {
        return Err(RejectReason::StartMargin {
            query_start: overlap.query.start,
            margin_read,
            target_start: overlap.target.start,
            margin_target,
        });
    }

    let read_overhang = read_len - overlap.query.end;
    let target_overhang = target_len - overlap.target.end;
    if read_overhang > margin_read && target_overhang > margin_target {
        return Err(RejectReason::EndMargin {
            read_overhang,
            margin_read,
            target_overhang,
            margin_target,
        });
    }

    Ok(())
}

/// Validate `overlap` against `params`, stamping `reject_reason` on failure.
pub fn validate<I: IndexMetadata + ?Sized>(
    index: &I,
    read: &ReadRecord,
    params: &OverlapParams,
    overlap: &mut PairwiseOverlap,
) -> bool {
    let read_len = read.len();
    let target_len = index
        .reference_lengths()
        .get(overlap.tid as usize)
        .copied()
        .unwrap_or(0);

    match check_overlap(read_len, target_len, params, overlap) {
        Ok(()) => {
            overlap.reject_reason.clear();
            debug!("{} Accepted!", overlap.label(index));
            true
        }
        Err(reason) => {
            overlap.reject_reason = format!("{} {}", overlap.label(index), reason);
            debug!("\t{}", overlap.reject_reason);
            false
        }
    }
}

/// One-line trace of an overlap's geometry and, if known, its error rate
pub fn debug_summary(overlap: &PairwiseOverlap, edit_distance: Option<u64>) -> String {
    let dist_target = overlap.target.dist();
    let edit_dist = edit_distance.unwrap_or(0);
    let error_rate = if dist_target > 0 {
        edit_dist as f64 / dist_target as f64
    } else {
        0.0
    };

    format!(
        "cov_bases_target = {}, d_query = {}, d_target = {}, ratio = {:.6}, edit_dist = {}, error_rate = {:.6}",
        overlap.cov_bases_target,
        overlap.query.dist(),
        dist_target,
        length_ratio(overlap),
        edit_dist,
        error_rate
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Range;
    use crate::sequence::ReferenceStore;

    const READ_LEN: i64 = 5000;
    const TARGET_LEN: i64 = 6000;

    fn params() -> OverlapParams {
        OverlapParams {
            min_num_seeds: 4,
            min_percent_cov_bases: 0.1,
            error_rate: 0.2,
            max_allowed_overhang: -1,
            overhang_percent: 0.1,
            min_overlap_len: 500,
            min_read_len: 1000,
            min_num_anchor_bases: 100,
        }
    }

    // Dovetail: read suffix against target prefix
    fn dovetail() -> PairwiseOverlap {
        let mut overlap = PairwiseOverlap::new(0, 0, 0);
        overlap.query = Range::new(3000, 4990);
        overlap.target = Range::new(10, 2050);
        overlap.num_seeds = 80;
        overlap.num_hits = 120;
        overlap.cov_bases_query = 900;
        overlap.cov_bases_target = 910;
        overlap
    }

    fn check(overlap: &PairwiseOverlap) -> Result<(), RejectReason> {
        check_overlap(READ_LEN, TARGET_LEN, &params(), overlap)
    }

    #[test]
    fn test_accepts_dovetail() {
        assert_eq!(check(&dovetail()), Ok(()));
    }

    #[test]
    fn test_zero_seeds() {
        let mut overlap = dovetail();
        overlap.num_seeds = 0;
        assert_eq!(check(&overlap), Err(RejectReason::ZeroSeeds));
    }

    #[test]
    fn test_seed_count_wins_over_everything_else() {
        let mut overlap = PairwiseOverlap::new(0, 0, 0);
        overlap.num_seeds = 3;
        let reason = check(&overlap).unwrap_err();
        assert_eq!(
            reason,
            RejectReason::TooFewSeeds {
                num_seeds: 3,
                min_num_seeds: 4
            }
        );
        assert!(reason.to_string().contains("min_num_seeds = 4"));
    }

    #[test]
    fn test_zero_span_rejected_before_ratios() {
        let mut overlap = dovetail();
        overlap.query = Range::new(100, 100);
        assert_eq!(
            check(&overlap),
            Err(RejectReason::EmptySpan {
                query_dist: 0,
                target_dist: 2040
            })
        );
        assert_eq!(length_ratio(&overlap), 0.0);
    }

    #[test]
    fn test_low_coverage() {
        let mut overlap = dovetail();
        overlap.cov_bases_query = 100;
        overlap.cov_bases_target = 100;
        assert!(matches!(check(&overlap), Err(RejectReason::LowCoverage { .. })));
    }

    #[test]
    fn test_length_ratio() {
        let mut overlap = dovetail();
        overlap.target = Range::new(10, 1500);
        let reason = check(&overlap).unwrap_err();
        assert!(matches!(reason, RejectReason::LengthRatio { .. }));
        assert!(reason.to_string().starts_with("(1.0 - ratio) = 0.25"));
    }

    #[test]
    fn test_anchor_bases_and_lengths() {
        let mut overlap = dovetail();
        overlap.cov_bases_target = 99;
        overlap.cov_bases_query = 1000;
        assert!(matches!(check(&overlap), Err(RejectReason::TooFewAnchorBases { .. })));

        let overlap = dovetail();
        assert!(matches!(
            check_overlap(900, TARGET_LEN, &params(), &overlap),
            Err(RejectReason::ShortSequence { .. })
        ));

        let mut short = params();
        short.min_overlap_len = 2000;
        assert!(matches!(
            check_overlap(READ_LEN, TARGET_LEN, &short, &overlap),
            Err(RejectReason::ShortOverlap { .. })
        ));
    }

    #[test]
    fn test_start_margin() {
        // Both starts past their margins (500 and 600)
        let mut overlap = dovetail();
        overlap.query = Range::new(2000, 3990);
        overlap.target = Range::new(700, 2740);
        assert_eq!(
            check(&overlap),
            Err(RejectReason::StartMargin {
                query_start: 2000,
                margin_read: 500,
                target_start: 700,
                margin_target: 600
            })
        );

        // Start margins always pass when both spans begin at zero
        let mut tight = params();
        tight.max_allowed_overhang = 0;
        overlap.query = Range::new(0, 1990);
        overlap.target = Range::new(0, 2040);
        assert!(!matches!(
            check_overlap(READ_LEN, TARGET_LEN, &tight, &overlap),
            Err(RejectReason::StartMargin { .. })
        ));
    }

    #[test]
    fn test_end_margin() {
        let mut overlap = dovetail();
        overlap.query = Range::new(0, 2000);
        overlap.target = Range::new(3000, 5000);
        assert_eq!(
            check(&overlap),
            Err(RejectReason::EndMargin {
                read_overhang: 3000,
                margin_read: 500,
                target_overhang: 1000,
                margin_target: 600
            })
        );
    }

    #[test]
    fn test_max_overhang_caps_margins() {
        let mut capped = params();
        capped.max_allowed_overhang = 5;
        let overlap = dovetail();
        // query.start 3000 > 5 and target.start 10 > 5
        assert!(matches!(
            check_overlap(READ_LEN, TARGET_LEN, &capped, &overlap),
            Err(RejectReason::StartMargin {
                margin_read: 5,
                margin_target: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_stamps_reason() {
        let index = ReferenceStore::from_sequences(
            &[("target".to_string(), vec![b'A'; TARGET_LEN as usize])],
            true,
        );
        let read = ReadRecord::new(0, "read", &vec![b'A'; READ_LEN as usize]);

        let mut overlap = dovetail();
        assert!(validate(&index, &read, &params(), &mut overlap));
        assert!(overlap.reject_reason.is_empty());

        let mut overlap = dovetail();
        overlap.tid = 1;
        overlap.num_seeds = 2;
        assert!(!validate(&index, &read, &params(), &mut overlap));
        assert!(overlap.reject_reason.starts_with("[qid = 0, tid = 0-rev] "));
        assert!(overlap.reject_reason.contains("min_num_seeds"));
    }

    #[test]
    fn test_debug_summary() {
        let summary = debug_summary(&dovetail(), Some(204));
        assert!(summary.contains("d_query = 1990"));
        assert!(summary.contains("d_target = 2040"));
        assert!(summary.contains("edit_dist = 204"));
        assert!(summary.contains("error_rate = 0.100000"));
    }
}
