use crate::colinear::{aggregate_overlap, apply_colinear_filter};
use crate::edit_distance::{edit_distance, AlignMode, EditDistanceAligner, EditDistanceError};
use crate::overlap::PairwiseOverlap;
use crate::params::{OverlapParams, COLINEAR_SEED_LENGTH};
use crate::seed_hit::SeedHit;
use crate::sequence::{IndexMetadata, ReadRecord};
use crate::validate::{debug_summary, validate};
use log::{debug, info, warn};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// One (read, target, strand) pair to evaluate: a window of the hit
/// collection and the LCSk chain computed over it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub query_id: i64,
    pub target_id: u32,
    pub begin_hit: usize,
    pub end_hit: usize,
    /// Window-relative hit indices in backtrack order
    pub chain: Vec<u32>,
}

/// Aligner and mode used to refine accepted overlaps
#[derive(Clone, Copy)]
pub struct Refinement<'a> {
    pub aligner: &'a (dyn EditDistanceAligner + Sync),
    pub mode: AlignMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedOverlap {
    pub overlap: PairwiseOverlap,
    pub read_len: i64,
    /// Only set for accepted overlaps when refinement was requested
    pub edit_distance: Option<u64>,
}

impl EvaluatedOverlap {
    pub fn is_accepted(&self) -> bool {
        !self.overlap.is_rejected()
    }
}

/// Filter, aggregate, validate and optionally refine a single candidate
pub fn evaluate_candidate<I: IndexMetadata + ?Sized>(
    index: &I,
    read: &ReadRecord,
    hits: &[SeedHit],
    candidate: &Candidate,
    params: &OverlapParams,
    refinement: Option<&Refinement>,
) -> Result<EvaluatedOverlap, EditDistanceError> {
    let tid = candidate.target_id as i64;
    let mut overlap = PairwiseOverlap::new(read.id, tid, index.canonical_id(tid));

    apply_colinear_filter(
        &mut overlap,
        read.len(),
        hits,
        candidate.begin_hit,
        candidate.end_hit,
        &candidate.chain,
        params.error_rate,
    );
    aggregate_overlap(
        &mut overlap,
        hits,
        candidate.begin_hit,
        candidate.end_hit,
        candidate.chain.len(),
        COLINEAR_SEED_LENGTH,
    );

    let accepted = validate(index, read, params, &mut overlap);

    let mut distance = None;
    if accepted {
        if let Some(refinement) = refinement {
            distance = Some(edit_distance(
                index,
                read,
                &overlap,
                refinement.aligner,
                refinement.mode,
            )?);
        }
        debug!("{} {}", overlap.label(index), debug_summary(&overlap, distance));
    }

    Ok(EvaluatedOverlap {
        overlap,
        read_len: read.len(),
        edit_distance: distance,
    })
}

/// Evaluate every candidate in parallel, keeping input order.
///
/// Candidates naming an unknown read or target are skipped. The first refiner
/// failure aborts the whole batch.
pub fn evaluate_candidates<I: IndexMetadata + Sync + ?Sized>(
    index: &I,
    reads: &[ReadRecord],
    hits: &[SeedHit],
    candidates: &[Candidate],
    params: &OverlapParams,
    refinement: Option<&Refinement>,
) -> Result<Vec<EvaluatedOverlap>, EditDistanceError> {
    let read_lookup: FxHashMap<i64, &ReadRecord> = reads.iter().map(|read| (read.id, read)).collect();
    let num_targets = index.reference_lengths().len();

    let results = candidates
        .par_iter()
        .filter_map(|candidate| {
            if candidate.target_id as usize >= num_targets {
                warn!("Skipping candidate for unknown target id {}", candidate.target_id);
                return None;
            }
            match read_lookup.get(&candidate.query_id) {
                Some(read) => Some(evaluate_candidate(index, read, hits, candidate, params, refinement)),
                None => {
                    warn!("Skipping candidate for unknown read id {}", candidate.query_id);
                    None
                }
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let num_accepted = results.iter().filter(|r| r.is_accepted()).count();
    info!(
        "Evaluated {} candidates: {} accepted, {} rejected",
        results.len(),
        num_accepted,
        results.len() - num_accepted
    );

    Ok(results)
}
