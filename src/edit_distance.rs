use crate::overlap::PairwiseOverlap;
use crate::sequence::{IndexMetadata, ReadRecord};
use bio::alignment::distance::levenshtein;
use bio::alignment::pairwise::Aligner;
use std::fmt;
use std::str::FromStr;

/// How the query region is placed against the target region
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AlignMode {
    /// End-to-end on both sequences (Needleman-Wunsch)
    #[default]
    Global,
    /// Query end-to-end, target flanks free
    Infix,
}

impl FromStr for AlignMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "global" | "nw" => Ok(AlignMode::Global),
            "infix" | "hw" => Ok(AlignMode::Infix),
            other => Err(format!("Unknown alignment mode '{other}'. Use global or infix")),
        }
    }
}

#[derive(Debug)]
pub enum EditDistanceError {
    QueryOutOfBounds {
        start: i64,
        end: i64,
        read_len: i64,
    },
    UnknownTarget(i64),
    TargetOutOfBounds {
        tid: i64,
        start: i64,
        end: i64,
        target_len: i64,
    },
    Aligner(String),
}

impl fmt::Display for EditDistanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditDistanceError::QueryOutOfBounds {
                start,
                end,
                read_len,
            } => write!(
                f,
                "Query region {}-{} lies outside read of length {}",
                start, end, read_len
            ),
            EditDistanceError::UnknownTarget(tid) => write!(f, "Unknown target id {}", tid),
            EditDistanceError::TargetOutOfBounds {
                tid,
                start,
                end,
                target_len,
            } => write!(
                f,
                "Target region {}-{} lies outside target {} of length {}",
                start, end, tid, target_len
            ),
            EditDistanceError::Aligner(msg) => write!(f, "Aligner failed: {}", msg),
        }
    }
}

impl std::error::Error for EditDistanceError {}

// Edit-distance primitive the refiner delegates to
pub trait EditDistanceAligner {
    fn edit_distance(&self, query: &[u8], target: &[u8], mode: AlignMode) -> Result<u64, EditDistanceError>;
}

/// Unit-cost edit distance computed with rust-bio
#[derive(Debug, Default, Clone, Copy)]
pub struct BioAligner;

impl EditDistanceAligner for BioAligner {
    fn edit_distance(&self, query: &[u8], target: &[u8], mode: AlignMode) -> Result<u64, EditDistanceError> {
        match mode {
            AlignMode::Global => Ok(levenshtein(query, target) as u64),
            AlignMode::Infix => {
                if query.is_empty() {
                    return Ok(0);
                }
                if target.is_empty() {
                    return Ok(query.len() as u64);
                }
                let unit_cost = |a: u8, b: u8| if a == b { 0i32 } else { -1i32 };
                let mut aligner = Aligner::with_capacity(query.len(), target.len(), 0, -1, unit_cost);
                let alignment = aligner.semiglobal(query, target);
                u64::try_from(-(alignment.score as i64))
                    .map_err(|e| EditDistanceError::Aligner(format!("positive unit-cost score: {e}")))
            }
        }
    }
}

/// Edit distance between the query and target regions of `overlap`.
///
/// Both ranges are inclusive, so `query.dist() + 1` read bases are compared
/// against `target.dist() + 1` reference bases.
pub fn edit_distance<I, A>(
    index: &I,
    read: &ReadRecord,
    overlap: &PairwiseOverlap,
    aligner: &A,
    mode: AlignMode,
) -> Result<u64, EditDistanceError>
where
    I: IndexMetadata + ?Sized,
    A: EditDistanceAligner + ?Sized,
{
    let query = region(&read.seq, overlap.query.start, overlap.query.end).ok_or(
        EditDistanceError::QueryOutOfBounds {
            start: overlap.query.start,
            end: overlap.query.end,
            read_len: read.len(),
        },
    )?;

    let tid = overlap.tid;
    let (offset, target_len) = usize::try_from(tid)
        .ok()
        .and_then(|idx| {
            let offset = *index.reference_offsets().get(idx)?;
            let len = *index.reference_lengths().get(idx)?;
            Some((offset as usize, len))
        })
        .ok_or(EditDistanceError::UnknownTarget(tid))?;

    let out_of_bounds = EditDistanceError::TargetOutOfBounds {
        tid,
        start: overlap.target.start,
        end: overlap.target.end,
        target_len,
    };
    if overlap.target.end >= target_len {
        return Err(out_of_bounds);
    }
    let target_seq = index
        .reference_data()
        .get(offset..offset + target_len as usize)
        .and_then(|seq| region(seq, overlap.target.start, overlap.target.end))
        .ok_or(out_of_bounds)?;

    aligner.edit_distance(query, target_seq, mode)
}

fn region(seq: &[u8], start: i64, end: i64) -> Option<&[u8]> {
    if start < 0 || end < start {
        return None;
    }
    seq.get(start as usize..=end as usize)
}
