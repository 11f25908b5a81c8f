use crate::range::Range;
use crate::seed_hit::Strand;
use crate::sequence::IndexMetadata;

/// Candidate overlap between one read and one (possibly reverse-strand) target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairwiseOverlap {
    pub qid: i64,
    pub tid: i64,
    pub tid_fwd: i64,
    pub query: Range,
    pub target: Range,
    pub num_seeds: i64, // anchors surviving the colinearity filter
    pub num_hits: i64,  // raw seed hits in the candidate window
    pub cov_bases_query: i64,
    pub cov_bases_target: i64,
    pub num_sv: i32,
    pub lcsk_indices: Vec<u32>,
    pub cluster_ids: Vec<u32>,
    pub lcsk_len: i64,
    pub reject_reason: String,
}

impl PairwiseOverlap {
    pub fn new(qid: i64, tid: i64, tid_fwd: i64) -> Self {
        PairwiseOverlap {
            qid,
            tid,
            tid_fwd,
            ..Default::default()
        }
    }

    pub fn is_rejected(&self) -> bool {
        !self.reject_reason.is_empty()
    }

    /// `-fwd` or `-rev`, depending on which half of a strand-doubled index `tid` falls in
    pub fn orientation_suffix<I: IndexMetadata + ?Sized>(&self, index: &I) -> &'static str {
        match index.orientation(self.tid) {
            Strand::Forward => "-fwd",
            Strand::Reverse => "-rev",
        }
    }

    /// `[qid = Q, tid = T-fwd]` label used to prefix diagnostics
    pub fn label<I: IndexMetadata + ?Sized>(&self, index: &I) -> String {
        format!(
            "[qid = {}, tid = {}{}]",
            self.qid,
            index.canonical_id(self.tid),
            self.orientation_suffix(index)
        )
    }

    /// Tab-separated record: query id, read length, query span, strand,
    /// canonical target id, target length, target span, seed/hit counts,
    /// covered bases, colinearity breaks and, when computed, edit distance.
    pub fn to_tsv_line<I: IndexMetadata + ?Sized>(
        &self,
        index: &I,
        read_len: i64,
        edit_distance: Option<u64>,
    ) -> String {
        let target_len = index
            .reference_lengths()
            .get(self.tid as usize)
            .copied()
            .unwrap_or(0);
        let edit_distance = edit_distance
            .map(|d| d.to_string())
            .unwrap_or_else(|| "*".to_string());

        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.qid,
            read_len,
            self.query.start,
            self.query.end,
            index.orientation(self.tid).as_char(),
            index.canonical_id(self.tid),
            target_len,
            self.target.start,
            self.target.end,
            self.num_seeds,
            self.num_hits,
            self.cov_bases_query,
            self.cov_bases_target,
            self.num_sv,
            edit_distance
        )
    }
}
