use crate::seed_hit::Strand;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

// Read-only view of the minimizer index the overlap core needs
pub trait IndexMetadata {
    /// Length of every indexed sequence, strand-doubled entries included.
    fn reference_lengths(&self) -> &[i64];

    /// Starting byte offset of every sequence in `reference_data()`.
    fn reference_offsets(&self) -> &[u64];

    /// Concatenated sequence bytes.
    fn reference_data(&self) -> &[u8];

    /// Number of forward-strand sequences. Ids at or above this value are
    /// reverse-complement entries of a strand-doubled index.
    fn num_forward_sequences(&self) -> usize;

    fn canonical_id(&self, target_id: i64) -> i64 {
        let num_forward = self.num_forward_sequences().max(1) as i64;
        target_id % num_forward
    }

    fn orientation(&self, target_id: i64) -> Strand {
        if target_id >= self.num_forward_sequences() as i64 {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }
}

/// Query read handed to the overlap core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadRecord {
    pub id: i64,
    pub name: String,
    pub seq: Vec<u8>,
}

impl ReadRecord {
    pub fn new(id: i64, name: &str, seq: &[u8]) -> Self {
        ReadRecord {
            id,
            name: name.to_string(),
            seq: seq.to_vec(),
        }
    }

    pub fn len(&self) -> i64 {
        self.seq.len() as i64
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// In-memory reference sequences laid out back to back in one buffer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceStore {
    names: Vec<String>,
    name_to_id: FxHashMap<String, u32>,
    lengths: Vec<i64>,
    offsets: Vec<u64>,
    data: Vec<u8>,
    num_forward: usize,
}

impl ReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from named sequences. With `strand_doubled` every
    /// sequence is followed, after all forward entries, by its reverse
    /// complement under the same name.
    pub fn from_sequences(sequences: &[(String, Vec<u8>)], strand_doubled: bool) -> Self {
        let mut store = ReferenceStore::new();
        for (name, seq) in sequences {
            store.push(name, seq);
        }
        store.num_forward = sequences.len();

        if strand_doubled {
            for (name, seq) in sequences {
                store.push(name, &reverse_complement(seq));
            }
        }
        store
    }

    fn push(&mut self, name: &str, seq: &[u8]) {
        let id = self.names.len() as u32;
        self.name_to_id.entry(name.to_owned()).or_insert(id);
        self.names.push(name.to_string());
        self.offsets.push(self.data.len() as u64);
        self.lengths.push(seq.len() as i64);
        self.data.extend_from_slice(seq);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get_name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(|s| s.as_str())
    }

    /// Forward-strand id of a named sequence
    pub fn get_id(&self, name: &str) -> Option<u32> {
        self.name_to_id.get(name).copied()
    }

    /// Bytes of sequence `id`, if it exists
    pub fn sequence(&self, id: u32) -> Option<&[u8]> {
        let idx = id as usize;
        let start = *self.offsets.get(idx)? as usize;
        let len = *self.lengths.get(idx)? as usize;
        self.data.get(start..start + len)
    }
}

impl IndexMetadata for ReferenceStore {
    fn reference_lengths(&self) -> &[i64] {
        &self.lengths
    }

    fn reference_offsets(&self) -> &[u64] {
        &self.offsets
    }

    fn reference_data(&self) -> &[u8] {
        &self.data
    }

    fn num_forward_sequences(&self) -> usize {
        self.num_forward
    }
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&base| match base {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            b'a' => b't',
            b'c' => b'g',
            b'g' => b'c',
            b't' => b'a',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_sequences() -> Vec<(String, Vec<u8>)> {
        vec![
            ("chr1".to_string(), b"AACCGGTT".to_vec()),
            ("chr2".to_string(), b"ACGTA".to_vec()),
        ]
    }

    #[test]
    fn test_strand_doubled_layout() {
        let store = ReferenceStore::from_sequences(&two_sequences(), true);

        assert_eq!(store.len(), 4);
        assert_eq!(store.num_forward_sequences(), 2);
        assert_eq!(store.reference_lengths(), &[8, 5, 8, 5]);
        assert_eq!(store.reference_offsets(), &[0, 8, 13, 21]);
        assert_eq!(store.sequence(1), Some(&b"ACGTA"[..]));
        assert_eq!(store.sequence(3), Some(&b"TACGT"[..]));
        assert_eq!(store.sequence(4), None);
    }

    #[test]
    fn test_canonical_id_and_orientation() {
        let store = ReferenceStore::from_sequences(&two_sequences(), true);

        assert_eq!(store.canonical_id(1), 1);
        assert_eq!(store.canonical_id(3), 1);
        assert_eq!(store.orientation(1), Strand::Forward);
        assert_eq!(store.orientation(2), Strand::Reverse);
        assert_eq!(store.get_id("chr2"), Some(1));
        assert_eq!(store.get_name(2), Some("chr1"));
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"ACGTN"), b"NACGT".to_vec());
        assert_eq!(reverse_complement(b"aacg"), b"cgtt".to_vec());
    }
}
