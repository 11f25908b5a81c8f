//! Candidate batch files
//!
//! A batch bundles everything one evaluation run needs: the reference
//! sequences, the reads, the raw seed hits in packed form and the LCSk
//! candidates computed over them. On disk it is the 8-byte magic followed by
//! a single bincode-encoded [`OverlapBatch`].

use crate::pipeline::Candidate;
use crate::seed_hit::{pack_hits, unpack_hits, SeedHit};
use crate::sequence::{ReadRecord, ReferenceStore};
use log::info;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

pub const BATCH_MAGIC: &[u8; 8] = b"SDLPBAT1";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlapBatch {
    pub reference: ReferenceStore,
    pub reads: Vec<ReadRecord>,
    /// Seed hits in their dense `u128` encoding
    pub hits: Vec<u128>,
    pub candidates: Vec<Candidate>,
}

impl OverlapBatch {
    pub fn new(
        reference: ReferenceStore,
        reads: Vec<ReadRecord>,
        hits: &[SeedHit],
        candidates: Vec<Candidate>,
    ) -> Self {
        OverlapBatch {
            reference,
            reads,
            hits: pack_hits(hits),
            candidates,
        }
    }

    pub fn seed_hits(&self) -> Vec<SeedHit> {
        unpack_hits(&self.hits)
    }

    /// Check that every candidate window lies inside the hit collection and
    /// names a read present in the batch.
    pub fn check(&self) -> std::io::Result<()> {
        let read_ids: FxHashSet<i64> = self.reads.iter().map(|read| read.id).collect();

        for (i, candidate) in self.candidates.iter().enumerate() {
            if candidate.begin_hit > candidate.end_hit || candidate.end_hit > self.hits.len() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!(
                        "Candidate {} has hit window {}..{} outside the {} seed hits",
                        i,
                        candidate.begin_hit,
                        candidate.end_hit,
                        self.hits.len()
                    ),
                ));
            }
            if !read_ids.contains(&candidate.query_id) {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Candidate {} refers to unknown read id {}", i, candidate.query_id),
                ));
            }
            if candidate.target_id as usize >= self.reference.len() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!(
                        "Candidate {} refers to unknown target id {}",
                        i, candidate.target_id
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn serialize_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writer.write_all(BATCH_MAGIC)?;
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())
            .map_err(|e| std::io::Error::other(format!("Failed to encode batch: {e:?}")))?;
        writer.flush()
    }

    pub fn load_from_reader<R: Read>(mut reader: R) -> std::io::Result<Self> {
        let mut magic_buf = [0u8; 8];
        reader.read_exact(&mut magic_buf)?;
        if &magic_buf != BATCH_MAGIC {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "Invalid magic bytes - not a seedlap batch file",
            ));
        }

        let batch: OverlapBatch =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard()).map_err(|e| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Failed to load batch: {e:?}"),
                )
            })?;
        batch.check()?;
        Ok(batch)
    }
}

pub fn write_batch(batch: &OverlapBatch, path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    batch.serialize_to(BufWriter::new(file))
}

pub fn load_batch(path: &Path) -> std::io::Result<OverlapBatch> {
    let file = File::open(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to open batch file '{}': {}", path.display(), e),
        )
    })?;
    let batch = OverlapBatch::load_from_reader(BufReader::new(file))?;
    info!(
        "Loaded batch with {} reference sequences, {} reads, {} seed hits and {} candidates",
        batch.reference.len(),
        batch.reads.len(),
        batch.hits.len(),
        batch.candidates.len()
    );
    Ok(batch)
}
