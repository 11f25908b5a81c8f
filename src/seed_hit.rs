use serde::{Deserialize, Serialize};

/// A single minimizer match between a read and an indexed reference
///
/// ## Dense layout (`u128`):
/// - bits `0..32`: read position
/// - bits `32..64`: reference position
/// - bits `64..96`: target id
/// - bit `127` (MSB): strand
///
/// The struct itself is what the filters read; the packed form is only used
/// for batch storage and transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedHit {
    pub read_position: u32,
    pub reference_position: u32,
    pub target_id: u32,
    pub strand: Strand,
}

/// Strand orientation of a seed hit
#[derive(Default, PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    pub fn as_char(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl SeedHit {
    /// Bit flag for encoding strand in the MSB of the packed value
    pub const STRAND_BIT: u128 = 1 << 127;

    const FIELD_MASK: u128 = 0xFFFF_FFFF;

    pub fn new(read_position: u32, reference_position: u32, target_id: u32, strand: Strand) -> Self {
        SeedHit {
            read_position,
            reference_position,
            target_id,
            strand,
        }
    }

    /// Pack into the dense 128-bit representation
    pub fn to_packed(&self) -> u128 {
        let mut packed = (self.read_position as u128)
            | ((self.reference_position as u128) << 32)
            | ((self.target_id as u128) << 64);
        if self.strand == Strand::Reverse {
            packed |= Self::STRAND_BIT;
        }
        packed
    }

    /// Unpack from the dense 128-bit representation
    pub fn from_packed(packed: u128) -> Self {
        SeedHit {
            read_position: (packed & Self::FIELD_MASK) as u32,
            reference_position: ((packed >> 32) & Self::FIELD_MASK) as u32,
            target_id: ((packed >> 64) & Self::FIELD_MASK) as u32,
            strand: if (packed & Self::STRAND_BIT) != 0 {
                Strand::Reverse
            } else {
                Strand::Forward
            },
        }
    }

    /// Difference between reference and read coordinates
    pub fn diagonal(&self) -> i64 {
        self.reference_position as i64 - self.read_position as i64
    }
}

#[inline]
pub fn read_position(hit: &SeedHit) -> i64 {
    hit.read_position as i64
}

#[inline]
pub fn reference_position(hit: &SeedHit) -> i64 {
    hit.reference_position as i64
}

pub fn pack_hits(hits: &[SeedHit]) -> Vec<u128> {
    hits.iter().map(SeedHit::to_packed).collect()
}

pub fn unpack_hits(packed: &[u128]) -> Vec<SeedHit> {
    packed.iter().copied().map(SeedHit::from_packed).collect()
}
