use serde::{Deserialize, Serialize};

/// Closed coordinate interval `[start, end]` on a read or reference.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: i64,
    pub end: i64,
}

impl Range {
    pub fn new(start: i64, end: i64) -> Self {
        debug_assert!(start <= end, "range start {start} past end {end}");
        Range { start, end }
    }

    /// Distance between the endpoints. A single-base range has `dist() == 0`.
    pub fn dist(&self) -> i64 {
        self.end - self.start
    }

    /// Number of bases covered, counting both endpoints.
    pub fn span(&self) -> i64 {
        self.dist() + 1
    }
}
