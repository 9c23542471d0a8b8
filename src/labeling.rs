//! Deterministic item labels.
//!
//! Every item of a collection is represented inside the lookup oracle by a `k`-bit label. Labels
//! must be reproducible across processes, so the default labeling is a seeded SHA-256 digest
//! rather than a process-randomized hasher.

use std::fmt::{Display, Formatter};

use sha2::{Digest, Sha256};

use crate::utils::bitstring;

/// Widest label supported. One extra bit is reserved by the oracle for slot occupancy.
pub const MAX_LABEL_WIDTH: usize = 63;

/// Seed used by [`SeededLabeling::new`].
pub const DEFAULT_LABEL_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// A fixed-width bit label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    bits: u64,
    width: usize,
}

impl Label {
    /// Make a label from the low `width` bits of `bits`.
    pub fn new(bits: u64, width: usize) -> Self {
        let width = width.min(MAX_LABEL_WIDTH);
        Self {
            bits: bits & mask(width),
            width,
        }
    }

    /// Label value.
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Label width in bits.
    pub fn width(&self) -> usize {
        self.width
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bitstring(self.bits, self.width))
    }
}

/// Map from items to fixed-width labels. Items are labeled by their byte representation.
pub trait Labeling: Send + Sync {
    /// Width of every label produced.
    fn width(&self) -> usize;

    /// Label raw bytes. Must be a pure function of `bytes`.
    fn label_bytes(&self, bytes: &[u8]) -> Label;

    /// Label an item.
    fn label<T>(&self, item: &T) -> Label
    where
        T: AsRef<[u8]> + ?Sized,
        Self: Sized,
    {
        self.label_bytes(item.as_ref())
    }
}

/// Labels items by the low bits of `SHA-256(seed_le || item)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededLabeling {
    width: usize,
    seed: u64,
}

impl SeededLabeling {
    /// Labeling of the given width with the default seed. Widths are clamped to
    /// `1..=MAX_LABEL_WIDTH`.
    pub fn new(width: usize) -> Self {
        Self::with_seed(width, DEFAULT_LABEL_SEED)
    }

    /// Labeling with an explicit seed.
    pub fn with_seed(width: usize, seed: u64) -> Self {
        Self {
            width: width.clamp(1, MAX_LABEL_WIDTH),
            seed,
        }
    }

    /// The seed mixed into every digest.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Labeling for SeededLabeling {
    fn width(&self) -> usize {
        self.width
    }

    fn label_bytes(&self, bytes: &[u8]) -> Label {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        Label::new(u64::from_le_bytes(head), self.width)
    }
}

fn mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}
