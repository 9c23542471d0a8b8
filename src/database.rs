//! The index to label lookup oracle.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use crate::builder::CircuitBuilder;
use crate::circuit::Register;
use crate::errors::{CircuitError, CircuitResult, SearchError};
use crate::labeling::{Label, Labeling, MAX_LABEL_WIDTH};

/// Widest index register an oracle can be built for.
pub const MAX_INDEX_WIDTH: usize = 20;

/// A reversible lookup from collection index to item label.
///
/// The oracle is built once per collection and never mutated afterwards, so it can be shared
/// behind an `Arc` by any number of concurrent queries. Each table entry holds the item's label
/// plus an occupancy bit above it; vacant slots hold zero and therefore never equal a tag
/// pattern produced by [`DatabaseOracle::tag_pattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseOracle {
    index_width: usize,
    label_width: usize,
    len: usize,
    table: Vec<u64>,
    items: Vec<Vec<u8>>,
}

impl DatabaseOracle {
    /// Encode `collection` for an index register of `index_width` qubits. Items past
    /// `2^index_width` are dropped.
    pub fn build<T, L>(collection: &[T], labeling: &L, index_width: usize) -> CircuitResult<Self>
    where
        T: AsRef<[u8]>,
        L: Labeling + ?Sized,
    {
        if index_width == 0 || index_width > MAX_INDEX_WIDTH {
            return Err(CircuitError::new(format!(
                "Index width must be between 1 and {}, found {}",
                MAX_INDEX_WIDTH, index_width
            )));
        }
        let label_width = labeling.width();
        if label_width == 0 || label_width >= MAX_LABEL_WIDTH {
            return Err(CircuitError::new(format!(
                "Label width must be between 1 and {}, found {}",
                MAX_LABEL_WIDTH - 1,
                label_width
            )));
        }
        let capacity = 1usize << index_width;
        if collection.len() > capacity {
            tracing::debug!(
                dropped = collection.len() - capacity,
                capacity,
                "Truncating collection to oracle capacity."
            );
        }
        let occupied = 1u64 << label_width;
        let mut table = vec![0u64; capacity];
        let len = collection.len().min(capacity);
        let items = collection
            .iter()
            .take(capacity)
            .map(|item| item.as_ref().to_vec())
            .collect();
        collection
            .iter()
            .take(capacity)
            .zip(table.iter_mut())
            .for_each(|(item, entry)| {
                *entry = labeling.label_bytes(item.as_ref()).bits() | occupied;
            });
        Ok(Self {
            index_width,
            label_width,
            len,
            table,
            items,
        })
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots, `2^index_width`.
    pub fn capacity(&self) -> usize {
        self.table.len()
    }

    /// Width of the index register.
    pub fn index_width(&self) -> usize {
        self.index_width
    }

    /// Width of a label.
    pub fn label_width(&self) -> usize {
        self.label_width
    }

    /// Width of the scratch register the oracle writes into: the label plus the occupancy bit.
    pub fn register_width(&self) -> usize {
        self.label_width + 1
    }

    /// The label stored at `index`, if that slot is occupied.
    pub fn label(&self, index: usize) -> Option<Label> {
        if index < self.len {
            Some(Label::new(self.table[index], self.label_width))
        } else {
            None
        }
    }

    /// The item stored at `index`, if that slot is occupied.
    pub fn item(&self, index: usize) -> Option<&[u8]> {
        self.items.get(index).map(Vec::as_slice)
    }

    /// The scratch-register value that an occupied slot holding `label` produces.
    pub fn tag_pattern(&self, label: Label) -> u64 {
        Label::new(label.bits(), self.label_width).bits() | (1u64 << self.label_width)
    }

    /// Raw table entries, one per slot.
    pub fn entries(&self) -> &[u64] {
        &self.table
    }

    /// All pairs of occupied indices sharing a label, ordered by first index.
    pub fn collisions(&self) -> Vec<(usize, usize)> {
        let mut first_seen = HashMap::new();
        let mut pairs = vec![];
        for (index, entry) in self.table.iter().take(self.len).enumerate() {
            match first_seen.get(entry) {
                Some(first) => pairs.push((*first, index)),
                None => {
                    first_seen.insert(*entry, index);
                }
            }
        }
        pairs
    }

    /// Fail with the first label collision, if any.
    pub fn ensure_injective(&self) -> Result<(), SearchError> {
        match self.collisions().first() {
            Some(&(first, second)) => Err(SearchError::LabelCollision {
                first,
                second,
                label: Label::new(self.table[first], self.label_width),
            }),
            None => Ok(()),
        }
    }

    /// Add the lookup `label ^= table[index]` to the circuit.
    pub fn apply(
        &self,
        b: &mut CircuitBuilder,
        index: Register,
        label: Register,
    ) -> CircuitResult<(Register, Register)> {
        if index.n() != self.index_width || label.n() != self.register_width() {
            return Err(CircuitError::new(format!(
                "Oracle expects {} index and {} label qubits, given {} and {}",
                self.index_width,
                self.register_width(),
                index.n(),
                label.n()
            )));
        }
        let table = b.add_table(&self.table);
        b.lookup(table, index, label)
    }

    /// Width of the scratch register as a `NonZeroUsize`.
    pub(crate) fn register_width_nonzero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.register_width()).unwrap_or(NonZeroUsize::MIN)
    }
}
