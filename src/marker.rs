//! Marks the indices holding a query's label, leaving scratch qubits clean.

use std::sync::Arc;

use crate::builder::CircuitBuilder;
use crate::circuit::Register;
use crate::database::DatabaseOracle;
use crate::errors::{CircuitError, CircuitResult};
use crate::labeling::{Label, Labeling};

/// Phase-flips the index states whose stored label equals the label of a query.
///
/// Each call borrows a zeroed scratch register from the builder, writes the oracle's label into
/// it, tags the matching value and then applies the exact inverse lookup before handing the
/// register back. The scratch register is therefore zero again between amplification steps.
#[derive(Debug)]
pub struct QueryMarker<L: ?Sized> {
    oracle: Arc<DatabaseOracle>,
    labeling: Arc<L>,
}

impl<L: ?Sized> Clone for QueryMarker<L> {
    fn clone(&self) -> Self {
        Self {
            oracle: Arc::clone(&self.oracle),
            labeling: Arc::clone(&self.labeling),
        }
    }
}

impl<L: Labeling + ?Sized> QueryMarker<L> {
    /// Make a marker for `oracle`, which must have been built with a labeling of the same width.
    pub fn new(oracle: Arc<DatabaseOracle>, labeling: Arc<L>) -> CircuitResult<Self> {
        if labeling.width() != oracle.label_width() {
            return Err(CircuitError::new(format!(
                "Labeling produces {} bit labels but the oracle stores {} bit labels",
                labeling.width(),
                oracle.label_width()
            )));
        }
        Ok(Self { oracle, labeling })
    }

    /// The oracle this marker reads.
    pub fn oracle(&self) -> &DatabaseOracle {
        &self.oracle
    }

    /// Label the query is compared against.
    pub fn target_label<Q>(&self, query: &Q) -> Label
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        self.labeling.label_bytes(query.as_ref())
    }

    /// Rotate by `phase` the amplitude of every index whose label equals the query's.
    pub fn mark<Q>(
        &self,
        b: &mut CircuitBuilder,
        index: Register,
        query: &Q,
        phase: f64,
    ) -> CircuitResult<Register>
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        let pattern = self.oracle.tag_pattern(self.target_label(query));
        let scratch = b.make_zeroed_temp_register(self.oracle.register_width_nonzero());
        let (index, scratch) = b.with_uncompute(
            (index, scratch),
            |b, (index, scratch)| self.oracle.apply(b, index, scratch),
            |b, (index, scratch)| Ok((index, b.tag(scratch, pattern, phase)?)),
        )?;
        b.return_zeroed_temp_register(scratch);
        Ok(index)
    }
}
