//! Turns backend outcome counts into a collection index.

use crate::backend::{Backend, Counts};
use crate::circuit::Circuit;
use crate::errors::{BackendError, SearchError};
use crate::utils::parse_bitstring;

/// Run `circuit` and decode the most frequent measured bitstring as an unsigned index.
///
/// With a single shot this is simply the observed outcome. Ties are broken toward the smallest
/// bitstring.
pub fn extract<B>(circuit: &Circuit, backend: &B, shots: usize) -> Result<usize, SearchError>
where
    B: Backend + ?Sized,
{
    let counts = backend.submit(circuit, shots)?;
    let index = modal_outcome(&counts)?;
    tracing::debug!(shots, outcomes = counts.len(), index, "Extracted result.");
    Ok(index)
}

/// The most frequent outcome in `counts`, decoded most significant bit first.
pub fn modal_outcome(counts: &Counts) -> Result<usize, BackendError> {
    // BTreeMap iterates in key order, so keeping the first maximum picks the smallest bitstring.
    let (bits, _) = counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .fold(None, |best: Option<(&String, usize)>, (bits, count)| match best {
            Some((_, best_count)) if best_count >= *count => best,
            _ => Some((bits, *count)),
        })
        .ok_or(BackendError::EmptyResult)?;
    parse_bitstring(bits).ok_or_else(|| {
        BackendError::MalformedResponse(format!("non-binary outcome {:?}", bits))
    })
}
