//! Execution backends.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::circuit::Circuit;
use crate::errors::BackendError;

pub mod local;
pub mod remote;

pub use local::StatevectorBackend;
pub use remote::{probe, RemoteBackend};

/// Observed bitstrings (most significant bit first) and how often each occurred.
pub type Counts = BTreeMap<String, usize>;

/// Something that executes circuits.
///
/// A submission either returns the full outcome distribution for the requested number of shots
/// or fails; there are no partial results.
pub trait Backend: Send + Sync {
    /// Run `circuit` `shots` times and count the measured outcomes.
    fn submit(&self, circuit: &Circuit, shots: usize) -> Result<Counts, BackendError>;
}

impl<B: Backend + ?Sized> Backend for &B {
    fn submit(&self, circuit: &Circuit, shots: usize) -> Result<Counts, BackendError> {
        (**self).submit(circuit, shots)
    }
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn submit(&self, circuit: &Circuit, shots: usize) -> Result<Counts, BackendError> {
        (**self).submit(circuit, shots)
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn submit(&self, circuit: &Circuit, shots: usize) -> Result<Counts, BackendError> {
        (**self).submit(circuit, shots)
    }
}

/// Result of a backend health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendStatus {
    /// A backend answered the health check.
    Serving,
    /// Nothing answered.
    Absent,
}
