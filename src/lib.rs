#![forbid(unsafe_code)]
#![deny(
    unreachable_pub,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    missing_docs
)]

//! Exact Grover search over small collections of items.
//!
//! A collection of up to `2^n` items is encoded into a reversible lookup table from index to a
//! `k` bit label. A query is answered by preparing the uniform superposition over indices,
//! alternating a marker (which phase-rotates the indices whose label equals the query's) with
//! the diffusion operator, and sampling the index register once. The exact variant picks the
//! rotation angle so the matching index is measured with probability one.
//!
//! Circuits are executed by a [`Backend`](backend::Backend): either the in-process statevector
//! simulator or a backend server reached over HTTP.
//!
//! # Example
//! ```
//! use qsearch::prelude::*;
//!
//! # fn main() -> Result<(), SearchError> {
//! let words = ["Gallia", "est", "omnis", "divisa", "in", "partes", "tres", "quarum"];
//! let mut engine = SearchEngine::new(SearchConfig::default(), StatevectorBackend::<f64>::new());
//! engine.update_collection(&words)?;
//! assert_eq!(engine.search("divisa")?, 3);
//! assert_eq!(engine.locate("partes")?, SearchOutcome::Found(5));
//! # Ok(())
//! # }
//! ```

pub mod amplification;
pub mod backend;
pub mod builder;
pub mod calibration;
pub mod circuit;
pub mod config;
pub mod database;
pub mod engine;
pub mod errors;
pub mod extractor;
pub mod labeling;
pub mod marker;
mod rayon_helper;
pub mod server;
pub mod service;
pub mod state_ops;
pub mod types;
pub mod utils;

/// Commonly used types.
pub mod prelude {
    pub use crate::amplification::IterationPlan;
    pub use crate::backend::{Backend, BackendStatus, Counts, RemoteBackend, StatevectorBackend};
    pub use crate::builder::CircuitBuilder;
    pub use crate::circuit::{Circuit, CircuitOp, Register};
    pub use crate::config::{Config, SearchConfig};
    pub use crate::database::DatabaseOracle;
    pub use crate::engine::{SearchEngine, SearchOutcome};
    pub use crate::errors::{BackendError, CircuitError, CircuitResult, SearchError};
    pub use crate::labeling::{Label, Labeling, SeededLabeling};
    pub use crate::marker::QueryMarker;
    pub use crate::types::Precision;
}
