//! In-process statevector simulation.

use std::marker::PhantomData;
use std::sync::Mutex;

use num_complex::Complex;
use num_traits::{ToPrimitive, Zero};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::{Backend, Counts};
use crate::circuit::{Circuit, CircuitOp, Register};
use crate::errors::BackendError;
use crate::state_ops::{
    apply_diffusion, apply_hadamards, apply_lookup, apply_phase_tag, basis_state, measure_probs,
};
use crate::types::Precision;
use crate::utils::{bitstring, scatter_bits};

/// Default limit on simulated circuit width.
pub const DEFAULT_MAX_QUBITS: usize = 24;

/// Most shots a single submission may request.
pub const MAX_SHOTS: usize = 1 << 16;

/// A noiseless dense statevector simulator.
///
/// Shots are drawn from the exact output distribution with a seedable RNG, so a seeded backend
/// replays the same samples for the same sequence of submissions.
#[derive(Debug)]
pub struct StatevectorBackend<P: Precision = f64> {
    max_qubits: usize,
    rng: Mutex<StdRng>,
    phantom: PhantomData<P>,
}

impl<P: Precision> Default for StatevectorBackend<P> {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl<P: Precision> StatevectorBackend<P> {
    /// A backend seeded from system entropy.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose sampling is reproducible.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            max_qubits: DEFAULT_MAX_QUBITS,
            rng: Mutex::new(rng),
            phantom: PhantomData,
        }
    }

    /// Refuse circuits wider than `max_qubits`.
    pub fn with_max_qubits(mut self, max_qubits: usize) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    /// Largest circuit this backend accepts.
    pub fn max_qubits(&self) -> usize {
        self.max_qubits
    }

    fn check(&self, circuit: &Circuit) -> Result<(), BackendError> {
        circuit
            .validate()
            .map_err(|err| BackendError::MalformedCircuit(err.to_string()))?;
        if circuit.n() > self.max_qubits {
            return Err(BackendError::MalformedCircuit(format!(
                "circuit needs {} qubits but this backend simulates at most {}",
                circuit.n(),
                self.max_qubits
            )));
        }
        Ok(())
    }

    /// Final state of `circuit` started from all zeros. Measurements are not applied.
    pub fn calculate_state(&self, circuit: &Circuit) -> Result<Vec<Complex<P>>, BackendError> {
        self.calculate_state_with_init(circuit, [])
    }

    /// Final state of `circuit` with the given registers initialized to the given values and all
    /// other qubits zero. Measurements are not applied.
    pub fn calculate_state_with_init<'a, It>(
        &self,
        circuit: &Circuit,
        init: It,
    ) -> Result<Vec<Complex<P>>, BackendError>
    where
        It: IntoIterator<Item = (&'a Register, usize)>,
    {
        self.check(circuit)?;
        let n = circuit.n();
        let mut initial_index = 0;
        for (r, value) in init {
            if r.indices().iter().any(|q| *q >= n) {
                return Err(BackendError::MalformedCircuit(
                    "initialized register is outside the circuit".to_string(),
                ));
            }
            initial_index |= scatter_bits(value as u64, r.indices());
        }
        let mut state = basis_state::<P>(n, initial_index);
        let mut arena = vec![Complex::zero(); state.len()];
        for op in circuit.ops() {
            match op {
                CircuitOp::Hadamard { qubits } => apply_hadamards(qubits, &mut state, &mut arena),
                CircuitOp::Lookup {
                    table,
                    index,
                    output,
                } => {
                    let entries = circuit.table(*table).ok_or_else(|| {
                        BackendError::MalformedCircuit(format!("missing table {}", table))
                    })?;
                    apply_lookup(entries, index, output, &state, &mut arena)
                }
                CircuitOp::PhaseTag {
                    qubits,
                    pattern,
                    phase,
                } => apply_phase_tag(qubits, *pattern, *phase, &state, &mut arena),
                CircuitOp::Diffusion { qubits, phase } => {
                    apply_diffusion(n, qubits, *phase, &state, &mut arena)
                }
                CircuitOp::Measure { .. } => continue,
            }
            std::mem::swap(&mut state, &mut arena);
        }
        Ok(state)
    }

    /// Outcome distribution of the circuit's terminal measurement.
    pub fn probabilities(&self, circuit: &Circuit) -> Result<Vec<P>, BackendError> {
        let measured = circuit.measured().ok_or_else(|| {
            BackendError::MalformedCircuit("circuit has no terminal measurement".to_string())
        })?;
        let state = self.calculate_state(circuit)?;
        Ok(measure_probs(measured, &state))
    }

    fn sample(&self, probs: &[P], shots: usize) -> Vec<usize> {
        let probs = probs
            .iter()
            .map(|p| p.to_f64().unwrap_or(0.0).max(0.0))
            .collect::<Vec<_>>();
        let total: f64 = probs.iter().sum();
        let fallback = probs.iter().rposition(|p| *p > 0.0).unwrap_or(0);
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut counts = vec![0usize; probs.len()];
        for _ in 0..shots {
            let mut r = rng.gen::<f64>() * total;
            let hit = probs
                .iter()
                .position(|p| {
                    r -= p;
                    *p > 0.0 && r < 0.0
                })
                .unwrap_or(fallback);
            counts[hit] += 1;
        }
        counts
    }
}

impl<P: Precision> Backend for StatevectorBackend<P> {
    fn submit(&self, circuit: &Circuit, shots: usize) -> Result<Counts, BackendError> {
        if shots == 0 || shots > MAX_SHOTS {
            return Err(BackendError::MalformedCircuit(format!(
                "shots must be between 1 and {}, found {}",
                MAX_SHOTS, shots
            )));
        }
        let probs = self.probabilities(circuit)?;
        let width = circuit.measured().map(<[usize]>::len).unwrap_or(0);
        let counts = self
            .sample(&probs, shots)
            .into_iter()
            .enumerate()
            .filter(|(_, count)| *count > 0)
            .map(|(value, count)| (bitstring(value as u64, width), count))
            .collect::<Counts>();
        tracing::debug!(qubits = circuit.n(), shots, outcomes = counts.len(), "Executed circuit.");
        Ok(counts)
    }
}
