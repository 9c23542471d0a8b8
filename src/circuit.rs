//! Circuits: registers, ops and validation. A [`Circuit`] is also what backends receive.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{CircuitError, CircuitResult};

/// Circuits wider than this cannot be addressed by basis-state indices.
pub const MAX_CIRCUIT_QUBITS: usize = 48;

/// A handle on a group of qubits. Registers are moved through builder calls rather than copied,
/// so a qubit group is only ever held in one place.
#[derive(Debug, PartialEq, Eq)]
pub struct Register {
    indices: Vec<usize>,
}

impl Register {
    pub(crate) fn new(indices: Vec<usize>) -> Self {
        debug_assert!(!indices.is_empty());
        Self { indices }
    }

    /// Size of the register in qubits.
    pub fn n(&self) -> usize {
        self.indices.len()
    }

    /// Absolute qubit indices, least significant first.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub(crate) fn into_indices(self) -> Vec<usize> {
        self.indices
    }
}

/// A single step of a circuit. Qubit lists are least significant first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CircuitOp {
    /// A hadamard on each listed qubit.
    Hadamard {
        /// Target qubits.
        qubits: Vec<usize>,
    },
    /// XOR `tables[table][value(index)]` into `output`. Its own inverse.
    Lookup {
        /// Table id within the circuit.
        table: usize,
        /// Qubits addressing the table.
        index: Vec<usize>,
        /// Qubits receiving the entry.
        output: Vec<usize>,
    },
    /// Multiply every basis state whose `qubits` read `pattern` by `e^{i phase}`.
    PhaseTag {
        /// Qubits compared against the pattern.
        qubits: Vec<usize>,
        /// Value to match.
        pattern: u64,
        /// Rotation angle.
        phase: f64,
    },
    /// `I - (1 - e^{i phase}) |s><s|` on `qubits`, where `|s>` is their uniform superposition.
    /// A phase of pi is the standard inversion about the mean (up to global phase).
    Diffusion {
        /// Register reflected about its uniform superposition.
        qubits: Vec<usize>,
        /// Rotation angle.
        phase: f64,
    },
    /// Terminal measurement of `qubits`.
    Measure {
        /// Measured qubits.
        qubits: Vec<usize>,
    },
}

impl CircuitOp {
    /// The exact inverse of this op.
    pub fn inverse(&self) -> CircuitResult<Self> {
        match self {
            Self::Hadamard { .. } | Self::Lookup { .. } => Ok(self.clone()),
            Self::PhaseTag {
                qubits,
                pattern,
                phase,
            } => Ok(Self::PhaseTag {
                qubits: qubits.clone(),
                pattern: *pattern,
                phase: -phase,
            }),
            Self::Diffusion { qubits, phase } => Ok(Self::Diffusion {
                qubits: qubits.clone(),
                phase: -phase,
            }),
            Self::Measure { .. } => Err(CircuitError::new("Measurements cannot be inverted")),
        }
    }

    /// Every qubit touched by this op.
    pub fn qubits(&self) -> impl Iterator<Item = usize> + '_ {
        let (a, b): (&[usize], &[usize]) = match self {
            Self::Hadamard { qubits }
            | Self::PhaseTag { qubits, .. }
            | Self::Diffusion { qubits, .. }
            | Self::Measure { qubits } => (qubits.as_slice(), Default::default()),
            Self::Lookup { index, output, .. } => (index.as_slice(), output.as_slice()),
        };
        a.iter().chain(b.iter()).copied()
    }
}

/// A finished circuit: a qubit count, the lookup tables it references, and its ops in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    n: usize,
    tables: Vec<Vec<u64>>,
    ops: Vec<CircuitOp>,
}

impl Circuit {
    pub(crate) fn from_parts(n: usize, tables: Vec<Vec<u64>>, ops: Vec<CircuitOp>) -> Self {
        Self { n, tables, ops }
    }

    /// Number of qubits.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Ops in application order.
    pub fn ops(&self) -> &[CircuitOp] {
        &self.ops
    }

    /// Lookup table by id.
    pub fn table(&self, id: usize) -> Option<&[u64]> {
        self.tables.get(id).map(Vec::as_slice)
    }

    /// The measured qubits, if the circuit ends in a measurement.
    pub fn measured(&self) -> Option<&[usize]> {
        match self.ops.last() {
            Some(CircuitOp::Measure { qubits }) => Some(qubits),
            _ => None,
        }
    }

    /// Number of ops satisfying `f`.
    pub fn count_ops<F>(&self, f: F) -> usize
    where
        F: Fn(&CircuitOp) -> bool,
    {
        self.ops.iter().filter(|op| f(op)).count()
    }

    /// Check the circuit is executable: qubits in range and distinct within each op, tables and
    /// patterns sized to their registers, and at most one measurement which must come last.
    pub fn validate(&self) -> CircuitResult<()> {
        if self.n == 0 || self.n > MAX_CIRCUIT_QUBITS {
            return Err(CircuitError::new(format!(
                "Circuit must have between 1 and {} qubits, found {}",
                MAX_CIRCUIT_QUBITS, self.n
            )));
        }
        let last = self.ops.len().saturating_sub(1);
        for (i, op) in self.ops.iter().enumerate() {
            let mut seen = HashSet::new();
            for q in op.qubits() {
                if q >= self.n {
                    return Err(CircuitError::new(format!(
                        "Op {} addresses qubit {} of a {} qubit circuit",
                        i, q, self.n
                    )));
                }
                if !seen.insert(q) {
                    return Err(CircuitError::new(format!(
                        "Op {} uses qubit {} more than once",
                        i, q
                    )));
                }
            }
            if seen.is_empty() {
                return Err(CircuitError::new(format!("Op {} has no qubits", i)));
            }
            match op {
                CircuitOp::Lookup {
                    table,
                    index,
                    output,
                } => {
                    let entries = self.table(*table).ok_or_else(|| {
                        CircuitError::new(format!("Op {} references missing table {}", i, table))
                    })?;
                    if entries.len() != 1 << index.len() {
                        return Err(CircuitError::new(format!(
                            "Table {} has {} entries but is addressed by {} qubits",
                            table,
                            entries.len(),
                            index.len()
                        )));
                    }
                    if output.len() < 64 && entries.iter().any(|e| *e >> output.len() != 0) {
                        return Err(CircuitError::new(format!(
                            "Table {} has entries wider than its {} qubit output",
                            table,
                            output.len()
                        )));
                    }
                }
                CircuitOp::PhaseTag {
                    qubits, pattern, ..
                } => {
                    if qubits.len() < 64 && *pattern >> qubits.len() != 0 {
                        return Err(CircuitError::new(format!(
                            "Op {} pattern {} does not fit {} qubits",
                            i,
                            pattern,
                            qubits.len()
                        )));
                    }
                }
                CircuitOp::Measure { .. } if i != last => {
                    return Err(CircuitError::new(
                        "Measurement must be the final op of a circuit",
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod circuit_tests {
    use super::*;

    #[test]
    fn test_inverse_negates_phases() -> CircuitResult<()> {
        let tag = CircuitOp::PhaseTag {
            qubits: vec![0, 1],
            pattern: 2,
            phase: 0.5,
        };
        match tag.inverse()? {
            CircuitOp::PhaseTag { phase, pattern, .. } => {
                assert_eq!(phase, -0.5);
                assert_eq!(pattern, 2);
            }
            other => panic!("unexpected inverse {:?}", other),
        }
        let lookup = CircuitOp::Lookup {
            table: 0,
            index: vec![0],
            output: vec![1],
        };
        assert_eq!(lookup.inverse()?, lookup);
        assert!(CircuitOp::Measure { qubits: vec![0] }.inverse().is_err());
        Ok(())
    }

    #[test]
    fn test_validate_rejects_mid_circuit_measurement() {
        let c = Circuit::from_parts(
            1,
            vec![],
            vec![
                CircuitOp::Measure { qubits: vec![0] },
                CircuitOp::Hadamard { qubits: vec![0] },
            ],
        );
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_validate_table_shape() {
        let narrow = Circuit::from_parts(
            3,
            vec![vec![0, 1, 2, 3]],
            vec![CircuitOp::Lookup {
                table: 0,
                index: vec![0, 1],
                output: vec![2],
            }],
        );
        assert!(narrow.validate().is_err());
        let ok = Circuit::from_parts(
            4,
            vec![vec![0, 1, 2, 3]],
            vec![CircuitOp::Lookup {
                table: 0,
                index: vec![0, 1],
                output: vec![2, 3],
            }],
        );
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_serde_shape() -> Result<(), serde_json::Error> {
        let op = CircuitOp::Hadamard { qubits: vec![0, 2] };
        let json = serde_json::to_string(&op)?;
        assert_eq!(json, r#"{"op":"hadamard","qubits":[0,2]}"#);
        let back: CircuitOp = serde_json::from_str(&json)?;
        assert_eq!(back, op);
        Ok(())
    }
}
