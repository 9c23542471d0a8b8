//! Incremental circuit construction.

use std::num::NonZeroUsize;

use crate::circuit::{Circuit, CircuitOp, Register};
use crate::errors::{CircuitError, CircuitResult};

/// Builds a [`Circuit`] out of registers and ops.
///
/// Registers are handed back from every call so the borrow checker tracks which code currently
/// holds which qubits. Scratch registers come from a pool of qubits known to be back at zero,
/// so repeated computations reuse the same qubits instead of widening the circuit.
#[derive(Default, Debug)]
pub struct CircuitBuilder {
    pipeline: Vec<CircuitOp>,
    tables: Vec<Vec<u64>>,
    n: usize,
    zeroed_qubits: Vec<usize>,
}

/// Identifies a lookup table added with [`CircuitBuilder::add_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(usize);

impl CircuitBuilder {
    /// Number of qubits allocated so far.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Returns the depth of the current circuit (pipeline).
    pub fn pipeline_depth(&self) -> usize {
        self.pipeline.len()
    }

    /// Construct a register with multiple qubits, initially zero.
    pub fn register(&mut self, n: NonZeroUsize) -> Register {
        let n: usize = n.into();
        let indices = (self.n..self.n + n).collect();
        self.n += n;
        Register::new(indices)
    }

    /// Borrow a register of `n` qubits which are guaranteed to be zero. Pooled qubits are reused
    /// before new ones are allocated.
    pub fn make_zeroed_temp_register(&mut self, n: NonZeroUsize) -> Register {
        let n: usize = n.into();
        let reused = n.min(self.zeroed_qubits.len());
        let mut indices = self
            .zeroed_qubits
            .split_off(self.zeroed_qubits.len() - reused);
        indices.extend(self.n..self.n + (n - reused));
        self.n += n - reused;
        indices.sort_unstable();
        Register::new(indices)
    }

    /// Return a scratch register. The caller guarantees every qubit is back at zero.
    pub fn return_zeroed_temp_register(&mut self, r: Register) {
        self.zeroed_qubits.extend(r.into_indices());
    }

    /// Add a lookup table, reusing an identical table if one was already added.
    pub fn add_table(&mut self, entries: &[u64]) -> TableId {
        match self.tables.iter().position(|t| t.as_slice() == entries) {
            Some(id) => TableId(id),
            None => {
                self.tables.push(entries.to_vec());
                TableId(self.tables.len() - 1)
            }
        }
    }

    /// Apply a hadamard to every qubit of `r`.
    pub fn h(&mut self, r: Register) -> Register {
        self.pipeline.push(CircuitOp::Hadamard {
            qubits: r.indices().to_vec(),
        });
        r
    }

    /// XOR `table[index]` into `output`.
    pub fn lookup(
        &mut self,
        table: TableId,
        index: Register,
        output: Register,
    ) -> CircuitResult<(Register, Register)> {
        let entries = self
            .tables
            .get(table.0)
            .ok_or_else(|| CircuitError::new("Unknown lookup table"))?;
        if entries.len() != 1 << index.n() {
            return Err(CircuitError::new(format!(
                "Lookup table has {} entries but index register has {} qubits",
                entries.len(),
                index.n()
            )));
        }
        if output.n() < 64 && entries.iter().any(|e| *e >> output.n() != 0) {
            return Err(CircuitError::new(format!(
                "Lookup table entries do not fit a {} qubit register",
                output.n()
            )));
        }
        self.pipeline.push(CircuitOp::Lookup {
            table: table.0,
            index: index.indices().to_vec(),
            output: output.indices().to_vec(),
        });
        Ok((index, output))
    }

    /// Rotate the phase of every state where `r` reads `pattern` by `phase`.
    pub fn tag(&mut self, r: Register, pattern: u64, phase: f64) -> CircuitResult<Register> {
        if r.n() < 64 && pattern >> r.n() != 0 {
            return Err(CircuitError::new(format!(
                "Pattern {} does not fit a {} qubit register",
                pattern,
                r.n()
            )));
        }
        self.pipeline.push(CircuitOp::PhaseTag {
            qubits: r.indices().to_vec(),
            pattern,
            phase,
        });
        Ok(r)
    }

    /// Reflect `r` about its uniform superposition with rotation `phase`.
    pub fn diffuse(&mut self, r: Register, phase: f64) -> Register {
        self.pipeline.push(CircuitOp::Diffusion {
            qubits: r.indices().to_vec(),
            phase,
        });
        r
    }

    /// Measure `r`. This must be the last op added.
    pub fn measure(&mut self, r: Register) -> Register {
        self.pipeline.push(CircuitOp::Measure {
            qubits: r.indices().to_vec(),
        });
        r
    }

    /// Run `compute`, then `body`, then the exact inverse of everything `compute` emitted, in
    /// reverse order. Scratch state written by `compute` is therefore restored once the scope
    /// closes, whatever `body` did with it in between.
    ///
    /// ```
    /// use qsearch::builder::CircuitBuilder;
    /// use qsearch::circuit::CircuitOp;
    /// use std::num::NonZeroUsize;
    ///
    /// # fn main() -> qsearch::errors::CircuitResult<()> {
    /// let mut b = CircuitBuilder::default();
    /// let r = b.register(NonZeroUsize::new(2).unwrap());
    /// let r = b.with_uncompute(r, |b, r| Ok(b.h(r)), |b, r| b.tag(r, 0b11, 1.0))?;
    /// let circuit = b.build();
    /// assert_eq!(circuit.ops().len(), 3);
    /// assert!(matches!(circuit.ops()[2], CircuitOp::Hadamard { .. }));
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_uncompute<S, C, F>(&mut self, state: S, compute: C, body: F) -> CircuitResult<S>
    where
        C: FnOnce(&mut Self, S) -> CircuitResult<S>,
        F: FnOnce(&mut Self, S) -> CircuitResult<S>,
    {
        let start = self.pipeline.len();
        let state = compute(self, state)?;
        let computed = self.pipeline[start..].to_vec();
        let state = body(self, state)?;
        let inverse = computed
            .iter()
            .rev()
            .map(CircuitOp::inverse)
            .collect::<CircuitResult<Vec<_>>>()?;
        self.pipeline.extend(inverse);
        Ok(state)
    }

    /// Finish the circuit.
    pub fn build(self) -> Circuit {
        Circuit::from_parts(self.n, self.tables, self.pipeline)
    }
}

#[cfg(test)]
mod builder_tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_temp_registers_are_reused() {
        let mut b = CircuitBuilder::default();
        let _r = b.register(nz(3));
        let t = b.make_zeroed_temp_register(nz(4));
        assert_eq!(t.indices(), &[3, 4, 5, 6]);
        b.return_zeroed_temp_register(t);
        let t = b.make_zeroed_temp_register(nz(4));
        assert_eq!(t.indices(), &[3, 4, 5, 6]);
        assert_eq!(b.n(), 7);
        b.return_zeroed_temp_register(t);
        let t = b.make_zeroed_temp_register(nz(5));
        assert_eq!(t.n(), 5);
        assert_eq!(b.n(), 8);
    }

    #[test]
    fn test_tables_are_deduplicated() {
        let mut b = CircuitBuilder::default();
        let a = b.add_table(&[1, 2]);
        let c = b.add_table(&[3, 4]);
        assert_ne!(a, c);
        assert_eq!(b.add_table(&[1, 2]), a);
    }

    #[test]
    fn test_uncompute_appends_reversed_inverse() -> CircuitResult<()> {
        let mut b = CircuitBuilder::default();
        let index = b.register(nz(1));
        let out = b.register(nz(1));
        let t = b.add_table(&[1, 0]);
        let (index, out) = b.with_uncompute(
            (index, out),
            |b, (index, out)| {
                let index = b.h(index);
                b.lookup(t, index, out)
            },
            |b, (index, out)| Ok((index, b.tag(out, 1, 0.25)?)),
        )?;
        let _ = b.measure(index);
        let _ = out;
        let ops = b.build().ops().to_vec();
        assert_eq!(ops.len(), 6);
        assert!(matches!(ops[3], CircuitOp::Lookup { .. }));
        assert!(matches!(ops[4], CircuitOp::Hadamard { .. }));
        Ok(())
    }

    #[test]
    fn test_uncompute_rejects_measurement() {
        let mut b = CircuitBuilder::default();
        let r = b.register(nz(1));
        let res = b.with_uncompute(r, |b, r| Ok(b.measure(r)), |_, r| Ok(r));
        assert!(res.is_err());
    }

    #[test]
    fn test_lookup_checks_widths() {
        let mut b = CircuitBuilder::default();
        let index = b.register(nz(2));
        let out = b.register(nz(1));
        let t = b.add_table(&[0, 1, 2, 3]);
        assert!(b.lookup(t, index, out).is_err());
    }
}
