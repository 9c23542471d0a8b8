//! Kernels applying circuit ops to a dense statevector.
//!
//! Each kernel reads `input` and overwrites `output`, so callers keep one arena buffer and swap
//! the two after every op. Qubit `q` is bit `q` of a basis-state index.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use num_complex::Complex;
use num_traits::{One, Zero};

use crate::rayon_helper::{into_iter, iter, iter_mut};
use crate::types::{cast, phase_factor, Precision};
use crate::utils::{extract_bits, scatter_bits};

/// Get total magnitude of state.
pub fn prob_magnitude<P: Precision>(input: &[Complex<P>]) -> P {
    iter!(input).map(Complex::<P>::norm_sqr).sum()
}

/// Make the computational basis state `index` over `n` qubits.
pub fn basis_state<P: Precision>(n: usize, index: usize) -> Vec<Complex<P>> {
    let mut state = vec![Complex::zero(); 1 << n];
    state[index] = Complex::one();
    state
}

/// Apply a hadamard to each qubit in `qubits`. `input` is used as scratch space and holds
/// garbage afterwards.
pub fn apply_hadamards<P: Precision>(
    qubits: &[usize],
    input: &mut [Complex<P>],
    output: &mut [Complex<P>],
) {
    let norm: P = cast(std::f64::consts::FRAC_1_SQRT_2);
    let mut from_input = true;
    for q in qubits {
        let mask = 1 << q;
        let (src, dst): (&[Complex<P>], &mut [Complex<P>]) = if from_input {
            (&*input, &mut *output)
        } else {
            (&*output, &mut *input)
        };
        iter_mut!(dst).enumerate().for_each(|(i, out)| {
            let lo = src[i & !mask];
            let hi = src[i | mask];
            *out = if i & mask == 0 {
                (lo + hi) * norm
            } else {
                (lo - hi) * norm
            };
        });
        from_input = !from_input;
    }
    if from_input {
        output.copy_from_slice(input);
    }
}

/// XOR `table[value(index)]` into the `output` qubits.
pub fn apply_lookup<P: Precision>(
    table: &[u64],
    index: &[usize],
    output_qubits: &[usize],
    input: &[Complex<P>],
    output: &mut [Complex<P>],
) {
    iter_mut!(output).enumerate().for_each(|(i, out)| {
        let entry = table.get(extract_bits(i, index)).copied().unwrap_or(0);
        *out = input[i ^ scatter_bits(entry, output_qubits)];
    });
}

/// Multiply the amplitude of every state where `qubits` read `pattern` by `e^{i phase}`.
pub fn apply_phase_tag<P: Precision>(
    qubits: &[usize],
    pattern: u64,
    phase: f64,
    input: &[Complex<P>],
    output: &mut [Complex<P>],
) {
    let factor = phase_factor::<P>(phase);
    let pattern = pattern as usize;
    iter_mut!(output).enumerate().for_each(|(i, out)| {
        *out = if extract_bits(i, qubits) == pattern {
            input[i] * factor
        } else {
            input[i]
        };
    });
}

/// Apply `I - (1 - e^{i phase}) |s><s|` to the register `qubits` of an `n` qubit state, where
/// `|s>` is the register's uniform superposition. Remaining qubits are left untouched, so each
/// of their basis values gets its own reflection.
pub fn apply_diffusion<P: Precision>(
    n: usize,
    qubits: &[usize],
    phase: f64,
    input: &[Complex<P>],
    output: &mut [Complex<P>],
) {
    let rest = (0..n).filter(|q| !qubits.contains(q)).collect::<Vec<_>>();
    let mut sums = vec![Complex::<P>::zero(); 1 << rest.len()];
    input
        .iter()
        .enumerate()
        .for_each(|(i, amp)| sums[extract_bits(i, &rest)] += *amp);
    let size: P = cast((1u64 << qubits.len()) as f64);
    let scale = (Complex::<P>::one() - phase_factor::<P>(phase)) / size;
    iter_mut!(output).enumerate().for_each(|(i, out)| {
        *out = input[i] - sums[extract_bits(i, &rest)] * scale;
    });
}

/// Get probability for each possible value of the register `qubits`.
pub fn measure_probs<P: Precision>(qubits: &[usize], input: &[Complex<P>]) -> Vec<P> {
    let mut probs = vec![P::zero(); 1 << qubits.len()];
    input
        .iter()
        .enumerate()
        .for_each(|(i, amp)| probs[extract_bits(i, qubits)] += amp.norm_sqr());
    probs
}

/// Probability that the register `qubits` reads `value`.
pub fn measure_prob<P: Precision>(qubits: &[usize], value: usize, input: &[Complex<P>]) -> P {
    let r = 0..input.len();
    into_iter!(r)
        .filter(|i| extract_bits(*i, qubits) == value)
        .map(|i| input[i].norm_sqr())
        .sum()
}

#[cfg(test)]
mod state_ops_tests {
    use super::*;

    fn approx_eq(a: &[Complex<f64>], b: &[Complex<f64>]) {
        assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b.iter())
            .for_each(|(x, y)| assert!((x - y).norm() < 1e-10, "{:?} != {:?}", a, b));
    }

    fn reals(v: &[f64]) -> Vec<Complex<f64>> {
        v.iter().map(|x| Complex::new(*x, 0.0)).collect()
    }

    #[test]
    fn test_hadamards_make_uniform() {
        let mut input = basis_state::<f64>(2, 0);
        let mut output = input.clone();
        apply_hadamards(&[0, 1], &mut input, &mut output);
        approx_eq(&output, &reals(&[0.5, 0.5, 0.5, 0.5]));
    }

    #[test]
    fn test_hadamard_odd_count() {
        let mut input = basis_state::<f64>(1, 1);
        let mut output = input.clone();
        apply_hadamards(&[0], &mut input, &mut output);
        let h = std::f64::consts::FRAC_1_SQRT_2;
        approx_eq(&output, &reals(&[h, -h]));
    }

    #[test]
    fn test_lookup_is_involution() {
        // qubit 0 is the index, qubits 1..3 the output.
        let table = [0b10, 0b01];
        let input = reals(&[0.5, 0.5, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0]);
        let mut once = input.clone();
        apply_lookup(&table, &[0], &[1, 2], &input, &mut once);
        assert!((once[0b100].re - 0.5).abs() < 1e-12);
        assert!((once[0b011].re - 0.5).abs() < 1e-12);
        let mut twice = input.clone();
        apply_lookup(&table, &[0], &[1, 2], &once, &mut twice);
        approx_eq(&twice, &input);
    }

    #[test]
    fn test_phase_tag_flips_pattern() {
        let input = reals(&[0.5, 0.5, 0.5, 0.5]);
        let mut output = input.clone();
        apply_phase_tag(&[0, 1], 0b10, std::f64::consts::PI, &input, &mut output);
        approx_eq(&output, &reals(&[0.5, 0.5, -0.5, 0.5]));
    }

    #[test]
    fn test_diffusion_inverts_about_mean() {
        // One marked state of four: a single grover step finds it.
        let input = reals(&[0.5, 0.5, -0.5, 0.5]);
        let mut output = input.clone();
        apply_diffusion(2, &[0, 1], std::f64::consts::PI, &input, &mut output);
        approx_eq(&output, &reals(&[-0.0, -0.0, -1.0, -0.0]));
    }

    #[test]
    fn test_diffusion_leaves_other_register() {
        // Register is qubit 0, qubit 1 is spectator at |1>.
        let input = reals(&[0.0, 0.0, 1.0, 0.0]);
        let mut output = input.clone();
        apply_diffusion(2, &[0], std::f64::consts::PI, &input, &mut output);
        assert!(output[0].norm() < 1e-12);
        assert!((output[3] - Complex::new(-1.0, 0.0)).norm() < 1e-12);
        assert!((prob_magnitude(&output) - 1.0).abs() < 1e-12);
        let probs = measure_probs(&[1], &output);
        assert!((probs[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_measure_probs() {
        let input = reals(&[0.0, 0.6, 0.0, 0.8]);
        let probs = measure_probs(&[1], &input);
        assert!((probs[0] - 0.36).abs() < 1e-12);
        assert!((probs[1] - 0.64).abs() < 1e-12);
        assert!((measure_prob(&[0], 1, &input) - 1.0).abs() < 1e-12);
    }
}
