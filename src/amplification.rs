//! Grover amplitude amplification.
//!
//! With `N = 2^n` candidates of which `M` are marked, let `theta = asin(sqrt(M / N))`. Standard
//! Grover applies `round(pi / (4 theta) - 1/2)` sign-flip iterations and succeeds with probability
//! `sin^2((2t + 1) theta)`, which is close to but generally below one. The exact variant takes
//! `t = ceil(pi / (4 theta) - 1/2)` iterations and shrinks the rotation of both the marker and
//! the diffusion to
//!
//! ```text
//! phase = 2 asin( sin(pi / (4t + 2)) / sin(theta) )
//! ```
//!
//! so that the final state lies entirely in the marked subspace.

use std::f64::consts::PI;
use std::num::NonZeroUsize;

use crate::builder::CircuitBuilder;
use crate::circuit::{Circuit, Register};
use crate::errors::{CircuitError, CircuitResult};

const ITERATION_TOLERANCE: f64 = 1e-9;

/// How many amplification steps to take, and with which rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationPlan {
    /// Number of (marker, diffusion) pairs.
    pub iterations: usize,
    /// Rotation applied by both the marker and the diffusion.
    pub phase: f64,
    /// `asin(sqrt(M / N))`.
    pub theta: f64,
    /// Whether the plan is the exact variant.
    pub exact: bool,
}

impl IterationPlan {
    /// Plan a search over `2^index_width` candidates with `marked` winners.
    ///
    /// ```
    /// use qsearch::amplification::IterationPlan;
    ///
    /// # fn main() -> qsearch::errors::CircuitResult<()> {
    /// let plan = IterationPlan::new(3, 1, true)?;
    /// assert_eq!(plan.iterations, 2);
    /// assert!(plan.phase < std::f64::consts::PI);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(index_width: usize, marked: usize, exact: bool) -> CircuitResult<Self> {
        if index_width == 0 || index_width >= usize::BITS as usize {
            return Err(CircuitError::new(format!(
                "Invalid index width {}",
                index_width
            )));
        }
        let n = 1usize << index_width;
        if marked == 0 || marked > n {
            return Err(CircuitError::new(format!(
                "Marked count must be between 1 and {}, found {}",
                n, marked
            )));
        }
        let theta = (marked as f64 / n as f64).sqrt().asin();
        let ideal = PI / (4.0 * theta) - 0.5;
        let plan = if exact {
            let iterations = (ideal - ITERATION_TOLERANCE).ceil().max(0.0) as usize;
            let ratio = (PI / (4.0 * iterations as f64 + 2.0)).sin() / theta.sin();
            Self {
                iterations,
                phase: 2.0 * ratio.min(1.0).asin(),
                theta,
                exact,
            }
        } else {
            Self {
                iterations: ideal.round().max(0.0) as usize,
                phase: PI,
                theta,
                exact,
            }
        };
        tracing::debug!(
            n,
            marked,
            exact,
            iterations = plan.iterations,
            phase = plan.phase,
            "Planned amplification."
        );
        Ok(plan)
    }

    /// Success probability of the standard, sign-flip variant with this many iterations.
    pub fn standard_success_probability(&self) -> f64 {
        ((2.0 * self.iterations as f64 + 1.0) * self.theta).sin().powi(2)
    }
}

/// Prepare the uniform superposition on `index`, then apply the plan's (marker, diffusion)
/// pairs. `mark` receives the rotation it must apply to marked states.
pub fn amplify<F>(
    b: &mut CircuitBuilder,
    index: Register,
    plan: &IterationPlan,
    mut mark: F,
) -> CircuitResult<Register>
where
    F: FnMut(&mut CircuitBuilder, Register, f64) -> CircuitResult<Register>,
{
    let mut index = b.h(index);
    for _ in 0..plan.iterations {
        index = mark(b, index, plan.phase)?;
        index = b.diffuse(index, plan.phase);
    }
    Ok(index)
}

/// Build a complete search circuit over an `index_width` qubit index register, measured at the
/// end.
pub fn prepare_circuit<F>(
    index_width: NonZeroUsize,
    plan: &IterationPlan,
    mark: F,
) -> CircuitResult<Circuit>
where
    F: FnMut(&mut CircuitBuilder, Register, f64) -> CircuitResult<Register>,
{
    let mut b = CircuitBuilder::default();
    let index = b.register(index_width);
    let index = amplify(&mut b, index, plan, mark)?;
    let _ = b.measure(index);
    Ok(b.build())
}

#[cfg(test)]
mod amplification_tests {
    use super::*;

    #[test]
    fn test_rejects_bad_marked_counts() {
        assert!(IterationPlan::new(3, 0, true).is_err());
        assert!(IterationPlan::new(3, 9, true).is_err());
        assert!(IterationPlan::new(0, 1, true).is_err());
    }

    #[test]
    fn test_everything_marked_needs_no_iterations() -> CircuitResult<()> {
        let plan = IterationPlan::new(3, 8, true)?;
        assert_eq!(plan.iterations, 0);
        Ok(())
    }

    #[test]
    fn test_quarter_marked_is_one_sign_flip() -> CircuitResult<()> {
        let plan = IterationPlan::new(2, 1, true)?;
        assert_eq!(plan.iterations, 1);
        assert!((plan.phase - PI).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_circuit_shape() -> CircuitResult<()> {
        let plan = IterationPlan::new(3, 1, false)?;
        let c = prepare_circuit(NonZeroUsize::new(3).unwrap(), &plan, |b, r, phase| {
            b.tag(r, 0b011, phase)
        })?;
        // h, 2 x (tag, diffuse), measure
        assert_eq!(c.ops().len(), 6);
        assert_eq!(c.measured(), Some(&[0, 1, 2][..]));
        Ok(())
    }
}
