//! Numeric precision of simulated amplitudes.

use num_complex::Complex;
use num_traits::{Float, NumAssign};
use std::fmt::{Debug, Display};
use std::iter::{Product, Sum};

/// The float precision of the simulated state.
pub trait Precision:
    Default + NumAssign + Float + Sum + Send + Sync + Display + Product + Debug
{
}

impl Precision for f64 {}

impl Precision for f32 {}

/// Convert an `f64` constant into the working precision.
#[inline]
pub fn cast<P: Precision>(x: f64) -> P {
    P::from(x).unwrap_or_else(P::nan)
}

/// The unit complex number `e^{i phase}`.
#[inline]
pub fn phase_factor<P: Precision>(phase: f64) -> Complex<P> {
    Complex::from_polar(P::one(), cast(phase))
}
