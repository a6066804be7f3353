use ndarray::{NdFloat, ScalarOperand};

use num_traits::{AsPrimitive, FromPrimitive, Signed};

use std::iter::Sum;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

// Include submodules
mod common;
mod error;
pub mod loss;
mod order;
mod projection;

// Re-export types from submodules
pub use common::{check_labels, DataPoint, Dataset};
pub use error::LinearError;
pub use loss::{KernelConfig, LossKind};
pub use order::{EpochOrder, SampleOrder};
pub use projection::{FnProjection, Identity, Projection};

pub trait Float:
    NdFloat
    + FromPrimitive
    + Default
    + Signed
    + Sum
    + AsPrimitive<f64>
    + for<'a> AddAssign<&'a Self>
    + for<'a> MulAssign<&'a Self>
    + for<'a> SubAssign<&'a Self>
    + for<'a> DivAssign<&'a Self>
    + num_traits::MulAdd<Output = Self>
    + ScalarOperand
    + std::marker::Unpin
{
    /// Converts a numeric literal. Every `f64` has an `f32`/`f64` image, so the
    /// NaN fallback is never taken for the built-in float types.
    fn constant(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).unwrap_or_else(<Self as num_traits::Float>::nan)
    }

    fn from_count(n: usize) -> Self {
        <Self as FromPrimitive>::from_usize(n).unwrap_or_else(<Self as num_traits::Float>::nan)
    }

    /// Lossy conversion used for error messages and logging.
    fn to_f64_lossy(self) -> f64 {
        AsPrimitive::<f64>::as_(self)
    }
}

impl Float for f32 {}

impl Float for f64 {}
