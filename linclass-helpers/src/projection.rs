use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::Float;

/// A feature-space map `ℝ^d → ℝ^{d'}` applied to every row before the model sees it.
///
/// Implementations must be pure: the same input always yields the same output,
/// and the output width depends only on the input width.
pub trait Projection<F: Float> {
    fn project(&self, x: ArrayView1<F>) -> Array1<F>;

    /// Projects every row of `x`.
    fn project_rows(&self, x: ArrayView2<F>) -> Array2<F> {
        let rows: Vec<Array1<F>> = x.axis_iter(Axis(0)).map(|row| self.project(row)).collect();
        let width = rows.first().map_or(0, |r| r.len());
        let mut out = Array2::zeros((rows.len(), width));
        for (mut dst, src) in out.axis_iter_mut(Axis(0)).zip(&rows) {
            dst.assign(src);
        }
        out
    }
}

/// Leaves the features unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

impl<F: Float> Projection<F> for Identity {
    fn project(&self, x: ArrayView1<F>) -> Array1<F> {
        x.to_owned()
    }

    fn project_rows(&self, x: ArrayView2<F>) -> Array2<F> {
        x.to_owned()
    }
}

/// Adapts a plain function or closure into a [`Projection`].
#[derive(Debug, Clone, Copy)]
pub struct FnProjection<T>(pub T);

impl<F, T> Projection<F> for FnProjection<T>
where
    F: Float,
    T: Fn(ArrayView1<F>) -> Array1<F>,
{
    fn project(&self, x: ArrayView1<F>) -> Array1<F> {
        (self.0)(x)
    }
}
