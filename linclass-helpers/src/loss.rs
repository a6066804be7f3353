//! Per-sample loss and update kernels for L2-regularized linear classifiers.
//!
//! The primal objective over a dataset of `n` samples is
//!
//! ```text
//! P(w) = ½‖w‖² + c · Σ_i φ(y_i · w·x_i)
//! ```
//!
//! and its Fenchel dual, written with one coefficient `α_i` per sample and
//! `β_i = y_i · α_i`, is
//!
//! ```text
//! D(α) = Σ_i ψ(β_i) − ½‖w(α)‖²,     w(α) = Σ_i α_i · x_i
//! ```
//!
//! where `ψ(β) = −c · φ*(−β / c)` is the scaled conjugate of the loss. This is
//! the usual `λ`-form with `λ = 1 / (c·n)` and the dual variables rescaled by
//! `c`, which keeps the logistic and hinge duals inside the box `[-c, c]`.
//!
//! All kernels are stateless: they read the current weights and return a value
//! or an increment. Mutation is left to the optimizers.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use ndarray::{Array1, ArrayView1};

use crate::{Float, LinearError};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Upper bound on safeguarded Newton iterations for the logistic dual step.
const MAX_NEWTON_STEPS: usize = 64;

/// The supported per-sample losses `φ(z)`, with `z = y · w·x` the margin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "snake_case")
)]
pub enum LossKind {
    /// `log(1 + exp(-z))`
    #[default]
    Logistic,
    /// `½(1 − z)²`, i.e. `½(y − w·x)²` for bipolar labels.
    Square,
    /// `max(0, 1 − z)`
    Hinge,
}

impl LossKind {
    pub fn name(&self) -> &'static str {
        match self {
            LossKind::Logistic => "logistic",
            LossKind::Square => "square",
            LossKind::Hinge => "hinge",
        }
    }
}

impl Display for LossKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LossKind {
    type Err = LinearError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logistic" | "log" => Ok(LossKind::Logistic),
            "square" | "square_loss" => Ok(LossKind::Square),
            "hinge" => Ok(LossKind::Hinge),
            other => Err(LinearError::config(
                "loss",
                format!("unknown loss kind {other:?}; expected logistic, square or hinge"),
            )),
        }
    }
}

/// Hyper-parameters shared by every kernel call.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct KernelConfig<F: Float> {
    /// Weight of the data term relative to `½‖w‖²`.
    pub c: F,
    pub loss: LossKind,
}

impl<F: Float> KernelConfig<F> {
    /// # Errors
    ///
    /// Returns `LinearError::Configuration` unless `c` is finite and strictly positive.
    pub fn new(c: F, loss: LossKind) -> Result<Self, LinearError> {
        if !(c.is_finite() && c > F::zero()) {
            return Err(LinearError::config(
                "c",
                format!("must be finite and > 0, got {}", c.to_f64_lossy()),
            ));
        }
        Ok(KernelConfig { c, loss })
    }
}

/// The signed margin `y · w·x`.
pub fn margin<F: Float>(x: ArrayView1<F>, y: F, w: ArrayView1<F>) -> F {
    y * w.dot(&x)
}

/// The class `sign(m)` assigned to a raw margin `m = w·x`; a zero margin maps
/// to `+1`.
pub fn predicted_label<F: Float>(m: F) -> F {
    if m >= F::zero() {
        F::one()
    } else {
        -F::one()
    }
}

/// `σ(-z) = 1 / (1 + exp(z))` without overflow for large `|z|`.
pub fn sigmoid_neg<F: Float>(z: F) -> F {
    if z >= F::zero() {
        let e = (-z).exp();
        e / (F::one() + e)
    } else {
        F::one() / (F::one() + z.exp())
    }
}

/// `φ(z)` for the selected loss.
///
/// The logistic branch uses `max(-z, 0) + log1p(exp(-|z|))` so that it stays
/// finite for margins of any magnitude.
pub fn loss_value<F: Float>(loss: LossKind, z: F) -> F {
    match loss {
        LossKind::Logistic => (-z).max(F::zero()) + (-z.abs()).exp().ln_1p(),
        LossKind::Square => {
            let r = F::one() - z;
            F::constant(0.5) * r * r
        }
        LossKind::Hinge => (F::one() - z).max(F::zero()),
    }
}

/// A (sub)derivative `φ'(z)`. At the hinge kink the zero sub-gradient is used.
pub fn loss_derivative<F: Float>(loss: LossKind, z: F) -> F {
    match loss {
        LossKind::Logistic => -sigmoid_neg(z),
        LossKind::Square => z - F::one(),
        LossKind::Hinge => {
            if z < F::one() {
                -F::one()
            } else {
                F::zero()
            }
        }
    }
}

/// Per-sample regularized loss `c · φ(y · w·x) + ½‖w‖²`.
pub fn regularized_loss<F: Float>(
    config: &KernelConfig<F>,
    x: ArrayView1<F>,
    y: F,
    w: ArrayView1<F>,
) -> F {
    let z = margin(x, y, w);
    config.c * loss_value(config.loss, z) + F::constant(0.5) * w.dot(&w)
}

/// Descent direction of the per-sample regularized loss:
///
/// ```text
/// g_i = −c · φ'(z) · y · x − w
/// ```
///
/// For the logistic loss this is `c · y · x / (1 + exp(y · w·x)) − w`.
pub fn descent_direction<F: Float>(
    config: &KernelConfig<F>,
    x: ArrayView1<F>,
    y: F,
    w: ArrayView1<F>,
) -> Array1<F> {
    let z = margin(x, y, w);
    let scale = -config.c * loss_derivative(config.loss, z) * y;
    let mut g = x.mapv(|v| v * scale);
    g -= &w;
    g
}

/// The SGD increment `ε · g_i`, to be added to `w`.
pub fn sgd_increment<F: Float>(
    config: &KernelConfig<F>,
    x: ArrayView1<F>,
    y: F,
    w: ArrayView1<F>,
    eps: F,
) -> Array1<F> {
    let mut g = descent_direction(config, x, y, w);
    g *= eps;
    g
}

/// The scaled conjugate term `ψ(β)` of the dual objective.
///
/// Returns negative infinity outside the domain of the conjugate.
pub fn dual_value<F: Float>(config: &KernelConfig<F>, beta: F) -> F {
    let c = config.c;
    match config.loss {
        LossKind::Logistic => {
            if beta < F::zero() || beta > c {
                return F::neg_infinity();
            }
            xlogx_over(beta, c) + xlogx_over(c - beta, c)
        }
        LossKind::Square => beta - beta * beta / (F::constant(2.0) * c),
        LossKind::Hinge => {
            if beta < F::zero() || beta > c {
                F::neg_infinity()
            } else {
                beta
            }
        }
    }
}

/// `−t · ln(t / c)`, continuous at `t = 0`.
fn xlogx_over<F: Float>(t: F, c: F) -> F {
    if t <= F::zero() {
        F::zero()
    } else {
        -t * (t / c).ln()
    }
}

/// The dual coordinate increment `Δα_i` that maximizes `D` along coordinate
/// `i`, given the current weights and the current coefficient `α_i`.
///
/// Square and hinge losses have closed forms. The logistic conjugate leads to
/// a scalar equation that is solved by Newton steps kept inside a shrinking
/// bracket, so the result always satisfies `y · (α_i + Δα_i) ∈ [0, c]`.
pub fn dual_increment<F: Float>(
    config: &KernelConfig<F>,
    x: ArrayView1<F>,
    y: F,
    w: ArrayView1<F>,
    alpha_i: F,
) -> F {
    let c = config.c;
    let z = margin(x, y, w);
    let q = x.dot(&x);
    let beta = y * alpha_i;

    let next = match config.loss {
        LossKind::Square => beta + (c * (F::one() - z) - beta) / (F::one() + c * q),
        LossKind::Hinge => {
            if q > F::zero() {
                (beta + (F::one() - z) / q).max(F::zero()).min(c)
            } else {
                c
            }
        }
        LossKind::Logistic => logistic_dual_root(c, beta, z, q),
    };

    y * (next - beta)
}

/// Solves `ln((c − b) / b) − z − (b − β)·q = 0` for `b ∈ (0, c)`.
///
/// The left-hand side is strictly decreasing in `b`, from `+∞` at `0` to `−∞`
/// at `c`, so the root is unique and every Newton iterate can be checked
/// against the bracket.
fn logistic_dual_root<F: Float>(c: F, beta: F, z: F, q: F) -> F {
    let half = F::constant(0.5);
    let tol = F::epsilon() * F::constant(16.0) * c;

    let mut lo = F::zero();
    let mut hi = c;
    let mut b = if beta > F::zero() && beta < c {
        beta
    } else {
        // Exact root when x = 0, and a good start otherwise.
        c * sigmoid_neg(z)
    };
    if !(b > lo && b < hi) {
        b = half * c;
    }

    for _ in 0..MAX_NEWTON_STEPS {
        let f = ((c - b) / b).ln() - z - (b - beta) * q;
        if f == F::zero() {
            break;
        }
        if f > F::zero() {
            lo = b;
        } else {
            hi = b;
        }

        let slope = F::one() / (c - b) + F::one() / b + q;
        let mut next = b + f / slope;
        if !(next > lo && next < hi) {
            next = half * (lo + hi);
        }
        let done = (next - b).abs() <= tol;
        b = next;
        if done || hi - lo <= tol {
            break;
        }
    }

    b.max(F::zero()).min(c)
}
