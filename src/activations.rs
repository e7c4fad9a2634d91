//! Activation functions and their derivatives.
//!
//! Derivatives are expressed in terms of the activation's *output*
//! `y = f(z)`, never the pre-activation `z`. Backpropagation code passes the
//! already-activated values it cached during the forward pass.
use crate::matrix::Matrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trait for activation functions.
pub trait Activation: fmt::Debug + Send + Sync {
    fn apply(&self, z: f64) -> f64;
    /// Derivative evaluated from the activation's output `y = apply(z)`.
    fn derivative_from_output(&self, y: f64) -> f64;

    fn apply_matrix(&self, z: &Matrix) -> Matrix {
        z.map(|v| self.apply(v))
    }

    fn derivative_matrix(&self, y: &Matrix) -> Matrix {
        y.map(|v| self.derivative_from_output(v))
    }
}

/// Sigmoid: 1 / (1 + exp(-z))
#[derive(Debug, Clone, Copy, Default)]
pub struct Sigmoid;

impl Activation for Sigmoid {
    fn apply(&self, z: f64) -> f64 {
        1.0 / (1.0 + (-z).exp())
    }
    fn derivative_from_output(&self, y: f64) -> f64 {
        y * (1.0 - y)
    }
}

/// Tanh: sinh(z) / cosh(z), built from exponentials.
///
/// Not `f64::tanh`: for |z| beyond ~710 both exponentials overflow and the
/// result is NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tanh;

impl Activation for Tanh {
    fn apply(&self, z: f64) -> f64 {
        let sinh = 0.5 * (z.exp() - (-z).exp());
        let cosh = 0.5 * (z.exp() + (-z).exp());
        sinh / cosh
    }
    fn derivative_from_output(&self, y: f64) -> f64 {
        1.0 - y * y
    }
}

/// Identity, for plain linear outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Activation for Identity {
    fn apply(&self, z: f64) -> f64 {
        z
    }
    fn derivative_from_output(&self, _y: f64) -> f64 {
        1.0
    }
}

/// Serializable activation selector used by [`crate::config::TrainingConfig`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    #[default]
    Identity,
    Sigmoid,
    Tanh,
}

impl ActivationKind {
    pub fn activation(self) -> &'static dyn Activation {
        match self {
            ActivationKind::Identity => &Identity,
            ActivationKind::Sigmoid => &Sigmoid,
            ActivationKind::Tanh => &Tanh,
        }
    }
}

/// Element-wise sigmoid.
pub fn sigmoid(z: &Matrix) -> Matrix {
    Sigmoid.apply_matrix(z)
}

/// Element-wise tanh via the exponential identity.
pub fn tanh(z: &Matrix) -> Matrix {
    Tanh.apply_matrix(z)
}

/// `y * (1 - y)` for sigmoid outputs `y`.
pub fn deriv_sigmoid_from_output(y: &Matrix) -> Matrix {
    Sigmoid.derivative_matrix(y)
}

/// `1 - y²` for tanh outputs `y`.
pub fn deriv_tanh_from_output(y: &Matrix) -> Matrix {
    Tanh.derivative_matrix(y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn tanh_matches_library_in_normal_range() {
        for &z in &[-5.0, -1.0, -0.25, 0.0, 0.3, 2.0, 7.5] {
            assert_abs_diff_eq!(Tanh.apply(z), z.tanh(), epsilon = 1e-12);
        }
    }

    #[test]
    fn tanh_overflows_like_the_exponential_form() {
        assert!(Tanh.apply(800.0).is_nan());
        assert!(Tanh.apply(-800.0).is_nan());
    }

    #[test]
    fn sigmoid_values() {
        assert_abs_diff_eq!(Sigmoid.apply(0.0), 0.5);
        assert_abs_diff_eq!(Sigmoid.apply(2.0), 1.0 / (1.0 + (-2.0f64).exp()));
    }

    #[test]
    fn derivatives_take_outputs() {
        let z = 0.7;
        let y = Tanh.apply(z);
        let numeric = (Tanh.apply(z + 1e-6) - Tanh.apply(z - 1e-6)) / 2e-6;
        assert_abs_diff_eq!(Tanh.derivative_from_output(y), numeric, epsilon = 1e-8);

        let s = Sigmoid.apply(z);
        let numeric = (Sigmoid.apply(z + 1e-6) - Sigmoid.apply(z - 1e-6)) / 2e-6;
        assert_abs_diff_eq!(Sigmoid.derivative_from_output(s), numeric, epsilon = 1e-8);
    }

    #[test]
    fn matrix_helpers_are_elementwise() {
        let y = Matrix::from_rows(vec![vec![0.5, 0.0], vec![-0.5, 1.0]]).unwrap();
        let dt = deriv_tanh_from_output(&y);
        assert_eq!(dt.to_rows(), vec![vec![0.75, 1.0], vec![0.75, 0.0]]);
        let ds = deriv_sigmoid_from_output(&y);
        assert_eq!(ds.to_rows(), vec![vec![0.25, 0.0], vec![-0.75, 0.0]]);
        assert_abs_diff_eq!(tanh(&y).get(0, 0), 0.5f64.tanh(), epsilon = 1e-12);
        assert_abs_diff_eq!(sigmoid(&y).get(0, 1), 0.5);
    }

    #[test]
    fn kind_dispatch() {
        assert_eq!(ActivationKind::default(), ActivationKind::Identity);
        assert_abs_diff_eq!(ActivationKind::Identity.activation().apply(3.0), 3.0);
        assert_abs_diff_eq!(ActivationKind::Tanh.activation().derivative_from_output(0.0), 1.0);
    }
}
