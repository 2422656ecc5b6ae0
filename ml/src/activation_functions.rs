//! This module provides the squashing functions of the network,
//! namely the scaled hyperbolic tangent of LeCun et al. and the sigmoid it is built on.
//!
//! All activation functions are exposed as scalar functions as well as elementwise maps
//! over arrays.
use ndarray::*;
use serde_derive::{Deserialize, Serialize};

use crate::ImagePrecision;

/// Amplitude A of the scaled tanh `A * tanh(S * a)`.
pub const TANH_AMPLITUDE: ImagePrecision = 1.7159;
/// Slope S of the scaled tanh at the origin.
pub const TANH_ORIGIN_SLOPE: ImagePrecision = 2.0 / 3.0;

/// Logistic sigmoid `1 / (1 + e^-x)`.
pub fn sigmoid(x: ImagePrecision) -> ImagePrecision {
    1.0 / (1.0 + (-x).exp())
}

/// The activation function according to
/// Gradient-Based Learning Applied to Document Recognition, LeCun et al., 1998,
/// <https://ieeexplore.ieee.org/stamp/stamp.jsp?tp=&arnumber=726791>.
///
/// This is not the plain tanh: the input is passed through a sigmoid first, the result
/// is scaled by the slope at the origin, squashed by tanh and multiplied by the amplitude,
/// `1.7159 * tanh(2/3 * sigmoid(x))`.
pub fn scaled_tanh(x: ImagePrecision) -> ImagePrecision {
    TANH_AMPLITUDE * (TANH_ORIGIN_SLOPE * sigmoid(x)).tanh()
}

/// Derivative of tanh evaluated at an already activated value, `1 - a^2`.
pub fn tanh_derivative(activation: ImagePrecision) -> ImagePrecision {
    1.0 - activation.powi(2)
}

/// Elementwise scaled tanh
pub fn scaled_tanh_map<D: Dimension>(data: &Array<ImagePrecision, D>) -> Array<ImagePrecision, D> {
    data.mapv(scaled_tanh)
}

/// Elementwise tanh derivative
pub fn tanh_derivative_map<D: Dimension>(
    data: &Array<ImagePrecision, D>,
) -> Array<ImagePrecision, D> {
    data.mapv(tanh_derivative)
}

/// Which stages pass their raw output through [`scaled_tanh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivationPlacement {
    /// Every convolution, pooling and fully connected stage. The output scores stay raw.
    HiddenLayers,
    /// No stage is activated; the pipeline is purely affine.
    Disabled,
}

impl Default for ActivationPlacement {
    fn default() -> Self {
        ActivationPlacement::HiddenLayers
    }
}

impl ActivationPlacement {
    /// Activates the output of a hidden stage according to this placement.
    pub fn activate<D: Dimension>(
        &self,
        mut data: Array<ImagePrecision, D>,
    ) -> Array<ImagePrecision, D> {
        if let ActivationPlacement::HiddenLayers = self {
            data.mapv_inplace(scaled_tanh);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_sigmoid() {
        assert_eq!(sigmoid(0.), 0.5);
        assert!((sigmoid(2.) + sigmoid(-2.) - 1.).abs() < EPS);
        assert!(sigmoid(50.) > 0.999_999);
    }

    #[test]
    fn test_scaled_tanh() {
        // sigmoid(0) = 0.5, so the origin maps to A * tanh(1/3)
        assert!((scaled_tanh(0.) - 1.7159 * (1.0f64 / 3.0).tanh()).abs() < EPS);
        // the sigmoid keeps the tanh argument within (0, 2/3)
        assert!(scaled_tanh(-100.).abs() < 1e-12);
        assert!((scaled_tanh(100.) - 1.7159 * (2.0f64 / 3.0).tanh()).abs() < EPS);
        assert!(scaled_tanh(1.) > scaled_tanh(0.));
    }

    #[test]
    fn test_tanh_derivative() {
        assert_eq!(tanh_derivative(0.), 1.);
        assert_eq!(tanh_derivative(0.5), 0.75);
        assert_eq!(tanh_derivative(-1.), 0.);
        let x = array![[0., 0.5], [-1., 2.]];
        assert_eq!(tanh_derivative_map(&x), array![[1., 0.75], [0., -3.]]);
    }

    #[test]
    fn test_placement() {
        let x = array![0., 1., -1.];
        assert_eq!(ActivationPlacement::Disabled.activate(x.clone()), x);
        assert_eq!(
            ActivationPlacement::HiddenLayers.activate(x.clone()),
            scaled_tanh_map(&x)
        );
        assert_eq!(ActivationPlacement::default(), ActivationPlacement::HiddenLayers);
    }
}
