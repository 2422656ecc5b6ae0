//! Forward inference for a LeNet-5 variant over single channel 28x28 images.
//!
//! The network is computed from first principles: every kernel (convolution,
//! pooling, dense layers, scoring) is a plain loop over `ndarray` buffers.
//! Parameters live in a [`parameters::ParameterStore`] that is passed by reference
//! into the pipeline in [`models::LeNet5`].
use ndarray::{Array1, Array2, Array3};

pub mod activation_functions;
pub mod architecture;
pub mod config;
pub mod connectivity;
pub mod convolutions;
pub mod fully_connected;
pub mod labels;
pub mod models;
pub mod network_errors;
pub mod parameters;
pub mod pooling;
pub mod render;

pub type WeightPrecision = f64;
pub type ImagePrecision = f64;

pub type Tensor1D = Array1<ImagePrecision>;
pub type Tensor2D = Array2<ImagePrecision>;
pub type Tensor3D = Array3<ImagePrecision>;

/// Ordered feature maps of one stage, laid out as (map, width, height).
/// The index along the first axis is the identity of the feature map.
pub type FeatureMaps = Array3<ImagePrecision>;
