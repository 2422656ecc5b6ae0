use crate::{
    network_errors::{NetworkError, NetworkResult},
    ImagePrecision, Tensor1D, WeightPrecision,
};
use ndarray::*;
use serde_derive::{Deserialize, Serialize};
use std::str::FromStr;

/// How the output stage turns the F6 activations into one score per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringMode {
    /// Squared euclidean distance between the activations and each class prototype
    /// (radial basis function units). The best class has the lowest score.
    Distance,
    /// Weighted sum of the activations per class. The best class has the highest score.
    Linear,
}

impl Default for ScoringMode {
    fn default() -> Self {
        ScoringMode::Distance
    }
}

impl FromStr for ScoringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "distance" => Ok(ScoringMode::Distance),
            "linear" => Ok(ScoringMode::Linear),
            _ => Err(format!("Unknown scoring mode {}, expected distance or linear", s)),
        }
    }
}

fn check_input_width(
    input: &ArrayView1<ImagePrecision>,
    weights: &ArrayView2<WeightPrecision>,
) -> NetworkResult<()> {
    let expected = weights.len_of(Axis(1));
    if input.len() != expected {
        return Err(NetworkError::LengthMismatch {
            expected,
            actual: input.len(),
        });
    }
    Ok(())
}

/// Fully connected layer. The weight matrix shall have dimension (in that order)
/// output units x input units, the biases one entry per output unit.
pub fn fully_connected<'a, V>(
    input: V,
    weights: &Array2<WeightPrecision>,
    biases: &Array1<WeightPrecision>,
) -> NetworkResult<Tensor1D>
where
    V: AsArray<'a, ImagePrecision, Ix1>,
{
    let input: ArrayView1<ImagePrecision> = input.into();
    check_input_width(&input, &weights.view())?;
    if biases.len() != weights.len_of(Axis(0)) {
        return Err(NetworkError::LengthMismatch {
            expected: weights.len_of(Axis(0)),
            actual: biases.len(),
        });
    }

    Ok(Array::from_iter(
        weights
            .outer_iter()
            .zip(biases.iter())
            .map(|(row, bias)| weighted_sum(&row, &input) + bias),
    ))
}

/// Scores the input against every row of the weight matrix.
pub fn score<'a, V>(
    input: V,
    weights: &Array2<WeightPrecision>,
    mode: ScoringMode,
) -> NetworkResult<Tensor1D>
where
    V: AsArray<'a, ImagePrecision, Ix1>,
{
    let input: ArrayView1<ImagePrecision> = input.into();
    check_input_width(&input, &weights.view())?;

    Ok(Array::from_iter(weights.outer_iter().map(|row| match mode {
        ScoringMode::Distance => squared_distance(&row, &input),
        ScoringMode::Linear => weighted_sum(&row, &input),
    })))
}

fn weighted_sum(
    row: &ArrayView1<WeightPrecision>,
    input: &ArrayView1<ImagePrecision>,
) -> ImagePrecision {
    row.iter().zip(input.iter()).map(|(w, x)| w * x).sum()
}

fn squared_distance(
    prototype: &ArrayView1<WeightPrecision>,
    input: &ArrayView1<ImagePrecision>,
) -> ImagePrecision {
    prototype
        .iter()
        .zip(input.iter())
        .map(|(w, x)| (x - w).powi(2))
        .sum()
}
