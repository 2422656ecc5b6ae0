//! Trainable subsampling, as used by the S2 and S4 stages.
//!
//! Every feature map has its own scale and bias. The window sum is either averaged
//! or kept raw, depending on the [`PoolingMode`].
use crate::{
    activation_functions::sigmoid,
    network_errors::{NetworkError, NetworkResult},
    FeatureMaps, ImagePrecision, WeightPrecision,
};
use ndarray::*;
use serde_derive::{Deserialize, Serialize};
use std::str::FromStr;

/// How the values under a pooling window are combined before the affine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolingMode {
    /// Divide the window sum by the window area (true averaging).
    Average,
    /// Use the raw window sum.
    Sum,
    /// Raw window sum, with the result of the affine step squashed by a sigmoid.
    SumSigmoid,
}

impl Default for PoolingMode {
    fn default() -> Self {
        PoolingMode::Average
    }
}

impl FromStr for PoolingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "average" => Ok(PoolingMode::Average),
            "sum" => Ok(PoolingMode::Sum),
            "sum-sigmoid" => Ok(PoolingMode::SumSigmoid),
            _ => Err(format!(
                "Unknown pooling mode {}, expected average, sum or sum-sigmoid",
                s
            )),
        }
    }
}

/// Pools every feature map independently.
///
/// For map `m` and output cell (i, j) the `pool_width x pool_height` window at
/// (i * stride, j * stride) is summed, optionally averaged, multiplied by
/// `weights[m]` and shifted by `biases[m]`.
///
/// The output maps have shape ((width - pool_width) / stride + 1, analogous for the height),
/// which is (width / pool_width, height / pool_height) when the stride equals the window.
pub fn pool<'a, M>(
    maps: M,
    weights: &Array1<WeightPrecision>,
    biases: &Array1<WeightPrecision>,
    pool_width: usize,
    pool_height: usize,
    stride: usize,
    mode: PoolingMode,
) -> NetworkResult<FeatureMaps>
where
    M: AsArray<'a, ImagePrecision, Ix3>,
{
    let maps: ArrayView3<ImagePrecision> = maps.into();
    let (num_maps, width, height) = maps.dim();

    for params in &[weights, biases] {
        if params.len() != num_maps {
            return Err(NetworkError::LengthMismatch {
                expected: num_maps,
                actual: params.len(),
            });
        }
    }
    if stride == 0 {
        return Err(NetworkError::ZeroStride);
    }
    if pool_width == 0 || pool_height == 0 {
        return Err(NetworkError::EmptyFilter((pool_width, pool_height)));
    }
    if pool_width > width || pool_height > height {
        return Err(NetworkError::FilterTooLarge {
            matrix: (width, height),
            filter: (pool_width, pool_height),
        });
    }

    let new_width = (width - pool_width) / stride + 1;
    let new_height = (height - pool_height) / stride + 1;
    let area = (pool_width * pool_height) as ImagePrecision;

    let mut output = Array::zeros((num_maps, new_width, new_height));
    for m in 0..num_maps {
        let map = maps.index_axis(Axis(0), m);
        for i in 0..new_width {
            for j in 0..new_height {
                let window_sum: ImagePrecision = map
                    .slice(s![
                        i * stride..i * stride + pool_width,
                        j * stride..j * stride + pool_height
                    ])
                    .sum();
                output[[m, i, j]] = match mode {
                    PoolingMode::Average => (window_sum / area) * weights[m] + biases[m],
                    PoolingMode::Sum => window_sum * weights[m] + biases[m],
                    PoolingMode::SumSigmoid => sigmoid(window_sum * weights[m] + biases[m]),
                };
            }
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode() {
        assert_eq!("sum-sigmoid".parse::<PoolingMode>(), Ok(PoolingMode::SumSigmoid));
        assert_eq!("average".parse::<PoolingMode>(), Ok(PoolingMode::Average));
        assert!("max".parse::<PoolingMode>().is_err());
    }

    fn fixture() -> FeatureMaps {
        array![[[2., 2., 7., 3.], [9., 4., 6., 1.], [8., 5., 2., 4.], [3., 1., 2., 6.]]]
    }

    #[test]
    fn test_average_pooling() {
        let pooled = pool(
            &fixture(),
            &array![1.],
            &array![1.],
            2,
            2,
            2,
            PoolingMode::Average,
        )
        .unwrap();
        assert_eq!(pooled, array![[[5.25, 5.25], [5.25, 4.5]]]);
    }

    #[test]
    fn test_sum_pooling() {
        let pooled = pool(&fixture(), &array![1.], &array![0.], 2, 2, 2, PoolingMode::Sum).unwrap();
        assert_eq!(pooled, array![[[17., 17.], [17., 14.]]]);
    }

    #[test]
    fn test_sum_is_scaled_average() {
        let maps: FeatureMaps =
            Array::from_shape_fn((3, 6, 6), |(m, x, y)| (m * 11 + x * 5 + y) as f64 * 0.25);
        let weights = array![1., 1., 1.];
        let biases = array![0., 0., 0.];
        let summed = pool(&maps, &weights, &biases, 2, 2, 2, PoolingMode::Sum).unwrap();
        let averaged = pool(&maps, &weights, &biases, 2, 2, 2, PoolingMode::Average).unwrap();
        assert_eq!(summed.dim(), (3, 3, 3));
        assert_eq!(summed, averaged * 4.);
    }

    #[test]
    fn test_sum_sigmoid_pooling() {
        let pooled = pool(
            &fixture(),
            &array![0.5],
            &array![-8.],
            2,
            2,
            2,
            PoolingMode::SumSigmoid,
        )
        .unwrap();
        assert_eq!(pooled[[0, 0, 0]], sigmoid(0.5));
        assert_eq!(pooled[[0, 1, 1]], sigmoid(-1.));
    }

    #[test]
    fn test_per_map_weights() {
        let maps: FeatureMaps = Array::ones((2, 4, 4));
        let pooled = pool(
            &maps,
            &array![2., -1.],
            &array![0., 3.],
            2,
            2,
            2,
            PoolingMode::Average,
        )
        .unwrap();
        assert_eq!(pooled.index_axis(Axis(0), 0), Array::from_elem((2, 2), 2.));
        assert_eq!(pooled.index_axis(Axis(0), 1), Array::from_elem((2, 2), 2.));
    }

    #[test]
    fn test_output_shape_floors() {
        let maps: FeatureMaps = Array::zeros((1, 5, 7));
        let pooled = pool(&maps, &array![1.], &array![0.], 2, 2, 2, PoolingMode::Average).unwrap();
        assert_eq!(pooled.dim(), (1, 2, 3));
    }

    #[test]
    fn test_parameter_count_mismatch() {
        assert_eq!(
            pool(
                &fixture(),
                &array![1., 1.],
                &array![1.],
                2,
                2,
                2,
                PoolingMode::Average
            ),
            Err(NetworkError::LengthMismatch {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn test_window_larger_than_map() {
        assert_eq!(
            pool(&fixture(), &array![1.], &array![1.], 5, 2, 2, PoolingMode::Sum),
            Err(NetworkError::FilterTooLarge {
                matrix: (4, 4),
                filter: (5, 2)
            })
        );
    }
}
