//! Plain 2d convolutions on single matrices.
//!
//! Matrices are indexed as `[[x, y]]`, with the width along axis 0 and the height
//! along axis 1. A filter is applied without flipping (cross-correlation), which is
//! what convolutional networks conventionally call a convolution.
use crate::{
    network_errors::{NetworkError, NetworkResult},
    ImagePrecision, Tensor2D,
};
use ndarray::*;

/// Sum of the elementwise product of the filter with the window of the matrix
/// whose top left corner is (x, y). Callers have checked that the window fits.
fn window_sum(
    matrix: &ArrayView2<ImagePrecision>,
    filter: &ArrayView2<ImagePrecision>,
    x: usize,
    y: usize,
) -> ImagePrecision {
    let (filter_width, filter_height) = filter.dim();
    let window = matrix.slice(s![x..x + filter_width, y..y + filter_height]);
    window
        .iter()
        .zip(filter.iter())
        .map(|(m, f)| m * f)
        .sum()
}

fn check_filter(
    matrix: &ArrayView2<ImagePrecision>,
    filter: &ArrayView2<ImagePrecision>,
) -> NetworkResult<()> {
    let (filter_width, filter_height) = filter.dim();
    if filter_width == 0 || filter_height == 0 {
        return Err(NetworkError::EmptyFilter(filter.dim()));
    }
    if filter_width > matrix.len_of(Axis(0)) || filter_height > matrix.len_of(Axis(1)) {
        return Err(NetworkError::FilterTooLarge {
            matrix: matrix.dim(),
            filter: filter.dim(),
        });
    }
    Ok(())
}

/// Computes a single output pixel of a convolution:
/// the sum over all filter offsets (i, j) of `matrix[x + i][y + j] * filter[i][j]`.
///
/// Fails if the filter placed at (x, y) reaches past the matrix.
pub fn convolve_pixel<'a, M, F>(
    matrix: M,
    filter: F,
    x: usize,
    y: usize,
) -> NetworkResult<ImagePrecision>
where
    // This trait bound ensures that matrix and filter can be passed as owned array or view.
    // AsArray just ensures that they can be converted to an array view via ".into()".
    // Read more here: https://docs.rs/ndarray/0.12.1/ndarray/trait.AsArray.html
    M: AsArray<'a, ImagePrecision, Ix2>,
    F: AsArray<'a, ImagePrecision, Ix2>,
{
    let matrix: ArrayView2<ImagePrecision> = matrix.into();
    let filter: ArrayView2<ImagePrecision> = filter.into();
    let (filter_width, filter_height) = filter.dim();

    if x + filter_width > matrix.len_of(Axis(0)) || y + filter_height > matrix.len_of(Axis(1)) {
        return Err(NetworkError::FilterOutOfBounds {
            matrix: matrix.dim(),
            filter: filter.dim(),
            x,
            y,
        });
    }
    Ok(window_sum(&matrix, &filter, x, y))
}

/// Valid-mode convolution, the filter is only placed where it fully overlaps the matrix.
/// Output has shape (matrix width - filter width + 1, matrix height - filter height + 1).
pub fn convolve<'a, M, F>(matrix: M, filter: F) -> NetworkResult<Tensor2D>
where
    M: AsArray<'a, ImagePrecision, Ix2>,
    F: AsArray<'a, ImagePrecision, Ix2>,
{
    convolve_strided(matrix, filter, 1, 1)
}

/// Valid-mode convolution that only samples every `stride_x`-th column and
/// `stride_y`-th row. Output has shape
/// ((matrix width - filter width + stride_x) / stride_x, analogous for the height).
pub fn convolve_strided<'a, M, F>(
    matrix: M,
    filter: F,
    stride_x: usize,
    stride_y: usize,
) -> NetworkResult<Tensor2D>
where
    M: AsArray<'a, ImagePrecision, Ix2>,
    F: AsArray<'a, ImagePrecision, Ix2>,
{
    let matrix: ArrayView2<ImagePrecision> = matrix.into();
    let filter: ArrayView2<ImagePrecision> = filter.into();
    if stride_x == 0 || stride_y == 0 {
        return Err(NetworkError::ZeroStride);
    }
    check_filter(&matrix, &filter)?;

    let (im_width, im_height) = matrix.dim();
    let (filter_width, filter_height) = filter.dim();
    let new_im_width = (im_width - filter_width + stride_x) / stride_x;
    let new_im_height = (im_height - filter_height + stride_y) / stride_y;

    let mut ret = Array::zeros((new_im_width, new_im_height));
    for i in 0..new_im_width {
        for j in 0..new_im_height {
            ret[[i, j]] = window_sum(&matrix, &filter, i * stride_x, j * stride_y);
        }
    }
    Ok(ret)
}

/// Zero-pads the matrix so that a valid-mode convolution with the filter yields
/// exactly `output_width x output_height`, then adds the bias to every output cell.
///
/// The padding in front of each axis is `(output - matrix + filter - 1) / 2`. For an odd
/// total the remaining row/column of zeros ends up behind the matrix, so the image
/// sits one pixel closer to the top left corner.
pub fn convolve_padded<'a, M, F>(
    matrix: M,
    filter: F,
    bias: ImagePrecision,
    output_width: usize,
    output_height: usize,
) -> NetworkResult<Tensor2D>
where
    M: AsArray<'a, ImagePrecision, Ix2>,
    F: AsArray<'a, ImagePrecision, Ix2>,
{
    let matrix: ArrayView2<ImagePrecision> = matrix.into();
    let filter: ArrayView2<ImagePrecision> = filter.into();
    let (im_width, im_height) = matrix.dim();
    let (filter_width, filter_height) = filter.dim();

    if filter_width == 0 || filter_height == 0 {
        return Err(NetworkError::EmptyFilter(filter.dim()));
    }
    let padded_width = output_width + filter_width - 1;
    let padded_height = output_height + filter_height - 1;
    if output_width == 0
        || output_height == 0
        || padded_width < im_width
        || padded_height < im_height
    {
        return Err(NetworkError::PaddingUnderflow {
            matrix: matrix.dim(),
            filter: filter.dim(),
            output: (output_width, output_height),
        });
    }

    let pad_x = (padded_width - im_width) / 2;
    let pad_y = (padded_height - im_height) / 2;
    let mut padded: Tensor2D = Array::zeros((padded_width, padded_height));
    padded
        .slice_mut(s![pad_x..pad_x + im_width, pad_y..pad_y + im_height])
        .assign(&matrix);

    let mut output = convolve(&padded, filter.view())?;
    debug_assert_eq!(output.dim(), (output_width, output_height));
    output.mapv_inplace(|a| a + bias);
    Ok(output)
}
