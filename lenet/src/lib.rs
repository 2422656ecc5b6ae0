//! Everything around the network that touches the outside world:
//! reading datasets and images, writing rendered stages, and scoring a run.
use image::{io::Reader as ImageReader, DynamicImage, GrayImage, Luma};
use ml::{ImagePrecision, Tensor2D};
use ndarray::{ArrayView2, AsArray, Ix2};
use ndarray_npy::{read_npy, ReadNpyError};
use nshare::ToNdarray2;
use std::{ffi::OsStr, path::Path};
use thiserror::Error;

pub mod dataset;
pub mod evaluation;
pub mod render;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image file not readable. Filesystem reported error\n {0}.")]
    ImageFileNotFoundError(#[from] std::io::Error),
    #[error("Image could not be decoded:\n {0}.")]
    ImageDecodeError(#[from] image::ImageError),
    #[error("Array file not readable:\n {0}.")]
    ImageNpyError(#[from] ReadNpyError),
    #[error("Image had unrecognized type {0:?}. Only .jpg, .png and .npy are supported.")]
    ImageFormatError(String),
}

/// Turns a network value into a pixel value, values outside of [0, 1] are clamped.
pub fn to_pixel(x: ImagePrecision) -> u8 {
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Returns the grayscale image as (width, height) array scaled to [0, 1],
/// ready to be put into the network.
pub fn image_to_tensor(img: &DynamicImage) -> Tensor2D {
    // nshare hands out (height, width)
    img.to_luma8()
        .into_ndarray2()
        .reversed_axes()
        .mapv(|x| x as ImagePrecision / 255.0)
}

/// Turns a (width, height) array into a grayscale image, without any inversion.
pub fn tensor_to_image<'a, V>(arr: V) -> GrayImage
where
    V: AsArray<'a, ImagePrecision, Ix2>,
{
    let arr: ArrayView2<ImagePrecision> = arr.into();
    let (width, height) = arr.dim();
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        Luma([to_pixel(arr[[x as usize, y as usize]])])
    })
}

/// Loads an image from a png, jpg or npy file. Arrays from npy files are expected in
/// row-major (height, width) layout, as numpy writes them, and already scaled.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Tensor2D, ImageError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "npy" => {
            let arr: Tensor2D = read_npy(path)?;
            Ok(arr.reversed_axes())
        }
        "png" | "jpg" | "jpeg" => Ok(image_to_tensor(&ImageReader::open(path)?.decode()?)),
        _ => Err(ImageError::ImageFormatError(extension)),
    }
}
