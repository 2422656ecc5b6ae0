//! Reading of handwritten digit datasets in the IDX format (as distributed for MNIST).
//!
//! Image files start with the magic number 2051 followed by the number of images, rows
//! and columns, label files with 2049 and the number of labels. All header fields are
//! big-endian u32, the payload is one byte per pixel or label.
//! Files ending in `.gz` are decompressed on the fly.
use flate2::read::GzDecoder;
use log::info;
use ml::{ImagePrecision, Tensor2D};
use ndarray::{s, Array};
use std::{
    fs::File,
    io::{self, Read},
    path::Path,
};
use thiserror::Error;

pub const IMAGE_MAGIC: u32 = 2051;
pub const LABEL_MAGIC: u32 = 2049;

type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset file not readable. Filesystem reported error\n {0}.")]
    DatasetFileNotFoundError(#[from] io::Error),
    #[error("Wrong magic number {actual} in IDX header, expected {expected}.")]
    MagicNumberError { expected: u32, actual: u32 },
    #[error("IDX file truncated: expected {expected} bytes, got {actual}.")]
    TruncatedError { expected: usize, actual: usize },
    #[error("IDX header declares {count} items of {rows}x{cols}, which does not fit in memory.")]
    HeaderSizeError { count: usize, rows: usize, cols: usize },
    #[error("Got {images} images but {labels} labels.")]
    CountMismatchError { images: usize, labels: usize },
    #[error("No data available.")]
    Empty,
}

fn read_u32(bytes: &[u8], offset: usize) -> DatasetResult<u32> {
    match bytes.get(offset..offset + 4) {
        Some(b) => Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]])),
        None => Err(DatasetError::TruncatedError {
            expected: offset + 4,
            actual: bytes.len(),
        }),
    }
}

fn check_magic(bytes: &[u8], expected: u32) -> DatasetResult<()> {
    let actual = read_u32(bytes, 0)?;
    if actual != expected {
        return Err(DatasetError::MagicNumberError { expected, actual });
    }
    Ok(())
}

fn payload(bytes: &[u8], header: usize, length: usize) -> DatasetResult<&[u8]> {
    let end = header.checked_add(length).unwrap_or(usize::MAX);
    bytes.get(header..end).ok_or(DatasetError::TruncatedError {
        expected: end,
        actual: bytes.len(),
    })
}

/// Parses an IDX image file. Pixels are scaled to [0, 1], every image is laid out as
/// (width, height). At most `limit` images are read.
pub fn parse_images(bytes: &[u8], limit: Option<usize>) -> DatasetResult<Vec<Tensor2D>> {
    check_magic(bytes, IMAGE_MAGIC)?;
    let count = read_u32(bytes, 4)? as usize;
    let rows = read_u32(bytes, 8)? as usize;
    let cols = read_u32(bytes, 12)? as usize;
    let count = limit.map_or(count, |limit| count.min(limit));

    let (image_size, length) = match rows
        .checked_mul(cols)
        .and_then(|size| Some((size, size.checked_mul(count)?)))
    {
        Some(sizes) => sizes,
        None => return Err(DatasetError::HeaderSizeError { count, rows, cols }),
    };
    let pixels = payload(bytes, 16, length)?;
    // rows * cols == 0 would make chunks() panic
    if image_size == 0 {
        return Ok(Vec::new());
    }
    Ok(pixels
        .chunks(image_size)
        .map(|image| {
            Array::from_shape_fn((cols, rows), |(x, y)| {
                image[y * cols + x] as ImagePrecision / 255.0
            })
        })
        .collect())
}

/// Parses an IDX label file. At most `limit` labels are read.
pub fn parse_labels(bytes: &[u8], limit: Option<usize>) -> DatasetResult<Vec<i64>> {
    check_magic(bytes, LABEL_MAGIC)?;
    let count = read_u32(bytes, 4)? as usize;
    let count = limit.map_or(count, |limit| count.min(limit));
    Ok(payload(bytes, 8, count)?.iter().map(|&l| l as i64).collect())
}

/// Reads the whole file, decompressing it if it ends in `.gz`.
pub fn read_file<P: AsRef<Path>>(path: P) -> DatasetResult<Vec<u8>> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    if path.extension().map_or(false, |ext| ext == "gz") {
        GzDecoder::new(file).read_to_end(&mut bytes)?;
    } else {
        file.read_to_end(&mut bytes)?;
    }
    Ok(bytes)
}

/// Images and their labels, indexed in parallel.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub images: Vec<Tensor2D>,
    pub labels: Vec<i64>,
}

impl Dataset {
    /// Fails if the counts differ or there is no example at all.
    pub fn new(images: Vec<Tensor2D>, labels: Vec<i64>) -> DatasetResult<Dataset> {
        if images.len() != labels.len() {
            return Err(DatasetError::CountMismatchError {
                images: images.len(),
                labels: labels.len(),
            });
        }
        if images.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(Dataset { images, labels })
    }

    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        images: P,
        labels: Q,
        limit: Option<usize>,
    ) -> DatasetResult<Dataset> {
        let images = parse_images(&read_file(images)?, limit)?;
        let labels = parse_labels(&read_file(labels)?, limit)?;
        info!("Loaded {} images and {} labels", images.len(), labels.len());
        Dataset::new(images, labels)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tensor2D, i64)> + '_ {
        self.images.iter().zip(self.labels.iter().copied())
    }
}

/// Centres the image inside a zero border, so that the result is at least
/// `size` x `size`. An odd border puts the extra row/column behind the image.
pub fn pad_image(image: &Tensor2D, size: usize) -> Tensor2D {
    let (width, height) = image.dim();
    let (padded_width, padded_height) = (size.max(width), size.max(height));
    let (x0, y0) = ((padded_width - width) / 2, (padded_height - height) / 2);

    let mut padded = Tensor2D::zeros((padded_width, padded_height));
    padded
        .slice_mut(s![x0..x0 + width, y0..y0 + height])
        .assign(image);
    padded
}
