use crate::to_pixel;
use image::{GrayImage, Luma};
use log::{debug, warn};
use ml::{render::Renderer, ImagePrecision};
use ndarray::{Array1, Array2, ArrayViewD, Axis, Ix2};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Side length in pixels of the block drawn for a single value.
pub const DEFAULT_SCALE: u32 = 16;

/// Writes every rendered tensor as `<dir>/<label>.png`.
///
/// Values are clamped to [0, 1] and drawn dark on light (1.0 is black), each value as a
/// square block. Vectors become a single row.
#[derive(Debug, Clone)]
pub struct PngRenderer {
    dir: PathBuf,
    scale: u32,
}

impl PngRenderer {
    pub fn new<P: Into<PathBuf>>(dir: P) -> io::Result<PngRenderer> {
        PngRenderer::with_scale(dir, DEFAULT_SCALE)
    }

    /// Creates the output directory if needed. A scale of 0 is treated as 1.
    pub fn with_scale<P: Into<PathBuf>>(dir: P, scale: u32) -> io::Result<PngRenderer> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(PngRenderer {
            dir,
            scale: scale.max(1),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{}.png", label))
    }

    /// Draws a 1-D or 2-D tensor, `None` for any other dimensionality.
    pub fn draw(&self, tensor: ArrayViewD<'_, ImagePrecision>) -> Option<GrayImage> {
        let grid: Array2<ImagePrecision> = match tensor.ndim() {
            1 => tensor
                .iter()
                .cloned()
                .collect::<Array1<_>>()
                .insert_axis(Axis(1)),
            2 => tensor.into_dimensionality::<Ix2>().ok()?.to_owned(),
            _ => return None,
        };
        let (width, height) = grid.dim();
        let scale = self.scale;
        Some(GrayImage::from_fn(
            width as u32 * scale,
            height as u32 * scale,
            |x, y| {
                let value = grid[[(x / scale) as usize, (y / scale) as usize]];
                Luma([255 - to_pixel(value)])
            },
        ))
    }
}

impl Renderer for PngRenderer {
    fn render(&mut self, tensor: ArrayViewD<'_, ImagePrecision>, label: &str) {
        let ndim = tensor.ndim();
        let image = match self.draw(tensor) {
            Some(image) => image,
            None => {
                warn!("Cannot draw {} with {} dimensions", label, ndim);
                return;
            }
        };
        let path = self.path_for(label);
        match image.save(&path) {
            Ok(()) => debug!("Wrote {}", path.display()),
            Err(e) => warn!("Could not write {}: {}", path.display(), e),
        }
    }
}
