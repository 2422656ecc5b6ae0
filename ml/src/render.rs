//! Sink for intermediate tensors of the pipeline, e.g. for drawing feature maps.
//!
//! The network only pushes data into a [`Renderer`]; nothing flows back.
use crate::ImagePrecision;
use ndarray::ArrayViewD;

/// Receives a tensor together with a label naming where it came from.
/// Values are expected roughly in `[0, 1]`; scaling to pixels is up to the implementor.
pub trait Renderer {
    fn render(&mut self, tensor: ArrayViewD<'_, ImagePrecision>, label: &str);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _tensor: ArrayViewD<'_, ImagePrecision>, _label: &str) {}
}

/// Keeps an owned copy of everything rendered, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    pub rendered: Vec<(String, ndarray::ArrayD<ImagePrecision>)>,
}

impl RecordingRenderer {
    pub fn labels(&self) -> Vec<&str> {
        self.rendered.iter().map(|(label, _)| label.as_str()).collect()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, tensor: ArrayViewD<'_, ImagePrecision>, label: &str) {
        self.rendered.push((label.to_string(), tensor.to_owned()));
    }
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn render(&mut self, tensor: ArrayViewD<'_, ImagePrecision>, label: &str) {
        (**self).render(tensor, label)
    }
}
