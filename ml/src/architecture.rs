//! Fixed shape constants of the LeNet-5 topology.
//!
//! Every feature map is square, so a single size describes both width and height.
use std::fmt::Display;

/// Width and height of the images supplied by the dataset.
pub const INPUT_SIZE: usize = 28;
/// The classic topology pads the input to 32x32. Such images are accepted as-is.
pub const PADDED_INPUT_SIZE: usize = 32;
/// Width and height of every convolution filter.
pub const FILTER_SIZE: usize = 5;
/// Window and stride of both pooling stages.
pub const POOL_SIZE: usize = 2;
pub const POOL_STRIDE: usize = 2;

pub const C1_MAPS: usize = 6;
pub const C1_SIZE: usize = 28;
pub const S2_MAPS: usize = 6;
pub const S2_SIZE: usize = 14;
pub const C3_MAPS: usize = 16;
pub const C3_SIZE: usize = 10;
pub const S4_MAPS: usize = 16;
pub const S4_SIZE: usize = 5;
pub const C5_UNITS: usize = 120;
pub const F6_UNITS: usize = 84;
pub const OUTPUT_CLASSES: usize = 10;

/// The stages of the forward pass, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    C1,
    S2,
    C3,
    S4,
    C5,
    F6,
    Output,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::C1,
        Stage::S2,
        Stage::C3,
        Stage::S4,
        Stage::C5,
        Stage::F6,
        Stage::Output,
    ];

    /// Number of feature maps (or units, for the vector stages) this stage produces.
    pub fn output_count(&self) -> usize {
        match self {
            Stage::C1 => C1_MAPS,
            Stage::S2 => S2_MAPS,
            Stage::C3 => C3_MAPS,
            Stage::S4 => S4_MAPS,
            Stage::C5 => C5_UNITS,
            Stage::F6 => F6_UNITS,
            Stage::Output => OUTPUT_CLASSES,
        }
    }

    /// Side length of the produced feature maps, `None` for the vector stages.
    pub fn map_size(&self) -> Option<usize> {
        match self {
            Stage::C1 => Some(C1_SIZE),
            Stage::S2 => Some(S2_SIZE),
            Stage::C3 => Some(C3_SIZE),
            Stage::S4 => Some(S4_SIZE),
            Stage::C5 | Stage::F6 | Stage::Output => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::C1 => "c1",
            Stage::S2 => "s2",
            Stage::C3 => "c3",
            Stage::S4 => "s4",
            Stage::C5 => "c5",
            Stage::F6 => "f6",
            Stage::Output => "output",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name().to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_sizes_chain() {
        // valid convolution and pooling arithmetic has to agree with the constants
        assert_eq!(C1_SIZE, PADDED_INPUT_SIZE - FILTER_SIZE + 1);
        assert_eq!(S2_SIZE, (C1_SIZE - POOL_SIZE) / POOL_STRIDE + 1);
        assert_eq!(C3_SIZE, S2_SIZE - FILTER_SIZE + 1);
        assert_eq!(S4_SIZE, (C3_SIZE - POOL_SIZE) / POOL_STRIDE + 1);
        assert_eq!(S4_SIZE, FILTER_SIZE);
        assert_eq!(S2_MAPS, C1_MAPS);
        assert_eq!(S4_MAPS, C3_MAPS);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::C3.to_string(), "C3");
        assert_eq!(Stage::Output.to_string(), "OUTPUT");
        assert_eq!(Stage::ALL.len(), 7);
        assert_eq!(Stage::F6.map_size(), None);
        assert_eq!(Stage::S4.output_count(), 16);
    }
}
