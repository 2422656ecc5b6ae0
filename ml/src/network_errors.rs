use thiserror::Error;

use crate::architecture::Stage;

pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("No training data available to size the network against.")]
    EmptyTrainingSet,
    #[error("Label {label} is out of range for {class_count} classes.")]
    LabelOutOfRange { label: i64, class_count: usize },
    #[error("Parameter {name} has shape {actual:?}, expected {expected:?}.")]
    ParameterShape {
        name: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("Invalid connectivity table: {0}")]
    InvalidConnectivity(String),
    #[error("Filter of shape {filter:?} does not fit into a matrix of shape {matrix:?} at position ({x}, {y}).")]
    FilterOutOfBounds {
        matrix: (usize, usize),
        filter: (usize, usize),
        x: usize,
        y: usize,
    },
    #[error("Filter or window of shape {filter:?} is larger than the input of shape {matrix:?}.")]
    FilterTooLarge {
        matrix: (usize, usize),
        filter: (usize, usize),
    },
    #[error("Filter or window of shape {0:?} is empty.")]
    EmptyFilter((usize, usize)),
    #[error("Stride of 0 passed")]
    ZeroStride,
    #[error("Cannot pad a matrix of shape {matrix:?} down to an output of shape {output:?} with a filter of shape {filter:?}.")]
    PaddingUnderflow {
        matrix: (usize, usize),
        filter: (usize, usize),
        output: (usize, usize),
    },
    #[error("Stage {stage} expected {expected} feature maps, got {actual}.")]
    FeatureMapCount {
        stage: Stage,
        expected: usize,
        actual: usize,
    },
    #[error("Input image has shape {actual:?}, expected one of {expected:?}.")]
    InputShape {
        expected: Vec<(usize, usize)>,
        actual: (usize, usize),
    },
    #[error("Expected {expected} values, got {actual}.")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Cannot decode an empty score vector.")]
    EmptyScores,
    #[error("Score at index {0} is not finite.")]
    NonFiniteScore(usize),
}

impl NetworkError {
    /// Configuration errors abort before any computation happens. Everything else
    /// is a violated precondition of a kernel.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            NetworkError::EmptyTrainingSet
                | NetworkError::LabelOutOfRange { .. }
                | NetworkError::ParameterShape { .. }
                | NetworkError::InvalidConnectivity(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(NetworkError::EmptyTrainingSet.is_configuration_error());
        assert!(NetworkError::LabelOutOfRange {
            label: 10,
            class_count: 10
        }
        .is_configuration_error());
        assert!(!NetworkError::ZeroStride.is_configuration_error());
        assert!(!NetworkError::FilterTooLarge {
            matrix: (2, 2),
            filter: (3, 3)
        }
        .is_configuration_error());
    }

    #[test]
    fn test_error_message() {
        let err = NetworkError::LabelOutOfRange {
            label: -1,
            class_count: 10,
        };
        assert_eq!(err.to_string(), "Label -1 is out of range for 10 classes.");
    }
}
