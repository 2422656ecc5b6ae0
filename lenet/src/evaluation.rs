use crate::dataset::Dataset;
use log::info;
use ml::{
    models::Model,
    network_errors::{NetworkError, NetworkResult},
};
use ndarray::*;
use std::fmt::Display;

/// Log progress every this many examples.
const PROGRESS_INTERVAL: usize = 1000;

/// Outcome of classifying a set of labelled images.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub correct: usize,
    pub total: usize,
    /// Rows are the true labels, columns the predictions.
    pub confusion: Array2<usize>,
}

impl Evaluation {
    pub fn new(class_count: usize) -> Evaluation {
        Evaluation {
            correct: 0,
            total: 0,
            confusion: Array::zeros((class_count, class_count)),
        }
    }

    pub fn class_count(&self) -> usize {
        self.confusion.nrows()
    }

    /// Counts one prediction. Fails if either class is outside the matrix.
    pub fn record(&mut self, label: i64, predicted: usize) -> NetworkResult<()> {
        let class_count = self.class_count();
        if label < 0 || label as usize >= class_count {
            return Err(NetworkError::LabelOutOfRange { label, class_count });
        }
        if predicted >= class_count {
            return Err(NetworkError::LabelOutOfRange {
                label: predicted as i64,
                class_count,
            });
        }
        let label = label as usize;
        self.confusion[[label, predicted]] += 1;
        self.total += 1;
        if label == predicted {
            self.correct += 1;
        }
        Ok(())
    }

    /// Share of correct predictions, 0 if nothing was recorded.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    /// Classifies every image of the dataset in order.
    pub fn run<M: Model>(
        model: &M,
        dataset: &Dataset,
        class_count: usize,
    ) -> NetworkResult<Evaluation> {
        let mut evaluation = Evaluation::new(class_count);
        for (index, (image, label)) in dataset.iter().enumerate() {
            evaluation.record(label, model.predict(image)?)?;
            if (index + 1) % PROGRESS_INTERVAL == 0 {
                info!(
                    "Evaluated {}/{} images, accuracy so far {:.4}",
                    index + 1,
                    dataset.len(),
                    evaluation.accuracy()
                );
            }
        }
        Ok(evaluation)
    }
}

impl Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Accuracy: {:.2}% ({}/{})",
            self.accuracy() * 100.,
            self.correct,
            self.total
        )?;
        write!(f, "Confusion matrix (rows: label, columns: prediction):")?;
        for row in self.confusion.outer_iter() {
            writeln!(f)?;
            for count in row.iter() {
                write!(f, "{:>6}", count)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml::{config::NetworkConfig, models::LeNet5, Tensor1D, Tensor2D};

    #[test]
    fn test_record() {
        let mut evaluation = Evaluation::new(3);
        evaluation.record(0, 0).unwrap();
        evaluation.record(1, 2).unwrap();
        evaluation.record(2, 2).unwrap();
        evaluation.record(2, 2).unwrap();
        assert_eq!(evaluation.total, 4);
        assert_eq!(evaluation.correct, 3);
        assert_eq!(evaluation.accuracy(), 0.75);
        assert_eq!(
            evaluation.confusion,
            array![[1, 0, 0], [0, 0, 1], [0, 0, 2]]
        );
        assert!(evaluation.record(3, 0).is_err());
        assert!(evaluation.record(-1, 0).is_err());
        assert!(evaluation.record(0, 3).is_err());
        assert_eq!(evaluation.total, 4);
    }

    #[test]
    fn test_empty_accuracy() {
        assert_eq!(Evaluation::new(10).accuracy(), 0.);
    }

    #[test]
    fn test_display() {
        let mut evaluation = Evaluation::new(2);
        evaluation.record(0, 0).unwrap();
        evaluation.record(1, 0).unwrap();
        let text = evaluation.to_string();
        assert_eq!(
            text,
            "Accuracy: 50.00% (1/2)\n\
             Confusion matrix (rows: label, columns: prediction):\n     \
             1     0\n     1     0"
        );
    }

    struct Constant(usize);

    impl Model for Constant {
        fn forward_pass(&self, _input: &Tensor2D) -> NetworkResult<Tensor1D> {
            Ok(Tensor1D::zeros(10))
        }

        fn predict(&self, _input: &Tensor2D) -> NetworkResult<usize> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_run() {
        let images = vec![Tensor2D::zeros((28, 28)); 3];
        let dataset = Dataset::new(images, vec![4, 7, 4]).unwrap();
        let evaluation = Evaluation::run(&Constant(4), &dataset, 10).unwrap();
        assert_eq!(evaluation.correct, 2);
        assert_eq!(evaluation.confusion[[7, 4]], 1);

        // equal scores everywhere, so the first class wins
        let network = LeNet5::demonstration(NetworkConfig::demonstration());
        let evaluation = Evaluation::run(&network, &dataset, 10).unwrap();
        assert_eq!(evaluation.confusion.column(0).sum(), 3);
    }
}
