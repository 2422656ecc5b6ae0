//! Conversion between class labels and the vectors the network produces.
use crate::{
    fully_connected::ScoringMode,
    network_errors::{NetworkError, NetworkResult},
    ImagePrecision, Tensor1D,
};
use ndarray::*;

/// One-hot encoding of `label` over `class_count` classes.
pub fn encode(label: i64, class_count: usize) -> NetworkResult<Tensor1D> {
    if label < 0 || label as u64 >= class_count as u64 {
        return Err(NetworkError::LabelOutOfRange { label, class_count });
    }
    let mut one_hot = Array::zeros(class_count);
    one_hot[label as usize] = 1.0;
    Ok(one_hot)
}

/// Picks the class the scores point to: the lowest score for distance scoring,
/// the highest for linear scoring. Ties go to the lower index.
pub fn decode<'a, V>(scores: V, mode: ScoringMode) -> NetworkResult<usize>
where
    V: AsArray<'a, ImagePrecision, Ix1>,
{
    let scores: ArrayView1<ImagePrecision> = scores.into();
    match mode {
        ScoringMode::Distance => best_index(&scores, |candidate, best| candidate < best),
        ScoringMode::Linear => best_index(&scores, |candidate, best| candidate > best),
    }
}

/// Inverse of [`encode`].
pub fn decode_one_hot<'a, V>(one_hot: V) -> NetworkResult<usize>
where
    V: AsArray<'a, ImagePrecision, Ix1>,
{
    decode(one_hot, ScoringMode::Linear)
}

fn best_index<F>(scores: &ArrayView1<ImagePrecision>, better: F) -> NetworkResult<usize>
where
    F: Fn(ImagePrecision, ImagePrecision) -> bool,
{
    let mut best: Option<(usize, ImagePrecision)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            return Err(NetworkError::NonFiniteScore(i));
        }
        match best {
            Some((_, best_score)) if !better(score, best_score) => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i).ok_or(NetworkError::EmptyScores)
}

/// Fixes the class count once so labels can be converted without repeating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelCodec {
    class_count: usize,
    mode: ScoringMode,
}

impl LabelCodec {
    pub fn new(class_count: usize, mode: ScoringMode) -> LabelCodec {
        LabelCodec { class_count, mode }
    }

    pub fn class_count(&self) -> usize {
        self.class_count
    }

    pub fn encode(&self, label: i64) -> NetworkResult<Tensor1D> {
        encode(label, self.class_count)
    }

    /// Decodes network scores, checking they cover every class.
    pub fn decode<'a, V>(&self, scores: V) -> NetworkResult<usize>
    where
        V: AsArray<'a, ImagePrecision, Ix1>,
    {
        let scores: ArrayView1<ImagePrecision> = scores.into();
        if scores.len() != self.class_count {
            return Err(NetworkError::LengthMismatch {
                expected: self.class_count,
                actual: scores.len(),
            });
        }
        decode(scores, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode(2, 4).unwrap(), array![0., 0., 1., 0.]);
        assert_eq!(encode(0, 1).unwrap(), array![1.]);
    }

    #[test]
    fn test_encode_out_of_range() {
        assert_eq!(
            encode(10, 10),
            Err(NetworkError::LabelOutOfRange {
                label: 10,
                class_count: 10
            })
        );
        assert_eq!(
            encode(-1, 10),
            Err(NetworkError::LabelOutOfRange {
                label: -1,
                class_count: 10
            })
        );
        assert!(encode(0, 0).is_err());
    }

    #[test]
    fn test_round_trip() {
        for label in 0..10 {
            let one_hot = encode(label, 10).unwrap();
            let decoded = decode_one_hot(&one_hot).unwrap();
            assert_eq!(decoded, label as usize);
            assert_eq!(encode(decoded as i64, 10).unwrap(), one_hot);
        }
    }

    #[test]
    fn test_decode_by_mode() {
        let scores = array![3., -1., 7., 0.5];
        assert_eq!(decode(&scores, ScoringMode::Distance).unwrap(), 1);
        assert_eq!(decode(&scores, ScoringMode::Linear).unwrap(), 2);
    }

    #[test]
    fn test_decode_ties_pick_first() {
        let scores = array![2., 1., 1., 2.];
        assert_eq!(decode(&scores, ScoringMode::Distance).unwrap(), 1);
        assert_eq!(decode(&scores, ScoringMode::Linear).unwrap(), 0);
    }

    #[test]
    fn test_decode_invalid_scores() {
        let empty: Tensor1D = array![];
        assert_eq!(
            decode(&empty, ScoringMode::Distance),
            Err(NetworkError::EmptyScores)
        );
        assert_eq!(
            decode(&array![0., f64::NAN], ScoringMode::Linear),
            Err(NetworkError::NonFiniteScore(1))
        );
    }

    #[test]
    fn test_codec() {
        let codec = LabelCodec::new(3, ScoringMode::Distance);
        assert_eq!(codec.encode(1).unwrap(), array![0., 1., 0.]);
        assert_eq!(codec.decode(&array![4., 2., 3.]).unwrap(), 1);
        assert_eq!(
            codec.decode(&array![4., 2.]),
            Err(NetworkError::LengthMismatch {
                expected: 3,
                actual: 2
            })
        );
    }
}
