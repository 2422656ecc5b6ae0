//! Sparse wiring between the S2 and C3 feature maps.
//!
//! C3 does not see every S2 map. Each destination map convolves a fixed subset of the
//! source maps, every (source, destination) pair with its own filter, and the
//! partial convolutions of one destination are summed before its bias is added.
use std::fmt::Display;

use crate::{
    architecture::{Stage, C3_MAPS, S2_MAPS},
    convolutions::convolve,
    network_errors::{NetworkError, NetworkResult},
    FeatureMaps, ImagePrecision, WeightPrecision,
};
use ndarray::*;

/// One (source, destination) pair of the plan, together with the index of the
/// filter that serves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub destination: usize,
    pub source: usize,
    pub filter: usize,
}

/// Table mapping every destination feature map to the ordered source maps it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityPlan {
    source_count: usize,
    table: Vec<Vec<usize>>,
    /// Index of the first filter of every destination. Filters are stored
    /// destination by destination, in the order of the sources in the table.
    offsets: Vec<usize>,
}

impl ConnectivityPlan {
    /// Builds a plan from an explicit table. Every destination needs a non-empty
    /// list of distinct sources below `source_count`.
    pub fn new(source_count: usize, table: Vec<Vec<usize>>) -> NetworkResult<ConnectivityPlan> {
        if table.is_empty() {
            return Err(NetworkError::InvalidConnectivity(
                "no destination maps".to_string(),
            ));
        }
        for (destination, sources) in table.iter().enumerate() {
            if sources.is_empty() {
                return Err(NetworkError::InvalidConnectivity(format!(
                    "destination {} has no sources",
                    destination
                )));
            }
            for (k, &source) in sources.iter().enumerate() {
                if source >= source_count {
                    return Err(NetworkError::InvalidConnectivity(format!(
                        "destination {} reads source {}, but there are only {} sources",
                        destination, source, source_count
                    )));
                }
                if sources[..k].contains(&source) {
                    return Err(NetworkError::InvalidConnectivity(format!(
                        "destination {} reads source {} twice",
                        destination, source
                    )));
                }
            }
        }
        Ok(ConnectivityPlan::from_valid_table(source_count, table))
    }

    fn from_valid_table(source_count: usize, table: Vec<Vec<usize>>) -> ConnectivityPlan {
        let offsets = table
            .iter()
            .scan(0, |next, sources| {
                let offset = *next;
                *next += sources.len();
                Some(offset)
            })
            .collect();
        ConnectivityPlan {
            source_count,
            table,
            offsets,
        }
    }

    /// The C3 table of LeNet-5:
    ///
    /// ```text
    ///    0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15
    /// 0  X       X X X     X X  X  X     X  X
    /// 1  X X       X X X     X  X  X  X     X
    /// 2  X X X       X X X      X     X  X  X
    /// 3    X X X     X X X X       X     X  X
    /// 4      X X X     X X X X     X  X     X
    /// 5        X X X     X X X  X     X  X  X
    /// ```
    ///
    /// Destinations 0-5 read three consecutive sources, 6-11 four consecutive sources,
    /// 12-14 four sources with a gap and 15 reads all of them, 60 filters in total.
    pub fn lenet5() -> ConnectivityPlan {
        let wrap = |f: usize, offsets: &[usize]| -> Vec<usize> {
            offsets.iter().map(|&o| (f + o) % S2_MAPS).collect()
        };
        let table = (0..C3_MAPS)
            .map(|f| match f {
                0..=5 => wrap(f, &[0, 1, 2]),
                // (f - 6 + k) mod 6 == (f + k) mod 6
                6..=11 => wrap(f, &[0, 1, 2, 3]),
                // f - 12, f - 11, f - 9, f - 8
                12..=14 => wrap(f, &[0, 1, 3, 4]),
                _ => (0..S2_MAPS).collect(),
            })
            .collect();
        ConnectivityPlan::from_valid_table(S2_MAPS, table)
    }

    /// Every destination reads every source.
    pub fn dense(source_count: usize, destination_count: usize) -> NetworkResult<ConnectivityPlan> {
        ConnectivityPlan::new(
            source_count,
            vec![(0..source_count).collect::<Vec<_>>(); destination_count],
        )
    }

    pub fn source_count(&self) -> usize {
        self.source_count
    }

    pub fn destination_count(&self) -> usize {
        self.table.len()
    }

    /// The sources of the given destination, in accumulation order.
    pub fn sources(&self, destination: usize) -> Option<&[usize]> {
        self.table.get(destination).map(Vec::as_slice)
    }

    /// Index of the first filter serving the given destination.
    pub fn filter_offset(&self, destination: usize) -> Option<usize> {
        self.offsets.get(destination).copied()
    }

    /// Every destination with its sources and the index of its first filter.
    pub fn destinations(&self) -> impl Iterator<Item = (usize, &[usize], usize)> + '_ {
        self.table
            .iter()
            .zip(self.offsets.iter())
            .enumerate()
            .map(|(destination, (sources, &offset))| (destination, sources.as_slice(), offset))
    }

    /// Total number of filters, one per (source, destination) pair.
    pub fn filter_count(&self) -> usize {
        self.table.iter().map(Vec::len).sum()
    }

    pub fn is_dense(&self) -> bool {
        self.table.iter().all(|s| s.len() == self.source_count)
    }

    /// Iterates over all connections, destination by destination.
    pub fn connections(&self) -> impl Iterator<Item = Connection> + '_ {
        self.destinations()
            .flat_map(|(destination, sources, offset)| {
                sources
                    .iter()
                    .enumerate()
                    .map(move |(k, &source)| Connection {
                        destination,
                        source,
                        filter: offset + k,
                    })
            })
    }

    pub fn is_connected(&self, source: usize, destination: usize) -> bool {
        self.table
            .get(destination)
            .map_or(false, |sources| sources.contains(&source))
    }
}

impl Display for ConnectivityPlan {
    /// Sources as rows, destinations as columns.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut header = String::from("  ");
        for destination in 0..self.destination_count() {
            header.push_str(&format!("{:>3}", destination));
        }
        writeln!(f, "{}", header)?;
        for source in 0..self.source_count {
            let mut row = format!("{:>2}", source);
            for destination in 0..self.destination_count() {
                let cell = if self.is_connected(source, destination) {
                    "X"
                } else {
                    ""
                };
                row.push_str(&format!("{:>3}", cell));
            }
            writeln!(f, "{}", row.trim_end())?;
        }
        Ok(())
    }
}

/// Convolves the source maps according to the plan. `filters` holds one filter per
/// connection (`plan.filter_count()` in total), `biases` one entry per destination.
/// All filters are applied in valid mode with stride 1.
pub fn sparse_convolve<'a, M>(
    maps: M,
    filters: &Array3<WeightPrecision>,
    biases: &Array1<WeightPrecision>,
    plan: &ConnectivityPlan,
) -> NetworkResult<FeatureMaps>
where
    M: AsArray<'a, ImagePrecision, Ix3>,
{
    let maps: ArrayView3<ImagePrecision> = maps.into();
    let (num_maps, width, height) = maps.dim();
    let (num_filters, filter_width, filter_height) = filters.dim();

    if num_maps != plan.source_count() {
        return Err(NetworkError::FeatureMapCount {
            stage: Stage::C3,
            expected: plan.source_count(),
            actual: num_maps,
        });
    }
    if num_filters != plan.filter_count() {
        return Err(NetworkError::LengthMismatch {
            expected: plan.filter_count(),
            actual: num_filters,
        });
    }
    if biases.len() != plan.destination_count() {
        return Err(NetworkError::LengthMismatch {
            expected: plan.destination_count(),
            actual: biases.len(),
        });
    }
    if filter_width == 0 || filter_height == 0 {
        return Err(NetworkError::EmptyFilter((filter_width, filter_height)));
    }
    if filter_width > width || filter_height > height {
        return Err(NetworkError::FilterTooLarge {
            matrix: (width, height),
            filter: (filter_width, filter_height),
        });
    }

    let mut output = Array::zeros((
        plan.destination_count(),
        width - filter_width + 1,
        height - filter_height + 1,
    ));
    for connection in plan.connections() {
        let convolved = convolve(
            maps.index_axis(Axis(0), connection.source),
            filters.index_axis(Axis(0), connection.filter),
        )?;
        let mut destination = output.index_axis_mut(Axis(0), connection.destination);
        destination += &convolved;
    }
    for (mut destination, &bias) in output.outer_iter_mut().zip(biases.iter()) {
        destination.mapv_inplace(|a| a + bias);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(sources: &[usize]) -> Vec<usize> {
        let mut v = sources.to_vec();
        v.sort_unstable();
        v
    }

    #[test]
    fn test_lenet5_source_counts() {
        let plan = ConnectivityPlan::lenet5();
        let counts: Vec<usize> = (0..16).map(|f| plan.sources(f).unwrap().len()).collect();
        assert_eq!(
            counts,
            vec![3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4, 4, 4, 4, 6]
        );
        assert_eq!(plan.filter_count(), 60);
        assert_eq!(plan.source_count(), 6);
        assert_eq!(plan.destination_count(), 16);
        assert!(!plan.is_dense());
    }

    #[test]
    fn test_lenet5_table() {
        let plan = ConnectivityPlan::lenet5();
        assert_eq!(plan.sources(0), Some(&[0, 1, 2][..]));
        assert_eq!(plan.sources(4), Some(&[4, 5, 0][..]));
        assert_eq!(plan.sources(5), Some(&[5, 0, 1][..]));
        assert_eq!(plan.sources(6), Some(&[0, 1, 2, 3][..]));
        assert_eq!(plan.sources(11), Some(&[5, 0, 1, 2][..]));
        assert_eq!(sorted(plan.sources(12).unwrap()), vec![0, 1, 3, 4]);
        assert_eq!(sorted(plan.sources(13).unwrap()), vec![1, 2, 4, 5]);
        assert_eq!(sorted(plan.sources(14).unwrap()), vec![0, 2, 3, 5]);
        assert_eq!(plan.sources(15), Some(&[0, 1, 2, 3, 4, 5][..]));
    }

    #[test]
    fn test_lenet5_table_is_valid() {
        let plan = ConnectivityPlan::lenet5();
        let table = (0..16).map(|f| plan.sources(f).unwrap().to_vec()).collect();
        assert_eq!(ConnectivityPlan::new(6, table).unwrap(), plan);
    }

    #[test]
    fn test_filter_offsets() {
        let plan = ConnectivityPlan::lenet5();
        assert_eq!(plan.filter_offset(0), Some(0));
        assert_eq!(plan.filter_offset(1), Some(3));
        assert_eq!(plan.filter_offset(6), Some(18));
        assert_eq!(plan.filter_offset(12), Some(42));
        assert_eq!(plan.filter_offset(15), Some(54));
        assert_eq!(plan.filter_offset(16), None);
        assert_eq!(plan.sources(16), None);
        assert!(!plan.is_connected(0, 16));

        let connections: Vec<Connection> = plan.connections().collect();
        assert_eq!(connections.len(), 60);
        assert!(connections.iter().enumerate().all(|(i, c)| c.filter == i));
        assert_eq!(
            connections[59],
            Connection {
                destination: 15,
                source: 5,
                filter: 59
            }
        );
    }

    #[test]
    fn test_invalid_tables() {
        assert!(ConnectivityPlan::new(6, vec![]).is_err());
        assert!(ConnectivityPlan::new(6, vec![vec![0], vec![]]).is_err());
        assert!(ConnectivityPlan::new(6, vec![vec![0, 6]]).is_err());
        assert!(ConnectivityPlan::new(6, vec![vec![1, 2, 1]]).is_err());
        let err = ConnectivityPlan::new(2, vec![vec![0], vec![]]).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_dense_plan() {
        let plan = ConnectivityPlan::dense(6, 16).unwrap();
        assert!(plan.is_dense());
        assert_eq!(plan.filter_count(), 96);
    }

    #[test]
    fn test_display() {
        let rendered = ConnectivityPlan::lenet5().to_string();
        assert_eq!(rendered.lines().count(), 7);
        assert_eq!(rendered.matches('X').count(), 60);
        assert!(rendered.lines().nth(1).unwrap().starts_with(" 0  X"));
    }

    #[test]
    fn test_sparse_convolve() {
        // two 3x3 sources, destination 0 reads source 1, destination 1 reads both
        let plan = ConnectivityPlan::new(2, vec![vec![1], vec![0, 1]]).unwrap();
        let maps = array![
            [[1., 2., 3.], [4., 5., 6.], [7., 8., 9.]],
            [[1., 0., 1.], [0., 1., 0.], [1., 0., 1.]]
        ];
        let filters = array![
            [[1., 0.], [0., 0.]],
            [[1., 1.], [1., 1.]],
            [[0., 0.], [0., 2.]]
        ];
        let biases = array![0.5, -1.];
        let output = sparse_convolve(&maps, &filters, &biases, &plan).unwrap();

        assert_eq!(output.dim(), (2, 2, 2));
        assert_eq!(
            output.index_axis(Axis(0), 0),
            array![[1.5, 0.5], [0.5, 1.5]]
        );
        // first source summed over 2x2 windows plus twice the bottom right of the second
        assert_eq!(
            output.index_axis(Axis(0), 1),
            array![[12. + 2. - 1., 16. - 1.], [24. - 1., 28. + 2. - 1.]]
        );
    }

    #[test]
    fn test_sparse_convolve_checks_counts() {
        let plan = ConnectivityPlan::lenet5();
        let maps: FeatureMaps = Array::zeros((5, 14, 14));
        let filters = Array::zeros((60, 5, 5));
        let biases = Array::zeros(16);
        assert_eq!(
            sparse_convolve(&maps, &filters, &biases, &plan),
            Err(NetworkError::FeatureMapCount {
                stage: Stage::C3,
                expected: 6,
                actual: 5
            })
        );

        let maps: FeatureMaps = Array::zeros((6, 14, 14));
        let filters = Array::zeros((16, 5, 5));
        assert_eq!(
            sparse_convolve(&maps, &filters, &biases, &plan),
            Err(NetworkError::LengthMismatch {
                expected: 60,
                actual: 16
            })
        );
    }

    #[test]
    fn test_sparse_convolve_lenet5_shape() {
        let plan = ConnectivityPlan::lenet5();
        let maps: FeatureMaps = Array::ones((6, 14, 14));
        let filters = Array::ones((60, 5, 5));
        let biases = Array::zeros(16);
        let output = sparse_convolve(&maps, &filters, &biases, &plan).unwrap();
        assert_eq!(output.dim(), (16, 10, 10));
        // every pixel sees 25 ones per connected source
        assert_eq!(output[[0, 3, 3]], 75.);
        assert_eq!(output[[9, 0, 9]], 100.);
        assert_eq!(output[[15, 9, 0]], 150.);
    }
}
