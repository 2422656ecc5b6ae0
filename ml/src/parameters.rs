//! Storage and initialization of every trainable array of the network.
//!
//! Shapes follow the constants in [`crate::architecture`]; the C3 filter count follows
//! the [`ConnectivityPlan`]. Filters are stacked along the first axis.
use crate::{
    architecture::*,
    connectivity::ConnectivityPlan,
    network_errors::{NetworkError, NetworkResult},
    WeightPrecision,
};
use log::info;
use ndarray::*;
use rand::{distributions::Uniform, Rng};

/// Scale of the fan-in uniform initialization, weights are drawn from
/// `[-2.4 / Fi, 2.4 / Fi]`.
pub const FAN_IN_SCALE: WeightPrecision = 2.4;

/// Filters and one bias per output map (C1, C3).
#[derive(Debug, Clone, PartialEq)]
pub struct ConvolutionParameters {
    pub filters: Array3<WeightPrecision>,
    pub biases: Array1<WeightPrecision>,
}

/// One scale and one bias per feature map (S2, S4).
#[derive(Debug, Clone, PartialEq)]
pub struct PoolingParameters {
    pub weights: Array1<WeightPrecision>,
    pub biases: Array1<WeightPrecision>,
}

/// Filters that collapse every source map into a scalar, followed by a scale and
/// a bias per output unit (C5).
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledConvolutionParameters {
    pub filters: Array3<WeightPrecision>,
    pub weights: Array1<WeightPrecision>,
    pub biases: Array1<WeightPrecision>,
}

/// Weight matrix of shape (outputs, inputs) and one bias per output (F6).
#[derive(Debug, Clone, PartialEq)]
pub struct FullyConnectedParameters {
    pub weights: Array2<WeightPrecision>,
    pub biases: Array1<WeightPrecision>,
}

/// All trainable parameters of the network.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStore {
    pub c1: ConvolutionParameters,
    pub s2: PoolingParameters,
    pub c3: ConvolutionParameters,
    pub s4: PoolingParameters,
    pub c5: ScaledConvolutionParameters,
    pub f6: FullyConnectedParameters,
    /// One prototype (or weight row) of length F6 per class, shape (classes, F6 units).
    /// The output stage has no biases.
    pub output: Array2<WeightPrecision>,
}

fn fan_in_distribution(fan_in: usize) -> Uniform<WeightPrecision> {
    let bound = FAN_IN_SCALE / fan_in as WeightPrecision;
    Uniform::new_inclusive(-bound, bound)
}

/// Draws every entry uniformly from `[-2.4 / fan_in, 2.4 / fan_in]`.
pub fn fan_in_uniform<Sh, D, R>(shape: Sh, fan_in: usize, rng: &mut R) -> Array<WeightPrecision, D>
where
    Sh: ShapeBuilder<Dim = D>,
    D: Dimension,
    R: Rng + ?Sized,
{
    let distribution = fan_in_distribution(fan_in);
    Array::from_shape_simple_fn(shape, || rng.sample(&distribution))
}

/// Sets every entry to +1 or -1 with equal probability.
pub fn bipolar<Sh, D, R>(shape: Sh, rng: &mut R) -> Array<WeightPrecision, D>
where
    Sh: ShapeBuilder<Dim = D>,
    D: Dimension,
    R: Rng + ?Sized,
{
    Array::from_shape_simple_fn(shape, || if rng.gen_bool(0.5) { 1.0 } else { -1.0 })
}

fn check_shape(name: &'static str, expected: &[usize], actual: &[usize]) -> NetworkResult<()> {
    if expected != actual {
        return Err(NetworkError::ParameterShape {
            name,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

/// Sets the center tap of every filter to one.
fn center_taps(filters: &mut Array3<WeightPrecision>) {
    let center = FILTER_SIZE / 2;
    filters.slice_mut(s![.., center, center]).fill(1.0);
}

impl ParameterStore {
    /// Allocates all arrays filled with zeros.
    pub fn zeros(plan: &ConnectivityPlan) -> ParameterStore {
        ParameterStore {
            c1: ConvolutionParameters {
                filters: Array::zeros((C1_MAPS, FILTER_SIZE, FILTER_SIZE)),
                biases: Array::zeros(C1_MAPS),
            },
            s2: PoolingParameters {
                weights: Array::zeros(S2_MAPS),
                biases: Array::zeros(S2_MAPS),
            },
            c3: ConvolutionParameters {
                filters: Array::zeros((plan.filter_count(), FILTER_SIZE, FILTER_SIZE)),
                biases: Array::zeros(plan.destination_count()),
            },
            s4: PoolingParameters {
                weights: Array::zeros(S4_MAPS),
                biases: Array::zeros(S4_MAPS),
            },
            c5: ScaledConvolutionParameters {
                filters: Array::zeros((C5_UNITS, FILTER_SIZE, FILTER_SIZE)),
                weights: Array::zeros(C5_UNITS),
                biases: Array::zeros(C5_UNITS),
            },
            f6: FullyConnectedParameters {
                weights: Array::zeros((F6_UNITS, C5_UNITS)),
                biases: Array::zeros(F6_UNITS),
            },
            output: Array::zeros((OUTPUT_CLASSES, F6_UNITS)),
        }
    }

    /// Allocates and randomly initializes all parameters for a training set of the
    /// given size.
    ///
    /// Every convolution filter, pooling scale/bias and fully connected weight/bias is
    /// drawn uniformly from `[-2.4 / Fi, 2.4 / Fi]`, with Fi the number of inputs of the
    /// unit it feeds. The output prototypes are drawn from {-1, +1}.
    ///
    /// Fails if the training set is empty, as there is nothing to size the network against.
    pub fn initialize<R: Rng + ?Sized>(
        training_set_size: usize,
        plan: &ConnectivityPlan,
        rng: &mut R,
    ) -> NetworkResult<ParameterStore> {
        if training_set_size == 0 {
            return Err(NetworkError::EmptyTrainingSet);
        }
        let filter_area = FILTER_SIZE * FILTER_SIZE;
        let pool_area = POOL_SIZE * POOL_SIZE;

        let mut c3 = ConvolutionParameters {
            filters: Array::zeros((plan.filter_count(), FILTER_SIZE, FILTER_SIZE)),
            biases: Array::zeros(plan.destination_count()),
        };
        for (destination, sources, offset) in plan.destinations() {
            let sources = sources.len();
            let fan_in = filter_area * sources;
            c3.filters
                .slice_mut(s![offset..offset + sources, .., ..])
                .assign(&fan_in_uniform((sources, FILTER_SIZE, FILTER_SIZE), fan_in, rng));
            c3.biases[destination] = rng.sample(fan_in_distribution(fan_in));
        }

        let c5_fan_in = filter_area * S4_MAPS;
        let parameters = ParameterStore {
            c1: ConvolutionParameters {
                filters: fan_in_uniform((C1_MAPS, FILTER_SIZE, FILTER_SIZE), filter_area, rng),
                biases: fan_in_uniform(C1_MAPS, filter_area, rng),
            },
            s2: PoolingParameters {
                weights: fan_in_uniform(S2_MAPS, pool_area, rng),
                biases: fan_in_uniform(S2_MAPS, pool_area, rng),
            },
            c3,
            s4: PoolingParameters {
                weights: fan_in_uniform(S4_MAPS, pool_area, rng),
                biases: fan_in_uniform(S4_MAPS, pool_area, rng),
            },
            c5: ScaledConvolutionParameters {
                filters: fan_in_uniform((C5_UNITS, FILTER_SIZE, FILTER_SIZE), c5_fan_in, rng),
                weights: fan_in_uniform(C5_UNITS, c5_fan_in, rng),
                biases: fan_in_uniform(C5_UNITS, c5_fan_in, rng),
            },
            f6: FullyConnectedParameters {
                weights: fan_in_uniform((F6_UNITS, C5_UNITS), C5_UNITS, rng),
                biases: fan_in_uniform(F6_UNITS, C5_UNITS, rng),
            },
            output: bipolar((OUTPUT_CLASSES, F6_UNITS), rng),
        };

        info!(
            "Initialized {} parameters for a training set of {} images",
            parameters.parameter_count(),
            training_set_size
        );
        Ok(parameters)
    }

    /// Simple deterministic weights that make the data flow easy to follow:
    /// every filter passes its center pixel through, every scale, the C5 and F6 biases and
    /// every dense weight is one, all other biases are zero.
    pub fn demonstration(plan: &ConnectivityPlan) -> ParameterStore {
        let mut parameters = ParameterStore::zeros(plan);
        center_taps(&mut parameters.c1.filters);
        center_taps(&mut parameters.c3.filters);
        center_taps(&mut parameters.c5.filters);
        parameters.s2.weights.fill(1.0);
        parameters.s4.weights.fill(1.0);
        parameters.c5.weights.fill(1.0);
        parameters.c5.biases.fill(1.0);
        parameters.f6.weights.fill(1.0);
        parameters.f6.biases.fill(1.0);
        parameters.output.fill(1.0);
        parameters
    }

    /// Checks the plan and every array against the architecture and the connectivity plan.
    pub fn validate(&self, plan: &ConnectivityPlan) -> NetworkResult<()> {
        if plan.source_count() != S2_MAPS || plan.destination_count() != C3_MAPS {
            return Err(NetworkError::InvalidConnectivity(format!(
                "plan maps {} sources to {} destinations, expected {} and {}",
                plan.source_count(),
                plan.destination_count(),
                S2_MAPS,
                C3_MAPS
            )));
        }
        let f = FILTER_SIZE;
        check_shape("c1.filters", &[C1_MAPS, f, f], self.c1.filters.shape())?;
        check_shape("c1.biases", &[C1_MAPS], self.c1.biases.shape())?;
        check_shape("s2.weights", &[S2_MAPS], self.s2.weights.shape())?;
        check_shape("s2.biases", &[S2_MAPS], self.s2.biases.shape())?;
        check_shape(
            "c3.filters",
            &[plan.filter_count(), f, f],
            self.c3.filters.shape(),
        )?;
        check_shape("c3.biases", &[plan.destination_count()], self.c3.biases.shape())?;
        check_shape("s4.weights", &[S4_MAPS], self.s4.weights.shape())?;
        check_shape("s4.biases", &[S4_MAPS], self.s4.biases.shape())?;
        check_shape("c5.filters", &[C5_UNITS, f, f], self.c5.filters.shape())?;
        check_shape("c5.weights", &[C5_UNITS], self.c5.weights.shape())?;
        check_shape("c5.biases", &[C5_UNITS], self.c5.biases.shape())?;
        check_shape("f6.weights", &[F6_UNITS, C5_UNITS], self.f6.weights.shape())?;
        check_shape("f6.biases", &[F6_UNITS], self.f6.biases.shape())?;
        check_shape("output", &[OUTPUT_CLASSES, F6_UNITS], self.output.shape())?;
        Ok(())
    }

    /// Total number of trainable scalars.
    pub fn parameter_count(&self) -> usize {
        self.c1.filters.len()
            + self.c1.biases.len()
            + self.s2.weights.len()
            + self.s2.biases.len()
            + self.c3.filters.len()
            + self.c3.biases.len()
            + self.s4.weights.len()
            + self.s4.biases.len()
            + self.c5.filters.len()
            + self.c5.weights.len()
            + self.c5.biases.len()
            + self.f6.weights.len()
            + self.f6.biases.len()
            + self.output.len()
    }
}
