use crate::{
    architecture::*,
    config::NetworkConfig,
    connectivity::{sparse_convolve, ConnectivityPlan},
    convolutions::{convolve_padded, convolve_pixel},
    fully_connected::{fully_connected, score},
    labels,
    network_errors::{NetworkError, NetworkResult},
    parameters::ParameterStore,
    pooling::pool,
    render::Renderer,
    FeatureMaps, Tensor1D, Tensor2D,
};
use log::debug;
use ndarray::*;
use rand::Rng;

/// General model trait for classifiers of single images
pub trait Model {
    /// Raw scores, one per class.
    fn forward_pass(&self, input: &Tensor2D) -> NetworkResult<Tensor1D>;
    /// Index of the predicted class.
    fn predict(&self, input: &Tensor2D) -> NetworkResult<usize>;
}

/// The output of every stage of one forward pass, as fed into the next stage
/// (i.e. after the activation, if any).
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardTrace {
    pub c1: FeatureMaps,
    pub s2: FeatureMaps,
    pub c3: FeatureMaps,
    pub s4: FeatureMaps,
    pub c5: Tensor1D,
    pub f6: Tensor1D,
    pub output: Tensor1D,
}

impl ForwardTrace {
    /// Feature maps of the map producing stages.
    pub fn maps(&self, stage: Stage) -> Option<&FeatureMaps> {
        match stage {
            Stage::C1 => Some(&self.c1),
            Stage::S2 => Some(&self.s2),
            Stage::C3 => Some(&self.c3),
            Stage::S4 => Some(&self.s4),
            Stage::C5 | Stage::F6 | Stage::Output => None,
        }
    }

    /// Output vector of the vector producing stages.
    pub fn vector(&self, stage: Stage) -> Option<&Tensor1D> {
        match stage {
            Stage::C5 => Some(&self.c5),
            Stage::F6 => Some(&self.f6),
            Stage::Output => Some(&self.output),
            Stage::C1 | Stage::S2 | Stage::C3 | Stage::S4 => None,
        }
    }

    /// Pushes every feature map as `<stage>-<index>` and every vector as `<stage>`.
    pub fn render<R: Renderer + ?Sized>(&self, renderer: &mut R) {
        for stage in Stage::ALL.iter() {
            if let Some(maps) = self.maps(*stage) {
                for (index, map) in maps.outer_iter().enumerate() {
                    renderer.render(map.into_dyn(), &format!("{}-{}", stage.name(), index));
                }
            }
            if let Some(vector) = self.vector(*stage) {
                renderer.render(vector.view().into_dyn(), stage.name());
            }
        }
    }
}

/// LeNet-5 as described in
/// Gradient-Based Learning Applied to Document Recognition, LeCun et al., 1998,
/// <https://ieeexplore.ieee.org/stamp/stamp.jsp?tp=&arnumber=726791>.
///
/// C1 (5x5conv,6) -> S2 (2x2pool,6) -> C3 (5x5conv,16, sparse) -> S4 (2x2pool,16)
/// -> C5 (5x5conv,120) -> F6 (dense,84) -> Output (10 scores)
///
/// The network holds no state besides its read-only parameters, so the same image
/// always yields the same scores.
#[derive(Debug, Clone, PartialEq)]
pub struct LeNet5 {
    parameters: ParameterStore,
    plan: ConnectivityPlan,
    config: NetworkConfig,
}

impl LeNet5 {
    /// Fails if the parameters don't match the architecture or the plan.
    pub fn new(
        parameters: ParameterStore,
        plan: ConnectivityPlan,
        config: NetworkConfig,
    ) -> NetworkResult<LeNet5> {
        parameters.validate(&plan)?;
        Ok(LeNet5 {
            parameters,
            plan,
            config,
        })
    }

    /// Randomly initialized network with the sparse C3 table, sized for the given
    /// training images.
    pub fn for_training_set<R: Rng + ?Sized>(
        images: &[Tensor2D],
        config: NetworkConfig,
        rng: &mut R,
    ) -> NetworkResult<LeNet5> {
        let plan = ConnectivityPlan::lenet5();
        let parameters = ParameterStore::initialize(images.len(), &plan, rng)?;
        LeNet5::new(parameters, plan, config)
    }

    /// Network with the hand traceable demonstration weights.
    pub fn demonstration(config: NetworkConfig) -> LeNet5 {
        let plan = ConnectivityPlan::lenet5();
        LeNet5 {
            parameters: ParameterStore::demonstration(&plan),
            plan,
            config,
        }
    }

    pub fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    pub fn plan(&self) -> &ConnectivityPlan {
        &self.plan
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Scores of all classes for a 28x28 (or already padded 32x32) image.
    pub fn infer(&self, image: &Tensor2D) -> NetworkResult<Tensor1D> {
        Ok(self.trace(image)?.output)
    }

    /// Like [`LeNet5::infer`], but pushes the input and every intermediate result
    /// to the renderer.
    pub fn infer_rendered<R: Renderer + ?Sized>(
        &self,
        image: &Tensor2D,
        renderer: &mut R,
    ) -> NetworkResult<Tensor1D> {
        let trace = self.trace(image)?;
        renderer.render(image.view().into_dyn(), "input");
        trace.render(renderer);
        Ok(trace.output)
    }

    /// The predicted class of the image.
    pub fn classify(&self, image: &Tensor2D) -> NetworkResult<usize> {
        labels::decode(&self.infer(image)?, self.config.scoring)
    }

    /// Runs all stages and keeps every intermediate result.
    pub fn trace(&self, image: &Tensor2D) -> NetworkResult<ForwardTrace> {
        let activation = self.config.activation;
        let p = &self.parameters;

        let c1 = activation.activate(self.c1(image)?);
        debug!("{} output shape {:?}", Stage::C1, c1.shape());

        let s2 = activation.activate(pool(
            &c1,
            &p.s2.weights,
            &p.s2.biases,
            POOL_SIZE,
            POOL_SIZE,
            POOL_STRIDE,
            self.config.pooling,
        )?);
        debug!("{} output shape {:?}", Stage::S2, s2.shape());

        let c3 = sparse_convolve(&s2, &p.c3.filters, &p.c3.biases, &self.plan)?;
        let c3 = activation.activate(c3);
        debug!("{} output shape {:?}", Stage::C3, c3.shape());

        let s4 = activation.activate(pool(
            &c3,
            &p.s4.weights,
            &p.s4.biases,
            POOL_SIZE,
            POOL_SIZE,
            POOL_STRIDE,
            self.config.pooling,
        )?);
        debug!("{} output shape {:?}", Stage::S4, s4.shape());

        let c5 = activation.activate(self.c5(&s4)?);
        debug!("{} output shape {:?}", Stage::C5, c5.shape());

        let f6 = activation.activate(fully_connected(&c5, &p.f6.weights, &p.f6.biases)?);
        debug!("{} output shape {:?}", Stage::F6, f6.shape());

        // Raw scores, no activation
        let output = score(&f6, &p.output, self.config.scoring)?;
        debug!("{} scores {}", Stage::Output, output);

        Ok(ForwardTrace {
            c1,
            s2,
            c3,
            s4,
            c5,
            f6,
            output,
        })
    }

    /// Padded convolution of the input with every C1 filter.
    fn c1(&self, image: &Tensor2D) -> NetworkResult<FeatureMaps> {
        let accepted = [(INPUT_SIZE, INPUT_SIZE), (PADDED_INPUT_SIZE, PADDED_INPUT_SIZE)];
        if !accepted.contains(&image.dim()) {
            return Err(NetworkError::InputShape {
                expected: accepted.to_vec(),
                actual: image.dim(),
            });
        }

        let c1 = &self.parameters.c1;
        let mut maps = FeatureMaps::zeros((C1_MAPS, C1_SIZE, C1_SIZE));
        for (index, mut map) in maps.outer_iter_mut().enumerate() {
            map.assign(&convolve_padded(
                image,
                c1.filters.index_axis(Axis(0), index),
                c1.biases[index],
                C1_SIZE,
                C1_SIZE,
            )?);
        }
        Ok(maps)
    }

    /// Every C5 unit convolves each S4 map with its filter at the single valid position,
    /// sums over all maps, then scales and shifts the sum.
    fn c5(&self, maps: &FeatureMaps) -> NetworkResult<Tensor1D> {
        let num_maps = maps.len_of(Axis(0));
        if num_maps != S4_MAPS {
            return Err(NetworkError::FeatureMapCount {
                stage: Stage::C5,
                expected: S4_MAPS,
                actual: num_maps,
            });
        }

        let c5 = &self.parameters.c5;
        let mut units = Tensor1D::zeros(C5_UNITS);
        for (unit, filter) in c5.filters.outer_iter().enumerate() {
            let mut total = 0.0;
            for map in maps.outer_iter() {
                total += convolve_pixel(map.view(), filter.view(), 0, 0)?;
            }
            units[unit] = total * c5.weights[unit] + c5.biases[unit];
        }
        Ok(units)
    }
}

impl Model for LeNet5 {
    fn forward_pass(&self, input: &Tensor2D) -> NetworkResult<Tensor1D> {
        self.infer(input)
    }

    fn predict(&self, input: &Tensor2D) -> NetworkResult<usize> {
        self.classify(input)
    }
}
