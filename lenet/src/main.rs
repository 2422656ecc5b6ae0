//! This crate ties in all the parts of the project and provides a command line interface
//! to run handwritten digits through a LeNet-5 network.

use env_logger::Builder;
use lenet::{dataset::Dataset, evaluation::Evaluation, load_image, render::PngRenderer};
use log::info;
use ml::{
    activation_functions::ActivationPlacement,
    architecture::OUTPUT_CLASSES,
    config::{ConfigError, NetworkConfig},
    connectivity::ConnectivityPlan,
    fully_connected::ScoringMode,
    labels,
    models::LeNet5,
    pooling::PoolingMode,
};
use quicli::prelude::*;
use rand::{rngs::StdRng, thread_rng, RngCore, SeedableRng};
use std::path::PathBuf;
use structopt::StructOpt;

/// Settings shared by every subcommand that builds a randomly initialized network
#[derive(Debug, StructOpt)]
struct NetworkOpts {
    /// JSON file with the keys pooling, scoring and activation
    #[structopt(short = "c", long = "config", parse(from_os_str))]
    config: Option<PathBuf>,
    /// Pooling variant: average, sum or sum-sigmoid. Overrides the config file.
    #[structopt(long = "pooling")]
    pooling: Option<PoolingMode>,
    /// Scoring variant: distance or linear. Overrides the config file.
    #[structopt(long = "scoring")]
    scoring: Option<ScoringMode>,
    /// Leaves every stage unactivated
    #[structopt(long = "no-activation")]
    no_activation: bool,
    /// Seed for the weight initialization. Random if not given.
    #[structopt(short = "s", long = "seed")]
    seed: Option<u64>,
}

impl NetworkOpts {
    fn network_config(&self) -> Result<NetworkConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => NetworkConfig::from_json_file(path)?,
            None => NetworkConfig::default(),
        };
        if let Some(pooling) = self.pooling {
            config.pooling = pooling;
        }
        if let Some(scoring) = self.scoring {
            config.scoring = scoring;
        }
        if self.no_activation {
            config.activation = ActivationPlacement::Disabled;
        }
        info!("Using {:?}", config);
        Ok(config)
    }

    fn rng(&self) -> Box<dyn RngCore> {
        match self.seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(thread_rng()),
        }
    }
}

/// Classifies a single image
#[derive(Debug, StructOpt)]
struct InferOpts {
    /// Path to the image (png, jpg or npy), 28x28 or 32x32
    #[structopt(parse(from_os_str))]
    image: PathBuf,
    /// Writes the input and every stage as png into this directory
    #[structopt(short = "r", long = "render-dir", parse(from_os_str))]
    render_dir: Option<PathBuf>,
    #[structopt(flatten)]
    network: NetworkOpts,
    #[structopt(flatten)]
    verbosity: Verbosity,
}

/// Classifies a whole dataset and prints accuracy and confusion matrix
#[derive(Debug, StructOpt)]
struct EvaluateOpts {
    /// IDX image file, optionally gzipped
    #[structopt(short = "i", long = "images", parse(from_os_str))]
    images: PathBuf,
    /// IDX label file, optionally gzipped
    #[structopt(short = "l", long = "labels", parse(from_os_str))]
    labels: PathBuf,
    /// Only use the first N examples
    #[structopt(short = "n", long = "limit")]
    limit: Option<usize>,
    #[structopt(flatten)]
    network: NetworkOpts,
    #[structopt(flatten)]
    verbosity: Verbosity,
}

/// Runs the first example of a dataset through a network with simple fixed weights
#[derive(Debug, StructOpt)]
struct DemoOpts {
    /// IDX image file, optionally gzipped
    #[structopt(short = "i", long = "images", parse(from_os_str))]
    images: PathBuf,
    /// IDX label file, optionally gzipped
    #[structopt(short = "l", long = "labels", parse(from_os_str))]
    labels: PathBuf,
    /// Output directory for the stage images
    #[structopt(short = "r", long = "render-dir", parse(from_os_str))]
    render_dir: PathBuf,
    /// Pixels per value in the stage images
    #[structopt(long = "scale", default_value = "16")]
    scale: u32,
    #[structopt(flatten)]
    verbosity: Verbosity,
}

/// Prints the connection table between S2 and C3
#[derive(Debug, StructOpt)]
struct ConnectivityOpts {
    #[structopt(flatten)]
    verbosity: Verbosity,
}

/// Run handwritten digits through a LeNet-5 network.
#[derive(Debug, StructOpt)]
#[structopt(name = "LeNet")]
enum Lenet {
    #[structopt(name = "infer", about = "Classifies a single image.")]
    Infer(InferOpts),
    #[structopt(
        name = "evaluate",
        about = "Classifies every image of an IDX dataset and prints statistics."
    )]
    Evaluate(EvaluateOpts),
    #[structopt(
        name = "demo",
        about = "Renders every stage of the first dataset example, \
        computed with simple fixed weights and without activation."
    )]
    Demo(DemoOpts),
    #[structopt(
        name = "connectivity",
        about = "Prints which S2 maps feed which C3 maps."
    )]
    Connectivity(ConnectivityOpts),
}

/// Trait for the subcommands that lenet uses
trait LenetOpts {
    /// Performs the subcommand
    fn run(&self) -> CliResult;
    /// Returns the verbosity command
    fn get_verbosity(&self) -> &Verbosity;
    /// Sets up logging
    fn setup_env_logger(&self) -> CliResult {
        let mut builder = Builder::from_default_env();

        builder
            .filter(None, self.get_verbosity().log_level().to_level_filter())
            .init();

        Ok(())
    }
}

impl LenetOpts for InferOpts {
    fn run(&self) -> CliResult {
        let image = load_image(&self.image)?;
        let config = self.network.network_config()?;
        let mut rng = self.network.rng();
        let network =
            LeNet5::for_training_set(std::slice::from_ref(&image), config, &mut *rng)?;

        let scores = match &self.render_dir {
            Some(dir) => network.infer_rendered(&image, &mut PngRenderer::new(dir)?)?,
            None => network.infer(&image)?,
        };
        let predicted = labels::decode(&scores, config.scoring)?;

        println!("Scores: {}", scores);
        println!("Predicted class: {}", predicted);
        Ok(())
    }

    fn get_verbosity(&self) -> &Verbosity {
        &self.verbosity
    }
}

impl LenetOpts for EvaluateOpts {
    fn run(&self) -> CliResult {
        let dataset = Dataset::load(&self.images, &self.labels, self.limit)?;
        let config = self.network.network_config()?;
        let mut rng = self.network.rng();
        let network = LeNet5::for_training_set(&dataset.images, config, &mut *rng)?;

        let evaluation = Evaluation::run(&network, &dataset, OUTPUT_CLASSES)?;
        println!("{}", evaluation);
        Ok(())
    }

    fn get_verbosity(&self) -> &Verbosity {
        &self.verbosity
    }
}

impl LenetOpts for DemoOpts {
    fn run(&self) -> CliResult {
        let dataset = Dataset::load(&self.images, &self.labels, Some(1))?;
        let network = LeNet5::demonstration(NetworkConfig::demonstration());
        let mut renderer = PngRenderer::with_scale(&self.render_dir, self.scale)?;

        let (image, label) = (&dataset.images[0], dataset.labels[0]);
        let scores = network.infer_rendered(image, &mut renderer)?;
        let target = labels::encode(label, OUTPUT_CLASSES)?;

        println!("Label {}, stages written to {}", label, renderer.dir().display());
        println!("{:>5} {:>14} {:>7}", "class", "score", "target");
        for (class, (score, expected)) in scores.iter().zip(target.iter()).enumerate() {
            println!("{:>5} {:>14.4} {:>7}", class, score, expected);
        }
        Ok(())
    }

    fn get_verbosity(&self) -> &Verbosity {
        &self.verbosity
    }
}

impl LenetOpts for ConnectivityOpts {
    fn run(&self) -> CliResult {
        let plan = ConnectivityPlan::lenet5();
        println!("{}", plan);
        println!(
            "{} of {} possible connections, {} filters",
            plan.connections().count(),
            plan.source_count() * plan.destination_count(),
            plan.filter_count()
        );
        Ok(())
    }

    fn get_verbosity(&self) -> &Verbosity {
        &self.verbosity
    }
}

impl LenetOpts for Lenet {
    fn run(&self) -> CliResult {
        match self {
            Lenet::Infer(c) => c.run(),
            Lenet::Evaluate(c) => c.run(),
            Lenet::Demo(c) => c.run(),
            Lenet::Connectivity(c) => c.run(),
        }
    }

    fn get_verbosity(&self) -> &Verbosity {
        match self {
            Lenet::Infer(c) => c.get_verbosity(),
            Lenet::Evaluate(c) => c.get_verbosity(),
            Lenet::Demo(c) => c.get_verbosity(),
            Lenet::Connectivity(c) => c.get_verbosity(),
        }
    }
}

fn main() -> CliResult {
    let args = Lenet::from_args();
    args.setup_env_logger()?;
    args.run()
}
