use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use ferrite_gan::{
    Adversaries, CheckpointStore, DataLoader, ImageFolder, Module, Resume, TrainParams, TrainingSession,
};

#[derive(Parser, Debug)]
#[command(name = "ferrite-gan", version, about = "Train a WGAN-GP on a folder of images.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train (or resume training) from a JSON parameters file.
    Train {
        #[arg(long, default_value = "parameters.json")]
        config: PathBuf,
        /// Overrides `num_epochs` from the parameters file.
        #[arg(long)]
        epochs: Option<usize>,
        /// Hide the per-batch progress bar.
        #[arg(long)]
        no_progress: bool,
    },
    /// Print the epoch and loss history stored in a checkpoint.
    Inspect {
        #[arg(long)]
        checkpoint: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Train { config, epochs, no_progress } => train(config, epochs, !no_progress),
        Command::Inspect { checkpoint } => inspect(checkpoint),
    }
}

fn train(config: PathBuf, epochs: Option<usize>, show_progress: bool) -> Result<()> {
    let started = Instant::now();
    let mut params = TrainParams::load(&config)
        .with_context(|| format!("loading parameters from '{}'", config.display()))?;
    if let Some(epochs) = epochs {
        params.num_epochs = epochs;
    }
    params.create_dirs().context("creating output directories")?;
    params.save_architecture().context("writing network specs")?;
    tracing::info!("Number of critic repetitions per generator step: {}", params.n_critic);

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let (mut generator, mut discriminator) = params.architecture().build(&mut rng)?;
    tracing::info!(
        "Generator: {} parameters, critic: {} parameters",
        generator.num_parameters(),
        discriminator.num_parameters()
    );
    let (mut optim_g, mut optim_d) = params.optimizers();

    let folder = ImageFolder::open(&params.dataset_dir, params.image_size, params.channels)
        .with_context(|| format!("loading dataset '{}'", params.dataset_dir.display()))?;
    let mut data = DataLoader::new(folder.samples, params.batch_size)?;
    if params.shuffle {
        data = data.shuffled(params.seed);
    }

    let mut models = Adversaries {
        generator: &mut generator,
        discriminator: &mut discriminator,
        optim_g: &mut optim_g,
        optim_d: &mut optim_d,
    };
    let store = CheckpointStore::new(params.checkpoint_path());
    let resume = Resume::from_checkpoint(&store, &mut models, params.tolerate_corrupt_checkpoint)
        .context("restoring checkpoint")?;

    let session = TrainingSession::new(models, &mut data, params.session_config(show_progress), resume)?;
    let history = session.run()?;

    let losses_path = params.losses_path();
    fs::write(&losses_path, serde_json::to_string_pretty(&history)?)
        .with_context(|| format!("writing '{}'", losses_path.display()))?;

    let minutes = started.elapsed().as_secs_f64() / 60.0;
    tracing::info!("Training took {:.1} minutes", minutes);
    Ok(())
}

fn inspect(checkpoint: PathBuf) -> Result<()> {
    let record = CheckpointStore::new(&checkpoint)
        .load()?
        .with_context(|| format!("no checkpoint at '{}'", checkpoint.display()))?;

    println!("Last completed epoch: {}", record.epoch);
    println!("Generator parameters: {}", record.generator.values().map(|t| t.numel()).sum::<usize>());
    println!("Critic parameters:    {}", record.discriminator.values().map(|t| t.numel()).sum::<usize>());
    println!("{:>6}  {:>14}  {:>14}", "epoch", "g_loss", "d_loss");
    for (i, (g, d)) in record.losses_g.iter().zip(&record.losses_d).enumerate() {
        println!("{:>6}  {:>14.6}  {:>14.6}", i + 1, g, d);
    }
    Ok(())
}
