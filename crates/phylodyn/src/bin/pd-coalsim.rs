use std::io;
use std::io::Write;
use std::io::BufWriter;
use std::fs::File;
use std::path::Path;
use log::info;
use colored::*;
use env_logger::Builder;
use clap::Parser;
use clap::ArgAction;
use anyhow::{anyhow, Result};
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use pd_coalescent::TraitSet;
use pd_coalescent::CoalescentTreeGenerator;
use pd_coalescent::logger::TreeLogger;
use pd_coalescent::logger::NewickLogger;
use pd_coalescent::logger::HeightLogger;

use phylodyn::input_parsers::read_traits_input;
use phylodyn::coalescent_parsers::DateKind;
use phylodyn::coalescent_parsers::OutputArgs;
use phylodyn::coalescent_parsers::SamplerArgs;
use phylodyn::coalescent_parsers::PopulationArgs;

#[derive(Debug, Parser)]
#[command(name = "pd-coalsim")]
#[command(version, about = "Coalescent tree simulation with a root height constraint")]
pub struct Cli {
    /// Sampling dates ("taxon=value" entries), or "-" for stdin
    #[arg(long, value_name = "FILE", default_value = "-")]
    traits: String,

    /// How to read the sampling dates.
    #[arg(long, value_enum, default_value_t = DateKind::Backward)]
    dates: DateKind,

    /// Verbosity (-v = info, -vv = debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(flatten, next_help_heading = "Sampling parameters")]
    sampler: SamplerArgs,

    #[command(flatten, next_help_heading = "Population model parameters")]
    population: PopulationArgs,

    #[command(flatten, next_help_heading = "Output")]
    output: OutputArgs,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            // no prefix, just the message
            writeln!(buf, "{}", record.args())
        })
        .init();
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .map_err(|e| anyhow!("Cannot create {}: {}", path.display(), e))?;
    Ok(BufWriter::new(file))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    cli.sampler.validate()?;
    cli.population.validate()?;

    let traits = TraitSet::new(cli.dates.into(), read_traits_input(&cli.traits)?)?;
    let seed = cli.sampler.seed.unwrap_or_else(|| rand::rng().random());
    info!("Seed: {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);
    // Separate stream for the epidemic simulation.
    let mut population = cli.population.build(seed.wrapping_add(1));
    let sampler = cli.sampler.build();

    eprintln!("{} {} taxa, {} replicates, max height {}",
        "Sampling:".yellow(),
        traits.taxa().len(),
        sampler.replicates(),
        sampler.max_height(),
    );

    let mut newick = match &cli.output.newick {
        Some(path) if cli.output.nexus => Some(NewickLogger::nexus(create(path)?)),
        Some(path) => Some(NewickLogger::new(create(path)?)),
        None => None,
    };
    let mut heights = match &cli.output.heights {
        Some(path) => Some(HeightLogger::new(create(path)?)),
        None => None,
    };
    let mut stdout = (newick.is_none() && heights.is_none())
        .then(|| NewickLogger::new(io::stdout().lock()));
    let to_stdout = stdout.is_some();

    let mut loggers: Vec<&mut dyn TreeLogger> = Vec::new();
    if let Some(l) = newick.as_mut() {
        loggers.push(l);
    }
    if let Some(l) = heights.as_mut() {
        loggers.push(l);
    }
    if let Some(l) = stdout.as_mut() {
        loggers.push(l);
    }

    let pb = if to_stdout {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(sampler.replicates() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
        .progress_chars("#>-"),
    );

    let stats = sampler.run_with(
        &CoalescentTreeGenerator,
        &traits,
        &mut *population,
        &mut rng,
        &mut loggers,
        |_| pb.inc(1),
    );
    pb.finish_and_clear();
    let stats = stats?;

    let attempts: usize = stats.iter().map(|s| s.attempts).sum();
    let mean_height = stats.iter().map(|s| s.root_height).sum::<f64>() / stats.len() as f64;
    eprintln!("{} {} trees from {} draws (acceptance {:.4}), mean root height {:.6}",
        "Done:".green(),
        stats.len(),
        attempts,
        stats.len() as f64 / attempts as f64,
        mean_height,
    );

    Ok(())
}
