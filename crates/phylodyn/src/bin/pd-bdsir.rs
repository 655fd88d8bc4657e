use std::io::Write;
use std::path::PathBuf;
use log::info;
use colored::*;
use serde::Serialize;
use env_logger::Builder;
use clap::Parser;
use clap::ArgAction;
use anyhow::{anyhow, bail, Result};

use pd_tree::TimedTree;
use pd_epidemic::Feasibility;
use pd_epidemic::EpidemicTrajectory;
use pd_epidemic::trajectory_plotting::plot_trajectory;

use phylodyn::input_parsers::read_bdsir_config_input;
use phylodyn::input_parsers::read_newick_input;

#[derive(Debug, Parser)]
#[command(name = "pd-bdsir")]
#[command(version, about = "Birth-death SIR trajectory reconstruction on a timed tree")]
pub struct Cli {
    /// Model configuration (JSON), or "-" for stdin
    #[arg(value_name = "INPUT", default_value = "-")]
    input: String,

    /// Tree file (Newick or NEXUS), or "-" for stdin
    #[arg(long, value_name = "FILE")]
    tree: String,

    /// Plot the reconstructed trajectory to this SVG file.
    #[arg(long, value_name = "FILE")]
    plot: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    /// Verbosity (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct Report<'a> {
    birth_rate: f64,
    death_rate: f64,
    sampling_rate: f64,
    feasible: bool,
    log_likelihood: f64,
    reason: Option<String>,
    trajectory: Option<&'a EpidemicTrajectory>,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            // no prefix, just the message
            writeln!(buf, "{}", record.args())
        })
        .init();
}

fn print_trajectory(trajectory: &EpidemicTrajectory) {
    println!("{:>8} {:>12} {:>14} {:>10} {:>10} {:>10}",
        "interval".cyan(),
        "time".cyan(),
        "birth-rate".green(),
        "S".yellow(),
        "I".yellow(),
        "R".yellow(),
    );
    for (k, ((birth, time), c)) in trajectory.birth.iter()
        .zip(&trajectory.times)
        .zip(&trajectory.compartments)
        .enumerate()
    {
        println!("{:>8} {:>12.6} {:>14.8e} {:>10} {:>10} {:>10}",
            k, time, birth, c.susceptible, c.infected, c.recovered);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.input == "-" && cli.tree == "-" {
        bail!("INPUT and --tree cannot both be read from stdin");
    }

    let config = read_bdsir_config_input(&cli.input)?;
    let tree = read_newick_input(&cli.tree)?;
    info!("Tree with {} taxa, root height {}", tree.leaf_count(), tree.root_height());

    let model = config.model()?;
    info!("{} birth-rate changes, origin offset {}",
        model.birth_rate_changes(), model.origin_offset());

    let rates = model.rates();
    let result = model.update_rates_and_times(&tree)?;

    if cli.json {
        let report = Report {
            birth_rate: rates.birth_rate0(),
            death_rate: rates.death_rate0(),
            sampling_rate: rates.sampling_rate0(),
            feasible: result.is_feasible(),
            log_likelihood: result.log_likelihood(),
            reason: match &result {
                Feasibility::Infeasible(reason) => Some(reason.to_string()),
                Feasibility::Feasible(_) => None,
            },
            trajectory: result.trajectory(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} birth {:.6}, death {:.6}, sampling {:.6}",
            "Rates:".cyan(),
            rates.birth_rate0(),
            rates.death_rate0(),
            rates.sampling_rate0(),
        );
        match &result {
            Feasibility::Feasible(trajectory) => {
                println!("{} (origin time {:.6}, {} taxa)",
                    "Feasible trajectory".green().bold(),
                    trajectory.origin_time, trajectory.ntaxa);
                print_trajectory(trajectory);
            }
            Feasibility::Infeasible(reason) => {
                println!("{}: {}", "Infeasible trajectory".red().bold(), reason);
            }
        }
        println!("{} {}", "log-likelihood:".cyan(), result.log_likelihood());
    }

    if let Some(path) = &cli.plot {
        match result.trajectory() {
            Some(trajectory) => {
                plot_trajectory(trajectory, &tree, path)
                    .map_err(|e| anyhow!("Failed to plot {}: {}", path.display(), e))?;
                info!("Trajectory plot written to {}", path.display());
            }
            None => bail!("Cannot plot an infeasible trajectory"),
        }
    }

    Ok(())
}
