use kmax_truss::graph::loader::load_edges;
use kmax_truss::MaxTruss;

use clap::Parser;
use log::{info, LevelFilter};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "kmax-truss",
    version,
    about = "Computes the maximum k-truss of a simple undirected graph"
)]
struct ProgramArgs {
    /// Edge-list file, one "u v" pair per line; '#' and '%' lines are comments
    #[arg(short, long, required = true)]
    input: String,

    /// Prune the graph by coreness before peeling (guessed startK, refined
    /// downward until the report is provably exact)
    #[arg(short, long)]
    remove: bool,

    /// Worker threads; defaults to the physical core count
    #[arg(short, long)]
    threads: Option<usize>,

    /// Log stage timings and the truss spectrum
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = ProgramArgs::parse();
    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            LevelFilter::Info
        } else {
            LevelFilter::Warn
        })
        .init();

    match run(&args) {
        Ok(k_max) => {
            println!("kmax = {k_max}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &ProgramArgs) -> Result<u32, Box<dyn std::error::Error>> {
    let edges = load_edges(&args.input)?;
    info!("{} directed edges loaded from {}", edges.len(), args.input);

    let threads = args
        .threads
        .unwrap_or_else(num_cpus::get_physical)
        .max(1);
    let result = MaxTruss::new(edges)
        .with_threads(threads)
        .compute(args.remove)?;

    for (k, count) in &result.spectrum {
        info!("k = {k}: {count} edges");
    }
    Ok(result.k_max)
}
