use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use privgraph::config::ExperimentConfig;
use privgraph::experiment::{run_dataset, run_sweep, RunOutcome};
use privgraph::io::{read_edge_list, write_edge_list};
use privgraph::pipeline::Synthesizer;
use privgraph::PrivacyBudget;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "privgraph", about = "Differentially-private synthetic graphs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesize one graph from an edge list.
    Synthesize {
        /// Input edge list.
        input: PathBuf,
        /// Output edge list.
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 2.0)]
        epsilon: f64,
        #[arg(long, default_value_t = 1.0 / 3.0)]
        e1_ratio: f64,
        #[arg(long, default_value_t = 1.0 / 3.0)]
        e2_ratio: f64,
        /// Number of random super-nodes for the initial partition.
        #[arg(short = 'n', long, default_value_t = 20)]
        groups: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 0)]
        replicate: u64,
    },
    /// Run one experiment and write its result table.
    Run(RunArgs),
    /// Run the budget-split grid for each epsilon.
    Sweep {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long, value_delimiter = ',', default_values_t = [0.5, 2.0, 3.5])]
        epsilons: Vec<f64>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// TOML config; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    dataset: Option<String>,
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    epsilon: Option<f64>,
    #[arg(long)]
    e1_ratio: Option<f64>,
    #[arg(long)]
    e2_ratio: Option<f64>,
    #[arg(long, value_delimiter = ',')]
    resolutions: Option<Vec<usize>>,
    #[arg(long)]
    replicates: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    save_graphs: bool,
}

impl RunArgs {
    fn into_config(self) -> anyhow::Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ExperimentConfig::default(),
        };
        if let Some(v) = self.dataset {
            config.dataset = v;
        }
        if let Some(v) = self.data_dir {
            config.data_dir = v;
        }
        if let Some(v) = self.output_dir {
            config.output_dir = v;
        }
        if let Some(v) = self.epsilon {
            config.epsilon = v;
        }
        if let Some(v) = self.e1_ratio {
            config.e1_ratio = v;
        }
        if let Some(v) = self.e2_ratio {
            config.e2_ratio = v;
        }
        if let Some(v) = self.resolutions {
            config.resolutions = v;
        }
        if let Some(v) = self.replicates {
            config.replicates = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        config.save_graphs |= self.save_graphs;
        config.validate()?;
        Ok(config)
    }
}

fn report(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Skipped { path } => info!(path = %path.display(), "skipped"),
        RunOutcome::Completed { rows, path } => match path {
            Some(p) => info!(rows = rows.len(), path = %p.display(), "written"),
            None => info!(rows = rows.len(), "completed"),
        },
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Synthesize {
            input,
            output,
            epsilon,
            e1_ratio,
            e2_ratio,
            groups,
            seed,
            replicate,
        } => {
            let loaded = read_edge_list(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let budget = PrivacyBudget::split(epsilon, e1_ratio, e2_ratio)?;
            let synthesis = Synthesizer::default().synthesize(
                &loaded.graph,
                &budget,
                groups,
                seed,
                replicate,
            )?;
            write_edge_list(&output, &synthesis.graph, Some(&loaded.labels))
                .with_context(|| format!("writing {}", output.display()))?;
            info!(
                nodes = synthesis.graph.node_count(),
                edges = synthesis.graph.edge_count(),
                communities = synthesis.partition.num_communities(),
                output = %output.display(),
                "synthetic graph written"
            );
        }
        Command::Run(args) => {
            let config = args.into_config()?;
            report(&run_dataset(&config)?);
        }
        Command::Sweep { run, epsilons } => {
            let base = run.into_config()?;
            for outcome in run_sweep(&base, &epsilons)? {
                report(&outcome);
            }
        }
    }
    Ok(())
}
