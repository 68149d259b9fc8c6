//! Experiment driver.
//!
//! An experiment fixes a dataset and a budget split, then runs
//! `replicates` synthesis replicates for each initial-partition resolution
//! and scores every synthetic graph against the input. Rows are written to
//! one CSV table per experiment:
//!
//! ```text
//! eps,exper,N,nmi,evc_overlap,evc_MAE,deg_kl,diam_rel,cc_rel,mod_rel
//! ```
//!
//! An experiment whose table already exists is skipped without touching the
//! file, so an interrupted sweep can simply be restarted.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::io::{read_edge_list, write_edge_list, LoadedGraph};
use crate::metrics::Baseline;
use crate::pipeline::{replicate_rng, Synthesizer};

/// Stream reserved for the baseline Louvain run.
const BASELINE_STREAM: u64 = u64::MAX;

/// One row of the result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    /// Total budget ε.
    pub eps: f64,
    /// Replicate index within its resolution.
    pub exper: usize,
    /// Initial-partition resolution.
    #[serde(rename = "N")]
    pub n: usize,
    /// NMI of Louvain partitions.
    pub nmi: f64,
    /// Top-1% eigenvector-centrality overlap.
    pub evc_overlap: f64,
    /// Top-1% eigenvector-centrality MAE.
    #[serde(rename = "evc_MAE")]
    pub evc_mae: f64,
    /// Degree-distribution KL divergence.
    pub deg_kl: f64,
    /// Relative diameter error.
    pub diam_rel: f64,
    /// Relative transitivity error.
    pub cc_rel: f64,
    /// Relative modularity error.
    pub mod_rel: f64,
}

/// What an experiment did.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The result table already existed; nothing ran.
    Skipped {
        /// Existing table.
        path: PathBuf,
    },
    /// Every replicate ran.
    Completed {
        /// Rows in resolution-major, replicate-minor order.
        rows: Vec<ResultRow>,
        /// Written table, if saving was enabled.
        path: Option<PathBuf>,
    },
}

fn already_done(config: &ExperimentConfig) -> Option<PathBuf> {
    let path = config.output_path();
    (config.save_csv && path.exists()).then_some(path)
}

/// Load the dataset named by `config` and run the experiment.
///
/// The resume check happens before the dataset is read.
pub fn run_dataset(config: &ExperimentConfig) -> Result<RunOutcome> {
    config.validate()?;
    if let Some(path) = already_done(config) {
        warn!(path = %path.display(), "result table exists, skipping");
        return Ok(RunOutcome::Skipped { path });
    }
    let loaded = read_edge_list(config.input_path())?;
    run_experiment(config, &loaded)
}

/// Run one experiment on an already loaded graph.
pub fn run_experiment(config: &ExperimentConfig, loaded: &LoadedGraph) -> Result<RunOutcome> {
    config.validate()?;
    if let Some(path) = already_done(config) {
        warn!(path = %path.display(), "result table exists, skipping");
        return Ok(RunOutcome::Skipped { path });
    }

    let started = Instant::now();
    let graph = &loaded.graph;
    let budget = config.budget()?;
    info!(
        dataset = %config.dataset,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        epsilon = budget.epsilon(),
        e1 = budget.e1_ratio(),
        e2 = budget.e2_ratio(),
        e3 = budget.e3_ratio(),
        "starting experiment"
    );

    let baseline = Baseline::compute(graph, &mut replicate_rng(config.seed, BASELINE_STREAM))?;
    let synthesizer = Synthesizer::new(&config.pipeline);
    let graphs_dir = config.graphs_dir();
    if config.save_graphs {
        fs::create_dir_all(&graphs_dir)?;
    }

    let mut rows = Vec::with_capacity(config.resolutions.len() * config.replicates);
    for (ri, &groups) in config.resolutions.iter().enumerate() {
        let setting_started = Instant::now();

        let run_replicate = |r: usize| -> Result<ResultRow> {
            let stream = (ri * config.replicates + r) as u64;
            let mut rng = replicate_rng(config.seed, stream);
            let synthesis = synthesizer.synthesize_with_rng(graph, &budget, groups, &mut rng)?;
            let scores = baseline.score(&synthesis.graph, &mut rng)?;
            if config.save_graphs {
                let path = graphs_dir.join(format!("{groups}_{r}.txt"));
                write_edge_list(path, &synthesis.graph, Some(&loaded.labels))?;
            }
            debug!(groups, replicate = r, nmi = scores.nmi, "replicate scored");
            Ok(ResultRow {
                eps: budget.epsilon(),
                exper: r,
                n: groups,
                nmi: scores.nmi,
                evc_overlap: scores.evc_overlap,
                evc_mae: scores.evc_mae,
                deg_kl: scores.deg_kl,
                diam_rel: scores.diam_rel,
                cc_rel: scores.cc_rel,
                mod_rel: scores.mod_rel,
            })
        };

        let mut slots: Vec<Option<Result<ResultRow>>> =
            (0..config.replicates).map(|_| None).collect();

        #[cfg(feature = "parallel")]
        {
            slots
                .par_iter_mut()
                .enumerate()
                .for_each(|(r, slot)| *slot = Some(run_replicate(r)));
        }

        #[cfg(not(feature = "parallel"))]
        {
            for (r, slot) in slots.iter_mut().enumerate() {
                *slot = Some(run_replicate(r));
            }
        }

        for slot in slots.into_iter().flatten() {
            rows.push(slot?);
        }
        info!(
            index = ri + 1,
            total = config.resolutions.len(),
            groups,
            elapsed_s = setting_started.elapsed().as_secs_f64(),
            "resolution done"
        );
    }

    let path = if config.save_csv {
        let path = config.output_path();
        write_rows(&path, &rows)?;
        Some(path)
    } else {
        None
    };

    info!(
        dataset = %config.dataset,
        rows = rows.len(),
        elapsed_s = started.elapsed().as_secs_f64(),
        "experiment done"
    );
    Ok(RunOutcome::Completed { rows, path })
}

/// Write through a sibling temporary file, then rename into place.
fn write_rows(path: &Path, rows: &[ResultRow]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// The grid of budget splits and resolutions run for one ε.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    /// Total budget.
    pub epsilon: f64,
    /// Resolutions to run each split with.
    pub resolutions: Vec<usize>,
    /// `(e1_ratio, e2_ratio)` pairs.
    pub splits: Vec<(f64, f64)>,
}

impl SweepPlan {
    /// Splits in tenths with `e1, e2 ∈ {0.1..0.8}` and `e1 + e2 < 1`.
    /// Small budgets get a longer resolution list (5 to 55, else 5 to 35).
    pub fn for_epsilon(epsilon: f64) -> Self {
        let top = if epsilon <= 1.0 { 55 } else { 35 };
        let resolutions = (5..=top).step_by(5).collect();
        let mut splits = Vec::new();
        for e1 in 1..=8u32 {
            for e2 in 1..=8u32 {
                if e1 + e2 < 10 {
                    splits.push((f64::from(e1) / 10.0, f64::from(e2) / 10.0));
                }
            }
        }
        Self {
            epsilon,
            resolutions,
            splits,
        }
    }

    /// One experiment config per split, derived from `base`.
    pub fn configs(&self, base: &ExperimentConfig) -> Vec<ExperimentConfig> {
        self.splits
            .iter()
            .map(|&(e1, e2)| ExperimentConfig {
                resolutions: self.resolutions.clone(),
                ..base.with_split(self.epsilon, e1, e2)
            })
            .collect()
    }
}

/// Run the full split grid for every ε in `epsilons`.
///
/// The dataset is read once, and only if some experiment is not already
/// done.
pub fn run_sweep(base: &ExperimentConfig, epsilons: &[f64]) -> Result<Vec<RunOutcome>> {
    let configs: Vec<ExperimentConfig> = epsilons
        .iter()
        .flat_map(|&eps| SweepPlan::for_epsilon(eps).configs(base))
        .collect();
    info!(experiments = configs.len(), "starting sweep");

    let mut loaded: Option<LoadedGraph> = None;
    let mut outcomes = Vec::with_capacity(configs.len());
    for config in &configs {
        config.validate()?;
        if let Some(path) = already_done(config) {
            warn!(path = %path.display(), "result table exists, skipping");
            outcomes.push(RunOutcome::Skipped { path });
            continue;
        }
        let graph = match loaded.take() {
            Some(g) => g,
            None => read_edge_list(config.input_path())?,
        };
        outcomes.push(run_experiment(config, &graph)?);
        loaded = Some(graph);
    }
    Ok(outcomes)
}
