//! Run configuration.
//!
//! Every section has defaults, so a TOML file only needs the keys it
//! changes:
//!
//! ```toml
//! dataset = "Chamelon"
//! epsilon = 2.0
//! e1_ratio = 0.33
//! e2_ratio = 0.33
//! resolutions = [10, 20, 30]
//!
//! [pipeline.reconstruction]
//! intra = "chung_lu"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::budget::PrivacyBudget;
use crate::community::{CommunityInitializer, CommunityRefiner, Louvain};
use crate::error::{Error, Result};
use crate::reconstruct::{GraphReconstructor, IntraStrategy};

/// Louvain settings for the initial partition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InitializerConfig {
    /// Louvain resolution on the noisy super-graph.
    pub resolution: f64,
    /// Louvain aggregation levels.
    pub max_levels: usize,
}

impl Default for InitializerConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            max_levels: 10,
        }
    }
}

impl InitializerConfig {
    /// Build the configured initializer.
    pub fn build(&self) -> CommunityInitializer {
        CommunityInitializer::new().with_louvain(
            Louvain::new()
                .with_resolution(self.resolution)
                .with_max_levels(self.max_levels),
        )
    }
}

/// Exponential-mechanism refinement settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RefinerConfig {
    /// Passes the refinement budget is split across.
    pub max_passes: usize,
    /// Modularity resolution of the move utility.
    pub resolution: f64,
    /// Utility sensitivity Δu of each move selection.
    pub sensitivity: f64,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            max_passes: 10,
            resolution: 1.0,
            sensitivity: 1.0,
        }
    }
}

impl RefinerConfig {
    /// Build the configured refiner.
    pub fn build(&self) -> CommunityRefiner {
        CommunityRefiner::new()
            .with_max_passes(self.max_passes)
            .with_resolution(self.resolution)
            .with_sensitivity(self.sensitivity)
    }
}

/// Reconstruction settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Intra-community realization strategy.
    pub intra: IntraStrategy,
}

impl ReconstructionConfig {
    /// Build the configured reconstructor.
    pub fn build(&self) -> GraphReconstructor {
        GraphReconstructor::new().with_intra(self.intra)
    }
}

/// Algorithm settings of one synthesis replicate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Initial partitioning.
    pub initializer: InitializerConfig,
    /// Refinement.
    pub refiner: RefinerConfig,
    /// Reconstruction.
    pub reconstruction: ReconstructionConfig,
}

impl PipelineConfig {
    /// Reject settings no stage can run with.
    pub fn validate(&self) -> Result<()> {
        for (name, r) in [
            ("initializer.resolution", self.initializer.resolution),
            ("refiner.resolution", self.refiner.resolution),
            ("refiner.sensitivity", self.refiner.sensitivity),
        ] {
            if !r.is_finite() || r <= 0.0 {
                return Err(Error::InvalidParameter {
                    name,
                    message: format!("must be finite and > 0, got {r}"),
                });
            }
        }
        Ok(())
    }
}

/// One experiment: a dataset, a budget split, and the resolutions and
/// replicates to run it with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Dataset name; the edge list is `{data_dir}/{dataset}.txt`.
    pub dataset: String,
    /// Directory holding edge-list files.
    pub data_dir: PathBuf,
    /// Directory result tables are written to.
    pub output_dir: PathBuf,
    /// Total privacy budget ε.
    pub epsilon: f64,
    /// Fraction of ε spent on the initial partition.
    pub e1_ratio: f64,
    /// Fraction of ε spent on refinement.
    pub e2_ratio: f64,
    /// Initial partition resolutions (number of random super-nodes).
    pub resolutions: Vec<usize>,
    /// Replicates per resolution.
    pub replicates: usize,
    /// Base seed; replicate `r` of resolution index `i` draws from stream
    /// `i * replicates + r`.
    pub seed: u64,
    /// Write the result table.
    pub save_csv: bool,
    /// Also write every synthetic graph as an edge list.
    pub save_graphs: bool,
    /// Algorithm settings.
    pub pipeline: PipelineConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            dataset: "Chamelon".into(),
            data_dir: PathBuf::from("./data"),
            output_dir: PathBuf::from("./our_results"),
            epsilon: 2.0,
            e1_ratio: 1.0 / 3.0,
            e2_ratio: 1.0 / 3.0,
            resolutions: vec![10, 20],
            replicates: 10,
            seed: 0,
            save_csv: true,
            save_graphs: false,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the budget split, resolutions and pipeline settings.
    pub fn validate(&self) -> Result<()> {
        if self.dataset.is_empty() {
            return Err(Error::InvalidParameter {
                name: "dataset",
                message: "must not be empty".into(),
            });
        }
        self.budget()?;
        if self.resolutions.is_empty() || self.resolutions.contains(&0) {
            return Err(Error::InvalidParameter {
                name: "resolutions",
                message: format!("need at least one resolution, all >= 1, got {:?}", self.resolutions),
            });
        }
        if self.replicates == 0 {
            return Err(Error::InvalidParameter {
                name: "replicates",
                message: "must be at least 1".into(),
            });
        }
        self.pipeline.validate()
    }

    /// The validated budget split.
    pub fn budget(&self) -> Result<PrivacyBudget> {
        PrivacyBudget::split(self.epsilon, self.e1_ratio, self.e2_ratio)
    }

    /// Edge-list file of the dataset.
    pub fn input_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.txt", self.dataset))
    }

    /// Result table path. Used both for the resume check and for the write.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{:.2}_{:.2}_{:.2}_{}.csv",
            self.dataset, self.epsilon, self.e1_ratio, self.e2_ratio, self.replicates
        ))
    }

    /// Directory for synthetic edge lists of this run.
    pub fn graphs_dir(&self) -> PathBuf {
        let mut stem = self.output_path();
        stem.set_extension("");
        stem
    }

    /// Copy with a different budget split.
    pub fn with_split(&self, epsilon: f64, e1_ratio: f64, e2_ratio: f64) -> Self {
        Self {
            epsilon,
            e1_ratio,
            e2_ratio,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_validate() {
        let config = ExperimentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.pipeline.reconstruction.intra, IntraStrategy::HavelHakimi);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ExperimentConfig::from_toml_str(
            r#"
            dataset = "Facebook"
            epsilon = 1.5
            resolutions = [5, 15]

            [pipeline.reconstruction]
            intra = "chung_lu"

            [pipeline.refiner]
            max_passes = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.dataset, "Facebook");
        assert_eq!(config.resolutions, vec![5, 15]);
        assert_eq!(config.replicates, 10);
        assert_eq!(config.pipeline.reconstruction.intra, IntraStrategy::ChungLu);
        assert_eq!(config.pipeline.refiner.max_passes, 4);
        assert_eq!(config.pipeline.refiner.resolution, 1.0);
        assert_eq!(config.pipeline.refiner.sensitivity, 1.0);
    }

    #[test]
    fn test_refiner_sensitivity_from_toml() {
        let config = ExperimentConfig::from_toml_str("[pipeline.refiner]\nsensitivity = 2.0\n").unwrap();
        assert_eq!(config.pipeline.refiner.sensitivity, 2.0);
        let r = ExperimentConfig::from_toml_str("[pipeline.refiner]\nsensitivity = 0.0\n");
        assert!(matches!(r, Err(Error::InvalidParameter { name: "refiner.sensitivity", .. })));
    }

    #[test]
    fn test_rejects_bad_budget() {
        let r = ExperimentConfig::from_toml_str("e1_ratio = 0.7\ne2_ratio = 0.5\n");
        assert!(matches!(r, Err(Error::InvalidBudget(_))));
    }

    #[test]
    fn test_rejects_bad_toml() {
        let r = ExperimentConfig::from_toml_str("epsilon = \"lots\"");
        assert!(matches!(r, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_resolution() {
        let r = ExperimentConfig::from_toml_str("resolutions = [0, 5]");
        assert!(matches!(r, Err(Error::InvalidParameter { name: "resolutions", .. })));
    }

    #[test]
    fn test_output_path_format() {
        let config = ExperimentConfig {
            dataset: "Chamelon".into(),
            output_dir: PathBuf::from("out"),
            epsilon: 2.0,
            e1_ratio: 0.1,
            e2_ratio: 0.4,
            replicates: 10,
            ..ExperimentConfig::default()
        };
        assert_eq!(config.output_path(), PathBuf::from("out/Chamelon_2.00_0.10_0.40_10.csv"));
        assert_eq!(config.graphs_dir(), PathBuf::from("out/Chamelon_2.00_0.10_0.40_10"));
        assert_eq!(config.input_path(), PathBuf::from("./data/Chamelon.txt"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(&path, "dataset = \"Tiny\"\nreplicates = 2\n").unwrap();
        let config = ExperimentConfig::load(&path).unwrap();
        assert_eq!(config.dataset, "Tiny");
        assert_eq!(config.replicates, 2);
    }
}
