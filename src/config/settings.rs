//! Configuration settings for the sudoku SAT solver

use crate::sat::builder::{default_workers, CompileOptions};
use crate::sat::cardinality::{CardinalityPolicy, Encoding};
use crate::sat::simplify::SimplifyOptions;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub encoding: EncodingConfig,
    pub builder: BuilderConfig,
    pub propagation: PropagationConfig,
    pub simplify: SimplifyConfig,
    pub solver: SolverConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Number only the open candidates as SAT variables.
    pub compress_literals: bool,
    /// Groups up to this size use the pairwise encoding.
    pub pairwise_max: usize,
    pub large_encoding: Encoding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub mode: BuildMode,
    /// Worker threads for the parallel builder; defaults to the available parallelism.
    pub workers: Option<usize>,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Run naked and hidden singles before encoding.
    pub singles: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifyConfig {
    pub enabled: bool,
    pub pure_literal_elimination: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SolverBackend {
    Cadical,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: SolverBackend,
    /// Command line of the external solver, split on spaces.
    pub command: Option<String>,
    /// Compute a minimal unsatisfiable subset when a puzzle has no solution.
    pub explain_unsat: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One line per puzzle
    Text,
    Json,
    /// Padded grid with block separators
    Visual,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            compress_literals: true,
            pairwise_max: 6,
            large_encoding: Encoding::Bimander,
        }
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            mode: BuildMode::Sequential,
            workers: None,
            queue_capacity: 64,
        }
    }
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self { singles: true }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverBackend::Cadical,
            command: None,
            explain_unsat: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Visual,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self).context("Failed to serialize settings")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.builder.workers == Some(0) {
            anyhow::bail!("Number of workers must be positive");
        }

        if self.builder.queue_capacity == 0 {
            anyhow::bail!("Queue capacity must be positive");
        }

        if self.solver.backend == SolverBackend::External
            && self.solver.command.as_deref().map_or(true, |c| c.trim().is_empty())
        {
            anyhow::bail!("The external solver backend needs a command");
        }

        Ok(())
    }

    /// Merge settings with command line overrides
    pub fn merge_with_cli(&mut self, cli_overrides: &CliOverrides) {
        if let Some(mode) = cli_overrides.mode {
            self.builder.mode = mode;
        }
        if let Some(workers) = cli_overrides.workers {
            self.builder.workers = Some(workers);
        }
        if let Some(encoding) = cli_overrides.encoding {
            self.encoding.large_encoding = encoding;
        }
        if let Some(backend) = cli_overrides.backend {
            self.solver.backend = backend;
        }
        if let Some(ref command) = cli_overrides.command {
            self.solver.command = Some(command.clone());
        }
        if let Some(format) = cli_overrides.format {
            self.output.format = format;
        }
        if cli_overrides.no_compress {
            self.encoding.compress_literals = false;
        }
        if cli_overrides.simplify {
            self.simplify.enabled = true;
        }
        if cli_overrides.explain_unsat {
            self.solver.explain_unsat = true;
        }
    }

    pub fn policy(&self) -> CardinalityPolicy {
        CardinalityPolicy {
            pairwise_max: self.encoding.pairwise_max,
            large: self.encoding.large_encoding,
        }
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            compress: self.encoding.compress_literals,
            policy: self.policy(),
            mode: self.builder.mode,
            workers: self.builder.workers.unwrap_or_else(default_workers),
            queue_capacity: self.builder.queue_capacity,
        }
    }

    pub fn simplify_options(&self) -> SimplifyOptions {
        SimplifyOptions {
            pure_literal_elimination: self.simplify.pure_literal_elimination,
        }
    }
}

/// Command line overrides for settings
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub mode: Option<BuildMode>,
    pub workers: Option<usize>,
    pub encoding: Option<Encoding>,
    pub backend: Option<SolverBackend>,
    pub command: Option<String>,
    pub format: Option<OutputFormat>,
    pub no_compress: bool,
    pub simplify: bool,
    pub explain_unsat: bool,
}
