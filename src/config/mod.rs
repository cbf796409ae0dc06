//! Configuration management for the sudoku SAT solver

pub mod settings;

pub use settings::{
    BuildMode, BuilderConfig, CliOverrides, EncodingConfig, OutputConfig, OutputFormat, PropagationConfig,
    Settings, SimplifyConfig, SolverBackend, SolverConfig,
};
