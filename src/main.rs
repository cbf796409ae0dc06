//! Main CLI application for the sudoku SAT solver

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use sudoku_sat::{
    config::{BuildMode, CliOverrides, OutputFormat, Settings, SolverBackend},
    sat::{solve_many, Encoding, PuzzleOutcome, SudokuEncoder},
    sudoku::{load_board_from_file, parse_board, Board},
    utils::{ColorOutput, SolutionFormatter},
};
use tracing_subscriber::EnvFilter;

const EXAMPLE_9X9: &str =
    "100007090030020008009600500005300900010080002600004000300000010041000007007000300";
const EXAMPLE_4X4: &str = "1..4..1..1..4..1";

#[derive(Parser)]
#[command(name = "sudoku_sat")]
#[command(about = "Generalized sudoku SAT compiler and solver")]
#[command(version = "0.1.0")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that compiles a puzzle
#[derive(Args, Debug, Default)]
struct PipelineArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    /// Formula builder (overrides config)
    #[arg(long, value_enum)]
    mode: Option<BuildMode>,

    /// Worker threads for the parallel builder (overrides config)
    #[arg(short, long)]
    workers: Option<usize>,

    /// At-most-one encoding for large groups (overrides config)
    #[arg(short, long, value_enum)]
    encoding: Option<Encoding>,

    /// SAT backend (overrides config)
    #[arg(short, long, value_enum)]
    backend: Option<SolverBackend>,

    /// External solver command line, e.g. "kissat -q"
    #[arg(long)]
    command: Option<String>,

    /// Keep the raw literal space instead of compressing variables
    #[arg(long)]
    no_compress: bool,

    /// Run the watched-literal simplifier before solving
    #[arg(long)]
    simplify: bool,

    /// Print a minimal unsatisfiable subset when a puzzle has no solution
    #[arg(long)]
    explain_unsat: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the DIMACS CNF of a puzzle
    Cnf {
        /// Puzzle file; reads stdin when omitted
        input: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Solve a single puzzle
    Solve {
        /// Puzzle file; reads stdin when omitted
        input: Option<PathBuf>,

        /// Output format (overrides config)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Print encoding statistics
        #[arg(long)]
        stats: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Solve one compact puzzle per stdin line, printing one line per puzzle
    Many {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Create example configuration and puzzle files
    Setup {
        /// Directory to create files in
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,

        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Cnf { input, pipeline } => cnf_command(input, pipeline),
        Commands::Solve {
            input,
            format,
            stats,
            pipeline,
        } => solve_command(input, format, stats, pipeline),
        Commands::Many { pipeline } => many_command(pipeline),
        Commands::Setup { directory, force } => setup_command(directory, force),
    }
}

/// Load the configuration file (or defaults) and apply the command line overrides
fn load_settings(pipeline: &PipelineArgs, format: Option<OutputFormat>) -> Result<Settings> {
    let mut settings = if pipeline.config.exists() {
        Settings::from_file(&pipeline.config)
            .with_context(|| format!("Failed to load config from {}", pipeline.config.display()))?
    } else {
        tracing::debug!("Config file {} not found, using defaults", pipeline.config.display());
        Settings::default()
    };

    let cli_overrides = CliOverrides {
        mode: pipeline.mode,
        workers: pipeline.workers,
        encoding: pipeline.encoding,
        backend: pipeline.backend,
        command: pipeline.command.clone(),
        format,
        no_compress: pipeline.no_compress,
        simplify: pipeline.simplify,
        explain_unsat: pipeline.explain_unsat,
    };
    settings.merge_with_cli(&cli_overrides);

    settings.validate().context("Configuration validation failed")?;
    Ok(settings)
}

fn read_board(input: Option<&Path>) -> Result<Board> {
    match input {
        Some(path) => load_board_from_file(path),
        None => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read puzzle from stdin")?;
            parse_board(&content).context("Failed to parse puzzle from stdin")
        }
    }
}

fn cnf_command(input: Option<PathBuf>, pipeline: PipelineArgs) -> Result<()> {
    let settings = load_settings(&pipeline, None)?;
    let mut board = read_board(input.as_deref())?;

    let encoder = SudokuEncoder::new(settings).context("Failed to create encoder")?;
    let (formula, _) = encoder.encode(&mut board).context("Failed to compile puzzle")?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    formula.write_dimacs(&mut out).context("Failed to write DIMACS")?;
    out.flush()?;
    Ok(())
}

fn solve_command(
    input: Option<PathBuf>,
    format: Option<OutputFormat>,
    stats: bool,
    pipeline: PipelineArgs,
) -> Result<()> {
    let settings = load_settings(&pipeline, format)?;
    let format = settings.output.format;
    let board = read_board(input.as_deref())?;

    let start_time = Instant::now();
    let encoder = SudokuEncoder::new(settings).context("Failed to create encoder")?;
    let report = encoder.solve(board).context("Failed to solve puzzle")?;
    let total_time = start_time.elapsed();

    println!("{}", SolutionFormatter::format_report(&report, format)?);

    // the JSON document already carries the statistics
    if format != OutputFormat::Json {
        match report.outcome {
            PuzzleOutcome::Solved(_) => eprintln!(
                "{}",
                ColorOutput::success(&format!("Solved in {:.3}s", total_time.as_secs_f64()))
            ),
            PuzzleOutcome::Unsat { .. } => eprintln!("{}", ColorOutput::warning("No solution")),
        }
        if stats {
            eprintln!("\n{}", report.statistics);
        }
    }

    Ok(())
}

fn many_command(pipeline: PipelineArgs) -> Result<()> {
    let settings = load_settings(&pipeline, None)?;

    let start_time = Instant::now();
    let stdin = io::stdin();
    let stdout = io::stdout();
    let summary = solve_many(stdin.lock(), BufWriter::new(stdout.lock()), &settings)
        .context("Failed to solve puzzles")?;

    eprintln!(
        "{}",
        ColorOutput::info(&format!(
            "{} solved, {} unsatisfiable in {:.3}s",
            summary.solved,
            summary.unsat,
            start_time.elapsed().as_secs_f64()
        ))
    );
    Ok(())
}

fn setup_command(directory: PathBuf, force: bool) -> Result<()> {
    println!("{}", ColorOutput::info("Setting up project structure..."));

    let config_dir = directory.join("config");
    let examples_dir = config_dir.join("examples");
    let puzzle_dir = directory.join("puzzles");

    for dir in [&config_dir, &examples_dir, &puzzle_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    let config_path = config_dir.join("default.yaml");
    if !config_path.exists() || force {
        Settings::default()
            .to_file(&config_path)
            .context("Failed to create default configuration")?;
        println!("Created: {}", config_path.display());
    } else {
        println!("Skipped: {} (already exists)", config_path.display());
    }

    let mut parallel = Settings::default();
    parallel.builder.mode = BuildMode::Parallel;
    parallel.encoding.large_encoding = Encoding::Commander;
    parallel.to_file(examples_dir.join("parallel.yaml"))?;

    // batch runs reuse a raw base formula and lean on the simplifier
    let mut batch = Settings::default();
    batch.simplify.enabled = true;
    batch.output.format = OutputFormat::Text;
    batch.to_file(examples_dir.join("batch.yaml"))?;
    println!("Created example configurations in: {}", examples_dir.display());

    for (name, puzzle) in [("escargot.txt", EXAMPLE_9X9), ("small.txt", EXAMPLE_4X4)] {
        let path = puzzle_dir.join(name);
        std::fs::write(&path, format!("{}\n", puzzle))
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    println!("Created example puzzles in: {}", puzzle_dir.display());

    println!("\n{}", ColorOutput::success("Setup complete!"));
    println!("\nNext steps:");
    println!("1. Edit configuration files in {}", config_dir.display());
    println!("2. Run: cargo run -- solve puzzles/escargot.txt");
    println!("3. Run: cargo run -- many < puzzles/escargot.txt");

    Ok(())
}
