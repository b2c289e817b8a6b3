//! vmclean - Variant Matrix Cleaning CLI
//!
//! Command-line interface for cleaning annotated variant matrices.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use vmclean::data::{AlleleMatrix, CodeMatrix, MatrixPair};
use vmclean::error::Result;
use vmclean::filter::{BugFilterConfig, PipeCheck};
use vmclean::pipeline::{CleanedMatrices, Pipeline, PipelineConfig};
use vmclean::profile::profile_annotations;

/// CLI-friendly pipe check enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPipeCheck {
    /// Every gene segment must hold exactly nine pipes
    PerSegment,
    /// Legacy pipes / (semicolons - 1) multiple-of-nine rule
    Ratio,
}

impl From<CliPipeCheck> for PipeCheck {
    fn from(check: CliPipeCheck) -> Self {
        match check {
            CliPipeCheck::PerSegment => PipeCheck::PerSegment,
            CliPipeCheck::Ratio => PipeCheck::Ratio,
        }
    }
}

/// Which kind of matrix a TSV file holds
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMatrixKind {
    /// Genotype codes (-4..3)
    Code,
    /// Allele calls (A, C, G, T, N, -)
    Allele,
}

/// Variant matrix annotation cleaning
#[derive(Parser)]
#[command(name = "vmclean")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline from a YAML configuration file
    Run {
        /// Path to pipeline configuration YAML
        #[arg(short = 'p', long)]
        config: PathBuf,

        /// Path to genotype-code matrix TSV
        #[arg(short = 'c', long)]
        codes: PathBuf,

        /// Path to allele matrix TSV
        #[arg(short, long)]
        alleles: PathBuf,

        /// Output directory for cleaned matrices and provenance
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Directory for dated audit logs (default: <output-dir>/logs)
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Run the standard clean: bug filter, presence filter, split
    Clean {
        /// Path to genotype-code matrix TSV
        #[arg(short = 'c', long)]
        codes: PathBuf,

        /// Path to allele matrix TSV
        #[arg(short, long)]
        alleles: PathBuf,

        /// Output directory for cleaned matrices and provenance
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Directory for dated audit logs (default: <output-dir>/logs)
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// How to validate the pipe structure of annotations
        #[arg(long, value_enum, default_value = "per-segment")]
        pipe_check: CliPipeCheck,

        /// Keep rows that have no locus_tag block at all
        #[arg(long)]
        allow_missing_locus_tag: bool,

        /// Skip splitting of multi-annotation rows
        #[arg(long)]
        no_split: bool,
    },

    /// Profile the annotations of a matrix
    Profile {
        /// Path to matrix TSV
        #[arg(short, long)]
        matrix: PathBuf,

        /// Kind of matrix
        #[arg(short, long, value_enum, default_value = "allele")]
        kind: CliMatrixKind,

        /// Output format: text, json, or yaml
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            codes,
            alleles,
            output_dir,
            log_dir,
        } => cmd_run(&config, &codes, &alleles, &output_dir, log_dir.as_deref()),

        Commands::Clean {
            codes,
            alleles,
            output_dir,
            log_dir,
            pipe_check,
            allow_missing_locus_tag,
            no_split,
        } => {
            let config = BugFilterConfig {
                pipe_check: pipe_check.into(),
                require_locus_tag: !allow_missing_locus_tag,
            };
            cmd_clean(
                &codes,
                &alleles,
                &output_dir,
                log_dir.as_deref(),
                config,
                no_split,
            )
        }

        Commands::Profile {
            matrix,
            kind,
            format,
        } => cmd_profile(&matrix, kind, &format),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_pair(codes_path: &Path, alleles_path: &Path) -> Result<MatrixPair> {
    eprintln!("Loading data...");
    let pair = MatrixPair::from_tsv(codes_path, alleles_path)?;
    eprintln!(
        "Loaded {} variants x {} samples",
        pair.n_rows(),
        pair.code().n_samples()
    );
    Ok(pair)
}

fn write_outputs(cleaned: &CleanedMatrices, output_dir: &Path, log_dir: Option<&Path>) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;

    let codes_out = output_dir.join("codes.cleaned.tsv");
    let alleles_out = output_dir.join("alleles.cleaned.tsv");
    eprintln!("Writing cleaned matrices to {:?}...", output_dir);
    cleaned.pair.to_tsv(&codes_out, &alleles_out)?;

    if let Some(provenance) = &cleaned.provenance {
        let provenance_out = output_dir.join("split_provenance.tsv");
        provenance.to_tsv(&provenance_out, cleaned.pair.labels())?;
        eprint!("{}", provenance);
    }

    let log_dir = log_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| output_dir.join("logs"));
    cleaned.audit.write_today(&log_dir)?;
    eprint!("{}", cleaned.audit);

    eprintln!("Done! {} rows in cleaned matrices", cleaned.pair.n_rows());
    Ok(())
}

/// Run a pipeline from configuration
fn cmd_run(
    config_path: &Path,
    codes_path: &Path,
    alleles_path: &Path,
    output_dir: &Path,
    log_dir: Option<&Path>,
) -> Result<()> {
    eprintln!("Loading pipeline configuration from {:?}...", config_path);
    let config_str = std::fs::read_to_string(config_path)?;
    let config = PipelineConfig::from_yaml(&config_str)?;

    let pair = load_pair(codes_path, alleles_path)?;

    eprintln!("Running pipeline '{}'...", config.name);
    let cleaned = Pipeline::from_config(&config).run(&pair)?;

    write_outputs(&cleaned, output_dir, log_dir)
}

/// Run the standard cleaning pipeline
fn cmd_clean(
    codes_path: &Path,
    alleles_path: &Path,
    output_dir: &Path,
    log_dir: Option<&Path>,
    config: BugFilterConfig,
    no_split: bool,
) -> Result<()> {
    let pair = load_pair(codes_path, alleles_path)?;

    eprintln!("Running standard clean...");
    eprintln!("  Pipe check: {:?}", config.pipe_check);
    eprintln!("  Require locus tag: {}", config.require_locus_tag);

    let mut pipeline = Pipeline::new()
        .name("clean")
        .remove_buggy_rows_with(config)
        .remove_invariant_rows();
    if !no_split {
        pipeline = pipeline.split_annotations();
    }
    let cleaned = pipeline.run(&pair)?;

    write_outputs(&cleaned, output_dir, log_dir)
}

/// Profile the annotations of a matrix
fn cmd_profile(matrix_path: &Path, kind: CliMatrixKind, format: &str) -> Result<()> {
    eprintln!("Loading matrix...");
    let labels = match kind {
        CliMatrixKind::Code => CodeMatrix::from_tsv(matrix_path)?.labels().to_vec(),
        CliMatrixKind::Allele => AlleleMatrix::from_tsv(matrix_path)?.labels().to_vec(),
    };

    let profile = profile_annotations(&labels, &BugFilterConfig::default());

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&profile)?),
        "yaml" => print!("{}", serde_yaml::to_string(&profile)?),
        _ => print!("{}", profile),
    }

    Ok(())
}
