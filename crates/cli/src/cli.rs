//! CLI definitions and command dispatch.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use dssketch_ufo::validate_sources;
use log::LevelFilter;

use crate::{
    convert::{ConvertOptions, OutputFormat, convert_file, load},
    io::{DocumentFile, DocumentKind, expand_inputs},
    labels::load_labels,
    parallel::run_parallel,
};

#[derive(Parser)]
#[command(name = "dssketch")]
#[command(about = "Convert between .dssketch and .designspace files")]
pub struct Cli {
    /// More log output; repeat for debug logging.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log filter for the verbosity level; `RUST_LOG` still wins.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => LevelFilter::Warn.as_str(),
            1 => LevelFilter::Info.as_str(),
            _ => LevelFilter::Debug.as_str(),
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct ConvertArgs {
    /// Input files or glob patterns (.dssketch, .dss, .designspace).
    #[arg(required = true)]
    pub inputs: Vec<String>,
    /// Output file; only valid with a single input.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
    pub format: OutputFormat,
    /// Skip checking that master UFOs exist.
    #[arg(long)]
    pub no_validation: bool,
    /// Continue when master UFOs are missing or invalid.
    #[arg(long)]
    pub allow_missing_ufos: bool,
    /// Write avar2 values and instances exactly as read.
    #[arg(long)]
    pub no_optimize: bool,
    /// Label data (YAML) layered over the built-in labels.
    #[arg(long)]
    pub labels: Option<PathBuf>,
    /// Fail when a conversion produces warnings.
    #[arg(long)]
    pub strict: bool,
}

impl ConvertArgs {
    fn options(&self) -> ConvertOptions {
        ConvertOptions {
            format: self.format,
            validate: !self.no_validation,
            allow_missing_ufos: self.allow_missing_ufos,
            optimize: !self.no_optimize,
            strict: self.strict,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert files to the other format.
    Convert(ConvertArgs),
    /// Parse a file and report warnings and source problems without writing.
    Check {
        input: PathBuf,
        #[arg(long)]
        labels: Option<PathBuf>,
    },
}

impl Commands {
    pub fn run(self) -> Result<()> {
        match self {
            Commands::Convert(args) => {
                let inputs = expand_inputs(&args.inputs)?;
                if args.output.is_some() && inputs.len() > 1 {
                    bail!("--output can only be used with a single input, got {}", inputs.len());
                }
                let labels = load_labels(args.labels.as_deref())?;
                let options = args.options();
                let output = args.output.as_deref();
                run_parallel("convert", &inputs, |input| {
                    convert_file(input, output, &options, &labels).map(|_| ())
                })
                .ok_or_bail("convert")?;
            }
            Commands::Check { input, labels } => {
                let labels = load_labels(labels.as_deref())?;
                let (kind, loaded) = load(&input, &labels)?;
                for warning in &loaded.warnings {
                    println!("warning: {warning}");
                }
                if kind == DocumentKind::Sketch {
                    let base_dir = DocumentFile::new(&input).base_dir().to_path_buf();
                    println!("{}", validate_sources(&base_dir, &loaded.value.source_files()));
                }
                let document = &loaded.value;
                println!(
                    "{}: {} axes, {} masters, {} rules, {} avar2 mappings, {} instances",
                    input.display(),
                    document.axes.len(),
                    document.masters.len(),
                    document.rules.len(),
                    document.avar2_mappings.len(),
                    document.resolved_instances().len(),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_convert_flags() {
        let cli = Cli::parse_from([
            "dssketch", "-vv", "convert", "a.dssketch", "--format", "dss", "--no-optimize", "--strict",
        ]);
        assert_eq!(cli.log_level(), "DEBUG");
        let Commands::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        let options = args.options();
        assert_eq!(options.format, OutputFormat::Dss);
        assert!(options.validate && options.strict && !options.optimize);
    }
}
