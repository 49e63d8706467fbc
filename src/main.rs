//! VCF slice encoder main executable

use clap::{Parser, Subcommand};
use console::{Emoji, Term};
use thousands::Separable;

use vcf_slice::{common, decode, encode, inspect};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Columnar VCF slice codec",
    long_about = "This tool encodes VCF files into compact slices and decodes them back"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Encode a VCF file into a slice file.
    Encode(encode::Args),
    /// Decode a slice file into JSONL variants.
    Decode(decode::Args),
    /// Print a summary of each slice.
    Inspect(inspect::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(cli.common.tracing_level())
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Encode(args) => {
                let counts = encode::run(&cli.common, args)?;
                term.write_line(&format!(
                    "Wrote {} slices.",
                    counts.slices.separate_with_commas()
                ))?;
            }
            Commands::Decode(args) => {
                let count = decode::run(&cli.common, args)?;
                term.write_line(&format!(
                    "Wrote {} variants.",
                    count.separate_with_commas()
                ))?;
            }
            Commands::Inspect(args) => inspect::run(&cli.common, args)?,
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}
