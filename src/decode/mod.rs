//! Implementation of `decode` subcommand.

use std::io::Write;

use thousands::Separable;

use crate::{
    codec::SliceDecoder,
    common::{self, io::open_write_maybe_gz},
    slicefile::Reader,
    stats::{VariantStats, COHORT_ALL},
};

/// Command line arguments for `decode` subcommand.
#[derive(Debug, Default, clap::Parser)]
#[command(author, version, about = "Decode slices into JSONL variants", long_about = None)]
pub struct Args {
    /// Path to input slice file.
    #[clap(long)]
    pub path_in: String,
    /// Path to output JSONL file, gzip compressed if ending in `.gz`.
    #[clap(long)]
    pub path_out: String,
    /// Compute statistics over all samples for each variant.
    #[clap(long, default_value_t = false)]
    pub with_stats: bool,
}

/// Main entry point for `decode` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<usize, anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let reader = Reader::from_path(&args.path_in)?;
    tracing::info!("header = {:?}", reader.header());
    let decoder = SliceDecoder::from_header(reader.header());

    let mut writer = open_write_maybe_gz(&args.path_out)
        .map_err(|e| anyhow::anyhow!("could not open output file {}: {}", &args.path_out, e))?;
    let mut total_written = 0usize;
    for slice in reader {
        let slice = slice?;
        let variants = decoder.convert(&slice).map_err(|e| {
            anyhow::anyhow!(
                "problem decoding slice {}:{}: {}",
                &slice.chromosome,
                slice.position,
                e
            )
        })?;
        for mut variant in variants {
            if args.with_stats {
                let (reference, alternate) = (variant.reference.clone(), variant.alternate.clone());
                for study in variant.studies.iter_mut() {
                    if let Some(stats) = VariantStats::from_study(study, &reference, &alternate) {
                        study.stats.insert(COHORT_ALL.to_string(), stats);
                    }
                }
            }
            serde_json::to_writer(&mut writer, &variant)?;
            writer.write_all(b"\n")?;
            total_written += 1;
        }
    }
    writer.flush()?;

    tracing::info!(
        "... decoded {} variants in {:?}",
        total_written.separate_with_commas(),
        before_anything.elapsed()
    );
    Ok(total_written)
}
