//! Implementation of `encode` subcommand.

use thousands::Separable;

use crate::{
    codec::SliceEncoder,
    common,
    conf::SliceConf,
    model::vcf::{open_reader, VcfConverter},
    pbs::SliceFileHeader,
    slicefile::{Chunk, Chunker, Writer},
};

/// Command line arguments for `encode` subcommand.
#[derive(Debug, Default, clap::Parser)]
#[command(author, version, about = "Encode VCF file into slices", long_about = None)]
pub struct Args {
    /// Path to input VCF file, optionally gzip compressed.
    #[clap(long)]
    pub path_in: String,
    /// Path to output slice file, gzip compressed if ending in `.gz`.
    #[clap(long)]
    pub path_out: String,
    /// Path to TOML configuration file; optional.
    #[clap(long)]
    pub path_conf: Option<String>,
    /// Study identifier, overrides configuration.
    #[clap(long)]
    pub study_id: Option<String>,
    /// File identifier, overrides configuration.
    #[clap(long)]
    pub file_id: Option<String>,
    /// Maximal number of VCF records to read; optional.
    #[clap(long)]
    pub max_var_count: Option<usize>,
}

/// Load configuration and apply the overrides from `args`.
fn load_conf(args: &Args) -> Result<SliceConf, anyhow::Error> {
    let mut conf = match &args.path_conf {
        Some(path_conf) => SliceConf::from_path(path_conf)?,
        None => SliceConf::default(),
    };
    if let Some(study_id) = &args.study_id {
        conf.study_id = study_id.clone();
    }
    if let Some(file_id) = &args.file_id {
        conf.file_id = file_id.clone();
    }
    Ok(conf)
}

/// Counters of one `encode` run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub records: usize,
    pub variants: usize,
    pub slices: usize,
}

/// Encode `chunk` and append it to `writer`.
fn write_chunk(
    encoder: &SliceEncoder,
    writer: &mut Writer,
    chunk: Chunk,
    counts: &mut Counts,
) -> Result<(), anyhow::Error> {
    let slice = encoder
        .convert(&chunk.variants, Some(chunk.position))
        .map_err(|e| anyhow::anyhow!("problem encoding slice at {}: {}", chunk.position, e))?;
    tracing::debug!(
        "slice {}:{} with {} records",
        &slice.chromosome,
        slice.position,
        slice.records.len()
    );
    writer.write_slice(&slice)?;
    counts.variants += chunk.variants.len();
    counts.slices += 1;
    Ok(())
}

/// Main entry point for `encode` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<Counts, anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let conf = load_conf(args)?;
    tracing::info!("conf = {:#?}", &conf);

    tracing::info!("opening input file...");
    let (mut reader, header) = open_reader(&args.path_in)?;
    let converter = VcfConverter::from_header(&conf.study_id, &conf.file_id, &header);

    let file_header = SliceFileHeader {
        study_id: conf.study_id.clone(),
        file_id: conf.file_id.clone(),
        sample_names: header.sample_names().iter().cloned().collect(),
        version: common::worker_version().to_string(),
    };
    let mut writer = Writer::from_path(&args.path_out, &file_header)?;

    tracing::info!("encoding records...");
    let encoder = SliceEncoder::new(conf.selection());
    let mut chunker = Chunker::new(conf.chunk_size);
    let mut counts = Counts::default();
    for result in reader.records() {
        let record = result.map_err(|e| anyhow::anyhow!("problem reading VCF record: {}", e))?;
        for variant in converter.convert(&record)? {
            if let Some(chunk) = chunker.push(variant) {
                write_chunk(&encoder, &mut writer, chunk, &mut counts)?;
            }
        }

        counts.records += 1;
        if let Some(max_var_count) = args.max_var_count {
            if counts.records >= max_var_count {
                tracing::warn!(
                    "Stopping after {} records as requested by --max-var-count",
                    counts.records
                );
                break;
            }
        }
    }
    if let Some(chunk) = chunker.finish() {
        write_chunk(&encoder, &mut writer, chunk, &mut counts)?;
    }
    writer.flush()?;

    tracing::info!(
        "... encoded {} records ({} variants) into {} slices",
        counts.records.separate_with_commas(),
        counts.variants.separate_with_commas(),
        counts.slices.separate_with_commas()
    );
    tracing::info!(
        "All of `encode` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(counts)
}
