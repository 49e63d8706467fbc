//! Implementation of `inspect` subcommand.

use std::io::Write;

use indexmap::IndexMap;
use itertools::Itertools;

use crate::{
    common,
    pbs::{variant_type_from_i32, VcfSlice},
    slicefile::Reader,
};

/// Command line arguments for `inspect` subcommand.
#[derive(Debug, Default, clap::Parser)]
#[command(author, version, about = "Print summary of slices as JSON lines", long_about = None)]
pub struct Args {
    /// Path to input slice file.
    #[clap(long)]
    pub path_in: String,
}

/// Summary of one slice.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SliceSummary {
    pub chromosome: String,
    pub position: u32,
    pub records: usize,
    /// Last start covered, relative offsets applied.
    pub max_start: Option<i64>,
    pub filters: Vec<String>,
    pub info_keys: Vec<String>,
    pub formats: Vec<String>,
    pub gts: usize,
    /// Number of records per variant type.
    pub variant_types: IndexMap<String, usize>,
}

impl From<&VcfSlice> for SliceSummary {
    fn from(slice: &VcfSlice) -> Self {
        let fields = slice.fields.clone().unwrap_or_default();
        Self {
            chromosome: slice.chromosome.clone(),
            position: slice.position,
            records: slice.records.len(),
            max_start: slice
                .records
                .iter()
                .map(|record| i64::from(slice.position) + i64::from(record.relative_start))
                .max(),
            filters: fields.filters,
            info_keys: fields.info_keys,
            formats: fields.formats,
            gts: fields.gts.len(),
            variant_types: slice
                .records
                .iter()
                .map(|record| {
                    variant_type_from_i32(record.variant_type)
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| format!("UNKNOWN({})", record.variant_type))
                })
                .counts()
                .into_iter()
                .sorted()
                .collect(),
        }
    }
}

/// Write one JSON line per slice of `reader` to `out`.
pub fn summarize<W: Write>(reader: Reader, out: &mut W) -> Result<usize, anyhow::Error> {
    let mut count = 0;
    for slice in reader {
        serde_json::to_writer(&mut *out, &SliceSummary::from(&slice?))?;
        out.write_all(b"\n")?;
        count += 1;
    }
    Ok(count)
}

/// Main entry point for `inspect` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let reader = Reader::from_path(&args.path_in)?;
    tracing::info!("header = {:?}", reader.header());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let count = summarize(reader, &mut out)?;
    out.flush()?;

    tracing::info!("... inspected {} slices", count);
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::SliceSummary;
    use crate::slicefile::Reader;

    #[test]
    fn summarize_example() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let args = crate::encode::Args {
            path_in: "tests/data/example.vcf".into(),
            path_out: tmpdir.join("out.bin").to_str().expect("invalid path").into(),
            ..Default::default()
        };
        crate::encode::run(&Default::default(), &args)?;

        let mut buf = Vec::new();
        let count = super::summarize(Reader::from_path(&args.path_out)?, &mut buf)?;
        assert_eq!(count, 3);

        let summaries = String::from_utf8(buf)?
            .lines()
            .map(serde_json::from_str::<SliceSummary>)
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(
            summaries[0],
            SliceSummary {
                chromosome: "chr1".into(),
                position: 1000,
                records: 4,
                max_start: Some(1020),
                filters: vec!["PASS".into(), "q10".into()],
                info_keys: vec!["AF".into(), "DP".into(), "DB".into()],
                formats: vec!["GT:DP:GQ".into(), "GT:DP".into()],
                gts: 6,
                variant_types: [("INDEL".to_string(), 1), ("SNV".to_string(), 3)]
                    .into_iter()
                    .collect(),
            }
        );
        assert_eq!(summaries[2].chromosome, "chr2");
        assert_eq!(summaries[2].variant_types.get("SV"), Some(&1));

        Ok(())
    }
}
