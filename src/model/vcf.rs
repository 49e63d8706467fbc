//! Conversion of VCF records into [`Variant`]s.
//!
//! Multi-allelic records are decomposed into one variant per alternate allele.  The other
//! alleles are kept as secondary alternates and genotypes are re-encoded so that `1` always
//! refers to the primary alternate.  Per-allele INFO and FORMAT values, as declared by their
//! header `Number`, are reordered the same way.

use std::io::BufRead;

use indexmap::IndexMap;
use noodles_vcf as vcf;

use super::{
    AlternateCoordinate, FileEntry, StudyEntry, Variant, VariantType, FILTER, GT, MISSING, QUAL,
};

/// INFO key overriding the end position.
const END: &str = "END";
/// Value stored for INFO flags.
const FLAG_VALUE: &str = "true";

/// Open the VCF file at `path`, plain text or gzip compressed, and read its header.
pub fn open_reader<P>(
    path: P,
) -> Result<(vcf::io::Reader<Box<dyn BufRead>>, vcf::Header), anyhow::Error>
where
    P: AsRef<std::path::Path>,
{
    let mut reader = crate::common::io::open_read_maybe_gz(path.as_ref())
        .map(vcf::io::Reader::new)
        .map_err(|e| anyhow::anyhow!("could not open VCF file {:?}: {}", path.as_ref(), e))?;
    let header = reader
        .read_header()
        .map_err(|e| anyhow::anyhow!("problem reading VCF header: {}", e))?;
    Ok((reader, header))
}

/// The textual columns of one VCF line.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawRecord<'a> {
    pub chromosome: &'a str,
    pub position: u32,
    /// `;`-separated IDs.
    pub ids: &'a str,
    pub reference: &'a str,
    /// `,`-separated alternate alleles.
    pub alternates: &'a str,
    pub quality: Option<f32>,
    /// `;`-separated FILTER values.
    pub filters: &'a str,
    /// Raw INFO column.
    pub info: &'a str,
    /// FORMAT column followed by the sample columns, tab-separated.
    pub samples: &'a str,
}

/// Header `Number` of values that depend on the allele order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum ValueNumber {
    /// One value per alternate allele.
    #[strum(serialize = "A")]
    PerAlternate,
    /// One value per allele, reference first.
    #[strum(serialize = "R")]
    PerAllele,
    /// One value per genotype.
    #[strum(serialize = "G")]
    PerGenotype,
}

impl ValueNumber {
    /// Map a `noodles` header number.
    ///
    /// INFO and FORMAT use distinct `Number` types, both are matched by variant name.
    fn from_header<N: std::fmt::Debug>(number: &N) -> Option<Self> {
        match format!("{:?}", number).as_str() {
            "AlternateBases" => Some(ValueNumber::PerAlternate),
            "ReferenceAlternateBases" => Some(ValueNumber::PerAllele),
            "Samples" => Some(ValueNumber::PerGenotype),
            _ => None,
        }
    }
}

/// Allele indices of the VCF line, reference first, in the order used by the variant of the
/// alternate at `alt_idx`.
fn allele_order(alt_idx: usize, alt_count: usize) -> Vec<usize> {
    [0, alt_idx + 1]
        .into_iter()
        .chain((1..=alt_count).filter(|i| *i != alt_idx + 1))
        .collect()
}

/// Reorder the comma-separated `value` for the alternate at `alt_idx`.
///
/// Values whose count does not match `number` are returned unchanged.
pub fn reorder_values(
    value: &str,
    number: ValueNumber,
    alt_idx: usize,
    alt_count: usize,
) -> String {
    let values = value.split(',').collect::<Vec<_>>();
    let order = allele_order(alt_idx, alt_count);
    let allele_count = alt_count + 1;

    let reordered = match number {
        ValueNumber::PerAlternate if values.len() == alt_count => {
            Some(order[1..].iter().map(|i| values[i - 1]).collect::<Vec<_>>())
        }
        // Haploid genotypes have one likelihood per allele.
        ValueNumber::PerAllele | ValueNumber::PerGenotype if values.len() == allele_count => {
            Some(order.iter().map(|i| values[*i]).collect())
        }
        ValueNumber::PerGenotype if values.len() == allele_count * (allele_count + 1) / 2 => Some(
            (0..allele_count)
                .flat_map(|b| (0..=b).map(move |a| (a, b)))
                .map(|(a, b)| {
                    let (x, y) = if order[a] <= order[b] {
                        (order[a], order[b])
                    } else {
                        (order[b], order[a])
                    };
                    values[y * (y + 1) / 2 + x]
                })
                .collect(),
        ),
        _ => None,
    };

    reordered
        .map(|values| values.join(","))
        .unwrap_or_else(|| value.to_string())
}

/// Splits `value` by `sep`, treating `""` and `.` as empty.
fn split_non_missing(value: &str, sep: char) -> Vec<&str> {
    match value {
        "" | MISSING => Vec::new(),
        _ => value.split(sep).collect(),
    }
}

/// Converts VCF records of one file into variants of one study.
#[derive(Debug, Default, Clone)]
pub struct VcfConverter {
    study_id: String,
    file_id: String,
    samples_position: IndexMap<String, usize>,
    info_numbers: IndexMap<String, ValueNumber>,
    format_numbers: IndexMap<String, ValueNumber>,
}

impl VcfConverter {
    pub fn new(study_id: &str, file_id: &str, sample_names: &[String]) -> Self {
        Self {
            study_id: study_id.to_string(),
            file_id: file_id.to_string(),
            samples_position: sample_names
                .iter()
                .enumerate()
                .map(|(pos, name)| (name.clone(), pos))
                .collect(),
            ..Default::default()
        }
    }

    /// Create converter for the samples and per-allele keys declared in `header`.
    pub fn from_header(study_id: &str, file_id: &str, header: &vcf::Header) -> Self {
        let sample_names = header.sample_names().iter().cloned().collect::<Vec<_>>();
        let mut result = Self::new(study_id, file_id, &sample_names);
        for (key, info) in header.infos() {
            if let Some(number) = ValueNumber::from_header(&info.number()) {
                result.info_numbers.insert(key.to_string(), number);
            }
        }
        for (key, format) in header.formats() {
            if let Some(number) = ValueNumber::from_header(&format.number()) {
                result.format_numbers.insert(key.to_string(), number);
            }
        }
        result
    }

    /// Declare the INFO `key` as holding per-allele values.
    pub fn with_info_number(mut self, key: &str, number: ValueNumber) -> Self {
        self.info_numbers.insert(key.to_string(), number);
        self
    }

    /// Declare the FORMAT `key` as holding per-allele values.
    pub fn with_format_number(mut self, key: &str, number: ValueNumber) -> Self {
        self.format_numbers.insert(key.to_string(), number);
        self
    }

    /// Convert one `noodles` record.
    pub fn convert(&self, record: &vcf::Record) -> Result<Vec<Variant>, anyhow::Error> {
        let position = record
            .variant_start()
            .ok_or_else(|| anyhow::anyhow!("record without position"))?
            .map_err(|e| anyhow::anyhow!("invalid position: {}", e))?;
        let quality = record
            .quality_score()
            .transpose()
            .map_err(|e| anyhow::anyhow!("invalid quality score: {}", e))?;
        let ids = record.ids();
        let alternates = record.alternate_bases();
        let filters = record.filters();
        let info = record.info();
        let samples = record.samples();

        self.convert_raw(&RawRecord {
            chromosome: record.reference_sequence_name(),
            position: u32::try_from(usize::from(position))?,
            ids: ids.as_ref(),
            reference: record.reference_bases(),
            alternates: alternates.as_ref(),
            quality,
            filters: filters.as_ref(),
            info: info.as_ref(),
            samples: samples.as_ref(),
        })
    }

    /// Convert the columns of one VCF line, one variant per alternate allele.
    pub fn convert_raw(&self, raw: &RawRecord) -> Result<Vec<Variant>, anyhow::Error> {
        let mut attributes = IndexMap::new();
        if !matches!(raw.filters, "" | MISSING) {
            attributes.insert(FILTER.to_string(), raw.filters.to_string());
        }
        if let Some(quality) = raw.quality {
            attributes.insert(QUAL.to_string(), format!("{}", quality));
        }
        let mut end = None;
        for entry in split_non_missing(raw.info, ';') {
            let (key, value) = entry.split_once('=').unwrap_or((entry, FLAG_VALUE));
            if key == END {
                end = Some(value.parse::<u32>().map_err(|e| {
                    anyhow::anyhow!(
                        "invalid END {:?} at {}:{}: {}",
                        value,
                        raw.chromosome,
                        raw.position,
                        e
                    )
                })?);
            } else {
                attributes.insert(key.to_string(), value.to_string());
            }
        }

        let (format, samples) = parse_samples(raw.samples);
        let gt_pos = format.iter().position(|key| key == GT);
        let sample_numbers = format
            .iter()
            .map(|key| self.format_numbers.get(key).copied())
            .collect::<Vec<_>>();

        let start = raw.position;
        let end = end.unwrap_or_else(|| (start + raw.reference.len() as u32).saturating_sub(1));
        let ids = split_non_missing(raw.ids, ';')
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let alternates = match raw.alternates {
            "" => vec![MISSING],
            alternates => alternates.split(',').collect::<Vec<_>>(),
        };

        alternates
            .iter()
            .enumerate()
            .map(|(alt_idx, alternate)| -> Result<Variant, anyhow::Error> {
                let secondary_alternates = alternates
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| *idx != alt_idx)
                    .map(|(_, other)| AlternateCoordinate {
                        chromosome: raw.chromosome.to_string(),
                        start,
                        end,
                        reference: raw.reference.to_string(),
                        alternate: other.to_string(),
                        variant_type: VariantType::infer(raw.reference, other),
                    })
                    .collect::<Vec<_>>();
                let call = (alternates.len() > 1).then(|| {
                    format!(
                        "{}:{}:{}:{}",
                        start, raw.reference, raw.alternates, alt_idx
                    )
                });

                let alt_count = alternates.len();
                let mut attributes = attributes.clone();
                let mut samples_data = samples.clone();
                if alt_count > 1 {
                    for (key, value) in attributes.iter_mut() {
                        if let Some(number) = self.info_numbers.get(key) {
                            *value = reorder_values(value, *number, alt_idx, alt_count);
                        }
                    }
                    for sample in samples_data.iter_mut() {
                        for (pos, value) in sample.iter_mut().enumerate() {
                            if Some(pos) == gt_pos {
                                *value = remap_genotype(value, alt_idx, alt_count)?;
                            } else if let Some(Some(number)) = sample_numbers.get(pos) {
                                *value = reorder_values(value, *number, alt_idx, alt_count);
                            }
                        }
                    }
                }

                Ok(Variant {
                    chromosome: raw.chromosome.to_string(),
                    start,
                    end,
                    reference: raw.reference.to_string(),
                    alternate: alternate.to_string(),
                    ids: ids.clone(),
                    variant_type: VariantType::infer(raw.reference, alternate),
                    studies: vec![StudyEntry {
                        study_id: self.study_id.clone(),
                        format: format.clone(),
                        samples_data,
                        samples_position: self.samples_position.clone(),
                        files: vec![FileEntry {
                            file_id: self.file_id.clone(),
                            call,
                            attributes,
                        }],
                        secondary_alternates,
                        stats: Default::default(),
                    }],
                })
            })
            .collect()
    }
}

/// Split FORMAT and sample columns, padding short sample rows with `.`.
fn parse_samples(raw: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let mut columns = raw.split('\t').filter(|column| !column.is_empty());
    let format = match columns.next() {
        Some(keys) => keys.split(':').map(str::to_string).collect::<Vec<_>>(),
        None => return (Vec::new(), Vec::new()),
    };
    let samples = columns
        .map(|column| {
            let mut values = column.split(':').map(str::to_string).collect::<Vec<_>>();
            values.resize(format.len().max(values.len()), MISSING.to_string());
            values
        })
        .collect();
    (format, samples)
}

/// Re-encode the allele indices of `gt` for the alternate at `alt_idx`.
///
/// The reference stays `0`, the primary alternate becomes `1` and the remaining alternates
/// follow from `2` in their original order.  Missing alleles and separators are kept.
pub fn remap_genotype(
    gt: &str,
    alt_idx: usize,
    alt_count: usize,
) -> Result<String, anyhow::Error> {
    let mut result = String::with_capacity(gt.len());
    for piece in gt.split_inclusive(['/', '|']) {
        let (allele, sep) = if piece.ends_with('/') || piece.ends_with('|') {
            piece.split_at(piece.len() - 1)
        } else {
            (piece, "")
        };
        match allele {
            MISSING => result.push_str(MISSING),
            _ => {
                let index = allele.parse::<usize>().map_err(|e| {
                    anyhow::anyhow!("invalid allele {:?} in GT {:?}: {}", allele, gt, e)
                })?;
                let remapped = match index {
                    0 => 0,
                    i if i > alt_count => {
                        anyhow::bail!(
                            "allele {} in GT {:?} exceeds {} alternates",
                            i,
                            gt,
                            alt_count
                        )
                    }
                    i if i - 1 == alt_idx => 1,
                    i if i - 1 < alt_idx => i + 1,
                    i => i,
                };
                result.push_str(&remapped.to_string());
            }
        }
        result.push_str(sep);
    }
    Ok(result)
}
