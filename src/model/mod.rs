//! In-memory variant model that slices are encoded from and decoded to.

use indexmap::IndexMap;

use crate::stats::VariantStats;

pub mod vcf;

/// Length change from which an allele is considered a structural variant.
pub const SV_THRESHOLD: usize = 50;

/// The INFO keys that have dedicated record fields or are derived.
pub const RESERVED_INFO_KEYS: &[&str] = &["FILTER", "QUAL", "SRC", "END"];

/// Attribute key holding the FILTER column.
pub const FILTER: &str = "FILTER";
/// Attribute key holding the QUAL column.
pub const QUAL: &str = "QUAL";
/// Sample data key of the genotype.
pub const GT: &str = "GT";
/// Value used for missing data in VCF.
pub const MISSING: &str = ".";

/// Coarse classification of a variant.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VariantType {
    /// Single nucleotide variant.
    #[default]
    Snv,
    /// Multi nucleotide variant.
    Mnv,
    /// Small insertion or deletion.
    Indel,
    /// Structural variant, including symbolic alleles.
    Sv,
    /// Reference call or spanning deletion.
    NoVariation,
}

impl VariantType {
    /// Infer the type from reference and alternate allele.
    pub fn infer(reference: &str, alternate: &str) -> Self {
        if matches!(alternate, "." | "*" | "<NON_REF>" | "<*>") || reference == alternate {
            VariantType::NoVariation
        } else if alternate.starts_with('<') || alternate.contains('[') || alternate.contains(']')
        {
            VariantType::Sv
        } else if reference.len() == alternate.len() {
            if reference.len() == 1 {
                VariantType::Snv
            } else {
                VariantType::Mnv
            }
        } else if reference.len().abs_diff(alternate.len()) >= SV_THRESHOLD {
            VariantType::Sv
        } else {
            VariantType::Indel
        }
    }
}

/// Secondary allele of a decomposed multi-allelic site.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AlternateCoordinate {
    pub chromosome: String,
    pub start: u32,
    pub end: u32,
    pub reference: String,
    pub alternate: String,
    pub variant_type: VariantType,
}

/// File level annotation of a variant in one study.
#[serde_with::skip_serializing_none]
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FileEntry {
    /// Identifier of the file the variant was read from.
    pub file_id: String,
    /// Provenance of the original VCF line for decomposed multi-allelic sites.
    pub call: Option<String>,
    /// INFO attributes plus `FILTER` and `QUAL`.
    pub attributes: IndexMap<String, String>,
}

/// Per-study data of a variant.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StudyEntry {
    pub study_id: String,
    /// Sample data keys, e.g. `GT`, `DP`.
    pub format: Vec<String>,
    /// One value list per sample, parallel to `format`.
    pub samples_data: Vec<Vec<String>>,
    /// Sample name to index into `samples_data`.
    pub samples_position: IndexMap<String, usize>,
    pub files: Vec<FileEntry>,
    pub secondary_alternates: Vec<AlternateCoordinate>,
    /// Statistics by cohort name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub stats: IndexMap<String, VariantStats>,
}

impl StudyEntry {
    /// Position of `key` in the sample data keys.
    pub fn format_position(&self, key: &str) -> Option<usize> {
        self.format.iter().position(|k| k == key)
    }

    /// The single file entry, if any.
    pub fn file(&self) -> Option<&FileEntry> {
        self.files.first()
    }

    /// Sample names ordered by their position.
    pub fn ordered_sample_names(&self) -> Vec<&str> {
        let mut names = self
            .samples_position
            .iter()
            .map(|(name, pos)| (*pos, name.as_str()))
            .collect::<Vec<_>>();
        names.sort();
        names.into_iter().map(|(_, name)| name).collect()
    }
}

/// A variant, i.e., one alternate allele at one site.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Variant {
    pub chromosome: String,
    /// 1-based start position.
    pub start: u32,
    /// 1-based, inclusive end position.
    pub end: u32,
    pub reference: String,
    pub alternate: String,
    pub ids: Vec<String>,
    pub variant_type: VariantType,
    pub studies: Vec<StudyEntry>,
}

impl Variant {
    /// Create variant without study data, end and type are derived from the alleles.
    pub fn new(chromosome: &str, start: u32, reference: &str, alternate: &str) -> Self {
        let end = (start + reference.len() as u32).saturating_sub(1);
        Self {
            chromosome: chromosome.to_string(),
            start,
            end,
            reference: reference.to_string(),
            alternate: alternate.to_string(),
            ids: Vec::new(),
            variant_type: VariantType::infer(reference, alternate),
            studies: Vec::new(),
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.chromosome, self.start, self.reference, self.alternate
        )
    }
}
