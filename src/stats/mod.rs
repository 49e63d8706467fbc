//! Cohort statistics computed from the genotypes of a study.

use indexmap::IndexMap;

use crate::model::{StudyEntry, GT};

/// Name of the cohort spanning all samples.
pub const COHORT_ALL: &str = "ALL";

/// Allele and genotype counts for one cohort.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VariantStats {
    /// Number of called alleles.
    pub allele_count: u32,
    /// Number of reference alleles.
    pub ref_allele_count: u32,
    /// Number of alleles matching the primary alternate.
    pub alt_allele_count: u32,
    /// Number of alleles matching a secondary alternate.
    pub other_allele_count: u32,
    /// Number of no-call alleles.
    pub missing_allele_count: u32,
    /// Number of samples with at least one no-call allele.
    pub missing_genotype_count: u32,
    /// Count of each normalized genotype, e.g. `0/1`.
    pub genotype_count: IndexMap<String, u32>,
    /// Frequency of the reference allele among called alleles.
    pub ref_allele_freq: f32,
    /// Frequency of the primary alternate among called alleles.
    pub alt_allele_freq: f32,
    /// Minor allele frequency.
    pub maf: f32,
    /// The minor allele, reference or alternate bases.
    pub maf_allele: String,
}

impl VariantStats {
    /// Compute the statistics over all samples of `study`.
    ///
    /// Returns `None` if the study carries no `GT` key.
    pub fn from_study(study: &StudyEntry, reference: &str, alternate: &str) -> Option<Self> {
        let gt_pos = study.format_position(GT)?;

        let mut stats = Self::default();
        for sample in &study.samples_data {
            let Some(gt) = sample.get(gt_pos) else {
                continue;
            };
            let alleles = gt.split(['/', '|']).collect::<Vec<_>>();
            let mut any_missing = false;
            for allele in &alleles {
                match *allele {
                    "." => {
                        any_missing = true;
                        stats.missing_allele_count += 1;
                    }
                    "0" => stats.ref_allele_count += 1,
                    "1" => stats.alt_allele_count += 1,
                    _ => stats.other_allele_count += 1,
                }
            }
            if any_missing {
                stats.missing_genotype_count += 1;
            }
            *stats
                .genotype_count
                .entry(normalize_genotype(&alleles))
                .or_default() += 1;
        }

        stats.allele_count =
            stats.ref_allele_count + stats.alt_allele_count + stats.other_allele_count;
        if stats.allele_count > 0 {
            let total = stats.allele_count as f32;
            stats.ref_allele_freq = stats.ref_allele_count as f32 / total;
            stats.alt_allele_freq = stats.alt_allele_count as f32 / total;
        }
        if stats.alt_allele_freq <= stats.ref_allele_freq {
            stats.maf = stats.alt_allele_freq;
            stats.maf_allele = alternate.to_string();
        } else {
            stats.maf = stats.ref_allele_freq;
            stats.maf_allele = reference.to_string();
        }

        Some(stats)
    }
}

/// Unphased, sorted representation of a genotype, missing alleles sort last.
fn normalize_genotype(alleles: &[&str]) -> String {
    let mut sorted = alleles.to_vec();
    sorted.sort_by_key(|a| a.parse::<u32>().unwrap_or(u32::MAX));
    sorted.join("/")
}

#[cfg(test)]
mod test {
    use float_cmp::approx_eq;
    use pretty_assertions::assert_eq;

    use super::VariantStats;
    use crate::model::StudyEntry;

    fn study(gts: &[&str]) -> StudyEntry {
        StudyEntry {
            study_id: "S".into(),
            format: vec!["GT".into(), "DP".into()],
            samples_data: gts
                .iter()
                .map(|gt| vec![gt.to_string(), "10".to_string()])
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn counts_and_frequencies() {
        let stats = VariantStats::from_study(&study(&["0/1", "1|0", "1/1", "./."]), "A", "T")
            .expect("has GT");

        assert_eq!(stats.allele_count, 6);
        assert_eq!(stats.ref_allele_count, 2);
        assert_eq!(stats.alt_allele_count, 4);
        assert_eq!(stats.missing_allele_count, 2);
        assert_eq!(stats.missing_genotype_count, 1);
        assert_eq!(stats.genotype_count.get("0/1"), Some(&2));
        assert_eq!(stats.genotype_count.get("1/1"), Some(&1));
        assert_eq!(stats.genotype_count.get("./."), Some(&1));
        assert!(approx_eq!(f32, stats.maf, 2.0 / 6.0, ulps = 2));
        assert_eq!(stats.maf_allele, "A");
    }

    #[test]
    fn secondary_alleles() {
        let stats = VariantStats::from_study(&study(&["1/2", "0/0"]), "A", "T").expect("has GT");

        assert_eq!(stats.other_allele_count, 1);
        assert_eq!(stats.allele_count, 4);
        assert!(approx_eq!(f32, stats.maf, 0.25, ulps = 2));
        assert_eq!(stats.maf_allele, "T");
    }

    #[test]
    fn without_gt() {
        let mut study = study(&["0/1"]);
        study.format = vec!["DP".into()];

        assert_eq!(VariantStats::from_study(&study, "A", "T"), None);
    }
}
