//! Columnar slice codec: dictionaries, record encoding and decoding, slice assembly.

use indexmap::{IndexMap, IndexSet};

use crate::{
    err::CodecError,
    model::{FileEntry, StudyEntry, Variant, GT, QUAL, RESERVED_INFO_KEYS},
};

pub mod decode;
pub mod encode;
pub mod fields;
pub mod slice;

pub use decode::RecordDecoder;
pub use encode::RecordEncoder;
pub use fields::build_fields;
pub use slice::{SliceDecoder, SliceEncoder};

/// Restricts which INFO attributes and sample data keys take part in encoding.
///
/// `None` selects everything that is not reserved.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Selection {
    info: Option<IndexSet<String>>,
    format: Option<IndexSet<String>>,
}

impl Selection {
    /// Select all attributes and sample data keys.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict INFO attributes to `keys`; `QUAL` in `keys` keeps the quality.
    pub fn with_info<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.info = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict sample data to `keys`.
    pub fn with_format<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.format = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Whether the quality is encoded.
    pub fn quality(&self) -> bool {
        self.info.as_ref().map_or(true, |info| info.contains(QUAL))
    }

    /// Sorted INFO keys of `attributes` that are encoded.
    pub fn info_keys<'a>(&self, attributes: &'a IndexMap<String, String>) -> Vec<&'a str> {
        let mut keys = attributes
            .keys()
            .map(String::as_str)
            .filter(|key| !RESERVED_INFO_KEYS.contains(key))
            .filter(|key| self.info.as_ref().map_or(true, |info| info.contains(*key)))
            .collect::<Vec<_>>();
        keys.sort_unstable();
        keys
    }

    /// Positions of the encoded sample data keys within `format`, in `format` order.
    ///
    /// Fails if `GT` is selected but not the first selected key.
    pub fn format_positions(&self, format: &[String]) -> Result<Vec<usize>, CodecError> {
        let positions = format
            .iter()
            .enumerate()
            .filter(|(_, key)| {
                self.format
                    .as_ref()
                    .map_or(true, |selected| selected.contains(key.as_str()))
            })
            .map(|(pos, _)| pos)
            .collect::<Vec<_>>();
        if let Some(gt_pos) = positions.iter().position(|pos| format[*pos] == GT) {
            if gt_pos != 0 {
                return Err(CodecError::GenotypeNotFirst {
                    format: format.join(":"),
                    position: gt_pos,
                });
            }
        }
        Ok(positions)
    }
}

/// The format string of the selected keys and whether it leads with GT.
pub(crate) fn format_string(format: &[String], positions: &[usize]) -> (String, bool) {
    let keys = positions
        .iter()
        .map(|pos| format[*pos].as_str())
        .collect::<Vec<_>>();
    (keys.join(":"), keys.first() == Some(&GT))
}

/// The selected value of a sample row, `.` if the row is short.
pub(crate) fn sample_value(sample: &[String], pos: usize) -> &str {
    sample.get(pos).map_or(crate::model::MISSING, String::as_str)
}

/// The only study of `variant` and its file entry, if any.
pub(crate) fn single_study(
    variant: &Variant,
) -> Result<(&StudyEntry, Option<&FileEntry>), CodecError> {
    let study = match variant.studies.as_slice() {
        [study] => study,
        [] => {
            return Err(CodecError::MissingStudy {
                variant: variant.to_string(),
            })
        }
        studies => {
            return Err(CodecError::MultipleStudies {
                variant: variant.to_string(),
                count: studies.len(),
            })
        }
    };
    if study.files.len() > 1 {
        return Err(CodecError::MultipleFiles {
            variant: variant.to_string(),
            count: study.files.len(),
        });
    }
    Ok((study, study.file()))
}


#[cfg(test)]
mod test {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use super::{single_study, testing, Selection};
    use crate::err::CodecError;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn info_keys_skip_reserved_and_sort() {
        let attributes = [
            ("QUAL", "3"),
            ("DP", "4"),
            ("FILTER", "PASS"),
            ("AC", "1"),
            ("END", "9"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<IndexMap<_, _>>();

        assert_eq!(Selection::all().info_keys(&attributes), vec!["AC", "DP"]);
        assert_eq!(
            Selection::all().with_info(["DP"]).info_keys(&attributes),
            vec!["DP"]
        );
    }

    #[rstest::rstest]
    #[case(None, true)]
    #[case(Some(vec!["DP"]), false)]
    #[case(Some(vec!["DP", "QUAL"]), true)]
    fn quality_selection(#[case] info: Option<Vec<&str>>, #[case] expected: bool) {
        let selection = match info {
            Some(info) => Selection::all().with_info(info),
            None => Selection::all(),
        };
        assert_eq!(selection.quality(), expected);
    }

    #[test]
    fn format_positions_respect_selection() -> Result<(), anyhow::Error> {
        let format = strings(&["GT", "DP", "GQ"]);

        assert_eq!(Selection::all().format_positions(&format)?, vec![0, 1, 2]);
        assert_eq!(
            Selection::all()
                .with_format(["GQ", "GT"])
                .format_positions(&format)?,
            vec![0, 2]
        );

        Ok(())
    }

    #[test]
    fn format_positions_gt_not_first() {
        let format = strings(&["DP", "GT"]);

        assert_eq!(
            Selection::all().format_positions(&format),
            Err(CodecError::GenotypeNotFirst {
                format: "DP:GT".into(),
                position: 1,
            })
        );
        // Dropping the leading key brings GT to the front.
        assert_eq!(
            Selection::all().with_format(["GT"]).format_positions(&format),
            Ok(vec![1])
        );
    }

    #[test]
    fn single_study_rejects_multiple() {
        let mut variant = testing::variant(100, "A", "T", &[], &["GT"], &[&["0/1"]]);
        let study = variant.studies[0].clone();

        let file = study.files[0].clone();
        variant.studies[0].files.push(file);
        assert!(matches!(
            single_study(&variant),
            Err(CodecError::MultipleFiles { count: 2, .. })
        ));

        variant.studies.push(study);
        assert!(matches!(
            single_study(&variant),
            Err(CodecError::MultipleStudies { count: 2, .. })
        ));

        variant.studies.clear();
        assert!(matches!(
            single_study(&variant),
            Err(CodecError::MissingStudy { .. })
        ));
    }
}
