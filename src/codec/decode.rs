//! Decoding of slice records back into variants.

use indexmap::IndexMap;

use crate::{
    err::{CodecError, DictKind},
    model::{AlternateCoordinate, FileEntry, StudyEntry, Variant, FILTER, GT, QUAL},
    pbs::{variant_type_from_i32, Fields, VcfRecord},
};

use super::fields::value_at;

/// Absolute start of a record.
pub fn absolute_start(relative_start: i32, anchor: u32) -> Result<u32, CodecError> {
    u32::try_from(i64::from(anchor) + i64::from(relative_start)).map_err(|_| {
        CodecError::OffsetOutOfRange {
            anchor,
            offset: relative_start.into(),
        }
    })
}

/// Absolute end of a record, inverse of [`super::encode::relative_end`].
pub fn absolute_end(start: u32, relative_end: i32, anchor: u32) -> Result<u32, CodecError> {
    let end = match relative_end {
        0 => return Ok(start),
        offset if offset < 0 => i64::from(anchor) + i64::from(offset) + 1,
        offset => i64::from(anchor) + i64::from(offset),
    };
    u32::try_from(end).map_err(|_| CodecError::OffsetOutOfRange {
        anchor,
        offset: relative_end.into(),
    })
}

/// Decode an encoded quality, `None` if missing.
pub fn decode_quality(encoded: f32) -> Option<String> {
    if encoded == 0.0 {
        return None;
    }

    // Only print the digits that survive the `f32` offset so that `0.1` does not come back
    // as `0.100000024`.
    let value = encoded - 1.0;
    let ulp = encoded.abs() * f32::EPSILON;
    let digits = (-ulp.log10()).floor().max(0.0) as usize;
    let mut result = format!("{:.*}", digits, value);
    if result.contains('.') {
        result = result.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    Some(result)
}

/// Decodes records of one slice.
///
/// Study and file identifiers as well as sample names are not stored per record and have to be
/// supplied by the caller.
#[derive(Debug)]
pub struct RecordDecoder<'a> {
    fields: &'a Fields,
    chromosome: &'a str,
    anchor: u32,
    study_id: &'a str,
    file_id: &'a str,
    samples_position: &'a IndexMap<String, usize>,
}

impl<'a> RecordDecoder<'a> {
    pub fn new(
        fields: &'a Fields,
        chromosome: &'a str,
        anchor: u32,
        study_id: &'a str,
        file_id: &'a str,
        samples_position: &'a IndexMap<String, usize>,
    ) -> Self {
        Self {
            fields,
            chromosome,
            anchor,
            study_id,
            file_id,
            samples_position,
        }
    }

    /// Decode a single `record`.
    pub fn decode(&self, record: &VcfRecord) -> Result<Variant, CodecError> {
        let start = absolute_start(record.relative_start, self.anchor)?;
        let end = absolute_end(start, record.relative_end, self.anchor)?;

        let mut attributes = IndexMap::new();
        if let Some(filter_index) = record.filter_index {
            let filter = value_at(self.fields, DictKind::Filter, filter_index)?;
            attributes.insert(FILTER.to_string(), filter.to_string());
        }
        if let Some(quality) = decode_quality(record.quality) {
            attributes.insert(QUAL.to_string(), quality);
        }
        self.decode_info(record, &mut attributes)?;

        let (format, samples_data) = self.decode_samples(record)?;

        let study = StudyEntry {
            study_id: self.study_id.to_string(),
            format,
            samples_data,
            samples_position: self.samples_position.clone(),
            files: vec![FileEntry {
                file_id: self.file_id.to_string(),
                call: (!record.call.is_empty()).then(|| record.call.clone()),
                attributes,
            }],
            secondary_alternates: record
                .secondary_alternates
                .iter()
                .map(AlternateCoordinate::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            stats: Default::default(),
        };

        Ok(Variant {
            chromosome: self.chromosome.to_string(),
            start,
            end,
            reference: record.reference.clone(),
            alternate: record.alternate.clone(),
            ids: record.id_non_default.clone(),
            variant_type: variant_type_from_i32(record.variant_type)
                .ok_or(CodecError::UnknownVariantType(record.variant_type))?,
            studies: vec![study],
        })
    }

    fn decode_info(
        &self,
        record: &VcfRecord,
        attributes: &mut IndexMap<String, String>,
    ) -> Result<(), CodecError> {
        let keys = if !record.info_key.is_empty() {
            &record.info_key
        } else if record.info_value.is_empty() {
            // An empty key-set that differs from a non-empty default.
            return Ok(());
        } else {
            &self.fields.default_info_keys
        };
        if keys.len() != record.info_value.len() {
            return Err(CodecError::InfoCountMismatch {
                keys: keys.len(),
                values: record.info_value.len(),
            });
        }

        for (index, value) in keys.iter().zip(record.info_value.iter()) {
            let key = value_at(self.fields, DictKind::Info, *index)?;
            attributes.insert(key.to_string(), value.clone());
        }

        Ok(())
    }

    fn decode_samples(
        &self,
        record: &VcfRecord,
    ) -> Result<(Vec<String>, Vec<Vec<String>>), CodecError> {
        let format_str = value_at(self.fields, DictKind::Format, record.format_index)?;
        let format = if format_str.is_empty() {
            Vec::new()
        } else {
            format_str.split(':').map(str::to_string).collect::<Vec<_>>()
        };
        let with_gt = format.first().map(String::as_str) == Some(GT);

        let samples_data = record
            .samples
            .iter()
            .map(|sample| -> Result<_, CodecError> {
                let mut values = Vec::with_capacity(sample.sample_values.len() + 1);
                match sample.gt_index {
                    Some(gt_index) => values
                        .push(value_at(self.fields, DictKind::Genotype, gt_index)?.to_string()),
                    None if with_gt => {
                        return Err(CodecError::MissingGenotypeIndex {
                            format: format_str.to_string(),
                        })
                    }
                    None => (),
                }
                values.extend(sample.sample_values.iter().cloned());
                Ok(values)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((format, samples_data))
    }
}

#[cfg(test)]
mod test {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use super::{absolute_end, decode_quality, RecordDecoder};
    use crate::{
        codec::encode::{encode_quality, relative_end},
        err::CodecError,
        pbs::{Fields, VcfRecord, VcfSample},
    };

    #[rstest::rstest]
    #[case(1000, 1000, 1000)]
    #[case(1000, 1005, 1000)]
    #[case(1001, 1000, 1000)]
    #[case(1000, 999, 1000)]
    #[case(1005, 1010, 1000)]
    #[case(1000, 1, 1000)]
    fn relative_end_inverts(
        #[case] start: u32,
        #[case] end: u32,
        #[case] anchor: u32,
    ) -> Result<(), anyhow::Error> {
        let encoded = relative_end(start, end, anchor)?;
        assert_eq!(absolute_end(start, encoded, anchor)?, end);
        Ok(())
    }

    #[rstest::rstest]
    #[case(None, None)]
    #[case(Some("."), None)]
    #[case(Some("29"), Some("29"))]
    #[case(Some("0"), Some("0"))]
    #[case(Some("12.5"), Some("12.5"))]
    #[case(Some("0.1"), Some("0.1"))]
    #[case(Some("0.3"), Some("0.3"))]
    #[case(Some("99.99"), Some("99.99"))]
    #[case(Some("3000"), Some("3000"))]
    fn quality_inverts(
        #[case] raw: Option<&str>,
        #[case] expected: Option<&str>,
    ) -> Result<(), anyhow::Error> {
        let decoded = decode_quality(encode_quality(raw)?);
        assert_eq!(decoded.as_deref(), expected);
        Ok(())
    }

    fn fields() -> Fields {
        Fields {
            filters: vec!["PASS".into()],
            info_keys: vec!["DP".into(), "AC".into()],
            formats: vec!["GT:DP".into(), "".into()],
            gts: vec!["0/1".into()],
            default_info_keys: vec![0, 1],
        }
    }

    #[test]
    fn decode_default_info() -> Result<(), anyhow::Error> {
        let fields = fields();
        let samples_position = IndexMap::from([("S1".to_string(), 0)]);
        let decoder = RecordDecoder::new(&fields, "chr1", 1000, "study", "file", &samples_position);

        let variant = decoder.decode(&VcfRecord {
            relative_start: 3,
            relative_end: 0,
            reference: "A".into(),
            alternate: "T".into(),
            filter_index: Some(0),
            quality: 30.0,
            info_value: vec!["10".into(), "1".into()],
            format_index: 0,
            samples: vec![VcfSample {
                gt_index: Some(0),
                sample_values: vec!["10".into()],
            }],
            ..Default::default()
        })?;

        assert_eq!(variant.start, 1003);
        assert_eq!(variant.end, 1003);
        let study = &variant.studies[0];
        assert_eq!(study.format, vec!["GT", "DP"]);
        assert_eq!(study.samples_data, vec![vec!["0/1", "10"]]);
        let attributes = &study.files[0].attributes;
        assert_eq!(attributes.get("FILTER").map(String::as_str), Some("PASS"));
        assert_eq!(attributes.get("QUAL").map(String::as_str), Some("29"));
        assert_eq!(attributes.get("DP").map(String::as_str), Some("10"));
        assert_eq!(attributes.get("AC").map(String::as_str), Some("1"));

        Ok(())
    }

    #[test]
    fn decode_without_info_and_samples() -> Result<(), anyhow::Error> {
        let fields = fields();
        let samples_position = IndexMap::new();
        let decoder = RecordDecoder::new(&fields, "chr1", 1000, "study", "file", &samples_position);

        let variant = decoder.decode(&VcfRecord {
            relative_start: 0,
            relative_end: 0,
            reference: "A".into(),
            alternate: "T".into(),
            format_index: 1,
            ..Default::default()
        })?;

        let study = &variant.studies[0];
        assert!(study.format.is_empty());
        assert!(study.files[0].attributes.is_empty());

        Ok(())
    }

    #[test]
    fn info_count_mismatch() {
        let fields = fields();
        let samples_position = IndexMap::new();
        let decoder = RecordDecoder::new(&fields, "chr1", 1000, "study", "file", &samples_position);

        let result = decoder.decode(&VcfRecord {
            info_value: vec!["10".into()],
            format_index: 1,
            ..Default::default()
        });

        assert_eq!(
            result,
            Err(CodecError::InfoCountMismatch { keys: 2, values: 1 })
        );
    }

    #[test]
    fn genotype_index_missing() {
        let fields = fields();
        let samples_position = IndexMap::new();
        let decoder = RecordDecoder::new(&fields, "chr1", 1000, "study", "file", &samples_position);

        let result = decoder.decode(&VcfRecord {
            samples: vec![VcfSample {
                gt_index: None,
                sample_values: vec!["10".into()],
            }],
            ..Default::default()
        });

        assert_eq!(
            result,
            Err(CodecError::MissingGenotypeIndex {
                format: "GT:DP".into()
            })
        );
    }

    #[test]
    fn genotype_out_of_range() {
        let fields = fields();
        let samples_position = IndexMap::new();
        let decoder = RecordDecoder::new(&fields, "chr1", 1000, "study", "file", &samples_position);

        let result = decoder.decode(&VcfRecord {
            samples: vec![VcfSample {
                gt_index: Some(5),
                sample_values: vec!["10".into()],
            }],
            ..Default::default()
        });

        assert!(matches!(
            result,
            Err(CodecError::IndexOutOfRange { index: 5, .. })
        ));
    }
}
