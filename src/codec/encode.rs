//! Encoding of single variants into slice records.

use indexmap::IndexMap;

use crate::{
    err::{CodecError, DictKind},
    model::{StudyEntry, Variant, FILTER, MISSING, QUAL},
    pbs::{self, Fields, VcfRecord, VcfSample},
};

use super::{fields::FieldsLookup, format_string, sample_value, single_study, Selection};

/// Offset of `position` from the slice `anchor`.
pub fn relative_start(start: u32, anchor: u32) -> Result<i32, CodecError> {
    i32::try_from(i64::from(start) - i64::from(anchor)).map_err(|_| {
        CodecError::PositionOutOfRange {
            anchor,
            position: start,
        }
    })
}

/// Encode `end` relative to `anchor`.
///
/// `0` is reserved for `end == start`; offsets that are not positive are shifted down by one so
/// they never collide with it.
pub fn relative_end(start: u32, end: u32, anchor: u32) -> Result<i32, CodecError> {
    if start == end {
        return Ok(0);
    }
    let out_of_range = || CodecError::PositionOutOfRange {
        anchor,
        position: end,
    };
    let offset = i32::try_from(i64::from(end) - i64::from(anchor)).map_err(|_| out_of_range())?;
    if offset <= 0 {
        offset.checked_sub(1).ok_or_else(out_of_range)
    } else {
        Ok(offset)
    }
}

/// Encode a raw QUAL value; missing (absent, `.` or `-1`) becomes `0`.
pub fn encode_quality(raw: Option<&str>) -> Result<f32, CodecError> {
    match raw {
        None | Some(MISSING) | Some("") => Ok(0.0),
        Some(value) => value
            .parse::<f32>()
            .map(|quality| quality + 1.0)
            .map_err(|source| CodecError::InvalidQuality {
                value: value.to_string(),
                source,
            }),
    }
}

/// Encodes variants against one dictionary.
///
/// The dictionary must have been built by [`super::build_fields`] over a superset of the encoded
/// variants with the same [`Selection`].
#[derive(Debug)]
pub struct RecordEncoder<'a> {
    fields: &'a Fields,
    lookup: FieldsLookup<'a>,
    selection: &'a Selection,
}

impl<'a> RecordEncoder<'a> {
    pub fn new(fields: &'a Fields, selection: &'a Selection) -> Self {
        Self {
            fields,
            lookup: FieldsLookup::new(fields),
            selection,
        }
    }

    /// Encode `variant` relative to `anchor`.
    pub fn encode(&self, variant: &Variant, anchor: u32) -> Result<VcfRecord, CodecError> {
        let (study, file) = single_study(variant)?;

        let mut record = VcfRecord {
            relative_start: relative_start(variant.start, anchor)?,
            relative_end: relative_end(variant.start, variant.end, anchor)?,
            reference: variant.reference.clone(),
            alternate: variant.alternate.clone(),
            id_non_default: variant.ids.clone(),
            variant_type: pbs::VariantType::from(variant.variant_type) as i32,
            secondary_alternates: study
                .secondary_alternates
                .iter()
                .map(Into::into)
                .collect(),
            call: file.and_then(|file| file.call.clone()).unwrap_or_default(),
            ..Default::default()
        };

        if let Some(file) = file {
            if let Some(filter) = file.attributes.get(FILTER) {
                record.filter_index = Some(self.lookup.index_of(DictKind::Filter, filter)?);
            }
            if self.selection.quality() {
                record.quality = encode_quality(file.attributes.get(QUAL).map(String::as_str))?;
            }
            self.encode_info(&mut record, &file.attributes)?;
        }
        self.encode_samples(&mut record, study)?;

        Ok(record)
    }

    fn encode_info(
        &self,
        record: &mut VcfRecord,
        attributes: &IndexMap<String, String>,
    ) -> Result<(), CodecError> {
        let mut keys = self
            .selection
            .info_keys(attributes)
            .into_iter()
            .map(|key| -> Result<_, CodecError> {
                Ok((self.lookup.index_of(DictKind::Info, key)?, key))
            })
            .collect::<Result<Vec<_>, _>>()?;
        keys.sort_unstable_by_key(|(idx, _)| *idx);

        let indices = keys.iter().map(|(idx, _)| *idx).collect::<Vec<_>>();
        if indices != self.fields.default_info_keys {
            record.info_key = indices;
        }
        record.info_value = keys
            .iter()
            .map(|(_, key)| attributes.get(*key).cloned().unwrap_or_default())
            .collect();

        Ok(())
    }

    fn encode_samples(
        &self,
        record: &mut VcfRecord,
        study: &StudyEntry,
    ) -> Result<(), CodecError> {
        let positions = self.selection.format_positions(&study.format)?;
        let (format, with_gt) = format_string(&study.format, &positions);
        record.format_index = self.lookup.index_of(DictKind::Format, &format)?;

        let value_positions = if with_gt {
            &positions[1..]
        } else {
            &positions[..]
        };
        record.samples = study
            .samples_data
            .iter()
            .map(|sample| -> Result<_, CodecError> {
                let gt_index = if with_gt {
                    Some(
                        self.lookup
                            .index_of(DictKind::Genotype, sample_value(sample, positions[0]))?,
                    )
                } else {
                    None
                };
                Ok(VcfSample {
                    gt_index,
                    sample_values: value_positions
                        .iter()
                        .map(|pos| sample_value(sample, *pos).to_string())
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(())
    }
}
