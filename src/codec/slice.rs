//! Conversion between batches of variants and slices.

use indexmap::IndexMap;

use crate::{
    err::CodecError,
    model::Variant,
    pbs::{SliceFileHeader, VcfSlice},
};

use super::{build_fields, RecordDecoder, RecordEncoder, Selection};

/// Converts a batch of variants of one chromosome into a slice.
#[derive(Debug, Default, Clone)]
pub struct SliceEncoder {
    selection: Selection,
}

impl SliceEncoder {
    pub fn new(selection: Selection) -> Self {
        Self { selection }
    }

    /// The selection of attributes used for encoding.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Encode `variants` into one slice.
    ///
    /// The slice is anchored at `position` or, if `None`, at the smallest start.  The variants
    /// are encoded in ascending start order; equal starts keep their input order.
    pub fn convert(
        &self,
        variants: &[Variant],
        position: Option<u32>,
    ) -> Result<VcfSlice, CodecError> {
        let mut sorted = variants.to_vec();
        sorted.sort_by_key(|variant| variant.start);

        let chromosome = sorted
            .first()
            .map(|variant| variant.chromosome.clone())
            .unwrap_or_default();
        if let Some(other) = sorted.iter().find(|v| v.chromosome != chromosome) {
            return Err(CodecError::ChromosomeMismatch {
                expected: chromosome,
                found: other.chromosome.clone(),
            });
        }
        let anchor = position
            .or_else(|| sorted.first().map(|variant| variant.start))
            .unwrap_or_default();

        let fields = build_fields(&sorted, &self.selection)?;
        let encoder = RecordEncoder::new(&fields, &self.selection);
        let records = sorted
            .iter()
            .map(|variant| encoder.encode(variant, anchor))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VcfSlice {
            chromosome,
            position: anchor,
            records,
            fields: Some(fields),
        })
    }
}

/// Converts slices back into variants.
///
/// Holds the file-level metadata that is not stored in the slices.
#[derive(Debug, Default, Clone)]
pub struct SliceDecoder {
    study_id: String,
    file_id: String,
    samples_position: IndexMap<String, usize>,
}

impl SliceDecoder {
    pub fn new(study_id: &str, file_id: &str, sample_names: &[String]) -> Self {
        let mut result = Self::default();
        result.update_meta(study_id, file_id, sample_names);
        result
    }

    /// Create decoder from the header of a slice file.
    pub fn from_header(header: &SliceFileHeader) -> Self {
        Self::new(&header.study_id, &header.file_id, &header.sample_names)
    }

    /// Replace the metadata used for decoding.
    pub fn update_meta(&mut self, study_id: &str, file_id: &str, sample_names: &[String]) {
        self.study_id = study_id.to_string();
        self.file_id = file_id.to_string();
        self.samples_position = sample_names
            .iter()
            .enumerate()
            .map(|(pos, name)| (name.clone(), pos))
            .collect();
    }

    /// Decode all records of `slice` in record order.
    pub fn convert(&self, slice: &VcfSlice) -> Result<Vec<Variant>, CodecError> {
        if slice.records.is_empty() {
            return Ok(Vec::new());
        }
        let fields = slice.fields.as_ref().ok_or(CodecError::MissingFields)?;
        let decoder = RecordDecoder::new(
            fields,
            &slice.chromosome,
            slice.position,
            &self.study_id,
            &self.file_id,
            &self.samples_position,
        );
        slice
            .records
            .iter()
            .map(|record| decoder.decode(record))
            .collect()
    }
}
