//! Protocol buffer messages of the slice format.
//!
//! The schema is `src/proto/vcf_slice/v1/slice.proto`.  The messages are declared with the
//! `prost` derive macros so that no `protoc` is needed at build time, and are tested against
//! the schema.  Field numbers are part of the wire format and must not change.

use crate::{err::CodecError, model};

/// Type of a variant as stored in records.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    prost::Enumeration,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(i32)]
pub enum VariantType {
    Snv = 0,
    Mnv = 1,
    Indel = 2,
    Sv = 3,
    NoVariation = 4,
}

impl From<model::VariantType> for VariantType {
    fn from(value: model::VariantType) -> Self {
        match value {
            model::VariantType::Snv => VariantType::Snv,
            model::VariantType::Mnv => VariantType::Mnv,
            model::VariantType::Indel => VariantType::Indel,
            model::VariantType::Sv => VariantType::Sv,
            model::VariantType::NoVariation => VariantType::NoVariation,
        }
    }
}

impl From<VariantType> for model::VariantType {
    fn from(value: VariantType) -> Self {
        match value {
            VariantType::Snv => model::VariantType::Snv,
            VariantType::Mnv => model::VariantType::Mnv,
            VariantType::Indel => model::VariantType::Indel,
            VariantType::Sv => model::VariantType::Sv,
            VariantType::NoVariation => model::VariantType::NoVariation,
        }
    }
}

/// Convert the raw enum value of a record into the model type.
pub fn variant_type_from_i32(value: i32) -> Option<model::VariantType> {
    VariantType::try_from(value).ok().map(Into::into)
}

impl From<&model::AlternateCoordinate> for AlternateCoordinate {
    fn from(value: &model::AlternateCoordinate) -> Self {
        Self {
            chromosome: value.chromosome.clone(),
            start: value.start,
            end: value.end,
            reference: value.reference.clone(),
            alternate: value.alternate.clone(),
            variant_type: VariantType::from(value.variant_type) as i32,
        }
    }
}

impl TryFrom<&AlternateCoordinate> for model::AlternateCoordinate {
    type Error = CodecError;

    fn try_from(value: &AlternateCoordinate) -> Result<Self, Self::Error> {
        Ok(Self {
            chromosome: value.chromosome.clone(),
            start: value.start,
            end: value.end,
            reference: value.reference.clone(),
            alternate: value.alternate.clone(),
            variant_type: variant_type_from_i32(value.variant_type)
                .ok_or(CodecError::UnknownVariantType(value.variant_type))?,
        })
    }
}

/// Deduplicated per-slice dictionaries, most frequent entry first.
#[derive(Clone, PartialEq, prost::Message, serde::Serialize, serde::Deserialize)]
pub struct Fields {
    /// FILTER values.
    #[prost(string, repeated, tag = "1")]
    pub filters: Vec<String>,
    /// INFO keys.
    #[prost(string, repeated, tag = "2")]
    pub info_keys: Vec<String>,
    /// Colon-joined FORMAT strings.
    #[prost(string, repeated, tag = "3")]
    pub formats: Vec<String>,
    /// Genotype strings.
    #[prost(string, repeated, tag = "4")]
    pub gts: Vec<String>,
    /// Sorted indices into `info_keys` of the most common INFO key-set.
    #[prost(uint32, repeated, tag = "5")]
    pub default_info_keys: Vec<u32>,
}

/// Per-sample data of a record.
#[derive(Clone, PartialEq, prost::Message, serde::Serialize, serde::Deserialize)]
pub struct VcfSample {
    /// Index into `Fields::gts`, present iff the record's FORMAT starts with GT.
    #[prost(uint32, optional, tag = "1")]
    pub gt_index: Option<u32>,
    /// Remaining sample values in FORMAT order.
    #[prost(string, repeated, tag = "2")]
    pub sample_values: Vec<String>,
}

/// Secondary alternate allele of a record.
#[derive(Clone, PartialEq, prost::Message, serde::Serialize, serde::Deserialize)]
pub struct AlternateCoordinate {
    #[prost(string, tag = "1")]
    pub chromosome: String,
    #[prost(uint32, tag = "2")]
    pub start: u32,
    #[prost(uint32, tag = "3")]
    pub end: u32,
    #[prost(string, tag = "4")]
    pub reference: String,
    #[prost(string, tag = "5")]
    pub alternate: String,
    #[prost(enumeration = "VariantType", tag = "6")]
    pub variant_type: i32,
}

/// One variant, relative to the slice it is stored in.
#[derive(Clone, PartialEq, prost::Message, serde::Serialize, serde::Deserialize)]
pub struct VcfRecord {
    /// Start minus the slice position.
    #[prost(sint32, tag = "1")]
    pub relative_start: i32,
    /// `0` if end equals start, else end minus slice position, minus one if not positive.
    #[prost(sint32, tag = "2")]
    pub relative_end: i32,
    #[prost(string, tag = "3")]
    pub reference: String,
    #[prost(string, tag = "4")]
    pub alternate: String,
    #[prost(string, repeated, tag = "5")]
    pub id_non_default: Vec<String>,
    /// Index into `Fields::filters`, absent if the variant has no FILTER.
    #[prost(uint32, optional, tag = "6")]
    pub filter_index: Option<u32>,
    /// Quality plus one, `0` encodes missing.
    #[prost(float, tag = "7")]
    pub quality: f32,
    /// Indices into `Fields::info_keys`, empty if the default key-set applies.
    #[prost(uint32, repeated, tag = "8")]
    pub info_key: Vec<u32>,
    #[prost(string, repeated, tag = "9")]
    pub info_value: Vec<String>,
    /// Index into `Fields::formats`.
    #[prost(uint32, tag = "10")]
    pub format_index: u32,
    #[prost(message, repeated, tag = "11")]
    pub samples: Vec<VcfSample>,
    #[prost(enumeration = "VariantType", tag = "12")]
    pub variant_type: i32,
    #[prost(message, repeated, tag = "13")]
    pub secondary_alternates: Vec<AlternateCoordinate>,
    /// Provenance of decomposed multi-allelic sites, empty if none.
    #[prost(string, tag = "14")]
    pub call: String,
}

/// A batch of records on one chromosome sharing dictionaries.
#[derive(Clone, PartialEq, prost::Message, serde::Serialize, serde::Deserialize)]
pub struct VcfSlice {
    #[prost(string, tag = "1")]
    pub chromosome: String,
    /// Anchor position all record offsets refer to.
    #[prost(uint32, tag = "2")]
    pub position: u32,
    #[prost(message, optional, tag = "3")]
    pub fields: Option<Fields>,
    #[prost(message, repeated, tag = "4")]
    pub records: Vec<VcfRecord>,
}

/// Leading message of a slice file.
#[derive(Clone, PartialEq, prost::Message, serde::Serialize, serde::Deserialize)]
pub struct SliceFileHeader {
    #[prost(string, tag = "1")]
    pub study_id: String,
    #[prost(string, tag = "2")]
    pub file_id: String,
    /// Sample names in sample data order.
    #[prost(string, repeated, tag = "3")]
    pub sample_names: Vec<String>,
    /// Version of the writing program.
    #[prost(string, tag = "4")]
    pub version: String,
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use prost::{
        encoding::{decode_key, WireType},
        Message,
    };

    use super::{AlternateCoordinate, Fields, SliceFileHeader, VcfRecord, VcfSample, VcfSlice};
    use crate::model;

    const SCHEMA: &str = include_str!("../proto/vcf_slice/v1/slice.proto");

    /// A field declaration of the schema.
    #[derive(Debug)]
    struct SchemaField {
        repeated: bool,
        ty: String,
        name: String,
        tag: u32,
    }

    /// Messages and enums of the schema, in declaration order.
    #[derive(Debug, Default)]
    struct Schema {
        messages: Vec<(String, Vec<SchemaField>)>,
        enums: Vec<(String, Vec<(String, i32)>)>,
    }

    fn parse_schema(text: &str) -> Result<Schema, anyhow::Error> {
        let mut schema = Schema::default();
        let mut current: Option<(bool, String)> = None;
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let tokens = line
                .trim_end_matches(';')
                .split_whitespace()
                .collect::<Vec<_>>();
            let context = current.clone();
            match (tokens.as_slice(), context) {
                (["message", name, "{"], None) => current = Some((true, name.to_string())),
                (["enum", name, "{"], None) => {
                    schema.enums.push((name.to_string(), Vec::new()));
                    current = Some((false, name.to_string()));
                }
                (["}"], Some(_)) => current = None,
                ([name, "=", value], Some((false, _))) => {
                    if let Some((_, values)) = schema.enums.last_mut() {
                        values.push((name.to_string(), value.parse()?));
                    }
                }
                ([decl @ .., name, "=", tag], Some((true, message))) => {
                    let (repeated, ty) = match decl {
                        ["repeated", ty] => (true, ty),
                        ["optional", ty] | [ty] => (false, ty),
                        _ => anyhow::bail!("unexpected field declaration: {}", line),
                    };
                    let field = SchemaField {
                        repeated,
                        ty: ty.to_string(),
                        name: name.to_string(),
                        tag: tag.parse()?,
                    };
                    match schema.messages.last_mut() {
                        Some((last, fields)) if *last == message => fields.push(field),
                        _ => schema.messages.push((message, vec![field])),
                    }
                }
                ([..], None) => (),
                _ => anyhow::bail!("unexpected line: {}", line),
            }
        }
        Ok(schema)
    }

    fn default_json(message: &str) -> Result<serde_json::Value, anyhow::Error> {
        Ok(match message {
            "Fields" => serde_json::to_value(Fields::default())?,
            "VcfSample" => serde_json::to_value(VcfSample::default())?,
            "AlternateCoordinate" => serde_json::to_value(AlternateCoordinate::default())?,
            "VcfRecord" => serde_json::to_value(VcfRecord::default())?,
            "VcfSlice" => serde_json::to_value(VcfSlice::default())?,
            "SliceFileHeader" => serde_json::to_value(SliceFileHeader::default())?,
            _ => anyhow::bail!("unknown message {}", message),
        })
    }

    fn encode_json(message: &str, value: serde_json::Value) -> Result<Vec<u8>, anyhow::Error> {
        Ok(match message {
            "Fields" => serde_json::from_value::<Fields>(value)?.encode_to_vec(),
            "VcfSample" => serde_json::from_value::<VcfSample>(value)?.encode_to_vec(),
            "AlternateCoordinate" => {
                serde_json::from_value::<AlternateCoordinate>(value)?.encode_to_vec()
            }
            "VcfRecord" => serde_json::from_value::<VcfRecord>(value)?.encode_to_vec(),
            "VcfSlice" => serde_json::from_value::<VcfSlice>(value)?.encode_to_vec(),
            "SliceFileHeader" => serde_json::from_value::<SliceFileHeader>(value)?.encode_to_vec(),
            _ => anyhow::bail!("unknown message {}", message),
        })
    }

    /// A non-default value of `ty` and the wire type it is encoded with, unpacked.
    fn sample_value(
        ty: &str,
        schema: &Schema,
    ) -> Result<(serde_json::Value, WireType), anyhow::Error> {
        Ok(match ty {
            "string" => (serde_json::json!("x"), WireType::LengthDelimited),
            "uint32" | "sint32" => (serde_json::json!(1), WireType::Varint),
            "float" => (serde_json::json!(1.5), WireType::ThirtyTwoBit),
            _ if schema.enums.iter().any(|(name, _)| name == ty) => {
                (serde_json::json!(1), WireType::Varint)
            }
            _ => (default_json(ty)?, WireType::LengthDelimited),
        })
    }

    #[test]
    fn messages_match_schema() -> Result<(), anyhow::Error> {
        let schema = parse_schema(SCHEMA)?;
        assert_eq!(
            schema
                .messages
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>(),
            vec![
                "Fields",
                "VcfSample",
                "AlternateCoordinate",
                "VcfRecord",
                "VcfSlice",
                "SliceFileHeader"
            ]
        );

        for (message, fields) in &schema.messages {
            let default = default_json(message)?;
            let mut names = default
                .as_object()
                .map(|object| object.keys().cloned().collect::<Vec<_>>())
                .unwrap_or_default();
            names.sort();
            let mut expected_names = fields.iter().map(|f| f.name.clone()).collect::<Vec<_>>();
            expected_names.sort();
            assert_eq!(names, expected_names, "fields of {}", message);

            for field in fields {
                let (value, wire_type) = sample_value(&field.ty, &schema)?;
                let (value, wire_type) = if field.repeated {
                    (serde_json::json!([value]), WireType::LengthDelimited)
                } else {
                    (value, wire_type)
                };
                let mut json = default.clone();
                json[field.name.as_str()] = value;

                let buf = encode_json(message, json)?;
                let (tag, actual_wire_type) = decode_key(&mut buf.as_slice())?;
                assert_eq!(
                    (tag, actual_wire_type),
                    (field.tag, wire_type),
                    "{}.{}",
                    message,
                    field.name
                );
            }
        }

        Ok(())
    }

    #[test]
    fn variant_type_matches_schema() -> Result<(), anyhow::Error> {
        let schema = parse_schema(SCHEMA)?;
        let (_, values) = schema
            .enums
            .iter()
            .find(|(name, _)| name == "VariantType")
            .ok_or_else(|| anyhow::anyhow!("VariantType missing from schema"))?;

        assert_eq!(values.len(), 5);
        for (name, value) in values {
            let variant = super::VariantType::try_from(*value)?;
            assert_eq!(
                format!("{:?}", variant).to_lowercase(),
                name.trim_start_matches("VARIANT_TYPE_")
                    .replace('_', "")
                    .to_lowercase()
            );
        }

        Ok(())
    }

    #[rstest::rstest]
    #[case(model::VariantType::Snv)]
    #[case(model::VariantType::Indel)]
    #[case(model::VariantType::NoVariation)]
    fn variant_type_conversion(#[case] value: model::VariantType) {
        let raw = super::VariantType::from(value) as i32;
        assert_eq!(super::variant_type_from_i32(raw), Some(value));
    }

    #[test]
    fn unknown_variant_type() {
        assert_eq!(super::variant_type_from_i32(42), None);
    }

    #[test]
    fn missing_optionals_stay_missing_on_wire() -> Result<(), anyhow::Error> {
        let slice = VcfSlice {
            chromosome: "chr1".into(),
            position: 1000,
            fields: None,
            records: vec![VcfRecord {
                relative_start: 0,
                relative_end: -1,
                reference: "A".into(),
                alternate: "T".into(),
                samples: vec![VcfSample {
                    gt_index: Some(0),
                    sample_values: vec![],
                }],
                ..Default::default()
            }],
        };

        let buf = slice.encode_to_vec();
        let decoded = VcfSlice::decode(buf.as_slice())?;

        assert_eq!(decoded, slice);
        assert_eq!(decoded.records[0].filter_index, None);
        assert_eq!(decoded.records[0].samples[0].gt_index, Some(0));

        Ok(())
    }
}
