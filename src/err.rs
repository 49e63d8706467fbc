//! Error types of the slice codec.

use std::num::ParseFloatError;

/// Errors raised while building dictionaries, encoding or decoding slices.
///
/// All of these are fatal for the batch being processed; there is no partial output.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("variant {variant} has {count} studies, exactly one is supported")]
    MultipleStudies { variant: String, count: usize },
    #[error("variant {variant} has {count} files, at most one is supported")]
    MultipleFiles { variant: String, count: usize },
    #[error("variant {variant} has no study")]
    MissingStudy { variant: String },
    #[error("{kind} value {value:?} not found in slice dictionary")]
    NotInDictionary { kind: DictKind, value: String },
    #[error("{kind} index {index} out of range for dictionary of size {size}")]
    IndexOutOfRange {
        kind: DictKind,
        index: u32,
        size: usize,
    },
    #[error("GT must be the first sample data key, found at position {position} in {format:?}")]
    GenotypeNotFirst { format: String, position: usize },
    #[error("INFO key count {keys} does not match value count {values}")]
    InfoCountMismatch { keys: usize, values: usize },
    #[error("invalid quality value {value:?}: {source}")]
    InvalidQuality {
        value: String,
        source: ParseFloatError,
    },
    #[error("variant on {found} cannot be placed in slice of chromosome {expected}")]
    ChromosomeMismatch { expected: String, found: String },
    #[error("position {position} does not fit into a slice anchored at {anchor}")]
    PositionOutOfRange { anchor: u32, position: u32 },
    #[error("offset {offset} from slice position {anchor} is out of range")]
    OffsetOutOfRange { anchor: u32, offset: i64 },
    #[error("sample without genotype index in record with FORMAT {format:?}")]
    MissingGenotypeIndex { format: String },
    #[error("slice has no field dictionary")]
    MissingFields,
    #[error("unknown variant type {0} in record")]
    UnknownVariantType(i32),
}

/// The dictionaries of a slice, used for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum DictKind {
    Filter,
    Info,
    Format,
    Genotype,
}
