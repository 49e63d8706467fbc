//! Compact columnar encoding of VCF variants into slices.
//!
//! Variants of one chromosome and genomic window are grouped into a [`pbs::VcfSlice`] that
//! stores repeated strings once in per-slice dictionaries and positions relative to the
//! slice anchor.

pub mod codec;
pub mod common;
pub mod conf;
pub mod decode;
pub mod encode;
pub mod err;
pub mod inspect;
pub mod model;
pub mod pbs;
pub mod slicefile;
pub mod stats;
