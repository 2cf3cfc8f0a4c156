//! Parsing primitives for the legacy characteristics encoding.
//!
//! Parsing is lossy: segments with unknown labels are dropped and
//! never abort the rest of the row.

mod builder;
mod normalizer;
mod tokenizer;
pub mod values;

pub use builder::LegacyRecordBuilder;
pub use normalizer::{LabelNormalizer, NormalizedSegment};
pub use tokenizer::{tokenize, SEGMENT_DELIMITER};
