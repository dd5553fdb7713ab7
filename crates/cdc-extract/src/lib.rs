//! The Mutation Extractor and the Data Model it builds: classifying
//! partition updates and rows, decoding composite
//! partition keys, and turning supported mutations into [`model::Mutation`]
//! records handed to a [`sink::MutationSink`].

pub mod classify;
pub mod digest;
pub mod error;
pub mod extractor;
pub mod keydecode;
pub mod metadata;
pub mod model;
pub mod raw;
pub mod sink;

pub use error::ExtractError;
pub use extractor::Extractor;
pub use model::{CellData, ColumnKind, Mutation, MutationValue, Operation, RowData, SourceInfo};
pub use sink::MutationSink;
