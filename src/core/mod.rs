/*!
# Core Module

Shared building blocks: error types, source positions and
file reading helpers.
*/

pub mod errors;
pub mod fs_utils;
pub mod position;

pub use errors::{ParseError, SimilarityError};
pub use fs_utils::{decode_submission, read_submission_file};
pub use position::Position;
