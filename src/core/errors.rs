/*!
# Error types for the similarity core

Parse failures are not recovered inside the core: they surface to the
caller, which decides whether to skip the submission or abort the task.
An empty set of shared units is not an error (it scores 0).
*/

use std::path::PathBuf;
use thiserror::Error;

use super::position::Position;

/// Failure to turn one submission into a syntax tree
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("syntax error at {position}: unexpected `{snippet}`")]
    Syntax { position: Position, snippet: String },

    #[error("syntax error at {position}: missing `{expected}`")]
    Missing { position: Position, expected: String },

    #[error("failed to load Python grammar: {0}")]
    Language(String),

    #[error("parser returned no tree")]
    NoTree,
}

impl ParseError {
    /// Position of the offending node, if the error has one
    pub fn position(&self) -> Option<Position> {
        match self {
            ParseError::Syntax { position, .. } | ParseError::Missing { position, .. } => {
                Some(*position)
            }
            _ => None,
        }
    }
}

/// Errors raised while building a similarity matrix
#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("submission of `{student}` does not parse: {source}")]
    Submission {
        student: String,
        #[source]
        source: ParseError,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SimilarityError {
    pub fn submission(student: impl Into<String>, source: ParseError) -> Self {
        SimilarityError::Submission {
            student: student.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_contains_position() {
        let err = ParseError::Syntax {
            position: Position::new(3, 7, 20),
            snippet: ")".to_string(),
        };
        assert_eq!(err.to_string(), "syntax error at 3:7: unexpected `)`");
        assert_eq!(err.position(), Some(Position::new(3, 7, 20)));
    }

    #[test]
    fn test_submission_error_names_student() {
        let err = SimilarityError::submission("B12345", ParseError::NoTree);
        assert!(err.to_string().contains("B12345"));
    }
}
