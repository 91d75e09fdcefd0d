/*!
# Source position types

Location of a node inside a submission, used by parse diagnostics.
*/

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in source code (1-based line and column, 0-based byte offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    pub fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// Конвертирует позицию tree-sitter (строки и колонки с нуля)
    pub fn from_ts_point(point: tree_sitter::Point, offset: usize) -> Self {
        Self::new(point.row + 1, point.column + 1, offset)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ts_point_is_one_based() {
        let p = Position::from_ts_point(tree_sitter::Point { row: 0, column: 4 }, 4);
        assert_eq!(p.line, 1);
        assert_eq!(p.column, 5);
        assert_eq!(p.to_string(), "1:5");
    }
}
