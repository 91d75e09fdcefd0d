//! Python Parser на базе tree-sitter
//!
//! Этот модуль разбирает студенческие решения на Python и строит
//! типизированный AST, пригодный для канонизации.

pub mod ast;
pub mod parser;
pub mod tree_sitter_adapter;

pub use ast::{Expr, ExprKind, Module, Stmt};
pub use parser::PythonParser;
pub use tree_sitter_adapter::TreeSitterAdapter;

/// Поддерживаемые расширения файлов
pub const SUPPORTED_EXTENSIONS: &[&str] = &["py"];
