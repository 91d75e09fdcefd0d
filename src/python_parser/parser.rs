//! Python Parser на базе tree-sitter

use tracing::debug;
use tree_sitter::Parser;

use super::ast::Module;
use super::tree_sitter_adapter::TreeSitterAdapter;
use crate::core::ParseError;

/// Python parser.
///
/// Holds no tree-sitter state: every call builds its own `tree_sitter::Parser`,
/// so one instance can be shared between worker threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonParser;

impl PythonParser {
    /// Создает новый экземпляр парсера
    pub fn new() -> Self {
        Self
    }

    /// Парсит исходный код в типизированный AST
    pub fn parse(&self, source: &str) -> Result<Module, ParseError> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::language();
        parser
            .set_language(&language)
            .map_err(|e| ParseError::Language(e.to_string()))?;

        let tree = parser.parse(source, None).ok_or(ParseError::NoTree)?;
        let module = TreeSitterAdapter::new(source).convert_tree_to_ast(&tree)?;

        debug!("Parsed module with {} top-level statements", module.body.len());
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python_parser::ast::*;

    fn parse(source: &str) -> Module {
        PythonParser::new().parse(source).unwrap()
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").body.is_empty());
    }

    #[test]
    fn test_parse_function_with_all_parameter_kinds() {
        let module = parse("def f(a, /, b, c=1, *args, d, e=2, **kw) -> int:\n    return a\n");
        let Stmt::FunctionDef(def) = &module.body[0] else {
            panic!("expected function, got {:?}", module.body[0]);
        };
        assert_eq!(def.name, "f");
        let kinds: Vec<ParamKind> = def.params.params.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParamKind::PositionalOnly,
                ParamKind::Regular,
                ParamKind::Regular,
                ParamKind::KeywordOnly,
                ParamKind::KeywordOnly,
            ]
        );
        assert_eq!(def.params.vararg.as_ref().map(|p| p.name.as_str()), Some("args"));
        assert_eq!(def.params.kwarg.as_ref().map(|p| p.name.as_str()), Some("kw"));
        assert!(def.returns.is_some());
        assert_eq!(def.body, vec![Stmt::Return(Some(Expr::name("a")))]);
    }

    #[test]
    fn test_parse_comparison_and_elif_chain() {
        let module = parse("if x <= 1:\n    pass\nelif x > 2:\n    pass\nelse:\n    y = 3\n");
        let Stmt::If { test, orelse, .. } = &module.body[0] else {
            panic!("expected if");
        };
        assert_eq!(
            test,
            &Expr::Compare {
                left: Box::new(Expr::name("x")),
                ops: vec![CmpOperator::LtE],
                comparators: vec![Expr::Constant(Constant::Int("1".to_string()))],
            }
        );
        assert!(matches!(orelse.as_slice(), [Stmt::If { orelse, .. }] if orelse.len() == 1));
    }

    #[test]
    fn test_parse_call_with_keywords_and_docstring() {
        let module = parse("\"\"\"doc\"\"\"\nshow(x, sep=', ', **opts)\n");
        assert!(matches!(&module.body[0], Stmt::Expr(e) if e.is_string()));
        let Stmt::Expr(Expr::Call { args, keywords, .. }) = &module.body[1] else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 1);
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0].arg.as_deref(), Some("sep"));
        assert!(keywords[1].arg.is_none());
    }

    #[test]
    fn test_parse_chained_boolean_is_flattened() {
        let module = parse("z = a and b and c\n");
        let Stmt::Assign { value, .. } = &module.body[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(value, Expr::BoolOp { op: BoolOperator::And, values } if values.len() == 3));
    }

    #[test]
    fn test_parse_chained_assignment() {
        let module = parse("a = b = 0\n");
        assert!(matches!(&module.body[0], Stmt::Assign { targets, .. } if targets.len() == 2));
    }

    #[test]
    fn test_comments_are_ignored() {
        let with_comments = parse("# header\nx = 1  # trailing\n");
        let without = parse("x = 1\n");
        assert_eq!(with_comments, without);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = PythonParser::new().parse("def f(:\n    return\n").unwrap_err();
        assert!(err.position().is_some(), "unexpected error: {err}");
    }

    #[test]
    fn test_source_outside_python3_is_rejected() {
        let parser = PythonParser::new();
        let invalid = [
            "print 'x'\n",
            "exec 'x = 1'\n",
            "x = 017\n",
            "x = 10L\n",
            "x = 0xFFl\n",
            "f(x=1, 2)\n",
            "f(**kw, 2)\n",
            "f(**kw, *args)\n",
            "def f(a=1, b):\n    pass\n",
            "g = lambda a=1, b: a\n",
            "def f((a, b)):\n    pass\n",
        ];
        for source in invalid {
            match parser.parse(source) {
                Ok(module) => panic!("{:?} parsed as {:?}", source, module),
                Err(err) => assert!(err.position().is_some(), "{:?}: {}", source, err),
            }
        }
    }

    #[test]
    fn test_python3_forms_close_to_rejected_ones_parse() {
        let parser = PythonParser::new();
        let valid = [
            "print('x')\n",
            "print (x)\n",
            "x = 0\n",
            "x = 00\n",
            "x = 0_0\n",
            "x = 0o17\n",
            "f(a, *rest, key=1, **kw)\n",
            "f(key=1, *rest)\n",
            "def f(a, b=1, *args, c, d=2, **kw):\n    pass\n",
            "def f(a=1, *, b):\n    pass\n",
            "def f(a=1, /, b=2):\n    pass\n",
            "g = lambda a, b=1: a\n",
        ];
        for source in valid {
            assert!(parser.parse(source).is_ok(), "{:?} rejected", source);
        }
        assert_eq!(parse("print (a, b)\n"), parse("print(a, b)\n"));
    }

    #[test]
    fn test_syntax_error_points_at_offending_literal() {
        let err = PythonParser::new().parse("x = 1\ny = 017\n").unwrap_err();
        let position = err.position().unwrap();
        assert_eq!((position.line, position.column), (2, 5));
    }
}
