//! Адаптер для конвертации tree-sitter дерева в наш AST

use tree_sitter::{Node, Tree};

use super::ast::*;
use crate::core::{ParseError, Position};

/// Конвертер tree-sitter дерева в Python AST
pub struct TreeSitterAdapter<'src> {
    source: &'src str,
}

impl<'src> TreeSitterAdapter<'src> {
    pub fn new(source: &'src str) -> Self {
        Self { source }
    }

    /// Конвертирует дерево в AST, отклоняя деревья с синтаксическими ошибками
    pub fn convert_tree_to_ast(&self, tree: &Tree) -> Result<Module, ParseError> {
        let root = tree.root_node();

        if root.has_error() {
            return Err(self.first_syntax_error(root));
        }
        if let Some(err) = self.first_invalid_construct(root) {
            return Err(err);
        }

        Ok(Module {
            body: self.block(root),
        })
    }

    /// Находит первый ERROR или MISSING узел (обход в прямом порядке)
    fn first_syntax_error(&self, root: Node) -> ParseError {
        let mut cursor = root.walk();

        loop {
            let node = cursor.node();
            let position = Position::from_ts_point(node.start_position(), node.start_byte());

            if node.is_missing() {
                return ParseError::Missing {
                    position,
                    expected: node.kind().to_string(),
                };
            }
            if node.is_error() {
                return ParseError::Syntax {
                    position,
                    snippet: snippet(self.text(node)),
                };
            }

            if node.has_error() && cursor.goto_first_child() {
                continue;
            }

            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    // has_error() на корне, но конкретный узел не найден
                    return ParseError::Syntax {
                        position: Position::from_ts_point(root.start_position(), 0),
                        snippet: snippet(self.text(root)),
                    };
                }
            }
        }
    }

    /// Грамматика tree-sitter шире Python 3: операторы `print`/`exec`,
    /// литералы `017` и `10L`, неверный порядок аргументов и параметров
    /// разбираются без ERROR узлов. Первый такой узел (в прямом порядке)
    /// становится синтаксической ошибкой.
    fn first_invalid_construct(&self, root: Node) -> Option<ParseError> {
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            if let Some(offending) = self.invalid_node(node) {
                return Some(ParseError::Syntax {
                    position: Position::from_ts_point(offending.start_position(), offending.start_byte()),
                    snippet: snippet(self.text(offending)),
                });
            }
            stack.extend(named_children(node).into_iter().rev());
        }

        None
    }

    fn invalid_node<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        match node.kind() {
            "print_statement" if !is_print_call(node) => Some(node),
            "exec_statement" => Some(node),
            "integer" if !is_python3_integer(self.text(node)) => Some(node),
            "argument_list" => misordered_argument(node),
            "parameters" | "lambda_parameters" => misordered_parameter(node),
            _ => None,
        }
    }

    fn text(&self, node: Node) -> &'src str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    // ----------------------------------------------------------------
    // Statements
    // ----------------------------------------------------------------

    /// Парсит блок (или модуль) в список операторов
    fn block(&self, node: Node) -> Vec<Stmt> {
        named_children(node)
            .into_iter()
            .map(|child| self.statement(child))
            .collect()
    }

    fn body_field(&self, node: Node, field: &str) -> Vec<Stmt> {
        node.child_by_field_name(field)
            .map(|body| self.block(body))
            .unwrap_or_default()
    }

    fn statement(&self, node: Node) -> Stmt {
        match node.kind() {
            "expression_statement" => self.expression_statement(node),
            "return_statement" => Stmt::Return(first_named(node).map(|value| self.expr(value))),
            "delete_statement" => Stmt::Delete(
                first_named(node)
                    .map(|targets| self.expr_items(targets))
                    .unwrap_or_default(),
            ),
            "raise_statement" => {
                let cause = node.child_by_field_name("cause");
                let exc = named_children(node)
                    .into_iter()
                    .find(|child| Some(*child) != cause);
                Stmt::Raise {
                    exc: exc.map(|e| self.expr(e)),
                    cause: cause.map(|c| self.expr(c)),
                }
            }
            "assert_statement" => {
                let children = named_children(node);
                Stmt::Assert {
                    test: children
                        .first()
                        .map(|test| self.expr(*test))
                        .unwrap_or_else(|| missing("assert")),
                    msg: children.get(1).map(|msg| self.expr(*msg)),
                }
            }
            "pass_statement" => Stmt::Pass,
            "break_statement" => Stmt::Break,
            "continue_statement" => Stmt::Continue,
            "global_statement" => Stmt::Global(self.identifiers(node)),
            "nonlocal_statement" => Stmt::Nonlocal(self.identifiers(node)),
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                Stmt::Import
            }
            "if_statement" => self.if_statement(node),
            "for_statement" => Stmt::For {
                is_async: has_token(node, "async"),
                target: self.required_expr(node, "left"),
                iter: self.required_expr(node, "right"),
                body: self.body_field(node, "body"),
                orelse: self.else_clause(node),
            },
            "while_statement" => Stmt::While {
                test: self.required_expr(node, "condition"),
                body: self.body_field(node, "body"),
                orelse: self.else_clause(node),
            },
            "try_statement" => self.try_statement(node),
            "with_statement" => self.with_statement(node),
            "function_definition" => Stmt::FunctionDef(self.function_definition(node, Vec::new())),
            "class_definition" => Stmt::ClassDef(self.class_definition(node, Vec::new())),
            "decorated_definition" => self.decorated_definition(node),
            // `print (a, b)` в Python 3 это вызов с двумя аргументами
            "print_statement" => Stmt::Expr(Expr::Call {
                func: Box::new(Expr::name("print")),
                args: first_named(node)
                    .map(|args| match args.kind() {
                        "tuple" => self.exprs(args),
                        _ => vec![self.expr(args)],
                    })
                    .unwrap_or_default(),
                keywords: Vec::new(),
            }),
            _ => self.other_statement(node),
        }
    }

    fn expression_statement(&self, node: Node) -> Stmt {
        let children = named_children(node);
        match children.as_slice() {
            [single] => match single.kind() {
                "assignment" => self.assignment(*single),
                "augmented_assignment" => {
                    let op = single
                        .child_by_field_name("operator")
                        .and_then(|op| BinOperator::from_token(op.kind()))
                        .unwrap_or(BinOperator::Add);
                    Stmt::AugAssign {
                        target: self.required_expr(*single, "left"),
                        op,
                        value: self.required_expr(*single, "right"),
                    }
                }
                _ => Stmt::Expr(self.expr(*single)),
            },
            many => Stmt::Expr(Expr::Tuple(many.iter().map(|c| self.expr(*c)).collect())),
        }
    }

    /// `a = b = value` и аннотированное присваивание `x: int = value`
    fn assignment(&self, node: Node) -> Stmt {
        if let Some(annotation) = node.child_by_field_name("type") {
            return Stmt::AnnAssign {
                target: self.required_expr(node, "left"),
                annotation: self.expr(annotation),
                value: node.child_by_field_name("right").map(|v| self.expr(v)),
            };
        }

        let mut targets = vec![self.required_expr(node, "left")];
        let mut value = node.child_by_field_name("right");

        while let Some(inner) = value {
            if inner.kind() != "assignment" || inner.child_by_field_name("type").is_some() {
                break;
            }
            targets.push(self.required_expr(inner, "left"));
            value = inner.child_by_field_name("right");
        }

        Stmt::Assign {
            targets,
            value: value
                .map(|v| self.expr(v))
                .unwrap_or_else(|| missing("assignment")),
        }
    }

    fn if_statement(&self, node: Node) -> Stmt {
        let mut cursor = node.walk();
        let alternatives: Vec<Node> = node
            .children_by_field_name("alternative", &mut cursor)
            .collect();

        // ИначеЕсли разворачиваем в цепочку вложенных If, начиная с конца
        let mut orelse = Vec::new();
        for alternative in alternatives.iter().rev() {
            match alternative.kind() {
                "else_clause" => orelse = self.body_field(*alternative, "body"),
                "elif_clause" => {
                    orelse = vec![Stmt::If {
                        test: self.required_expr(*alternative, "condition"),
                        body: self.body_field(*alternative, "consequence"),
                        orelse: std::mem::take(&mut orelse),
                    }];
                }
                _ => {}
            }
        }

        Stmt::If {
            test: self.required_expr(node, "condition"),
            body: self.body_field(node, "consequence"),
            orelse,
        }
    }

    fn else_clause(&self, node: Node) -> Vec<Stmt> {
        node.child_by_field_name("alternative")
            .filter(|alt| alt.kind() == "else_clause")
            .map(|alt| self.body_field(alt, "body"))
            .unwrap_or_default()
    }

    fn try_statement(&self, node: Node) -> Stmt {
        let mut handlers = Vec::new();
        let mut orelse = Vec::new();
        let mut finalbody = Vec::new();

        for child in named_children(node) {
            match child.kind() {
                "except_clause" | "except_group_clause" => handlers.push(self.except_clause(child)),
                "else_clause" => orelse = self.body_field(child, "body"),
                "finally_clause" => {
                    finalbody = named_children(child)
                        .into_iter()
                        .find(|c| c.kind() == "block")
                        .map(|b| self.block(b))
                        .unwrap_or_default();
                }
                _ => {}
            }
        }

        Stmt::Try {
            body: self.body_field(node, "body"),
            handlers,
            orelse,
            finalbody,
        }
    }

    fn except_clause(&self, node: Node) -> ExceptHandler {
        let children = named_children(node);
        let body = children
            .iter()
            .find(|c| c.kind() == "block")
            .map(|b| self.block(*b))
            .unwrap_or_default();
        let exprs: Vec<Node> = children
            .into_iter()
            .filter(|c| c.kind() != "block")
            .collect();

        let (type_, name) = match exprs.as_slice() {
            [] => (None, None),
            [single] if single.kind() == "as_pattern" => {
                let (value, alias) = self.as_pattern(*single);
                (Some(value), alias)
            }
            [single] => (Some(self.expr(*single)), None),
            [type_, name, ..] => (Some(self.expr(*type_)), Some(self.expr(*name))),
        };

        ExceptHandler { type_, name, body }
    }

    fn with_statement(&self, node: Node) -> Stmt {
        let mut items = Vec::new();
        for clause in named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "with_clause")
        {
            for item in named_children(clause)
                .into_iter()
                .filter(|c| c.kind() == "with_item")
            {
                let value = item
                    .child_by_field_name("value")
                    .or_else(|| first_named(item));
                let with_item = match value {
                    Some(v) if v.kind() == "as_pattern" => {
                        let (context, target) = self.as_pattern(v);
                        WithItem { context, target }
                    }
                    Some(v) => WithItem {
                        context: self.expr(v),
                        target: None,
                    },
                    None => WithItem {
                        context: missing("with_item"),
                        target: None,
                    },
                };
                items.push(with_item);
            }
        }

        Stmt::With {
            is_async: has_token(node, "async"),
            items,
            body: self.body_field(node, "body"),
        }
    }

    /// `value as target`
    fn as_pattern(&self, node: Node) -> (Expr, Option<Expr>) {
        let alias = node.child_by_field_name("alias");
        let value = named_children(node)
            .into_iter()
            .find(|c| Some(*c) != alias)
            .map(|v| self.expr(v))
            .unwrap_or_else(|| missing("as_pattern"));
        let target = alias.map(|a| match first_named(a) {
            Some(inner) => self.expr(inner),
            None => self.expr(a),
        });
        (value, target)
    }

    fn function_definition(&self, node: Node, decorators: Vec<Expr>) -> FunctionDef {
        FunctionDef {
            name: node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default(),
            is_async: has_token(node, "async"),
            params: node
                .child_by_field_name("parameters")
                .map(|p| self.parameters(p))
                .unwrap_or_default(),
            returns: node.child_by_field_name("return_type").map(|r| self.expr(r)),
            decorators,
            body: self.body_field(node, "body"),
        }
    }

    fn class_definition(&self, node: Node, decorators: Vec<Expr>) -> ClassDef {
        let (bases, keywords) = node
            .child_by_field_name("superclasses")
            .map(|args| self.argument_list(args))
            .unwrap_or_default();

        ClassDef {
            name: node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default(),
            bases,
            keywords,
            decorators,
            body: self.body_field(node, "body"),
        }
    }

    fn decorated_definition(&self, node: Node) -> Stmt {
        let decorators: Vec<Expr> = named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "decorator")
            .filter_map(first_named)
            .map(|d| self.expr(d))
            .collect();

        match node.child_by_field_name("definition") {
            Some(def) if def.kind() == "function_definition" => {
                Stmt::FunctionDef(self.function_definition(def, decorators))
            }
            Some(def) if def.kind() == "class_definition" => {
                Stmt::ClassDef(self.class_definition(def, decorators))
            }
            _ => self.other_statement(node),
        }
    }

    /// Узлы без отдельного варианта: дети всё равно конвертируются
    fn other_statement(&self, node: Node) -> Stmt {
        let mut exprs = Vec::new();
        let mut blocks = Vec::new();

        for child in named_children(node) {
            let kind = child.kind();
            if kind == "block" {
                blocks.push(self.block(child));
            } else if kind.ends_with("_statement") || kind.ends_with("_clause") {
                blocks.push(vec![self.statement(child)]);
            } else {
                exprs.push(self.expr(child));
            }
        }

        Stmt::Other {
            kind: node.kind().to_string(),
            exprs,
            blocks,
        }
    }

    fn identifiers(&self, node: Node) -> Vec<String> {
        named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "identifier")
            .map(|c| self.text(c).to_string())
            .collect()
    }

    // ----------------------------------------------------------------
    // Parameters
    // ----------------------------------------------------------------

    /// Парсит `parameters` и `lambda_parameters`
    fn parameters(&self, node: Node) -> Parameters {
        let mut params = Parameters::default();
        let mut kind = ParamKind::Regular;

        for child in named_children(node) {
            match child.kind() {
                "identifier" => {
                    params.params.push(self.param(child, kind, None, None));
                }
                "default_parameter" => {
                    let name = child.child_by_field_name("name").unwrap_or(child);
                    let default = child.child_by_field_name("value").map(|v| self.expr(v));
                    params.params.push(self.param(name, kind, None, default));
                }
                "typed_default_parameter" => {
                    let name = child.child_by_field_name("name").unwrap_or(child);
                    let annotation = child.child_by_field_name("type").map(|t| self.expr(t));
                    let default = child.child_by_field_name("value").map(|v| self.expr(v));
                    params.params.push(self.param(name, kind, annotation, default));
                }
                "typed_parameter" => {
                    let annotation = child.child_by_field_name("type").map(|t| self.expr(t));
                    let Some(inner) = first_named(child) else {
                        continue;
                    };
                    match inner.kind() {
                        "list_splat_pattern" => {
                            params.vararg = Some(Box::new(self.splat_param(inner, annotation)));
                            kind = ParamKind::KeywordOnly;
                        }
                        "dictionary_splat_pattern" => {
                            params.kwarg = Some(Box::new(self.splat_param(inner, annotation)));
                        }
                        _ => params.params.push(self.param(inner, kind, annotation, None)),
                    }
                }
                "list_splat_pattern" => {
                    params.vararg = Some(Box::new(self.splat_param(child, None)));
                    kind = ParamKind::KeywordOnly;
                }
                "dictionary_splat_pattern" => {
                    params.kwarg = Some(Box::new(self.splat_param(child, None)));
                }
                "keyword_separator" => kind = ParamKind::KeywordOnly,
                "positional_separator" => {
                    for param in params.params.iter_mut() {
                        param.kind = ParamKind::PositionalOnly;
                    }
                }
                _ => {}
            }
        }

        params
    }

    fn param(
        &self,
        name: Node,
        kind: ParamKind,
        annotation: Option<Expr>,
        default: Option<Expr>,
    ) -> Param {
        Param {
            name: self.text(name).to_string(),
            kind,
            annotation,
            default,
        }
    }

    fn splat_param(&self, node: Node, annotation: Option<Expr>) -> Param {
        let name = first_named(node).map(|n| self.text(n)).unwrap_or_default();
        Param {
            name: name.to_string(),
            kind: ParamKind::Regular,
            annotation,
            default: None,
        }
    }

    // ----------------------------------------------------------------
    // Expressions
    // ----------------------------------------------------------------

    fn required_expr(&self, node: Node, field: &str) -> Expr {
        node.child_by_field_name(field)
            .map(|child| self.expr(child))
            .unwrap_or_else(|| missing(field))
    }

    /// Элементы `expression_list` (или одно выражение)
    fn expr_items(&self, node: Node) -> Vec<Expr> {
        match node.kind() {
            "expression_list" | "pattern_list" => self.exprs(node),
            _ => vec![self.expr(node)],
        }
    }

    fn exprs(&self, node: Node) -> Vec<Expr> {
        named_children(node)
            .into_iter()
            .map(|child| self.expr(child))
            .collect()
    }

    fn boxed(&self, node: Node, field: &str) -> Box<Expr> {
        Box::new(self.required_expr(node, field))
    }

    fn expr(&self, node: Node) -> Expr {
        match node.kind() {
            "identifier" | "keyword_identifier" => Expr::Name(self.text(node).to_string()),
            "integer" => Expr::Constant(normalize_integer(self.text(node))),
            "float" => Expr::Constant(normalize_float(self.text(node))),
            "true" => Expr::Constant(Constant::True),
            "false" => Expr::Constant(Constant::False),
            "none" => Expr::Constant(Constant::None),
            "ellipsis" => Expr::Constant(Constant::Ellipsis),
            "string" => self.string(node),
            "concatenated_string" => self.concatenated_string(node),
            "parenthesized_expression" | "type" | "parenthesized_list_splat" => {
                match first_named(node) {
                    Some(inner) => self.expr(inner),
                    None => Expr::Tuple(Vec::new()),
                }
            }
            "expression_list" | "pattern_list" | "tuple" | "tuple_pattern" => {
                Expr::Tuple(self.exprs(node))
            }
            "list" | "list_pattern" => Expr::List(self.exprs(node)),
            "set" => Expr::Set(self.exprs(node)),
            "dictionary" => self.dictionary(node),
            "list_splat" | "list_splat_pattern" => Expr::Starred(Box::new(self.inner(node))),
            "dictionary_splat" | "dictionary_splat_pattern" => {
                Expr::DoubleStarred(Box::new(self.inner(node)))
            }
            "attribute" => Expr::Attribute {
                value: self.boxed(node, "object"),
                attr: node
                    .child_by_field_name("attribute")
                    .map(|a| self.text(a).to_string())
                    .unwrap_or_default(),
            },
            "subscript" => {
                let mut cursor = node.walk();
                let mut subscripts: Vec<Expr> = node
                    .children_by_field_name("subscript", &mut cursor)
                    .map(|s| self.expr(s))
                    .collect();
                let slice = if subscripts.len() == 1 {
                    subscripts.remove(0)
                } else {
                    Expr::Tuple(subscripts)
                };
                Expr::Subscript {
                    value: self.boxed(node, "value"),
                    slice: Box::new(slice),
                }
            }
            "slice" => self.slice(node),
            "call" => self.call(node),
            "binary_operator" => {
                let op = node
                    .child_by_field_name("operator")
                    .and_then(|op| BinOperator::from_token(op.kind()));
                match op {
                    Some(op) => Expr::BinOp {
                        left: self.boxed(node, "left"),
                        op,
                        right: self.boxed(node, "right"),
                    },
                    None => self.other_expr(node),
                }
            }
            "unary_operator" => {
                let op = match node.child_by_field_name("operator").map(|op| op.kind()) {
                    Some("-") => UnaryOperator::USub,
                    Some("+") => UnaryOperator::UAdd,
                    _ => UnaryOperator::Invert,
                };
                Expr::UnaryOp {
                    op,
                    operand: self.boxed(node, "argument"),
                }
            }
            "not_operator" => Expr::UnaryOp {
                op: UnaryOperator::Not,
                operand: self.boxed(node, "argument"),
            },
            "boolean_operator" => self.boolean_operator(node),
            "comparison_operator" => self.comparison(node),
            "lambda" => Expr::Lambda {
                params: Box::new(
                    node.child_by_field_name("parameters")
                        .map(|p| self.parameters(p))
                        .unwrap_or_default(),
                ),
                body: self.boxed(node, "body"),
            },
            "conditional_expression" => {
                let mut parts = self.exprs(node).into_iter();
                let body = parts.next().unwrap_or_else(|| missing("body"));
                let test = parts.next().unwrap_or_else(|| missing("test"));
                let orelse = parts.next().unwrap_or_else(|| missing("orelse"));
                Expr::IfExp {
                    test: Box::new(test),
                    body: Box::new(body),
                    orelse: Box::new(orelse),
                }
            }
            "named_expression" => Expr::NamedExpr {
                target: self.boxed(node, "name"),
                value: self.boxed(node, "value"),
            },
            "await" => Expr::Await(Box::new(self.inner(node))),
            "yield" => {
                let value = first_named(node).map(|v| Box::new(self.expr(v)));
                match value {
                    Some(value) if has_token(node, "from") => Expr::YieldFrom(value),
                    value => Expr::Yield(value),
                }
            }
            "list_comprehension" => Expr::ListComp {
                elt: self.boxed(node, "body"),
                generators: self.comprehension_clauses(node),
            },
            "set_comprehension" => Expr::SetComp {
                elt: self.boxed(node, "body"),
                generators: self.comprehension_clauses(node),
            },
            "generator_expression" => Expr::GeneratorExp {
                elt: self.boxed(node, "body"),
                generators: self.comprehension_clauses(node),
            },
            "dictionary_comprehension" => {
                let pair = node.child_by_field_name("body");
                Expr::DictComp {
                    key: Box::new(
                        pair.map(|p| self.required_expr(p, "key"))
                            .unwrap_or_else(|| missing("key")),
                    ),
                    value: Box::new(
                        pair.map(|p| self.required_expr(p, "value"))
                            .unwrap_or_else(|| missing("value")),
                    ),
                    generators: self.comprehension_clauses(node),
                }
            }
            _ => self.other_expr(node),
        }
    }

    fn inner(&self, node: Node) -> Expr {
        first_named(node)
            .map(|inner| self.expr(inner))
            .unwrap_or_else(|| missing(node.kind()))
    }

    fn other_expr(&self, node: Node) -> Expr {
        Expr::Other {
            kind: node.kind().to_string(),
            children: self.exprs(node),
        }
    }

    fn dictionary(&self, node: Node) -> Expr {
        let entries = named_children(node)
            .into_iter()
            .map(|child| match child.kind() {
                "pair" => (
                    Some(self.required_expr(child, "key")),
                    self.required_expr(child, "value"),
                ),
                "dictionary_splat" => (None, self.inner(child)),
                _ => (None, self.expr(child)),
            })
            .collect();
        Expr::Dict(entries)
    }

    /// Части среза разделены токенами `:`
    fn slice(&self, node: Node) -> Expr {
        let mut parts: [Option<Box<Expr>>; 3] = [None, None, None];
        let mut index = 0;

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            if child.kind() == ":" {
                index += 1;
            } else if child.is_named() && !child.is_extra() && index < parts.len() {
                parts[index] = Some(Box::new(self.expr(child)));
            }
        }

        let [lower, upper, step] = parts;
        Expr::Slice { lower, upper, step }
    }

    fn call(&self, node: Node) -> Expr {
        let func = self.boxed(node, "function");
        let (args, keywords) = match node.child_by_field_name("arguments") {
            Some(arguments) if arguments.kind() == "generator_expression" => {
                (vec![self.expr(arguments)], Vec::new())
            }
            Some(arguments) => self.argument_list(arguments),
            None => (Vec::new(), Vec::new()),
        };
        Expr::Call {
            func,
            args,
            keywords,
        }
    }

    fn argument_list(&self, node: Node) -> (Vec<Expr>, Vec<Keyword>) {
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        for child in named_children(node) {
            match child.kind() {
                "keyword_argument" => keywords.push(Keyword {
                    arg: child
                        .child_by_field_name("name")
                        .map(|n| self.text(n).to_string()),
                    value: self.required_expr(child, "value"),
                }),
                "dictionary_splat" => keywords.push(Keyword {
                    arg: None,
                    value: self.inner(child),
                }),
                _ => args.push(self.expr(child)),
            }
        }

        (args, keywords)
    }

    /// `a and b and c` становится одним BoolOp с тремя значениями
    fn boolean_operator(&self, node: Node) -> Expr {
        let op = match node.child_by_field_name("operator").map(|op| op.kind()) {
            Some("or") => BoolOperator::Or,
            _ => BoolOperator::And,
        };

        let mut values = Vec::new();
        self.collect_bool_operands(node, op, &mut values);
        Expr::BoolOp { op, values }
    }

    fn collect_bool_operands(&self, node: Node, op: BoolOperator, values: &mut Vec<Expr>) {
        let token = match op {
            BoolOperator::And => "and",
            BoolOperator::Or => "or",
        };
        for field in ["left", "right"] {
            let Some(operand) = node.child_by_field_name(field) else {
                continue;
            };
            let same_op = operand.kind() == "boolean_operator"
                && operand
                    .child_by_field_name("operator")
                    .map(|o| o.kind() == token)
                    .unwrap_or(false);
            if same_op {
                self.collect_bool_operands(operand, op, values);
            } else {
                values.push(self.expr(operand));
            }
        }
    }

    fn comparison(&self, node: Node) -> Expr {
        let mut cursor = node.walk();
        let ops: Vec<CmpOperator> = node
            .children_by_field_name("operators", &mut cursor)
            .filter_map(|op| CmpOperator::from_token(op.kind()))
            .collect();

        let mut operands = self.exprs(node).into_iter();
        let left = operands.next().unwrap_or_else(|| missing("left"));

        Expr::Compare {
            left: Box::new(left),
            ops,
            comparators: operands.collect(),
        }
    }

    fn comprehension_clauses(&self, node: Node) -> Vec<Comprehension> {
        let mut generators: Vec<Comprehension> = Vec::new();

        for child in named_children(node) {
            match child.kind() {
                "for_in_clause" => {
                    let mut cursor = child.walk();
                    let mut iters: Vec<Expr> = child
                        .children_by_field_name("right", &mut cursor)
                        .map(|r| self.expr(r))
                        .collect();
                    let iter = if iters.len() == 1 {
                        iters.remove(0)
                    } else {
                        Expr::Tuple(iters)
                    };
                    generators.push(Comprehension {
                        is_async: has_token(child, "async"),
                        target: self.required_expr(child, "left"),
                        iter,
                        ifs: Vec::new(),
                    });
                }
                "if_clause" => {
                    let condition = self.inner(child);
                    if let Some(last) = generators.last_mut() {
                        last.ifs.push(condition);
                    }
                }
                _ => {}
            }
        }

        generators
    }

    // ----------------------------------------------------------------
    // Literals
    // ----------------------------------------------------------------

    fn string(&self, node: Node) -> Expr {
        let text = self.text(node);
        let prefix = string_prefix(text);

        if prefix.contains('f') {
            return Expr::JoinedStr(self.interpolations(node));
        }
        if prefix.contains('b') {
            return Expr::Constant(Constant::Bytes(text[prefix.len()..].to_string()));
        }
        Expr::Constant(Constant::Str(text[prefix.len()..].to_string()))
    }

    fn interpolations(&self, node: Node) -> Vec<Expr> {
        named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "interpolation")
            .filter_map(|c| c.child_by_field_name("expression").or_else(|| first_named(c)))
            .map(|e| self.expr(e))
            .collect()
    }

    fn concatenated_string(&self, node: Node) -> Expr {
        let parts: Vec<Node> = named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "string")
            .collect();

        let prefixes: Vec<String> = parts.iter().map(|p| string_prefix(self.text(*p))).collect();

        if prefixes.iter().any(|p| p.contains('f')) {
            let values = parts
                .iter()
                .flat_map(|p| self.interpolations(*p))
                .collect();
            return Expr::JoinedStr(values);
        }

        let text: String = parts
            .iter()
            .zip(&prefixes)
            .map(|(p, prefix)| &self.text(*p)[prefix.len()..])
            .collect();

        if !prefixes.is_empty() && prefixes.iter().all(|p| p.contains('b')) {
            Expr::Constant(Constant::Bytes(text))
        } else {
            Expr::Constant(Constant::Str(text))
        }
    }
}

/// Именованные дети без комментариев и других extras
fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect();
    children
}

fn first_named(node: Node) -> Option<Node> {
    named_children(node).into_iter().next()
}

/// Есть ли среди детей анонимный токен `token` (`async`, `from`)
fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token);
    found
}

/// `print (x)` грамматика может разобрать как оператор Python 2; это
/// допустимый вызов, если скобки охватывают весь оператор
fn is_print_call(node: Node) -> bool {
    match named_children(node).as_slice() {
        [args] => {
            matches!(args.kind(), "parenthesized_expression" | "tuple")
                && args.end_byte() == node.end_byte()
        }
        _ => false,
    }
}

/// Литерал допустим в Python 3: без суффикса `L` и без ведущего нуля
/// у ненулевого десятичного числа
fn is_python3_integer(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    if lower.ends_with('l') {
        return false;
    }
    if lower.ends_with('j') || ["0x", "0o", "0b"].iter().any(|p| lower.starts_with(p)) {
        return true;
    }

    let digits: String = lower.chars().filter(|c| *c != '_').collect();
    !digits.starts_with('0') || digits.chars().all(|c| c == '0')
}

/// Позиционный аргумент после именованного или `**`, либо `*` после `**`
fn misordered_argument(node: Node) -> Option<Node> {
    let mut seen_keyword = false;
    let mut seen_double_star = false;

    for child in named_children(node) {
        match child.kind() {
            "keyword_argument" => seen_keyword = true,
            "dictionary_splat" => seen_double_star = true,
            "list_splat" if seen_double_star => return Some(child),
            "list_splat" => {}
            _ if seen_keyword || seen_double_star => return Some(child),
            _ => {}
        }
    }

    None
}

/// Параметр без значения по умолчанию после параметра со значением (до
/// `*`), а также распаковка кортежа в параметрах
fn misordered_parameter(node: Node) -> Option<Node> {
    let mut seen_default = false;

    for child in named_children(node) {
        match child.kind() {
            "tuple_pattern" => return Some(child),
            "default_parameter" | "typed_default_parameter" => seen_default = true,
            "identifier" if seen_default => return Some(child),
            "typed_parameter" => match first_named(child).map(|inner| inner.kind()) {
                Some("list_splat_pattern" | "dictionary_splat_pattern") => return None,
                _ if seen_default => return Some(child),
                _ => {}
            },
            "list_splat_pattern" | "dictionary_splat_pattern" | "keyword_separator" => return None,
            _ => {}
        }
    }

    None
}

fn missing(what: &str) -> Expr {
    Expr::Other {
        kind: format!("missing_{}", what),
        children: Vec::new(),
    }
}

fn snippet(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    first_line.chars().take(40).collect()
}

/// Префикс строкового литерала в нижнем регистре (`f`, `rb`, ...)
fn string_prefix(text: &str) -> String {
    text.chars()
        .take_while(|c| *c != '\'' && *c != '"')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Приводит целочисленный литерал к каноническому десятичному виду:
/// `0x10`, `0o20`, `0b1_0000` и `16` дают одну и ту же константу
pub fn normalize_integer(text: &str) -> Constant {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();

    if let Some(imaginary) = cleaned.strip_suffix('j') {
        return Constant::Complex(format!("{}j", float_repr(imaginary)));
    }

    let parsed = if let Some(hex) = cleaned.strip_prefix("0x") {
        u128::from_str_radix(hex, 16)
    } else if let Some(oct) = cleaned.strip_prefix("0o") {
        u128::from_str_radix(oct, 8)
    } else if let Some(bin) = cleaned.strip_prefix("0b") {
        u128::from_str_radix(bin, 2)
    } else {
        cleaned.parse::<u128>()
    };

    match parsed {
        Ok(value) => Constant::Int(value.to_string()),
        Err(_) => Constant::Int(cleaned),
    }
}

/// Приводит литерал с плавающей точкой к виду `f64` (`1.` == `1.0` == `1_0e-1`)
pub fn normalize_float(text: &str) -> Constant {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();

    match cleaned.strip_suffix('j') {
        Some(imaginary) => Constant::Complex(format!("{}j", float_repr(imaginary))),
        None => Constant::Float(float_repr(&cleaned)),
    }
}

fn float_repr(text: &str) -> String {
    match text.parse::<f64>() {
        Ok(value) => format!("{:?}", value),
        Err(_) => text.to_string(),
    }
}
