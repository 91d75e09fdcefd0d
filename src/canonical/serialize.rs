/*!
# Canonical text form

Turns a normalised unit body into lines: one line per statement, nested
blocks indented by four spaces per level, clause markers (`else:`,
`finally:`) on their own lines.

Expressions are written as `Head(field=value, ...)`. Absent fields and
empty lists are omitted. Identifiers and string contents never reach the
output: a name is written as `Name`, a string literal is skipped.
*/

use crate::python_parser::ast::*;

const INDENT: &str = "    ";

/// `Head(field=value, ...)` builder
struct NodeText {
    head: String,
    fields: Vec<String>,
}

impl NodeText {
    fn new(head: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            fields: Vec::new(),
        }
    }

    fn field(mut self, name: &str, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.fields.push(format!("{name}={value}"));
        }
        self
    }

    fn raw(self, name: &str, value: &str) -> Self {
        self.field(name, Some(value.to_string()))
    }

    fn list(mut self, name: &str, values: Vec<String>) -> Self {
        if !values.is_empty() {
            self.fields.push(format!("{name}=[{}]", values.join(", ")));
        }
        self
    }

    fn flag(mut self, name: &str, on: bool) -> Self {
        if on {
            self.fields.push(name.to_string());
        }
        self
    }

    fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.head
        } else {
            format!("{}({})", self.head, self.fields.join(", "))
        }
    }
}

fn boxed(expr: &Expr) -> Option<String> {
    render_expr(expr)
}

fn optional(expr: &Option<Expr>) -> Option<String> {
    expr.as_ref().and_then(render_expr)
}

fn optional_boxed(expr: &Option<Box<Expr>>) -> Option<String> {
    expr.as_deref().and_then(render_expr)
}

/// Renders each expression, skipping the ones with no canonical text
fn exprs(values: &[Expr]) -> Vec<String> {
    values.iter().filter_map(render_expr).collect()
}

/// Canonical text of an expression; `None` for string literals
pub fn render_expr(expr: &Expr) -> Option<String> {
    let text = match expr {
        Expr::Constant(constant) => return render_constant(constant),
        Expr::Name(_) => "Name".to_string(),
        Expr::Attribute { attr, .. } => NodeText::new("Attribute").raw("attr", attr).finish(),
        Expr::Await(value) => NodeText::new("Await").field("value", boxed(value)).finish(),
        Expr::BinOp { left, op, right } => NodeText::new("BinOp")
            .field("left", boxed(left))
            .raw("op", op.as_str())
            .field("right", boxed(right))
            .finish(),
        Expr::BoolOp { op, values } => NodeText::new("BoolOp")
            .raw("op", op.as_str())
            .list("values", exprs(values))
            .finish(),
        Expr::Call {
            func,
            args,
            keywords,
        } => NodeText::new("Call")
            .field("func", boxed(func))
            .list("args", exprs(args))
            .list("keywords", render_keywords(keywords))
            .finish(),
        Expr::Compare {
            left,
            ops,
            comparators,
        } => NodeText::new("Compare")
            .field("left", boxed(left))
            .list("ops", ops.iter().map(|op| op.as_str().to_string()).collect())
            .list("comparators", exprs(comparators))
            .finish(),
        Expr::Dict(entries) => NodeText::new("Dict")
            .list(
                "items",
                entries
                    .iter()
                    .map(|(key, value)| match key {
                        Some(key) => NodeText::new("pair")
                            .field("key", render_expr(key))
                            .field("value", render_expr(value))
                            .finish(),
                        None => NodeText::new("DoubleStarred")
                            .field("value", render_expr(value))
                            .finish(),
                    })
                    .collect(),
            )
            .finish(),
        Expr::DictComp {
            key,
            value,
            generators,
        } => NodeText::new("DictComp")
            .field("key", boxed(key))
            .field("value", boxed(value))
            .list("generators", render_generators(generators))
            .finish(),
        Expr::DoubleStarred(value) => NodeText::new("DoubleStarred")
            .field("value", boxed(value))
            .finish(),
        Expr::GeneratorExp { elt, generators } => comprehension("GeneratorExp", elt, generators),
        Expr::ListComp { elt, generators } => comprehension("ListComp", elt, generators),
        Expr::SetComp { elt, generators } => comprehension("SetComp", elt, generators),
        Expr::IfExp { test, body, orelse } => NodeText::new("IfExp")
            .field("test", boxed(test))
            .field("body", boxed(body))
            .field("orelse", boxed(orelse))
            .finish(),
        Expr::JoinedStr(values) => NodeText::new("JoinedStr")
            .list("values", exprs(values))
            .finish(),
        Expr::Lambda { params, body } => NodeText::new("Lambda")
            .field("args", render_arguments(params))
            .field("body", boxed(body))
            .finish(),
        Expr::List(elts) => NodeText::new("List").list("elts", exprs(elts)).finish(),
        Expr::Set(elts) => NodeText::new("Set").list("elts", exprs(elts)).finish(),
        Expr::Tuple(elts) => NodeText::new("Tuple").list("elts", exprs(elts)).finish(),
        Expr::NamedExpr { target, value } => NodeText::new("NamedExpr")
            .field("target", boxed(target))
            .field("value", boxed(value))
            .finish(),
        Expr::Other { kind, children } => NodeText::new(kind.as_str())
            .list("children", exprs(children))
            .finish(),
        Expr::Slice { lower, upper, step } => NodeText::new("Slice")
            .field("lower", optional_boxed(lower))
            .field("upper", optional_boxed(upper))
            .field("step", optional_boxed(step))
            .finish(),
        Expr::Starred(value) => NodeText::new("Starred").field("value", boxed(value)).finish(),
        Expr::Subscript { value, slice } => NodeText::new("Subscript")
            .field("value", boxed(value))
            .field("slice", boxed(slice))
            .finish(),
        Expr::UnaryOp { op, operand } => NodeText::new("UnaryOp")
            .raw("op", op.as_str())
            .field("operand", boxed(operand))
            .finish(),
        Expr::Yield(value) => NodeText::new("Yield")
            .field("value", optional_boxed(value))
            .finish(),
        Expr::YieldFrom(value) => NodeText::new("YieldFrom")
            .field("value", boxed(value))
            .finish(),
    };
    Some(text)
}

fn render_constant(constant: &Constant) -> Option<String> {
    let value = match constant {
        Constant::Str(_) => return None,
        Constant::Int(v) | Constant::Float(v) | Constant::Complex(v) | Constant::Bytes(v) => {
            v.clone()
        }
        Constant::True => "True".to_string(),
        Constant::False => "False".to_string(),
        Constant::None => "None".to_string(),
        Constant::Ellipsis => "Ellipsis".to_string(),
    };
    Some(format!("Constant({value})"))
}

fn comprehension(head: &str, elt: &Expr, generators: &[Comprehension]) -> String {
    NodeText::new(head)
        .field("elt", render_expr(elt))
        .list("generators", render_generators(generators))
        .finish()
}

fn render_generators(generators: &[Comprehension]) -> Vec<String> {
    generators
        .iter()
        .map(|generator| {
            NodeText::new("comprehension")
                .field("target", render_expr(&generator.target))
                .field("iter", render_expr(&generator.iter))
                .list("ifs", exprs(&generator.ifs))
                .flag("async", generator.is_async)
                .finish()
        })
        .collect()
}

/// Keyword names are identifiers and are not written
fn render_keywords(keywords: &[Keyword]) -> Vec<String> {
    keywords
        .iter()
        .filter_map(|keyword| {
            let value = render_expr(&keyword.value)?;
            Some(match keyword.arg {
                Some(_) => format!("keyword(value={value})"),
                None => format!("keyword(**{value})"),
            })
        })
        .collect()
}

fn render_param(param: &Param) -> String {
    NodeText::new("arg")
        .field("annotation", optional(&param.annotation))
        .finish()
}

/// `arguments(...)`, or `None` for an empty signature
pub fn render_arguments(params: &Parameters) -> Option<String> {
    if params.is_empty() {
        return None;
    }

    let defaults: Vec<String> = params
        .params
        .iter()
        .filter_map(|param| param.default.as_ref())
        .filter_map(render_expr)
        .collect();

    Some(
        NodeText::new("arguments")
            .list("args", params.params.iter().map(render_param).collect())
            .field("vararg", params.vararg.as_deref().map(render_param))
            .field("kwarg", params.kwarg.as_deref().map(render_param))
            .list("defaults", defaults)
            .finish(),
    )
}

/// Writes statements as indented lines
#[derive(Debug, Default)]
pub struct LineWriter {
    lines: Vec<String>,
    depth: usize,
}

impl LineWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    fn line(&mut self, text: impl AsRef<str>) {
        self.lines
            .push(format!("{}{}", INDENT.repeat(self.depth), text.as_ref()));
    }

    fn nested(&mut self, body: &[Stmt]) {
        self.depth += 1;
        self.block(body);
        self.depth -= 1;
    }

    fn clause(&mut self, marker: &str, body: &[Stmt]) {
        if body.is_empty() {
            return;
        }
        self.line(marker);
        self.nested(body);
    }

    /// Signature line of a function unit. Written only when the signature
    /// carries something: parameters, a return annotation or `async`.
    pub fn signature(&mut self, def: &FunctionDef) {
        let node = NodeText::new("FunctionDef")
            .flag("async", def.is_async)
            .field("args", render_arguments(&def.params))
            .field("returns", optional(&def.returns));
        if node.has_fields() {
            self.line(node.finish());
        }
    }

    pub fn block(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.statement(stmt);
        }
    }

    pub fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            // функции к этому моменту вынесены в отдельные единицы
            Stmt::FunctionDef(_) | Stmt::Import => {}
            Stmt::ClassDef(class) => {
                self.line(
                    NodeText::new("ClassDef")
                        .list("bases", exprs(&class.bases))
                        .list("keywords", render_keywords(&class.keywords))
                        .finish(),
                );
                self.nested(&class.body);
            }
            Stmt::Return(value) => {
                self.line(NodeText::new("Return").field("value", optional(value)).finish())
            }
            Stmt::Delete(targets) => {
                self.line(NodeText::new("Delete").list("targets", exprs(targets)).finish())
            }
            Stmt::Assign { targets, value } => self.line(
                NodeText::new("Assign")
                    .list("targets", exprs(targets))
                    .field("value", render_expr(value))
                    .finish(),
            ),
            Stmt::AnnAssign {
                target,
                annotation,
                value,
            } => self.line(
                NodeText::new("AnnAssign")
                    .field("target", render_expr(target))
                    .field("annotation", render_expr(annotation))
                    .field("value", optional(value))
                    .finish(),
            ),
            Stmt::AugAssign { target, op, value } => self.line(
                NodeText::new("AugAssign")
                    .field("target", render_expr(target))
                    .raw("op", op.as_str())
                    .field("value", render_expr(value))
                    .finish(),
            ),
            Stmt::For {
                is_async,
                target,
                iter,
                body,
                orelse,
            } => {
                self.line(
                    NodeText::new("For")
                        .field("target", render_expr(target))
                        .field("iter", render_expr(iter))
                        .flag("async", *is_async)
                        .finish(),
                );
                self.nested(body);
                self.clause("else:", orelse);
            }
            Stmt::While { test, body, orelse } => {
                self.line(NodeText::new("While").field("test", render_expr(test)).finish());
                self.nested(body);
                self.clause("else:", orelse);
            }
            Stmt::If { test, body, orelse } => {
                self.line(NodeText::new("If").field("test", render_expr(test)).finish());
                self.nested(body);
                self.clause("else:", orelse);
            }
            Stmt::With {
                is_async,
                items,
                body,
            } => {
                let items = items
                    .iter()
                    .map(|item| {
                        NodeText::new("withitem")
                            .field("context", render_expr(&item.context))
                            .field("target", optional(&item.target))
                            .finish()
                    })
                    .collect();
                self.line(
                    NodeText::new("With")
                        .list("items", items)
                        .flag("async", *is_async)
                        .finish(),
                );
                self.nested(body);
            }
            Stmt::Raise { exc, cause } => self.line(
                NodeText::new("Raise")
                    .field("exc", optional(exc))
                    .field("cause", optional(cause))
                    .finish(),
            ),
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.line("Try");
                self.nested(body);
                for handler in handlers {
                    self.line(
                        NodeText::new("ExceptHandler")
                            .field("type", optional(&handler.type_))
                            .field("name", optional(&handler.name))
                            .finish(),
                    );
                    self.nested(&handler.body);
                }
                self.clause("else:", orelse);
                self.clause("finally:", finalbody);
            }
            Stmt::Assert { test, msg } => self.line(
                NodeText::new("Assert")
                    .field("test", render_expr(test))
                    .field("msg", optional(msg))
                    .finish(),
            ),
            Stmt::Global(names) => self.line(format!("Global(names={})", names.len())),
            Stmt::Nonlocal(names) => self.line(format!("Nonlocal(names={})", names.len())),
            Stmt::Expr(value) => {
                self.line(NodeText::new("Expr").field("value", render_expr(value)).finish())
            }
            Stmt::Pass => self.line("Pass"),
            Stmt::Break => self.line("Break"),
            Stmt::Continue => self.line("Continue"),
            Stmt::Other {
                kind,
                exprs: children,
                blocks,
            } => {
                self.line(NodeText::new(kind.as_str()).list("children", exprs(children)).finish());
                for (index, block) in blocks.iter().enumerate() {
                    if index > 0 {
                        self.line("block:");
                    }
                    self.nested(block);
                }
            }
        }
    }
}

/// Lines of the module-level unit
pub fn serialize_block(body: &[Stmt]) -> Vec<String> {
    let mut writer = LineWriter::new();
    writer.block(body);
    writer.into_lines()
}

/// Lines of a function unit: optional signature line, then the body
pub fn serialize_function(def: &FunctionDef) -> Vec<String> {
    let mut writer = LineWriter::new();
    writer.signature(def);
    writer.block(&def.body);
    writer.into_lines()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python_parser::PythonParser;
    use pretty_assertions::assert_eq;

    fn lines(source: &str) -> Vec<String> {
        let module = PythonParser::new().parse(source).unwrap();
        serialize_block(&module.body)
    }

    #[test]
    fn test_names_are_not_written() {
        assert_eq!(lines("total = count + 1\n"), lines("s = n + 1\n"));
        assert_eq!(
            lines("total = count + 1\n"),
            vec!["Assign(targets=[Name], value=BinOp(left=Name, op=Add, right=Constant(1)))"]
        );
    }

    #[test]
    fn test_string_literals_are_skipped() {
        assert_eq!(
            lines("greet('hello', who)\n"),
            vec!["Expr(value=Call(func=Name, args=[Name]))"]
        );
    }

    #[test]
    fn test_nested_blocks_are_indented() {
        let source = "for i in range(3):\n    if i:\n        break\nelse:\n    pass\n";
        assert_eq!(
            lines(source),
            vec![
                "For(target=Name, iter=Call(func=Name, args=[Constant(3)]))",
                "    If(test=Name)",
                "        Break",
                "else:",
                "    Pass",
            ]
        );
    }

    #[test]
    fn test_try_clauses() {
        let source = "try:\n    x = 1\nexcept ValueError as e:\n    pass\nfinally:\n    y = 2\n";
        assert_eq!(
            lines(source),
            vec![
                "Try",
                "    Assign(targets=[Name], value=Constant(1))",
                "ExceptHandler(type=Name, name=Name)",
                "    Pass",
                "finally:",
                "    Assign(targets=[Name], value=Constant(2))",
            ]
        );
    }

    #[test]
    fn test_signature_line_only_when_signature_has_content() {
        let module = PythonParser::new()
            .parse("def f():\n    return 1\n\ndef g(a, b=2):\n    return a\n")
            .unwrap();
        let defs: Vec<&FunctionDef> = module
            .body
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::FunctionDef(def) => Some(def),
                _ => None,
            })
            .collect();

        assert_eq!(serialize_function(defs[0]), vec!["Return(value=Constant(1))"]);
        assert_eq!(
            serialize_function(defs[1]),
            vec![
                "FunctionDef(args=arguments(args=[arg, arg], defaults=[Constant(2)]))",
                "Return(value=Name)",
            ]
        );
    }

    #[test]
    fn test_global_keeps_only_count() {
        assert_eq!(lines("global a, b\n"), vec!["Global(names=2)"]);
    }
}
