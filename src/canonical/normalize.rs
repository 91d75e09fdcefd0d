/*!
# Tree normalisation passes

Every pass takes a tree by value and builds a new one; nothing is
patched in place. Order matters:

1. `inline_entry_point`: replaces `main()` statements with the entry
   point's body.
2. `lift_units`: pulls every function definition out of its enclosing
   body; what remains at module level is the top-level unit.
3. `normalize_block`: drops imports and literal statements, rewrites
   calls and orients comparisons.
*/

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::serialize::render_expr;
use crate::python_parser::ast::*;

/// Result of [`inline_entry_point`]
#[derive(Debug)]
pub struct Inlined {
    pub module: Module,
    /// Number of call sites replaced by the entry point body
    pub call_sites: usize,
}

/// Inlines the entry point function at every statement that calls it.
///
/// Only a bare statement `main()` (any arguments) is replaced. The copy
/// of the body is not scanned again, so a recursive entry point is
/// inlined one level deep. When at least one call site was replaced, the
/// entry point definitions are removed from the program; otherwise the
/// module is returned unchanged and the entry point stays a normal
/// function.
pub fn inline_entry_point(module: Module, entry_point: &str) -> Inlined {
    let Some(entry) = find_function(&module.body, entry_point).cloned() else {
        return Inlined {
            module,
            call_sites: 0,
        };
    };

    let mut call_sites = 0;
    let body = substitute_calls(module.body, &entry, &mut call_sites);

    let body = if call_sites > 0 {
        remove_functions(body, entry_point)
    } else {
        body
    };

    Inlined {
        module: Module { body },
        call_sites,
    }
}

/// Last definition with this name in source pre-order, at any depth
fn find_function<'a>(stmts: &'a [Stmt], name: &str) -> Option<&'a FunctionDef> {
    let mut found = None;
    for stmt in stmts {
        if let Stmt::FunctionDef(def) = stmt {
            if def.name == name {
                found = Some(def);
            }
        }
        for block in child_blocks(stmt) {
            if let Some(def) = find_function(block, name) {
                found = Some(def);
            }
        }
    }
    found
}

fn substitute_calls(stmts: Vec<Stmt>, entry: &FunctionDef, call_sites: &mut usize) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        match stmt {
            stmt if is_call_of(&stmt, &entry.name) => {
                *call_sites += 1;
                out.extend(entry.body.iter().cloned());
            }
            // тело самой точки входа не трогаем
            Stmt::FunctionDef(def) if def.name == entry.name => out.push(Stmt::FunctionDef(def)),
            stmt => out.push(map_blocks(stmt, &mut |block| {
                substitute_calls(block, entry, call_sites)
            })),
        }
    }
    out
}

fn is_call_of(stmt: &Stmt, name: &str) -> bool {
    match stmt {
        Stmt::Expr(Expr::Call { func, .. }) => matches!(func.as_ref(), Expr::Name(n) if n == name),
        _ => false,
    }
}

fn remove_functions(stmts: Vec<Stmt>, name: &str) -> Vec<Stmt> {
    stmts
        .into_iter()
        .filter(|stmt| !matches!(stmt, Stmt::FunctionDef(def) if def.name == name))
        .map(|stmt| map_blocks(stmt, &mut |block| remove_functions(block, name)))
        .collect()
}

/// Program split into comparable pieces, before normalisation
#[derive(Debug, Default)]
pub struct LiftedProgram {
    pub top_level: Vec<Stmt>,
    /// By name; a later definition replaces an earlier one
    pub functions: BTreeMap<String, FunctionDef>,
}

/// Moves every function definition (nested ones and methods included)
/// out of its enclosing body.
pub fn lift_units(module: Module) -> LiftedProgram {
    let mut functions = Vec::new();
    let top_level = lift_block(module.body, &mut functions);

    LiftedProgram {
        top_level,
        functions: functions
            .into_iter()
            .map(|def| (def.name.clone(), def))
            .collect(),
    }
}

fn lift_block(stmts: Vec<Stmt>, functions: &mut Vec<FunctionDef>) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        match stmt {
            Stmt::FunctionDef(mut def) => {
                // регистрация в прямом порядке: внешняя функция раньше вложенных
                let slot = functions.len();
                let body = std::mem::take(&mut def.body);
                functions.push(def);
                let lifted = lift_block(body, functions);
                functions[slot].body = lifted;
            }
            stmt => out.push(map_blocks(stmt, &mut |block| lift_block(block, functions))),
        }
    }
    out
}

/// Drops imports and literal statements, normalises what is left
pub fn normalize_block(stmts: Vec<Stmt>) -> Vec<Stmt> {
    stmts
        .into_iter()
        .filter(|stmt| !is_noise(stmt))
        .map(normalize_stmt)
        .collect()
}

/// Imports and docstring-like statements carry no structure
fn is_noise(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Import => true,
        Stmt::Expr(expr) => expr.is_constant(),
        _ => false,
    }
}

fn normalize_stmt(stmt: Stmt) -> Stmt {
    let stmt = map_blocks(stmt, &mut normalize_block);
    match stmt {
        Stmt::FunctionDef(mut def) => {
            def.params = normalize_params(def.params);
            def.returns = def.returns.map(normalize_expr);
            def.decorators = Vec::new();
            Stmt::FunctionDef(def)
        }
        Stmt::ClassDef(mut class) => {
            class.bases = class.bases.into_iter().map(normalize_expr).collect();
            class.keywords = normalize_keywords(class.keywords);
            class.decorators = Vec::new();
            Stmt::ClassDef(class)
        }
        Stmt::Return(value) => Stmt::Return(value.map(normalize_expr)),
        Stmt::Delete(targets) => Stmt::Delete(normalize_exprs(targets)),
        Stmt::Assign { targets, value } => Stmt::Assign {
            targets: normalize_exprs(targets),
            value: normalize_expr(value),
        },
        Stmt::AnnAssign {
            target,
            annotation,
            value,
        } => Stmt::AnnAssign {
            target: normalize_expr(target),
            annotation: normalize_expr(annotation),
            value: value.map(normalize_expr),
        },
        Stmt::AugAssign { target, op, value } => Stmt::AugAssign {
            target: normalize_expr(target),
            op,
            value: normalize_expr(value),
        },
        Stmt::For {
            is_async,
            target,
            iter,
            body,
            orelse,
        } => Stmt::For {
            is_async,
            target: normalize_expr(target),
            iter: normalize_expr(iter),
            body,
            orelse,
        },
        Stmt::While { test, body, orelse } => Stmt::While {
            test: normalize_expr(test),
            body,
            orelse,
        },
        Stmt::If { test, body, orelse } => Stmt::If {
            test: normalize_expr(test),
            body,
            orelse,
        },
        Stmt::With {
            is_async,
            items,
            body,
        } => Stmt::With {
            is_async,
            items: items
                .into_iter()
                .map(|item| WithItem {
                    context: normalize_expr(item.context),
                    target: item.target.map(normalize_expr),
                })
                .collect(),
            body,
        },
        Stmt::Raise { exc, cause } => Stmt::Raise {
            exc: exc.map(normalize_expr),
            cause: cause.map(normalize_expr),
        },
        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => Stmt::Try {
            body,
            handlers: handlers
                .into_iter()
                .map(|handler| ExceptHandler {
                    type_: handler.type_.map(normalize_expr),
                    name: handler.name.map(normalize_expr),
                    body: handler.body,
                })
                .collect(),
            orelse,
            finalbody,
        },
        Stmt::Assert { test, msg } => Stmt::Assert {
            test: normalize_expr(test),
            msg: msg.map(normalize_expr),
        },
        Stmt::Expr(expr) => Stmt::Expr(normalize_expr(expr)),
        Stmt::Other {
            kind,
            exprs,
            blocks,
        } => Stmt::Other {
            kind,
            exprs: normalize_exprs(exprs),
            blocks,
        },
        stmt @ (Stmt::Import
        | Stmt::Global(_)
        | Stmt::Nonlocal(_)
        | Stmt::Pass
        | Stmt::Break
        | Stmt::Continue) => stmt,
    }
}

/// Normalises annotations and default values of a signature
pub fn normalize_params(params: Parameters) -> Parameters {
    let normalize_param = |param: Param| Param {
        annotation: param.annotation.map(normalize_expr),
        default: param.default.map(normalize_expr),
        ..param
    };

    Parameters {
        params: params.params.into_iter().map(normalize_param).collect(),
        vararg: params.vararg.map(|p| Box::new(normalize_param(*p))),
        kwarg: params.kwarg.map(|p| Box::new(normalize_param(*p))),
    }
}

fn normalize_exprs(exprs: Vec<Expr>) -> Vec<Expr> {
    exprs.into_iter().map(normalize_expr).collect()
}

fn normalize_boxed(expr: Box<Expr>) -> Box<Expr> {
    Box::new(normalize_expr(*expr))
}

fn normalize_keywords(keywords: Vec<Keyword>) -> Vec<Keyword> {
    keywords
        .into_iter()
        .map(|keyword| Keyword {
            arg: keyword.arg,
            value: normalize_expr(keyword.value),
        })
        .collect()
}

fn normalize_generators(generators: Vec<Comprehension>) -> Vec<Comprehension> {
    generators
        .into_iter()
        .map(|generator| Comprehension {
            is_async: generator.is_async,
            target: normalize_expr(generator.target),
            iter: normalize_expr(generator.iter),
            ifs: normalize_exprs(generator.ifs),
        })
        .collect()
}

/// Normalises children first, then the node itself
pub fn normalize_expr(expr: Expr) -> Expr {
    match expr {
        Expr::Call {
            func,
            args,
            keywords,
        } => normalize_call(*func, args, keywords),
        Expr::Compare {
            left,
            ops,
            comparators,
        } => normalize_compare(*left, ops, comparators),
        Expr::Attribute { value, attr } => Expr::Attribute {
            value: normalize_boxed(value),
            attr,
        },
        Expr::Await(value) => Expr::Await(normalize_boxed(value)),
        Expr::BinOp { left, op, right } => Expr::BinOp {
            left: normalize_boxed(left),
            op,
            right: normalize_boxed(right),
        },
        Expr::BoolOp { op, values } => Expr::BoolOp {
            op,
            values: normalize_exprs(values),
        },
        Expr::Dict(entries) => Expr::Dict(
            entries
                .into_iter()
                .map(|(key, value)| (key.map(normalize_expr), normalize_expr(value)))
                .collect(),
        ),
        Expr::DictComp {
            key,
            value,
            generators,
        } => Expr::DictComp {
            key: normalize_boxed(key),
            value: normalize_boxed(value),
            generators: normalize_generators(generators),
        },
        Expr::DoubleStarred(value) => Expr::DoubleStarred(normalize_boxed(value)),
        Expr::GeneratorExp { elt, generators } => Expr::GeneratorExp {
            elt: normalize_boxed(elt),
            generators: normalize_generators(generators),
        },
        Expr::IfExp { test, body, orelse } => Expr::IfExp {
            test: normalize_boxed(test),
            body: normalize_boxed(body),
            orelse: normalize_boxed(orelse),
        },
        Expr::JoinedStr(values) => Expr::JoinedStr(normalize_exprs(values)),
        Expr::Lambda { params, body } => Expr::Lambda {
            params: Box::new(normalize_params(*params)),
            body: normalize_boxed(body),
        },
        Expr::List(elts) => Expr::List(normalize_exprs(elts)),
        Expr::ListComp { elt, generators } => Expr::ListComp {
            elt: normalize_boxed(elt),
            generators: normalize_generators(generators),
        },
        Expr::NamedExpr { target, value } => Expr::NamedExpr {
            target: normalize_boxed(target),
            value: normalize_boxed(value),
        },
        Expr::Other { kind, children } => Expr::Other {
            kind,
            children: normalize_exprs(children),
        },
        Expr::Set(elts) => Expr::Set(normalize_exprs(elts)),
        Expr::SetComp { elt, generators } => Expr::SetComp {
            elt: normalize_boxed(elt),
            generators: normalize_generators(generators),
        },
        Expr::Slice { lower, upper, step } => Expr::Slice {
            lower: lower.map(normalize_boxed),
            upper: upper.map(normalize_boxed),
            step: step.map(normalize_boxed),
        },
        Expr::Starred(value) => Expr::Starred(normalize_boxed(value)),
        Expr::Subscript { value, slice } => Expr::Subscript {
            value: normalize_boxed(value),
            slice: normalize_boxed(slice),
        },
        Expr::Tuple(elts) => Expr::Tuple(normalize_exprs(elts)),
        Expr::UnaryOp { op, operand } => Expr::UnaryOp {
            op,
            operand: normalize_boxed(operand),
        },
        Expr::Yield(value) => Expr::Yield(value.map(normalize_boxed)),
        Expr::YieldFrom(value) => Expr::YieldFrom(normalize_boxed(value)),
        leaf @ (Expr::Constant(_) | Expr::Name(_)) => leaf,
    }
}

/// `module.function(a, key=b)` becomes `function(a, b)`
fn normalize_call(func: Expr, args: Vec<Expr>, keywords: Vec<Keyword>) -> Expr {
    let func = match func {
        Expr::Attribute { attr, .. } => Expr::Name(attr),
        other => normalize_expr(other),
    };

    let mut folded = normalize_exprs(args);
    folded.extend(keywords.into_iter().map(|keyword| {
        let value = normalize_expr(keyword.value);
        match keyword.arg {
            Some(_) => value,
            None => Expr::DoubleStarred(Box::new(value)),
        }
    }));

    Expr::Call {
        func: Box::new(func),
        args: folded,
        keywords: Vec::new(),
    }
}

fn normalize_compare(left: Expr, ops: Vec<CmpOperator>, comparators: Vec<Expr>) -> Expr {
    let left = normalize_expr(left);
    let mut comparators = normalize_exprs(comparators);

    if ops.len() != 1 || comparators.len() != 1 {
        return Expr::Compare {
            left: Box::new(left),
            ops,
            comparators,
        };
    }

    let right = comparators.remove(0);
    let (left, op, right) = orient_comparison(left, ops[0], right);
    Expr::Compare {
        left: Box::new(left),
        ops: vec![op],
        comparators: vec![right],
    }
}

/// Puts comparison operands into canonical order.
///
/// Operands are ordered by `(ExprKind, canonical text)`. Swapping mirrors
/// the operator (`<` ↔ `>`, `<=` ↔ `>=`; equality and identity stay). When
/// both operands have the same key, `>` and `>=` are turned into `<` and
/// `<=`, so `a <= b` and `b >= a` end up identical. Membership tests are
/// left alone.
pub fn orient_comparison(left: Expr, op: CmpOperator, right: Expr) -> (Expr, CmpOperator, Expr) {
    let Some(mirrored) = op.mirrored() else {
        return (left, op, right);
    };

    let left_key = (left.kind(), render_expr(&left).unwrap_or_default());
    let right_key = (right.kind(), render_expr(&right).unwrap_or_default());

    match left_key.cmp(&right_key) {
        Ordering::Greater => (right, mirrored, left),
        Ordering::Equal if matches!(op, CmpOperator::Gt | CmpOperator::GtE) => {
            (right, mirrored, left)
        }
        _ => (left, op, right),
    }
}

/// Nested statement lists of a statement, in source order
pub fn child_blocks(stmt: &Stmt) -> Vec<&[Stmt]> {
    match stmt {
        Stmt::FunctionDef(def) => vec![def.body.as_slice()],
        Stmt::ClassDef(class) => vec![class.body.as_slice()],
        Stmt::For { body, orelse, .. } | Stmt::While { body, orelse, .. } | Stmt::If { body, orelse, .. } => {
            vec![body.as_slice(), orelse.as_slice()]
        }
        Stmt::With { body, .. } => vec![body.as_slice()],
        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            let mut blocks = vec![body.as_slice()];
            blocks.extend(handlers.iter().map(|h| h.body.as_slice()));
            blocks.push(orelse.as_slice());
            blocks.push(finalbody.as_slice());
            blocks
        }
        Stmt::Other { blocks, .. } => blocks.iter().map(|b| b.as_slice()).collect(),
        _ => Vec::new(),
    }
}

/// Rebuilds a statement with every nested statement list passed through `f`
pub fn map_blocks<F>(stmt: Stmt, f: &mut F) -> Stmt
where
    F: FnMut(Vec<Stmt>) -> Vec<Stmt>,
{
    match stmt {
        Stmt::FunctionDef(mut def) => {
            def.body = f(def.body);
            Stmt::FunctionDef(def)
        }
        Stmt::ClassDef(mut class) => {
            class.body = f(class.body);
            Stmt::ClassDef(class)
        }
        Stmt::For {
            is_async,
            target,
            iter,
            body,
            orelse,
        } => Stmt::For {
            is_async,
            target,
            iter,
            body: f(body),
            orelse: f(orelse),
        },
        Stmt::While { test, body, orelse } => Stmt::While {
            test,
            body: f(body),
            orelse: f(orelse),
        },
        Stmt::If { test, body, orelse } => Stmt::If {
            test,
            body: f(body),
            orelse: f(orelse),
        },
        Stmt::With {
            is_async,
            items,
            body,
        } => Stmt::With {
            is_async,
            items,
            body: f(body),
        },
        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => Stmt::Try {
            body: f(body),
            handlers: handlers
                .into_iter()
                .map(|handler| ExceptHandler {
                    body: f(handler.body),
                    ..handler
                })
                .collect(),
            orelse: f(orelse),
            finalbody: f(finalbody),
        },
        Stmt::Other {
            kind,
            exprs,
            blocks,
        } => Stmt::Other {
            kind,
            exprs,
            blocks: blocks.into_iter().map(|block| f(block)).collect(),
        },
        leaf => leaf,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python_parser::PythonParser;

    fn parse(source: &str) -> Module {
        PythonParser::new().parse(source).unwrap()
    }

    #[test]
    fn test_entry_point_is_inlined_at_call_site() {
        let module = parse("def main():\n    x = 1\n    y = 2\n\nif __name__ == '__main__':\n    main()\n");
        let inlined = inline_entry_point(module, "main");
        assert_eq!(inlined.call_sites, 1);
        assert!(find_function(&inlined.module.body, "main").is_none());

        let Stmt::If { body, .. } = &inlined.module.body[0] else {
            panic!("expected if, got {:?}", inlined.module.body);
        };
        assert_eq!(body.len(), 2);
        assert!(body.iter().all(|s| matches!(s, Stmt::Assign { .. })));
    }

    #[test]
    fn test_uncalled_entry_point_is_kept() {
        let module = parse("def main():\n    return 1\n");
        let inlined = inline_entry_point(module.clone(), "main");
        assert_eq!(inlined.call_sites, 0);
        assert_eq!(inlined.module, module);
    }

    #[test]
    fn test_recursive_entry_point_is_inlined_once() {
        let module = parse("def main():\n    main()\n\nmain()\n");
        let inlined = inline_entry_point(module, "main");
        assert_eq!(inlined.call_sites, 1);
        assert!(matches!(
            inlined.module.body.as_slice(),
            [Stmt::Expr(Expr::Call { .. })]
        ));
    }

    #[test]
    fn test_lift_units_collects_nested_functions_and_methods() {
        let module = parse(
            "class A:\n    def area(self):\n        return 1\n\ndef outer():\n    def inner():\n        pass\n    return inner\n\nx = 1\n",
        );
        let program = lift_units(module);
        let names: Vec<&str> = program.functions.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["area", "inner", "outer"]);
        assert_eq!(program.top_level.len(), 2);
        assert_eq!(program.functions["outer"].body.len(), 1);
    }

    #[test]
    fn test_later_definition_wins() {
        let module = parse("def f():\n    return 1\n\ndef f():\n    return 2\n");
        let program = lift_units(module);
        assert_eq!(
            program.functions["f"].body,
            vec![Stmt::Return(Some(Expr::Constant(Constant::Int("2".to_string()))))]
        );
    }

    #[test]
    fn test_imports_and_docstrings_are_dropped() {
        let module = parse("import os\nfrom sys import argv\n\"\"\"doc\"\"\"\n42\nx = 1\n");
        let body = normalize_block(module.body);
        assert_eq!(body.len(), 1);
        assert!(matches!(body[0], Stmt::Assign { .. }));
    }

    #[test]
    fn test_qualified_call_with_keywords_is_folded() {
        let qualified = normalize_block(parse("math.pow(x, exp=2)\n").body);
        let plain = normalize_block(parse("pow(y, 2)\n").body);

        let Stmt::Expr(Expr::Call { func, args, keywords }) = &qualified[0] else {
            panic!("expected call");
        };
        assert_eq!(func.as_ref(), &Expr::name("pow"));
        assert_eq!(args.len(), 2);
        assert!(keywords.is_empty());
        assert_eq!(plain[0].clone(), Stmt::Expr(Expr::Call {
            func: Box::new(Expr::name("pow")),
            args: vec![Expr::name("y"), Expr::Constant(Constant::Int("2".to_string()))],
            keywords: Vec::new(),
        }));
    }

    #[test]
    fn test_orientation_of_reflected_comparisons() {
        let a = Expr::name("a");
        let b = Expr::name("b");
        let one = Expr::Constant(Constant::Int("1".to_string()));

        assert_eq!(
            orient_comparison(a.clone(), CmpOperator::GtE, b.clone()),
            (b.clone(), CmpOperator::LtE, a.clone())
        );
        assert_eq!(
            orient_comparison(a.clone(), CmpOperator::Lt, one.clone()),
            (one.clone(), CmpOperator::Gt, a.clone())
        );
        assert_eq!(
            orient_comparison(one.clone(), CmpOperator::Gt, a.clone()),
            (one.clone(), CmpOperator::Gt, a.clone())
        );
        assert_eq!(
            orient_comparison(a.clone(), CmpOperator::In, one.clone()),
            (a, CmpOperator::In, one)
        );
    }
}
