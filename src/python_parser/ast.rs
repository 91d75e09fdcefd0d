//! Typed AST for Python submissions
//!
//! The tree keeps everything the source says (names, string text,
//! decorators). Deciding what is structurally significant is the job of
//! the canonicalizer, not of the tree.

use serde::{Deserialize, Serialize};

/// Root of a parsed submission
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Module {
    pub body: Vec<Stmt>,
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    Return(Option<Expr>),
    Delete(Vec<Expr>),
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    AnnAssign {
        target: Expr,
        annotation: Expr,
        value: Option<Expr>,
    },
    AugAssign {
        target: Expr,
        op: BinOperator,
        value: Expr,
    },
    For {
        is_async: bool,
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    /// `elif` chains are nested `If` nodes inside `orelse`
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    With {
        is_async: bool,
        items: Vec<WithItem>,
        body: Vec<Stmt>,
    },
    Raise {
        exc: Option<Expr>,
        cause: Option<Expr>,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
    },
    Assert {
        test: Expr,
        msg: Option<Expr>,
    },
    /// `import x`, `from x import y`, `from __future__ import z`
    Import,
    Global(Vec<String>),
    Nonlocal(Vec<String>),
    Expr(Expr),
    Pass,
    Break,
    Continue,
    /// Grammar nodes without a dedicated variant (match, print, exec, ...)
    Other {
        kind: String,
        exprs: Vec<Expr>,
        blocks: Vec<Vec<Stmt>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub is_async: bool,
    pub params: Parameters,
    pub returns: Option<Expr>,
    pub decorators: Vec<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<Expr>,
    pub keywords: Vec<Keyword>,
    pub decorators: Vec<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptHandler {
    pub type_: Option<Expr>,
    pub name: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithItem {
    pub context: Expr,
    pub target: Option<Expr>,
}

/// Parameter kinds as written in the signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    PositionalOnly,
    Regular,
    KeywordOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub annotation: Option<Expr>,
    pub default: Option<Expr>,
}

/// Function or lambda signature
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameters {
    pub params: Vec<Param>,
    pub vararg: Option<Box<Param>>,
    pub kwarg: Option<Box<Param>>,
}

impl Parameters {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.vararg.is_none() && self.kwarg.is_none()
    }
}

/// `name=value` in a call, or `**value` when `arg` is `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub arg: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comprehension {
    pub is_async: bool,
    pub target: Expr,
    pub iter: Expr,
    pub ifs: Vec<Expr>,
}

/// Literal constants. Numbers hold a canonical spelling, see
/// `tree_sitter_adapter::normalize_integer` / `normalize_float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Int(String),
    Float(String),
    Complex(String),
    Str(String),
    Bytes(String),
    True,
    False,
    None,
    Ellipsis,
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Await(Box<Expr>),
    BinOp {
        left: Box<Expr>,
        op: BinOperator,
        right: Box<Expr>,
    },
    BoolOp {
        op: BoolOperator,
        values: Vec<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
    },
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOperator>,
        comparators: Vec<Expr>,
    },
    Constant(Constant),
    Dict(Vec<(Option<Expr>, Expr)>),
    DictComp {
        key: Box<Expr>,
        value: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    /// `**value` folded into a call's argument list
    DoubleStarred(Box<Expr>),
    GeneratorExp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    /// f-string; only the interpolated expressions are kept
    JoinedStr(Vec<Expr>),
    Lambda {
        params: Box<Parameters>,
        body: Box<Expr>,
    },
    List(Vec<Expr>),
    ListComp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    Name(String),
    NamedExpr {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Other {
        kind: String,
        children: Vec<Expr>,
    },
    Set(Vec<Expr>),
    SetComp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    Starred(Box<Expr>),
    Subscript {
        value: Box<Expr>,
        slice: Box<Expr>,
    },
    Tuple(Vec<Expr>),
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Yield(Option<Box<Expr>>),
    YieldFrom(Box<Expr>),
}

/// Node categories of [`Expr`] in their canonical order.
///
/// This is the one total order used to orient comparison operands: the
/// operand whose kind comes first is placed on the left. The order is the
/// declaration order below (alphabetical by node name) and must not depend
/// on anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExprKind {
    Attribute,
    Await,
    BinOp,
    BoolOp,
    Call,
    Compare,
    Constant,
    Dict,
    DictComp,
    DoubleStarred,
    GeneratorExp,
    IfExp,
    JoinedStr,
    Lambda,
    List,
    ListComp,
    Name,
    NamedExpr,
    Other,
    Set,
    SetComp,
    Slice,
    Starred,
    Subscript,
    Tuple,
    UnaryOp,
    Yield,
    YieldFrom,
}

impl Expr {
    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::Attribute { .. } => ExprKind::Attribute,
            Expr::Await(_) => ExprKind::Await,
            Expr::BinOp { .. } => ExprKind::BinOp,
            Expr::BoolOp { .. } => ExprKind::BoolOp,
            Expr::Call { .. } => ExprKind::Call,
            Expr::Compare { .. } => ExprKind::Compare,
            Expr::Constant(_) => ExprKind::Constant,
            Expr::Dict(_) => ExprKind::Dict,
            Expr::DictComp { .. } => ExprKind::DictComp,
            Expr::DoubleStarred(_) => ExprKind::DoubleStarred,
            Expr::GeneratorExp { .. } => ExprKind::GeneratorExp,
            Expr::IfExp { .. } => ExprKind::IfExp,
            Expr::JoinedStr(_) => ExprKind::JoinedStr,
            Expr::Lambda { .. } => ExprKind::Lambda,
            Expr::List(_) => ExprKind::List,
            Expr::ListComp { .. } => ExprKind::ListComp,
            Expr::Name(_) => ExprKind::Name,
            Expr::NamedExpr { .. } => ExprKind::NamedExpr,
            Expr::Other { .. } => ExprKind::Other,
            Expr::Set(_) => ExprKind::Set,
            Expr::SetComp { .. } => ExprKind::SetComp,
            Expr::Slice { .. } => ExprKind::Slice,
            Expr::Starred(_) => ExprKind::Starred,
            Expr::Subscript { .. } => ExprKind::Subscript,
            Expr::Tuple(_) => ExprKind::Tuple,
            Expr::UnaryOp { .. } => ExprKind::UnaryOp,
            Expr::Yield(_) => ExprKind::Yield,
            Expr::YieldFrom(_) => ExprKind::YieldFrom,
        }
    }

    /// Any literal, string or not
    pub fn is_constant(&self) -> bool {
        matches!(self, Expr::Constant(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Expr::Constant(Constant::Str(_)))
    }

    pub fn name(value: impl Into<String>) -> Self {
        Expr::Name(value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOperator {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
    FloorDiv,
}

impl BinOperator {
    /// Operator token, also accepts the augmented form (`+=`)
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token.strip_suffix('=').unwrap_or(token) {
            "+" => BinOperator::Add,
            "-" => BinOperator::Sub,
            "*" => BinOperator::Mult,
            "@" => BinOperator::MatMult,
            "/" => BinOperator::Div,
            "%" => BinOperator::Mod,
            "**" => BinOperator::Pow,
            "<<" => BinOperator::LShift,
            ">>" => BinOperator::RShift,
            "|" => BinOperator::BitOr,
            "^" => BinOperator::BitXor,
            "&" => BinOperator::BitAnd,
            "//" => BinOperator::FloorDiv,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinOperator::Add => "Add",
            BinOperator::Sub => "Sub",
            BinOperator::Mult => "Mult",
            BinOperator::MatMult => "MatMult",
            BinOperator::Div => "Div",
            BinOperator::Mod => "Mod",
            BinOperator::Pow => "Pow",
            BinOperator::LShift => "LShift",
            BinOperator::RShift => "RShift",
            BinOperator::BitOr => "BitOr",
            BinOperator::BitXor => "BitXor",
            BinOperator::BitAnd => "BitAnd",
            BinOperator::FloorDiv => "FloorDiv",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOperator {
    And,
    Or,
}

impl BoolOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoolOperator::And => "And",
            BoolOperator::Or => "Or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Invert,
    Not,
    UAdd,
    USub,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Invert => "Invert",
            UnaryOperator::Not => "Not",
            UnaryOperator::UAdd => "UAdd",
            UnaryOperator::USub => "USub",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CmpOperator {
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "==" => CmpOperator::Eq,
            "!=" | "<>" => CmpOperator::NotEq,
            "<" => CmpOperator::Lt,
            "<=" => CmpOperator::LtE,
            ">" => CmpOperator::Gt,
            ">=" => CmpOperator::GtE,
            "is" => CmpOperator::Is,
            "is not" => CmpOperator::IsNot,
            "in" => CmpOperator::In,
            "not in" => CmpOperator::NotIn,
            _ => return None,
        };
        Some(op)
    }

    /// Operator that keeps the meaning when the operands trade places.
    /// `None` for membership tests, which are not reflexive.
    pub fn mirrored(&self) -> Option<Self> {
        match self {
            CmpOperator::Eq | CmpOperator::NotEq | CmpOperator::Is | CmpOperator::IsNot => {
                Some(*self)
            }
            CmpOperator::Lt => Some(CmpOperator::Gt),
            CmpOperator::Gt => Some(CmpOperator::Lt),
            CmpOperator::LtE => Some(CmpOperator::GtE),
            CmpOperator::GtE => Some(CmpOperator::LtE),
            CmpOperator::In | CmpOperator::NotIn => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOperator::Eq => "Eq",
            CmpOperator::NotEq => "NotEq",
            CmpOperator::Lt => "Lt",
            CmpOperator::LtE => "LtE",
            CmpOperator::Gt => "Gt",
            CmpOperator::GtE => "GtE",
            CmpOperator::Is => "Is",
            CmpOperator::IsNot => "IsNot",
            CmpOperator::In => "In",
            CmpOperator::NotIn => "NotIn",
        }
    }
}
