//! Syntax tree nodes consumed by the semantic core
//!
//! These nodes are produced by the (external) grammar layer. The semantic
//! pass walks declarations and never mutates them; bodies of deferred
//! declarations are held by reference until first use.

pub mod span;

pub use span::{Span, Spanned};

use serde::{Deserialize, Serialize};

/// The closed set of primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Primitive {
    Void,
    Bool,
    Int,
    F16,
    F32,
    F64,
    Str,
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Primitive::Void => "void",
            Primitive::Bool => "bool",
            Primitive::Int => "int",
            Primitive::F16 => "f16",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Str => "string",
        };
        write!(f, "{name}")
    }
}

/// A type as written in source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeSpec {
    Basic(Primitive),
    /// A typedef alias use
    Named(String),
    /// A generic parameter use
    Generic(String),
    /// `elem[size]`; a missing size means "unspecified length"
    Array {
        elem: Box<TypeSpec>,
        size: Option<u64>,
    },
    /// `&elem`
    Reference(Box<TypeSpec>),
    /// A struct use, possibly with generic arguments: `Foo<int, Bar>`
    Struct {
        name: String,
        generic_args: Vec<TypeSpec>,
    },
    /// A function type: `(a: int, b: T) = ret`
    Func(FuncSig),
}

/// Parameter as written in a function type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    /// Missing annotation means the type is supplied at specialization time
    pub spec: Option<TypeSpec>,
    pub span: Span,
}

/// Function signature shared by prototypes, definitions and lambda types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncSig {
    pub params: Vec<ParamSpec>,
    /// Missing return type means void
    pub ret: Option<Box<TypeSpec>>,
}

/// Root of a parsed compilation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub decls: Vec<Decl>,
}

impl Program {
    pub fn new(decls: Vec<Decl>) -> Self {
        Self { decls }
    }

    /// Serialize the tree for dumps and fixtures
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    Typedef(TypedefDecl),
    Var(VarDecl),
    Func(FuncDecl),
    FuncDef(FuncDef),
    Struct(StructDecl),
    Template(TemplateDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Typedef(d) => d.span,
            Decl::Var(d) => d.span,
            Decl::Func(d) => d.span,
            Decl::FuncDef(d) => d.span,
            Decl::Struct(d) => d.span,
            Decl::Template(d) => d.span,
        }
    }
}

/// `typedef Name = spec;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedefDecl {
    pub name: String,
    pub spec: TypeSpec,
    pub span: Span,
}

/// `var a: int = 1, b = 2;` / `const c: bool = true;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub defs: Vec<VarDef>,
    pub is_const: bool,
    pub span: Span,
}

/// One defined name inside a var/const declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDef {
    pub name: String,
    /// Missing annotation means the type is inferred later
    pub spec: Option<TypeSpec>,
    pub init: Option<Expr>,
    pub span: Span,
}

/// A function prototype: `func name(params) = ret;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDecl {
    pub name: String,
    pub sig: FuncSig,
    pub span: Span,
}

/// A function definition: prototype plus body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDef {
    pub decl: FuncDecl,
    pub body: Block,
    pub span: Span,
}

/// `struct Name { members }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    pub members: Vec<StructMember>,
    pub span: Span,
}

/// One member inside a struct body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StructMember {
    Field {
        name: String,
        spec: TypeSpec,
        span: Span,
    },
    Method(FuncDef),
    /// Constructor definition; takes the struct's own name
    Constructor {
        sig: FuncSig,
        body: Block,
        span: Span,
    },
}

/// `template <T, _> decl` — `"_"` is an anonymous/positional parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDecl {
    pub params: Vec<String>,
    pub decl: Box<Decl>,
    pub span: Span,
}

/// A braced statement block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// A statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Decl(VarDecl),
    Expr(Expr),
    Assign { target: Expr, value: Expr },
    Return(Option<Expr>),
    Block(Block),
    If {
        cond: Expr,
        then: Box<Stmt>,
        els: Option<Box<Stmt>>,
    },
    While { cond: Expr, body: Box<Stmt> },
    Break,
    Continue,
}

/// An expression. The semantic core stores these (deferred bodies, constant
/// initializers) but never evaluates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        generic_args: Vec<TypeSpec>,
        args: Vec<Expr>,
    },
    Member {
        base: Box<Expr>,
        field: String,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    LogicNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
