//! The parser's output: one AST per top-level definition. Every
//! expression node carries a [`TypeRef`], filled in by the analyzer;
//! before analysis it is [`TypeRef::unresolved`].
//!
//! Blocks do not store an owning pointer to their parent (spec's
//! "backreferences and cycles" design note prefers ids over owning
//! pointers); lexical lookup during analysis instead walks an
//! explicit scope stack the analyzer maintains, which gives the same
//! left-to-right shadowing behavior without a parent link living
//! inside the tree.

use crate::attribute::AttributeSet;
use crate::names::NameId;
use crate::span::SourceSpan;
use crate::types::TypeRef;
use crate::variable::VariableId;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equals,
    NotEquals,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl BinOp {
    pub fn is_compound_assign(self) -> bool {
        matches!(
            self,
            BinOp::AddAssign | BinOp::SubAssign | BinOp::MulAssign | BinOp::DivAssign
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnOp {
    Not,
    Negate,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Boolean(bool),
    Number(f64),
    String(String),
    Identifier(NameId),
    Grouping(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Unary(UnOp, Box<Expr>),
    /// `callee(args...)`. The grammar cannot tell a type constructor
    /// (`float4(...)`), an intrinsic (`sample(...)`), and a
    /// user-function call apart at parse time — they all look like
    /// `Name(args)`. The analyzer resolves `callee` and records which
    /// of the three this is in [`Expr::callee_kind`].
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `a.b`; chained member access is represented as a `Member`
    /// whose `target` is itself a `Member`.
    Member {
        target: Box<Expr>,
        name: NameId,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
}

/// What an [`ExprKind::Call`] turned out to name, filled in by the
/// analyzer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CalleeKind {
    Function(crate::functions::FunctionId),
    Intrinsic(crate::analyzer::Intrinsic),
    Constructor(crate::types::TypeId),
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeRef,
    pub span: SourceSpan,
    /// Set by the analyzer when this expression's underlying storage
    /// is a local variable or parameter, so the IR emitter can load
    /// from and, for lvalues, store into it directly.
    pub variable: Option<VariableId>,
    /// Set by the analyzer on a [`ExprKind::Member`] chain: the
    /// resolved member ordinal for each link, innermost first, plus
    /// whether that link indexes an array rather than a struct
    /// member.
    pub member_path: Vec<MemberStep>,
    /// Set by the analyzer only on [`ExprKind::Call`] nodes.
    pub callee_kind: Option<CalleeKind>,
}

#[derive(Clone, Copy, Debug)]
pub struct MemberStep {
    pub index: u32,
    pub is_array_index: bool,
}

impl Expr {
    pub fn new(kind: ExprKind, span: SourceSpan) -> Self {
        Expr {
            kind,
            ty: TypeRef::unresolved(),
            span,
            variable: None,
            member_path: Vec::new(),
            callee_kind: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LocalVariable {
    pub name: NameId,
    /// The `: Type` annotation as written, if any; `None` means the
    /// type must come from the initializer instead (spec §4.3).
    pub declared_type_name: Option<NameId>,
    pub declared_array_size: u32,
    /// Filled in by the analyzer once `declared_type_name` (or the
    /// initializer) is resolved.
    pub ty: TypeRef,
    pub mutable: bool,
    pub var: VariableId,
}

#[derive(Clone, Debug)]
pub struct Block {
    pub variables: Vec<LocalVariable>,
    pub statements: Vec<Stmt>,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    Expression(Expr),
    Return(Option<Expr>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Block(Block),
    /// `let`/`mut`/`const` local declarations.
    LocalVariable {
        local: usize,
        init: Option<Expr>,
    },
}

#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: SourceSpan,
}

#[derive(Clone, Debug)]
pub struct StructMember {
    pub name: NameId,
    pub type_name: NameId,
    pub array_size: u32,
    pub default: Option<Expr>,
    pub span: SourceSpan,
}

#[derive(Clone, Debug)]
pub struct StructDef {
    pub name: NameId,
    pub attributes: AttributeSet,
    pub members: Vec<StructMember>,
    pub span: SourceSpan,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: NameId,
    pub type_name: NameId,
    pub span: SourceSpan,
}

#[derive(Clone, Debug)]
pub struct FunctionDef {
    pub name: NameId,
    pub attributes: AttributeSet,
    pub params: Vec<Param>,
    pub return_type_name: Option<NameId>,
    pub body: Block,
    pub span: SourceSpan,
}

#[derive(Clone, Debug)]
pub struct ConstGlobalDef {
    pub name: NameId,
    pub attributes: AttributeSet,
    pub type_name: NameId,
    pub array_size: u32,
    /// Absent for non-const resource globals (textures, samplers,
    /// writable buffers) declared with the same `const Name: Type;`
    /// form but no `= expr` — the grammar's initializer is optional
    /// for this reason (superset resolution of Open Question (a)).
    pub init: Option<Expr>,
    pub span: SourceSpan,
}

#[derive(Clone, Debug)]
pub enum Definition {
    Struct(StructDef),
    Function(FunctionDef),
    ConstGlobal(ConstGlobalDef),
}
