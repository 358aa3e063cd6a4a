//! Diagnostics. Errors abort compilation immediately; there is no
//! warning level and no recovery (spec §7). Each phase gets its own
//! small error enum, composed into [`CompileError`] alongside the
//! span at which it occurred — the same per-concern shape `gfx-hal`
//! uses for its own error enums, though here the outer variants carry
//! `#[source]` rather than `#[from]` since a bare span isn't available
//! to satisfy `From`'s single-argument shape; call sites build the
//! outer variant explicitly.

use crate::span::SourceSpan;

/// Errors raised while turning source bytes into tokens.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("unterminated string")]
    UnterminatedString,

    #[error("unterminated block comment")]
    UnterminatedComment,

    #[error("unrecognized character {0:?}")]
    UnrecognizedCharacter(char),

    #[error("expected '[' after '#'")]
    ExpectedAttributeOpen,

    #[error("unrecognized operator starting with {0:?}")]
    UnknownOperator(String),
}

/// Errors raised while turning tokens into an AST.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("expected {expected}, found {found}")]
    Expected { expected: String, found: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("malformed attribute {0:?}")]
    MalformedAttribute(String),
}

/// Errors raised while resolving names and types over the AST.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum AnalyzeError {
    #[error("unknown identifier {0:?}")]
    UnknownIdentifier(String),

    #[error("unknown type {0:?}")]
    UnknownType(String),

    #[error("{callee:?} expects {expected} argument(s), found {found}")]
    ArityMismatch {
        callee: String,
        expected: usize,
        found: usize,
    },

    #[error("duplicate member {0:?}")]
    DuplicateMember(String),

    #[error("duplicate parameter {0:?}")]
    DuplicateParameter(String),

    #[error("no member {member:?} on type {ty:?}")]
    UnsupportedMember { ty: String, member: String },

    #[error("function {0:?} has a return type but its body does not return a value")]
    MissingReturnValue(String),

    #[error("function {0:?} has no return type but its body returns a value")]
    UnexpectedReturnValue(String),

    #[error("pipe {0:?} is missing a stage binding")]
    MissingStage(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
}

/// Errors raised while lowering the typed AST to IR, or an IR buffer
/// to a particular backend's target representation.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LowerError {
    #[error("opcode {opcode} is not implemented for the {backend} backend")]
    UnimplementedOpcode { opcode: String, backend: String },

    #[error("the {0} stage is not supported by this backend")]
    UnsupportedStage(String),

    #[error("type {0:?} is not representable at an input/output boundary")]
    UnsupportedBoundaryType(String),
}

/// The aggregate error type every public compiler entry point returns.
#[derive(Clone, Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{span}: {source}")]
    Lex {
        span: SourceSpan,
        #[source]
        source: LexError,
    },

    #[error("{span}: {source}")]
    Parse {
        span: SourceSpan,
        #[source]
        source: ParseError,
    },

    #[error("{span}: {source}")]
    Analyze {
        span: SourceSpan,
        #[source]
        source: AnalyzeError,
    },

    #[error("{span}: {source}")]
    Lower {
        span: SourceSpan,
        #[source]
        source: LowerError,
    },

    /// Invariant violation inside the compiler itself, as opposed to
    /// a malformed input program. Kept in a distinct variant (with a
    /// distinguished prefix in its `Display`) so tests can tell the
    /// two apart, per spec §7.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CompileError {
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal(message.into())
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
