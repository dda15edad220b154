//! Typed error surfaces for every component boundary (spec §7).
//!
//! Internal invariant violations (an opcode dispatched outside its declared
//! range, an arity-table miss) are programming bugs, not user input, and
//! stay as `panic!`/`unreachable!` per the design notes; everything a
//! caller can legitimately trigger is a `Result`.

use std::fmt;

/// Configuration / mode errors raised by the Memory Unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    #[error("cannot create a context while the memory unit is PROTECTED")]
    ContextCreateInProtected,
    #[error("cannot destroy a context while the memory unit is PROTECTED")]
    ContextDestroyInProtected,
    #[error("accessors can only be created or used while the memory unit is PROTECTED")]
    AccessorInUnprotected,
    #[error("write attempted through a READ_ONLY accessor")]
    ReadOnlyWrite,
}

/// Errors raised by the Memory Unit's structural operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("context size must be non-zero")]
    ZeroSize,
    #[error("the 40-bit virtual address space is exhausted")]
    VirtualSpaceExhausted,
    #[error("no context with id {0}")]
    ContextNotFound(u32),
    #[error("address {addr:#x} is out of bounds for a context of size {size:#x}")]
    AddressOutOfBounds { addr: u64, size: u64 },
    #[error(transparent)]
    Mode(#[from] ModeError),
}

/// Errors raised by accessors (paged or stack) once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("address {addr:#x} is out of bounds for a context of size {size:#x}")]
    AddressOutOfBounds { addr: u32, size: u32 },
    #[error(transparent)]
    Mode(#[from] ModeError),
}

/// Execution-time failures from the CPU / ALU / Instruction Unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
    #[error("malformed or truncated program file")]
    InvalidProgramFile,
    #[error("unknown syscall number {0:#06x}")]
    UnknownSyscall(u16),
    #[error("division by zero")]
    DivisionByZero,
    #[error("stack overflow")]
    StackOverflow,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("return stack underflow")]
    ReturnStackUnderflow,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// A source location for assembler diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Syntax-level assembler errors (lexing and parsing).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxErrorKind {
    #[error("unexpected token {0:?}")]
    UnexpectedToken(String),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),
}

/// Semantic-level assembler errors (pass 2).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SemanticErrorKind {
    #[error("duplicate definition of symbol {0:?}")]
    DuplicateDefinition(String),
    #[error("undefined symbol {0:?}")]
    UndefinedSymbol(String),
    #[error("invalid register name {0:?}")]
    InvalidRegister(String),
    #[error("LD cannot use square brackets")]
    InvalidBracketSyntax,
    #[error("duplicate page name {0:?}")]
    DuplicatePage(String),
    #[error("page {0:?} exceeds 65536 bytes")]
    PageSizeExceeded(String),
}

/// Layout/resolution-level assembler errors (passes 3-5).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutErrorKind {
    #[error("address array references labels on more than one page")]
    CrossPageAddressArray,
    #[error("unresolved reference to symbol {0:?}")]
    UnresolvedReference(String),
    #[error("operand width mismatch for {mnemonic}: expected {expected}-bit immediate")]
    OperandWidthMismatch { mnemonic: String, expected: u8 },
    #[error("unknown mnemonic {0:?}")]
    UnknownMnemonic(String),
    #[error("{mnemonic} does not accept this operand shape")]
    InvalidOperandShape { mnemonic: String },
    #[error("{mnemonic} does not accept an address combining a symbol and a register offset")]
    UnsupportedAddressing { mnemonic: String },
}

/// One diagnostic, carrying the source location of the failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Error at {location}: {kind}")]
pub struct Diagnostic {
    pub location: Location,
    pub kind: AssembleErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssembleErrorKind {
    #[error(transparent)]
    Syntax(#[from] SyntaxErrorKind),
    #[error(transparent)]
    Semantic(#[from] SemanticErrorKind),
    #[error(transparent)]
    Layout(#[from] LayoutErrorKind),
}

/// The pipeline aborts with every diagnostic collected across a pass,
/// per spec §7's "collect, then abort at pass end" policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("assembly failed with {} error(s)", .0.len())]
pub struct AssembleError(pub Vec<Diagnostic>);

impl AssembleError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0
    }
}
