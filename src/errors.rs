// THROW codes and the error type shared by every primitive.
//
// The Forth standard reserves -1..-79 for documented conditions. Primitives
// raise a Throw the moment a precondition fails; the REPL is the only catch
// site and decides which stacks to reset based on the code's class.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Throw>;

/// A non-local exit carrying a numeric THROW code.
///
/// `Bye` is not a Forth exception: it unwinds `bye-code` all the way out to
/// `main` so the context can tear down (flush the block buffer, restore the
/// terminal) before the process exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Throw {
    #[error("ABORT")]
    Abort,
    #[error("ABORT\"")]
    AbortMsg,
    #[error("stack overflow")]
    DsOver,
    #[error("stack underflow")]
    DsUnder,
    #[error("return stack overflow")]
    RsOver,
    #[error("return stack underflow")]
    RsUnder,
    #[error("do-loops nested too deeply during execution")]
    LoopDepth,
    #[error("dictionary overflow")]
    DictOver,
    #[error("invalid memory address")]
    Sigsegv,
    #[error("division by zero")]
    DivZero,
    #[error("argument type mismatch")]
    EInval,
    #[error("undefined word")]
    Undefined,
    #[error("interpreting a compile-only word")]
    CompileOnly,
    #[error("attempt to use zero-length string as a name")]
    EmptyName,
    #[error("control structure mismatch")]
    BadControl,
    #[error("address alignment exception")]
    Sigbus,
    #[error("invalid numeric argument")]
    BadNumber,
    #[error("user interrupt")]
    Sigint,
    #[error("compiler nesting")]
    Compiling,
    #[error("word not defined by CREATE")]
    NotCreated,
    #[error("invalid name argument")]
    BadName,
    #[error("block read exception")]
    BlockRd,
    #[error("block write exception")]
    BlockWr,
    #[error("invalid block number")]
    BlockBad,
    #[error("file I/O exception")]
    Eio,
    #[error("non-existent file")]
    Enoent,
    #[error("invalid BASE for floating point conversion")]
    BadBase,
    #[error("floating-point stack overflow")]
    FsOver,
    #[error("floating-point stack underflow")]
    FsUnder,
    #[error("floating-point unidentified fault")]
    Sigfpe,
    #[error("QUIT")]
    Quit,
    #[error("ALLOCATE")]
    Allocate,
    #[error("ALLOT or RESIZE")]
    Resize,
    #[error("{0} thrown")]
    Code(i64),
    #[error("bye")]
    Bye(i64),
}

impl Throw {
    pub fn code(self) -> i64 {
        match self {
            Throw::Abort => -1,
            Throw::AbortMsg => -2,
            Throw::DsOver => -3,
            Throw::DsUnder => -4,
            Throw::RsOver => -5,
            Throw::RsUnder => -6,
            Throw::LoopDepth => -7,
            Throw::DictOver => -8,
            Throw::Sigsegv => -9,
            Throw::DivZero => -10,
            Throw::EInval => -12,
            Throw::Undefined => -13,
            Throw::CompileOnly => -14,
            Throw::EmptyName => -16,
            Throw::BadControl => -22,
            Throw::Sigbus => -23,
            Throw::BadNumber => -24,
            Throw::Sigint => -28,
            Throw::Compiling => -29,
            Throw::NotCreated => -31,
            Throw::BadName => -32,
            Throw::BlockRd => -33,
            Throw::BlockWr => -34,
            Throw::BlockBad => -35,
            Throw::Eio => -37,
            Throw::Enoent => -38,
            Throw::BadBase => -40,
            Throw::FsOver => -44,
            Throw::FsUnder => -45,
            Throw::Sigfpe => -55,
            Throw::Quit => -56,
            Throw::Allocate => -59,
            Throw::Resize => -61,
            Throw::Code(n) => n,
            Throw::Bye(n) => n,
        }
    }

    /// Map a numeric code back to its variant, for `_longjmp` and THROW.
    pub fn from_code(code: i64) -> Throw {
        match code {
            -1 => Throw::Abort,
            -2 => Throw::AbortMsg,
            -3 => Throw::DsOver,
            -4 => Throw::DsUnder,
            -5 => Throw::RsOver,
            -6 => Throw::RsUnder,
            -7 => Throw::LoopDepth,
            -8 => Throw::DictOver,
            -9 => Throw::Sigsegv,
            -10 => Throw::DivZero,
            -12 => Throw::EInval,
            -13 => Throw::Undefined,
            -14 => Throw::CompileOnly,
            -16 => Throw::EmptyName,
            -22 => Throw::BadControl,
            -23 => Throw::Sigbus,
            -24 => Throw::BadNumber,
            -28 => Throw::Sigint,
            -29 => Throw::Compiling,
            -31 => Throw::NotCreated,
            -32 => Throw::BadName,
            -33 => Throw::BlockRd,
            -34 => Throw::BlockWr,
            -35 => Throw::BlockBad,
            -37 => Throw::Eio,
            -38 => Throw::Enoent,
            -40 => Throw::BadBase,
            -44 => Throw::FsOver,
            -45 => Throw::FsUnder,
            -55 => Throw::Sigfpe,
            -56 => Throw::Quit,
            -59 => Throw::Allocate,
            -61 => Throw::Resize,
            n => Throw::Code(n),
        }
    }

    /// ABORT-class throws reset the data and float stacks before falling
    /// through to the QUIT-class actions.
    pub fn is_abort_class(self) -> bool {
        matches!(
            self,
            Throw::Abort | Throw::AbortMsg | Throw::DsOver | Throw::DsUnder | Throw::FsOver | Throw::FsUnder
        )
    }

    /// QUIT-class throws reset the return stack but keep the data stack,
    /// which matters for UNDEFINED and SIGSEGV when working interactively.
    pub fn is_quit_class(self) -> bool {
        matches!(
            self,
            Throw::Quit
                | Throw::Sigsegv
                | Throw::RsOver
                | Throw::RsUnder
                | Throw::Undefined
                | Throw::LoopDepth
        )
    }

    /// ABORT, ABORT", QUIT and OK historically return to the REPL without
    /// printing a diagnostic.
    pub fn is_silent(self) -> bool {
        matches!(self, Throw::Abort | Throw::AbortMsg | Throw::Quit) || self.code() == 0
    }
}

/// One-line diagnostic, e.g. `-13 thrown: undefined word`.
pub struct Diagnostic(pub Throw);

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Throw::Code(n) => write!(f, "{} thrown", n),
            t => write!(f, "{} thrown: {}", t.code(), t),
        }
    }
}
