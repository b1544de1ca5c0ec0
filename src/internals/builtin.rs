/// Builtin word table
///
/// Every primitive the interpreter knows is a variant of `Prim`; a word
/// record's code field either names one of these or one of the threaded
/// entry kinds (colon definition, CREATE data field, DOES> body, marker).
/// The inner interpreter dispatches on the variant with one big match,
/// which stands in for computed goto on a code pointer.
///
/// `BUILTINS` is the bootstrap dictionary: cold start registers the
/// entries in order, so the oldest words in the chain are exactly this
/// table and everything above it is user defined.

// Word record flag bits.
pub const BIT_IMM: u32 = 0x0001;
pub const BIT_CREATED: u32 = 0x0002;
pub const BIT_HIDDEN: u32 = 0x0004;
pub const BIT_COMPILE: u32 = 0x0008;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prim {
    // Threading and literals. These run inside the instruction-pointer
    // loop; executing them outside a definition is an argument error.
    Repl,
    Lit,
    FLit,
    SLit,
    AbortMsgRt,
    Exit,
    Execute,
    Branch,
    BranchZ,
    Call,
    Longjmp,
    Bp,

    // Stack.
    Drop,
    Dup,
    QDup,
    Swap,
    Over,
    Rot,
    Depth,
    Pick,
    Roll,
    ToR,
    RFrom,
    RFetch,

    // Arithmetic and logic.
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    MStar,
    UmStar,
    SmDivRem,
    UmDivMod,
    And,
    Or,
    Xor,
    Invert,
    LShift,
    RShift,

    // Comparison.
    ZeroEq,
    ZeroLt,
    Lt,
    ULt,
    Eq,

    // Memory and data space.
    Fetch,
    Store,
    CFetch,
    CStore,
    Move,
    Here,
    Unused,
    Allot,
    Align,
    Cells,
    Chars,
    ToBody,
    Comma,

    // Dynamic memory.
    Allocate,
    Free,
    Resize,

    // Defining and compiling.
    Tick,
    Colon,
    Noname,
    Semicolon,
    Create,
    Does,
    Marker,
    Immediate,
    IsImmediate,
    CompileOnly,
    IsCompileOnly,
    State,
    Evaluate,

    // Exceptions.
    Abort,
    AbortQ,
    Quit,

    // Control flow immediates.
    If,
    Else,
    Then,
    Begin,
    Until,
    Again,
    While,
    Repeat,

    // Input and output.
    Source,
    SourceId,
    ToIn,
    Refill,
    Accept,
    Key,
    KeyReady,
    Emit,
    Type,
    Cr,
    Dot,
    ParseName,
    Parse,
    FindName,
    Included,
    LParen,
    Backslash,
    SQuote,
    DotQuote,
    Ms,

    // Blocks.
    Blk,
    Block,
    Buffer,
    Blocks,
    Update,
    SaveBuffers,
    EmptyBuffers,
    Load,

    // Tools.
    Dump,
    StackDump,
    Seext,
    Words,
    Args,
    Env,
    ByeCode,
    Trace,
    Window,
    Ds,
    Rs,

    // Environment constants.
    HoldSize,
    PadSize,
    CharBit,
    Floored,
    Base,

    // Floating point.
    MaxFloat,
    Fs,
    ToFloat,
    FRound,
    FTrunc,
    FFloor,
    FSqrt,
    FCos,
    FSin,
    FTan,
    FLn,
    FLog,
    FExp,
    FMax,
    FMin,
    FPow,
    FStore,
    FFetch,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FLt0,
    FEq0,
    FSDot,
    FDot,
    FToS,
    SToF,
}

/// Name, primitive, flag bits. Order is the bootstrap dictionary order.
pub const BUILTINS: &[(&str, Prim, u32)] = &[
    // Internal support.
    ("_repl", Prim::Repl, BIT_HIDDEN),
    ("_slit", Prim::SLit, BIT_HIDDEN | BIT_COMPILE),
    ("_flit", Prim::FLit, BIT_HIDDEN | BIT_COMPILE),
    ("_abort_msg", Prim::AbortMsgRt, BIT_HIDDEN),
    ("LIT", Prim::Lit, 0),
    ("EXIT", Prim::Exit, BIT_COMPILE),
    ("EXECUTE", Prim::Execute, 0),
    ("_branch", Prim::Branch, BIT_COMPILE),
    ("_branchz", Prim::BranchZ, BIT_COMPILE),
    ("_call", Prim::Call, BIT_COMPILE),
    ("_longjmp", Prim::Longjmp, 0),
    ("_bp", Prim::Bp, BIT_IMM),
    // Stack.
    ("DROP", Prim::Drop, 0),
    ("DUP", Prim::Dup, 0),
    ("?DUP", Prim::QDup, 0),
    ("SWAP", Prim::Swap, 0),
    ("OVER", Prim::Over, 0),
    ("ROT", Prim::Rot, 0),
    ("DEPTH", Prim::Depth, 0),
    ("PICK", Prim::Pick, 0),
    ("ROLL", Prim::Roll, 0),
    ("CS-PICK", Prim::Pick, BIT_COMPILE),
    ("CS-ROLL", Prim::Roll, BIT_COMPILE),
    (">R", Prim::ToR, 0),
    ("R>", Prim::RFrom, 0),
    ("R@", Prim::RFetch, 0),
    // Arithmetic.
    ("+", Prim::Add, 0),
    ("-", Prim::Sub, 0),
    ("*", Prim::Mul, 0),
    ("/", Prim::Div, 0),
    ("MOD", Prim::Mod, 0),
    ("M*", Prim::MStar, 0),
    ("UM*", Prim::UmStar, 0),
    ("SM/REM", Prim::SmDivRem, 0),
    ("UM/MOD", Prim::UmDivMod, 0),
    ("AND", Prim::And, 0),
    ("OR", Prim::Or, 0),
    ("XOR", Prim::Xor, 0),
    ("INVERT", Prim::Invert, 0),
    ("LSHIFT", Prim::LShift, 0),
    ("RSHIFT", Prim::RShift, 0),
    // Comparison.
    ("0=", Prim::ZeroEq, 0),
    ("0<", Prim::ZeroLt, 0),
    ("<", Prim::Lt, 0),
    ("U<", Prim::ULt, 0),
    ("=", Prim::Eq, 0),
    // Memory.
    ("@", Prim::Fetch, 0),
    ("!", Prim::Store, 0),
    ("C@", Prim::CFetch, 0),
    ("C!", Prim::CStore, 0),
    ("MOVE", Prim::Move, 0),
    ("HERE", Prim::Here, 0),
    ("UNUSED", Prim::Unused, 0),
    ("ALLOT", Prim::Allot, 0),
    ("ALIGN", Prim::Align, 0),
    ("CELLS", Prim::Cells, 0),
    ("CHARS", Prim::Chars, 0),
    (">BODY", Prim::ToBody, 0),
    (",", Prim::Comma, 0),
    // Dynamic memory.
    ("ALLOCATE", Prim::Allocate, 0),
    ("FREE", Prim::Free, 0),
    ("RESIZE", Prim::Resize, 0),
    // Defining and compiling.
    ("'", Prim::Tick, 0),
    (":", Prim::Colon, 0),
    (":NONAME", Prim::Noname, 0),
    (";", Prim::Semicolon, BIT_IMM | BIT_COMPILE),
    ("CREATE", Prim::Create, 0),
    ("DOES>", Prim::Does, BIT_COMPILE),
    ("MARKER", Prim::Marker, 0),
    ("IMMEDIATE", Prim::Immediate, BIT_IMM),
    ("immediate?", Prim::IsImmediate, 0),
    ("compile-only", Prim::CompileOnly, BIT_IMM),
    ("compile-only?", Prim::IsCompileOnly, BIT_COMPILE),
    ("STATE", Prim::State, 0),
    ("EVALUATE", Prim::Evaluate, 0),
    // Exceptions.
    ("ABORT", Prim::Abort, 0),
    ("ABORT\"", Prim::AbortQ, BIT_IMM),
    ("QUIT", Prim::Quit, 0),
    // Control flow.
    ("IF", Prim::If, BIT_IMM | BIT_COMPILE),
    ("ELSE", Prim::Else, BIT_IMM | BIT_COMPILE),
    ("THEN", Prim::Then, BIT_IMM | BIT_COMPILE),
    ("BEGIN", Prim::Begin, BIT_IMM | BIT_COMPILE),
    ("UNTIL", Prim::Until, BIT_IMM | BIT_COMPILE),
    ("AGAIN", Prim::Again, BIT_IMM | BIT_COMPILE),
    ("WHILE", Prim::While, BIT_IMM | BIT_COMPILE),
    ("REPEAT", Prim::Repeat, BIT_IMM | BIT_COMPILE),
    // I/O.
    ("SOURCE", Prim::Source, 0),
    ("SOURCE-ID", Prim::SourceId, 0),
    (">IN", Prim::ToIn, 0),
    ("REFILL", Prim::Refill, 0),
    ("ACCEPT", Prim::Accept, 0),
    ("KEY", Prim::Key, 0),
    ("KEY?", Prim::KeyReady, 0),
    ("EMIT", Prim::Emit, 0),
    ("TYPE", Prim::Type, 0),
    ("CR", Prim::Cr, 0),
    (".", Prim::Dot, 0),
    ("PARSE-NAME", Prim::ParseName, 0),
    ("_parse", Prim::Parse, 0),
    ("FIND-NAME", Prim::FindName, 0),
    ("INCLUDED", Prim::Included, 0),
    ("(", Prim::LParen, BIT_IMM),
    ("\\", Prim::Backslash, BIT_IMM),
    ("S\"", Prim::SQuote, BIT_IMM),
    (".\"", Prim::DotQuote, BIT_IMM),
    ("MS", Prim::Ms, 0),
    // Blocks.
    ("BLK", Prim::Blk, 0),
    ("BLOCK", Prim::Block, 0),
    ("BUFFER", Prim::Buffer, 0),
    ("blocks", Prim::Blocks, 0),
    ("UPDATE", Prim::Update, 0),
    ("SAVE-BUFFERS", Prim::SaveBuffers, 0),
    ("EMPTY-BUFFERS", Prim::EmptyBuffers, 0),
    ("LOAD", Prim::Load, 0),
    // Tools.
    ("DUMP", Prim::Dump, 0),
    ("_stack_dump", Prim::StackDump, 0),
    ("_SEEXT", Prim::Seext, 0),
    ("WORDS", Prim::Words, 0),
    ("args", Prim::Args, 0),
    ("env", Prim::Env, 0),
    ("bye-code", Prim::ByeCode, 0),
    ("TRACE", Prim::Trace, 0),
    ("_window", Prim::Window, 0),
    ("_ds", Prim::Ds, 0),
    ("_rs", Prim::Rs, 0),
    // Environment constants.
    ("/hold", Prim::HoldSize, 0),
    ("/pad", Prim::PadSize, 0),
    ("address-unit-bits", Prim::CharBit, 0),
    ("floored", Prim::Floored, 0),
    ("BASE", Prim::Base, 0),
    // Floating point.
    ("max-float", Prim::MaxFloat, 0),
    ("_fs", Prim::Fs, 0),
    (">FLOAT", Prim::ToFloat, 0),
    ("FROUND", Prim::FRound, 0),
    ("FTRUNC", Prim::FTrunc, 0),
    ("FLOOR", Prim::FFloor, 0),
    ("FSQRT", Prim::FSqrt, 0),
    ("FCOS", Prim::FCos, 0),
    ("FSIN", Prim::FSin, 0),
    ("FTAN", Prim::FTan, 0),
    ("FLN", Prim::FLn, 0),
    ("FLOG", Prim::FLog, 0),
    ("FEXP", Prim::FExp, 0),
    ("FMAX", Prim::FMax, 0),
    ("FMIN", Prim::FMin, 0),
    ("F**", Prim::FPow, 0),
    ("F!", Prim::FStore, 0),
    ("F@", Prim::FFetch, 0),
    ("F+", Prim::FAdd, 0),
    ("F-", Prim::FSub, 0),
    ("F*", Prim::FMul, 0),
    ("F/", Prim::FDiv, 0),
    ("F0<", Prim::FLt0, 0),
    ("F0=", Prim::FEq0, 0),
    ("FS.", Prim::FSDot, 0),
    ("F.", Prim::FDot, 0),
    ("F>S", Prim::FToS, 0),
    ("S>F", Prim::SToF, 0),
];

//////////////////////////////////////////////
/// TESTS
///
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_duplicate_names() {
        let mut seen = std::collections::HashSet::new();
        for (name, _, _) in BUILTINS {
            assert!(seen.insert(name.to_ascii_uppercase()), "duplicate builtin {name}");
        }
    }

    #[test]
    fn test_compile_only_branches() {
        for name in ["_branch", "_branchz", "_call", "EXIT", "DOES>"] {
            let (_, _, bits) = BUILTINS
                .iter()
                .find(|(n, _, _)| *n == name)
                .expect("missing builtin");
            assert_ne!(bits & BIT_COMPILE, 0, "{name} must be compile-only");
        }
    }

    #[test]
    fn test_semicolon_is_immediate() {
        let (_, _, bits) = BUILTINS.iter().find(|(n, _, _)| *n == ";").unwrap();
        assert_eq!(*bits, BIT_IMM | BIT_COMPILE);
    }
}
