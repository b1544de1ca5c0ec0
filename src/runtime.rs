//////////////////////////////////////////////////////////////
/// runtime.rs
///
/// Forth Runtime Engine
///
/// This module defines the ForthRuntime struct, which aggregates the state
/// of one interpreter: the kernel memory, the dictionary of word records,
/// the active input record and its nesting stack, and the block buffer.
/// Cold start registers the builtin table, initialises the system variable
/// cells and copies the program arguments into data space.
///
use std::fs::File;

use log::debug;

use crate::config::Options;
use crate::errors::{Result, Throw};
use crate::internals::builtin::{Prim, BIT_COMPILE, BIT_CREATED, BIT_HIDDEN, BIT_IMM, BUILTINS};
use crate::internals::files::{InputRecord, InputSnapshot};
use crate::internals::terminal;
use crate::kernel::{
    aligned, Cell, Kernel, BUF_SIZE, CELL, SYS_BASE, SYS_BLK, SYS_IN, SYS_STATE, SYS_TRACE,
    TIB_START,
};

/// How a word behaves when executed. Primitives dispatch straight to their
/// handler; the other kinds drive the threaded-code interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Prim(Prim),
    Enter,     // colon definition: call into the data area
    DataField, // CREATE'd word: push the body address
    DoDoes,    // CREATE ... DOES> word: push body, run the DOES> suffix
    Marker,    // MARKER word: unlink everything newer than itself
}

/// One dictionary entry. Headers are host records; each word's data area
/// lives in kernel data space starting at `data_addr`. The dictionary is
/// the vector itself, searched newest first; an execution token is an
/// index into it.
#[derive(Debug, Clone)]
pub struct Word {
    pub name: String, // empty for :NONAME
    pub bits: u32,
    pub code: Code,
    pub data_addr: usize,
    pub ndata: usize, // bytes used in the data area
}

impl Word {
    pub fn is_immediate(&self) -> bool {
        self.bits & BIT_IMM != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.bits & BIT_HIDDEN != 0
    }

    pub fn is_compile_only(&self) -> bool {
        self.bits & BIT_COMPILE != 0
    }

    pub fn was_created(&self) -> bool {
        self.bits & BIT_CREATED != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Free,
    Clean,
    Dirty,
}

pub struct ForthRuntime {
    pub kernel: Kernel,
    pub words: Vec<Word>,
    pub builtin_mark: usize, // words below this index are the builtin table
    pub input: InputRecord,
    pub input_stack: Vec<InputSnapshot>,
    pub block_state: BlockState,
    pub block_number: Cell,
    pub block_file: Option<File>,
    pub block_path: String,
    pub precision: usize, // digits printed by F. and FS.
    pub is_tty: bool,
    pub args: Vec<String>,
    pub args_addr: usize, // cell table of (addr, len) pairs in data space
    // Execution tokens the interpreter itself references.
    pub xt_repl: usize,
    pub xt_lit: usize,
    pub xt_flit: usize,
    pub xt_slit: usize,
    pub xt_exit: usize,
    pub xt_branch: usize,
    pub xt_branchz: usize,
    pub xt_call: usize,
    pub xt_abort_msg: usize,
    pub file_id_seq: Cell, // SOURCE-ID values for nested file input
}

impl ForthRuntime {
    pub fn new(opts: &Options) -> Result<ForthRuntime> {
        let kernel = Kernel::new(opts.ds_size, opts.rs_size, opts.fs_size(), opts.mem_size);
        let mut rt = ForthRuntime {
            kernel,
            words: Vec::new(),
            builtin_mark: 0,
            input: InputRecord::terminal(TIB_START, BUF_SIZE),
            input_stack: Vec::new(),
            block_state: BlockState::Free,
            block_number: 0,
            block_file: None,
            block_path: opts.block_file.clone(),
            precision: 6,
            is_tty: terminal::is_tty(),
            args: opts.forth_args(),
            args_addr: 0,
            xt_repl: 0,
            xt_lit: 0,
            xt_flit: 0,
            xt_slit: 0,
            xt_exit: 0,
            xt_branch: 0,
            xt_branchz: 0,
            xt_call: 0,
            xt_abort_msg: 0,
            file_id_seq: 0,
        };
        rt.cold_start()?;
        Ok(rt)
    }

    /// cold_start is where the interpreter begins: system variables, the
    /// builtin dictionary, and the argument table in data space.
    fn cold_start(&mut self) -> Result<()> {
        self.kernel.set_sys(SYS_STATE, 0);
        self.kernel.set_sys(SYS_BASE, 10);
        self.kernel.set_sys(SYS_IN, 0);
        self.kernel.set_sys(SYS_BLK, 0);
        self.kernel.set_sys(SYS_TRACE, 0);

        for (name, prim, bits) in BUILTINS {
            self.words.push(Word {
                name: (*name).to_string(),
                bits: *bits,
                code: Code::Prim(*prim),
                data_addr: self.kernel.here(),
                ndata: 0,
            });
        }
        self.builtin_mark = self.words.len();
        self.xt_repl = self.u_builtin_xt(Prim::Repl);
        self.xt_lit = self.u_builtin_xt(Prim::Lit);
        self.xt_flit = self.u_builtin_xt(Prim::FLit);
        self.xt_slit = self.u_builtin_xt(Prim::SLit);
        self.xt_exit = self.u_builtin_xt(Prim::Exit);
        self.xt_branch = self.u_builtin_xt(Prim::Branch);
        self.xt_branchz = self.u_builtin_xt(Prim::BranchZ);
        self.xt_call = self.u_builtin_xt(Prim::Call);
        self.xt_abort_msg = self.u_builtin_xt(Prim::AbortMsgRt);

        self.u_install_args()?;
        debug!(
            "cold start: {} builtins, here={}",
            self.builtin_mark,
            self.kernel.here()
        );
        Ok(())
    }

    /// Execution token of a primitive. Only the builtin table carries
    /// primitive code fields, so the first match is the builtin entry
    /// regardless of user shadowing.
    pub fn u_builtin_xt(&self, prim: Prim) -> usize {
        self.words
            .iter()
            .position(|w| matches!(w.code, Code::Prim(p) if p == prim))
            .expect("builtin table is missing a core primitive")
    }

    /// Copy the program arguments into data space as NUL-terminated byte
    /// strings plus a cell table of (address, length) pairs for `args`.
    fn u_install_args(&mut self) -> Result<()> {
        let args = self.args.clone();
        let mut entries = Vec::with_capacity(args.len());
        for arg in &args {
            let addr = self.kernel.here();
            self.allot((arg.len() + 1) as Cell)?;
            self.kernel.write_bytes(addr, arg.as_bytes())?;
            self.kernel.set_byte(addr + arg.len(), 0)?;
            entries.push((addr, arg.len()));
        }
        self.u_align()?;
        self.args_addr = self.kernel.here();
        for (addr, len) in entries {
            self.allot(2 * CELL as Cell)?;
            self.kernel.set_cell(self.kernel.here() - 2 * CELL, addr as Cell)?;
            self.kernel.set_cell(self.kernel.here() - CELL, len as Cell)?;
        }
        Ok(())
    }

    // -- interpreter state --------------------------------------------------

    pub fn get_compile_mode(&self) -> bool {
        self.kernel.sys(SYS_STATE) != 0
    }

    pub fn set_compile_mode(&mut self, value: bool) {
        self.kernel.set_sys(SYS_STATE, if value { -1 } else { 0 });
    }

    pub fn radix(&self) -> u32 {
        self.kernel.sys(SYS_BASE).clamp(2, 36) as u32
    }

    /// True when a prompt should be issued: interpreting, reading the
    /// terminal, and standard input is a tty.
    pub fn interactive(&self) -> bool {
        !self.get_compile_mode() && self.is_tty && self.input.is_terminal()
    }

    // -- dictionary ---------------------------------------------------------

    /// Search the chain newest first, skipping hidden entries, matching
    /// names case-insensitively on exact length.
    pub fn find_name(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|(_, w)| !w.is_hidden() && !w.name.is_empty() && w.name.eq_ignore_ascii_case(name))
            .map(|(xt, _)| xt)
    }

    /// Allocate a new word record with an aligned, empty data area and link
    /// it as the newest entry. Returns its execution token.
    pub fn word_create(&mut self, name: &str, code: Code) -> Result<usize> {
        if name.len() > u8::MAX as usize {
            return Err(Throw::BadName);
        }
        self.u_align()?;
        self.words.push(Word {
            name: name.to_string(),
            bits: 0,
            code,
            data_addr: self.kernel.here(),
            ndata: 0,
        });
        Ok(self.words.len() - 1)
    }

    /// ALLOT: move `here` by n bytes. Crossing the arena end throws
    /// ALLOCATE; retreating below the newest word's data area throws
    /// RESIZE, so a negative ALLOT can never invalidate a linked word.
    pub fn allot(&mut self, n: Cell) -> Result<()> {
        let floor = self
            .words
            .last()
            .map(|w| w.data_addr)
            .unwrap_or_else(|| self.kernel.data_start());
        let target = (self.kernel.here() as i64)
            .checked_add(n)
            .ok_or(Throw::Allocate)?;
        if target < floor as i64 {
            return Err(Throw::Resize);
        }
        self.kernel.advance_here(n as isize)?;
        if let Some(w) = self.words.last_mut() {
            w.ndata = self.kernel.here() - w.data_addr;
        }
        Ok(())
    }

    /// Pad `here` out to the next cell boundary.
    pub fn u_align(&mut self) -> Result<()> {
        let pad = aligned(self.kernel.here()) - self.kernel.here();
        if pad > 0 {
            self.allot(pad as Cell)?;
        }
        Ok(())
    }

    /// Append one cell to the newest word's data area.
    pub fn word_append(&mut self, v: Cell) -> Result<()> {
        self.u_align()?;
        self.allot(CELL as Cell)?;
        self.kernel.set_cell(self.kernel.here() - CELL, v)
    }

    /// Body address of a word: the cell after the DOES> reservation slot.
    pub fn body_addr(&self, xt: usize) -> usize {
        self.words[xt].data_addr + CELL
    }

    /// Executing a MARKER word unlinks every word newer than itself, then
    /// itself, and rewinds `here` to its own data area. ALLOCATEd heap
    /// storage is untouched.
    pub fn u_run_marker(&mut self, xt: usize) -> Result<()> {
        if xt < self.builtin_mark {
            return Err(Throw::EInval);
        }
        let data_addr = self.words[xt].data_addr;
        self.words.truncate(xt);
        let here = self.kernel.here();
        self.kernel.advance_here(data_addr as isize - here as isize)?;
        debug!("marker rewound dictionary to {} words", self.words.len());
        Ok(())
    }

    /// Validate a cell as an execution token.
    pub fn xt_check(&self, v: Cell) -> Result<usize> {
        if v < 0 || v as usize >= self.words.len() {
            return Err(Throw::Sigsegv);
        }
        Ok(v as usize)
    }
}

impl Drop for ForthRuntime {
    fn drop(&mut self) {
        // Flush a dirty block and give the terminal back.
        if let Err(e) = self.u_save_block() {
            debug!("block flush on teardown failed: {:?}", e);
        }
        terminal::cooked();
    }
}

//////////////////////////////////////////////
/// TESTS
///
#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::SENTINEL;

    pub fn test_runtime() -> ForthRuntime {
        ForthRuntime::new(&Options::for_test()).unwrap()
    }

    #[test]
    fn test_cold_start_registers_builtins() {
        let rt = test_runtime();
        assert_eq!(rt.builtin_mark, BUILTINS.len());
        assert!(rt.find_name("DUP").is_some());
        assert!(rt.find_name("dup").is_some(), "lookup is case-insensitive");
        assert_eq!(rt.kernel.sys(SYS_BASE), 10);
        assert!(!rt.get_compile_mode());
    }

    #[test]
    fn test_hidden_words_are_not_found() {
        let rt = test_runtime();
        assert!(rt.find_name("_repl").is_none());
        assert!(rt.find_name("_slit").is_none());
    }

    #[test]
    fn test_word_create_links_newest_first() {
        let mut rt = test_runtime();
        let a = rt.word_create("one", Code::Enter).unwrap();
        let b = rt.word_create("two", Code::Enter).unwrap();
        assert!(b > a);
        assert_eq!(rt.find_name("ONE"), Some(a));
        // A newer word of the same name shadows the older one.
        let c = rt.word_create("one", Code::Enter).unwrap();
        assert_eq!(rt.find_name("one"), Some(c));
    }

    #[test]
    fn test_word_append_is_aligned() {
        let mut rt = test_runtime();
        rt.word_create("w", Code::Enter).unwrap();
        rt.allot(3).unwrap();
        rt.word_append(99).unwrap();
        assert_eq!(rt.kernel.here() % CELL, 0);
        let w = rt.words.last().unwrap();
        assert_eq!(rt.kernel.get_cell(rt.kernel.here() - CELL).unwrap(), 99);
        assert_eq!(w.ndata, rt.kernel.here() - w.data_addr);
    }

    #[test]
    fn test_allot_floor_is_newest_word() {
        let mut rt = test_runtime();
        rt.word_create("w", Code::Enter).unwrap();
        rt.word_append(1).unwrap();
        assert_eq!(rt.allot(-(2 * CELL as Cell)), Err(Throw::Resize));
        assert_eq!(rt.allot(Cell::MAX / 2), Err(Throw::Allocate));
    }

    #[test]
    fn test_marker_rewinds() {
        let mut rt = test_runtime();
        let before = rt.words.len();
        let here_before = rt.kernel.here();
        let m = rt.word_create("mark", Code::Marker).unwrap();
        rt.word_create("junk", Code::Enter).unwrap();
        rt.word_append(42).unwrap();
        rt.u_run_marker(m).unwrap();
        assert_eq!(rt.words.len(), before);
        assert_eq!(rt.kernel.here(), aligned(here_before));
        assert!(rt.find_name("mark").is_none());
        assert!(rt.find_name("junk").is_none());
    }

    #[test]
    fn test_sentinels_survive_cold_start() {
        let rt = test_runtime();
        assert!(rt.kernel.sentinels_intact());
        let _ = SENTINEL;
    }

    #[test]
    fn test_xt_check() {
        let rt = test_runtime();
        assert!(rt.xt_check(0).is_ok());
        assert_eq!(rt.xt_check(-1), Err(Throw::Sigsegv));
        assert_eq!(rt.xt_check(rt.words.len() as Cell), Err(Throw::Sigsegv));
    }
}
