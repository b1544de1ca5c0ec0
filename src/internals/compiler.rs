// Compiler and Outer Interpreter
//
// The outer interpreter consumes names from the current input source and
// either executes them, appends them to the word under construction, or
// converts them to numbers. It is also the sole catch site: `exception`
// implements the unwind rules for every THROW class, and the eval entry
// points wrap nested input sources (strings, files, the terminal).

use std::io::{self, Write};
use std::path::Path;

use log::warn;

use crate::errors::{Diagnostic, Result, Throw};
use crate::internals::builtin::{Prim, BIT_COMPILE, BIT_CREATED, BIT_HIDDEN, BIT_IMM};
use crate::internals::files::{open_reader, InputRecord, InputSnapshot, Source};
use crate::internals::numbers::{strnum, Num};
use crate::internals::signals;
use crate::kernel::{
    aligned, cell_addr, Cell, BUF_SIZE, PAD_START, SYS_BLK, SYS_IN, SYS_STATE, TIB_START,
};
use crate::runtime::{Code, ForthRuntime};

impl ForthRuntime {
    // -- outer interpreter --------------------------------------------------

    /// Interpret the current input source until it is exhausted. Tokens
    /// are words, then numbers, then errors; a pending signal becomes a
    /// throw between tokens. Interactive input gets an `ok ` after each
    /// consumed line.
    pub fn repl(&mut self) -> Result<()> {
        loop {
            loop {
                if let Some(t) = signals::take_pending() {
                    return Err(t);
                }
                let (addr, len) = self.u_parse_name()?;
                if len == 0 {
                    break;
                }
                let token = self.kernel.str_at(addr, len)?;
                match self.find_name(&token) {
                    Some(xt) => {
                        if self.get_compile_mode() && !self.words[xt].is_immediate() {
                            self.word_append(xt as Cell)?;
                        } else {
                            if !self.get_compile_mode() && self.words[xt].is_compile_only() {
                                return Err(Throw::CompileOnly);
                            }
                            self.execute(xt)?;
                        }
                    }
                    None => self.u_number_token(&token)?,
                }
            }
            if self.interactive() {
                print!("ok ");
                io::stdout().flush().ok();
            }
            if !self.u_refill()? {
                break;
            }
        }
        if self.interactive() {
            println!();
        }
        Ok(())
    }

    /// Convert a token that is not a word: push or compile the number, or
    /// report it and throw UNDEFINED.
    fn u_number_token(&mut self, token: &str) -> Result<()> {
        let (consumed, num) = strnum(token.as_bytes(), self.radix())?;
        if consumed != token.len() {
            print!("\"{}\" ", token);
            return Err(Throw::Undefined);
        }
        match num {
            Num::Int(n) => {
                if self.get_compile_mode() {
                    self.word_append(self.xt_lit as Cell)?;
                    self.word_append(n)
                } else {
                    self.kernel.push(n)
                }
            }
            Num::Float(f) => {
                if self.get_compile_mode() {
                    self.word_append(self.xt_flit as Cell)?;
                    self.word_append(f.to_bits() as Cell)
                } else {
                    self.kernel.fs_push(f)
                }
            }
        }
    }

    // -- exception handling -------------------------------------------------

    /// The single catch site. Resets stacks according to the throw class,
    /// returns to interpretation state, discards a half-compiled word, and
    /// prints the one-line diagnostic unless the code is silent.
    pub fn exception(&mut self, t: Throw) -> i64 {
        let code = t.code();
        if t.is_abort_class() {
            self.kernel.ds_reset();
            self.kernel.fs_reset();
            self.kernel.rs_reset();
        } else if t.is_quit_class() {
            self.kernel.rs_reset();
        }
        self.set_compile_mode(false);
        if t.is_silent() {
            return code;
        }
        print!("{}", Diagnostic(t));
        // A throw in mid-definition leaves the newest word incomplete:
        // unlink it, rewind here, and name it in the diagnostic. The
        // hidden bit is the test, since state can legitimately flip to
        // interpret inside a definition.
        if self.words.len() > self.builtin_mark
            && self.words.last().map_or(false, |w| w.is_hidden())
        {
            if let Some(word) = self.words.pop() {
                let name = if word.name.is_empty() { ":NONAME" } else { word.name.as_str() };
                print!(" while compiling \"{}\"", name);
                let here = self.kernel.here();
                let _ = self
                    .kernel
                    .advance_here(word.data_addr as isize - here as isize);
            }
        }
        println!();
        io::stdout().flush().ok();
        code
    }

    // -- input source nesting -----------------------------------------------

    /// Swap in a new input record, saving the old one together with the
    /// parse position, block number, state, and the text input buffer
    /// contents that a nested source will clobber.
    pub fn u_push_input(&mut self, record: InputRecord) -> Result<()> {
        let tib = self.kernel.bytes(TIB_START, BUF_SIZE)?.to_vec();
        let snapshot = InputSnapshot {
            record: std::mem::replace(&mut self.input, record),
            offset: self.kernel.sys(SYS_IN),
            blk: self.kernel.sys(SYS_BLK),
            state: self.kernel.sys(SYS_STATE),
            tib,
        };
        self.input_stack.push(snapshot);
        self.kernel.set_sys(SYS_IN, 0);
        self.kernel.set_sys(SYS_BLK, 0);
        self.kernel.set_sys(SYS_STATE, 0);
        Ok(())
    }

    pub fn u_pop_input(&mut self) -> Result<()> {
        if let Some(snap) = self.input_stack.pop() {
            self.input = snap.record;
            self.kernel.write_bytes(TIB_START, &snap.tib)?;
            self.kernel.set_sys(SYS_IN, snap.offset);
            self.kernel.set_sys(SYS_BLK, snap.blk);
            self.kernel.set_sys(SYS_STATE, snap.state);
        }
        Ok(())
    }

    /// Run the interpreter over a nested source. Throws are caught and
    /// reported here so the outer source continues; only `bye-code`
    /// escapes further.
    pub(crate) fn u_run_nested(&mut self) -> Result<i64> {
        match self.repl() {
            Ok(()) => Ok(0),
            Err(t @ Throw::Bye(_)) => Err(t),
            Err(t) => Ok(self.exception(t)),
        }
    }

    /// EVALUATE a counted region of kernel memory.
    pub fn eval_string(&mut self, addr: usize, len: usize) -> Result<i64> {
        self.u_push_input(InputRecord {
            source: Source::Str,
            buffer: addr,
            size: len,
            length: len,
            unget: None,
        })?;
        let rc = self.u_run_nested();
        self.u_pop_input()?;
        rc
    }

    /// Interpret host text by staging it through the text input buffer,
    /// which the snapshot machinery already preserves across nesting.
    pub fn interpret(&mut self, text: &str) -> Result<i64> {
        let bytes = text.as_bytes();
        let len = bytes.len().min(BUF_SIZE);
        self.u_push_input(InputRecord {
            source: Source::Str,
            buffer: TIB_START,
            size: BUF_SIZE,
            length: len,
            unget: None,
        })?;
        let staged = self.kernel.write_bytes(TIB_START, &bytes[..len]);
        let rc = match staged {
            Ok(()) => self.u_run_nested(),
            Err(t) => Ok(self.exception(t)),
        };
        self.u_pop_input()?;
        rc
    }

    /// Interpret a source file line by line.
    pub fn eval_file(&mut self, path: &Path) -> Result<i64> {
        let reader = match open_reader(path) {
            Ok(r) => r,
            Err(e) => {
                warn!("cannot open {}: {}", path.display(), e);
                eprintln!("cannot find file: {}", path.display());
                return Ok(Throw::Enoent.code());
            }
        };
        self.file_id_seq += 1;
        self.u_push_input(InputRecord {
            source: Source::File {
                id: self.file_id_seq,
                reader,
            },
            buffer: TIB_START,
            size: BUF_SIZE,
            length: 0,
            unget: None,
        })?;
        let rc = self.u_run_nested();
        self.u_pop_input()?;
        rc
    }

    /// Resolve a file against the search path and interpret it.
    pub fn load_file(&mut self, name: &str) -> Result<i64> {
        match crate::config::find_file(name) {
            Some(path) => self.eval_file(&path),
            None => {
                eprintln!("cannot find file: {}", name);
                Ok(Throw::Enoent.code())
            }
        }
    }

    /// Drive the terminal (or piped standard input) until EOF or bye.
    pub fn eval_terminal(&mut self) -> Result<i64> {
        loop {
            match self.repl() {
                Ok(()) => return Ok(0),
                Err(t @ Throw::Bye(_)) => return Err(t),
                Err(t) => {
                    self.exception(t);
                    self.u_reset_terminal_input();
                }
            }
        }
    }

    fn u_reset_terminal_input(&mut self) {
        self.input = InputRecord::terminal(TIB_START, BUF_SIZE);
        self.kernel.set_sys(SYS_IN, 0);
        self.kernel.set_sys(SYS_BLK, 0);
    }

    // -- defining words -----------------------------------------------------

    /// Depths of both stacks captured as one cell, pushed by `:` and
    /// checked by `;` to catch unbalanced control structures.
    fn u_control_marker(&self) -> Cell {
        (((self.kernel.rs_depth() & 0xff) << 8) | (self.kernel.depth() & 0xff)) as Cell
    }

    fn u_begin_definition(&mut self, name: &str) -> Result<()> {
        let marker = self.u_control_marker();
        self.kernel.push(marker)?;
        self.set_compile_mode(true);
        let xt = self.word_create(name, Code::Enter)?;
        self.words[xt].bits |= BIT_HIDDEN;
        Ok(())
    }

    /// : ( C: -- marker )  parse a name, open a hidden definition
    pub fn f_colon(&mut self) -> Result<()> {
        if self.get_compile_mode() {
            return Err(Throw::Compiling);
        }
        let name = self.u_parse_name_str()?;
        if name.is_empty() {
            return Err(Throw::EmptyName);
        }
        self.u_begin_definition(&name)
    }

    /// :NONAME ( C: -- marker )  like : but unnamed; ; pushes the xt
    pub fn f_noname(&mut self) -> Result<()> {
        self.u_begin_definition("")
    }

    /// ; ( C: marker -- )  verify balance, seal the word, reveal it
    pub fn f_semicolon(&mut self) -> Result<()> {
        let saved = self.kernel.pop()?;
        if saved != self.u_control_marker() {
            return Err(Throw::BadControl);
        }
        self.word_append(self.xt_exit as Cell)?;
        let xt = self.words.len() - 1;
        let word = &mut self.words[xt];
        word.bits &= !BIT_HIDDEN;
        let is_noname = word.name.is_empty();
        self.set_compile_mode(false);
        if is_noname {
            self.kernel.push(xt as Cell)?;
        }
        Ok(())
    }

    /// CREATE ( -- )  new data-field word; first cell reserved for DOES>
    pub fn f_create(&mut self) -> Result<()> {
        let name = self.u_parse_name_str()?;
        if name.is_empty() {
            return Err(Throw::EmptyName);
        }
        let xt = self.word_create(&name, Code::DataField)?;
        self.word_append(0)?;
        self.words[xt].bits |= BIT_CREATED;
        Ok(())
    }

    /// MARKER ( -- )  create a word that rolls the dictionary back
    pub fn f_marker(&mut self) -> Result<()> {
        let name = self.u_parse_name_str()?;
        if name.is_empty() {
            return Err(Throw::EmptyName);
        }
        self.word_create(&name, Code::Marker).map(|_| ())
    }

    /// IMMEDIATE ( -- )  mark the newest word
    pub fn f_immediate(&mut self) -> Result<()> {
        if let Some(w) = self.words.last_mut() {
            w.bits |= BIT_IMM;
        }
        Ok(())
    }

    /// immediate? ( xt -- flag )
    pub fn f_is_immediate(&mut self) -> Result<()> {
        let xt = self.xt_check(self.kernel.top()?)?;
        let flag = if self.words[xt].is_immediate() { -1 } else { 0 };
        self.kernel.set_top(flag)
    }

    /// compile-only ( -- )  mark the newest word
    pub fn f_compile_only(&mut self) -> Result<()> {
        if let Some(w) = self.words.last_mut() {
            w.bits |= BIT_COMPILE;
        }
        Ok(())
    }

    /// compile-only? ( xt -- flag )
    pub fn f_is_compile_only(&mut self) -> Result<()> {
        let xt = self.xt_check(self.kernel.top()?)?;
        let flag = if self.words[xt].is_compile_only() { -1 } else { 0 };
        self.kernel.set_top(flag)
    }

    /// ' ( -- xt )  parse a name and find it
    pub fn f_tick(&mut self) -> Result<()> {
        let name = self.u_parse_name_str()?;
        match self.find_name(&name) {
            Some(xt) => self.kernel.push(xt as Cell),
            None => {
                print!("\"{}\" ", name);
                self.u_input_context();
                Err(Throw::Undefined)
            }
        }
    }

    /// EVALUATE ( i*x caddr u -- j*x )
    pub fn f_evaluate(&mut self) -> Result<()> {
        let len = cell_addr(self.kernel.pop()?)?;
        let addr = cell_addr(self.kernel.pop()?)?;
        self.eval_string(addr, len).map(|_| ())
    }

    // -- control flow immediates --------------------------------------------
    //
    // Forward references compile a branch with a placeholder offset cell
    // and leave that cell's address on the data stack until resolved.
    // Offsets are in bytes, measured from the offset cell itself, which
    // is what the branch primitives add to the instruction pointer.

    fn u_patch_branch(&mut self, at: usize) -> Result<()> {
        let here = self.kernel.here();
        self.kernel.set_cell(at, here as Cell - at as Cell)
    }

    /// IF ( C: -- orig )
    pub fn f_if(&mut self) -> Result<()> {
        self.word_append(self.xt_branchz as Cell)?;
        self.u_align()?;
        let orig = self.kernel.here();
        self.kernel.push(orig as Cell)?;
        self.word_append(0)
    }

    /// ELSE ( C: orig1 -- orig2 )
    pub fn f_else(&mut self) -> Result<()> {
        let orig = cell_addr(self.kernel.pop()?)?;
        self.word_append(self.xt_branch as Cell)?;
        self.u_align()?;
        let orig2 = self.kernel.here();
        self.kernel.push(orig2 as Cell)?;
        self.word_append(0)?;
        self.u_patch_branch(orig)
    }

    /// THEN ( C: orig -- )
    pub fn f_then(&mut self) -> Result<()> {
        let orig = cell_addr(self.kernel.pop()?)?;
        self.u_patch_branch(orig)
    }

    /// BEGIN ( C: -- dest )
    pub fn f_begin(&mut self) -> Result<()> {
        self.u_align()?;
        let dest = self.kernel.here();
        self.kernel.push(dest as Cell)
    }

    fn u_branch_back(&mut self, branch_xt: usize, dest: usize) -> Result<()> {
        self.word_append(branch_xt as Cell)?;
        self.u_align()?;
        let at = self.kernel.here();
        self.word_append(dest as Cell - at as Cell)
    }

    /// UNTIL ( C: dest -- )
    pub fn f_until(&mut self) -> Result<()> {
        let dest = cell_addr(self.kernel.pop()?)?;
        self.u_branch_back(self.xt_branchz, dest)
    }

    /// AGAIN ( C: dest -- )
    pub fn f_again(&mut self) -> Result<()> {
        let dest = cell_addr(self.kernel.pop()?)?;
        self.u_branch_back(self.xt_branch, dest)
    }

    /// WHILE ( C: dest -- orig dest )
    pub fn f_while(&mut self) -> Result<()> {
        self.f_if()?;
        self.f_swap()
    }

    /// REPEAT ( C: orig dest -- )
    pub fn f_repeat(&mut self) -> Result<()> {
        let dest = cell_addr(self.kernel.pop()?)?;
        self.u_branch_back(self.xt_branch, dest)?;
        self.f_then()
    }

    // -- string literals ----------------------------------------------------

    /// Compile [_slit][len][bytes...] with the bytes cell-padded.
    pub fn u_compile_slit(&mut self, text: &[u8]) -> Result<()> {
        self.word_append(self.xt_slit as Cell)?;
        self.word_append(text.len() as Cell)?;
        let addr = self.kernel.here();
        self.allot(aligned(text.len()) as Cell)?;
        self.kernel.write_bytes(addr, text)
    }

    /// S" ( -- caddr u )  interpreting copies through the scratch pad
    pub fn f_s_quote(&mut self) -> Result<()> {
        let (addr, len) = self.u_parse(b'"', true)?;
        if self.get_compile_mode() {
            let text = self.kernel.bytes(addr, len)?.to_vec();
            self.u_compile_slit(&text)
        } else {
            if len > BUF_SIZE {
                return Err(Throw::Code(-18));
            }
            self.kernel.move_bytes(addr, PAD_START, len)?;
            self.kernel.push(PAD_START as Cell)?;
            self.kernel.push(len as Cell)
        }
    }

    /// ." ( -- )  print now, or compile the message plus TYPE
    pub fn f_dot_quote(&mut self) -> Result<()> {
        let (addr, len) = self.u_parse(b'"', true)?;
        if self.get_compile_mode() {
            let text = self.kernel.bytes(addr, len)?.to_vec();
            self.u_compile_slit(&text)?;
            let type_xt = self.u_builtin_xt(Prim::Type);
            self.word_append(type_xt as Cell)
        } else {
            let text = self.kernel.str_at(addr, len)?;
            print!("{}", text);
            Ok(())
        }
    }

    /// ABORT" ( flag -- )  message and ABORT" throw when flag is nonzero
    pub fn f_abort_quote(&mut self) -> Result<()> {
        let (addr, len) = self.u_parse(b'"', true)?;
        if self.get_compile_mode() {
            self.word_append(self.xt_branchz as Cell)?;
            self.u_align()?;
            let orig = self.kernel.here();
            self.word_append(0)?;
            let text = self.kernel.bytes(addr, len)?.to_vec();
            self.u_compile_slit(&text)?;
            self.word_append(self.xt_abort_msg as Cell)?;
            self.u_patch_branch(orig)
        } else {
            let flag = self.kernel.pop()?;
            if flag != 0 {
                let text = self.kernel.str_at(addr, len)?;
                println!("{}", text);
                return Err(Throw::AbortMsg);
            }
            Ok(())
        }
    }

    /// Run time of a compiled ABORT": the message is on the stack.
    pub fn f_abort_msg(&mut self) -> Result<()> {
        let len = cell_addr(self.kernel.pop()?)?;
        let addr = cell_addr(self.kernel.pop()?)?;
        let text = self.kernel.str_at(addr, len)?;
        println!("{}", text);
        Err(Throw::AbortMsg)
    }
}

//////////////////////////////////////////////
/// TESTS
///
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::kernel::{CELL, TRUE};

    fn runtime() -> ForthRuntime {
        ForthRuntime::new(&Options::for_test()).unwrap()
    }

    /// Interpret, expecting clean completion.
    fn ok(rt: &mut ForthRuntime, text: &str) {
        assert_eq!(rt.interpret(text).unwrap(), 0, "evaluating {:?}", text);
    }

    #[test]
    fn test_push_and_add() {
        let mut rt = runtime();
        ok(&mut rt, "1 2 +");
        assert_eq!(rt.kernel.pop().unwrap(), 3);
        assert_eq!(rt.kernel.depth(), 0);
    }

    #[test]
    fn test_colon_definition_and_call() {
        let mut rt = runtime();
        ok(&mut rt, ": sq DUP * ;");
        ok(&mut rt, "7 sq");
        assert_eq!(rt.kernel.pop().unwrap(), 49);
        // The definition ends with EXIT.
        let xt = rt.find_name("sq").unwrap();
        let w = &rt.words[xt];
        let last = rt
            .kernel
            .get_cell(w.data_addr + w.ndata - CELL)
            .unwrap();
        assert_eq!(last as usize, rt.xt_exit);
    }

    #[test]
    fn test_undefined_word_throws() {
        let mut rt = runtime();
        assert_eq!(rt.interpret("nonesuch").unwrap(), Throw::Undefined.code());
        // Data stack is preserved for UNDEFINED (quit class).
        rt.kernel.push(5).unwrap();
        assert_eq!(rt.interpret("5 nonesuch").unwrap(), Throw::Undefined.code());
        assert_eq!(rt.kernel.depth(), 2);
    }

    #[test]
    fn test_compile_only_outside_definition() {
        let mut rt = runtime();
        assert_eq!(rt.interpret("EXIT").unwrap(), Throw::CompileOnly.code());
    }

    #[test]
    fn test_colon_in_compile_state_throws_compiling() {
        let mut rt = runtime();
        rt.set_compile_mode(true);
        assert_eq!(rt.f_colon(), Err(Throw::Compiling));
    }

    #[test]
    fn test_colon_without_name_throws() {
        let mut rt = runtime();
        assert_eq!(rt.interpret(":").unwrap(), Throw::EmptyName.code());
        assert_eq!(rt.interpret("CREATE").unwrap(), Throw::EmptyName.code());
        assert_eq!(rt.interpret("MARKER").unwrap(), Throw::EmptyName.code());
    }

    #[test]
    fn test_error_discards_half_compiled_word() {
        let mut rt = runtime();
        assert_eq!(rt.interpret(": a nosuchword ;").unwrap(), Throw::Undefined.code());
        assert!(rt.find_name("a").is_none());
        assert!(!rt.get_compile_mode());
    }

    #[test]
    fn test_unbalanced_if_throws_bad_control() {
        let mut rt = runtime();
        assert_eq!(rt.interpret(": bad IF ;").unwrap(), Throw::BadControl.code());
        assert!(rt.find_name("bad").is_none(), "discarded on throw");
    }

    #[test]
    fn test_if_else_then() {
        let mut rt = runtime();
        ok(&mut rt, ": sign 0< IF -1 ELSE 1 THEN ;");
        ok(&mut rt, "-17 sign 17 sign");
        assert_eq!(rt.kernel.pop().unwrap(), 1);
        assert_eq!(rt.kernel.pop().unwrap(), -1);
    }

    #[test]
    fn test_begin_until_loop() {
        let mut rt = runtime();
        // Sum 5+4+3+2+1: ( n -- sum )
        ok(&mut rt, ": sum 0 SWAP BEGIN DUP 0= INVERT WHILE DUP ROT + SWAP 1 - REPEAT DROP ;");
        ok(&mut rt, "5 sum");
        assert_eq!(rt.kernel.pop().unwrap(), 15);
    }

    #[test]
    fn test_begin_until_counts_down() {
        let mut rt = runtime();
        ok(&mut rt, ": down BEGIN 1 - DUP 0= UNTIL DROP ;");
        ok(&mut rt, "3 down");
        assert_eq!(rt.kernel.depth(), 0);
    }

    #[test]
    fn test_create_does() {
        let mut rt = runtime();
        ok(&mut rt, ": CONST CREATE , DOES> @ ;");
        ok(&mut rt, "42 CONST ANS");
        ok(&mut rt, "ANS ANS +");
        assert_eq!(rt.kernel.pop().unwrap(), 84);
    }

    #[test]
    fn test_create_allot_buffer() {
        let mut rt = runtime();
        ok(&mut rt, "CREATE buf 16 ALLOT");
        ok(&mut rt, "buf");
        let addr = rt.kernel.pop().unwrap();
        let xt = rt.find_name("buf").unwrap();
        assert_eq!(addr as usize, rt.body_addr(xt));
    }

    #[test]
    fn test_does_without_create_throws() {
        let mut rt = runtime();
        ok(&mut rt, ": definer DOES> @ ;");
        assert_eq!(rt.interpret(": x ; definer").unwrap(), Throw::NotCreated.code());
    }

    #[test]
    fn test_marker_unwinds_definitions() {
        let mut rt = runtime();
        ok(&mut rt, "MARKER undo : bar 1 ;");
        ok(&mut rt, "bar");
        assert_eq!(rt.kernel.pop().unwrap(), 1);
        ok(&mut rt, "undo");
        assert_eq!(rt.interpret("bar").unwrap(), Throw::Undefined.code());
        assert!(rt.find_name("undo").is_none());
    }

    #[test]
    fn test_noname_leaves_xt() {
        let mut rt = runtime();
        ok(&mut rt, ":NONAME 6 7 * ; EXECUTE");
        assert_eq!(rt.kernel.pop().unwrap(), 42);
    }

    #[test]
    fn test_tick_and_execute() {
        let mut rt = runtime();
        ok(&mut rt, ": double 2 * ; ' double");
        let xt = rt.kernel.top().unwrap();
        assert_eq!(xt as usize, rt.find_name("double").unwrap());
        ok(&mut rt, "DROP 21 ' double EXECUTE");
        assert_eq!(rt.kernel.pop().unwrap(), 42);
    }

    #[test]
    fn test_immediate_word_runs_while_compiling() {
        let mut rt = runtime();
        ok(&mut rt, ": two 2 ; IMMEDIATE");
        // `two` executes during compilation, leaving 2 on the stack now.
        ok(&mut rt, ": x two ;");
        assert_eq!(rt.kernel.pop().unwrap(), 2);
    }

    #[test]
    fn test_evaluate_nested() {
        let mut rt = runtime();
        ok(&mut rt, ": run S\" 2 3 +\" EVALUATE ;");
        ok(&mut rt, "run");
        assert_eq!(rt.kernel.pop().unwrap(), 5);
    }

    #[test]
    fn test_state_flips_during_compilation() {
        let mut rt = runtime();
        ok(&mut rt, ": probe STATE @ ;");
        ok(&mut rt, "probe");
        assert_eq!(rt.kernel.pop().unwrap(), 0);
    }

    #[test]
    fn test_literal_compiles_into_definition() {
        let mut rt = runtime();
        ok(&mut rt, ": answer 42 ;");
        ok(&mut rt, "answer answer");
        assert_eq!(rt.kernel.pop().unwrap(), 42);
        assert_eq!(rt.kernel.pop().unwrap(), 42);
    }

    #[test]
    fn test_float_literal_interpreted() {
        let mut rt = runtime();
        ok(&mut rt, "1.5 2.5 F+");
        assert_eq!(rt.kernel.fs_pop().unwrap(), 4.0);
        assert_eq!(rt.kernel.depth(), 0);
    }

    #[test]
    fn test_float_literal_compiled() {
        let mut rt = runtime();
        ok(&mut rt, ": half 0.5 ;");
        ok(&mut rt, "half half F+");
        assert_eq!(rt.kernel.fs_pop().unwrap(), 1.0);
    }

    #[test]
    fn test_comments() {
        let mut rt = runtime();
        ok(&mut rt, "1 ( this is ignored ) 2 + \\ so is this");
        assert_eq!(rt.kernel.pop().unwrap(), 3);
    }

    #[test]
    fn test_abort_quote_fires_on_true() {
        let mut rt = runtime();
        ok(&mut rt, ": check ABORT\" boom\" ;");
        ok(&mut rt, "0 check");
        assert_eq!(rt.interpret("1 check").unwrap(), Throw::AbortMsg.code());
        // ABORT" clears the data stack.
        assert_eq!(rt.kernel.depth(), 0);
    }

    #[test]
    fn test_base_changes_parsing() {
        let mut rt = runtime();
        ok(&mut rt, "16 BASE ! ff");
        assert_eq!(rt.kernel.pop().unwrap(), 255);
        ok(&mut rt, "#10 BASE ! 10");
        assert_eq!(rt.kernel.pop().unwrap(), 10);
    }

    #[test]
    fn test_control_marker_balances_loops() {
        let mut rt = runtime();
        ok(&mut rt, ": ok1 BEGIN 1 UNTIL ;");
        assert_eq!(rt.interpret(": bad BEGIN ;").unwrap(), Throw::BadControl.code());
    }

    #[test]
    fn test_is_immediate_flag() {
        let mut rt = runtime();
        ok(&mut rt, "' ; immediate?");
        assert_eq!(rt.kernel.pop().unwrap(), TRUE);
    }

    #[test]
    fn test_bye_code_escapes() {
        let mut rt = runtime();
        assert_eq!(rt.interpret("7 bye-code"), Err(Throw::Bye(7)));
    }

    #[test]
    fn test_sentinels_after_everything() {
        let mut rt = runtime();
        ok(&mut rt, ": sq DUP * ; 9 sq DROP");
        let _ = rt.interpret(": bad IF ;");
        assert!(rt.kernel.sentinels_intact());
    }
}
