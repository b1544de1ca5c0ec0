/// Input-output words
///
/// Terminal and file input plumbing: REFILL and ACCEPT over the current
/// input source, KEY/KEY? single-character input through the raw-mode
/// terminal, character output, and the words that expose the input
/// record (SOURCE, SOURCE-ID, >IN, BLK is with the block words).
///
use std::io::{self, Write};

use crate::errors::{Result, Throw};
use crate::internals::numbers::format_radix;
use crate::internals::terminal;
use crate::kernel::{cell_addr, Cell, FALSE, PAD_START, SYS_IN, TRUE};
use crate::runtime::ForthRuntime;

impl ForthRuntime {
    /// Refill the input buffer from the source. Strings and blocks arrive
    /// whole and never refill; the terminal drops back to cooked mode for
    /// line input. True when a new line is available.
    pub fn u_refill(&mut self) -> Result<bool> {
        if !self.input.refillable() {
            return Ok(false);
        }
        if self.input.is_terminal() {
            terminal::cooked();
        }
        match self.input.read_line() {
            Some(line) => {
                let bytes = line.as_bytes();
                let len = bytes.len().min(self.input.size);
                self.kernel.write_bytes(self.input.buffer, &bytes[..len])?;
                self.input.length = len;
                self.kernel.set_sys(SYS_IN, 0);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// REFILL ( -- flag )
    pub fn f_refill(&mut self) -> Result<()> {
        let refilled = self.u_refill()?;
        self.kernel.push(if refilled { TRUE } else { FALSE })
    }

    /// SOURCE ( -- caddr u )
    pub fn f_source(&mut self) -> Result<()> {
        self.kernel.push(self.input.buffer as Cell)?;
        self.kernel.push(self.input.length as Cell)
    }

    /// SOURCE-ID ( -- -1 | 0 | fileid )
    pub fn f_source_id(&mut self) -> Result<()> {
        let id = self.input.source_id();
        self.kernel.push(id)
    }

    /// >IN ( -- aaddr )
    pub fn f_to_in(&mut self) -> Result<()> {
        self.kernel.push(SYS_IN as Cell)
    }

    /// ACCEPT ( caddr +n1 -- +n2 )  read one line into memory at caddr;
    /// -1 on end of input
    pub fn f_accept(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        let addr = cell_addr(self.kernel.top()?)?;
        if n <= 1 || !self.input.refillable() {
            return self.kernel.set_top(0);
        }
        if self.input.is_terminal() {
            terminal::cooked();
        }
        match self.input.read_line() {
            Some(line) => {
                let bytes = line.as_bytes();
                let len = bytes.len().min(n as usize - 1);
                self.kernel.write_bytes(addr, &bytes[..len])?;
                self.kernel.set_top(len as Cell)
            }
            None => self.kernel.set_top(-1),
        }
    }

    /// KEY ( -- char )  single key in raw mode, honoring the unget slot
    pub fn f_key(&mut self) -> Result<()> {
        io::stdout().flush().ok();
        if let Some(c) = self.input.unget.take() {
            return self.kernel.push(c as Cell);
        }
        terminal::raw();
        self.kernel.push(terminal::read_key())
    }

    /// KEY? ( -- flag )  poll without blocking; a ready key parks in the
    /// unget slot for the next KEY
    pub fn f_key_ready(&mut self) -> Result<()> {
        io::stdout().flush().ok();
        if self.input.unget.is_none() {
            terminal::raw();
            self.input.unget = terminal::poll_key();
        }
        self.kernel
            .push(if self.input.unget.is_some() { TRUE } else { FALSE })
    }

    /// EMIT ( char -- )
    pub fn f_emit(&mut self) -> Result<()> {
        let c = self.kernel.pop()?;
        io::stdout().write_all(&[c as u8]).ok();
        Ok(())
    }

    /// TYPE ( caddr u -- )
    pub fn f_type(&mut self) -> Result<()> {
        let len = cell_addr(self.kernel.pop()?)?;
        let addr = cell_addr(self.kernel.pop()?)?;
        let text = self.kernel.str_at(addr, len)?;
        print!("{}", text);
        Ok(())
    }

    /// CR ( -- )
    pub fn f_cr(&mut self) -> Result<()> {
        println!();
        Ok(())
    }

    /// . ( n -- )  print in the current radix, trailing space
    pub fn f_dot(&mut self) -> Result<()> {
        let n = self.kernel.pop()?;
        print!("{} ", format_radix(n, self.radix()));
        Ok(())
    }

    /// PARSE-NAME ( -- caddr u )
    pub fn f_parse_name(&mut self) -> Result<()> {
        let (addr, len) = self.u_parse_name()?;
        self.kernel.push(addr as Cell)?;
        self.kernel.push(len as Cell)
    }

    /// _parse ( char bool -- caddr u )  escape processing when bool
    pub fn f_parse(&mut self) -> Result<()> {
        let escape = self.kernel.pop()?;
        let delim = self.kernel.top()?;
        let (addr, len) = self.u_parse(delim as u8, escape != 0)?;
        self.kernel.set_top(addr as Cell)?;
        self.kernel.push(len as Cell)
    }

    /// FIND-NAME ( caddr u -- xt | 0 )
    pub fn f_find_name(&mut self) -> Result<()> {
        let len = cell_addr(self.kernel.pop()?)?;
        let addr = cell_addr(self.kernel.top()?)?;
        let name = self.kernel.str_at(addr, len)?;
        let xt = self.find_name(&name).map_or(0, |xt| xt as Cell);
        self.kernel.set_top(xt)
    }

    /// INCLUDED ( caddr u -- )  interpret a file found on the search path
    pub fn f_included(&mut self) -> Result<()> {
        let len = cell_addr(self.kernel.pop()?)?;
        let addr = cell_addr(self.kernel.pop()?)?;
        let name = self.kernel.str_at(addr, len)?;
        self.load_file(&name).map(|_| ())
    }

    /// ( ( -- )  skip a comment
    pub fn f_paren(&mut self) -> Result<()> {
        self.u_parse(b')', false).map(|_| ())
    }

    /// \ ( -- )  discard the rest of the input line
    pub fn f_backslash(&mut self) -> Result<()> {
        self.kernel.set_sys(SYS_IN, self.input.length as Cell);
        Ok(())
    }

    /// args ( -- aaddr n )  table of (addr, len) pairs for the arguments
    pub fn f_args(&mut self) -> Result<()> {
        self.kernel.push(self.args_addr as Cell)?;
        self.kernel.push(self.args.len() as Cell)
    }

    /// env ( caddr u -- caddr' n | 0 -1 )  value is copied to the pad
    pub fn f_env(&mut self) -> Result<()> {
        let len = cell_addr(self.kernel.pop()?)?;
        let addr = cell_addr(self.kernel.top()?)?;
        let key = self.kernel.str_at(addr, len)?;
        match std::env::var(&key) {
            Ok(value) => {
                let bytes = value.as_bytes();
                let n = bytes.len().min(crate::kernel::BUF_SIZE);
                self.kernel.write_bytes(PAD_START, &bytes[..n])?;
                self.kernel.set_top(PAD_START as Cell)?;
                self.kernel.push(n as Cell)
            }
            Err(_) => {
                self.kernel.set_top(0)?;
                self.kernel.push(-1)
            }
        }
    }

    /// bye-code ( code -- )  unwind out of the interpreter entirely
    pub fn f_bye_code(&mut self) -> Result<()> {
        let code = self.kernel.pop()?;
        Err(Throw::Bye(code))
    }

    /// _window ( -- rows cols )
    pub fn f_window(&mut self) -> Result<()> {
        let (cols, rows) = terminal::window_size();
        self.kernel.push(rows as Cell)?;
        self.kernel.push(cols as Cell)
    }
}

//////////////////////////////////////////////
/// TESTS
///
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use std::io::Write as _;

    fn runtime() -> ForthRuntime {
        ForthRuntime::new(&Options::for_test()).unwrap()
    }

    #[test]
    fn test_source_and_to_in_reflect_input() {
        let mut rt = runtime();
        rt.interpret("SOURCE").unwrap();
        let len = rt.kernel.pop().unwrap();
        let addr = rt.kernel.pop().unwrap();
        assert_eq!(addr as usize, crate::kernel::TIB_START);
        assert_eq!(len as usize, "SOURCE".len());
        rt.interpret(">IN").unwrap();
        assert_eq!(rt.kernel.pop().unwrap() as usize, SYS_IN);
    }

    #[test]
    fn test_source_id_for_string() {
        let mut rt = runtime();
        rt.interpret("SOURCE-ID").unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), -1);
    }

    #[test]
    fn test_included_runs_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defs.p4");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, ": triple 3 * ;").unwrap();
        writeln!(f, "5 triple").unwrap();
        drop(f);

        let mut rt = runtime();
        let rc = rt.eval_file(&path).unwrap();
        assert_eq!(rc, 0);
        assert_eq!(rt.kernel.pop().unwrap(), 15);
        assert!(rt.find_name("triple").is_some());
    }

    #[test]
    fn test_missing_include_reports_enoent() {
        let mut rt = runtime();
        let rc = rt.load_file("no-such-file-anywhere.p4").unwrap();
        assert_eq!(rc, Throw::Enoent.code());
    }

    #[test]
    fn test_file_source_id_is_positive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.p4");
        std::fs::write(&path, "SOURCE-ID\n").unwrap();
        let mut rt = runtime();
        rt.eval_file(&path).unwrap();
        assert!(rt.kernel.pop().unwrap() > 0);
    }

    #[test]
    fn test_env_copies_to_pad() {
        std::env::set_var("POST4_UNIT_TEST_VAR", "value");
        let mut rt = runtime();
        rt.interpret("S\" POST4_UNIT_TEST_VAR\" env").unwrap();
        let n = rt.kernel.pop().unwrap();
        let addr = rt.kernel.pop().unwrap();
        assert_eq!(n, 5);
        assert_eq!(rt.kernel.str_at(addr as usize, 5).unwrap(), "value");

        rt.interpret("S\" POST4_NO_SUCH_VAR\" env").unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), -1);
        assert_eq!(rt.kernel.pop().unwrap(), 0);
    }

    #[test]
    fn test_args_table() {
        let mut opts = Options::for_test();
        opts.script = vec!["script.p4".into(), "alpha".into(), "beta".into()];
        let mut rt = ForthRuntime::new(&opts).unwrap();
        rt.interpret("args").unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), 3);
        let table = rt.kernel.pop().unwrap() as usize;
        let addr = rt.kernel.get_cell(table + 2 * crate::kernel::CELL).unwrap();
        let len = rt.kernel.get_cell(table + 3 * crate::kernel::CELL).unwrap();
        assert_eq!(rt.kernel.str_at(addr as usize, len as usize).unwrap(), "alpha");
    }

    #[test]
    fn test_backslash_discards_line() {
        let mut rt = runtime();
        rt.interpret("1 \\ 2 3 4").unwrap();
        assert_eq!(rt.kernel.depth(), 1);
    }
}
