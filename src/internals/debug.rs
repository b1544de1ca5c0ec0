// Debugging help: memory and stack dumps, the decompiler behind _SEEXT,
// the WORDS listing, execution tracing, and the input context printer
// used when reporting a bad token.

use crate::errors::Result;
use crate::kernel::{aligned, cell_addr, Cell, CELL, SYS_IN, SYS_TRACE};
use crate::runtime::{Code, ForthRuntime};

impl ForthRuntime {
    /// TRACE ( -- aaddr )  nonzero enables per-token tracing
    pub fn f_trace(&mut self) -> Result<()> {
        self.kernel.push(SYS_TRACE as Cell)
    }

    /// One trace line per dispatched token.
    pub fn u_trace(&mut self, xt: usize) {
        println!(
            "{:#x} {}\tdepth={}",
            xt,
            self.words[xt].name,
            self.kernel.depth()
        );
    }

    /// Show the current input line with a caret under the parse position.
    /// Tabs become spaces so the caret lines up.
    pub fn u_input_context(&mut self) {
        let Ok(raw) = self.kernel.str_at(self.input.buffer, self.input.length) else {
            return;
        };
        let line: String = raw
            .trim_end_matches(['\r', '\n'])
            .chars()
            .map(|c| if c == '\t' { ' ' } else { c })
            .collect();
        let offset = (self.kernel.sys(SYS_IN).max(0) as usize).max(1);
        println!(">> {}", line);
        println!(">> {:>offset$}", "^");
    }

    /// _bp ( -- )  print the input context, immediately
    pub fn f_bp(&mut self) -> Result<()> {
        self.u_input_context();
        Ok(())
    }

    /// DUMP ( addr u -- )  bytes, sixteen per row with an ASCII column
    pub fn f_dump(&mut self) -> Result<()> {
        let len = cell_addr(self.kernel.pop()?)?;
        let addr = cell_addr(self.kernel.pop()?)?;
        let bytes = self.kernel.bytes(addr, len)?.to_vec();
        for (row, chunk) in bytes.chunks(16).enumerate() {
            print!("{:08x} ", addr + row * 16);
            for (i, b) in chunk.iter().enumerate() {
                if i % 4 == 0 {
                    print!(" ");
                }
                print!("{:02x} ", b);
            }
            for i in chunk.len()..16 {
                if i % 4 == 0 {
                    print!(" ");
                }
                print!("   ");
            }
            print!(" ");
            for b in chunk {
                let c = *b as char;
                print!("{}", if c.is_ascii_graphic() || c == ' ' { c } else { '.' });
            }
            println!();
        }
        Ok(())
    }

    /// _stack_dump ( addr u -- )  cells, four per row, newest labelled
    pub fn f_stack_dump(&mut self) -> Result<()> {
        let len = cell_addr(self.kernel.pop()?)?;
        let base = cell_addr(self.kernel.pop()?)?;
        for i in 0..len {
            if i % 4 == 0 {
                print!("top-{:02} ", len - 1 - i);
            }
            let cell = self.kernel.get_cell(base + i * CELL)?;
            print!("${:016x} ", cell as u64);
            if i % 4 == 3 {
                println!();
            }
        }
        if len % 4 != 0 || len == 0 {
            println!();
        }
        Ok(())
    }

    /// WORDS ( -- )  visible dictionary names, newest first
    pub fn f_words(&mut self) -> Result<()> {
        let mut column = 0;
        for word in self.words.iter().rev() {
            if word.is_hidden() || word.name.is_empty() {
                continue;
            }
            if column + word.name.len() + 1 > 72 {
                println!();
                column = 0;
            }
            print!("{} ", word.name);
            column += word.name.len() + 1;
        }
        println!();
        Ok(())
    }

    /// _SEEXT ( xt -- )  decompile a word
    pub fn f_seext(&mut self) -> Result<()> {
        let popped = self.kernel.pop()?;
        let xt = self.xt_check(popped)?;
        let word = self.words[xt].clone();
        if xt < self.builtin_mark {
            println!(": {} ( builtin ) ;", word.name);
            return Ok(());
        }
        match word.code {
            Code::Enter => self.u_see_colon(xt),
            Code::DataField => {
                println!("CREATE {} ( size {} )", word.name, word.ndata.saturating_sub(CELL));
                if word.ndata > CELL {
                    self.kernel.push((word.data_addr + CELL) as Cell)?;
                    self.kernel.push((word.ndata - CELL) as Cell)?;
                    self.f_dump()?;
                }
                Ok(())
            }
            Code::DoDoes => {
                // Name the defining word by the body its DOES> suffix
                // points into.
                let resume = cell_addr(self.kernel.get_cell(word.data_addr)?)?;
                let definer = self
                    .words
                    .iter()
                    .find(|w| {
                        matches!(w.code, Code::Enter)
                            && (w.data_addr..w.data_addr + w.ndata).contains(&resume)
                    })
                    .map(|w| w.name.as_str())
                    .unwrap_or("?");
                println!("{} {}", definer, word.name);
                Ok(())
            }
            Code::Marker => {
                println!("MARKER {}", word.name);
                Ok(())
            }
            Code::Prim(_) => {
                println!(": {} ( builtin ) ;", word.name);
                Ok(())
            }
        }
    }

    fn u_see_colon(&mut self, xt: usize) -> Result<()> {
        let word = self.words[xt].clone();
        if word.name.is_empty() {
            print!(":NONAME ");
        } else {
            print!(": {} ", word.name);
        }
        let mut p = word.data_addr;
        let end = word.data_addr + word.ndata;
        while p < end {
            let c = self.kernel.get_cell(p)?;
            p += CELL;
            let token = c as usize;
            if token == self.xt_exit {
                break;
            }
            if token == self.xt_lit {
                print!("[ {} ] LITERAL ", self.kernel.get_cell(p)?);
                p += CELL;
            } else if token == self.xt_flit {
                let bits = self.kernel.get_cell(p)?;
                print!("{} ", f64::from_bits(bits as u64));
                p += CELL;
            } else if token == self.xt_slit {
                let len = cell_addr(self.kernel.get_cell(p)?)?;
                let text = self.kernel.str_at(p + CELL, len)?;
                print!("S\" {}\" ", text);
                p += CELL + aligned(len);
            } else if token == self.xt_branch || token == self.xt_branchz || token == self.xt_call {
                let offset = self.kernel.get_cell(p)?;
                p += CELL;
                print!(
                    "{} [ {} CELLS , ] ",
                    self.words[token].name,
                    offset / CELL as Cell
                );
            } else {
                let w = self.xt_check(c)?;
                if self.words[w].name.is_empty() {
                    print!("(:noname {}) ", w);
                } else {
                    print!("{} ", self.words[w].name);
                }
            }
        }
        print!(";");
        if word.is_immediate() {
            print!(" IMMEDIATE");
        }
        if word.is_compile_only() {
            print!(" compile-only");
        }
        println!();
        Ok(())
    }
}
