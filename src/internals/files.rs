// Input sources: terminal, in-memory string, text file, or block.
//
// The context has exactly one active input record at a time. EVALUATE,
// INCLUDED and LOAD snapshot the current record by value, swap in a new
// one, run the interpreter recursively and restore the snapshot on every
// exit path. The parse offset and block number live in kernel memory (the
// >IN and BLK cells) so Forth code can address them; snapshots carry those
// cells, and the text input buffer contents, alongside the record.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use crate::kernel::Cell;

/// Where the current input text comes from.
#[derive(Debug)]
pub enum Source {
    /// Interactive standard input, line at a time.
    Terminal,
    /// A string already present in kernel memory (EVALUATE).
    Str,
    /// A text file; `id` is the value SOURCE-ID reports.
    File { id: Cell, reader: BufReader<File> },
    /// One block of the block file (LOAD).
    Block(Cell),
}

#[derive(Debug)]
pub struct InputRecord {
    pub source: Source,
    pub buffer: usize,     // address of the input buffer in kernel memory
    pub size: usize,       // buffer capacity in bytes
    pub length: usize,     // bytes of valid input
    pub unget: Option<u8>, // one-character pushback used by KEY?
}

impl InputRecord {
    pub fn terminal(buffer: usize, size: usize) -> InputRecord {
        InputRecord {
            source: Source::Terminal,
            buffer,
            size,
            length: 0,
            unget: None,
        }
    }

    /// -1 for a string or block, 0 for the terminal, else the file handle.
    pub fn source_id(&self) -> Cell {
        match self.source {
            Source::Terminal => 0,
            Source::Str | Source::Block(_) => -1,
            Source::File { id, .. } => id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.source, Source::Terminal)
    }

    /// Refill is a no-op for sources that arrive whole.
    pub fn refillable(&self) -> bool {
        matches!(self.source, Source::Terminal | Source::File { .. })
    }

    /// Read the next line from this source, without the trailing newline
    /// handling; the caller truncates to the buffer size. None means EOF.
    pub fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        let n = match &mut self.source {
            Source::Terminal => {
                io::stdout().flush().ok();
                io::stdin().read_line(&mut line).ok()?
            }
            Source::File { reader, .. } => reader.read_line(&mut line).ok()?,
            _ => return None,
        };
        if n == 0 {
            None
        } else {
            Some(line)
        }
    }
}

/// Saved state for one level of input nesting.
#[derive(Debug)]
pub struct InputSnapshot {
    pub record: InputRecord,
    pub offset: Cell, // the >IN cell
    pub blk: Cell,    // the BLK cell
    pub state: Cell,  // interpret/compile state across EVALUATE and friends
    pub tib: Vec<u8>, // text input buffer contents, clobbered by nested reads
}

pub fn open_reader(path: &Path) -> io::Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}
