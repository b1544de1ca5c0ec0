// Delimiter-bounded extraction from the current input buffer.
//
// The parser returns (address, length) views into kernel memory covering
// the token text; a view is only valid until the next input operation.
// The parse offset is the >IN cell, so Forth code that stores to >IN
// rewinds or skips input exactly as the engine does.

use crate::errors::Result;
use crate::internals::files::Source;
use crate::internals::numbers::char_literal;
use crate::kernel::{Cell, SYS_IN};
use crate::runtime::ForthRuntime;

impl ForthRuntime {
    /// Parse "ccc<delim>": return the text up to, but not including, the
    /// next delimiter and advance >IN past it (or to end of buffer). A
    /// space delimiter also terminates on any control character.
    ///
    /// With `escape`, a backslash plus one character collapses in place to
    /// the escape literal and the buffer shrinks by one byte; an escaped
    /// delimiter stays in the token. Block buffers are never rewritten, so
    /// escapes are left alone there.
    pub fn u_parse(&mut self, delim: u8, escape: bool) -> Result<(usize, usize)> {
        let escape = escape && !matches!(self.input.source, Source::Block(_));
        let buf = self.input.buffer;
        let mut len = self.input.length;
        let offset = (self.kernel.sys(SYS_IN).max(0) as usize).min(len);

        let mut i = offset;
        while i < len {
            let ch = self.kernel.get_byte(buf + i)?;
            if escape && ch == b'\\' && i + 1 < len {
                self.kernel.move_bytes(buf + i + 1, buf + i, len - i - 1)?;
                len -= 1;
                let c = self.kernel.get_byte(buf + i)?;
                self.kernel.set_byte(buf + i, char_literal(c))?;
                i += 1;
                continue;
            }
            if ch == delim || (delim == b' ' && ch.is_ascii_control()) {
                break;
            }
            i += 1;
        }
        self.input.length = len;
        // Offset lands just after the delimiter, or at end of buffer.
        self.kernel.set_sys(SYS_IN, (i + usize::from(i < len)) as Cell);
        Ok((buf + offset, i - offset))
    }

    /// Skip leading white space, then parse a space-delimited name.
    pub fn u_parse_name(&mut self) -> Result<(usize, usize)> {
        let buf = self.input.buffer;
        let len = self.input.length;
        let mut offset = (self.kernel.sys(SYS_IN).max(0) as usize).min(len);
        while offset < len && self.kernel.get_byte(buf + offset)?.is_ascii_whitespace() {
            offset += 1;
        }
        self.kernel.set_sys(SYS_IN, offset as Cell);
        self.u_parse(b' ', false)
    }

    /// Parse a name and return it as text, for words that read their
    /// argument from the input stream (: CREATE MARKER ').
    pub fn u_parse_name_str(&mut self) -> Result<String> {
        let (addr, len) = self.u_parse_name()?;
        self.kernel.str_at(addr, len)
    }
}
