// Block file I/O.
//
// A flat file of fixed 1024-byte blocks, 1-indexed, no header. The
// context holds one block buffer (free, clean or dirty) in kernel memory
// at BLOCK_START; loading a different block evicts the current one,
// writing it first when dirty. The file grows on write to a multiple of
// the block size, padded with spaces. Access is guarded by an advisory
// exclusive lock, falling back to $HOME when the working directory's
// file is unavailable.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::errors::{Result, Throw};
use crate::internals::files::{InputRecord, Source};
use crate::kernel::{Cell, BLOCK_SIZE, BLOCK_START, SYS_BLK};
use crate::runtime::{BlockState, ForthRuntime};

enum OpenOutcome {
    Opened(File),
    Locked,
    Failed,
}

fn try_open(path: &Path) -> OpenOutcome {
    let file = match OpenOptions::new().read(true).write(true).create(true).open(path) {
        Ok(f) => f,
        Err(_) => return OpenOutcome::Failed,
    };
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) } != 0 {
            return OpenOutcome::Locked;
        }
    }
    OpenOutcome::Opened(file)
}

/// Open and lock the block file, trying $HOME when the working
/// directory's copy cannot be opened or is already in use.
pub fn block_open(name: &str) -> Option<File> {
    match try_open(Path::new(name)) {
        OpenOutcome::Opened(f) => return Some(f),
        OpenOutcome::Locked => eprintln!("{} already in use", name),
        OpenOutcome::Failed => {}
    }
    let home = std::env::var_os("HOME")?;
    let path = PathBuf::from(home).join(name);
    match try_open(&path) {
        OpenOutcome::Opened(f) => Some(f),
        OpenOutcome::Locked => {
            eprintln!("{} already in use", path.display());
            None
        }
        OpenOutcome::Failed => None,
    }
}

impl ForthRuntime {
    fn u_block_file(&mut self) -> Result<&mut File> {
        if self.block_file.is_none() {
            debug!("opening block file {}", self.block_path);
            self.block_file = block_open(&self.block_path);
        }
        self.block_file.as_mut().ok_or(Throw::Eio)
    }

    /// Write the buffer out to its block, extending the file first so the
    /// write lands on a block boundary inside it.
    fn u_block_write(&mut self) -> Result<()> {
        let number = self.block_number;
        if number <= 0 {
            return Err(Throw::BlockWr);
        }
        let data = self.kernel.bytes(BLOCK_START, BLOCK_SIZE)?.to_vec();
        let want = (number as u64 - 1) * BLOCK_SIZE as u64;
        let file = self.u_block_file()?;
        let size = file.metadata().map_err(|_| Throw::BlockWr)?.len();
        if size < want {
            file.seek(SeekFrom::End(0)).map_err(|_| Throw::BlockWr)?;
            let blanks = vec![b' '; (want - size) as usize];
            file.write_all(&blanks).map_err(|_| Throw::BlockWr)?;
        }
        file.seek(SeekFrom::Start(want)).map_err(|_| Throw::BlockWr)?;
        file.write_all(&data).map_err(|_| Throw::BlockWr)?;
        file.flush().map_err(|_| Throw::BlockWr)?;
        self.block_state = BlockState::Clean;
        Ok(())
    }

    fn u_block_read(&mut self, number: Cell) -> Result<()> {
        let mut buf = vec![0u8; BLOCK_SIZE];
        let file = self.u_block_file()?;
        file.seek(SeekFrom::Start((number as u64 - 1) * BLOCK_SIZE as u64))
            .map_err(|_| Throw::BlockRd)?;
        file.read_exact(&mut buf).map_err(|_| Throw::BlockRd)?;
        self.kernel.write_bytes(BLOCK_START, &buf)
    }

    /// Assign the buffer to a block, evicting (and saving) the current
    /// assignment. Block 0 is invalid.
    pub fn u_block_buffer(&mut self, number: Cell, with_read: bool) -> Result<()> {
        if number <= 0 {
            return Err(Throw::BlockBad);
        }
        if number == self.block_number && self.block_state != BlockState::Free {
            return Ok(());
        }
        if self.block_state == BlockState::Dirty {
            self.u_block_write()?;
        }
        if with_read {
            self.u_block_read(number)?;
        }
        self.block_state = BlockState::Clean;
        self.block_number = number;
        Ok(())
    }

    /// Flush the buffer if dirty; also called at context teardown.
    pub fn u_save_block(&mut self) -> Result<()> {
        if self.block_state == BlockState::Dirty {
            self.u_block_write()?;
        }
        Ok(())
    }

    /// BLK ( -- aaddr )
    pub fn f_blk(&mut self) -> Result<()> {
        self.kernel.push(SYS_BLK as Cell)
    }

    /// BLOCK ( u -- aaddr )
    pub fn f_block(&mut self) -> Result<()> {
        let number = self.kernel.top()?;
        self.u_block_buffer(number, true)?;
        self.kernel.set_top(BLOCK_START as Cell)
    }

    /// BUFFER ( u -- aaddr )  assign without reading
    pub fn f_buffer(&mut self) -> Result<()> {
        let number = self.kernel.top()?;
        self.u_block_buffer(number, false)?;
        self.kernel.set_top(BLOCK_START as Cell)
    }

    /// blocks ( -- u )  how many whole blocks the file holds
    pub fn f_blocks(&mut self) -> Result<()> {
        let file = self.u_block_file()?;
        let size = file.metadata().map_err(|_| Throw::Eio)?.len();
        self.kernel.push((size / BLOCK_SIZE as u64) as Cell)
    }

    /// UPDATE ( -- )
    pub fn f_update(&mut self) -> Result<()> {
        self.block_state = BlockState::Dirty;
        Ok(())
    }

    /// SAVE-BUFFERS ( -- )
    pub fn f_save_buffers(&mut self) -> Result<()> {
        self.u_save_block()
    }

    /// EMPTY-BUFFERS ( -- )  discard without writing
    pub fn f_empty_buffers(&mut self) -> Result<()> {
        self.block_state = BlockState::Free;
        Ok(())
    }

    /// LOAD ( u -- )  interpret a block as a nested input source
    pub fn f_load(&mut self) -> Result<()> {
        let number = self.kernel.pop()?;
        self.u_block_buffer(number, true)?;
        self.u_push_input(InputRecord {
            source: Source::Block(number),
            buffer: BLOCK_START,
            size: BLOCK_SIZE,
            length: BLOCK_SIZE,
            unget: None,
        })?;
        self.kernel.set_sys(SYS_BLK, number);
        let rc = self.u_run_nested();
        self.u_pop_input()?;
        rc.map(|_| ())
    }
}

//////////////////////////////////////////////
/// TESTS
///
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;

    fn runtime_with_block_file(dir: &tempfile::TempDir) -> ForthRuntime {
        let mut opts = Options::for_test();
        opts.block_file = dir.path().join("test.blk").to_string_lossy().into_owned();
        ForthRuntime::new(&opts).unwrap()
    }

    fn write_blocks(dir: &tempfile::TempDir, blocks: &[&[u8]]) {
        let mut data = Vec::new();
        for b in blocks {
            let mut block = b.to_vec();
            block.resize(BLOCK_SIZE, b' ');
            data.extend_from_slice(&block);
        }
        std::fs::write(dir.path().join("test.blk"), data).unwrap();
    }

    #[test]
    fn test_block_zero_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let mut rt = runtime_with_block_file(&dir);
        assert_eq!(rt.interpret("0 BLOCK").unwrap(), Throw::BlockBad.code());
    }

    #[test]
    fn test_block_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        write_blocks(&dir, &[b"first", b"second"]);
        let mut rt = runtime_with_block_file(&dir);
        rt.interpret("2 BLOCK").unwrap();
        let addr = rt.kernel.pop().unwrap() as usize;
        assert_eq!(addr, BLOCK_START);
        assert_eq!(rt.kernel.str_at(addr, 6).unwrap(), "second");
        assert_eq!(rt.block_state, BlockState::Clean);
    }

    #[test]
    fn test_block_past_end_throws_read_error() {
        let dir = tempfile::tempdir().unwrap();
        write_blocks(&dir, &[b"only"]);
        let mut rt = runtime_with_block_file(&dir);
        assert_eq!(rt.interpret("9 BLOCK").unwrap(), Throw::BlockRd.code());
    }

    #[test]
    fn test_buffer_update_save_grows_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut rt = runtime_with_block_file(&dir);
        // Assign block 3 without reading, mark dirty, flush.
        rt.interpret("3 BUFFER DROP UPDATE SAVE-BUFFERS").unwrap();
        let len = std::fs::metadata(dir.path().join("test.blk")).unwrap().len();
        assert_eq!(len, 3 * BLOCK_SIZE as u64);
        // Growth padding is spaces.
        let data = std::fs::read(dir.path().join("test.blk")).unwrap();
        assert!(data[..2 * BLOCK_SIZE].iter().all(|b| *b == b' '));
    }

    #[test]
    fn test_dirty_block_written_on_eviction() {
        let dir = tempfile::tempdir().unwrap();
        write_blocks(&dir, &[b"one", b"two"]);
        let mut rt = runtime_with_block_file(&dir);
        rt.interpret("1 BLOCK").unwrap();
        rt.kernel.pop().unwrap();
        // Scribble on block 1 and mark it dirty.
        rt.kernel.write_bytes(BLOCK_START, b"CHANGED").unwrap();
        rt.interpret("UPDATE 2 BLOCK DROP").unwrap();
        let data = std::fs::read(dir.path().join("test.blk")).unwrap();
        assert_eq!(&data[..7], b"CHANGED");
    }

    #[test]
    fn test_empty_buffers_discards() {
        let dir = tempfile::tempdir().unwrap();
        write_blocks(&dir, &[b"keep"]);
        let mut rt = runtime_with_block_file(&dir);
        rt.interpret("1 BLOCK DROP").unwrap();
        rt.kernel.write_bytes(BLOCK_START, b"JUNK").unwrap();
        rt.interpret("UPDATE EMPTY-BUFFERS").unwrap();
        assert_eq!(rt.block_state, BlockState::Free);
        let data = std::fs::read(dir.path().join("test.blk")).unwrap();
        assert_eq!(&data[..4], b"keep");
    }

    #[test]
    fn test_load_interprets_block() {
        let dir = tempfile::tempdir().unwrap();
        write_blocks(&dir, &[b"7 3 + "]);
        let mut rt = runtime_with_block_file(&dir);
        rt.interpret("1 LOAD").unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), 10);
        // BLK is restored once the nested source ends.
        assert_eq!(rt.kernel.sys(SYS_BLK), 0);
    }

    #[test]
    fn test_blocks_counts_whole_blocks() {
        let dir = tempfile::tempdir().unwrap();
        write_blocks(&dir, &[b"a", b"b", b"c"]);
        let mut rt = runtime_with_block_file(&dir);
        rt.interpret("blocks").unwrap();
        assert_eq!(rt.kernel.pop().unwrap(), 3);
    }

    #[test]
    fn test_missing_block_file_directory_throws_eio() {
        let mut opts = Options::for_test();
        // An absolute path that cannot be created; the HOME fallback
        // joins an absolute path and lands on the same place.
        opts.block_file = "/no/such/dir/test.blk".into();
        let mut rt = ForthRuntime::new(&opts).unwrap();
        let rc = rt.interpret("1 BLOCK").unwrap();
        assert_eq!(rc, Throw::Eio.code());
    }
}
