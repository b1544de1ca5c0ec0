// system configuration and command line processing

use std::env;
use std::path::{Path, PathBuf};

use argh::FromArgs;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CORE_FILE: &str = "post4.p4";
pub const BLOCK_FILE: &str = ".post4.blk";
pub const CORE_PATH: &str = ".:/usr/pkg/lib/post4:/usr/local/lib/post4:/usr/lib/post4";
pub const STACK_SIZE: usize = 64; // in cells
pub const FLOAT_STACK_SIZE: usize = 6; // in cells
pub const MEM_SIZE: usize = 128; // in kilobytes

/// post4, a Forth interpreter. With no script, or with "-", standard
/// input is read.
#[derive(FromArgs, Debug)]
pub struct Options {
    /// print build and version information, then exit
    #[argh(switch, short = 'V')]
    pub version: bool,

    /// block file; default ./.post4.blk, falling back to $HOME
    #[argh(option, short = 'b', default = "BLOCK_FILE.to_string()")]
    pub block_file: String,

    /// word definition file, searched for on $POST4_PATH
    #[argh(option, short = 'c', default = "CORE_FILE.to_string()")]
    pub core_file: String,

    /// data stack size in cells
    #[argh(option, short = 'd', default = "STACK_SIZE")]
    pub ds_size: usize,

    /// include file, repeatable, searched for on $POST4_PATH
    #[argh(option, short = 'i')]
    pub include: Vec<String>,

    /// data space memory in kilobytes
    #[argh(option, short = 'm', default = "MEM_SIZE")]
    pub mem_size: usize,

    /// return stack size in cells
    #[argh(option, short = 'r', default = "STACK_SIZE")]
    pub rs_size: usize,

    /// log level: error, warn, info, debug or trace
    #[argh(option, default = "String::from(\"warn\")")]
    pub debuglevel: String,

    /// script file and its arguments
    #[argh(positional, greedy)]
    pub script: Vec<String>,
}

impl Options {
    /// The float stack is small and fixed, as the original interpreter
    /// shipped it; there is no flag for it.
    pub fn fs_size(&self) -> usize {
        FLOAT_STACK_SIZE
    }

    /// The script to run, unless standard input was asked for.
    pub fn script_file(&self) -> Option<&str> {
        self.script
            .first()
            .map(|s| s.as_str())
            .filter(|s| *s != "-")
    }

    /// Arguments visible to the `args` word: the script name and its
    /// arguments, in command-line order.
    pub fn forth_args(&self) -> Vec<String> {
        self.script.clone()
    }

    /// Small sizes, no core file, no script. Used throughout the tests.
    pub fn for_test() -> Options {
        Options {
            version: false,
            block_file: BLOCK_FILE.to_string(),
            core_file: String::new(),
            ds_size: STACK_SIZE,
            include: Vec::new(),
            mem_size: 64,
            rs_size: STACK_SIZE,
            debuglevel: "error".to_string(),
            script: Vec::new(),
        }
    }
}

/// Resolve a file against $POST4_PATH (or the default search path). A
/// name that already points at a file is taken as is.
pub fn find_file(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.is_file() {
        return Some(direct.to_path_buf());
    }
    if direct.is_absolute() {
        return None;
    }
    let path = env::var("POST4_PATH").unwrap_or_else(|_| CORE_PATH.to_string());
    for dir in path.split(':') {
        if dir.is_empty() {
            continue;
        }
        let candidate = Path::new(dir).join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

pub fn build_info() -> String {
    format!(
        "post4/{}\n\nPOST4_PATH=\"{}\"\nBLOCK_FILE=\"{}\"\nCELL={} STACK={} FLOAT-STACK={} MEM={}KB\n",
        VERSION,
        CORE_PATH,
        BLOCK_FILE,
        crate::kernel::CELL,
        STACK_SIZE,
        FLOAT_STACK_SIZE,
        MEM_SIZE,
    )
}

//////////////////////////////////////////////
/// TESTS
///
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let opts = Options::for_test();
        assert_eq!(opts.ds_size, STACK_SIZE);
        assert_eq!(opts.fs_size(), FLOAT_STACK_SIZE);
        assert!(opts.script_file().is_none());
    }

    #[test]
    fn test_script_dash_means_stdin() {
        let mut opts = Options::for_test();
        opts.script = vec!["-".into(), "arg".into()];
        assert!(opts.script_file().is_none());
        assert_eq!(opts.forth_args().len(), 2);
    }

    #[test]
    fn test_find_file_direct_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.p4");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "1").unwrap();
        drop(f);
        let found = find_file(path.to_str().unwrap()).unwrap();
        assert_eq!(found, path);
        assert!(find_file("definitely-not-present.p4").is_none());
    }

    #[test]
    fn test_build_info_mentions_version() {
        assert!(build_info().contains(VERSION));
    }
}
