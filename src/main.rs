// post4 main program

use std::path::Path;

use log::LevelFilter;

use post4::config::{build_info, Options};
use post4::internals::signals;
use post4::runtime::ForthRuntime;

fn main() {
    let opts: Options = argh::from_env();
    if opts.version {
        print!("{}", build_info());
        return;
    }

    let level = match opts.debuglevel.as_str() {
        "error" => LevelFilter::Error,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Warn,
    };
    let _ = simple_logger::SimpleLogger::new().with_level(level).init();
    signals::install();

    let mut rt = match ForthRuntime::new(&opts) {
        Ok(rt) => rt,
        Err(t) => {
            eprintln!("startup failed: {}", t);
            std::process::exit(t.code() as i32);
        }
    };
    let rc = run(&mut rt, &opts);
    drop(rt); // flush the block buffer, restore the terminal
    if rc != 0 {
        std::process::exit(rc as i32);
    }
}

/// Core file, then includes in command-line order, then the script or
/// standard input. The exit status is the last throw code, or whatever
/// `bye-code` was given.
fn run(rt: &mut ForthRuntime, opts: &Options) -> i64 {
    if !opts.core_file.is_empty() {
        if let Err(t) = rt.load_file(&opts.core_file) {
            return t.code();
        }
    }
    for file in &opts.include {
        if let Err(t) = rt.load_file(file) {
            return t.code();
        }
    }
    let result = match opts.script_file() {
        Some(file) => rt.eval_file(Path::new(file)),
        None => rt.eval_terminal(),
    };
    match result {
        Ok(code) => code,
        Err(t) => t.code(),
    }
}
