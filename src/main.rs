use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use log::*;
use silver8::config::RuntimeConfig;
use silver8::machine::Machine;
use silver8::program::{Assembler, Program};
use simple_logger::SimpleLogger;

const CONFIG_FILE: &str = "config.json";
/// Program used when none is given or the given one does not exist
const DEFAULT_PROGRAM: &str = "program.s8";
const EXTENSION: &str = "s8";

#[derive(Parser, Debug)]
#[command(
    name = "silver8",
    version,
    about = "Assemble and run a .s8 program on the Silver8 byte-code machine",
    long_about = "Assemble and run a .s8 program on the Silver8 byte-code machine.\n\nMachine sizes are read from config.json in the working directory; missing keys keep their defaults."
)]
struct Args {
    /// Source file to run. `.s8` is appended if missing; falls back to program.s8.
    program: Option<PathBuf>,
}

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new().with_level(LevelFilter::Info).init()?; // logging

    let args = Args::parse();
    let config = RuntimeConfig::load_or_default(CONFIG_FILE);
    let path = resolve_program(args.program);
    let program = Program::from_file(&path, &Assembler::new(config.max_program_size))?;

    let mut machine = Machine::boot(config, &program)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    machine.run(&mut out)?;
    writeln!(out).wrap_err("Failed to write to stdout")?;
    out.flush().wrap_err("Failed to write to stdout")?;

    Ok(())
}

/// Picks the source file to run from the optional command line argument
fn resolve_program(arg: Option<PathBuf>) -> PathBuf {
    let path = match arg {
        Some(arg) => with_extension(arg),
        None => return PathBuf::from(DEFAULT_PROGRAM),
    };

    if path.exists() {
        path
    } else {
        warn!(
            "File `{}` doesn't exist, defaulting to {}",
            path.display(),
            DEFAULT_PROGRAM
        );
        PathBuf::from(DEFAULT_PROGRAM)
    }
}

/// Appends `.s8` unless `path` already ends with it
fn with_extension(path: PathBuf) -> PathBuf {
    if path.extension().map_or(false, |ext| ext == EXTENSION) {
        return path;
    }

    let mut name = path.into_os_string();
    name.push(".");
    name.push(EXTENSION);
    PathBuf::from(name)
}
