use std::fs;
use std::ops::Deref;
use std::path::Path;
use std::str::FromStr;

use color_eyre::eyre::{Result, WrapErr};

use crate::config::RuntimeConfig;
use crate::memory::Byte;

pub mod parse;

pub use parse::{Assembler, LiteralPolicy, ParseError, ParseErrorKind};

/// An assembled program, ready to be loaded into system memory
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Program {
    bytes: Vec<Byte>,
}

impl Program {
    pub fn new(bytes: Vec<Byte>) -> Self {
        Self { bytes }
    }

    /// Reads and assembles the `.s8` source at `path`
    pub fn from_file<P: AsRef<Path>>(path: P, assembler: &Assembler) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to open `{}`", path.display()))?;

        let program = assembler
            .assemble(&source)
            .wrap_err_with(|| format!("Failed to assemble `{}`", path.display()))?;
        log::debug!(
            "Assembled {} bytes from `{}`",
            program.len(),
            path.display()
        );

        Ok(program)
    }
}

impl Deref for Program {
    type Target = [Byte];

    fn deref(&self) -> &[Byte] {
        &self.bytes
    }
}

impl FromStr for Program {
    type Err = ParseError;

    /// Assembles `s` with the default program size limit
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Assembler::new(RuntimeConfig::default().max_program_size).assemble(s)
    }
}
