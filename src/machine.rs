use std::io::Write;

use color_eyre::eyre::Result;

use crate::config::{ConfigError, RuntimeConfig};
use crate::memory::AddressSpace;
use crate::processor::{Processor, RunReport, Step};
use crate::program::Program;

/// A processor together with the memory it runs on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub processor: Processor,
    pub memory: AddressSpace,
}

impl Machine {
    /// Creates a machine with zeroed memory and registers.
    ///
    /// # Errors
    ///
    /// Fails if `config` has a zero size or a screen too large to address.
    pub fn new(config: RuntimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            processor: Processor::new(&config),
            memory: AddressSpace::new(&config),
        })
    }

    /// Creates a machine, seeds the character table and loads `program` on
    /// top of it
    pub fn boot(config: RuntimeConfig, program: &Program) -> Result<Self, ConfigError> {
        let mut machine = Self::new(config)?;
        machine.memory.seed_charset();
        machine.load_program(program);
        Ok(machine)
    }

    /// Copies `program` to the start of system memory, truncating it to fit.
    /// Returns the number of bytes loaded.
    pub fn load_program(&mut self, program: &Program) -> usize {
        self.memory.load_program(program)
    }

    pub fn is_running(&self) -> bool {
        self.processor.running
    }

    /// Executes one instruction
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<Step> {
        self.processor.execute(&mut self.memory, out)
    }

    /// Runs until the program halts or faults
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<RunReport> {
        self.processor.execute_until_halt(&mut self.memory, out)
    }
}
