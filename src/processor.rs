use std::convert::TryFrom;
use std::fmt;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use crate::config::RuntimeConfig;
use crate::memory::{AddressSpace, Byte, Region, PLACEHOLDER};
use crate::registers::RegisterFile;
use color_eyre::eyre::{Result, WrapErr};
use log::*;
use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

pub const CPU_NAME: &str = "Silver8 Gen1";

/// Conditions that halt the machine. Memory and registers stay inspectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Fault {
    #[error("Unknown instruction: {opcode:02X}")]
    UnknownInstruction { opcode: Byte },
    #[error("Invalid {branch} address: {addr}")]
    InvalidJumpTarget { branch: Branch, addr: Byte },
    #[error("Program counter {pc} is outside of system memory")]
    ProgramCounterOutOfBounds { pc: usize },
}

/// Which target of an `IF` was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    True,
    False,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::True => f.write_str("true"),
            Branch::False => f.write_str("false"),
        }
    }
}

/// Conditions that are reported while execution continues with the next
/// instruction. The offending instruction has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Warning {
    #[error("Invalid register index: {reg}")]
    InvalidRegister { reg: Byte },
    #[error("Invalid memory address: {addr}")]
    InvalidAddress { addr: Byte },
    #[error("Invalid video memory coordinates: ({x}, {y})")]
    InvalidCoordinates { x: Byte, y: Byte },
    #[error("Invalid character index: {index}")]
    InvalidCharacterIndex { index: Byte },
}

/// Outcome of executing a single instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Continue,
    Warning(Warning),
    Halted,
    Faulted(Fault),
}

/// One opcode together with the operand bytes its arity asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decoded {
    instruction: Instruction,
    operands: [Byte; 3],
}

/// Summary of a call to [`Processor::execute_until_halt`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub executed_instructions: u64,
    pub elapsed: Duration,
    pub fault: Option<Fault>,
}

impl RunReport {
    /// Millions of instructions per second
    pub fn mips(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.executed_instructions as f64 / seconds / 1_000_000.0
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "CPU executed {} instructions in {:.2} seconds",
            self.executed_instructions,
            self.elapsed.as_secs_f64()
        )?;
        write!(f, "{} @ {:.2} MIPS", CPU_NAME, self.mips())
    }
}

/// Emulates the CPU: program counter, registers and run state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Processor {
    /// Program counter, a byte offset into system memory
    pub pc: usize,
    pub registers: RegisterFile,
    /// Cleared by `HALT` or a fault
    pub running: bool,
    pub executed_instructions: u64,
    /// The fault that stopped the processor, if any
    pub fault: Option<Fault>,
}

impl Processor {
    /// Initializes a running CPU with zeroed registers and the program
    /// counter at 0. `config` must have passed [`RuntimeConfig::validate`].
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            pc: 0,
            registers: RegisterFile::new(config.reg_count),
            running: true,
            executed_instructions: 0,
            fault: None,
        }
    }

    /// Returns the byte at the program counter and advances it
    pub fn fetch(&mut self, memory: &AddressSpace) -> Result<Byte, Fault> {
        let byte = memory
            .read_byte(self.pc)
            .ok_or(Fault::ProgramCounterOutOfBounds { pc: self.pc })?;
        self.pc += 1;
        Ok(byte)
    }

    /// Fetches an opcode and its operands. The opcode counts as executed as
    /// soon as it is fetched, even if it turns out to be unknown.
    fn decode(&mut self, memory: &AddressSpace) -> Result<Decoded, Fault> {
        let opcode = self.fetch(memory)?;
        self.executed_instructions += 1;

        let instruction =
            Instruction::try_from(opcode).map_err(|_| Fault::UnknownInstruction { opcode })?;

        let mut operands = [0; 3];
        for operand in operands.iter_mut().take(instruction.arity()) {
            *operand = self.fetch(memory)?;
        }

        Ok(Decoded {
            instruction,
            operands,
        })
    }

    fn raise(&mut self, fault: Fault) -> Step {
        error!("{}", fault);
        self.running = false;
        self.fault = Some(fault);
        Step::Faulted(fault)
    }

    /// Applies `op` to two registers and stores the result in the first.
    /// `op` returning `None` leaves the register untouched.
    fn arithmetic<F>(&mut self, r1: Byte, r2: Byte, op: F) -> Step
    where
        F: FnOnce(Byte, Byte) -> Option<Byte>,
    {
        let rhs = match self.registers.get(r2) {
            Some(value) => value,
            None => return Step::Warning(Warning::InvalidRegister { reg: r2 }),
        };

        match self.registers.get_mut(r1) {
            Some(lhs) => {
                if let Some(result) = op(*lhs, rhs) {
                    *lhs = result;
                }
                Step::Continue
            }
            None => Step::Warning(Warning::InvalidRegister { reg: r1 }),
        }
    }

    /// Executes a single decoded instruction
    fn execute_instruction<W: Write>(
        &mut self,
        decoded: Decoded,
        memory: &mut AddressSpace,
        out: &mut W,
    ) -> io::Result<Step> {
        let [a, b, c] = decoded.operands;

        let step = match decoded.instruction {
            Instruction::NOP => {
                debug!("NOP");
                Step::Continue
            }
            Instruction::LOAD => {
                debug!("LOAD r{} {}", a, b);

                if self.registers.set(a, b) {
                    Step::Continue
                } else {
                    Step::Warning(Warning::InvalidRegister { reg: a })
                }
            }
            Instruction::ADD => {
                debug!("ADD r{} r{}", a, b);
                self.arithmetic(a, b, |lhs, rhs| Some(lhs.wrapping_add(rhs)))
            }
            Instruction::SUB => {
                debug!("SUB r{} r{}", a, b);
                self.arithmetic(a, b, |lhs, rhs| Some(lhs.wrapping_sub(rhs)))
            }
            Instruction::MUL => {
                debug!("MUL r{} r{}", a, b);
                self.arithmetic(a, b, |lhs, rhs| Some(lhs.wrapping_mul(rhs)))
            }
            Instruction::DIV => {
                debug!("DIV r{} r{}", a, b);
                // division by zero is a no-op
                self.arithmetic(a, b, Byte::checked_div)
            }
            Instruction::JMP => {
                debug!("JMP {}", a);
                self.pc = a as usize;
                Step::Continue
            }
            Instruction::JZ => {
                let condition = self.registers.get(0);
                debug!("JZ {}: {:?}", a, condition);

                if condition == Some(0) {
                    self.pc = a as usize;
                }
                Step::Continue
            }
            Instruction::IF => {
                debug!("IF {} {} {}", a, b, c);

                let (branch, addr) = if a == 1 {
                    (Branch::True, b)
                } else {
                    (Branch::False, c)
                };

                if (addr as usize) < memory.mem_size() {
                    self.pc = addr as usize;
                    Step::Continue
                } else {
                    self.raise(Fault::InvalidJumpTarget { branch, addr })
                }
            }
            Instruction::STORE => {
                debug!("STORE r{} {}", a, b);

                match self.registers.get(a) {
                    Some(value) => match memory.store(b as usize, value) {
                        Some(Region::System(offset)) => {
                            trace!("stored {} in system memory at {}", value, offset);
                            Step::Continue
                        }
                        Some(Region::Video(offset)) => {
                            trace!("stored {} in video memory at {}", value, offset);
                            Step::Continue
                        }
                        None => Step::Warning(Warning::InvalidAddress { addr: b }),
                    },
                    None => Step::Warning(Warning::InvalidRegister { reg: a }),
                }
            }
            Instruction::STOREVMEM => {
                debug!("STOREVMEM r{} ({}, {})", a, b, c);

                match self.registers.get(a) {
                    Some(value) => {
                        if memory.write_video(b as usize, c as usize, value) {
                            Step::Continue
                        } else {
                            Step::Warning(Warning::InvalidCoordinates { x: b, y: c })
                        }
                    }
                    None => Step::Warning(Warning::InvalidRegister { reg: a }),
                }
            }
            Instruction::PRNTCH => {
                debug!("PRNTCH {}", a);

                match memory.read_byte(a as usize) {
                    Some(character) => {
                        out.write_all(&[character])?;
                        Step::Continue
                    }
                    None => Step::Warning(Warning::InvalidCharacterIndex { index: a }),
                }
            }
            Instruction::PRNTREG => {
                debug!("PRNTREG r{}", a);

                match self.registers.get(a) {
                    Some(value) => {
                        write!(out, "{} {}", a, value)?;
                        Step::Continue
                    }
                    None => Step::Warning(Warning::InvalidRegister { reg: a }),
                }
            }
            Instruction::PRNTVMEM => {
                debug!("PRNTVMEM");

                out.write_all(b"Video Memory: ")?;
                write_cells(out, memory.video())?;
                writeln!(out)?;
                writeln!(out, "Video Memory Size: {} bytes", memory.video().len())?;
                Step::Continue
            }
            Instruction::PRNTMEM => {
                debug!("PRNTMEM");

                out.write_all(b"Memory: ")?;
                write_cells(out, memory.system())?;
                writeln!(out)?;
                writeln!(out, "Memory Size: {} bytes", memory.mem_size())?;
                Step::Continue
            }
            Instruction::PRNTFREE => {
                debug!("PRNTFREE");
                writeln!(out, "Free Memory: {} bytes", memory.free_system())?;
                Step::Continue
            }
            Instruction::PRNTFREEV => {
                debug!("PRNTFREEV");
                writeln!(out, "Free Video Memory: {} bytes", memory.free_video())?;
                Step::Continue
            }
            Instruction::RENDER => {
                debug!("RENDER");

                out.write_all(b"\n---- Output ----\n")?;
                for row in memory.video().chunks(memory.screen_width()) {
                    write_cells(out, row)?;
                    writeln!(out)?;
                }
                out.write_all(b"----------------\n")?;
                Step::Continue
            }
            Instruction::CLR => {
                debug!("CLR");

                // only system memory, the screen is kept
                memory.clear_system();
                writeln!(out, "memory cleared.")?;
                Step::Continue
            }
            Instruction::HALT => {
                self.running = false; // set termination flag

                debug!("HALT");
                Step::Halted
            }
        };

        if let Step::Warning(warning) = step {
            warn!("{}", warning);
        }

        Ok(step)
    }

    /// Runs one execution step: fetch, decode and execute one instruction.
    ///
    /// Faults and warnings are reported through the returned [`Step`]; an
    /// error is only returned if writing to `out` fails.
    pub fn execute<W: Write>(&mut self, memory: &mut AddressSpace, out: &mut W) -> Result<Step> {
        if !self.running {
            return Ok(Step::Halted);
        }

        let decoded = match self.decode(memory) {
            Ok(decoded) => decoded,
            Err(fault) => return Ok(self.raise(fault)),
        };

        self.execute_instruction(decoded, memory, out)
            .wrap_err_with(|| format!("Failed to write output of {}", decoded.instruction))
    }

    /// Run program until it halts or faults
    pub fn execute_until_halt<W: Write>(
        &mut self,
        memory: &mut AddressSpace,
        out: &mut W,
    ) -> Result<RunReport> {
        self.running = true;
        self.executed_instructions = 0;
        self.fault = None;

        let start = Instant::now();
        while self.running {
            self.execute(memory, out)?;
        }

        let report = RunReport {
            executed_instructions: self.executed_instructions,
            elapsed: start.elapsed(),
            fault: self.fault,
        };
        info!("{}", report);

        Ok(report)
    }
}

/// Writes memory cells as characters, zero cells as [`PLACEHOLDER`]
fn write_cells<W: Write>(out: &mut W, cells: &[Byte]) -> io::Result<()> {
    let glyphs: Vec<Byte> = cells
        .iter()
        .map(|&cell| if cell == 0 { PLACEHOLDER } else { cell })
        .collect();
    out.write_all(&glyphs)
}

macro_rules! instructions {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $repr:literal => $arity:literal , )+ ) => {
        /// The instruction set. Each instruction is one opcode byte followed by
        /// a fixed number of operand bytes.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Instruction {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Instruction {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            /// Mnemonic used in `.s8` source
            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name) , )+
                }
            }

            /// Number of operand bytes following the opcode
            pub fn arity(&self) -> usize {
                match self {
                    $( Self::$name => $arity , )+
                }
            }

            /// Looks up a mnemonic. Mnemonics are case sensitive.
            pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
                match mnemonic {
                    $( stringify!($name) => Some(Self::$name) , )+
                    _ => None,
                }
            }
        }

        impl ::std::fmt::Display for Instruction {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( Self::$name => f.write_str(stringify!($name)) , )+
                }
            }
        }
    }
}

instructions! {
    /// No operation
    NOP = 0x00 => 0,
    /// Load a value into a register
    /// @param reg, value
    LOAD = 0x01 => 2,
    /// Add the second register to the first, wrapping
    /// @param reg, reg
    ADD = 0x02 => 2,
    /// Subtract the second register from the first, wrapping
    /// @param reg, reg
    SUB = 0x03 => 2,
    /// Jump to an address
    /// @param address
    JMP = 0x04 => 1,
    /// Jump to an address if register 0 is zero
    /// @param address
    JZ = 0x05 => 1,
    /// Stop the execution of the program
    HALT = 0x06 => 0,
    /// Multiply the first register by the second, wrapping
    /// @param reg, reg
    MUL = 0x07 => 2,
    /// Divide the first register by the second. Does nothing if the divisor is zero
    /// @param reg, reg
    DIV = 0x08 => 2,
    /// Print the character stored at an index of system memory
    /// @param index
    PRNTCH = 0x09 => 1,
    /// Print a register index and its value
    /// @param reg
    PRNTREG = 0x0A => 1,
    /// Print the whole video memory
    PRNTVMEM = 0x0B => 0,
    /// Jump to the first address if the condition is 1, else to the second
    /// @param condition, true address, false address
    IF = 0x0C => 3,
    /// Print the whole system memory
    PRNTMEM = 0x0D => 0,
    /// Store a register at an address of the combined address space
    /// @param reg, address
    STORE = 0x0E => 2,
    /// Print the number of zero bytes in system memory
    PRNTFREE = 0x0F => 0,
    /// Print the number of zero bytes in video memory
    PRNTFREEV = 0x10 => 0,
    /// Print video memory as a grid of screen rows
    RENDER = 0x11 => 0,
    /// Store a register at screen coordinates
    /// @param reg, x, y
    STOREVMEM = 0x12 => 3,
    /// Zero the system memory
    CLR = 0x13 => 0,
}
