//! Assembler for `.s8` source.
//!
//! ```text
//! LOAD, 0, 10
//! LOAD, 1, 1
//! MUL, 0, 1
//! HALT
//! ```
//!
//! Tokens are separated by commas or whitespace; line breaks carry no meaning.
//! A token is either a mnemonic or a decimal operand byte. Jump targets are
//! plain byte offsets.

use std::borrow::Cow;
use std::error;
use std::fmt;

use crate::memory::Byte;
use crate::processor::Instruction;

use super::Program;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("program size exceeds maximum limit of {max} bytes")]
    ProgramTooLarge { max: usize },
    #[error("invalid literal")]
    InvalidLiteral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    context: Option<Cow<'static, str>>,
    line_nr: usize,
}

impl ParseError {
    fn new<C, S>(kind: ParseErrorKind, context: C, line_nr: usize) -> Self
    where
        C: Into<Option<S>>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            kind,
            context: context.into().map(|inner| inner.into()),
            line_nr,
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    pub fn line_nr(&self) -> usize {
        self.line_nr
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(
                f,
                "error [ln: {}]: {} - {}",
                self.line_nr, self.kind, context
            )
        } else {
            write!(f, "error [ln: {}]: {}", self.line_nr, self.kind)
        }
    }
}

impl error::Error for ParseError {}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// How operand tokens that are not valid bytes are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralPolicy {
    /// Read an optional sign and the leading decimal digits, truncated to a
    /// byte. Anything else becomes 0.
    Permissive,
    /// Only accept decimal numbers in `0..=255`.
    Strict,
}

impl Default for LiteralPolicy {
    fn default() -> Self {
        Self::Permissive
    }
}

/// Turns `.s8` source into a [`Program`].
///
/// The assembler does not know the arity of instructions, operands are
/// emitted exactly as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Assembler {
    max_program_size: usize,
    literals: LiteralPolicy,
}

impl Assembler {
    pub fn new(max_program_size: usize) -> Self {
        Self {
            max_program_size,
            literals: LiteralPolicy::default(),
        }
    }

    pub fn with_literal_policy(mut self, literals: LiteralPolicy) -> Self {
        self.literals = literals;
        self
    }

    /// Assembles `source`.
    ///
    /// # Errors
    ///
    /// Fails as soon as the program would grow past the size limit, or, with
    /// [`LiteralPolicy::Strict`], on the first invalid operand.
    pub fn assemble(&self, source: &str) -> Result<Program> {
        let mut bytes = Vec::new();

        for (index, line) in source.lines().enumerate() {
            let line_nr = index + 1;

            for token in tokens(line) {
                if bytes.len() >= self.max_program_size {
                    return Err(ParseError::new(
                        ParseErrorKind::ProgramTooLarge {
                            max: self.max_program_size,
                        },
                        format!("`{}` does not fit", token),
                        line_nr,
                    ));
                }

                bytes.push(self.resolve(token, line_nr)?);
            }
        }

        Ok(Program::new(bytes))
    }

    /// Resolves a token to a mnemonic's opcode, or else to an operand byte
    fn resolve(&self, token: &str, line_nr: usize) -> Result<Byte> {
        if let Some(instruction) = Instruction::from_mnemonic(token) {
            log::trace!("[{}] Found instruction {}", line_nr, instruction);
            return Ok(instruction.into());
        }

        match self.literals {
            LiteralPolicy::Permissive => {
                let value = coerce_literal(token);
                if token.parse::<Byte>().is_err() {
                    log::debug!("[{}] Operand `{}` coerced to {}", line_nr, token, value);
                }
                Ok(value)
            }
            LiteralPolicy::Strict => token.parse::<Byte>().map_err(|_| {
                ParseError::new(
                    ParseErrorKind::InvalidLiteral,
                    format!("`{}` is neither an instruction nor a byte", token),
                    line_nr,
                )
            }),
        }
    }
}

fn tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
}

/// Reads an optional sign followed by decimal digits, stopping at the first
/// other character. The result wraps around to fit a byte.
fn coerce_literal(token: &str) -> Byte {
    let (negative, digits) = match token.as_bytes() {
        [b'-', rest @ ..] => (true, rest),
        [b'+', rest @ ..] => (false, rest),
        rest => (false, rest),
    };

    let value = digits
        .iter()
        .take_while(|digit| digit.is_ascii_digit())
        .fold(0 as Byte, |acc, digit| {
            acc.wrapping_mul(10).wrapping_add(digit - b'0')
        });

    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}
