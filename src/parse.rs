use thiserror::Error;

use crate::computer::{MachineError, Program, Registers};

/// Adapter for the canonical two-block text input:
///
/// ```text
/// Register A: 729
/// Register B: 0
/// Register C: 0
///
/// Program: 0,1,5,4,3,0
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing `Register {0}:` line")]
    MissingRegister(char),
    #[error("missing `Program:` line")]
    MissingProgram,
    #[error("unknown register `{0}`")]
    UnknownRegister(String),
    #[error("unrecognized line `{0}`")]
    UnrecognizedLine(String),
    #[error("bad integer: {0}")]
    BadInteger(#[from] std::num::ParseIntError),
    #[error(transparent)]
    BadProgram(#[from] MachineError),
}

pub fn parse_input(text: &str) -> Result<(Registers, Program), ParseError> {
    let mut a = None;
    let mut b = None;
    let mut c = None;
    let mut words = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("Register ") {
            let (name, value) = rest
                .split_once(':')
                .ok_or_else(|| ParseError::UnrecognizedLine(line.to_string()))?;
            let value: u64 = value.trim().parse()?;
            match name.trim() {
                "A" => a = Some(value),
                "B" => b = Some(value),
                "C" => c = Some(value),
                other => return Err(ParseError::UnknownRegister(other.to_string())),
            }
        } else if let Some(rest) = line.strip_prefix("Program:") {
            words = Some(
                rest.split(',')
                    .map(|word| word.trim().parse::<u8>())
                    .collect::<Result<Vec<_>, _>>()?,
            );
        } else {
            return Err(ParseError::UnrecognizedLine(line.to_string()));
        }
    }

    let registers = Registers::new(
        a.ok_or(ParseError::MissingRegister('A'))?,
        b.ok_or(ParseError::MissingRegister('B'))?,
        c.ok_or(ParseError::MissingRegister('C'))?,
    );
    let program = Program::new(words.ok_or(ParseError::MissingProgram)?)?;
    Ok((registers, program))
}
