use std::fmt;

use log::trace;
use thiserror::Error;

/// The chronospatial computer: a three-register machine over 3-bit code.
///
/// A program is a flat sequence of 3-bit words read in pairs as
/// (opcode, operand). The instruction pointer starts at 0 and advances by
/// 2 after every instruction except a taken jump, which sets it to the
/// operand directly. Running off the end of the program is the normal way
/// to halt.
///
/// Opcodes:
///
/// | code | name | effect                                   |
/// |------|------|------------------------------------------|
/// | 0    | adv  | A = A >> combo(operand)                  |
/// | 1    | bxl  | B = B XOR operand (literal)              |
/// | 2    | bst  | B = combo(operand) mod 8                 |
/// | 3    | jnz  | if A != 0: ip = operand (literal)        |
/// | 4    | bxc  | B = B XOR C (operand ignored)            |
/// | 5    | out  | emit combo(operand) mod 8                |
/// | 6    | bdv  | B = A >> combo(operand)                  |
/// | 7    | cdv  | C = A >> combo(operand)                  |
///
/// A "combo" operand resolves 0-3 to itself, 4-6 to the live value of
/// register A, B or C, and 7 to nothing: 7 is reserved and any attempt to
/// combo-resolve it is a hard error, never silently treated as zero.
pub struct Machine<'a> {
    program: &'a Program,
    regs: Registers,
    ip: usize,
    out: Vec<u8>,
}

/// Everything that can go wrong while building or running a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MachineError {
    /// Code word outside [0, 8) handed to `Program::new`.
    #[error("code word {0} does not fit in 3 bits")]
    InvalidWord(u8),
    /// Operand 7 in a position requiring combo resolution.
    #[error("operand 7 is reserved and has no combo value")]
    ReservedCombo,
    /// The opcode was readable but its operand lies past the end of the
    /// program. Only reachable for odd-length programs.
    #[error("instruction at index {ip} is missing its operand")]
    TruncatedInstruction { ip: usize },
    /// A taken jump whose target is not a valid program index. Falling off
    /// the end by normal advancement is a halt, not an error; an explicit
    /// jump outside the program is ill-formed.
    #[error("jump to {target} lands outside the {len}-word program")]
    JumpOutOfRange { target: usize, len: usize },
}

/// The three named registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    A,
    B,
    C,
}

/// Register file. Values are 64-bit: the quine search needs 3 bits of A
/// per emitted word, so anything up to 21-word programs fits with room to
/// spare, and the solver checks that bound before it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers {
    pub a: u64,
    pub b: u64,
    pub c: u64,
}

impl Registers {
    pub fn new(a: u64, b: u64, c: u64) -> Self {
        Registers { a, b, c }
    }

    pub fn get(&self, register: Register) -> u64 {
        match register {
            Register::A => self.a,
            Register::B => self.b,
            Register::C => self.c,
        }
    }

    pub fn set(&mut self, register: Register, value: u64) {
        match register {
            Register::A => self.a = value,
            Register::B => self.b = value,
            Register::C => self.c = value,
        }
    }

    fn combo(&self, operand: u8) -> Result<u64, MachineError> {
        match operand {
            0..=3 => Ok(u64::from(operand)),
            4 => Ok(self.get(Register::A)),
            5 => Ok(self.get(Register::B)),
            6 => Ok(self.get(Register::C)),
            _ => Err(MachineError::ReservedCombo),
        }
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A={} B={} C={}", self.a, self.b, self.c)
    }
}

/// A validated, immutable sequence of 3-bit code words.
///
/// Word range is checked at construction. Even length is NOT: a truncated
/// final pair is only an error if execution actually reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    words: Vec<u8>,
}

impl Program {
    pub fn new(words: Vec<u8>) -> Result<Self, MachineError> {
        if let Some(&word) = words.iter().find(|&&w| w > 7) {
            return Err(MachineError::InvalidWord(word));
        }
        Ok(Program { words })
    }

    pub fn words(&self) -> &[u8] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Pretty-print the program one instruction per line for human
    /// inspection.
    pub fn disassemble(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        let mut ip = 0;
        while ip + 1 < self.words.len() {
            let opcode = Opcode::decode(self.words[ip]);
            let operand = self.words[ip + 1];
            let _ = writeln!(out, "{ip:04}: {}", render_instruction(opcode, operand));
            ip += 2;
        }
        // A trailing word without an operand.
        if ip < self.words.len() {
            let _ = writeln!(out, "{ip:04}: {} (trailing)", self.words[ip]);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Adv,
    Bxl,
    Bst,
    Jnz,
    Bxc,
    Out,
    Bdv,
    Cdv,
}

impl Opcode {
    /// Total over the 3-bit word range `Program::new` guarantees.
    fn decode(word: u8) -> Opcode {
        match word {
            0 => Opcode::Adv,
            1 => Opcode::Bxl,
            2 => Opcode::Bst,
            3 => Opcode::Jnz,
            4 => Opcode::Bxc,
            5 => Opcode::Out,
            6 => Opcode::Bdv,
            7 => Opcode::Cdv,
            _ => unreachable!("code words are 3 bits"),
        }
    }
}

fn render_instruction(opcode: Opcode, operand: u8) -> String {
    let combo = |operand: u8| match operand {
        0..=3 => operand.to_string(),
        4 => "A".to_string(),
        5 => "B".to_string(),
        6 => "C".to_string(),
        _ => "<reserved>".to_string(),
    };
    match opcode {
        Opcode::Adv => format!("adv {}", combo(operand)),
        Opcode::Bxl => format!("bxl {operand}"),
        Opcode::Bst => format!("bst {}", combo(operand)),
        Opcode::Jnz => format!("jnz {operand}"),
        Opcode::Bxc => "bxc".to_string(),
        Opcode::Out => format!("out {}", combo(operand)),
        Opcode::Bdv => format!("bdv {}", combo(operand)),
        Opcode::Cdv => format!("cdv {}", combo(operand)),
    }
}

/// What a single fetch-decode-execute cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// An instruction ran without emitting anything.
    Continue,
    /// An `out` instruction ran; the value is also appended to the
    /// machine's output buffer.
    Output(u8),
    /// The instruction pointer ran off the end of the program.
    Halt,
}

/// A combo value can be a full register, far wider than the shift width;
/// everything shifts out to zero rather than wrapping.
fn div_pow2(x: u64, exp: u64) -> u64 {
    if exp >= u64::BITS as u64 { 0 } else { x >> exp }
}

impl<'a> Machine<'a> {
    pub fn new(program: &'a Program, registers: Registers) -> Self {
        Machine {
            program,
            regs: registers,
            ip: 0,
            out: Vec::new(),
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn output(&self) -> &[u8] {
        &self.out
    }

    pub fn into_output(self) -> Vec<u8> {
        self.out
    }

    /// Execute one instruction.
    pub fn step(&mut self) -> Result<Step, MachineError> {
        let words = self.program.words();
        if self.ip >= words.len() {
            return Ok(Step::Halt);
        }
        if self.ip + 1 >= words.len() {
            return Err(MachineError::TruncatedInstruction { ip: self.ip });
        }

        let opcode = Opcode::decode(words[self.ip]);
        let operand = words[self.ip + 1];
        trace!("{:04}: {:<8} {}", self.ip, render_instruction(opcode, operand), self.regs);

        let mut next_ip = self.ip + 2;
        let mut emitted = None;
        match opcode {
            Opcode::Adv => self.regs.a = div_pow2(self.regs.a, self.regs.combo(operand)?),
            Opcode::Bxl => self.regs.b ^= u64::from(operand),
            Opcode::Bst => self.regs.b = self.regs.combo(operand)? % 8,
            Opcode::Jnz => {
                if self.regs.a != 0 {
                    let target = operand as usize;
                    if target >= words.len() {
                        return Err(MachineError::JumpOutOfRange {
                            target,
                            len: words.len(),
                        });
                    }
                    next_ip = target;
                }
            }
            Opcode::Bxc => self.regs.b ^= self.regs.c,
            Opcode::Out => {
                let value = (self.regs.combo(operand)? % 8) as u8;
                self.out.push(value);
                emitted = Some(value);
            }
            Opcode::Bdv => self.regs.b = div_pow2(self.regs.a, self.regs.combo(operand)?),
            Opcode::Cdv => self.regs.c = div_pow2(self.regs.a, self.regs.combo(operand)?),
        }

        self.ip = next_ip;
        Ok(match emitted {
            Some(value) => Step::Output(value),
            None => Step::Continue,
        })
    }

    /// Run until the machine halts.
    ///
    /// There is no step limit: the machine makes no termination promise for
    /// arbitrary programs. Callers that need a bound drive `step` themselves.
    pub fn run(&mut self) -> Result<(), MachineError> {
        loop {
            if let Step::Halt = self.step()? {
                return Ok(());
            }
        }
    }
}

/// Run `program` from the given register state and return everything it
/// emitted.
pub fn execute(registers: Registers, program: &Program) -> Result<Vec<u8>, MachineError> {
    let mut machine = Machine::new(program, registers);
    machine.run()?;
    Ok(machine.into_output())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_program() -> impl Strategy<Value = Program> {
        prop::collection::vec(0u8..8, 0..64).prop_map(|words| Program::new(words).unwrap())
    }

    proptest! {
        #[test]
        fn emitted_values_fit_in_3_bits(
            prog in arb_program(),
            a in any::<u64>(),
            b in any::<u64>(),
            c in any::<u64>(),
        ) {
            // Arbitrary programs may loop forever, so drive the machine
            // with an explicit bound instead of `run`.
            let mut machine = Machine::new(&prog, Registers::new(a, b, c));
            for _ in 0..256 {
                match machine.step() {
                    Ok(Step::Output(value)) => prop_assert!(value < 8),
                    Ok(Step::Halt) | Err(_) => break,
                    Ok(Step::Continue) => {}
                }
            }
        }

        #[test]
        fn jump_free_programs_halt(words in prop::collection::vec(0u8..8, 0..32)) {
            // Rewrite every jnz into a bxc; everything else advances the ip
            // by 2, so the machine must halt within len/2 instructions.
            let words: Vec<u8> = words
                .iter()
                .enumerate()
                .map(|(i, &w)| if i % 2 == 0 && w == 3 { 4 } else { w })
                .collect();
            let bound = words.len() / 2 + 1;
            let prog = Program::new(words).unwrap();
            let mut machine = Machine::new(&prog, Registers::new(1, 2, 3));
            let mut steps = 0;
            loop {
                match machine.step() {
                    Ok(Step::Halt) | Err(_) => break,
                    Ok(_) => steps += 1,
                }
                prop_assert!(steps <= bound);
            }
        }

        #[test]
        fn adv_matches_shift(a in any::<u64>(), exp in 0u8..4) {
            let prog = Program::new(vec![0, exp]).unwrap();
            let mut machine = Machine::new(&prog, Registers::new(a, 0, 0));
            machine.run().unwrap();
            prop_assert_eq!(machine.registers().a, a >> exp);
        }
    }
}
