//! The LS-8 instruction set: opcode encoding, instruction lengths and a
//! disassembler.

use std::fmt::Write;

/// Every opcode the processor understands.
///
/// The two high bits of an opcode give the number of operand bytes, which is
/// where [`Opcode::size`] comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0b0000_0000,
    Hlt = 0b0000_0001,
    Ret = 0b0001_0001,
    Push = 0b0100_0101,
    Pop = 0b0100_0110,
    Prn = 0b0100_0111,
    Call = 0b0101_0000,
    Jmp = 0b0101_0100,
    Jeq = 0b0101_0101,
    Jne = 0b0101_0110,
    Ldi = 0b1000_0010,
    Add = 0b1010_0000,
    Sub = 0b1010_0001,
    Mul = 0b1010_0010,
    Cmp = 0b1010_0111,
}

/// What an operand byte means, for display purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    Register,
    Immediate,
}

impl Opcode {
    pub const ALL: [Opcode; 15] = [
        Opcode::Nop,
        Opcode::Hlt,
        Opcode::Ret,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Prn,
        Opcode::Call,
        Opcode::Jmp,
        Opcode::Jeq,
        Opcode::Jne,
        Opcode::Ldi,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Cmp,
    ];

    pub fn decode(byte: u8) -> Option<Opcode> {
        Self::ALL.into_iter().find(|op| *op as u8 == byte)
    }

    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Instruction length in bytes, opcode included.
    pub fn size(self) -> usize {
        1 + (self.byte() >> 6) as usize
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Hlt => "HLT",
            Opcode::Ret => "RET",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Prn => "PRN",
            Opcode::Call => "CALL",
            Opcode::Jmp => "JMP",
            Opcode::Jeq => "JEQ",
            Opcode::Jne => "JNE",
            Opcode::Ldi => "LDI",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Cmp => "CMP",
        }
    }

    fn operands(self) -> &'static [Operand] {
        match self {
            Opcode::Nop | Opcode::Hlt | Opcode::Ret => &[],
            Opcode::Push
            | Opcode::Pop
            | Opcode::Prn
            | Opcode::Call
            | Opcode::Jmp
            | Opcode::Jeq
            | Opcode::Jne => &[Operand::Register],
            Opcode::Ldi => &[Operand::Register, Operand::Immediate],
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Cmp => {
                &[Operand::Register, Operand::Register]
            }
        }
    }
}

/// Pretty-print a disassembly of a memory image for human inspection.
pub fn disassemble(image: &[u8]) -> String {
    let mut out = String::new();
    let mut addr = 0;
    while addr < image.len() {
        let byte = image[addr];
        let Some(op) = Opcode::decode(byte) else {
            let _ = writeln!(out, "{addr:02X}: {byte:02X}        ???");
            addr += 1;
            continue;
        };
        if addr + op.size() > image.len() {
            break;
        }

        let bytes = &image[addr..addr + op.size()];
        let hex = bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ");
        let operands = op
            .operands()
            .iter()
            .zip(&bytes[1..])
            .map(|(kind, value)| match kind {
                Operand::Register => format!("R{value}"),
                Operand::Immediate => format!("{value}"),
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mnemonic = op.mnemonic();
        if operands.is_empty() {
            let _ = writeln!(out, "{addr:02X}: {hex:<9} {mnemonic}");
        } else {
            let _ = writeln!(out, "{addr:02X}: {hex:<9} {mnemonic} {operands}");
        }
        addr += op.size();
    }
    for (i, &byte) in image.iter().enumerate().skip(addr) {
        let _ = writeln!(out, "{i:02X}: {byte:02X}        (trailing)");
    }
    out
}
