use std::io::Write;

use log::{debug, trace, warn};

use crate::alu::{self, AluOp, AluResult, Flags};
use crate::error::{AccessError, Fault};
use crate::isa::Opcode;
use crate::memory::{Memory, Registers, SP};

/// Value the stack pointer holds when a run begins.
pub const STACK_TOP: u8 = 0xFF;

/// Whether the fetch-decode-execute loop may continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Halted,
}

/// The LS-8 processor.
///
/// Owns the memory, the register file (R7 doubling as the stack pointer), the
/// program counter and the flags register. Each instruction advances the
/// program counter itself; the loop never adds an implicit increment.
///
/// PRN output is written to the sink handed to [`Cpu::step`] / [`Cpu::run`],
/// one decimal value per line.
#[derive(Debug, Clone)]
pub struct Cpu {
    memory: Memory,
    registers: Registers,
    pc: usize,
    flags: Flags,
    status: Status,
    steps: usize,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            memory: Memory::new(),
            registers: Registers::new(),
            pc: 0,
            flags: Flags::empty(),
            status: Status::Running,
            steps: 0,
        }
    }

    /// Place a validated program image at address 0.
    pub fn load(&mut self, image: &[u8]) -> Result<(), AccessError> {
        self.memory.load(image)
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Number of instructions executed so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Run until HLT or a fault. Returns the number of instructions executed.
    pub fn run<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<usize, Fault> {
        self.run_for(out, usize::MAX)
    }

    /// Like [`Cpu::run`], but gives up after `step_limit` instructions. The
    /// processor is left `Running` in that case and a later call resumes
    /// where this one stopped.
    pub fn run_for<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        step_limit: usize,
    ) -> Result<usize, Fault> {
        // The stack pointer is set once, before the first instruction, so a run
        // split across several calls keeps its stack.
        if self.steps == 0 {
            self.registers.set_sp(STACK_TOP);
        }

        let mut steps = 0;
        while self.status == Status::Running && steps < step_limit {
            self.step(out)?;
            steps += 1;
        }
        if self.status == Status::Running {
            debug!("step limit {step_limit} reached at pc {:#04X}", self.pc);
        }
        Ok(steps)
    }

    /// Fetch, decode and execute a single instruction.
    ///
    /// Any fault also moves the processor to [`Status::Halted`].
    pub fn step<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<Status, Fault> {
        if self.status == Status::Halted {
            return Ok(Status::Halted);
        }
        match self.execute(out) {
            Ok(()) => {
                self.steps += 1;
                Ok(self.status)
            }
            Err(fault) => {
                self.status = Status::Halted;
                Err(fault)
            }
        }
    }

    fn execute<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<(), Fault> {
        let ir = self.memory.read(self.pc)?;
        // Pre-fetched unconditionally; reads past the end of memory yield 0.
        let operand_a = self.memory.peek(self.pc + 1);
        let operand_b = self.memory.peek(self.pc + 2);

        let Some(op) = Opcode::decode(ir) else {
            warn!("{ir} is an unknown instruction at pc {:#04X}", self.pc);
            return Err(Fault::UnknownOpcode {
                opcode: ir,
                pc: self.pc,
            });
        };

        trace!(
            "pc={:02X} {} {:02X} {:02X} regs={:?} fl={:03b}",
            self.pc,
            op.mnemonic(),
            operand_a,
            operand_b,
            self.registers.as_slice(),
            self.flags.bits()
        );

        let a = operand_a as usize;
        let b = operand_b as usize;
        match op {
            Opcode::Nop => self.pc += op.size(),
            Opcode::Hlt => {
                debug!("halted at pc {:#04X} after {} steps", self.pc, self.steps + 1);
                self.status = Status::Halted;
            }
            Opcode::Ldi => {
                self.registers.set(a, operand_b)?;
                self.pc += op.size();
            }
            Opcode::Prn => {
                writeln!(out, "{}", self.registers.get(a)?)?;
                self.pc += op.size();
            }
            Opcode::Cmp => {
                self.alu(AluOp::Cmp, a, b)?;
                self.pc += op.size();
            }
            Opcode::Add => {
                self.alu(AluOp::Add, a, b)?;
                self.pc += op.size();
            }
            Opcode::Sub => {
                self.alu(AluOp::Sub, a, b)?;
                self.pc += op.size();
            }
            Opcode::Mul => {
                self.alu(AluOp::Mul, a, b)?;
                self.pc += op.size();
            }
            Opcode::Jmp => self.pc = self.registers.get(a)? as usize,
            Opcode::Jeq => self.jump_if(self.flags.contains(Flags::EQUAL), a, op)?,
            Opcode::Jne => self.jump_if(!self.flags.contains(Flags::EQUAL), a, op)?,
            // R7 is both an operand register and the stack pointer, so the
            // order of register reads and stack pointer updates is observable.
            Opcode::Push => {
                self.registers.get(a)?;
                let sp = self.decrement_sp();
                let value = self.registers.get(a)?;
                self.memory.write(sp as usize, value)?;
                self.pc += op.size();
            }
            Opcode::Pop => {
                self.registers.get(a)?;
                let value = self.memory.read(self.registers.sp() as usize)?;
                self.registers.set(a, value)?;
                self.increment_sp();
                self.pc += op.size();
            }
            Opcode::Call => {
                self.registers.get(a)?;
                let ret = self.pc + op.size();
                let ret = u8::try_from(ret).map_err(|_| AccessError::Memory { address: ret })?;
                let sp = self.decrement_sp();
                self.memory.write(sp as usize, ret)?;
                self.pc = self.registers.get(a)? as usize;
            }
            Opcode::Ret => {
                let ret = self.memory.read(self.registers.sp() as usize)?;
                self.increment_sp();
                self.pc = ret as usize;
            }
        }
        Ok(())
    }

    fn alu(&mut self, op: AluOp, reg_a: usize, reg_b: usize) -> Result<(), AccessError> {
        let a = self.registers.get(reg_a)?;
        let b = self.registers.get(reg_b)?;
        match alu::execute(op, a, b) {
            AluResult::Flags(flags) => self.flags = flags,
            AluResult::Value(value) => self.registers.set(reg_a, value)?,
        }
        Ok(())
    }

    fn jump_if(&mut self, taken: bool, reg: usize, op: Opcode) -> Result<(), AccessError> {
        if taken {
            self.pc = self.registers.get(reg)? as usize;
        } else {
            self.pc += op.size();
        }
        Ok(())
    }

    /// Stack pointer arithmetic wraps in 8 bits, so it always names a valid
    /// cell. There is no underflow check: RET or POP on an empty stack reads
    /// whatever byte sits at the stack pointer.
    fn decrement_sp(&mut self) -> u8 {
        let sp = self.registers.sp().wrapping_sub(1);
        self.registers.set_sp(sp);
        sp
    }

    fn increment_sp(&mut self) {
        let sp = self.registers.sp().wrapping_add(1);
        self.registers.set_sp(sp);
    }

    /// Human-readable summary of the processor state.
    pub fn dump_state(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        let _ = writeln!(out, "--- CPU STATE ---");
        let _ = writeln!(
            out,
            "PC: {:02X} FL: {:03b} Steps: {} Status: {:?}",
            self.pc,
            self.flags.bits(),
            self.steps,
            self.status
        );
        for (i, value) in self.registers.as_slice().iter().enumerate() {
            let tag = if i == SP { " (SP)" } else { "" };
            let _ = writeln!(out, "R{i}: {value:02X}{tag}");
        }
        let _ = writeln!(out, "-----------------");
        out
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const LDI: u8 = Opcode::Ldi.byte();
    const PUSH: u8 = Opcode::Push.byte();
    const POP: u8 = Opcode::Pop.byte();
    const CALL: u8 = Opcode::Call.byte();
    const RET: u8 = Opcode::Ret.byte();

    proptest! {
        #[test]
        fn random_images_never_panic(image in prop::collection::vec(any::<u8>(), 1..=256)) {
            let mut cpu = Cpu::new();
            cpu.load(&image).unwrap();
            let result = cpu.run_for(&mut std::io::sink(), 1024);
            if let Ok(steps) = result {
                prop_assert!(steps <= 1024);
            } else {
                prop_assert_eq!(cpu.status(), Status::Halted);
            }
        }

        #[test]
        fn ldi_sets_any_register(reg in 0u8..8, value in any::<u8>()) {
            let mut cpu = Cpu::new();
            cpu.load(&[LDI, reg, value]).unwrap();
            cpu.step(&mut std::io::sink()).unwrap();
            prop_assert_eq!(cpu.registers().get(reg as usize), Ok(value));
            prop_assert_eq!(cpu.pc(), 3);
        }

        #[test]
        fn push_then_pop_copies(value in any::<u8>(), src in 0u8..7, dst in 0u8..7) {
            prop_assume!(src != dst);
            let mut cpu = Cpu::new();
            cpu.load(&[LDI, src, value, PUSH, src, POP, dst]).unwrap();
            cpu.registers_mut().set_sp(STACK_TOP);
            let sp_before = cpu.registers().sp();
            for _ in 0..3 {
                cpu.step(&mut std::io::sink()).unwrap();
            }
            prop_assert_eq!(cpu.registers().get(dst as usize), Ok(value));
            prop_assert_eq!(cpu.registers().sp(), sp_before);
        }

        #[test]
        fn call_pushes_return_address(target in 0x10u8..=0xF0, at in 0u8..0x0C) {
            // NOP padding, LDI R1 at `at`, then CALL R1.
            let mut cpu = Cpu::new();
            let call_pc = at as usize + 3;
            let mut image = vec![0u8; call_pc + 2];
            image[at as usize..at as usize + 3].copy_from_slice(&[LDI, 1, target]);
            image[call_pc..call_pc + 2].copy_from_slice(&[CALL, 1]);
            cpu.load(&image).unwrap();
            cpu.memory_mut().write(target as usize, RET).unwrap();
            cpu.registers_mut().set_sp(STACK_TOP);

            while cpu.pc() != call_pc {
                cpu.step(&mut std::io::sink()).unwrap();
            }
            cpu.step(&mut std::io::sink()).unwrap();
            prop_assert_eq!(cpu.pc(), target as usize);
            prop_assert_eq!(cpu.memory().read(0xFE), Ok(call_pc as u8 + 2));
            cpu.step(&mut std::io::sink()).unwrap();
            prop_assert_eq!(cpu.pc(), call_pc + 2);
            prop_assert_eq!(cpu.registers().sp(), STACK_TOP);
        }
    }
}
