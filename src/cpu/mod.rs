mod addressing;
mod instructions;
mod opcodes;

use bitflags::bitflags;
use thiserror::Error;

use crate::bus::{Bus, Interrupt};

pub use addressing::{AddressingMode, Alteration, Operand};
pub use opcodes::{disassemble, Instruction, Opcode, OPCODES};

/// NTSC 2A03 clock.
pub const CPU_FREQUENCY: u32 = 1_789_773;

const STACK_PAGE: u16 = 0x0100;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        const CARRY = 0b00000001;
        const ZERO = 0b00000010;
        const INTERRUPT_DISABLE = 0b00000100;
        const DECIMAL = 0b00001000;
        const BREAK = 0b00010000;
        const UNUSED = 0b00100000;
        const OVERFLOW = 0b01000000;
        const NEGATIVE = 0b10000000;
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CpuError {
    #[error("unknown opcode {opcode:02X} at {pc:04X}")]
    UnknownOpcode { opcode: u8, pc: u16 },
}

pub struct Cpu {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub p: StatusFlags,

    stall_cycles: u16,
    interrupt: Option<Interrupt>,
    cycles: u64,
}

impl Cpu {
    pub fn new() -> Self {
        Cpu {
            a: 0,
            x: 0,
            y: 0,
            sp: 0,
            pc: 0,
            p: StatusFlags::UNUSED | StatusFlags::INTERRUPT_DISABLE,
            stall_cycles: 0,
            interrupt: None,
            cycles: 0,
        }
    }

    /// Schedules a Reset; the vector is loaded on the next `step`.
    pub fn reset(&mut self) {
        self.stall_cycles = 0;
        self.interrupt = None;
        self.trigger_interrupt(Interrupt::Reset);
    }

    pub fn trigger_interrupt(&mut self, kind: Interrupt) {
        self.interrupt = Some(Interrupt::merge(self.interrupt, kind));
    }

    pub fn block(&mut self, cycles: u16) {
        self.stall_cycles = self.stall_cycles.saturating_add(cycles);
    }

    pub fn stall_cycles(&self) -> u16 {
        self.stall_cycles
    }

    pub fn pending_interrupt(&self) -> Option<Interrupt> {
        self.interrupt
    }

    /// Cycles executed since power-on, stalls included.
    pub fn total_cycles(&self) -> u64 {
        self.cycles
    }

    /// Status byte with bit 5 set.
    pub fn status(&self) -> u8 {
        (self.p | StatusFlags::UNUSED).bits()
    }

    /// Runs one instruction, one interrupt sequence, or one stalled cycle and
    /// returns the cycles it took.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> Result<u8, CpuError> {
        if self.stall_cycles > 0 {
            self.stall_cycles -= 1;
            self.cycles += 1;
            return Ok(1);
        }

        match self.interrupt.take() {
            Some(Interrupt::Irq) if self.p.contains(StatusFlags::INTERRUPT_DISABLE) => {}
            Some(kind) => {
                self.service_interrupt(kind, bus);
                self.cycles += 7;
                return Ok(7);
            }
            None => {}
        }

        let pc = self.pc;
        let code = bus.read_byte(pc);
        // An unknown opcode leaves pc on the offending byte.
        let opcode = OPCODES[code as usize].ok_or(CpuError::UnknownOpcode { opcode: code, pc })?;
        self.pc = pc.wrapping_add(1);
        log::trace!(
            "{:04X}  {:02X}  {:<4} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            pc,
            code,
            opcode.mnemonic,
            self.a,
            self.x,
            self.y,
            self.status(),
            self.sp,
            self.cycles
        );

        let operand = self.evaluate(opcode.mode, !opcode.instruction.is_store(), bus);
        let cycles = opcode.cycles + self.execute(&opcode, operand, bus);
        self.cycles += cycles as u64;
        Ok(cycles)
    }

    fn service_interrupt<B: Bus>(&mut self, kind: Interrupt, bus: &mut B) {
        if kind == Interrupt::Reset {
            // The reset sequence runs the stack cycles with writes suppressed.
            self.sp = self.sp.wrapping_sub(3);
        } else {
            self.push_word(bus, self.pc);
            let status = (self.p - StatusFlags::BREAK) | StatusFlags::UNUSED;
            self.push(bus, status.bits());
        }
        self.p.insert(StatusFlags::INTERRUPT_DISABLE);
        self.pc = bus.read_word(kind.vector());
        log::debug!("{:?} -> {:04X}", kind, self.pc);
    }

    fn update_for(&mut self, value: u8) {
        self.p.set(StatusFlags::ZERO, value == 0);
        self.p.set(StatusFlags::NEGATIVE, value & 0x80 != 0);
    }

    /// Status pulled from the stack: bit 5 forced, Break dropped.
    fn set_status(&mut self, value: u8) {
        self.p = (StatusFlags::from_bits_retain(value) - StatusFlags::BREAK) | StatusFlags::UNUSED;
    }

    fn push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        bus.write_byte(STACK_PAGE | self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop<B: Bus>(&mut self, bus: &mut B) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read_byte(STACK_PAGE | self.sp as u16)
    }

    fn push_word<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    fn pop_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.pop(bus) as u16;
        let hi = self.pop(bus) as u16;
        (hi << 8) | lo
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
