use super::addressing::{AddressingMode, Operand};
use super::opcodes::{Instruction, Opcode};
use super::{Cpu, StatusFlags};
use crate::bus::Bus;

type Modify = fn(&mut Cpu, u8) -> u8;

impl Cpu {
    /// Executes a decoded instruction and returns the cycles it adds to the
    /// base count (page crossings, taken branches).
    pub(super) fn execute<B: Bus>(&mut self, opcode: &Opcode, operand: Operand, bus: &mut B) -> u8 {
        use Instruction::*;

        let value = operand.value as u8;
        let mut extra = if opcode.instruction.pays_page_penalty() {
            operand.additional_cycles
        } else {
            0
        };

        match opcode.instruction {
            LDA => {
                self.a = value;
                self.update_for(value);
            }
            LDX => {
                self.x = value;
                self.update_for(value);
            }
            LDY => {
                self.y = value;
                self.update_for(value);
            }
            STA => bus.write_byte(operand.address, self.a),
            STX => bus.write_byte(operand.address, self.x),
            STY => bus.write_byte(operand.address, self.y),

            TAX => {
                self.x = self.a;
                self.update_for(self.x);
            }
            TAY => {
                self.y = self.a;
                self.update_for(self.y);
            }
            TSX => {
                self.x = self.sp;
                self.update_for(self.x);
            }
            TXA => {
                self.a = self.x;
                self.update_for(self.a);
            }
            TXS => self.sp = self.x,
            TYA => {
                self.a = self.y;
                self.update_for(self.a);
            }

            ADC => self.add_with_carry(value),
            SBC => self.subtract_with_borrow(value),
            AND => {
                self.a &= value;
                self.update_for(self.a);
            }
            ORA => {
                self.a |= value;
                self.update_for(self.a);
            }
            EOR => {
                self.a ^= value;
                self.update_for(self.a);
            }
            BIT => {
                self.p.set(StatusFlags::ZERO, self.a & value == 0);
                self.p.set(StatusFlags::OVERFLOW, value & 0x40 != 0);
                self.p.set(StatusFlags::NEGATIVE, value & 0x80 != 0);
            }
            CMP => self.compare(self.a, value),
            CPX => self.compare(self.x, value),
            CPY => self.compare(self.y, value),

            INC => self.modify(opcode.mode, &operand, bus, |cpu, v| {
                let result = v.wrapping_add(1);
                cpu.update_for(result);
                result
            }),
            DEC => self.modify(opcode.mode, &operand, bus, |cpu, v| {
                let result = v.wrapping_sub(1);
                cpu.update_for(result);
                result
            }),
            INX => {
                self.x = self.x.wrapping_add(1);
                self.update_for(self.x);
            }
            INY => {
                self.y = self.y.wrapping_add(1);
                self.update_for(self.y);
            }
            DEX => {
                self.x = self.x.wrapping_sub(1);
                self.update_for(self.x);
            }
            DEY => {
                self.y = self.y.wrapping_sub(1);
                self.update_for(self.y);
            }

            ASL => self.modify(opcode.mode, &operand, bus, |cpu, v| {
                cpu.p.set(StatusFlags::CARRY, v & 0x80 != 0);
                let result = v << 1;
                cpu.update_for(result);
                result
            }),
            LSR => self.modify(opcode.mode, &operand, bus, |cpu, v| {
                cpu.p.set(StatusFlags::CARRY, v & 0x01 != 0);
                let result = v >> 1;
                cpu.update_for(result);
                result
            }),
            ROL => self.modify(opcode.mode, &operand, bus, |cpu, v| {
                let carry_in = cpu.p.contains(StatusFlags::CARRY) as u8;
                cpu.p.set(StatusFlags::CARRY, v & 0x80 != 0);
                let result = (v << 1) | carry_in;
                cpu.update_for(result);
                result
            }),
            ROR => self.modify(opcode.mode, &operand, bus, |cpu, v| {
                let carry_in = (cpu.p.contains(StatusFlags::CARRY) as u8) << 7;
                cpu.p.set(StatusFlags::CARRY, v & 0x01 != 0);
                let result = (v >> 1) | carry_in;
                cpu.update_for(result);
                result
            }),

            BCC => extra = self.branch(!self.p.contains(StatusFlags::CARRY), &operand),
            BCS => extra = self.branch(self.p.contains(StatusFlags::CARRY), &operand),
            BNE => extra = self.branch(!self.p.contains(StatusFlags::ZERO), &operand),
            BEQ => extra = self.branch(self.p.contains(StatusFlags::ZERO), &operand),
            BPL => extra = self.branch(!self.p.contains(StatusFlags::NEGATIVE), &operand),
            BMI => extra = self.branch(self.p.contains(StatusFlags::NEGATIVE), &operand),
            BVC => extra = self.branch(!self.p.contains(StatusFlags::OVERFLOW), &operand),
            BVS => extra = self.branch(self.p.contains(StatusFlags::OVERFLOW), &operand),

            JMP => self.pc = operand.address,
            JSR => {
                self.push_word(bus, self.pc.wrapping_sub(1));
                self.pc = operand.address;
            }
            RTS => self.pc = self.pop_word(bus).wrapping_add(1),
            BRK => {
                // BRK skips the padding byte after the opcode.
                self.push_word(bus, self.pc.wrapping_add(1));
                self.push(bus, (self.p | StatusFlags::BREAK | StatusFlags::UNUSED).bits());
                self.p.insert(StatusFlags::INTERRUPT_DISABLE);
                self.pc = bus.read_word(0xFFFE);
            }
            RTI => {
                let status = self.pop(bus);
                self.set_status(status);
                self.pc = self.pop_word(bus);
            }

            PHA => self.push(bus, self.a),
            PHP => self.push(bus, (self.p | StatusFlags::BREAK | StatusFlags::UNUSED).bits()),
            PLA => {
                self.a = self.pop(bus);
                self.update_for(self.a);
            }
            PLP => {
                let status = self.pop(bus);
                self.set_status(status);
            }

            CLC => self.p.remove(StatusFlags::CARRY),
            CLD => self.p.remove(StatusFlags::DECIMAL),
            CLI => self.p.remove(StatusFlags::INTERRUPT_DISABLE),
            CLV => self.p.remove(StatusFlags::OVERFLOW),
            SEC => self.p.insert(StatusFlags::CARRY),
            SED => self.p.insert(StatusFlags::DECIMAL),
            SEI => self.p.insert(StatusFlags::INTERRUPT_DISABLE),

            NOP => {}
        }

        extra
    }

    fn add_with_carry(&mut self, value: u8) {
        let carry = self.p.contains(StatusFlags::CARRY) as u16;
        let sum = self.a as u16 + value as u16 + carry;
        let result = sum as u8;

        self.p.set(StatusFlags::CARRY, sum > 0xFF);
        self.p.set(
            StatusFlags::OVERFLOW,
            (self.a ^ result) & (value ^ result) & 0x80 != 0,
        );
        self.a = result;
        self.update_for(result);
    }

    fn subtract_with_borrow(&mut self, value: u8) {
        let borrow = !self.p.contains(StatusFlags::CARRY) as u16;
        let difference = (self.a as u16).wrapping_sub(value as u16).wrapping_sub(borrow);
        let result = difference as u8;

        self.p.set(StatusFlags::CARRY, difference < 0x100);
        self.p.set(
            StatusFlags::OVERFLOW,
            (self.a ^ value) & (self.a ^ result) & 0x80 != 0,
        );
        self.a = result;
        self.update_for(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.p.set(StatusFlags::CARRY, register >= value);
        self.update_for(register.wrapping_sub(value));
    }

    fn branch(&mut self, condition: bool, operand: &Operand) -> u8 {
        if !condition {
            return 0;
        }
        self.pc = operand.address;
        1 + operand.additional_cycles
    }

    /// Read-modify-write on the accumulator or on memory.
    fn modify<B: Bus>(&mut self, mode: AddressingMode, operand: &Operand, bus: &mut B, op: Modify) {
        if mode == AddressingMode::Accumulator {
            let a = self.a;
            self.a = op(self, a);
        } else {
            let result = op(self, operand.value as u8);
            bus.write_byte(operand.address, result);
        }
    }
}
