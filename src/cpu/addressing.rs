use super::Cpu;
use crate::bus::Bus;

/// Index register added to the base address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alteration {
    None,
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Immediate,
    Relative,
    Implied,
    Accumulator,
    ZeroPage(Alteration),
    /// The flag is false for stores and jumps, which must not read the target.
    Absolute(Alteration, bool),
    Indirect(Alteration),
}

impl AddressingMode {
    /// Instruction length in bytes, opcode included.
    pub fn size(self) -> u16 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 1,
            AddressingMode::Absolute(..) | AddressingMode::Indirect(Alteration::None) => 3,
            _ => 2,
        }
    }
}

/// Result of evaluating an addressing mode for one instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Operand {
    pub value: u16,
    pub address: u16,
    pub additional_cycles: u8,
}

fn page_crossed(a: u16, b: u16) -> bool {
    (a & 0xFF00) != (b & 0xFF00)
}

impl Cpu {
    fn alteration(&self, alteration: Alteration) -> u8 {
        match alteration {
            Alteration::None => 0,
            Alteration::X => self.x,
            Alteration::Y => self.y,
        }
    }

    fn fetch_byte<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = bus.read_byte(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let value = bus.read_word(self.pc);
        self.pc = self.pc.wrapping_add(2);
        value
    }

    /// Consumes the operand bytes after the opcode and resolves the effective
    /// address. `load` is false for store instructions so that their target is
    /// never read.
    pub(super) fn evaluate<B: Bus>(&mut self, mode: AddressingMode, load: bool, bus: &mut B) -> Operand {
        match mode {
            AddressingMode::Implied | AddressingMode::Accumulator => Operand::default(),
            AddressingMode::Immediate => {
                let address = self.pc;
                let value = self.fetch_byte(bus);
                Operand {
                    value: value as u16,
                    address,
                    additional_cycles: 0,
                }
            }
            AddressingMode::Relative => {
                let offset = self.fetch_byte(bus);
                let address = self.pc.wrapping_add(offset as i8 as u16);
                Operand {
                    value: offset as u16,
                    address,
                    additional_cycles: page_crossed(self.pc, address) as u8,
                }
            }
            AddressingMode::ZeroPage(alteration) => {
                let address = self.fetch_byte(bus).wrapping_add(self.alteration(alteration)) as u16;
                Operand {
                    value: if load { bus.read_byte(address) as u16 } else { 0 },
                    address,
                    additional_cycles: 0,
                }
            }
            AddressingMode::Absolute(alteration, fetch) => {
                let base = self.fetch_word(bus);
                let address = base.wrapping_add(self.alteration(alteration) as u16);
                let crossed = alteration != Alteration::None && page_crossed(base, address);
                Operand {
                    value: if fetch && load { bus.read_byte(address) as u16 } else { 0 },
                    address,
                    additional_cycles: crossed as u8,
                }
            }
            AddressingMode::Indirect(Alteration::None) => {
                let pointer = self.fetch_word(bus);
                Operand {
                    value: 0,
                    address: bus.read_word_glitched(pointer),
                    additional_cycles: 0,
                }
            }
            AddressingMode::Indirect(Alteration::X) => {
                let pointer = self.fetch_byte(bus).wrapping_add(self.x);
                let address = bus.read_word_glitched(pointer as u16);
                Operand {
                    value: if load { bus.read_byte(address) as u16 } else { 0 },
                    address,
                    additional_cycles: 0,
                }
            }
            AddressingMode::Indirect(Alteration::Y) => {
                let pointer = self.fetch_byte(bus);
                let base = bus.read_word_glitched(pointer as u16);
                let address = base.wrapping_add(self.y as u16);
                Operand {
                    value: if load { bus.read_byte(address) as u16 } else { 0 },
                    address,
                    additional_cycles: page_crossed(base, address) as u8,
                }
            }
        }
    }
}
