use super::addressing::{AddressingMode, Alteration};

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC,
    CLD, CLI, CLV, CMP, CPX, CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP,
    JSR, LDA, LDX, LDY, LSR, NOP, ORA, PHA, PHP, PLA, PLP, ROL, ROR, RTI,
    RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,
}

impl Instruction {
    pub fn is_store(self) -> bool {
        matches!(self, Instruction::STA | Instruction::STX | Instruction::STY)
    }

    /// Read instructions take one more cycle when indexing crosses a page.
    /// Stores and read-modify-write ops always pay it, so their table
    /// cycle count already includes it.
    pub fn pays_page_penalty(self) -> bool {
        use Instruction::*;
        matches!(
            self,
            ADC | AND | CMP | EOR | LDA | LDX | LDY | ORA | SBC
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub instruction: Instruction,
    pub mnemonic: &'static str,
    pub cycles: u8,
    pub mode: AddressingMode,
}

const IMP: AddressingMode = AddressingMode::Implied;
const ACC: AddressingMode = AddressingMode::Accumulator;
const IMM: AddressingMode = AddressingMode::Immediate;
const REL: AddressingMode = AddressingMode::Relative;
const ZP: AddressingMode = AddressingMode::ZeroPage(Alteration::None);
const ZPX: AddressingMode = AddressingMode::ZeroPage(Alteration::X);
const ZPY: AddressingMode = AddressingMode::ZeroPage(Alteration::Y);
const ABS: AddressingMode = AddressingMode::Absolute(Alteration::None, true);
const ABX: AddressingMode = AddressingMode::Absolute(Alteration::X, true);
const ABY: AddressingMode = AddressingMode::Absolute(Alteration::Y, true);
// stores and jumps
const ABS_W: AddressingMode = AddressingMode::Absolute(Alteration::None, false);
const ABX_W: AddressingMode = AddressingMode::Absolute(Alteration::X, false);
const ABY_W: AddressingMode = AddressingMode::Absolute(Alteration::Y, false);
const IND: AddressingMode = AddressingMode::Indirect(Alteration::None);
const IZX: AddressingMode = AddressingMode::Indirect(Alteration::X);
const IZY: AddressingMode = AddressingMode::Indirect(Alteration::Y);

macro_rules! op {
    ($name:ident, $cycles:expr, $mode:expr) => {
        Some(Opcode {
            instruction: Instruction::$name,
            mnemonic: stringify!($name),
            cycles: $cycles,
            mode: $mode,
        })
    };
}

/// The documented 6502 instruction set. Unlisted bytes are illegal opcodes.
pub static OPCODES: [Option<Opcode>; 256] = build_table();

const fn build_table() -> [Option<Opcode>; 256] {
    let mut t: [Option<Opcode>; 256] = [None; 256];

    t[0x69] = op!(ADC, 2, IMM);
    t[0x65] = op!(ADC, 3, ZP);
    t[0x75] = op!(ADC, 4, ZPX);
    t[0x6D] = op!(ADC, 4, ABS);
    t[0x7D] = op!(ADC, 4, ABX);
    t[0x79] = op!(ADC, 4, ABY);
    t[0x61] = op!(ADC, 6, IZX);
    t[0x71] = op!(ADC, 5, IZY);

    t[0x29] = op!(AND, 2, IMM);
    t[0x25] = op!(AND, 3, ZP);
    t[0x35] = op!(AND, 4, ZPX);
    t[0x2D] = op!(AND, 4, ABS);
    t[0x3D] = op!(AND, 4, ABX);
    t[0x39] = op!(AND, 4, ABY);
    t[0x21] = op!(AND, 6, IZX);
    t[0x31] = op!(AND, 5, IZY);

    t[0x0A] = op!(ASL, 2, ACC);
    t[0x06] = op!(ASL, 5, ZP);
    t[0x16] = op!(ASL, 6, ZPX);
    t[0x0E] = op!(ASL, 6, ABS);
    t[0x1E] = op!(ASL, 7, ABX);

    t[0x90] = op!(BCC, 2, REL);
    t[0xB0] = op!(BCS, 2, REL);
    t[0xF0] = op!(BEQ, 2, REL);
    t[0x30] = op!(BMI, 2, REL);
    t[0xD0] = op!(BNE, 2, REL);
    t[0x10] = op!(BPL, 2, REL);
    t[0x50] = op!(BVC, 2, REL);
    t[0x70] = op!(BVS, 2, REL);

    t[0x24] = op!(BIT, 3, ZP);
    t[0x2C] = op!(BIT, 4, ABS);

    t[0x00] = op!(BRK, 7, IMP);

    t[0x18] = op!(CLC, 2, IMP);
    t[0xD8] = op!(CLD, 2, IMP);
    t[0x58] = op!(CLI, 2, IMP);
    t[0xB8] = op!(CLV, 2, IMP);

    t[0xC9] = op!(CMP, 2, IMM);
    t[0xC5] = op!(CMP, 3, ZP);
    t[0xD5] = op!(CMP, 4, ZPX);
    t[0xCD] = op!(CMP, 4, ABS);
    t[0xDD] = op!(CMP, 4, ABX);
    t[0xD9] = op!(CMP, 4, ABY);
    t[0xC1] = op!(CMP, 6, IZX);
    t[0xD1] = op!(CMP, 5, IZY);

    t[0xE0] = op!(CPX, 2, IMM);
    t[0xE4] = op!(CPX, 3, ZP);
    t[0xEC] = op!(CPX, 4, ABS);

    t[0xC0] = op!(CPY, 2, IMM);
    t[0xC4] = op!(CPY, 3, ZP);
    t[0xCC] = op!(CPY, 4, ABS);

    t[0xC6] = op!(DEC, 5, ZP);
    t[0xD6] = op!(DEC, 6, ZPX);
    t[0xCE] = op!(DEC, 6, ABS);
    t[0xDE] = op!(DEC, 7, ABX);

    t[0xCA] = op!(DEX, 2, IMP);
    t[0x88] = op!(DEY, 2, IMP);

    t[0x49] = op!(EOR, 2, IMM);
    t[0x45] = op!(EOR, 3, ZP);
    t[0x55] = op!(EOR, 4, ZPX);
    t[0x4D] = op!(EOR, 4, ABS);
    t[0x5D] = op!(EOR, 4, ABX);
    t[0x59] = op!(EOR, 4, ABY);
    t[0x41] = op!(EOR, 6, IZX);
    t[0x51] = op!(EOR, 5, IZY);

    t[0xE6] = op!(INC, 5, ZP);
    t[0xF6] = op!(INC, 6, ZPX);
    t[0xEE] = op!(INC, 6, ABS);
    t[0xFE] = op!(INC, 7, ABX);

    t[0xE8] = op!(INX, 2, IMP);
    t[0xC8] = op!(INY, 2, IMP);

    t[0x4C] = op!(JMP, 3, ABS_W);
    t[0x6C] = op!(JMP, 5, IND);
    t[0x20] = op!(JSR, 6, ABS_W);

    t[0xA9] = op!(LDA, 2, IMM);
    t[0xA5] = op!(LDA, 3, ZP);
    t[0xB5] = op!(LDA, 4, ZPX);
    t[0xAD] = op!(LDA, 4, ABS);
    t[0xBD] = op!(LDA, 4, ABX);
    t[0xB9] = op!(LDA, 4, ABY);
    t[0xA1] = op!(LDA, 6, IZX);
    t[0xB1] = op!(LDA, 5, IZY);

    t[0xA2] = op!(LDX, 2, IMM);
    t[0xA6] = op!(LDX, 3, ZP);
    t[0xB6] = op!(LDX, 4, ZPY);
    t[0xAE] = op!(LDX, 4, ABS);
    t[0xBE] = op!(LDX, 4, ABY);

    t[0xA0] = op!(LDY, 2, IMM);
    t[0xA4] = op!(LDY, 3, ZP);
    t[0xB4] = op!(LDY, 4, ZPX);
    t[0xAC] = op!(LDY, 4, ABS);
    t[0xBC] = op!(LDY, 4, ABX);

    t[0x4A] = op!(LSR, 2, ACC);
    t[0x46] = op!(LSR, 5, ZP);
    t[0x56] = op!(LSR, 6, ZPX);
    t[0x4E] = op!(LSR, 6, ABS);
    t[0x5E] = op!(LSR, 7, ABX);

    t[0xEA] = op!(NOP, 2, IMP);

    t[0x09] = op!(ORA, 2, IMM);
    t[0x05] = op!(ORA, 3, ZP);
    t[0x15] = op!(ORA, 4, ZPX);
    t[0x0D] = op!(ORA, 4, ABS);
    t[0x1D] = op!(ORA, 4, ABX);
    t[0x19] = op!(ORA, 4, ABY);
    t[0x01] = op!(ORA, 6, IZX);
    t[0x11] = op!(ORA, 5, IZY);

    t[0x48] = op!(PHA, 3, IMP);
    t[0x08] = op!(PHP, 3, IMP);
    t[0x68] = op!(PLA, 4, IMP);
    t[0x28] = op!(PLP, 4, IMP);

    t[0x2A] = op!(ROL, 2, ACC);
    t[0x26] = op!(ROL, 5, ZP);
    t[0x36] = op!(ROL, 6, ZPX);
    t[0x2E] = op!(ROL, 6, ABS);
    t[0x3E] = op!(ROL, 7, ABX);

    t[0x6A] = op!(ROR, 2, ACC);
    t[0x66] = op!(ROR, 5, ZP);
    t[0x76] = op!(ROR, 6, ZPX);
    t[0x6E] = op!(ROR, 6, ABS);
    t[0x7E] = op!(ROR, 7, ABX);

    t[0x40] = op!(RTI, 6, IMP);
    t[0x60] = op!(RTS, 6, IMP);

    t[0xE9] = op!(SBC, 2, IMM);
    t[0xE5] = op!(SBC, 3, ZP);
    t[0xF5] = op!(SBC, 4, ZPX);
    t[0xED] = op!(SBC, 4, ABS);
    t[0xFD] = op!(SBC, 4, ABX);
    t[0xF9] = op!(SBC, 4, ABY);
    t[0xE1] = op!(SBC, 6, IZX);
    t[0xF1] = op!(SBC, 5, IZY);

    t[0x38] = op!(SEC, 2, IMP);
    t[0xF8] = op!(SED, 2, IMP);
    t[0x78] = op!(SEI, 2, IMP);

    t[0x85] = op!(STA, 3, ZP);
    t[0x95] = op!(STA, 4, ZPX);
    t[0x8D] = op!(STA, 4, ABS_W);
    t[0x9D] = op!(STA, 5, ABX_W);
    t[0x99] = op!(STA, 5, ABY_W);
    t[0x81] = op!(STA, 6, IZX);
    t[0x91] = op!(STA, 6, IZY);

    t[0x86] = op!(STX, 3, ZP);
    t[0x96] = op!(STX, 4, ZPY);
    t[0x8E] = op!(STX, 4, ABS_W);

    t[0x84] = op!(STY, 3, ZP);
    t[0x94] = op!(STY, 4, ZPX);
    t[0x8C] = op!(STY, 4, ABS_W);

    t[0xAA] = op!(TAX, 2, IMP);
    t[0xA8] = op!(TAY, 2, IMP);
    t[0xBA] = op!(TSX, 2, IMP);
    t[0x8A] = op!(TXA, 2, IMP);
    t[0x9A] = op!(TXS, 2, IMP);
    t[0x98] = op!(TYA, 2, IMP);

    t
}

/// Renders the instruction starting at `address`, e.g. `LDA $0200,X`.
/// `peek` must not have side effects.
pub fn disassemble(address: u16, mut peek: impl FnMut(u16) -> u8) -> String {
    let code = peek(address);
    let opcode = match OPCODES[code as usize] {
        Some(opcode) => opcode,
        None => return format!(".db ${:02X}", code),
    };

    let lo = peek(address.wrapping_add(1));
    let hi = peek(address.wrapping_add(2));
    let word = u16::from_le_bytes([lo, hi]);

    let operand = match opcode.mode {
        AddressingMode::Implied => String::new(),
        AddressingMode::Accumulator => "A".to_string(),
        AddressingMode::Immediate => format!("#${:02X}", lo),
        AddressingMode::Relative => {
            let target = address.wrapping_add(2).wrapping_add(lo as i8 as u16);
            format!("${:04X}", target)
        }
        AddressingMode::ZeroPage(Alteration::None) => format!("${:02X}", lo),
        AddressingMode::ZeroPage(Alteration::X) => format!("${:02X},X", lo),
        AddressingMode::ZeroPage(Alteration::Y) => format!("${:02X},Y", lo),
        AddressingMode::Absolute(Alteration::None, _) => format!("${:04X}", word),
        AddressingMode::Absolute(Alteration::X, _) => format!("${:04X},X", word),
        AddressingMode::Absolute(Alteration::Y, _) => format!("${:04X},Y", word),
        AddressingMode::Indirect(Alteration::None) => format!("(${:04X})", word),
        AddressingMode::Indirect(Alteration::X) => format!("(${:02X},X)", lo),
        AddressingMode::Indirect(Alteration::Y) => format!("(${:02X}),Y", lo),
    };

    if operand.is_empty() {
        opcode.mnemonic.to_string()
    } else {
        format!("{} {}", opcode.mnemonic, operand)
    }
}
