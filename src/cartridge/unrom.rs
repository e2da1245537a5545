// UNROM (mapper 2) and NROM (mapper 0).
// $C000-$FFFF is pinned to the last 16 KB bank. On UNROM any write to
// $8000-$FFFF selects the bank seen at $8000-$BFFF; NROM has no register.

use super::PRG_BANK_SIZE;

pub struct Unrom {
    prg_banks: usize,
    switchable: bool,
    prg_offsets: [usize; 2],
}

impl Unrom {
    pub fn new(prg_banks: usize, switchable: bool) -> Self {
        let mut mapper = Unrom {
            prg_banks,
            switchable,
            prg_offsets: [0; 2],
        };
        mapper.reset();
        mapper
    }

    pub fn reset(&mut self) {
        self.prg_offsets = [0, (self.prg_banks - 1) * PRG_BANK_SIZE];
    }

    pub fn prg_offset(&self, address: u16) -> usize {
        let window = ((address >> 14) & 0x01) as usize;
        self.prg_offsets[window] + (address as usize & 0x3FFF)
    }

    pub fn chr_offset(&self, address: u16) -> usize {
        address as usize & 0x1FFF
    }

    pub fn write(&mut self, address: u16, value: u8) {
        if !self.switchable {
            log::warn!("Attempting to write to ROM at {:04X}", address);
            return;
        }
        let bank = value as usize % self.prg_banks;
        self.prg_offsets[0] = bank * PRG_BANK_SIZE;
        log::trace!("UNROM low bank -> {}", bank);
    }
}
