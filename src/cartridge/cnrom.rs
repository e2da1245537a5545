// CNROM (mapper 3): fixed PRG, 8 KB CHR bank chosen by the low two bits of
// any write to $8000-$FFFF.

use super::{CHR_BANK_SIZE, PRG_BANK_SIZE};

pub struct Cnrom {
    chr_banks: usize,
    prg_offsets: [usize; 2],
    chr_offset: usize,
}

impl Cnrom {
    pub fn new(prg_banks: usize, chr_banks: usize) -> Self {
        // A single 16 KB bank shows up in both halves.
        let high = if prg_banks > 1 { PRG_BANK_SIZE } else { 0 };
        Cnrom {
            chr_banks,
            prg_offsets: [0, high],
            chr_offset: 0,
        }
    }

    pub fn reset(&mut self) {
        self.chr_offset = 0;
    }

    pub fn prg_offset(&self, address: u16) -> usize {
        let window = ((address >> 14) & 0x01) as usize;
        self.prg_offsets[window] + (address as usize & 0x3FFF)
    }

    pub fn chr_offset(&self, address: u16) -> usize {
        self.chr_offset + (address as usize & 0x1FFF)
    }

    pub fn write(&mut self, value: u8) {
        let bank = (value & 0x03) as usize % self.chr_banks;
        self.chr_offset = bank * CHR_BANK_SIZE;
        log::trace!("CNROM CHR bank -> {}", bank);
    }

    pub fn current_chr_bank(&self) -> usize {
        self.chr_offset / CHR_BANK_SIZE
    }
}
