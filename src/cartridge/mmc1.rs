// MMC1 (mapper 1)
// Registers are loaded serially: five writes of bit 0 into a shift register,
// the fifth one committing to the register picked by address bits 13-14.
//   $8000-$9FFF control   (mirroring, PRG mode, CHR mode)
//   $A000-$BFFF CHR bank 0
//   $C000-$DFFF CHR bank 1
//   $E000-$FFFF PRG bank
// A write with bit 7 set clears the shift register and forces PRG mode 3.

use super::{Mirroring, PRG_BANK_SIZE};

const CHR_WINDOW: usize = 0x1000;
const SHIFT_RESET: u8 = 0x10;

pub struct Mmc1 {
    prg_banks: usize,
    chr_banks: usize,

    shift_register: u8,
    control: u8,
    chr_bank_0: u8,
    chr_bank_1: u8,
    prg_bank: u8,

    prg_offsets: [usize; 2],
    chr_offsets: [usize; 2],
}

impl Mmc1 {
    /// `chr_banks` counts 4 KB banks.
    pub fn new(prg_banks: usize, chr_banks: usize) -> Self {
        let mut mapper = Mmc1 {
            prg_banks,
            chr_banks,
            shift_register: SHIFT_RESET,
            control: 0x0C,
            chr_bank_0: 0,
            chr_bank_1: 0,
            prg_bank: 0,
            prg_offsets: [0; 2],
            chr_offsets: [0; 2],
        };
        mapper.update_offsets();
        mapper
    }

    pub fn reset(&mut self) {
        self.shift_register = SHIFT_RESET;
        self.control = 0x0C;
        self.chr_bank_0 = 0;
        self.chr_bank_1 = 0;
        self.prg_bank = 0;
        self.update_offsets();
    }

    pub fn prg_offset(&self, address: u16) -> usize {
        let window = ((address >> 14) & 0x01) as usize;
        self.prg_offsets[window] + (address as usize & 0x3FFF)
    }

    pub fn chr_offset(&self, address: u16) -> usize {
        let window = ((address >> 12) & 0x01) as usize;
        self.chr_offsets[window] + (address as usize & 0x0FFF)
    }

    pub fn prg_mode(&self) -> u8 {
        (self.control >> 2) & 0x03
    }

    pub fn chr_mode(&self) -> u8 {
        (self.control >> 4) & 0x01
    }

    pub fn mirroring(&self) -> Mirroring {
        match self.control & 0x03 {
            0 => Mirroring::OneScreenLow,
            1 => Mirroring::OneScreenHigh,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }

    /// Returns the mirroring whenever the control register was committed.
    pub fn write(&mut self, address: u16, value: u8) -> Option<Mirroring> {
        if value & 0x80 != 0 {
            self.shift_register = SHIFT_RESET;
            self.control |= 0x0C;
            self.update_offsets();
            return None;
        }

        // The marker bit reaches bit 0 on the fifth write.
        let complete = self.shift_register & 0x01 != 0;
        self.shift_register = (self.shift_register >> 1) | ((value & 0x01) << 4);
        if !complete {
            return None;
        }

        let data = self.shift_register;
        self.shift_register = SHIFT_RESET;

        let mut mirroring = None;
        match (address >> 13) & 0x03 {
            0 => {
                self.control = data;
                mirroring = Some(self.mirroring());
            }
            1 => self.chr_bank_0 = data,
            2 => self.chr_bank_1 = data,
            _ => self.prg_bank = data & 0x0F,
        }
        log::trace!(
            "MMC1 commit {:04X} <- {:02X} (control {:02X}, prg {:02X}, chr {:02X}/{:02X})",
            address,
            data,
            self.control,
            self.prg_bank,
            self.chr_bank_0,
            self.chr_bank_1
        );
        self.update_offsets();
        mirroring
    }

    fn prg_bank_offset(&self, bank: usize) -> usize {
        (bank % self.prg_banks) * PRG_BANK_SIZE
    }

    fn chr_bank_offset(&self, bank: usize) -> usize {
        (bank % self.chr_banks) * CHR_WINDOW
    }

    fn update_offsets(&mut self) {
        let prg_bank = self.prg_bank as usize;
        self.prg_offsets = match self.prg_mode() {
            0 | 1 => {
                let base = prg_bank & 0x0E;
                [self.prg_bank_offset(base), self.prg_bank_offset(base | 1)]
            }
            2 => [0, self.prg_bank_offset(prg_bank)],
            _ => [self.prg_bank_offset(prg_bank), self.prg_bank_offset(self.prg_banks - 1)],
        };

        let chr_bank_0 = self.chr_bank_0 as usize;
        self.chr_offsets = if self.chr_mode() == 0 {
            let base = chr_bank_0 & 0x1E;
            [self.chr_bank_offset(base), self.chr_bank_offset(base | 1)]
        } else {
            [
                self.chr_bank_offset(chr_bank_0),
                self.chr_bank_offset(self.chr_bank_1 as usize),
            ]
        };
    }
}
