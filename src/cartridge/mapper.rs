use super::{bank_count, Cnrom, Mirroring, Mmc1, RomError, Unrom, CHR_BANK_SIZE, PRG_BANK_SIZE};

/// Board types this core knows how to bank-switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperType {
    Nrom,
    Mmc1,
    Unrom,
    Cnrom,
}

impl MapperType {
    pub fn number(self) -> u8 {
        match self {
            MapperType::Nrom => 0,
            MapperType::Mmc1 => 1,
            MapperType::Unrom => 2,
            MapperType::Cnrom => 3,
        }
    }
}

impl TryFrom<u8> for MapperType {
    type Error = RomError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MapperType::Nrom),
            1 => Ok(MapperType::Mmc1),
            2 => Ok(MapperType::Unrom),
            3 => Ok(MapperType::Cnrom),
            other => Err(RomError::UnsupportedMapper(other)),
        }
    }
}

/// Bank-switching logic of the cartridge board. Translates CPU addresses in
/// $8000-$FFFF and PPU addresses in $0000-$1FFF into offsets of the PRG and
/// CHR arrays; the cartridge bounds-checks the result.
pub enum Mapper {
    Unrom(Unrom),
    Cnrom(Cnrom),
    Mmc1(Mmc1),
}

impl Mapper {
    pub fn new(kind: MapperType, prg_len: usize, chr_len: usize) -> Self {
        let prg_banks = bank_count(prg_len, PRG_BANK_SIZE);
        match kind {
            MapperType::Nrom => Mapper::Unrom(Unrom::new(prg_banks, false)),
            MapperType::Unrom => Mapper::Unrom(Unrom::new(prg_banks, true)),
            MapperType::Cnrom => Mapper::Cnrom(Cnrom::new(prg_banks, bank_count(chr_len, CHR_BANK_SIZE))),
            MapperType::Mmc1 => Mapper::Mmc1(Mmc1::new(prg_banks, bank_count(chr_len, 0x1000))),
        }
    }

    pub fn prg_offset(&self, address: u16) -> usize {
        match self {
            Mapper::Unrom(m) => m.prg_offset(address),
            Mapper::Cnrom(m) => m.prg_offset(address),
            Mapper::Mmc1(m) => m.prg_offset(address),
        }
    }

    pub fn chr_offset(&self, address: u16) -> usize {
        match self {
            Mapper::Unrom(m) => m.chr_offset(address),
            Mapper::Cnrom(m) => m.chr_offset(address),
            Mapper::Mmc1(m) => m.chr_offset(address),
        }
    }

    /// Register write in $8000-$FFFF. Returns the new nametable layout when
    /// the board drives mirroring itself.
    pub fn write_register(&mut self, address: u16, value: u8) -> Option<Mirroring> {
        match self {
            Mapper::Unrom(m) => {
                m.write(address, value);
                None
            }
            Mapper::Cnrom(m) => {
                m.write(value);
                None
            }
            Mapper::Mmc1(m) => m.write(address, value),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Mapper::Unrom(m) => m.reset(),
            Mapper::Cnrom(m) => m.reset(),
            Mapper::Mmc1(m) => m.reset(),
        }
    }
}
