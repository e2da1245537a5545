mod cnrom;
mod mapper;
mod mmc1;
mod unrom;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

pub use cnrom::Cnrom;
pub use mapper::{Mapper, MapperType};
pub use mmc1::Mmc1;
pub use unrom::Unrom;

pub const HEADER_SIZE: usize = 16;
pub const TRAINER_SIZE: usize = 512;
pub const PRG_BANK_SIZE: usize = 0x4000;
pub const CHR_BANK_SIZE: usize = 0x2000;
pub const SRAM_SIZE: usize = 0x2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    Quad,
    OneScreenLow,
    OneScreenHigh,
}

impl Mirroring {
    /// Physical 1 KB nametable backing each of the four logical tables.
    pub fn nametable_banks(self) -> [usize; 4] {
        match self {
            Mirroring::Horizontal => [0, 0, 1, 1],
            Mirroring::Vertical => [0, 1, 0, 1],
            Mirroring::Quad => [0, 1, 2, 3],
            Mirroring::OneScreenLow => [0, 0, 0, 0],
            Mirroring::OneScreenHigh => [1, 1, 1, 1],
        }
    }
}

#[derive(Debug, Error)]
pub enum RomError {
    #[error("failed to read ROM: {0}")]
    Io(#[from] std::io::Error),
    #[error("ROM file too small ({0} bytes)")]
    TooSmall(usize),
    #[error("invalid iNES header magic")]
    InvalidMagic,
    #[error("ROM declares no PRG banks")]
    MissingPrg,
    #[error("ROM file truncated: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u8),
}

/// Number of whole `size` banks in a region, never less than one.
pub fn bank_count(len: usize, size: usize) -> usize {
    (len / size).max(1)
}

pub struct Cartridge {
    pub prg_rom: Vec<u8>,
    pub chr_rom: Vec<u8>,
    pub sram: Vec<u8>,
    pub mapper_type: MapperType,
    pub chr_is_ram: bool,
    pub battery_backed: bool,
    mirroring: Mirroring,
    mapper: Mapper,
    checksum: u32,
}

impl Cartridge {
    pub fn new(
        prg_rom: Vec<u8>,
        chr_rom: Vec<u8>,
        mapper_type: MapperType,
        mirroring: Mirroring,
    ) -> Self {
        let (chr_rom, chr_is_ram) = if chr_rom.is_empty() {
            (vec![0; CHR_BANK_SIZE], true)
        } else {
            (chr_rom, false)
        };
        let checksum = checksum(&prg_rom, if chr_is_ram { &[] } else { &chr_rom });
        let mapper = Mapper::new(mapper_type, prg_rom.len(), chr_rom.len());

        Cartridge {
            prg_rom,
            chr_rom,
            sram: vec![0; SRAM_SIZE],
            mapper_type,
            chr_is_ram,
            battery_backed: false,
            mirroring,
            mapper,
            checksum,
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        let mut file = File::open(path)?;
        let mut rom_data = Vec::new();
        file.read_to_end(&mut rom_data)?;

        Self::load_from_bytes(&rom_data)
    }

    pub fn load_from_bytes(data: &[u8]) -> Result<Self, RomError> {
        if data.len() < HEADER_SIZE {
            return Err(RomError::TooSmall(data.len()));
        }

        if &data[0..4] != b"NES\x1A" {
            return Err(RomError::InvalidMagic);
        }

        let prg_rom_size = data[4] as usize * PRG_BANK_SIZE;
        let chr_rom_size = data[5] as usize * CHR_BANK_SIZE;
        if prg_rom_size == 0 {
            return Err(RomError::MissingPrg);
        }

        let flags_6 = data[6];
        let flags_7 = data[7];

        let mirroring = if (flags_6 & 0x08) != 0 {
            Mirroring::Quad
        } else if (flags_6 & 0x01) != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let battery_backed = (flags_6 & 0x02) != 0;
        let trainer_present = (flags_6 & 0x04) != 0;

        let mapper_number = (flags_7 & 0xF0) | (flags_6 >> 4);
        let mapper_type = MapperType::try_from(mapper_number)?;

        let trainer_size = if trainer_present { TRAINER_SIZE } else { 0 };
        let prg_rom_start = HEADER_SIZE + trainer_size;
        let chr_rom_start = prg_rom_start + prg_rom_size;
        let expected = chr_rom_start + chr_rom_size;

        if data.len() < expected {
            return Err(RomError::Truncated {
                expected,
                actual: data.len(),
            });
        }

        let prg_rom = data[prg_rom_start..chr_rom_start].to_vec();
        let chr_rom = data[chr_rom_start..expected].to_vec();

        let mut cartridge = Cartridge::new(prg_rom, chr_rom, mapper_type, mirroring);
        cartridge.battery_backed = battery_backed;

        log::info!(
            "Loaded cartridge: mapper {} ({:?}), PRG {} KB, CHR {} KB{}, {:?} mirroring, checksum {:08X}",
            mapper_number,
            mapper_type,
            cartridge.prg_rom.len() / 1024,
            cartridge.chr_rom.len() / 1024,
            if cartridge.chr_is_ram { " RAM" } else { "" },
            mirroring,
            cartridge.checksum
        );

        Ok(cartridge)
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn prg_bank_count(&self, size: usize) -> usize {
        bank_count(self.prg_rom.len(), size)
    }

    pub fn chr_bank_count(&self, size: usize) -> usize {
        bank_count(self.chr_rom.len(), size)
    }

    /// CPU read in $6000-$FFFF.
    pub fn read(&self, address: u16) -> u8 {
        match address {
            0x6000..=0x7FFF => fetch(&self.sram, (address - 0x6000) as usize, "SRAM"),
            0x8000..=0xFFFF => fetch(&self.prg_rom, self.mapper.prg_offset(address), "PRG"),
            _ => {
                log::warn!("Cartridge read outside its window: {:04X}", address);
                0
            }
        }
    }

    /// CPU write in $6000-$FFFF. ROM-space writes go to the mapper registers.
    pub fn write(&mut self, address: u16, value: u8) {
        match address {
            0x6000..=0x7FFF => store(&mut self.sram, (address - 0x6000) as usize, value, "SRAM"),
            0x8000..=0xFFFF => {
                if let Some(mirroring) = self.mapper.write_register(address, value) {
                    if mirroring != self.mirroring {
                        log::debug!("Mirroring switched to {:?}", mirroring);
                    }
                    self.mirroring = mirroring;
                }
            }
            _ => log::warn!("Cartridge write outside its window: {:04X}", address),
        }
    }

    /// PPU pattern table read in $0000-$1FFF.
    pub fn read_chr(&self, address: u16) -> u8 {
        fetch(&self.chr_rom, self.mapper.chr_offset(address), "CHR")
    }

    pub fn write_chr(&mut self, address: u16, value: u8) {
        if !self.chr_is_ram {
            log::trace!("Ignoring write to CHR ROM at {:04X}", address);
            return;
        }
        let offset = self.mapper.chr_offset(address);
        store(&mut self.chr_rom, offset, value, "CHR");
    }

    /// Copy a previously saved battery RAM image. Mismatched sizes are
    /// rejected so a save from another board cannot corrupt this one.
    pub fn load_sram(&mut self, data: &[u8]) {
        if data.len() != self.sram.len() {
            log::warn!(
                "Ignoring save RAM of {} bytes, expected {}",
                data.len(),
                self.sram.len()
            );
            return;
        }
        self.sram.copy_from_slice(data);
    }

    pub fn reset(&mut self) {
        self.mapper.reset();
    }
}

fn fetch(region: &[u8], offset: usize, name: &str) -> u8 {
    match region.get(offset) {
        Some(value) => *value,
        None => {
            log::warn!("{} read out of bounds: offset {:X} of {:X}", name, offset, region.len());
            0
        }
    }
}

fn store(region: &mut [u8], offset: usize, value: u8, name: &str) {
    let len = region.len();
    match region.get_mut(offset) {
        Some(slot) => *slot = value,
        None => log::warn!("{} write out of bounds: offset {:X} of {:X}", name, offset, len),
    }
}

/// 32-bit FNV-1a over PRG then CHR ROM.
fn checksum(prg_rom: &[u8], chr_rom: &[u8]) -> u32 {
    prg_rom
        .iter()
        .chain(chr_rom.iter())
        .fold(0x811C_9DC5u32, |hash, &byte| {
            (hash ^ byte as u32).wrapping_mul(0x0100_0193)
        })
}
