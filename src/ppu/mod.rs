mod palette;

use bitflags::bitflags;

use crate::cartridge::Mirroring;

pub use palette::{rgb, NES_PALETTE};

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;
pub const FRAME_BUFFER_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT * 3;

const CYCLES_PER_LINE: u16 = 341;
const LINES_PER_FRAME: u16 = 262;
const VBLANK_LINE: u16 = 241;
const PRE_RENDER_LINE: u16 = 261;

const POWER_UP_CYCLE: u16 = 340;
const POWER_UP_SCANLINE: u16 = 240;

const NAMETABLE_SIZE: usize = 0x400;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PpuCtrl: u8 {
        const NAMETABLE_ADDR = 0b00000011;
        const VRAM_INCREMENT = 0b00000100;
        const SPRITE_PATTERN = 0b00001000;
        const BG_PATTERN = 0b00010000;
        const SPRITE_SIZE = 0b00100000;
        const MASTER_SLAVE = 0b01000000;
        const NMI_ENABLE = 0b10000000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PpuMask: u8 {
        const GRAYSCALE = 0b00000001;
        const SHOW_BG_LEFT = 0b00000010;
        const SHOW_SPRITES_LEFT = 0b00000100;
        const SHOW_BG = 0b00001000;
        const SHOW_SPRITES = 0b00010000;
        const EMPHASIZE_RED = 0b00100000;
        const EMPHASIZE_GREEN = 0b01000000;
        const EMPHASIZE_BLUE = 0b10000000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PpuStatus: u8 {
        const SPRITE_OVERFLOW = 0b00100000;
        const SPRITE_ZERO_HIT = 0b01000000;
        const VBLANK_STARTED = 0b10000000;
    }
}

/// PPU-side view of the system: pattern tables live on the cartridge, and
/// vblank is reported back to the CPU.
pub trait PpuBus {
    fn read_chr(&mut self, address: u16) -> u8;
    fn write_chr(&mut self, address: u16, value: u8);
    fn mirroring(&self) -> Mirroring;
    fn trigger_nmi(&mut self);
}

pub struct Ppu {
    control: PpuCtrl,
    mask: PpuMask,
    status: PpuStatus,

    // Loopy registers: v, t, fine x and the shared write toggle.
    vram_pointer: u16,
    vram_temp_pointer: u16,
    fine_x: u8,
    write_toggle: bool,

    oam: [u8; 256],
    oam_pointer: u8,
    nametable: [u8; NAMETABLE_SIZE * 4],
    palette_indices: [u8; 32],
    data_buffer: u8,
    register_latch: u8,

    nametable_byte: u8,
    attribute_byte: u8,
    low_tile_byte: u8,
    high_tile_byte: u8,
    tile_data: u64,

    sprite_count: usize,
    sprite_patterns: [u32; 8],
    sprite_positions: [u8; 8],
    sprite_priorities: [bool; 8],
    sprite_indexes: [u8; 8],

    cycle: u16,
    scanline: u16,
    frame: u64,

    current: Vec<u8>,
    rendered: Vec<u8>,
    needs_render: bool,
}

impl Ppu {
    pub fn new() -> Self {
        Ppu {
            control: PpuCtrl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            vram_pointer: 0,
            vram_temp_pointer: 0,
            fine_x: 0,
            write_toggle: false,
            oam: [0; 256],
            oam_pointer: 0,
            nametable: [0; NAMETABLE_SIZE * 4],
            palette_indices: [0; 32],
            data_buffer: 0,
            register_latch: 0,
            nametable_byte: 0,
            attribute_byte: 0,
            low_tile_byte: 0,
            high_tile_byte: 0,
            tile_data: 0,
            sprite_count: 0,
            sprite_patterns: [0; 8],
            sprite_positions: [0; 8],
            sprite_priorities: [false; 8],
            sprite_indexes: [0; 8],
            cycle: POWER_UP_CYCLE,
            scanline: POWER_UP_SCANLINE,
            frame: 0,
            current: vec![0; FRAME_BUFFER_SIZE],
            rendered: vec![0; FRAME_BUFFER_SIZE],
            needs_render: false,
        }
    }

    /// Back to power-up counters and register state. Memory contents and the
    /// frame buffers are kept.
    pub fn reset(&mut self) {
        self.control = PpuCtrl::empty();
        self.mask = PpuMask::empty();
        self.status = PpuStatus::empty();
        self.vram_pointer = 0;
        self.vram_temp_pointer = 0;
        self.fine_x = 0;
        self.write_toggle = false;
        self.oam_pointer = 0;
        self.data_buffer = 0;
        self.register_latch = 0;
        self.tile_data = 0;
        self.sprite_count = 0;
        self.cycle = POWER_UP_CYCLE;
        self.scanline = POWER_UP_SCANLINE;
        self.frame = 0;
    }

    pub fn cycle(&self) -> u16 {
        self.cycle
    }

    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn control(&self) -> PpuCtrl {
        self.control
    }

    pub fn mask(&self) -> PpuMask {
        self.mask
    }

    pub fn status(&self) -> PpuStatus {
        self.status
    }

    pub fn vram_address(&self) -> u16 {
        self.vram_pointer
    }

    pub fn oam(&self) -> &[u8; 256] {
        &self.oam
    }

    /// The last completed frame, RGB24.
    pub fn frame_buffer(&self) -> &[u8] {
        &self.rendered
    }

    pub fn needs_render(&self) -> bool {
        self.needs_render
    }

    pub fn mark_rendered(&mut self) {
        self.needs_render = false;
    }

    pub fn rendering_enabled(&self) -> bool {
        self.mask.intersects(PpuMask::SHOW_BG | PpuMask::SHOW_SPRITES)
    }

    /// Register read at 0x2000..=0x2007 (callers may pass any mirror).
    pub fn read_register<B: PpuBus>(&mut self, address: u16, bus: &mut B) -> u8 {
        match 0x2000 | (address & 0x7) {
            0x2002 => self.read_status(),
            0x2004 => self.oam[self.oam_pointer as usize],
            0x2007 => self.read_data(bus),
            _ => self.register_latch,
        }
    }

    pub fn write_register<B: PpuBus>(&mut self, address: u16, value: u8, bus: &mut B) {
        self.register_latch = value;
        match 0x2000 | (address & 0x7) {
            0x2000 => self.write_control(value, bus),
            0x2001 => self.mask = PpuMask::from_bits_retain(value),
            0x2003 => self.oam_pointer = value,
            0x2004 => {
                self.oam[self.oam_pointer as usize] = value;
                self.oam_pointer = self.oam_pointer.wrapping_add(1);
            }
            0x2005 => self.write_scroll(value),
            0x2006 => self.write_address(value),
            0x2007 => {
                self.write_vram(self.vram_pointer, value, bus);
                self.increment_pointer();
            }
            _ => log::trace!("write to read-only PPU register {:04X}", address),
        }
    }

    /// OAM DMA payload; copying starts at the current OAM pointer and wraps.
    pub fn oam_dma(&mut self, page: &[u8; 256]) {
        for (i, &byte) in page.iter().enumerate() {
            let index = self.oam_pointer.wrapping_add(i as u8);
            self.oam[index as usize] = byte;
        }
    }

    fn read_status(&mut self) -> u8 {
        let result = self.status.bits() | (self.register_latch & 0x1F);
        self.status.remove(PpuStatus::VBLANK_STARTED);
        self.write_toggle = false;
        result
    }

    fn read_data<B: PpuBus>(&mut self, bus: &mut B) -> u8 {
        let address = self.vram_pointer & 0x3FFF;
        let result = if address < 0x3F00 {
            let buffered = self.data_buffer;
            self.data_buffer = self.read_vram(address, bus);
            buffered
        } else {
            // Palette reads are immediate; the buffer picks up the nametable
            // byte underneath.
            self.data_buffer = self.read_vram(address - 0x1000, bus);
            self.read_vram(address, bus)
        };
        self.increment_pointer();
        result
    }

    fn write_control<B: PpuBus>(&mut self, value: u8, bus: &mut B) {
        let was_enabled = self.control.contains(PpuCtrl::NMI_ENABLE);
        self.control = PpuCtrl::from_bits_retain(value);
        self.vram_temp_pointer = (self.vram_temp_pointer & !0x0C00) | ((value as u16 & 0x03) << 10);

        if !was_enabled
            && self.control.contains(PpuCtrl::NMI_ENABLE)
            && self.status.contains(PpuStatus::VBLANK_STARTED)
        {
            bus.trigger_nmi();
        }
    }

    fn write_scroll(&mut self, value: u8) {
        if !self.write_toggle {
            self.fine_x = value & 0x07;
            self.vram_temp_pointer = (self.vram_temp_pointer & !0x001F) | (value as u16 >> 3);
        } else {
            self.vram_temp_pointer = (self.vram_temp_pointer & !0x73E0)
                | ((value as u16 & 0x07) << 12)
                | ((value as u16 & 0xF8) << 2);
        }
        self.write_toggle = !self.write_toggle;
    }

    fn write_address(&mut self, value: u8) {
        if !self.write_toggle {
            self.vram_temp_pointer = (self.vram_temp_pointer & 0x00FF) | ((value as u16 & 0x3F) << 8);
        } else {
            self.vram_temp_pointer = (self.vram_temp_pointer & 0xFF00) | value as u16;
            self.vram_pointer = self.vram_temp_pointer;
        }
        self.write_toggle = !self.write_toggle;
    }

    fn increment_pointer(&mut self) {
        let step = if self.control.contains(PpuCtrl::VRAM_INCREMENT) { 32 } else { 1 };
        self.vram_pointer = self.vram_pointer.wrapping_add(step) & 0x7FFF;
    }

    fn nametable_index(address: u16, mirroring: Mirroring) -> usize {
        let offset = (address as usize - 0x2000) & 0x0FFF;
        let bank = mirroring.nametable_banks()[offset / NAMETABLE_SIZE];
        bank * NAMETABLE_SIZE + offset % NAMETABLE_SIZE
    }

    fn palette_index(address: u16) -> usize {
        let index = (address & 0x1F) as usize;
        // 0x3F10/14/18/1C alias the background entries.
        if index >= 0x10 && index % 4 == 0 {
            index - 0x10
        } else {
            index
        }
    }

    fn read_vram<B: PpuBus>(&self, address: u16, bus: &mut B) -> u8 {
        let address = address & 0x3FFF;
        match address {
            0x0000..=0x1FFF => bus.read_chr(address),
            0x2000..=0x3EFF => self.nametable[Self::nametable_index(address, bus.mirroring())],
            _ => self.palette_indices[Self::palette_index(address)],
        }
    }

    fn write_vram<B: PpuBus>(&mut self, address: u16, value: u8, bus: &mut B) {
        let address = address & 0x3FFF;
        match address {
            0x0000..=0x1FFF => bus.write_chr(address, value),
            0x2000..=0x3EFF => {
                let index = Self::nametable_index(address, bus.mirroring());
                self.nametable[index] = value;
            }
            _ => self.palette_indices[Self::palette_index(address)] = value & 0x3F,
        }
    }

    /// Advances one dot.
    pub fn step<B: PpuBus>(&mut self, bus: &mut B) {
        self.tick();

        let visible_line = self.scanline < SCREEN_HEIGHT as u16;
        let pre_line = self.scanline == PRE_RENDER_LINE;
        let render_line = visible_line || pre_line;
        let visible_cycle = (1..=256).contains(&self.cycle);
        let prefetch_cycle = (321..=336).contains(&self.cycle);
        let fetch_cycle = visible_cycle || prefetch_cycle;

        if self.rendering_enabled() {
            if visible_line && visible_cycle {
                self.render_pixel();
            }
            if render_line && fetch_cycle {
                self.tile_data <<= 4;
                match self.cycle % 8 {
                    1 => self.fetch_nametable_byte(bus),
                    3 => self.fetch_attribute_byte(bus),
                    5 => self.fetch_low_tile_byte(bus),
                    7 => self.fetch_high_tile_byte(bus),
                    0 => {
                        self.store_tile_data();
                        self.increment_x();
                    }
                    _ => {}
                }
            }
            if pre_line && (280..=304).contains(&self.cycle) {
                self.copy_y();
            }
            if render_line {
                if self.cycle == 256 {
                    self.increment_y();
                }
                if self.cycle == 257 {
                    self.copy_x();
                }
            }
            if self.cycle == 257 {
                if visible_line {
                    self.evaluate_sprites(bus);
                } else {
                    self.sprite_count = 0;
                }
            }
        }

        if self.scanline == VBLANK_LINE && self.cycle == 1 {
            std::mem::swap(&mut self.current, &mut self.rendered);
            self.needs_render = true;
            self.status.insert(PpuStatus::VBLANK_STARTED);
            if self.control.contains(PpuCtrl::NMI_ENABLE) {
                bus.trigger_nmi();
            }
        }
        if pre_line && self.cycle == 1 {
            self.status.remove(
                PpuStatus::VBLANK_STARTED | PpuStatus::SPRITE_ZERO_HIT | PpuStatus::SPRITE_OVERFLOW,
            );
        }
    }

    fn tick(&mut self) {
        self.cycle += 1;
        if self.cycle < CYCLES_PER_LINE {
            return;
        }
        self.cycle = 0;
        self.scanline += 1;
        if self.scanline < LINES_PER_FRAME {
            return;
        }
        self.scanline = 0;
        if self.frame % 2 == 1 {
            // Odd frames drop the idle dot at the start of line 0.
            self.cycle = 1;
        }
        self.frame += 1;
        log::trace!("frame {}", self.frame);
    }

    fn increment_x(&mut self) {
        if self.vram_pointer & 0x001F == 31 {
            self.vram_pointer &= !0x001F;
            self.vram_pointer ^= 0x0400;
        } else {
            self.vram_pointer += 1;
        }
    }

    fn increment_y(&mut self) {
        if self.vram_pointer & 0x7000 != 0x7000 {
            self.vram_pointer += 0x1000;
            return;
        }
        self.vram_pointer &= !0x7000;
        let mut y = (self.vram_pointer & 0x03E0) >> 5;
        if y == 29 {
            y = 0;
            self.vram_pointer ^= 0x0800;
        } else if y == 31 {
            y = 0;
        } else {
            y += 1;
        }
        self.vram_pointer = (self.vram_pointer & !0x03E0) | (y << 5);
    }

    fn copy_x(&mut self) {
        self.vram_pointer = (self.vram_pointer & !0x041F) | (self.vram_temp_pointer & 0x041F);
    }

    fn copy_y(&mut self) {
        self.vram_pointer = (self.vram_pointer & !0x7BE0) | (self.vram_temp_pointer & 0x7BE0);
    }

    fn fetch_nametable_byte<B: PpuBus>(&mut self, bus: &mut B) {
        let address = 0x2000 | (self.vram_pointer & 0x0FFF);
        self.nametable_byte = self.read_vram(address, bus);
    }

    fn fetch_attribute_byte<B: PpuBus>(&mut self, bus: &mut B) {
        let v = self.vram_pointer;
        let address = 0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07);
        let shift = ((v >> 4) & 4) | (v & 2);
        self.attribute_byte = ((self.read_vram(address, bus) >> shift) & 3) << 2;
    }

    fn background_tile_address(&self) -> u16 {
        let fine_y = (self.vram_pointer >> 12) & 7;
        let table = if self.control.contains(PpuCtrl::BG_PATTERN) { 0x1000 } else { 0 };
        table + self.nametable_byte as u16 * 16 + fine_y
    }

    fn fetch_low_tile_byte<B: PpuBus>(&mut self, bus: &mut B) {
        self.low_tile_byte = self.read_vram(self.background_tile_address(), bus);
    }

    fn fetch_high_tile_byte<B: PpuBus>(&mut self, bus: &mut B) {
        self.high_tile_byte = self.read_vram(self.background_tile_address() + 8, bus);
    }

    /// Packs the latched tile row into eight 4-bit pixels (attribute in the
    /// high two bits) in the low half of the shift register.
    fn store_tile_data(&mut self) {
        let mut data = 0u32;
        for _ in 0..8 {
            let p1 = (self.low_tile_byte & 0x80) >> 7;
            let p2 = (self.high_tile_byte & 0x80) >> 6;
            self.low_tile_byte <<= 1;
            self.high_tile_byte <<= 1;
            data = (data << 4) | (self.attribute_byte | p1 | p2) as u32;
        }
        self.tile_data |= data as u64;
    }

    fn background_pixel(&self) -> u8 {
        if !self.mask.contains(PpuMask::SHOW_BG) {
            return 0;
        }
        let data = (self.tile_data >> 32) as u32 >> ((7 - self.fine_x as u32) * 4);
        (data & 0x0F) as u8
    }

    /// Index into the line's sprite list and its 4-bit colour, if an opaque
    /// sprite pixel covers the current dot.
    fn sprite_pixel(&self) -> Option<(usize, u8)> {
        if !self.mask.contains(PpuMask::SHOW_SPRITES) {
            return None;
        }
        let x = self.cycle as i32 - 1;
        (0..self.sprite_count).find_map(|i| {
            let offset = x - self.sprite_positions[i] as i32;
            if !(0..8).contains(&offset) {
                return None;
            }
            let color = ((self.sprite_patterns[i] >> ((7 - offset) * 4)) & 0x0F) as u8;
            (color % 4 != 0).then_some((i, color))
        })
    }

    fn render_pixel(&mut self) {
        let x = self.cycle as usize - 1;
        let y = self.scanline as usize;

        let mut background = self.background_pixel();
        if x < 8 && !self.mask.contains(PpuMask::SHOW_BG_LEFT) {
            background = 0;
        }
        let mut sprite = self.sprite_pixel();
        if x < 8 && !self.mask.contains(PpuMask::SHOW_SPRITES_LEFT) {
            sprite = None;
        }

        let opaque_background = background % 4 != 0;
        let color = match sprite {
            None if opaque_background => background,
            None => 0,
            Some((_, color)) if !opaque_background => color | 0x10,
            Some((i, color)) => {
                if self.sprite_indexes[i] == 0 && x < 255 {
                    self.status.insert(PpuStatus::SPRITE_ZERO_HIT);
                }
                if self.sprite_priorities[i] {
                    background
                } else {
                    color | 0x10
                }
            }
        };

        let entry = self.palette_indices[Self::palette_index(color as u16)];
        let (r, g, b) = rgb(entry, self.mask);
        let offset = (y * SCREEN_WIDTH + x) * 3;
        self.current[offset] = r;
        self.current[offset + 1] = g;
        self.current[offset + 2] = b;
    }

    fn evaluate_sprites<B: PpuBus>(&mut self, bus: &mut B) {
        let height: i32 = if self.control.contains(PpuCtrl::SPRITE_SIZE) { 16 } else { 8 };
        let mut count = 0;

        for i in 0..64 {
            let y = self.oam[i * 4] as i32;
            let attributes = self.oam[i * 4 + 2];
            let x = self.oam[i * 4 + 3];
            let row = self.scanline as i32 - y;
            if !(0..height).contains(&row) {
                continue;
            }
            if count < 8 {
                self.sprite_patterns[count] = self.fetch_sprite_pattern(i, row as u16, bus);
                self.sprite_positions[count] = x;
                self.sprite_priorities[count] = attributes & 0x20 != 0;
                self.sprite_indexes[count] = i as u8;
            }
            count += 1;
        }

        if count > 8 {
            count = 8;
            self.status.insert(PpuStatus::SPRITE_OVERFLOW);
        }
        self.sprite_count = count;
    }

    /// One row of sprite `index` as eight 4-bit pixels, flips applied.
    fn fetch_sprite_pattern<B: PpuBus>(&self, index: usize, row: u16, bus: &mut B) -> u32 {
        let mut tile = self.oam[index * 4 + 1] as u16;
        let attributes = self.oam[index * 4 + 2];
        let flip_vertical = attributes & 0x80 != 0;
        let flip_horizontal = attributes & 0x40 != 0;

        let address = if !self.control.contains(PpuCtrl::SPRITE_SIZE) {
            let row = if flip_vertical { 7 - row } else { row };
            let table = if self.control.contains(PpuCtrl::SPRITE_PATTERN) { 0x1000 } else { 0 };
            table + tile * 16 + row
        } else {
            let mut row = if flip_vertical { 15 - row } else { row };
            let table = (tile & 1) * 0x1000;
            tile &= 0xFE;
            if row > 7 {
                tile += 1;
                row -= 8;
            }
            table + tile * 16 + row
        };

        let palette = (attributes & 3) << 2;
        let mut low = self.read_vram(address, bus);
        let mut high = self.read_vram(address + 8, bus);
        let mut data = 0u32;
        for _ in 0..8 {
            let (p1, p2) = if flip_horizontal {
                let bits = (low & 1, (high & 1) << 1);
                low >>= 1;
                high >>= 1;
                bits
            } else {
                let bits = ((low & 0x80) >> 7, (high & 0x80) >> 6);
                low <<= 1;
                high <<= 1;
                bits
            };
            data = (data << 4) | (palette | p1 | p2) as u32;
        }
        data
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
