use super::*;

struct TestPpuBus {
    chr: Vec<u8>,
    mirroring: Mirroring,
    nmi_count: usize,
}

impl TestPpuBus {
    fn new(mirroring: Mirroring) -> Self {
        TestPpuBus {
            chr: vec![0; 0x2000],
            mirroring,
            nmi_count: 0,
        }
    }

    /// Tile 1 of the low pattern table: low plane solid, high plane empty.
    fn with_solid_tile(mut self) -> Self {
        for row in 0..8 {
            self.chr[16 + row] = 0xFF;
        }
        self
    }
}

impl PpuBus for TestPpuBus {
    fn read_chr(&mut self, address: u16) -> u8 {
        self.chr[address as usize & 0x1FFF]
    }

    fn write_chr(&mut self, address: u16, value: u8) {
        self.chr[address as usize & 0x1FFF] = value;
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn trigger_nmi(&mut self) {
        self.nmi_count += 1;
    }
}

fn run_to(ppu: &mut Ppu, bus: &mut TestPpuBus, scanline: u16, cycle: u16) {
    loop {
        ppu.step(bus);
        if ppu.scanline() == scanline && ppu.cycle() == cycle {
            break;
        }
    }
}

fn set_address(ppu: &mut Ppu, bus: &mut TestPpuBus, address: u16) {
    ppu.write_register(0x2006, (address >> 8) as u8, bus);
    ppu.write_register(0x2006, address as u8, bus);
}

fn pixel(ppu: &Ppu, x: usize, y: usize) -> (u8, u8, u8) {
    let offset = (y * SCREEN_WIDTH + x) * 3;
    let buffer = ppu.frame_buffer();
    (buffer[offset], buffer[offset + 1], buffer[offset + 2])
}

#[test]
fn power_up_counters() {
    let ppu = Ppu::new();
    assert_eq!((ppu.cycle(), ppu.scanline(), ppu.frame()), (340, 240, 0));
    assert_eq!(ppu.frame_buffer().len(), FRAME_BUFFER_SIZE);
}

#[test]
fn vblank_sets_flag_and_raises_one_nmi() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);
    ppu.write_register(0x2000, PpuCtrl::NMI_ENABLE.bits(), &mut bus);

    ppu.step(&mut bus);
    assert_eq!((ppu.scanline(), ppu.cycle()), (241, 0));
    assert!(!ppu.status().contains(PpuStatus::VBLANK_STARTED));

    ppu.step(&mut bus);
    assert_eq!((ppu.scanline(), ppu.cycle()), (241, 1));
    assert!(ppu.status().contains(PpuStatus::VBLANK_STARTED));
    assert!(ppu.needs_render());
    assert_eq!(bus.nmi_count, 1);

    run_to(&mut ppu, &mut bus, 260, 340);
    assert_eq!(bus.nmi_count, 1);
}

#[test]
fn vblank_without_nmi_enable_is_silent() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);
    run_to(&mut ppu, &mut bus, 241, 1);
    assert!(ppu.status().contains(PpuStatus::VBLANK_STARTED));
    assert_eq!(bus.nmi_count, 0);
}

#[test]
fn pre_render_line_clears_status() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);
    run_to(&mut ppu, &mut bus, 241, 1);
    ppu.status.insert(PpuStatus::SPRITE_ZERO_HIT | PpuStatus::SPRITE_OVERFLOW);

    run_to(&mut ppu, &mut bus, 261, 0);
    assert!(ppu.status().contains(PpuStatus::VBLANK_STARTED));
    ppu.step(&mut bus);
    assert!(ppu.status().is_empty());
}

#[test]
fn enabling_nmi_during_vblank_fires_immediately() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);
    run_to(&mut ppu, &mut bus, 241, 1);
    assert_eq!(bus.nmi_count, 0);

    ppu.write_register(0x2000, 0x80, &mut bus);
    assert_eq!(bus.nmi_count, 1);
    // Already enabled: rewriting does not fire again.
    ppu.write_register(0x2000, 0x80, &mut bus);
    assert_eq!(bus.nmi_count, 1);
}

#[test]
fn rollover_skips_a_dot_on_odd_frames() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);

    for _ in 0..21 * 341 + 1 {
        ppu.step(&mut bus);
    }
    assert_eq!((ppu.cycle(), ppu.scanline(), ppu.frame()), (0, 0, 1));

    for _ in 0..262 * 341 {
        ppu.step(&mut bus);
    }
    assert_eq!((ppu.cycle(), ppu.scanline(), ppu.frame()), (1, 0, 2));

    for _ in 0..262 * 341 - 1 {
        ppu.step(&mut bus);
    }
    assert_eq!((ppu.cycle(), ppu.scanline(), ppu.frame()), (0, 0, 3));
}

#[test]
fn status_read_clears_vblank_and_toggle() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);
    run_to(&mut ppu, &mut bus, 241, 1);

    ppu.write_register(0x2005, 0x1F, &mut bus);
    assert!(ppu.write_toggle);

    let status = ppu.read_register(0x2002, &mut bus);
    assert_eq!(status, 0x80 | 0x1F);
    assert!(!ppu.write_toggle);
    assert_eq!(ppu.read_register(0x2002, &mut bus) & 0x80, 0);
}

#[test]
fn registers_mirror_every_eight_bytes() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);
    ppu.write_register(0x3FF8, 0x04, &mut bus);
    assert!(ppu.control().contains(PpuCtrl::VRAM_INCREMENT));
    ppu.write_register(0x2009, 0x18, &mut bus);
    assert!(ppu.rendering_enabled());
}

#[test]
fn scroll_writes_fill_temp_pointer() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);
    ppu.write_register(0x2000, 0x03, &mut bus);
    ppu.write_register(0x2005, 0b0111_1101, &mut bus);
    ppu.write_register(0x2005, 0b0101_1110, &mut bus);

    assert_eq!(ppu.fine_x, 0b101);
    assert_eq!(ppu.vram_temp_pointer & 0x001F, 0b01111);
    assert_eq!((ppu.vram_temp_pointer >> 5) & 0x1F, 0b01011);
    assert_eq!((ppu.vram_temp_pointer >> 12) & 0x7, 0b110);
    assert_eq!((ppu.vram_temp_pointer >> 10) & 0x3, 0b11);
}

#[test]
fn data_reads_are_buffered_below_palette() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Vertical);

    set_address(&mut ppu, &mut bus, 0x2105);
    ppu.write_register(0x2007, 0xAA, &mut bus);
    ppu.write_register(0x2007, 0xBB, &mut bus);
    assert_eq!(ppu.vram_address(), 0x2107);

    set_address(&mut ppu, &mut bus, 0x2105);
    let _stale = ppu.read_register(0x2007, &mut bus);
    assert_eq!(ppu.read_register(0x2007, &mut bus), 0xAA);
    assert_eq!(ppu.read_register(0x2007, &mut bus), 0xBB);
}

#[test]
fn palette_reads_are_immediate() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);

    set_address(&mut ppu, &mut bus, 0x3F01);
    ppu.write_register(0x2007, 0x2C, &mut bus);
    set_address(&mut ppu, &mut bus, 0x3F01);
    assert_eq!(ppu.read_register(0x2007, &mut bus), 0x2C);
}

#[test]
fn increment_of_32_walks_columns() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);
    ppu.write_register(0x2000, PpuCtrl::VRAM_INCREMENT.bits(), &mut bus);
    set_address(&mut ppu, &mut bus, 0x2000);
    ppu.write_register(0x2007, 1, &mut bus);
    ppu.write_register(0x2007, 2, &mut bus);
    assert_eq!(ppu.vram_address(), 0x2040);
    assert_eq!(ppu.nametable[0x20], 2);
}

#[test]
fn palette_background_entries_alias() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);

    set_address(&mut ppu, &mut bus, 0x3F10);
    ppu.write_register(0x2007, 0x21, &mut bus);
    assert_eq!(ppu.palette_indices[0x00], 0x21);

    set_address(&mut ppu, &mut bus, 0x3F3C);
    ppu.write_register(0x2007, 0x05, &mut bus);
    assert_eq!(ppu.palette_indices[0x0C], 0x05);

    // Sprite entries that are not multiples of four stay distinct.
    set_address(&mut ppu, &mut bus, 0x3F11);
    ppu.write_register(0x2007, 0x16, &mut bus);
    assert_eq!(ppu.palette_indices[0x11], 0x16);
    assert_eq!(ppu.palette_indices[0x01], 0x00);
}

#[test]
fn nametables_follow_cartridge_mirroring() {
    let mut ppu = Ppu::new();

    let mut horizontal = TestPpuBus::new(Mirroring::Horizontal);
    set_address(&mut ppu, &mut horizontal, 0x2000);
    ppu.write_register(0x2007, 0x11, &mut horizontal);
    assert_eq!(ppu.read_vram(0x2400, &mut horizontal), 0x11);
    assert_eq!(ppu.read_vram(0x2800, &mut horizontal), 0x00);
    assert_eq!(ppu.read_vram(0x3000, &mut horizontal), 0x11);

    let mut vertical = TestPpuBus::new(Mirroring::Vertical);
    assert_eq!(ppu.read_vram(0x2800, &mut vertical), 0x11);
    assert_eq!(ppu.read_vram(0x2400, &mut vertical), 0x00);

    let mut quad = TestPpuBus::new(Mirroring::Quad);
    set_address(&mut ppu, &mut quad, 0x2C00);
    ppu.write_register(0x2007, 0x44, &mut quad);
    assert_eq!(ppu.read_vram(0x2C00, &mut quad), 0x44);
    assert_eq!(ppu.read_vram(0x2000, &mut quad), 0x11);
}

#[test]
fn pattern_accesses_reach_the_bus() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);
    set_address(&mut ppu, &mut bus, 0x0123);
    ppu.write_register(0x2007, 0x77, &mut bus);
    assert_eq!(bus.chr[0x0123], 0x77);
}

#[test]
fn oam_data_and_dma() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);
    ppu.write_register(0x2003, 0x10, &mut bus);
    ppu.write_register(0x2004, 0x42, &mut bus);
    assert_eq!(ppu.oam()[0x10], 0x42);
    assert_eq!(ppu.oam_pointer, 0x11);

    ppu.write_register(0x2003, 0xFE, &mut bus);
    let mut page = [0u8; 256];
    for (i, byte) in page.iter_mut().enumerate() {
        *byte = i as u8;
    }
    ppu.oam_dma(&page);
    assert_eq!(ppu.oam()[0xFE], 0x00);
    assert_eq!(ppu.oam()[0xFF], 0x01);
    assert_eq!(ppu.oam()[0x00], 0x02);

    ppu.write_register(0x2003, 0x05, &mut bus);
    assert_eq!(ppu.read_register(0x2004, &mut bus), 0x07);
}

fn solid_background() -> (Ppu, TestPpuBus) {
    let mut ppu = Ppu::new();
    let bus = TestPpuBus::new(Mirroring::Horizontal).with_solid_tile();
    ppu.nametable[..960].fill(1);
    ppu.palette_indices[0x00] = 0x0F;
    ppu.palette_indices[0x01] = 0x30;
    ppu.palette_indices[0x11] = 0x16;
    (ppu, bus)
}

#[test]
fn renders_background_tiles() {
    let (mut ppu, mut bus) = solid_background();
    ppu.write_register(0x2001, (PpuMask::SHOW_BG | PpuMask::SHOW_BG_LEFT).bits(), &mut bus);

    run_to(&mut ppu, &mut bus, 241, 1);
    ppu.mark_rendered();
    run_to(&mut ppu, &mut bus, 241, 1);

    assert!(ppu.needs_render());
    assert_eq!(pixel(&ppu, 0, 0), NES_PALETTE[0x30]);
    assert_eq!(pixel(&ppu, 100, 50), NES_PALETTE[0x30]);
    assert_eq!(pixel(&ppu, 255, 239), NES_PALETTE[0x30]);
}

#[test]
fn left_column_clipping_shows_backdrop() {
    let (mut ppu, mut bus) = solid_background();
    ppu.write_register(0x2001, PpuMask::SHOW_BG.bits(), &mut bus);

    run_to(&mut ppu, &mut bus, 241, 1);
    run_to(&mut ppu, &mut bus, 241, 1);

    assert_eq!(pixel(&ppu, 7, 20), NES_PALETTE[0x0F]);
    assert_eq!(pixel(&ppu, 8, 20), NES_PALETTE[0x30]);
}

#[test]
fn sprite_zero_hit_and_composition() {
    let (mut ppu, mut bus) = solid_background();
    ppu.oam.fill(0xFF);
    ppu.oam[..4].copy_from_slice(&[10, 1, 0x00, 20]);
    ppu.write_register(0x2001, 0x1E, &mut bus);

    run_to(&mut ppu, &mut bus, 241, 1);
    run_to(&mut ppu, &mut bus, 241, 1);

    assert!(ppu.status().contains(PpuStatus::SPRITE_ZERO_HIT));
    assert!(!ppu.status().contains(PpuStatus::SPRITE_OVERFLOW));
    // Sprites evaluated on line N are drawn on line N + 1.
    assert_eq!(pixel(&ppu, 20, 11), NES_PALETTE[0x16]);
    assert_eq!(pixel(&ppu, 27, 18), NES_PALETTE[0x16]);
    assert_eq!(pixel(&ppu, 20, 10), NES_PALETTE[0x30]);
    assert_eq!(pixel(&ppu, 28, 11), NES_PALETTE[0x30]);
}

#[test]
fn background_priority_keeps_background_in_front() {
    let (mut ppu, mut bus) = solid_background();
    ppu.oam.fill(0xFF);
    ppu.oam[..4].copy_from_slice(&[10, 1, 0x20, 20]);
    ppu.write_register(0x2001, 0x1E, &mut bus);

    run_to(&mut ppu, &mut bus, 241, 1);
    run_to(&mut ppu, &mut bus, 241, 1);

    assert!(ppu.status().contains(PpuStatus::SPRITE_ZERO_HIT));
    assert_eq!(pixel(&ppu, 20, 11), NES_PALETTE[0x30]);
}

#[test]
fn ninth_sprite_sets_overflow() {
    let (mut ppu, mut bus) = solid_background();
    ppu.oam.fill(0xFF);
    for i in 0..9 {
        ppu.oam[i * 4..i * 4 + 4].copy_from_slice(&[40, 1, 0, (i * 8) as u8]);
    }
    ppu.write_register(0x2001, 0x1E, &mut bus);

    run_to(&mut ppu, &mut bus, 241, 1);
    run_to(&mut ppu, &mut bus, 241, 1);

    assert!(ppu.status().contains(PpuStatus::SPRITE_OVERFLOW));
    assert_eq!(pixel(&ppu, 63, 41), NES_PALETTE[0x16]);
    // The ninth sprite is dropped.
    assert_eq!(pixel(&ppu, 64, 41), NES_PALETTE[0x30]);
}

#[test]
fn horizontal_flip_mirrors_sprite_row() {
    let (mut ppu, mut bus) = solid_background();
    for row in 0..8 {
        bus.chr[32 + row] = 0xF0;
    }
    ppu.nametable[..960].fill(0);
    ppu.oam.fill(0xFF);
    ppu.oam[..4].copy_from_slice(&[50, 2, 0x40, 100]);
    ppu.write_register(0x2001, 0x1E, &mut bus);

    run_to(&mut ppu, &mut bus, 241, 1);
    run_to(&mut ppu, &mut bus, 241, 1);

    assert_eq!(pixel(&ppu, 100, 51), NES_PALETTE[0x0F]);
    assert_eq!(pixel(&ppu, 104, 51), NES_PALETTE[0x16]);
    assert_eq!(pixel(&ppu, 107, 51), NES_PALETTE[0x16]);
}

#[test]
fn rendering_disabled_still_swaps_frames() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);
    run_to(&mut ppu, &mut bus, 241, 1);
    ppu.mark_rendered();
    assert!(!ppu.needs_render());

    run_to(&mut ppu, &mut bus, 241, 1);
    assert!(ppu.needs_render());
    assert!(ppu.frame_buffer().iter().all(|&b| b == 0));
}

#[test]
fn reset_restores_power_up_counters() {
    let mut ppu = Ppu::new();
    let mut bus = TestPpuBus::new(Mirroring::Horizontal);
    ppu.write_register(0x2000, 0x80, &mut bus);
    run_to(&mut ppu, &mut bus, 100, 17);

    ppu.reset();
    assert_eq!((ppu.cycle(), ppu.scanline(), ppu.frame()), (340, 240, 0));
    assert!(ppu.control().is_empty());
}
