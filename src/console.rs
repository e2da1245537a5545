use std::time::Duration;

use crate::apu::Apu;
use crate::bus::{Bus, Interrupt, Signals};
use crate::cartridge::{Cartridge, Mirroring};
use crate::cpu::{disassemble, Cpu, CpuError, CPU_FREQUENCY};
use crate::input::Controller;
use crate::memory::Ram;
use crate::ppu::{Ppu, PpuBus};

/// PPU dots per CPU cycle on NTSC.
const PPU_CLOCK_RATIO: u32 = 3;
const OAM_DMA_STALL: u16 = 513;

/// The console: a CPU driving everything else through the board.
pub struct Console {
    cpu: Cpu,
    board: Board,
    deficit: f64,
}

/// Everything on the CPU address bus.
struct Board {
    ram: Ram,
    ppu: Ppu,
    apu: Apu,
    cartridge: Cartridge,
    controllers: [Controller; 2],
    signals: Signals,
}

/// What the PPU can reach while the board lends it the cartridge.
struct PpuView<'a> {
    cartridge: &'a mut Cartridge,
    signals: &'a mut Signals,
}

impl PpuBus for PpuView<'_> {
    fn read_chr(&mut self, address: u16) -> u8 {
        self.cartridge.read_chr(address)
    }

    fn write_chr(&mut self, address: u16, value: u8) {
        self.cartridge.write_chr(address, value);
    }

    fn mirroring(&self) -> Mirroring {
        self.cartridge.mirroring()
    }

    fn trigger_nmi(&mut self) {
        self.signals.raise(Interrupt::Nmi);
    }
}

impl Board {
    fn ppu_step(&mut self) {
        let mut view = PpuView {
            cartridge: &mut self.cartridge,
            signals: &mut self.signals,
        };
        self.ppu.step(&mut view);
    }

    fn oam_dma(&mut self, page: u8) {
        let base = (page as u16) << 8;
        let mut data = [0u8; 256];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = self.read_byte(base | i as u16);
        }
        self.ppu.oam_dma(&data);
        self.block(OAM_DMA_STALL);
    }

    fn peek(&self, address: u16) -> u8 {
        match address {
            0x0000..=0x1FFF => self.ram.read(address),
            0x6000..=0xFFFF => self.cartridge.read(address),
            _ => 0,
        }
    }
}

impl Bus for Board {
    fn read_byte(&mut self, address: u16) -> u8 {
        match address {
            0x0000..=0x1FFF => self.ram.read(address),
            0x2000..=0x3FFF => {
                let mut view = PpuView {
                    cartridge: &mut self.cartridge,
                    signals: &mut self.signals,
                };
                self.ppu.read_register(address, &mut view)
            }
            0x4016 => self.controllers[0].read(),
            0x4017 => self.controllers[1].read(),
            0x4000..=0x4015 => self.apu.read_register(address),
            0x4018..=0x5FFF => 0,
            0x6000..=0xFFFF => self.cartridge.read(address),
        }
    }

    fn write_byte(&mut self, address: u16, data: u8) {
        match address {
            0x0000..=0x1FFF => self.ram.write(address, data),
            0x2000..=0x3FFF => {
                let mut view = PpuView {
                    cartridge: &mut self.cartridge,
                    signals: &mut self.signals,
                };
                self.ppu.write_register(address, data, &mut view);
            }
            0x4014 => self.oam_dma(data),
            0x4016 => {
                for controller in &mut self.controllers {
                    controller.write(data);
                }
            }
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write_register(address, data),
            0x4018..=0x5FFF => log::trace!("open bus write {:04X} = {:02X}", address, data),
            0x6000..=0xFFFF => self.cartridge.write(address, data),
        }
    }

    fn trigger_interrupt(&mut self, kind: Interrupt) {
        self.signals.raise(kind);
    }

    fn block(&mut self, cycles: u16) {
        self.signals.block(cycles);
    }
}

impl Console {
    /// Builds a powered-on console. `save_ram` restores battery-backed SRAM.
    pub fn new(mut cartridge: Cartridge, save_ram: Option<&[u8]>) -> Self {
        if let Some(data) = save_ram {
            cartridge.load_sram(data);
        }
        let mut console = Console {
            cpu: Cpu::new(),
            board: Board {
                ram: Ram::new(),
                ppu: Ppu::new(),
                apu: Apu::new(),
                cartridge,
                controllers: [Controller::new(), Controller::new()],
                signals: Signals::default(),
            },
            deficit: 0.0,
        };
        console.reset();
        console
    }

    /// Soft reset. The reset vector is taken on the next step.
    pub fn reset(&mut self) {
        log::info!("Console reset");
        self.board.ppu.reset();
        self.board.apu.reset();
        self.board.cartridge.reset();
        for controller in &mut self.board.controllers {
            controller.reset();
        }
        self.board.signals = Signals::default();
        self.deficit = 0.0;
        self.cpu.reset();
    }

    /// One CPU step with the PPU and APU caught up behind it. Returns the
    /// CPU cycles consumed.
    pub fn step(&mut self) -> Result<u8, CpuError> {
        let cycles = self.cpu.step(&mut self.board)?;

        for _ in 0..cycles as u32 * PPU_CLOCK_RATIO {
            self.board.ppu_step();
        }
        self.board.apu.step(cycles);

        let signals = self.board.signals.take();
        if let Some(kind) = signals.interrupt {
            self.cpu.trigger_interrupt(kind);
        }
        if signals.stall > 0 {
            self.cpu.block(signals.stall);
        }
        Ok(cycles)
    }

    /// Emulates `delta` of wall-clock time. Overshoot is carried into the
    /// next call.
    pub fn run(&mut self, delta: Duration) -> Result<(), CpuError> {
        let mut budget = delta.as_secs_f64() * CPU_FREQUENCY as f64 + self.deficit;
        while budget > 0.0 {
            budget -= self.step()? as f64;
        }
        self.deficit = budget;
        Ok(())
    }

    /// Steps until the PPU starts a new frame.
    pub fn run_frame(&mut self) -> Result<(), CpuError> {
        let frame = self.board.ppu.frame();
        while self.board.ppu.frame() == frame {
            self.step()?;
        }
        Ok(())
    }

    /// Sets the full button byte of controller `player` (0 or 1).
    pub fn set_inputs(&mut self, value: u8, player: usize) {
        match self.board.controllers.get_mut(player) {
            Some(controller) => controller.set_buttons(value),
            None => log::warn!("No controller port {}", player),
        }
    }

    pub fn controller_mut(&mut self, player: usize) -> Option<&mut Controller> {
        self.board.controllers.get_mut(player)
    }

    pub fn framebuffer(&self) -> &[u8] {
        self.board.ppu.frame_buffer()
    }

    pub fn needs_render(&self) -> bool {
        self.board.ppu.needs_render()
    }

    pub fn mark_rendered(&mut self) {
        self.board.ppu.mark_rendered();
    }

    pub fn save_ram(&self) -> &[u8] {
        &self.board.cartridge.sram
    }

    pub fn checksum(&self) -> u32 {
        self.board.cartridge.checksum()
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn ppu(&self) -> &Ppu {
        &self.board.ppu
    }

    pub fn apu(&self) -> &Apu {
        &self.board.apu
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.board.cartridge
    }

    /// Reads RAM or cartridge space without side effects. I/O registers
    /// read as 0.
    pub fn peek(&self, address: u16) -> u8 {
        self.board.peek(address)
    }

    /// Disassembles the instruction at `address`.
    pub fn disassemble(&self, address: u16) -> String {
        disassemble(address, |a| self.board.peek(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::MapperType;

    /// NROM board with one 16 KB bank: `program` at $8000, reset vector
    /// pointing at it.
    fn console_with(program: &[u8]) -> Console {
        let mut prg = vec![0xEA; 0x4000];
        prg[..program.len()].copy_from_slice(program);
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0x80;
        let cartridge = Cartridge::new(prg, Vec::new(), MapperType::Nrom, Mirroring::Horizontal);
        Console::new(cartridge, None)
    }

    #[test]
    fn first_step_takes_reset_vector() {
        let mut console = console_with(&[]);
        assert_eq!(console.step(), Ok(7));
        assert_eq!(console.cpu().pc, 0x8000);
        assert_eq!(console.ppu().frame(), 0);
    }

    #[test]
    fn ppu_runs_three_dots_per_cycle() {
        let mut console = console_with(&[0x4C, 0x34, 0x12]);
        console.step().unwrap();
        // 7 reset cycles from dot 340 of line 240.
        assert_eq!((console.ppu().scanline(), console.ppu().cycle()), (241, 20));

        assert_eq!(console.step(), Ok(3));
        assert_eq!(console.cpu().pc, 0x1234);
        assert_eq!(console.ppu().cycle(), 29);
    }

    #[test]
    fn ram_is_mirrored() {
        // LDA #$5A; STA $0000; LDA $0800
        let mut console = console_with(&[0xA9, 0x5A, 0x85, 0x00, 0xA9, 0x00, 0xAD, 0x00, 0x08]);
        for _ in 0..5 {
            console.step().unwrap();
        }
        assert_eq!(console.cpu().a, 0x5A);
        assert_eq!(console.peek(0x1800), 0x5A);
    }

    #[test]
    fn open_bus_region_reads_zero() {
        // LDA #$FF; LDA $5000
        let mut console = console_with(&[0xA9, 0xFF, 0xAD, 0x00, 0x50]);
        for _ in 0..3 {
            console.step().unwrap();
        }
        assert_eq!(console.cpu().a, 0);
    }

    #[test]
    fn dma_stalls_cpu_for_513_cycles() {
        // LDA #$02; STA $4014
        let mut console = console_with(&[0xA9, 0x02, 0x8D, 0x14, 0x40, 0xEA]);
        console.step().unwrap();
        console.step().unwrap();
        console.step().unwrap();
        assert_eq!(console.cpu().stall_cycles(), 513);

        let mut stalled = 0;
        while console.cpu().stall_cycles() > 0 {
            assert_eq!(console.step(), Ok(1));
            stalled += 1;
        }
        assert_eq!(stalled, 513);
        assert_eq!(console.cpu().pc, 0x8005);
    }

    #[test]
    fn set_inputs_reaches_port() {
        // LDA #1; STA $4016; LDA #0; STA $4016; LDA $4016; LDA $4016
        let mut console = console_with(&[
            0xA9, 0x01, 0x8D, 0x16, 0x40, 0xA9, 0x00, 0x8D, 0x16, 0x40, 0xAD, 0x16, 0x40, 0xAD,
            0x16, 0x40,
        ]);
        console.set_inputs(0b0000_0010, 0);
        console.set_inputs(0xFF, 7);

        for _ in 0..6 {
            console.step().unwrap();
        }
        assert_eq!(console.cpu().a, 0);
        console.step().unwrap();
        assert_eq!(console.cpu().a, 1);
    }

    #[test]
    fn run_carries_deficit() {
        let mut console = console_with(&[0x4C, 0x00, 0x80]);
        console.run(Duration::from_micros(100)).unwrap();
        assert!(console.deficit <= 0.0);
        assert!(console.deficit > -7.0);

        let before = console.cpu().total_cycles();
        console.run(Duration::from_millis(1)).unwrap();
        let ran = (console.cpu().total_cycles() - before) as f64;
        assert!((ran - CPU_FREQUENCY as f64 / 1000.0).abs() < 10.0);
    }

    #[test]
    fn unknown_opcode_stops_the_console() {
        let mut console = console_with(&[0x02]);
        console.step().unwrap();
        assert_eq!(
            console.step(),
            Err(CpuError::UnknownOpcode { opcode: 0x02, pc: 0x8000 })
        );
        assert!(console.run(Duration::from_millis(1)).is_err());
    }

    #[test]
    fn save_ram_round_trips() {
        let mut prg = vec![0xEA; 0x4000];
        prg[0x3FFD] = 0x80;
        let cartridge = Cartridge::new(prg, Vec::new(), MapperType::Nrom, Mirroring::Vertical);
        let mut save = vec![0u8; 0x2000];
        save[0x10] = 0x99;

        let console = Console::new(cartridge, Some(&save));
        assert_eq!(console.save_ram()[0x10], 0x99);
        assert_eq!(console.peek(0x6010), 0x99);
    }

    #[test]
    fn disassembles_from_the_bus() {
        let console = console_with(&[0x8D, 0x14, 0x40]);
        assert_eq!(console.disassemble(0x8000), "STA $4014");
    }
}
