use std::env;

use anyhow::{Context, Result};
use nes_emu::{Cartridge, Console};

const DEFAULT_FRAMES: u32 = 60;
const REPORT_EVERY: u32 = 20;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <rom_file> [frames]", args[0]);
        std::process::exit(1);
    }

    let rom_path = &args[1];
    let frames = match args.get(2) {
        Some(count) => count
            .parse()
            .with_context(|| format!("invalid frame count {:?}", count))?,
        None => DEFAULT_FRAMES,
    };

    let cartridge =
        Cartridge::load_from_file(rom_path).with_context(|| format!("failed to load {}", rom_path))?;
    let mut console = Console::new(cartridge, None);

    for frame in 0..frames {
        console.run_frame()?;
        if frame % REPORT_EVERY != 0 && frame + 1 != frames {
            continue;
        }

        let buffer = console.framebuffer();
        let lit = buffer.chunks(3).filter(|pixel| pixel.iter().any(|&c| c != 0)).count();
        let mut colors: Vec<&[u8]> = Vec::new();
        for pixel in buffer.chunks(3) {
            if !colors.contains(&pixel) {
                colors.push(pixel);
                if colors.len() >= 5 {
                    break;
                }
            }
        }

        let ppu = console.ppu();
        println!(
            "Frame {}: {} lit pixels of {} | ctrl {:02X} mask {:02X} status {:02X}",
            frame,
            lit,
            buffer.len() / 3,
            ppu.control().bits(),
            ppu.mask().bits(),
            ppu.status().bits()
        );
        println!("  First colors: {:?}", colors);
    }

    let cpu = console.cpu();
    println!(
        "CPU  PC:{:04X} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
        cpu.pc,
        cpu.a,
        cpu.x,
        cpu.y,
        cpu.status(),
        cpu.sp,
        cpu.total_cycles()
    );
    println!("Next: {}", console.disassemble(cpu.pc));
    Ok(())
}
