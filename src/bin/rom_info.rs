use std::env;

use anyhow::{Context, Result};
use nes_emu::cartridge::{Cartridge, CHR_BANK_SIZE, PRG_BANK_SIZE};
use nes_emu::Console;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <rom_file>", args[0]);
        std::process::exit(1);
    }

    let rom_path = &args[1];
    let cartridge =
        Cartridge::load_from_file(rom_path).with_context(|| format!("failed to load {}", rom_path))?;

    println!("=== {} ===", rom_path);
    println!(
        "Mapper: {} ({:?})",
        cartridge.mapper_type.number(),
        cartridge.mapper_type
    );
    println!("Mirroring: {:?}", cartridge.mirroring());
    println!(
        "PRG ROM: {} KB in {} bank(s)",
        cartridge.prg_rom.len() / 1024,
        cartridge.prg_bank_count(PRG_BANK_SIZE)
    );
    if cartridge.chr_is_ram {
        println!("CHR RAM: {} KB", cartridge.chr_rom.len() / 1024);
    } else {
        println!(
            "CHR ROM: {} KB in {} bank(s)",
            cartridge.chr_rom.len() / 1024,
            cartridge.chr_bank_count(CHR_BANK_SIZE)
        );
    }
    println!("Battery: {}", cartridge.battery_backed);
    println!("Checksum: {:08X}", cartridge.checksum());

    let console = Console::new(cartridge, None);
    let vector = |address: u16| u16::from_le_bytes([console.peek(address), console.peek(address + 1)]);
    let reset = vector(0xFFFC);
    println!("\n=== Vectors ===");
    println!("NMI:   {:04X}", vector(0xFFFA));
    println!("RESET: {:04X}", reset);
    println!("IRQ:   {:04X}", vector(0xFFFE));

    println!("\n=== Code at reset ===");
    let mut address = reset;
    for _ in 0..8 {
        let text = console.disassemble(address);
        println!("{:04X}  {}", address, text);
        let opcode = nes_emu::cpu::OPCODES[console.peek(address) as usize];
        address = address.wrapping_add(opcode.map_or(1, |op| op.mode.size()));
    }

    Ok(())
}
