pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod console;
pub mod cpu;
pub mod input;
pub mod memory;
pub mod ppu;

pub use cartridge::{Cartridge, Mirroring, RomError};
pub use console::Console;
pub use cpu::CpuError;
pub use input::ControllerButton;
