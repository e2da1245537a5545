use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;

use nes_emu::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use nes_emu::{Cartridge, Console, ControllerButton};

const SCALE: u32 = 3;
/// Upper bound on emulated time per iteration after the window stalls.
const MAX_DELTA: Duration = Duration::from_millis(50);

/// SDL reports errors as assorted `Display` types.
fn sdl<T, E: Display>(result: std::result::Result<T, E>, what: &str) -> Result<T> {
    result.map_err(|e| anyhow!("{} failed: {}", what, e))
}

fn button_for(key: Keycode) -> ControllerButton {
    match key {
        Keycode::Z => ControllerButton::A,
        Keycode::X => ControllerButton::B,
        Keycode::RShift => ControllerButton::SELECT,
        Keycode::Return => ControllerButton::START,
        Keycode::Up => ControllerButton::UP,
        Keycode::Down => ControllerButton::DOWN,
        Keycode::Left => ControllerButton::LEFT,
        Keycode::Right => ControllerButton::RIGHT,
        _ => ControllerButton::empty(),
    }
}

fn save_path(rom_path: &Path) -> PathBuf {
    rom_path.with_extension("sav")
}

fn run_window(console: &mut Console) -> Result<()> {
    let context = sdl(sdl2::init(), "SDL init")?;
    let video = sdl(context.video(), "Video subsystem")?;
    let window = sdl(
        video
            .window("NES Emulator", SCREEN_WIDTH as u32 * SCALE, SCREEN_HEIGHT as u32 * SCALE)
            .position_centered()
            .build(),
        "Window creation",
    )?;
    let mut canvas = sdl(window.into_canvas().accelerated().present_vsync().build(), "Canvas creation")?;
    let creator = canvas.texture_creator();
    let mut texture = sdl(
        creator.create_texture_streaming(PixelFormatEnum::RGB24, SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32),
        "Texture creation",
    )?;
    let mut events = sdl(context.event_pump(), "Event pump")?;

    let mut buttons = ControllerButton::empty();
    let mut last_tick = Instant::now();

    loop {
        for event in events.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => return Ok(()),
                Event::KeyDown {
                    keycode: Some(Keycode::R),
                    repeat: false,
                    ..
                } => console.reset(),
                Event::KeyDown {
                    keycode: Some(key), ..
                } => buttons.insert(button_for(key)),
                Event::KeyUp {
                    keycode: Some(key), ..
                } => buttons.remove(button_for(key)),
                _ => {}
            }
        }
        console.set_inputs(buttons.bits(), 0);

        let now = Instant::now();
        console.run((now - last_tick).min(MAX_DELTA))?;
        last_tick = now;

        if console.needs_render() {
            sdl(texture.update(None, console.framebuffer(), SCREEN_WIDTH * 3), "Texture update")?;
            console.mark_rendered();
        }

        // present_vsync paces the loop.
        canvas.clear();
        sdl(canvas.copy(&texture, None, None), "Canvas copy")?;
        canvas.present();
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <rom_file>", args[0]);
        std::process::exit(1);
    }

    let rom_path = Path::new(&args[1]);
    let cartridge = Cartridge::load_from_file(rom_path)
        .with_context(|| format!("failed to load {}", rom_path.display()))?;
    let battery_backed = cartridge.battery_backed;

    let save = battery_backed.then(|| fs::read(save_path(rom_path)).ok()).flatten();
    let mut console = Console::new(cartridge, save.as_deref());
    log::info!("Starting {} (checksum {:08X})", rom_path.display(), console.checksum());

    let outcome = run_window(&mut console);

    if battery_backed {
        let path = save_path(rom_path);
        fs::write(&path, console.save_ram()).with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("Saved battery RAM to {}", path.display());
    }

    log::info!("Emulation stopped.");
    outcome
}
