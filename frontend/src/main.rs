use std::{path::PathBuf, thread, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use chip8_vm_core::{
    ChannelKeyboard, Chip8Builder, Chip8Color, FrameSlot, Key, KeyWaitMode, Palette,
    SCREEN_HEIGHT, SCREEN_WIDTH,
};
use clap::Parser;
use log::{error, info, LevelFilter};
use sdl2::{event::Event, keyboard::Keycode, pixels::PixelFormatEnum};

/// UI refresh period.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// CHIP-8 virtual machine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Filepath to Chip-8 ROM file that will be executed
    #[clap(index = 1)]
    rom: PathBuf,

    /// Filepath to font file (80 bytes, 16 glyphs of 5 rows)
    #[clap(long)]
    font: Option<PathBuf>,

    /// Background Color as HEX 0xAABBFF [default: 0x000000]
    #[clap(long)]
    background: Option<Chip8Color>,

    /// Foreground Color as HEX 0xAABBFF [default: 0xFFFFFF]
    #[clap(long)]
    foreground: Option<Chip8Color>,

    /// Display scaling factor
    #[clap(short, long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=100))]
    scale: u32,

    /// Instructions per second
    #[clap(short, long, default_value_t = 700, value_parser = clap::value_parser!(u32).range(1..=1_000_000))]
    ips: u32,

    /// PRNG seed
    #[clap(long)]
    seed: Option<u64>,

    /// Stop execution instead of failing when a key wait is cancelled
    #[clap(long)]
    interruptible: bool,

    /// Trace every executed instruction
    #[clap(short, long)]
    debug: bool,
}

/// 1 2 3 4      1 2 3 C
/// Q W E R  ->  4 5 6 D
/// A S D F      7 8 9 E
/// Z X C V      A 0 B F
fn keymap(keycode: Keycode) -> Option<Key> {
    let key = match keycode {
        Keycode::Num1 => Key::K1,
        Keycode::Num2 => Key::K2,
        Keycode::Num3 => Key::K3,
        Keycode::Num4 => Key::KC,
        Keycode::Q => Key::K4,
        Keycode::W => Key::K5,
        Keycode::E => Key::K6,
        Keycode::R => Key::KD,
        Keycode::A => Key::K7,
        Keycode::S => Key::K8,
        Keycode::D => Key::K9,
        Keycode::F => Key::KE,
        Keycode::Z => Key::KA,
        Keycode::X => Key::K0,
        Keycode::C => Key::KB,
        Keycode::V => Key::KF,
        _ => return None,
    };
    Some(key)
}

fn init_logger(debug: bool) {
    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);
    if debug {
        builder.filter_module("chip8_vm_core", LevelFilter::Trace);
    }
    builder.init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.debug);

    let (keyboard, keypad) = ChannelKeyboard::new();
    let frames = FrameSlot::default();

    let rom_data = std::fs::read(&args.rom)
        .with_context(|| format!("Failed to read ROM file {}", args.rom.display()))?;

    let mut builder = Chip8Builder::new()
        .with_rom(rom_data)
        .with_keyboard(keyboard)
        .with_display_sink(frames.clone())
        .with_ips(args.ips);

    if let Some(font) = &args.font {
        let font_data = std::fs::read(font)
            .with_context(|| format!("Failed to read font file {}", font.display()))?;
        builder = builder.with_font(font_data);
    }

    if let Some(seed) = args.seed {
        builder = builder.with_rng_seed(seed);
    }

    if args.interruptible {
        builder = builder.with_key_wait(KeyWaitMode::Interruptible);
    }

    let mut palette = Palette::default();
    if let Some(foreground) = args.foreground {
        palette.foreground = foreground;
    }
    if let Some(background) = args.background {
        palette.background = background;
    }

    let sdl_context = sdl2::init()
        .map_err(|e| anyhow!(e))
        .context("Failed to initialize SDL")?;
    let video_subsystem = sdl_context
        .video()
        .map_err(|e| anyhow!(e))
        .context("Failed to initialize SDL video")?;

    let window = video_subsystem
        .window(
            "chip8-vm",
            SCREEN_WIDTH as u32 * args.scale,
            SCREEN_HEIGHT as u32 * args.scale,
        )
        .position_centered()
        .build()
        .context("Failed to create window")?;

    let mut canvas = window
        .into_canvas()
        .build()
        .context("Failed to create canvas")?;

    let bg = palette.background;
    canvas.set_draw_color(sdl2::pixels::Color::RGB(bg.r, bg.g, bg.b));
    canvas.clear();
    canvas.present();

    let texture_creator = canvas.texture_creator();
    let mut texture = texture_creator
        .create_texture_streaming(
            PixelFormatEnum::RGBX8888,
            SCREEN_WIDTH as u32,
            SCREEN_HEIGHT as u32,
        )
        .context("Failed to create texture")?;

    let mut event_pump = sdl_context
        .event_pump()
        .map_err(|e| anyhow!(e))
        .context("Failed to create event pump")?;

    let mut chip = builder.build().context("Failed to start CHIP-8")?;
    let halt = chip.halt_handle();
    let engine = thread::Builder::new()
        .name("engine".into())
        .spawn(move || chip.run())
        .context("Failed to spawn engine thread")?;

    let mut pixels: Vec<Chip8Color> = Vec::with_capacity(SCREEN_WIDTH * SCREEN_HEIGHT);

    'running: loop {
        // Process events
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'running,
                Event::KeyDown {
                    keycode: Some(keycode),
                    repeat: false,
                    ..
                } => {
                    if let Some(key) = keymap(keycode) {
                        keypad.press(key);
                    }
                }
                Event::KeyUp {
                    keycode: Some(keycode),
                    ..
                } => {
                    if let Some(key) = keymap(keycode) {
                        keypad.release(key);
                    }
                }
                _ => {}
            }
        }

        if engine.is_finished() {
            break 'running;
        }

        // Draw the newest frame if the engine presented one
        if let Some(frame) = frames.take() {
            // Copy CHIP-8 display buffer into GPU texture
            palette.render(&frame, &mut pixels);
            texture
                .update(None, Palette::as_bytes(&pixels), SCREEN_WIDTH * 4)
                .context("Failed to update texture")?;

            // Copy texture to Canvas
            canvas
                .copy(&texture, None, None)
                .map_err(|e| anyhow!(e))
                .context("Failed to copy texture")?;

            // present canvas on screen
            canvas.present();
        }

        thread::sleep(FRAME_INTERVAL);
    }

    // Release a key wait in progress
    halt.halt();
    keypad.interrupt();

    match engine.join() {
        Ok(Ok(())) => {
            info!("Bye");
            Ok(())
        }
        Ok(Err(err)) => {
            error!("CHIP-8 stopped: {}", err);
            Err(err).context("CHIP-8 execution failed")
        }
        Err(_) => bail!("Engine thread panicked"),
    }
}
