// ABOUTME: Main application entry point.
// ABOUTME: Parses the command line, loads config, and runs the window or headless host.

mod content;
mod headless;
mod window_host;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use winit::event_loop::EventLoop;

use crt_core::{Config, SampleMode};
use crt_effects::{rng_from_seed, FrameLoop};
use content::Content;
use window_host::App;

#[derive(Parser)]
#[command(name = "crt-mask", version, about = "CRT screen effect overlay")]
struct Cli {
    /// Config file (defaults to ~/.config/crt-mask/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base scanline opacity
    #[arg(long, global = true)]
    scanline_intensity: Option<f32>,

    /// Peak-to-peak channel noise, in 8-bit units
    #[arg(long, global = true)]
    noise_intensity: Option<f32>,

    /// Barrel curvature coefficient k (negative for pincushion)
    #[arg(long, global = true, allow_negative_numbers = true)]
    distortion_strength: Option<f64>,

    /// Bilinear sampling in the distortion pass
    #[arg(long, global = true)]
    bilinear: bool,

    /// Disable brightness flicker
    #[arg(long, global = true)]
    no_flicker: bool,

    /// Seed for noise and flicker
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show the effect live in a window (default)
    Window {
        /// Image to show under the effect instead of the test pattern
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Render an image through the effect to a PNG file
    Render {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Frames to run before writing the last one
        #[arg(long, default_value_t = 1)]
        frames: u32,
    },
    /// Write the effective configuration to the config file
    SaveConfig,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                Config::load(path).with_context(|| format!("loading {}", path.display()))?
            }
            None => Config::load_or_default(),
        };

        let effects = &mut config.effects;
        if let Some(v) = self.scanline_intensity {
            effects.scanline_intensity = v;
        }
        if let Some(v) = self.noise_intensity {
            effects.noise_intensity = v;
        }
        if let Some(v) = self.distortion_strength {
            effects.distortion_strength = v;
        }
        if self.bilinear {
            effects.sample_mode = SampleMode::Bilinear;
        }
        if self.no_flicker {
            effects.flicker_enabled = false;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }

        config.effects.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = cli.load_config()?;
    tracing::info!("Effect settings: {:?}", config.effects);

    match cli.command.unwrap_or(Command::Window { image: None }) {
        Command::Window { image } => {
            let content = match image {
                Some(path) => Content::open(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => Content::TestPattern,
            };
            let frame_loop = FrameLoop::new(config.effects.clone(), rng_from_seed(config.seed))?;

            tracing::info!("Starting crt-mask");
            let event_loop = EventLoop::new()?;
            let mut app = App::new(config.window.clone(), frame_loop, content);
            event_loop.run_app(&mut app)?;
        }
        Command::Render {
            input,
            output,
            frames,
        } => {
            headless::render_file(
                config.effects.clone(),
                rng_from_seed(config.seed),
                &input,
                &output,
                frames,
            )?;
        }
        Command::SaveConfig => {
            let path = match &cli.config {
                Some(path) => {
                    config.save(path)?;
                    path.clone()
                }
                None => config.save_to_default()?,
            };
            tracing::info!("Config saved to {}", path.display());
        }
    }

    Ok(())
}
