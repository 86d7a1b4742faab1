use clap::Parser;
use winit::event_loop::EventLoop;

use cae::app::App;
use cae::config::{self, Config};

/// 1D Cellular Automaton Engine with GPU acceleration.
#[derive(Parser, Debug)]
#[command(name = "cae", version, about)]
struct Args {
    /// Wolfram CA rule number (0-255)
    #[arg(short, long)]
    rule: u8,

    /// Initial state as a binary string (e.g. "00100"); default is a
    /// single cell at world column 0
    #[arg(short = 's', long)]
    initial_state: Option<String>,

    /// Window width in pixels
    #[arg(long, default_value_t = config::DEFAULT_WIDTH)]
    width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = config::DEFAULT_HEIGHT)]
    height: u32,

    /// Start in fullscreen mode
    #[arg(short, long)]
    fullscreen: bool,

    /// Debounce time in milliseconds before recomputing after a viewport
    /// change
    #[arg(long, default_value_t = config::DEFAULT_DEBOUNCE_MS)]
    debounce_ms: u64,

    /// Maximum number of tiles to cache (0 disables caching)
    #[arg(long, default_value_t = config::DEFAULT_CACHE_TILES)]
    cache_tiles: usize,

    /// Cache tile side length in cells
    #[arg(long, default_value_t = config::DEFAULT_TILE_SIZE)]
    cache_tile_size: u32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config {
        rule: args.rule,
        initial_state: args.initial_state,
        width: args.width,
        height: args.height,
        debounce_ms: args.debounce_ms,
        fullscreen: args.fullscreen,
        cache_tiles: args.cache_tiles,
        tile_size: args.cache_tile_size,
    };

    let errors = config.validate();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("error: {error}");
        }
        eprintln!();
        eprintln!("For more information, try '--help'.");
        std::process::exit(1);
    }

    print_banner(&config);

    let event_loop = EventLoop::new().expect("failed to create event loop");
    let mut app = App::new(config);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("event loop error: {e}");
        std::process::exit(1);
    }
}

fn print_banner(config: &Config) {
    let seed_display = match &config.initial_state {
        Some(s) if s.len() > 30 => format!("{}...", &s[..27]),
        Some(s) if !s.is_empty() => s.clone(),
        _ => "1 (single cell)".to_owned(),
    };

    let bar = "═".repeat(50);
    println!("╔{bar}╗");
    println!("║ {:<48} ║", "CAE - Cellular Automaton Engine");
    println!("╠{bar}╣");
    println!("║ {:<48} ║", format!("Rule: {}", config.rule));
    println!("║ {:<48} ║", format!("Initial state: {seed_display}"));
    println!("╠{bar}╣");
    println!("║ {:<48} ║", "Controls:");
    println!("║ {:<48} ║", " • Drag to pan");
    println!("║ {:<48} ║", " • Scroll wheel to zoom");
    println!("║ {:<48} ║", " • 0: Reset viewport");
    println!("║ {:<48} ║", " • F11: Toggle fullscreen");
    println!("║ {:<48} ║", " • Esc: Exit");
    println!("╚{bar}╝");
    println!();
}
