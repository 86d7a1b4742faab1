//! Tuning constants and runtime configuration.

/// Cell edge in pixels at zoom 1.
pub const DEFAULT_CELL_SIZE: u32 = 10;
pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 960;
pub const DEFAULT_DEBOUNCE_MS: u64 = 0;
pub const DEFAULT_CACHE_TILES: usize = 64;
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Zoom bounds as multiples of the default cell size.
pub const ZOOM_MIN: f32 = 0.1;
pub const ZOOM_MAX: f32 = 50.0;

/// Frame guards: when a recompute would exceed these, the frame is skipped
/// with a warning and the cache and output stay untouched.
pub const MIN_CELL_SIZE: u32 = 2;
pub const MAX_CELLS_X: u32 = 5000;
pub const MAX_CELLS_Y: u32 = 5000;
pub const MAX_TOTAL_CELLS: u64 = 10_000_000;

/// Kernel launches per device synchronisation in the buffer driver.
pub const COMPUTE_BATCH_SIZE: u32 = 32;

/// Compute shader workgroup size (columns per workgroup). Must match the
/// `@workgroup_size` in `shaders/step.wgsl`.
pub const WORKGROUP_SIZE: u32 = 256;

/// Minimum interval between render-parameter uploads while panning.
pub const RENDER_PARAMS_THROTTLE_MS: u64 = 16;

/// Runtime configuration, filled in from the CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Wolfram CA rule number (0-255).
    pub rule: u8,
    /// Initial state as a binary string; absent or empty means a single
    /// centre cell.
    pub initial_state: Option<String>,
    /// Window width in pixels.
    pub width: u32,
    /// Window height in pixels.
    pub height: u32,
    /// Delay between a viewport change and the recompute.
    pub debounce_ms: u64,
    /// Start in fullscreen mode.
    pub fullscreen: bool,
    /// Maximum number of cached tiles; 0 disables caching.
    pub cache_tiles: usize,
    /// Tile side length in cells.
    pub tile_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rule: 30,
            initial_state: None,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            fullscreen: false,
            cache_tiles: DEFAULT_CACHE_TILES,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl Config {
    /// Returns the accumulated validation errors; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(state) = &self.initial_state {
            if state.bytes().any(|b| b != b'0' && b != b'1') {
                errors.push("initial_state must be empty or contain only 0s and 1s".to_owned());
            }
        }

        if self.width < 500 {
            errors.push(format!("width must be at least 500 (got {})", self.width));
        }
        if self.width > 8192 {
            errors.push(format!("width must be at most 8192 (got {})", self.width));
        }
        if self.height < 500 {
            errors.push(format!("height must be at least 500 (got {})", self.height));
        }
        if self.height > 8192 {
            errors.push(format!("height must be at most 8192 (got {})", self.height));
        }
        if self.cache_tiles > 256 {
            errors.push(format!(
                "cache_tiles must be at most 256 (got {})",
                self.cache_tiles
            ));
        }
        if self.tile_size < 64 {
            errors.push(format!(
                "tile_size must be at least 64 (got {})",
                self.tile_size
            ));
        }
        if self.tile_size > 1024 {
            errors.push(format!(
                "tile_size must be at most 1024 (got {})",
                self.tile_size
            ));
        }
        if self.debounce_ms > 5000 {
            errors.push(format!(
                "debounce_ms must be at most 5000 (got {})",
                self.debounce_ms
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn rejects_non_binary_initial_state() {
        let config = Config {
            initial_state: Some("01012".to_owned()),
            ..Config::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("initial_state"));
    }

    #[test]
    fn empty_initial_state_is_valid() {
        let config = Config {
            initial_state: Some(String::new()),
            ..Config::default()
        };
        assert!(config.validate().is_empty());
    }

    #[test]
    fn window_bounds_are_enforced() {
        let config = Config {
            width: 100,
            height: 10_000,
            ..Config::default()
        };
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("width must be at least")));
        assert!(errors.iter().any(|e| e.contains("height must be at most")));
    }

    #[test]
    fn cache_and_tile_bounds_are_enforced() {
        let config = Config {
            cache_tiles: 1000,
            tile_size: 16,
            debounce_ms: 9999,
            ..Config::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn collects_every_error_at_once() {
        let config = Config {
            width: 1,
            height: 1,
            tile_size: 2048,
            ..Config::default()
        };
        assert_eq!(config.validate().len(), 3);
    }
}
