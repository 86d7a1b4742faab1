mod assembler;
mod cache;
mod producer;

pub use assembler::{run, run_with_cache};
pub use cache::{Tile, TileCache, TileKey};
