use std::collections::{HashMap, VecDeque};

use crate::config::DEFAULT_TILE_SIZE;
use crate::simulation::Seed;

/// A cached space-time region.
///
/// The tile at grid position `(tile_x, tile_y)` covers world columns
/// `[tile_x * S, (tile_x + 1) * S)` over generations
/// `[tile_y * S, (tile_y + 1) * S)` for tile side `S`. Row `r` of the
/// buffer holds generation `tile_y * S + r`; the body columns live at
/// `[padding_left, padding_left + S)`, flanked by the padding that kept the
/// influence cone of the unsimulated world away from them. A tile owns its
/// device buffer; eviction drops it.
pub struct Tile {
    pub buffer: wgpu::Buffer,
    pub simulated_width: u32,
    pub padding_left: u32,
    pub size_bytes: u64,
}

/// Content address of a tile.
///
/// `seed_hash` is a stable digest of the initial state
/// ([`Seed::stable_hash`]), so identical seeds always map to identical
/// keys across runs and hasher seeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub rule: u8,
    pub seed_hash: u64,
    pub tile_x: i32,
    pub tile_y: i32,
}

impl TileKey {
    pub fn new(rule: u8, seed: &Seed, tile_x: i32, tile_y: i32) -> Self {
        Self {
            rule,
            seed_hash: seed.stable_hash(),
            tile_x,
            tile_y,
        }
    }
}

/// LRU cache of computed tiles, bounded by tile count.
///
/// Both `get` and `insert` count as a use of the key. A `&Tile` obtained
/// from `get` is only guaranteed valid until the next `insert`, which may
/// evict it; callers finish reading before inserting anything else.
pub struct TileCache {
    max_tiles: usize,
    tiles: HashMap<TileKey, Tile>,
    /// Front = most recently used.
    lru: VecDeque<TileKey>,
    pub tile_size: u32,
    pub hits: u64,
    pub misses: u64,
}

impl TileCache {
    pub fn new(max_tiles: usize, tile_size: u32) -> Self {
        let tile_size = if tile_size == 0 {
            DEFAULT_TILE_SIZE
        } else {
            tile_size
        };
        log::info!(
            "tile cache: {} tiles of {}x{} cells (~{} KiB per tile body)",
            max_tiles,
            tile_size,
            tile_size,
            u64::from(tile_size) * u64::from(tile_size) * 4 / 1024
        );
        Self {
            max_tiles,
            tiles: HashMap::new(),
            lru: VecDeque::new(),
            tile_size,
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Looks the tile up, promoting it to most recently used on a hit.
    /// Every call increments exactly one of `hits` / `misses`.
    pub fn get(&mut self, key: &TileKey) -> Option<&Tile> {
        if self.tiles.contains_key(key) {
            self.touch(key);
            self.hits += 1;
            log::debug!(
                "cache hit: tile ({}, {}) (hits={}, misses={})",
                key.tile_x,
                key.tile_y,
                self.hits,
                self.misses
            );
            self.tiles.get(key)
        } else {
            self.misses += 1;
            log::debug!(
                "cache miss: tile ({}, {}) (hits={}, misses={})",
                key.tile_x,
                key.tile_y,
                self.hits,
                self.misses
            );
            None
        }
    }

    /// Inserts a tile, taking ownership of it and its buffer.
    ///
    /// Evicts least-recently-used entries while at capacity, then places
    /// `key` at the most-recently-used end.
    pub fn insert(&mut self, key: TileKey, tile: Tile) {
        log::debug!(
            "cache insert: tile ({}, {}), {}x{} cells ({}/{})",
            key.tile_x,
            key.tile_y,
            tile.simulated_width,
            self.tile_size,
            self.tiles.len(),
            self.max_tiles
        );

        if self.tiles.contains_key(&key) {
            self.lru.retain(|k| k != &key);
        }

        while self.tiles.len() >= self.max_tiles && !self.lru.is_empty() {
            if let Some(evicted) = self.lru.pop_back() {
                self.tiles.remove(&evicted);
                log::debug!(
                    "cache evict: tile ({}, {}) ({}/{})",
                    evicted.tile_x,
                    evicted.tile_y,
                    self.tiles.len(),
                    self.max_tiles
                );
            }
        }

        self.tiles.insert(key.clone(), tile);
        self.lru.push_front(key);
    }

    fn touch(&mut self, key: &TileKey) {
        self.lru.retain(|k| k != key);
        self.lru.push_front(key.clone());
    }
}
