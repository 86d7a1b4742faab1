use wgpu::{Device, Queue};

use crate::engine::cache::Tile;
use crate::gpu::{CaBuffer, StepPipeline};
use crate::simulation::Seed;

/// Computes a single fresh tile for grid position `(tile_x, tile_y)`.
///
/// The simulation always starts from generation 0 (a tile cannot inherit
/// state from its neighbours) and runs to the tile's bottom edge. The
/// horizontal padding equals that generation count, the worst case: after
/// `g` steps no cell can have been influenced by a column more than `g`
/// away, so every cell in the tile body is exact.
pub fn produce_tile(
    device: &Device,
    queue: &Queue,
    step: &StepPipeline,
    rule: u8,
    seed: &Seed,
    tile_x: i32,
    tile_y: i32,
    tile_size: u32,
) -> Tile {
    let generation_end = i64::from(tile_y + 1) * i64::from(tile_size);
    let total_generations = generation_end.max(0) as u32;
    let tile_padding = total_generations;
    let simulated_width = tile_size + 2 * tile_padding;

    log::debug!(
        "computing tile ({}, {}): columns {}..{}, generations {}..{}",
        tile_x,
        tile_y,
        i64::from(tile_x) * i64::from(tile_size),
        i64::from(tile_x + 1) * i64::from(tile_size),
        i64::from(tile_y) * i64::from(tile_size),
        generation_end,
    );

    // The seed is positioned so the tile's left edge is the window origin.
    let first_row = seed.first_row(simulated_width, tile_padding, tile_x * tile_size as i32);
    let ca = CaBuffer::evolve(
        device,
        queue,
        step,
        &first_row,
        simulated_width,
        total_generations + 1,
        total_generations,
        rule,
    );

    // Carve the tile's generation band out of the full matrix; the full
    // matrix is released when `ca` drops.
    let row_start = i64::from(tile_y) * i64::from(tile_size);
    let generation_offset = row_start.max(0) as u64;
    let size_bytes = u64::from(simulated_width) * u64::from(tile_size) * 4;
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("ca-tile"),
        size: size_bytes,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("tile-extract"),
    });
    encoder.copy_buffer_to_buffer(
        &ca.buffer,
        generation_offset * u64::from(simulated_width) * 4,
        &buffer,
        0,
        size_bytes,
    );
    queue.submit(Some(encoder.finish()));

    Tile {
        buffer,
        simulated_width,
        padding_left: tile_padding,
        size_bytes,
    }
}
