use wgpu::{Device, Queue};

use crate::engine::cache::{TileCache, TileKey};
use crate::engine::producer::produce_tile;
use crate::gpu::{CaBuffer, OutputBuffer, StepPipeline};
use crate::simulation::Seed;

/// Computes the viewport directly, without tiling.
///
/// A single padded simulation is sized so the influence cone of the
/// unsimulated world can never reach a visible column within the requested
/// generation range, then the rows `[start_generation, start_generation +
/// iterations]` are copied into a fresh output buffer. Also serves as the
/// oracle the cached path is tested against.
#[allow(clippy::too_many_arguments)]
pub fn run(
    device: &Device,
    queue: &Queue,
    step: &StepPipeline,
    rule: u8,
    start_generation: u32,
    iterations: u32,
    visible_width: u32,
    horizontal_offset: i32,
    seed: &Seed,
) -> OutputBuffer {
    let total_generations = start_generation + iterations;
    let padding = total_generations;
    let simulated_width = visible_width + 2 * padding;

    log::info!(
        "direct compute: generations {}..{}, visible width {}, simulated width {} (padding {}), offset {}",
        start_generation,
        total_generations,
        visible_width,
        simulated_width,
        padding,
        horizontal_offset,
    );

    let first_row = seed.first_row(simulated_width, padding, horizontal_offset);
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

    let height = iterations + 1;
    let output = OutputBuffer::new_zeroed(device, simulated_width, visible_width, height, padding);

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("output-extract"),
    });
    encoder.copy_buffer_to_buffer(
        &ca.buffer,
        u64::from(start_generation) * u64::from(simulated_width) * 4,
        &output.buffer,
        0,
        output.size_bytes,
    );
    queue.submit(Some(encoder.finish()));
    let _ = device.poll(wgpu::Maintain::Wait);

    output
}

/// Same contract as [`run`], but backed by the tile cache.
///
/// Phase 1 realises every tile the viewport touches (missing tiles are
/// produced and inserted before any read, since an insert can invalidate
/// cached references). Phase 2 blits the intersecting slice of each tile
/// into an output buffer laid out exactly like the direct path's. Phase 3
/// synchronises once and hands the buffer to the caller.
#[allow(clippy::too_many_arguments)]
pub fn run_with_cache(
    device: &Device,
    queue: &Queue,
    step: &StepPipeline,
    rule: u8,
    start_generation: u32,
    iterations: u32,
    visible_width: u32,
    horizontal_offset: i32,
    seed: &Seed,
    cache: &mut TileCache,
) -> OutputBuffer {
    let viewport_x_start = horizontal_offset;
    let viewport_x_end = horizontal_offset + visible_width as i32;
    let viewport_y_start = start_generation as i32;
    let viewport_y_end = (start_generation + iterations) as i32;
    let tile_size = cache.tile_size as i32;

    // Euclidean division so negative world columns land in the right tile.
    let tile_x_start = viewport_x_start.div_euclid(tile_size);
    let tile_x_end = (viewport_x_end - 1).div_euclid(tile_size);
    let tile_y_start = viewport_y_start.div_euclid(tile_size);
    let tile_y_end = (viewport_y_end - 1).div_euclid(tile_size);

    log::info!(
        "tiled compute: generations {}..{}, offset {}, width {}; tiles x {}..={}, y {}..={}",
        start_generation,
        viewport_y_end,
        horizontal_offset,
        visible_width,
        tile_x_start,
        tile_x_end,
        tile_y_start,
        tile_y_end,
    );

    // Phase 1: realise every missing tile.
    for tile_y in tile_y_start..=tile_y_end {
        for tile_x in tile_x_start..=tile_x_end {
            let key = TileKey::new(rule, seed, tile_x, tile_y);
            if cache.get(&key).is_none() {
                let tile = produce_tile(
                    device,
                    queue,
                    step,
                    rule,
                    seed,
                    tile_x,
                    tile_y,
                    cache.tile_size,
                );
                cache.insert(key, tile);
            }
        }
    }

    // Phase 2: assemble. The output keeps the direct path's padding
    // convention so the renderer sees the same layout either way.
    let total_generations = start_generation + iterations;
    let padding = total_generations;
    let simulated_width = visible_width + 2 * padding;
    let height = iterations + 1;
    let output = OutputBuffer::new_zeroed(device, simulated_width, visible_width, height, padding);

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("tile-assembly"),
    });

    for tile_y in tile_y_start..=tile_y_end {
        for tile_x in tile_x_start..=tile_x_end {
            let key = TileKey::new(rule, seed, tile_x, tile_y);
            let Some(tile) = cache.get(&key) else {
                // Evicted during phase 1: the viewport needs more tiles than
                // the cache holds. The region stays zero this frame.
                log::warn!("tile ({}, {}) missing during assembly", tile_x, tile_y);
                continue;
            };

            let tile_world_x_start = tile_x * tile_size;
            let tile_world_x_end = tile_world_x_start + tile_size;
            let tile_gen_start = tile_y * tile_size;
            let tile_gen_end = tile_gen_start + tile_size;

            let copy_x_start = viewport_x_start.max(tile_world_x_start);
            let copy_x_end = viewport_x_end.min(tile_world_x_end);
            let copy_gen_start = viewport_y_start.max(tile_gen_start);
            let copy_gen_end = viewport_y_end.min(tile_gen_end);
            if copy_x_end <= copy_x_start || copy_gen_end <= copy_gen_start {
                continue;
            }

            let slice_width = (copy_x_end - copy_x_start) as u32;
            let col_in_tile = (copy_x_start - tile_world_x_start) as u32 + tile.padding_left;
            let col_in_output = (copy_x_start - viewport_x_start) as u32 + padding;

            if col_in_tile + slice_width > tile.simulated_width
                || col_in_output + slice_width > simulated_width
            {
                log::warn!(
                    "skipping out-of-range slice for tile ({}, {})",
                    tile_x,
                    tile_y
                );
                continue;
            }

            for generation in copy_gen_start..copy_gen_end {
                let row_in_output = (generation - viewport_y_start) as u64;
                let row_in_tile = (generation - tile_gen_start) as u64;

                encoder.copy_buffer_to_buffer(
                    &tile.buffer,
                    (row_in_tile * u64::from(tile.simulated_width) + u64::from(col_in_tile)) * 4,
                    &output.buffer,
                    (row_in_output * u64::from(simulated_width) + u64::from(col_in_output)) * 4,
                    u64::from(slice_width) * 4,
                );
            }
        }
    }

    // Phase 3: one synchronisation, then the buffer belongs to the caller.
    queue.submit(Some(encoder.finish()));
    let _ = device.poll(wgpu::Maintain::Wait);

    output
}
