use wgpu::{Buffer, BufferUsages, Device, Queue};

use crate::config::COMPUTE_BATCH_SIZE;
use crate::gpu::compute::{StepParams, StepPipeline};

/// A CA state matrix on the device: `width` cells per row, `height` rows,
/// row `g` holding generation `g`. The buffer is exclusively owned;
/// dropping it releases the GPU allocation.
pub struct CaBuffer {
    pub buffer: Buffer,
    pub width: u32,
    pub height: u32,
}

impl CaBuffer {
    /// Allocates a zeroed `width x height` matrix, uploads `first_row` into
    /// row 0, and advances it `total_generations` steps under `rule`.
    ///
    /// Kernel launches are batched, with one blocking device
    /// synchronisation per batch to keep the command queue bounded.
    pub fn evolve(
        device: &Device,
        queue: &Queue,
        step: &StepPipeline,
        first_row: &[u32],
        width: u32,
        height: u32,
        total_generations: u32,
        rule: u8,
    ) -> Self {
        debug_assert_eq!(first_row.len(), width as usize);
        debug_assert!(height >= total_generations + 1);

        let size = u64::from(width) * u64::from(height) * 4;
        // wgpu zero-initialises fresh buffers, so only row 0 needs an upload.
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ca-state"),
            size,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        queue.write_buffer(&buffer, 0, bytemuck::cast_slice(first_row));

        let mut generation = 0;
        while generation < total_generations {
            let batch_end = (generation + COMPUTE_BATCH_SIZE).min(total_generations);
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("step-batch"),
            });
            while generation < batch_end {
                step.encode_step(
                    device,
                    &mut encoder,
                    &buffer,
                    StepParams {
                        width,
                        height,
                        rule: u32::from(rule),
                        source_row: generation,
                    },
                );
                generation += 1;
            }
            queue.submit(Some(encoder.finish()));
            let _ = device.poll(wgpu::Maintain::Wait);
        }

        Self {
            buffer,
            width,
            height,
        }
    }
}

/// Assembled result of a viewport computation, owned by the caller.
///
/// The visible columns occupy `[padding_left, padding_left + visible_width)`
/// of each row; the flanks are the simulation padding the renderer expects
/// to be present on both sides.
pub struct OutputBuffer {
    pub buffer: Buffer,
    pub simulated_width: u32,
    pub visible_width: u32,
    pub height: u32,
    pub padding_left: u32,
    pub size_bytes: u64,
}

impl OutputBuffer {
    /// Allocates a zero-filled output buffer of `height` rows of
    /// `simulated_width` cells.
    pub fn new_zeroed(
        device: &Device,
        simulated_width: u32,
        visible_width: u32,
        height: u32,
        padding_left: u32,
    ) -> Self {
        let size_bytes = u64::from(simulated_width) * u64::from(height) * 4;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ca-output"),
            size: size_bytes,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            simulated_width,
            visible_width,
            height,
            padding_left,
            size_bytes,
        }
    }

    /// Copies the buffer back to host memory as row-major words.
    ///
    /// Blocks on the device; meant for tests and diagnostics, not the frame
    /// path (rendering reads the buffer in place).
    pub fn read_back(&self, device: &Device, queue: &Queue) -> Vec<u32> {
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("output-readback"),
            size: self.size_bytes,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("output-readback-encoder"),
        });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, self.size_bytes);
        queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .expect("map_async callback dropped")
            .expect("failed to map readback buffer");

        let data = slice.get_mapped_range();
        let words: Vec<u32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();
        words
    }
}

/// Parameters passed to the render shader (48 bytes, 16-byte aligned).
///
/// Carries both the live viewport offset and the offset the current buffer
/// was computed for, so a stale buffer can be reprojected while a recompute
/// is pending.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RenderParams {
    pub visible_width: u32,
    pub visible_height: u32,
    pub simulated_width: u32,
    pub padding_left: u32,
    pub cell_size: u32,
    pub window_width: u32,
    pub window_height: u32,
    pub _padding: u32,
    pub viewport_offset_x: i32,
    pub viewport_offset_y: i32,
    pub buffer_offset_x: i32,
    pub buffer_offset_y: i32,
}
