//! GPU-accelerated explorer for 1D elementary cellular automata.
//!
//! The engine decomposes an unbounded (column, generation) plane into
//! cached, padded tiles computed on the GPU and assembles whatever the
//! viewport touches into a single device buffer; the binary wraps it in a
//! pannable, zoomable winit/wgpu viewer.

pub mod app;
pub mod config;
pub mod engine;
pub mod gpu;
pub mod simulation;
