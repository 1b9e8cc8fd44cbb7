// ABOUTME: GPU presentation of processed CRT frames.
// ABOUTME: Uses wgpu to show CPU-rendered frames in a winit window.

mod gpu;
mod present_pipeline;
pub mod renderer;

pub use renderer::{RenderError, Renderer};
