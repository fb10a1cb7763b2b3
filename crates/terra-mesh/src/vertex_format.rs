//! `wgpu::VertexBufferLayout`s for deformed tile meshes.
//!
//! Positions and normals are rewritten in place by the compute passes, so each
//! attribute lives in its own tightly packed buffer instead of one interleaved
//! stream.
//!
//! | Slot | Location | Stride | Format    | Contents          |
//! |------|----------|--------|-----------|-------------------|
//! | 0    | 0        | 12     | Float32x3 | displaced position|
//! | 1    | 1        | 12     | Float32x3 | recomputed normal |
//! | 2    | 2        | 8      | Float32x2 | planar uv         |

use std::mem;

use wgpu::{VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

/// Bytes per position element.
pub const POSITION_STRIDE: u64 = mem::size_of::<[f32; 3]>() as u64;
/// Bytes per normal element.
pub const NORMAL_STRIDE: u64 = mem::size_of::<[f32; 3]>() as u64;
/// Bytes per uv element.
pub const UV_STRIDE: u64 = mem::size_of::<[f32; 2]>() as u64;

const POSITION_ATTRIBUTES: [VertexAttribute; 1] = [VertexAttribute {
    format: VertexFormat::Float32x3,
    offset: 0,
    shader_location: 0,
}];

const NORMAL_ATTRIBUTES: [VertexAttribute; 1] = [VertexAttribute {
    format: VertexFormat::Float32x3,
    offset: 0,
    shader_location: 1,
}];

const UV_ATTRIBUTES: [VertexAttribute; 1] = [VertexAttribute {
    format: VertexFormat::Float32x2,
    offset: 0,
    shader_location: 2,
}];

/// Layout for vertex buffer slot 0.
pub const POSITION_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: POSITION_STRIDE,
    step_mode: VertexStepMode::Vertex,
    attributes: &POSITION_ATTRIBUTES,
};

/// Layout for vertex buffer slot 1.
pub const NORMAL_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: NORMAL_STRIDE,
    step_mode: VertexStepMode::Vertex,
    attributes: &NORMAL_ATTRIBUTES,
};

/// Layout for vertex buffer slot 2.
pub const UV_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: UV_STRIDE,
    step_mode: VertexStepMode::Vertex,
    attributes: &UV_ATTRIBUTES,
};

/// All three layouts in slot order, ready for `VertexState::buffers`.
pub fn tile_vertex_buffer_layouts() -> [VertexBufferLayout<'static>; 3] {
    [POSITION_LAYOUT, NORMAL_LAYOUT, UV_LAYOUT]
}

// The compute kernels read positions and normals as `array<Position>` with a
// 12-byte struct stride; keep the host side in lock-step.
const _: () = assert!(POSITION_STRIDE == 12);
const _: () = assert!(NORMAL_STRIDE == 12);
const _: () = assert!(UV_STRIDE == 8);
