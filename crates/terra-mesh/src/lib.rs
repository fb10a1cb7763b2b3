//! Planar tile tessellation and the vertex formats shared by the deformation
//! kernels and render pipelines.

pub mod tile;
pub mod vertex_format;

pub use tile::{MAX_TILE_VERTICES, MeshError, PlaneMesh, TileMeshBuilder, TileVertex};
pub use vertex_format::{
    NORMAL_LAYOUT, NORMAL_STRIDE, POSITION_LAYOUT, POSITION_STRIDE, UV_LAYOUT, UV_STRIDE,
    tile_vertex_buffer_layouts,
};
