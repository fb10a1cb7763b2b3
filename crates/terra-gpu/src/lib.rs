//! GPU side of terrain generation: headless device setup, tile buffers,
//! WGSL snippet assembly, thread-group sizing, and the two-pass compute
//! deformation (displacement, then normal recomputation).

pub mod buffer;
pub mod context;
pub mod deform;
pub mod group_size;
pub mod shader;
pub mod tile_mesh;

pub use buffer::{BufferAllocator, BufferError, read_buffer};
pub use context::{ContextError, GpuContext, init_gpu_context_blocking};
pub use deform::{DeformError, DeformParams, DeformReport, DeformSettings, DeformationEngine};
pub use group_size::{GROUP_WIDTH_CANDIDATES, best_group_width, best_group_width_capped};
pub use shader::{
    DirectorySnippets, EmbeddedSnippets, PipelineStage, ShaderError, SnippetSource,
    StageDescriptor, assemble_stages,
};
pub use tile_mesh::{GpuTileMesh, PingPong, TileGeometry};
