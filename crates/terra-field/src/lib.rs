//! A square field of deformed terrain tiles, each carrying three levels of
//! detail, and the seam through which the field is handed to a scene graph.

pub mod field;
pub mod grid;
pub mod lod;
pub mod scene;

pub use field::{FieldError, TerrainField, TerrainTile};
pub use grid::{GridTile, tile_grid, tile_grid_for};
pub use lod::{LodError, LodLevel, LodSet};
pub use scene::{SceneGraph, SceneNodes, TerrainNode};
