//! Hand-off of finished tiles to a scene graph.

use glam::{IVec2, Vec3};
use terra_gpu::GpuTileMesh;

use crate::lod::LodSet;

/// A tile as inserted into a scene: placed at `world_position`, drawing the
/// fine mesh by default and switching by distance through `lods`.
pub struct TerrainNode {
    pub grid_coordinate: IVec2,
    pub world_position: Vec3,
    pub lods: LodSet<GpuTileMesh>,
}

impl TerrainNode {
    /// Geometry drawn when no LOD switch applies.
    pub fn geometry(&self) -> &GpuTileMesh {
        self.lods.base()
    }

    /// Mesh for a camera at `camera`, by distance to the node origin.
    pub fn mesh_for_camera(&self, camera: Vec3) -> &GpuTileMesh {
        self.lods.select(camera.distance(self.world_position))
    }
}

/// Receives terrain nodes.
pub trait SceneGraph {
    fn insert_tile(&mut self, node: TerrainNode);
}

/// In-memory scene: a flat list of nodes in insertion order.
#[derive(Default)]
pub struct SceneNodes {
    nodes: Vec<TerrainNode>,
}

impl SceneNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[TerrainNode] {
        &self.nodes
    }

    pub fn find(&self, grid_coordinate: IVec2) -> Option<&TerrainNode> {
        self.nodes
            .iter()
            .find(|node| node.grid_coordinate == grid_coordinate)
    }
}

impl SceneGraph for SceneNodes {
    fn insert_tile(&mut self, node: TerrainNode) {
        self.nodes.push(node);
    }
}
