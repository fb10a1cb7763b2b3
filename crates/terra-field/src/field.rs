//! Construction of the deformed tile field.

use glam::{IVec2, Vec3};
use log::{debug, info};
use terra_config::FieldConfig;
use terra_gpu::{BufferError, DeformError, DeformationEngine, GpuContext, GpuTileMesh};
use terra_mesh::{MeshError, PlaneMesh, TileMeshBuilder};

use crate::grid::tile_grid_for;
use crate::lod::{LodError, LodSet};
use crate::scene::{SceneGraph, TerrainNode};

/// Failures while building the field. The first one aborts construction.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("invalid tile mesh: {0}")]
    Mesh(#[from] MeshError),

    #[error("tile upload failed: {0}")]
    Buffer(#[from] BufferError),

    #[error("tile deformation failed: {0}")]
    Deform(#[from] DeformError),

    #[error("invalid LOD distances: {0}")]
    Lod(#[from] LodError),
}

/// One deformed tile with its three resolutions.
pub struct TerrainTile {
    pub grid_coordinate: IVec2,
    pub world_position: Vec3,
    pub lods: LodSet<GpuTileMesh>,
}

impl TerrainTile {
    pub fn vertex_count(&self) -> u64 {
        self.lods.meshes().map(|mesh| mesh.vertex_count() as u64).sum()
    }

    pub fn gpu_bytes(&self) -> u64 {
        self.lods.meshes().map(GpuTileMesh::total_gpu_bytes).sum()
    }
}

impl From<TerrainTile> for TerrainNode {
    fn from(tile: TerrainTile) -> Self {
        Self {
            grid_coordinate: tile.grid_coordinate,
            world_position: tile.world_position,
            lods: tile.lods,
        }
    }
}

fn tessellate(config: &FieldConfig, step: f32) -> Result<(PlaneMesh, f32), MeshError> {
    let builder = TileMeshBuilder::new(config.tile_width, config.tile_length, step)?;
    Ok((builder.build(), step))
}

/// The full `(2k+1)²` field of deformed tiles.
pub struct TerrainField {
    tiles: Vec<TerrainTile>,
}

impl TerrainField {
    /// Tessellate, upload and deform every tile at every resolution.
    ///
    /// Each resolution is tessellated once and uploaded per tile. All three
    /// meshes of a tile are deformed with the tile's world position as origin,
    /// so they describe the same surface.
    pub fn build(
        ctx: &GpuContext,
        engine: &DeformationEngine,
        config: &FieldConfig,
    ) -> Result<Self, FieldError> {
        let [fine_step, medium_step, coarse_step] = config.steps();
        let planes = [
            tessellate(config, fine_step)?,
            tessellate(config, medium_step)?,
            tessellate(config, coarse_step)?,
        ];

        let switch_distances = [config.medium_switch_distance, config.coarse_switch_distance];
        // Fail on bad distances before any GPU work.
        LodSet::new((), switch_distances.map(|distance| ((), distance)))?;

        let mut tiles = Vec::with_capacity(config.tile_count());
        for slot in tile_grid_for(config) {
            let IVec2 { x: i, y: j } = slot.coordinate;
            let deformed = |level: usize| -> Result<GpuTileMesh, FieldError> {
                let (plane, step) = &planes[level];
                let label = format!("tile[{i},{j}]-lod{level}");
                let mut mesh = GpuTileMesh::upload(&ctx.device, &label, plane, *step)?;
                engine.deform(&mut mesh, slot.world_position)?;
                Ok(mesh)
            };

            let lods = LodSet::new(
                deformed(0)?,
                [
                    (deformed(1)?, switch_distances[0]),
                    (deformed(2)?, switch_distances[1]),
                ],
            )?;

            debug!(
                "Built tile ({}, {}) at {:?} with {} levels",
                i,
                j,
                slot.world_position,
                lods.len()
            );
            tiles.push(TerrainTile {
                grid_coordinate: slot.coordinate,
                world_position: slot.world_position,
                lods,
            });
        }

        let field = Self { tiles };
        info!(
            "Terrain field ready: {} tiles, {} vertices, {:.1} MiB on the GPU",
            field.tile_count(),
            field.total_vertex_count(),
            field.total_gpu_bytes() as f64 / (1024.0 * 1024.0)
        );
        Ok(field)
    }

    pub fn tiles(&self) -> &[TerrainTile] {
        &self.tiles
    }

    pub fn tile(&self, grid_coordinate: IVec2) -> Option<&TerrainTile> {
        self.tiles
            .iter()
            .find(|tile| tile.grid_coordinate == grid_coordinate)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Vertices across all tiles and levels.
    pub fn total_vertex_count(&self) -> u64 {
        self.tiles.iter().map(TerrainTile::vertex_count).sum()
    }

    pub fn total_gpu_bytes(&self) -> u64 {
        self.tiles.iter().map(TerrainTile::gpu_bytes).sum()
    }

    /// Move every tile into `scene`, returning how many were inserted.
    pub fn insert_into<S: SceneGraph + ?Sized>(self, scene: &mut S) -> usize {
        let count = self.tiles.len();
        for tile in self.tiles {
            scene.insert_tile(tile.into());
        }
        count
    }
}
