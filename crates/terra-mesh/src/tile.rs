//! Flat tile tessellation.
//!
//! A tile covers `[0, width] x [0, length]` on the XZ plane and is split into
//! square quads of side `step`. Every quad emits two triangles with their own
//! three vertices; nothing is shared, so the GPU normal pass can treat each
//! run of three vertices as one independent face.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Vertices emitted per grid cell (two triangles, three corners each).
pub const VERTICES_PER_QUAD: usize = 6;

/// Largest vertex count a tile may have; GPU indices and dispatch sizes are u32.
pub const MAX_TILE_VERTICES: u64 = u32::MAX as u64;

/// Rejected tile dimensions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    /// Width, length or step is zero, negative, NaN or infinite.
    #[error("tile {name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f32 },

    /// The step does not fit inside the tile, which would produce no quads.
    #[error("tile step {step} exceeds the smaller tile extent {extent}")]
    StepExceedsExtent { step: f32, extent: f32 },

    /// The grid would need more vertices than a u32 index can address.
    #[error("a {columns}x{rows} quad grid exceeds {max} vertices")]
    TooManyVertices { columns: u32, rows: u32, max: u64 },
}

/// One interleaved vertex, as described by the tile data model.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TileVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

static_assertions::const_assert_eq!(std::mem::size_of::<TileVertex>(), 32);

/// CPU-side tile mesh, stored as separate attribute streams.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaneMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    /// Identity sequence `0..vertex_count`.
    pub indices: Vec<u32>,
    /// Quads along X.
    pub columns: u32,
    /// Quads along Z.
    pub rows: u32,
}

impl PlaneMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn quad_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Interleaved view of vertex `index`.
    pub fn vertex(&self, index: usize) -> TileVertex {
        TileVertex {
            position: self.positions[index],
            normal: self.normals[index],
            uv: self.uvs[index],
        }
    }

    pub fn vertices(&self) -> impl Iterator<Item = TileVertex> + '_ {
        (0..self.vertex_count()).map(|i| self.vertex(i))
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn uv_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.uvs)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    fn push_vertex(&mut self, position: Vec3) {
        let index = self.positions.len() as u32;
        self.positions.push(position.to_array());
        self.normals.push(Vec3::Y.to_array());
        self.uvs.push(Vec2::new(position.x, position.z).to_array());
        self.indices.push(index);
    }
}

/// Validated tile dimensions; [`build`](Self::build) produces the mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileMeshBuilder {
    width: f32,
    length: f32,
    step: f32,
}

impl TileMeshBuilder {
    /// Validate the tile dimensions.
    ///
    /// Requires `width > 0`, `length > 0`, `0 < step <= min(width, length)`,
    /// and at most [`MAX_TILE_VERTICES`] vertices.
    pub fn new(width: f32, length: f32, step: f32) -> Result<Self, MeshError> {
        for (name, value) in [("width", width), ("length", length), ("step", step)] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(MeshError::NonPositive { name, value });
            }
        }
        let extent = width.min(length);
        if step > extent {
            return Err(MeshError::StepExceedsExtent { step, extent });
        }

        let builder = Self {
            width,
            length,
            step,
        };
        let (columns, rows) = builder.grid_size();
        let vertices = (columns as u64)
            .checked_mul(rows as u64)
            .and_then(|quads| quads.checked_mul(VERTICES_PER_QUAD as u64));
        match vertices {
            Some(count) if count <= MAX_TILE_VERTICES => Ok(builder),
            _ => Err(MeshError::TooManyVertices {
                columns,
                rows,
                max: MAX_TILE_VERTICES,
            }),
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Quads along X and Z. A partial trailing cell is dropped.
    pub fn grid_size(&self) -> (u32, u32) {
        (
            cell_count(self.width, self.step),
            cell_count(self.length, self.step),
        )
    }

    /// Vertex count the built mesh will have. Bounded by
    /// [`MAX_TILE_VERTICES`] at construction.
    pub fn vertex_count(&self) -> usize {
        let (columns, rows) = self.grid_size();
        columns as usize * rows as usize * VERTICES_PER_QUAD
    }

    /// Tessellate the tile.
    ///
    /// Rows advance along Z, columns along X. Each quad with corners
    /// `p0=(x0,z0) p1=(x0,z1) p2=(x1,z1) p3=(x1,z0)` emits the counter-clockwise
    /// triangles `(p0, p1, p2)` and `(p0, p2, p3)`.
    pub fn build(&self) -> PlaneMesh {
        let (columns, rows) = self.grid_size();
        let capacity = self.vertex_count();

        let mut mesh = PlaneMesh {
            positions: Vec::with_capacity(capacity),
            normals: Vec::with_capacity(capacity),
            uvs: Vec::with_capacity(capacity),
            indices: Vec::with_capacity(capacity),
            columns,
            rows,
        };

        for row in 0..rows {
            // Multiply rather than accumulate so the last edge lands exactly on the extent.
            let z0 = row as f32 * self.step;
            let z1 = (row + 1) as f32 * self.step;
            for column in 0..columns {
                let x0 = column as f32 * self.step;
                let x1 = (column + 1) as f32 * self.step;

                let p0 = Vec3::new(x0, 0.0, z0);
                let p1 = Vec3::new(x0, 0.0, z1);
                let p2 = Vec3::new(x1, 0.0, z1);
                let p3 = Vec3::new(x1, 0.0, z0);

                for corner in [p0, p1, p2, p0, p2, p3] {
                    mesh.push_vertex(corner);
                }
            }
        }

        debug_assert_eq!(mesh.vertex_count(), capacity);
        mesh
    }
}

/// Largest `n` whose far edge `n * step`, evaluated in f32 exactly as the
/// vertices are, stays within `extent`.
///
/// Starting from the rounded ratio lets `0.3 / 0.1` yield three cells while a
/// trailing cell that would poke past the extent is still dropped.
fn cell_count(extent: f32, step: f32) -> u32 {
    let mut cells = (extent as f64 / step as f64).round() as u32;
    while cells > 0 && cells as f32 * step > extent {
        cells -= 1;
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_by_two_grid_has_24_vertices() {
        let mesh = TileMeshBuilder::new(100.0, 100.0, 50.0).unwrap().build();
        assert_eq!(mesh.quad_count(), 4);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 8);
    }

    #[test]
    fn test_vertex_count_is_multiple_of_six() {
        let cases = [
            (100.0, 100.0, 50.0),
            (100.0, 70.0, 30.0),
            (5000.0, 5000.0, 100.0),
            (5000.0, 5000.0, 1000.0),
            (1.0, 1.0, 0.1),
            (7.5, 3.25, 3.25),
        ];
        for (w, l, s) in cases {
            let mesh = TileMeshBuilder::new(w, l, s).unwrap().build();
            assert_eq!(mesh.vertex_count() % 6, 0, "w={w} l={l} s={s}");
            assert!(mesh.vertex_count() > 0);
        }
    }

    #[test]
    fn test_index_list_is_identity() {
        let mesh = TileMeshBuilder::new(300.0, 200.0, 100.0).unwrap().build();
        let expected: Vec<u32> = (0..mesh.vertex_count() as u32).collect();
        assert_eq!(mesh.indices, expected);
    }

    #[test]
    fn test_partial_trailing_cells_are_dropped() {
        let builder = TileMeshBuilder::new(100.0, 70.0, 30.0).unwrap();
        assert_eq!(builder.grid_size(), (3, 2));

        let mesh = builder.build();
        let max_x = mesh.positions.iter().map(|p| p[0]).fold(0.0, f32::max);
        let max_z = mesh.positions.iter().map(|p| p[2]).fold(0.0, f32::max);
        assert_eq!(max_x, 90.0);
        assert_eq!(max_z, 60.0);
    }

    #[test]
    fn test_exact_division_tolerates_float_error() {
        let builder = TileMeshBuilder::new(0.3, 0.3, 0.1).unwrap();
        assert_eq!(builder.grid_size(), (3, 3));
    }

    #[test]
    fn test_nearly_whole_trailing_cell_is_dropped() {
        let builder = TileMeshBuilder::new(99.99991, 10.0, 1.0).unwrap();
        assert_eq!(builder.grid_size(), (99, 10));

        let mesh = builder.build();
        let max_x = mesh.positions.iter().map(|p| p[0]).fold(0.0, f32::max);
        let max_z = mesh.positions.iter().map(|p| p[2]).fold(0.0, f32::max);
        assert!(max_x <= 99.99991, "max_x {max_x}");
        assert_eq!(max_z, 10.0);
    }

    #[test]
    fn test_far_edge_never_exceeds_extent() {
        let cases = [
            (100.0, 100.0, 30.0),
            (0.7, 0.7, 0.1),
            (1234.567, 999.9, 7.3),
            (5000.0, 4999.999, 100.0),
        ];
        for (w, l, s) in cases {
            let mesh = TileMeshBuilder::new(w, l, s).unwrap().build();
            for p in &mesh.positions {
                assert!(p[0] <= w && p[2] <= l, "w={w} l={l} s={s} p={p:?}");
            }
        }
    }

    #[test]
    fn test_oversized_grid_rejected_before_allocation() {
        assert!(matches!(
            TileMeshBuilder::new(1.0e9, 1.0e9, 1.0),
            Err(MeshError::TooManyVertices {
                max: MAX_TILE_VERTICES,
                ..
            })
        ));
        assert!(matches!(
            TileMeshBuilder::new(f32::MAX, f32::MAX, 1.0e-30),
            Err(MeshError::TooManyVertices { .. })
        ));
    }

    #[test]
    fn test_largest_grid_under_the_vertex_cap_accepted() {
        // 26754^2 * 6 = 4_294_659_096 <= u32::MAX
        let builder = TileMeshBuilder::new(26_754.0, 26_754.0, 1.0).unwrap();
        assert_eq!(builder.vertex_count() as u64, 26_754 * 26_754 * 6);
        // 26755^2 * 6 = 4_294_980_150 > u32::MAX
        assert!(TileMeshBuilder::new(26_755.0, 26_755.0, 1.0).is_err());
    }

    #[test]
    fn test_far_edge_lands_on_extent() {
        let mesh = TileMeshBuilder::new(5000.0, 5000.0, 100.0).unwrap().build();
        assert!(mesh.positions.iter().any(|p| p[0] == 5000.0));
        assert!(mesh.positions.iter().any(|p| p[2] == 5000.0));
        assert_eq!(mesh.vertex_count(), 50 * 50 * 6);
    }

    #[test]
    fn test_first_quad_winding_and_corners() {
        let mesh = TileMeshBuilder::new(10.0, 10.0, 10.0).unwrap().build();
        let p: Vec<[f32; 3]> = mesh.positions.clone();
        assert_eq!(p[0], [0.0, 0.0, 0.0]);
        assert_eq!(p[1], [0.0, 0.0, 10.0]);
        assert_eq!(p[2], [10.0, 0.0, 10.0]);
        assert_eq!(p[3], [0.0, 0.0, 0.0]);
        assert_eq!(p[4], [10.0, 0.0, 10.0]);
        assert_eq!(p[5], [10.0, 0.0, 0.0]);
    }

    #[test]
    fn test_triangles_face_up() {
        let mesh = TileMeshBuilder::new(40.0, 40.0, 20.0).unwrap().build();
        for tri in mesh.positions.chunks_exact(3) {
            let a = Vec3::from(tri[0]);
            let b = Vec3::from(tri[1]);
            let c = Vec3::from(tri[2]);
            let n = (b - a).cross(c - a).normalize();
            assert!((n - Vec3::Y).length() < 1e-6, "normal {n:?}");
        }
    }

    #[test]
    fn test_normals_flat_and_uvs_planar() {
        let mesh = TileMeshBuilder::new(60.0, 40.0, 20.0).unwrap().build();
        for v in mesh.vertices() {
            assert_eq!(v.normal, [0.0, 1.0, 0.0]);
            assert_eq!(v.uv, [v.position[0], v.position[2]]);
        }
    }

    #[test]
    fn test_byte_views_match_strides() {
        let mesh = TileMeshBuilder::new(100.0, 100.0, 50.0).unwrap().build();
        assert_eq!(mesh.position_bytes().len(), 24 * 12);
        assert_eq!(mesh.normal_bytes().len(), 24 * 12);
        assert_eq!(mesh.uv_bytes().len(), 24 * 8);
        assert_eq!(mesh.index_bytes().len(), 24 * 4);
    }

    #[test]
    fn test_non_positive_dimensions_rejected() {
        assert_eq!(
            TileMeshBuilder::new(0.0, 10.0, 1.0),
            Err(MeshError::NonPositive {
                name: "width",
                value: 0.0
            })
        );
        assert!(matches!(
            TileMeshBuilder::new(10.0, -5.0, 1.0),
            Err(MeshError::NonPositive { name: "length", .. })
        ));
        assert!(matches!(
            TileMeshBuilder::new(10.0, 10.0, 0.0),
            Err(MeshError::NonPositive { name: "step", .. })
        ));
        assert!(matches!(
            TileMeshBuilder::new(10.0, 10.0, f32::NAN),
            Err(MeshError::NonPositive { name: "step", .. })
        ));
    }

    #[test]
    fn test_step_larger_than_extent_rejected() {
        assert_eq!(
            TileMeshBuilder::new(100.0, 40.0, 50.0),
            Err(MeshError::StepExceedsExtent {
                step: 50.0,
                extent: 40.0
            })
        );
    }

    #[test]
    fn test_builder_vertex_count_matches_build() {
        let builder = TileMeshBuilder::new(5000.0, 5000.0, 200.0).unwrap();
        assert_eq!(builder.vertex_count(), builder.build().vertex_count());
    }
}
