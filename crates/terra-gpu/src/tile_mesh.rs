//! GPU-resident tile mesh.
//!
//! A [`GpuTileMesh`] owns every buffer of one tile at one resolution: two
//! position buffers used as a ping-pong pair, the normal buffer the normal
//! pass writes, and the static uv/index geometry. Buffers are sized once at
//! upload and never resized.

use terra_mesh::{PlaneMesh, TileMeshBuilder};

use crate::buffer::{BufferAllocator, BufferError};

/// Two position buffers with explicit roles.
///
/// During a deformation the `pristine` slot is read and the `displaced` slot
/// is written. Between deformations the roles are exchanged by moving the
/// handles, so the previous output becomes the next input.
pub struct PingPong {
    pristine: wgpu::Buffer,
    displaced: wgpu::Buffer,
}

impl PingPong {
    pub fn new(pristine: wgpu::Buffer, displaced: wgpu::Buffer) -> Self {
        Self {
            pristine,
            displaced,
        }
    }

    /// Input of the current or next deformation.
    pub fn pristine(&self) -> &wgpu::Buffer {
        &self.pristine
    }

    /// Output of the most recent deformation.
    pub fn displaced(&self) -> &wgpu::Buffer {
        &self.displaced
    }

    /// Exchange the two roles.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pristine, &mut self.displaced);
    }
}

/// Static render geometry shared by every deformation cycle.
pub struct TileGeometry {
    pub uv_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// One tile mesh uploaded to the GPU.
pub struct GpuTileMesh {
    label: String,
    vertex_count: u32,
    index_list: Vec<u32>,
    step: f32,
    geometry: TileGeometry,
    positions: PingPong,
    normal_buffer: wgpu::Buffer,
    deform_cycles: u32,
}

impl GpuTileMesh {
    /// Upload a CPU mesh, creating all five buffers.
    ///
    /// Both position buffers start with the flat positions; the normal buffer
    /// starts with the flat normals.
    pub fn upload(
        device: &wgpu::Device,
        label: &str,
        mesh: &PlaneMesh,
        step: f32,
    ) -> Result<Self, BufferError> {
        let vertex_count =
            u32::try_from(mesh.vertex_count()).map_err(|_| BufferError::TooLarge {
                label: label.to_string(),
                size: mesh.vertex_count() as u64,
                max: u32::MAX as u64,
            })?;

        let allocator = BufferAllocator::new(device);
        let storage_usage = wgpu::BufferUsages::VERTEX;

        let pristine = allocator.create_storage_buffer(
            &format!("{label}-positions-a"),
            mesh.position_bytes(),
            storage_usage,
        )?;
        let displaced = allocator.create_storage_buffer(
            &format!("{label}-positions-b"),
            mesh.position_bytes(),
            storage_usage,
        )?;
        let normal_buffer = allocator.create_storage_buffer(
            &format!("{label}-normals"),
            mesh.normal_bytes(),
            storage_usage,
        )?;
        let uv_buffer = allocator.create_vertex_buffer(&format!("{label}-uvs"), mesh.uv_bytes())?;
        let index_buffer =
            allocator.create_index_buffer_u32(&format!("{label}-indices"), &mesh.indices)?;

        Ok(Self {
            label: label.to_string(),
            vertex_count,
            index_list: mesh.indices.clone(),
            step,
            geometry: TileGeometry {
                uv_buffer,
                index_buffer,
                index_count: mesh.indices.len() as u32,
            },
            positions: PingPong::new(pristine, displaced),
            normal_buffer,
            deform_cycles: 0,
        })
    }

    /// Tessellate and upload in one go.
    pub fn build(
        device: &wgpu::Device,
        label: &str,
        builder: &TileMeshBuilder,
    ) -> Result<Self, BufferError> {
        Self::upload(device, label, &builder.build(), builder.step())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Identity index list `0..vertex_count`.
    pub fn index_list(&self) -> &[u32] {
        &self.index_list
    }

    /// Quad side this mesh was tessellated with.
    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    pub fn positions(&self) -> &PingPong {
        &self.positions
    }

    /// Buffer holding the positions to draw: the latest displacement output.
    pub fn position_buffer(&self) -> &wgpu::Buffer {
        self.positions.displaced()
    }

    pub fn normal_buffer(&self) -> &wgpu::Buffer {
        &self.normal_buffer
    }

    /// Number of completed deformations.
    pub fn deform_cycles(&self) -> u32 {
        self.deform_cycles
    }

    /// Prepare the ping-pong pair for a new deformation.
    ///
    /// The first cycle reads the flat upload. Later cycles swap first, so the
    /// previous output is read and the previous input is overwritten.
    pub(crate) fn begin_cycle(&mut self) {
        if self.deform_cycles > 0 {
            self.positions.swap();
        }
        self.deform_cycles += 1;
    }

    /// GPU memory owned by this mesh in bytes.
    pub fn total_gpu_bytes(&self) -> u64 {
        self.positions.pristine().size()
            + self.positions.displaced().size()
            + self.normal_buffer.size()
            + self.geometry.uv_buffer.size()
            + self.geometry.index_buffer.size()
    }

    /// Bind position, normal and uv streams (slots 0..=2) and the index buffer.
    pub fn bind<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_vertex_buffer(0, self.position_buffer().slice(..));
        render_pass.set_vertex_buffer(1, self.normal_buffer.slice(..));
        render_pass.set_vertex_buffer(2, self.geometry.uv_buffer.slice(..));
        render_pass.set_index_buffer(
            self.geometry.index_buffer.slice(..),
            wgpu::IndexFormat::Uint32,
        );
    }

    /// Issue an indexed draw call for this mesh.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass) {
        render_pass.draw_indexed(0..self.geometry.index_count, 0, 0..1);
    }
}
