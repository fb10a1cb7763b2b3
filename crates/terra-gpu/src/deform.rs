//! Two-pass compute deformation of tile meshes.
//!
//! Stage A displaces every vertex of the pristine positions by fractal
//! simplex noise sampled at the vertex's world-space XZ and writes the result
//! into the displaced slot. Stage B recomputes one flat normal per triangle
//! from the displaced positions. The stages are submitted separately, so the
//! queue orders them.

use std::collections::BTreeMap;
use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use log::{debug, info, warn};
use terra_config::{NoiseConfig, TerraConfig};

use crate::buffer::BufferAllocator;
use crate::context::GpuContext;
use crate::group_size::{
    FALLBACK_GROUP_WIDTH, GROUP_WIDTH_CANDIDATES, best_group_width, best_group_width_capped,
};
use crate::shader::{EmbeddedSnippets, PipelineStage, ShaderError, SnippetSource, assemble_stages};
use crate::tile_mesh::GpuTileMesh;

/// Deformation failures.
#[derive(Debug, thiserror::Error)]
pub enum DeformError {
    /// The adapter cannot run compute shaders.
    #[error("the GPU adapter does not support compute shaders")]
    ComputeUnsupported,

    /// The requested workgroup width is beyond what the device accepts.
    #[error("thread width {width} exceeds the device maximum of {max}")]
    ThreadWidthExceedsDevice { width: u32, max: u32 },

    /// Stage B groups vertices in threes; partial triangles cannot be processed.
    #[error("vertex count {vertex_count} is not a multiple of 3")]
    AlignmentViolation { vertex_count: u32 },

    /// A dispatch would need more workgroups than one dimension allows.
    #[error("{stage:?} needs {groups} workgroups but the device allows {max}")]
    DispatchTooLarge {
        stage: PipelineStage,
        groups: u32,
        max: u32,
    },

    #[error(transparent)]
    Shader(#[from] ShaderError),
}

/// Per-dispatch uniform shared by both kernels. Matches `DeformParams` in
/// `deform_common.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DeformParams {
    pub origin: [f32; 3],
    pub vertex_count: u32,
    pub frequency: f32,
    pub amplitude: f32,
    pub lacunarity: f32,
    pub persistence: f32,
    pub seed_offset: [f32; 2],
    pub octaves: u32,
    pub _padding: u32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<DeformParams>(), 48);

impl DeformParams {
    pub fn new(origin: Vec3, vertex_count: u32, noise: &NoiseConfig) -> Self {
        Self {
            origin: origin.to_array(),
            vertex_count,
            frequency: noise.frequency,
            amplitude: noise.amplitude,
            lacunarity: noise.lacunarity,
            persistence: noise.persistence,
            seed_offset: noise.seed_offset(),
            octaves: noise.octaves,
            _padding: 0,
        }
    }
}

/// Engine construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DeformSettings {
    /// Workgroup width of the displacement kernel.
    pub thread_width: u32,
    pub noise: NoiseConfig,
}

impl DeformSettings {
    pub fn from_config(config: &TerraConfig) -> Self {
        Self {
            thread_width: config.compute.thread_width,
            noise: config.noise.clone(),
        }
    }
}

impl Default for DeformSettings {
    fn default() -> Self {
        Self::from_config(&TerraConfig::default())
    }
}

/// What one [`DeformationEngine::deform`] call dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeformReport {
    /// Workgroup width used by the normal pass.
    pub group_width: u32,
    pub displacement_groups: u32,
    pub normal_groups: u32,
}

/// Compiled deformation pipelines for one device.
///
/// The engine holds no mesh state; every call borrows the mesh it deforms.
pub struct DeformationEngine {
    device: wgpu::Device,
    queue: wgpu::Queue,
    settings: DeformSettings,
    /// Largest workgroup width the device accepts along X.
    device_max_width: u32,
    max_groups: u32,
    displace_layout: wgpu::BindGroupLayout,
    normals_layout: wgpu::BindGroupLayout,
    displace_pipeline: wgpu::ComputePipeline,
    /// One pipeline per group width candidate the device accepts.
    normal_pipelines: BTreeMap<u32, wgpu::ComputePipeline>,
}

impl DeformationEngine {
    /// Build the engine from the kernels compiled into the crate.
    pub fn new(ctx: &GpuContext, settings: DeformSettings) -> Result<Self, DeformError> {
        Self::with_snippets(ctx, settings, &EmbeddedSnippets)
    }

    /// Build the engine, resolving kernel snippets through `source`.
    ///
    /// Checks that the device supports compute and accepts the configured
    /// thread width, then compiles every pipeline up front.
    pub fn with_snippets(
        ctx: &GpuContext,
        settings: DeformSettings,
        source: &dyn SnippetSource,
    ) -> Result<Self, DeformError> {
        if !ctx.supports_compute() {
            return Err(DeformError::ComputeUnsupported);
        }

        let limits = ctx.limits();
        let device_max_width = limits
            .max_compute_workgroup_size_x
            .min(limits.max_compute_invocations_per_workgroup);
        if settings.thread_width == 0 || settings.thread_width > device_max_width {
            return Err(DeformError::ThreadWidthExceedsDevice {
                width: settings.thread_width,
                max: device_max_width,
            });
        }
        if device_max_width < FALLBACK_GROUP_WIDTH {
            return Err(DeformError::ThreadWidthExceedsDevice {
                width: FALLBACK_GROUP_WIDTH,
                max: device_max_width,
            });
        }

        let sources = assemble_stages(source)?;
        let device = &ctx.device;

        let displace_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("terra-displace-bgl"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, false),
                uniform_entry(2),
            ],
        });
        let normals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("terra-normals-bgl"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                storage_entry(2, false),
                uniform_entry(3),
            ],
        });

        let displace_pipeline = create_pipeline(
            device,
            PipelineStage::Displacement,
            &sources[&PipelineStage::Displacement],
            &displace_layout,
            settings.thread_width,
        );

        let normals_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("terra-normals-shader"),
            source: wgpu::ShaderSource::Wgsl(
                sources[&PipelineStage::NormalRecompute].as_str().into(),
            ),
        });
        let normals_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("terra-normals-pipeline-layout"),
                bind_group_layouts: &[&normals_layout],
                immediate_size: 0,
            });
        let normal_pipelines: BTreeMap<u32, wgpu::ComputePipeline> = GROUP_WIDTH_CANDIDATES
            .iter()
            .copied()
            .filter(|&width| width <= device_max_width)
            .map(|width| {
                let pipeline = compute_pipeline(
                    device,
                    PipelineStage::NormalRecompute,
                    &normals_pipeline_layout,
                    &normals_module,
                    width,
                );
                (width, pipeline)
            })
            .collect();

        info!(
            "Deformation engine ready: thread width {}, {} normal pipelines (max group width {})",
            settings.thread_width,
            normal_pipelines.len(),
            device_max_width
        );

        Ok(Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            settings,
            device_max_width,
            max_groups: limits.max_compute_workgroups_per_dimension,
            displace_layout,
            normals_layout,
            displace_pipeline,
            normal_pipelines,
        })
    }

    pub fn settings(&self) -> &DeformSettings {
        &self.settings
    }

    /// Group widths with a compiled normal pipeline, ascending.
    pub fn group_widths(&self) -> impl Iterator<Item = u32> + '_ {
        self.normal_pipelines.keys().copied()
    }

    /// Displace `mesh` as if placed at `origin`, then recompute its normals.
    ///
    /// The first call reads the flat upload; later calls swap the ping-pong
    /// slots first and read the previous output. Height is written absolutely,
    /// so repeated calls with the same origin give the same result.
    pub fn deform(&self, mesh: &mut GpuTileMesh, origin: Vec3) -> Result<DeformReport, DeformError> {
        let vertex_count = mesh.vertex_count();
        if vertex_count % 3 != 0 {
            return Err(DeformError::AlignmentViolation { vertex_count });
        }

        let group_width = best_group_width_capped(vertex_count, self.device_max_width);
        let uncapped = best_group_width(vertex_count);
        if group_width != uncapped {
            warn!(
                "Group width for '{}' capped from {} to {} by the device",
                mesh.label(),
                uncapped,
                group_width
            );
        }

        let displacement_groups = vertex_count.div_ceil(self.settings.thread_width);
        let normal_groups = vertex_count / group_width;
        self.check_groups(PipelineStage::Displacement, displacement_groups)?;
        self.check_groups(PipelineStage::NormalRecompute, normal_groups)?;

        let Some(normal_pipeline) = self.normal_pipelines.get(&group_width) else {
            return Err(DeformError::ThreadWidthExceedsDevice {
                width: group_width,
                max: self.device_max_width,
            });
        };

        mesh.begin_cycle();

        let params = DeformParams::new(origin, vertex_count, &self.settings.noise);
        let params_buffer =
            BufferAllocator::new(&self.device).create_uniform_buffer("terra-deform-params", &params);

        let displace_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("terra-displace-bg"),
            layout: &self.displace_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: mesh.positions().pristine().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: mesh.positions().displaced().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });
        let normals_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("terra-normals-bg"),
            layout: &self.normals_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: mesh.positions().displaced().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: mesh.positions().pristine().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: mesh.normal_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        self.submit(
            "terra-displace",
            &self.displace_pipeline,
            &displace_bind_group,
            displacement_groups,
        );
        self.submit(
            "terra-normals",
            normal_pipeline,
            &normals_bind_group,
            normal_groups,
        );

        debug!(
            "Deformed '{}' at {:?}: {} vertices, {} displacement groups, {} normal groups of {}",
            mesh.label(),
            origin,
            vertex_count,
            displacement_groups,
            normal_groups,
            group_width
        );

        Ok(DeformReport {
            group_width,
            displacement_groups,
            normal_groups,
        })
    }

    fn check_groups(&self, stage: PipelineStage, groups: u32) -> Result<(), DeformError> {
        if groups > self.max_groups {
            return Err(DeformError::DispatchTooLarge {
                stage,
                groups,
                max: self.max_groups,
            });
        }
        Ok(())
    }

    /// Record one compute pass into its own command buffer and submit it.
    fn submit(
        &self,
        label: &str,
        pipeline: &wgpu::ComputePipeline,
        bind_group: &wgpu::BindGroup,
        groups: u32,
    ) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(groups, 1, 1);
        }
        self.queue.submit(Some(encoder.finish()));
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(std::mem::size_of::<DeformParams>() as u64),
        },
        count: None,
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    stage: PipelineStage,
    source: &str,
    layout: &wgpu::BindGroupLayout,
    width: u32,
) -> wgpu::ComputePipeline {
    let module_label = format!("terra-{stage:?}-shader");
    let layout_label = format!("terra-{stage:?}-pipeline-layout");
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(module_label.as_str()),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(layout_label.as_str()),
        bind_group_layouts: &[layout],
        immediate_size: 0,
    });
    compute_pipeline(device, stage, &pipeline_layout, &module, width)
}

/// Compile `stage` with its workgroup width override set to `width`.
fn compute_pipeline(
    device: &wgpu::Device,
    stage: PipelineStage,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    width: u32,
) -> wgpu::ComputePipeline {
    let label = format!("terra-{:?}-{}", stage, width);
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label.as_str()),
        layout: Some(layout),
        module,
        entry_point: Some(stage.entry_point()),
        compilation_options: wgpu::PipelineCompilationOptions {
            constants: &[(stage.width_constant(), width as f64)],
            zero_initialize_workgroup_memory: true,
        },
        cache: None,
    })
}
