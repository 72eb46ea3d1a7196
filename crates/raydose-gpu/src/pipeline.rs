//! wgpu compute pipeline for dense dose assembly.

use raydose_beam::Beamlet;
use raydose_math::Point3;
use wgpu::util::DeviceExt;

use crate::buffers::{GpuBeamlet, GpuDoseKernel, GpuExternalSurface, GpuPoint, GpuUniforms};
use crate::context::{GpuContext, GpuError};
use crate::shaders;

/// Dense dose assembly compute pipeline.
///
/// Compiled once per kernel type (the kernel contributes shader code) and
/// reusable across dispatches.
pub struct DosePipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl DosePipeline {
    /// Create a pipeline for the given kernel.
    pub fn new<K: GpuDoseKernel>(ctx: &GpuContext, kernel: &K) -> Result<Self, GpuError> {
        let source = shaders::DOSE_SHADER.replace(shaders::KERNEL_MARKER, &kernel.wgsl_source());
        let shader_module = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Dose Assembly Shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Dose Assembly Bind Group Layout"),
                    entries: &[
                        // Uniforms
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        // Points storage
                        storage_entry(1, true),
                        // Beamlets storage
                        storage_entry(2, true),
                        // Output dose storage
                        storage_entry(3, false),
                    ],
                });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Dose Assembly Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = ctx
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Dose Assembly Pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader_module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });

        Ok(Self {
            pipeline,
            bind_group_layout,
        })
    }

    /// Run one dense assembly and read the matrix back, column-major f32.
    pub fn assemble<S: GpuExternalSurface, K: GpuDoseKernel>(
        &self,
        ctx: &GpuContext,
        points: &[Point3],
        beamlets: &[Beamlet],
        surface: &S,
        kernel: &K,
        maxradius: f64,
    ) -> Result<Vec<f32>, GpuError> {
        let npoints = points.len() as u32;
        let nbeamlets = beamlets.len() as u32;
        if npoints == 0 || nbeamlets == 0 {
            return Ok(vec![0.0; points.len() * beamlets.len()]);
        }
        ctx.check_capacity(points.len() * beamlets.len())?;

        let uniforms = GpuUniforms {
            npoints,
            nbeamlets,
            maxradius: maxradius as f32,
            surface_type: surface.surface_type(),
            surface_params: surface.surface_params(),
            kernel_params: kernel.kernel_params(),
        };
        let uniform_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Dose Uniforms"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let gpu_points: Vec<GpuPoint> = points.iter().map(GpuPoint::from_point).collect();
        let points_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Points Buffer"),
                contents: bytemuck::cast_slice(&gpu_points),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let gpu_beamlets: Vec<GpuBeamlet> =
            beamlets.iter().map(GpuBeamlet::from_beamlet).collect();
        let beamlets_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Beamlets Buffer"),
                contents: bytemuck::cast_slice(&gpu_beamlets),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let output_size = (points.len() * beamlets.len() * std::mem::size_of::<f32>()) as u64;
        let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Dose Output Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let readback_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Dose Readback Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Dose Assembly Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: points_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: beamlets_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: output_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Dose Assembly Encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Dose Assembly Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(npoints.div_ceil(16), nbeamlets.div_ceil(16), 1);
        }
        encoder.copy_buffer_to_buffer(&output_buffer, 0, &readback_buffer, 0, output_size);
        ctx.queue.submit(Some(encoder.finish()));

        // Map and read buffer
        let buffer_slice = readback_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| GpuError::Readback)?
            .map_err(|_| GpuError::Readback)?;

        let data = buffer_slice.get_mapped_range();
        let result: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        readback_buffer.unmap();

        Ok(result)
    }
}
