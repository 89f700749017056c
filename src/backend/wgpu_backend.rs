use std::collections::HashMap;

use wgpu::util::DeviceExt;
use winit::window::Window;

use super::{
    AttributeLayout, AttributeLocation, BufferId, GraphicsBackend, ProgramId, Rgba, ShaderId,
    Topology, UniformLocation,
};
use crate::error::RendererError;
use crate::geometry::fan_indices;
use crate::shader::{reflect, ProgramInterface, ShaderSource, StageInterface, UniformKind};

struct CompiledShader {
    module: wgpu::ShaderModule,
    entry_point: &'static str,
    interface: StageInterface,
}

struct LinkedProgram {
    pipeline: wgpu::RenderPipeline,
    interface: ProgramInterface,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    // CPU copy of the uniform block, flushed before each draw when dirty
    uniform_data: Vec<u8>,
    uniforms_dirty: bool,
}

struct AttributeBinding {
    buffer: BufferId,
    offset: u64,
}

/// `GraphicsBackend` on top of a wgpu surface bound to a winit window.
pub struct WgpuBackend {
    window_surface: wgpu::Surface,
    device: wgpu::Device,
    command_queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    shaders: HashMap<usize, CompiledShader>,
    next_shader: usize,
    programs: Vec<LinkedProgram>,
    current_program: Option<ProgramId>,
    buffers: Vec<wgpu::Buffer>,
    attribute_bindings: HashMap<u32, AttributeBinding>,
    // (first, count) -> (index buffer, index count)
    fan_buffers: HashMap<(u32, u32), (wgpu::Buffer, u32)>,
    pending_clear: Option<wgpu::Color>,
    surface_error: Option<wgpu::SurfaceError>,
}

impl WgpuBackend {
    /// Acquires a hardware device and configures the window surface.
    ///
    /// # Safety contract
    /// The surface must not outlive `window`. Callers keep the window alive
    /// for as long as the backend (the application drops the renderer first).
    pub async fn new(window: &Window, vsync: bool) -> Result<Self, RendererError> {
        // Instance - handle to the GPU, used to get the adapter and surface
        let wgpu_instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let size = window.inner_size();

        // --SAFETY--
        // The surface needs to live as long as the window that created it.
        // The application owns the window and drops it after the backend.
        let window_surface = unsafe { wgpu_instance.create_surface(window) }
            .map_err(|e| RendererError::ContextUnavailable(e.to_string()))?;

        let adapter = wgpu_instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&window_surface),
                force_fallback_adapter: false, // hardware only, there is no software path
            })
            .await
            .ok_or_else(|| {
                RendererError::ContextUnavailable("no compatible GPU adapter".to_string())
            })?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let (device, command_queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("main device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                },
                None,
            )
            .await
            .map_err(|e| RendererError::ContextUnavailable(e.to_string()))?;

        let surface_caps = window_surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| {
                RendererError::ContextUnavailable("surface reports no formats".to_string())
            })?;
        let present_mode = if vsync {
            wgpu::PresentMode::Fifo
        } else {
            surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        window_surface.configure(&device, &config);
        log::debug!(
            "surface configured: {}x{} {:?} {:?}",
            config.width,
            config.height,
            config.format,
            config.present_mode
        );

        Ok(Self {
            window_surface,
            device,
            command_queue,
            config,
            shaders: HashMap::new(),
            next_shader: 0,
            programs: Vec::new(),
            current_program: None,
            buffers: Vec::new(),
            attribute_bindings: HashMap::new(),
            fan_buffers: HashMap::new(),
            pending_clear: None,
            surface_error: None,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Reconfigures the surface. Zero-sized requests (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.window_surface.configure(&self.device, &self.config);
        }
    }

    /// The error from the last failed frame acquisition, if any.
    pub fn take_surface_error(&mut self) -> Option<wgpu::SurfaceError> {
        self.surface_error.take()
    }

    /// Runs `f` inside a validation error scope and returns its validation error text.
    fn validated<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(err.to_string()),
            None => Ok(value),
        }
    }

    fn fan_buffer(&mut self, first: u32, count: u32) -> u32 {
        let device = &self.device;
        let (_, index_count) = self.fan_buffers.entry((first, count)).or_insert_with(|| {
            let indices = fan_indices(first, count);
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Fan Index Buffer"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (buffer, indices.len() as u32)
        });
        *index_count
    }

    fn write_uniform(&mut self, location: UniformLocation, bytes: &[u8], kind: UniformKind) {
        let Some(program) = self.current_program.and_then(|p| self.programs.get_mut(p.0)) else {
            log::warn!("uniform upload with no program in use");
            return;
        };
        let Some(decl) = program.interface.uniform(location.0) else {
            log::warn!("unknown uniform location {}", location.0);
            return;
        };
        if decl.kind != kind {
            log::warn!("uniform `{}` is {:?}, got {:?}", decl.name, decl.kind, kind);
            return;
        }

        let start = decl.offset as usize;
        program.uniform_data[start..start + bytes.len()].copy_from_slice(bytes);
        program.uniforms_dirty = true;
    }
}

fn float_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

impl GraphicsBackend for WgpuBackend {
    fn compile_shader(&mut self, source: &ShaderSource) -> Result<ShaderId, String> {
        // naga gives readable logs and the stage interface; wgpu then checks
        // the module against the device's own limits
        let interface = reflect(source)?;
        let module = self.validated(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(source.label),
                source: wgpu::ShaderSource::Wgsl(source.code.clone()),
            })
        })?;

        let id = self.next_shader;
        self.next_shader += 1;
        self.shaders.insert(
            id,
            CompiledShader {
                module,
                entry_point: source.entry_point,
                interface,
            },
        );
        Ok(ShaderId(id))
    }

    fn release_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader.0);
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        let vs = self.shaders.get(&vertex.0).ok_or("unknown vertex shader")?;
        let fs = self.shaders.get(&fragment.0).ok_or("unknown fragment shader")?;
        let interface = ProgramInterface::link(&vs.interface, &fs.interface)?;

        // one vertex buffer slot per attribute, in declaration order
        let attributes: Vec<[wgpu::VertexAttribute; 1]> = interface
            .attributes()
            .iter()
            .map(|a| {
                [wgpu::VertexAttribute {
                    format: float_format(a.components),
                    offset: 0,
                    shader_location: a.location,
                }]
            })
            .collect();
        let vertex_layouts: Vec<wgpu::VertexBufferLayout> = interface
            .attributes()
            .iter()
            .zip(&attributes)
            .map(|(a, attrs)| wgpu::VertexBufferLayout {
                array_stride: AttributeLayout::packed(a.components).effective_stride(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect();

        let uniform_size = interface.uniform_block_size().max(16);
        let format = self.config.format;

        let (pipeline, uniform_buffer, uniform_bind_group) = self.validated(|device| {
            let uniform_bind_group_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    }],
                    label: Some("uniform_bind_group_layout"),
                });

            let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Uniform Buffer"),
                size: uniform_size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &uniform_bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
                label: Some("uniform_bind_group"),
            });

            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Render Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &vs.module,
                    entry_point: vs.entry_point,
                    buffers: &vertex_layouts,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fs.module,
                    entry_point: fs.entry_point,
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    // fans are lowered to indexed triangle lists
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
            });

            (pipeline, uniform_buffer, uniform_bind_group)
        })?;

        self.programs.push(LinkedProgram {
            pipeline,
            interface,
            uniform_buffer,
            uniform_bind_group,
            uniform_data: vec![0; uniform_size as usize],
            uniforms_dirty: true,
        });
        Ok(ProgramId(self.programs.len() - 1))
    }

    fn use_program(&mut self, program: ProgramId) {
        if program.0 < self.programs.len() {
            self.current_program = Some(program);
        } else {
            log::warn!("use_program: unknown program {}", program.0);
        }
    }

    fn create_static_buffer(&mut self, label: &str, data: &[f32]) -> BufferId {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            });
        self.buffers.push(buffer);
        BufferId(self.buffers.len() - 1)
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation> {
        self.programs
            .get(program.0)?
            .interface
            .attribute(name)
            .map(|a| AttributeLocation(a.location))
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(program.0)?
            .interface
            .uniform_index(name)
            .map(UniformLocation)
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: AttributeLocation,
        buffer: BufferId,
        layout: AttributeLayout,
    ) {
        // the pipeline's vertex layout is fixed at link time; only packed floats fit it
        let packed = AttributeLayout::packed(layout.components).effective_stride();
        if layout.normalized || layout.effective_stride() != packed {
            log::warn!(
                "attribute {} layout {:?} does not match the linked pipeline",
                location.0,
                layout
            );
            return;
        }
        self.attribute_bindings.insert(
            location.0,
            AttributeBinding {
                buffer,
                offset: layout.offset,
            },
        );
    }

    fn clear(&mut self, color: Rgba) {
        // applied as the load op of the next draw's render pass
        self.pending_clear = Some(color.into());
    }

    fn uniform_vec4(&mut self, location: UniformLocation, value: [f32; 4]) {
        self.write_uniform(location, bytemuck::cast_slice(&value), UniformKind::Vec4);
    }

    fn uniform_matrix4(&mut self, location: UniformLocation, value: &[[f32; 4]; 4]) {
        self.write_uniform(location, bytemuck::cast_slice(value), UniformKind::Mat4);
    }

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) {
        let Some(program_id) = self.current_program else {
            log::warn!("draw_arrays with no program in use");
            return;
        };

        let index_count = match topology {
            Topology::TriangleFan => self.fan_buffer(first, count),
        };

        if let Some(program) = self.programs.get_mut(program_id.0) {
            if program.uniforms_dirty {
                self.command_queue
                    .write_buffer(&program.uniform_buffer, 0, &program.uniform_data);
                program.uniforms_dirty = false;
            }
        }

        let output = match self.window_surface.get_current_texture() {
            Ok(output) => output,
            Err(e) => {
                self.surface_error = Some(e);
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let load = match self.pending_clear.take() {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let program = &self.programs[program_id.0];
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&program.pipeline);
            render_pass.set_bind_group(0, &program.uniform_bind_group, &[]);

            let mut bound = true;
            for (slot, attribute) in program.interface.attributes().iter().enumerate() {
                match self
                    .attribute_bindings
                    .get(&attribute.location)
                    .and_then(|b| Some((self.buffers.get(b.buffer.0)?, b.offset)))
                {
                    Some((buffer, offset)) => {
                        render_pass.set_vertex_buffer(slot as u32, buffer.slice(offset..))
                    }
                    None => {
                        log::warn!("attribute `{}` has no buffer bound", attribute.name);
                        bound = false;
                    }
                }
            }

            if let (true, Some((indices, _))) = (bound, self.fan_buffers.get(&(first, count))) {
                render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..index_count, 0, 0..1);
            }
        }

        self.command_queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}
