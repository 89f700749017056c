//! The host graphics environment the renderer draws through.
//!
//! The calls mirror a classic immediate-mode API: compile, link, bind, set
//! uniforms, draw. `WgpuBackend` maps them onto wgpu; `RecordingBackend`
//! keeps a log of them for tests.

#[cfg(test)]
pub mod recording;
pub mod wgpu_backend;

use crate::shader::ShaderSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeLocation(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const RED: Rgba = Rgba::new(1.0, 0.0, 0.0, 1.0);
    #[cfg(test)]
    pub const BLUE: Rgba = Rgba::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<Rgba> for wgpu::Color {
    fn from(c: Rgba) -> Self {
        wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: c.a as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Triangles sharing the first vertex of the range.
    TriangleFan,
}

/// How a float attribute is pulled out of its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLayout {
    pub components: u32,
    pub normalized: bool,
    /// Bytes between consecutive vertices; 0 means tightly packed.
    pub stride: u64,
    pub offset: u64,
}

impl AttributeLayout {
    pub fn packed(components: u32) -> Self {
        Self {
            components,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }

    pub fn effective_stride(&self) -> u64 {
        if self.stride == 0 {
            self.components as u64 * std::mem::size_of::<f32>() as u64
        } else {
            self.stride
        }
    }
}

pub trait GraphicsBackend {
    /// Compiles one stage. On failure the error is the compiler log and no
    /// shader object survives.
    fn compile_shader(&mut self, source: &ShaderSource) -> Result<ShaderId, String>;

    fn release_shader(&mut self, shader: ShaderId);

    /// Links two compiled stages. On failure the error is the link log.
    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String>;

    fn use_program(&mut self, program: ProgramId);

    /// Uploads write-once vertex data.
    fn create_static_buffer(&mut self, label: &str, data: &[f32]) -> BufferId;

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation>;

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    fn vertex_attrib_pointer(
        &mut self,
        location: AttributeLocation,
        buffer: BufferId,
        layout: AttributeLayout,
    );

    fn clear(&mut self, color: Rgba);

    fn uniform_vec4(&mut self, location: UniformLocation, value: [f32; 4]);

    fn uniform_matrix4(&mut self, location: UniformLocation, value: &[[f32; 4]; 4]);

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32);
}
