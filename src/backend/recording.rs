//! Recording backend for unit tests (no GPU required).
//!
//! Every call is appended to `calls`. Shaders go through the same naga front
//! end as the wgpu path, so compile errors and location lookups behave alike.

use std::collections::HashMap;

use super::{
    AttributeLayout, AttributeLocation, BufferId, GraphicsBackend, ProgramId, Rgba, ShaderId,
    Topology, UniformLocation,
};
use crate::shader::{reflect, ProgramInterface, ShaderSource, ShaderStage, StageInterface};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CompileShader(ShaderStage),
    ReleaseShader(ShaderId),
    LinkProgram(ShaderId, ShaderId),
    UseProgram(ProgramId),
    CreateStaticBuffer { label: String, data: Vec<f32> },
    VertexAttribPointer(AttributeLocation, BufferId, AttributeLayout),
    Clear(Rgba),
    UniformVec4(UniformLocation, [f32; 4]),
    UniformMatrix4(UniformLocation, [[f32; 4]; 4]),
    DrawArrays {
        topology: Topology,
        first: u32,
        count: u32,
    },
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<Call>,
    shaders: HashMap<usize, StageInterface>,
    programs: Vec<ProgramInterface>,
    next_shader: usize,
    buffers: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn draws(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::DrawArrays { .. }))
            .collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl GraphicsBackend for RecordingBackend {
    fn compile_shader(&mut self, source: &ShaderSource) -> Result<ShaderId, String> {
        self.calls.push(Call::CompileShader(source.stage));
        let interface = reflect(source)?;

        let id = self.next_shader;
        self.next_shader += 1;
        self.shaders.insert(id, interface);
        Ok(ShaderId(id))
    }

    fn release_shader(&mut self, shader: ShaderId) {
        self.calls.push(Call::ReleaseShader(shader));
        self.shaders.remove(&shader.0);
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        self.calls.push(Call::LinkProgram(vertex, fragment));
        let vs = self.shaders.get(&vertex.0).ok_or("unknown vertex shader")?;
        let fs = self.shaders.get(&fragment.0).ok_or("unknown fragment shader")?;
        let interface = ProgramInterface::link(vs, fs)?;
        self.programs.push(interface);
        Ok(ProgramId(self.programs.len() - 1))
    }

    fn use_program(&mut self, program: ProgramId) {
        self.calls.push(Call::UseProgram(program));
    }

    fn create_static_buffer(&mut self, label: &str, data: &[f32]) -> BufferId {
        self.calls.push(Call::CreateStaticBuffer {
            label: label.to_string(),
            data: data.to_vec(),
        });
        self.buffers += 1;
        BufferId(self.buffers - 1)
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation> {
        self.programs
            .get(program.0)?
            .attribute(name)
            .map(|a| AttributeLocation(a.location))
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(program.0)?
            .uniform_index(name)
            .map(UniformLocation)
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: AttributeLocation,
        buffer: BufferId,
        layout: AttributeLayout,
    ) {
        self.calls
            .push(Call::VertexAttribPointer(location, buffer, layout));
    }

    fn clear(&mut self, color: Rgba) {
        self.calls.push(Call::Clear(color));
    }

    fn uniform_vec4(&mut self, location: UniformLocation, value: [f32; 4]) {
        self.calls.push(Call::UniformVec4(location, value));
    }

    fn uniform_matrix4(&mut self, location: UniformLocation, value: &[[f32; 4]; 4]) {
        self.calls.push(Call::UniformMatrix4(location, *value));
    }

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) {
        self.calls.push(Call::DrawArrays {
            topology,
            first,
            count,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::shader::pentagon_vertex_shader;

    #[test]
    fn unparsable_source_leaves_no_shader_behind() {
        let mut backend = RecordingBackend::new();
        let source = ShaderSource {
            code: Cow::Borrowed("fn vs_main( -> {{{ this is not wgsl"),
            ..pentagon_vertex_shader()
        };

        assert!(backend.compile_shader(&source).is_err());
        assert_eq!(backend.live_shaders(), 0);
        assert_eq!(backend.program_count(), 0);
    }

    #[test]
    fn locations_come_from_the_compiled_source() {
        let mut backend = RecordingBackend::new();
        let vs = backend.compile_shader(&pentagon_vertex_shader()).unwrap();
        let fs = backend
            .compile_shader(&crate::shader::pentagon_fragment_shader())
            .unwrap();
        let program = backend.link_program(vs, fs).unwrap();

        assert_eq!(
            backend.attribute_location(program, "a_position"),
            Some(AttributeLocation(0))
        );
        assert!(backend.uniform_location(program, "u_color").is_some());
        assert!(backend.attribute_location(program, "a_normal").is_none());
    }
}
