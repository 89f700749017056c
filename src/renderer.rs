use crate::backend::{
    AttributeLayout, AttributeLocation, BufferId, GraphicsBackend, ProgramId, Rgba, ShaderId,
    Topology, UniformLocation,
};
use crate::config::Config;
use crate::error::RendererError;
use crate::geometry::{pentagon_positions, FLOATS_PER_VERTEX, PENTAGON_VERTICES};
use crate::shader::{
    pentagon_fragment_shader, pentagon_vertex_shader, ShaderSource, COLOR_UNIFORM,
    MODEL_MATRIX_UNIFORM, POSITION_ATTRIBUTE,
};
use crate::transform::RotationState;

/// Locations resolved once after linking.
#[derive(Debug, Clone, Copy)]
struct Bindings {
    position: AttributeLocation,
    color: UniformLocation,
    model_matrix: UniformLocation,
}

/// Owns the pipeline, the pentagon's vertex buffer and the rotation.
///
/// Nothing but the rotation changes after `new` returns.
pub struct Renderer<B: GraphicsBackend> {
    backend: B,
    program: ProgramId,
    vertex_buffer: BufferId,
    bindings: Bindings,
    rotation: RotationState,
    fill_color: Rgba,
    clear_color: Rgba,
}

impl<B: GraphicsBackend> Renderer<B> {
    /// Builds the pentagon pipeline on `backend`.
    pub fn new(backend: B, config: &Config) -> Result<Self, RendererError> {
        Self::with_shaders(
            backend,
            config,
            &pentagon_vertex_shader(),
            &pentagon_fragment_shader(),
        )
    }

    /// Like [`Renderer::new`] with caller-provided shader stages.
    pub fn with_shaders(
        mut backend: B,
        config: &Config,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
    ) -> Result<Self, RendererError> {
        let program = create_program(&mut backend, vertex, fragment)?;
        backend.use_program(program);

        let vertex_buffer = backend.create_static_buffer("Pentagon VB", pentagon_positions());
        log::debug!("uploaded {} vertices", PENTAGON_VERTICES.len());

        let bindings = Bindings {
            position: backend
                .attribute_location(program, POSITION_ATTRIBUTE)
                .ok_or_else(|| binding_error(POSITION_ATTRIBUTE))?,
            color: backend
                .uniform_location(program, COLOR_UNIFORM)
                .ok_or_else(|| binding_error(COLOR_UNIFORM))?,
            model_matrix: backend
                .uniform_location(program, MODEL_MATRIX_UNIFORM)
                .ok_or_else(|| binding_error(MODEL_MATRIX_UNIFORM))?,
        };

        backend.vertex_attrib_pointer(
            bindings.position,
            vertex_buffer,
            AttributeLayout::packed(FLOATS_PER_VERTEX),
        );

        log::info!("pentagon pipeline ready");

        Ok(Self {
            backend,
            program,
            vertex_buffer,
            bindings,
            rotation: RotationState::new(0.0),
            fill_color: config.fill_color,
            clear_color: config.clear_color,
        })
    }

    /// Draws one frame at the current rotation.
    pub fn draw(&mut self) {
        self.backend.clear(self.clear_color);
        self.backend
            .uniform_vec4(self.bindings.color, self.fill_color.to_array());

        let model_matrix = self.rotation.model_matrix();
        self.backend
            .uniform_matrix4(self.bindings.model_matrix, &model_matrix.to_cols_array());

        self.backend.draw_arrays(
            Topology::TriangleFan,
            0,
            PENTAGON_VERTICES.len() as u32,
        );
    }

    pub fn rotation(&self) -> &RotationState {
        &self.rotation
    }

    pub fn rotation_mut(&mut self) -> &mut RotationState {
        &mut self.rotation
    }

    #[cfg(test)]
    pub fn program(&self) -> ProgramId {
        self.program
    }

    #[cfg(test)]
    pub fn vertex_buffer(&self) -> BufferId {
        self.vertex_buffer
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

fn binding_error(name: &str) -> RendererError {
    log::error!("shader interface has no `{}`", name);
    RendererError::binding_not_found(name)
}

/// Compiles both stages and links them. Any shader object that won't end up
/// in a program is released before returning.
fn create_program<B: GraphicsBackend>(
    backend: &mut B,
    vertex: &ShaderSource,
    fragment: &ShaderSource,
) -> Result<ProgramId, RendererError> {
    let vs = compile(backend, vertex)?;
    let fs = match compile(backend, fragment) {
        Ok(fs) => fs,
        Err(e) => {
            backend.release_shader(vs);
            return Err(e);
        }
    };

    let linked = backend.link_program(vs, fs);
    backend.release_shader(vs);
    backend.release_shader(fs);

    linked.map_err(|diagnostic| {
        log::error!("Error linking program: {}", diagnostic);
        RendererError::ProgramLinkError { log: diagnostic }
    })
}

fn compile<B: GraphicsBackend>(
    backend: &mut B,
    source: &ShaderSource,
) -> Result<ShaderId, RendererError> {
    backend.compile_shader(source).map_err(|diagnostic| {
        log::error!(
            "Error compiling {} shader `{}`: {}",
            source.stage,
            source.label,
            diagnostic
        );
        RendererError::ShaderCompileError {
            stage: source.stage,
            log: diagnostic,
        }
    })
}
