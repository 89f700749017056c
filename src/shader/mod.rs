mod reflect;

use std::borrow::Cow;
use std::fmt;

pub use reflect::{reflect, StageInterface};

pub const POSITION_ATTRIBUTE: &str = "a_position";
pub const COLOR_UNIFORM: &str = "u_color";
pub const MODEL_MATRIX_UNIFORM: &str = "u_model_matrix";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// A `@location` input of an entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDecl {
    pub name: String,
    pub location: u32,
    /// Number of `f32` components (1..=4).
    pub components: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Vec4,
    Mat4,
}

impl UniformKind {
    pub fn size(self) -> u64 {
        match self {
            UniformKind::Vec4 => 16,
            UniformKind::Mat4 => 64,
        }
    }
}

/// A member of the uniform block at `@group(0) @binding(0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: String,
    pub kind: UniformKind,
    /// Byte offset inside the block, as laid out by the WGSL front end.
    pub offset: u64,
}

impl UniformDecl {
    fn end(&self) -> u64 {
        self.offset + self.kind.size()
    }
}

/// WGSL source for one stage.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub label: &'static str,
    pub stage: ShaderStage,
    pub code: Cow<'static, str>,
    pub entry_point: &'static str,
}

pub fn pentagon_vertex_shader() -> ShaderSource {
    ShaderSource {
        label: "pentagon vertex shader",
        stage: ShaderStage::Vertex,
        code: Cow::Borrowed(include_str!("../shaders/pentagon_vert.wgsl")),
        entry_point: "vs_main",
    }
}

pub fn pentagon_fragment_shader() -> ShaderSource {
    ShaderSource {
        label: "pentagon fragment shader",
        stage: ShaderStage::Fragment,
        code: Cow::Borrowed(include_str!("../shaders/pentagon_frag.wgsl")),
        entry_point: "fs_main",
    }
}

/// The merged interface of a linked vertex + fragment pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramInterface {
    attributes: Vec<AttributeDecl>,
    uniforms: Vec<UniformDecl>,
}

impl ProgramInterface {
    /// Checks that the two stages fit together and merges their interfaces.
    /// The error string is the link log.
    pub fn link(vertex: &StageInterface, fragment: &StageInterface) -> Result<Self, String> {
        if vertex.stage != ShaderStage::Vertex {
            return Err(format!(
                "`{}` is a {} shader, expected a vertex shader",
                vertex.label, vertex.stage
            ));
        }
        if fragment.stage != ShaderStage::Fragment {
            return Err(format!(
                "`{}` is a {} shader, expected a fragment shader",
                fragment.label, fragment.stage
            ));
        }

        if let Some(input) = fragment
            .inputs
            .iter()
            .find(|i| !vertex.outputs.contains(&i.location))
        {
            return Err(format!(
                "fragment input `{}` at location {} is not written by `{}`",
                input.name, input.location, vertex.label
            ));
        }

        let mut uniforms: Vec<UniformDecl> = Vec::new();
        for decl in vertex.uniforms.iter().chain(&fragment.uniforms) {
            match uniforms.iter().find(|u| u.name == decl.name) {
                Some(existing) if existing == decl => continue,
                Some(existing) => {
                    return Err(format!(
                        "uniform `{}` declared as {:?}@{} and {:?}@{}",
                        decl.name, existing.kind, existing.offset, decl.kind, decl.offset
                    ))
                }
                None => {}
            }
            if let Some(other) = uniforms
                .iter()
                .find(|u| decl.offset < u.end() && u.offset < decl.end())
            {
                return Err(format!(
                    "uniforms `{}` and `{}` overlap in the uniform block",
                    other.name, decl.name
                ));
            }
            uniforms.push(decl.clone());
        }

        Ok(Self {
            attributes: vertex.inputs.clone(),
            uniforms,
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDecl> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attributes(&self) -> &[AttributeDecl] {
        &self.attributes
    }

    /// Index of the named uniform, stable for the lifetime of the program.
    pub fn uniform_index(&self, name: &str) -> Option<usize> {
        self.uniforms.iter().position(|u| u.name == name)
    }

    pub fn uniform(&self, index: usize) -> Option<&UniformDecl> {
        self.uniforms.get(index)
    }

    /// Uniform block size, padded to the 16-byte alignment WGSL requires.
    pub fn uniform_block_size(&self) -> u64 {
        let end = self.uniforms.iter().map(UniformDecl::end).max().unwrap_or(0);
        (end + 15) / 16 * 16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pentagon_interface() -> ProgramInterface {
        let vertex = reflect(&pentagon_vertex_shader()).unwrap();
        let fragment = reflect(&pentagon_fragment_shader()).unwrap();
        ProgramInterface::link(&vertex, &fragment).unwrap()
    }

    fn fragment_with(code: &'static str) -> StageInterface {
        reflect(&ShaderSource {
            code: Cow::Borrowed(code),
            ..pentagon_fragment_shader()
        })
        .unwrap()
    }

    #[test]
    fn pentagon_pair_links() {
        let interface = pentagon_interface();

        let position = interface.attribute(POSITION_ATTRIBUTE).unwrap();
        assert_eq!(position.location, 0);
        assert_eq!(position.components, 3);
        assert_eq!(interface.attributes().len(), 1);
    }

    #[test]
    fn pentagon_uniform_block_layout() {
        let interface = pentagon_interface();

        let matrix = interface
            .uniform(interface.uniform_index(MODEL_MATRIX_UNIFORM).unwrap())
            .unwrap();
        assert_eq!((matrix.kind, matrix.offset), (UniformKind::Mat4, 0));

        let color = interface
            .uniform(interface.uniform_index(COLOR_UNIFORM).unwrap())
            .unwrap();
        assert_eq!((color.kind, color.offset), (UniformKind::Vec4, 64));

        assert_eq!(interface.uniform_block_size(), 80);
    }

    #[test]
    fn both_stages_agree_on_the_uniform_block() {
        let vertex = reflect(&pentagon_vertex_shader()).unwrap();
        let fragment = reflect(&pentagon_fragment_shader()).unwrap();
        assert_eq!(vertex.uniforms, fragment.uniforms);
    }

    #[test]
    fn swapped_stages_fail_to_link() {
        let vertex = reflect(&pentagon_vertex_shader()).unwrap();
        let fragment = reflect(&pentagon_fragment_shader()).unwrap();

        let log = ProgramInterface::link(&fragment, &vertex).unwrap_err();
        assert!(log.contains("expected a vertex shader"), "{log}");
    }

    #[test]
    fn reordered_uniform_block_fails_to_link() {
        let vertex = reflect(&pentagon_vertex_shader()).unwrap();
        let fragment = fragment_with(
            "struct Uniforms {
                u_color: vec4<f32>,
                u_model_matrix: mat4x4<f32>,
            }
            @group(0) @binding(0) var<uniform> uniforms: Uniforms;
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return uniforms.u_color;
            }",
        );

        let log = ProgramInterface::link(&vertex, &fragment).unwrap_err();
        assert!(log.contains(COLOR_UNIFORM), "{log}");
    }

    #[test]
    fn unwritten_fragment_input_fails_to_link() {
        let vertex = reflect(&pentagon_vertex_shader()).unwrap();
        let fragment = fragment_with(
            "@fragment
            fn fs_main(@location(1) v_tint: vec4<f32>) -> @location(0) vec4<f32> {
                return v_tint;
            }",
        );

        let log = ProgramInterface::link(&vertex, &fragment).unwrap_err();
        assert!(log.contains("v_tint"), "{log}");
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        let interface = pentagon_interface();
        assert!(interface.attribute("a_normal").is_none());
        assert!(interface.uniform_index("u_view").is_none());
    }
}
