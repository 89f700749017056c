//! WGSL front end: parse and validate with naga, then read the stage
//! interface off the resulting module.

use std::error::Error;

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Handle, Module, ResourceBinding, ScalarKind, Type, TypeInner};

use super::{AttributeDecl, ShaderSource, ShaderStage, UniformDecl, UniformKind};

/// What one compiled stage consumes and produces.
#[derive(Debug, Clone, PartialEq)]
pub struct StageInterface {
    pub label: String,
    pub stage: ShaderStage,
    /// `@location` arguments of the entry point.
    pub inputs: Vec<AttributeDecl>,
    /// `@location` slots the entry point writes.
    pub outputs: Vec<u32>,
    /// Members of the `@group(0) @binding(0)` uniform block.
    pub uniforms: Vec<UniformDecl>,
}

const UNIFORM_BLOCK: ResourceBinding = ResourceBinding {
    group: 0,
    binding: 0,
};

/// Compiles `source` on the CPU. The error string is the compiler log.
pub fn reflect(source: &ShaderSource) -> Result<StageInterface, String> {
    let module = naga::front::wgsl::parse_str(&source.code)
        .map_err(|e| e.emit_to_string(&source.code))?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| error_chain(e.as_inner()))?;

    let naga_stage = match source.stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.name == source.entry_point && ep.stage == naga_stage)
        .ok_or_else(|| {
            format!(
                "no {} entry point named `{}`",
                source.stage, source.entry_point
            )
        })?;

    let mut inputs = Vec::new();
    for arg in &entry.function.arguments {
        collect_inputs(&module, arg.name.as_deref(), arg.ty, arg.binding.as_ref(), &mut inputs)?;
    }

    let mut outputs = Vec::new();
    if let Some(result) = &entry.function.result {
        collect_outputs(&module, result.ty, result.binding.as_ref(), &mut outputs);
    }

    Ok(StageInterface {
        label: source.label.to_string(),
        stage: source.stage,
        inputs,
        outputs,
        uniforms: uniform_block(&module),
    })
}

fn collect_inputs(
    module: &Module,
    name: Option<&str>,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    inputs: &mut Vec<AttributeDecl>,
) -> Result<(), String> {
    match (binding, &module.types[ty].inner) {
        (Some(Binding::Location { location, .. }), inner) => {
            let name = name.map_or_else(|| format!("location{location}"), str::to_string);
            let components = float_components(inner)
                .ok_or_else(|| format!("input `{name}` is not a float scalar or vector"))?;
            inputs.push(AttributeDecl {
                name,
                location: *location,
                components,
            });
        }
        (None, TypeInner::Struct { members, .. }) => {
            for member in members {
                collect_inputs(
                    module,
                    member.name.as_deref(),
                    member.ty,
                    member.binding.as_ref(),
                    inputs,
                )?;
            }
        }
        // builtins
        _ => {}
    }
    Ok(())
}

fn collect_outputs(
    module: &Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    outputs: &mut Vec<u32>,
) {
    match (binding, &module.types[ty].inner) {
        (Some(Binding::Location { location, .. }), _) => outputs.push(*location),
        (None, TypeInner::Struct { members, .. }) => {
            for member in members {
                collect_outputs(module, member.ty, member.binding.as_ref(), outputs);
            }
        }
        _ => {}
    }
}

fn uniform_block(module: &Module) -> Vec<UniformDecl> {
    let mut uniforms = Vec::new();

    for (_, var) in module.global_variables.iter() {
        if var.space != AddressSpace::Uniform || var.binding.as_ref() != Some(&UNIFORM_BLOCK) {
            continue;
        }
        match &module.types[var.ty].inner {
            TypeInner::Struct { members, .. } => {
                for member in members {
                    let kind = uniform_kind(&module.types[member.ty].inner);
                    if let (Some(name), Some(kind)) = (&member.name, kind) {
                        uniforms.push(UniformDecl {
                            name: name.clone(),
                            kind,
                            offset: member.offset as u64,
                        });
                    }
                }
            }
            inner => {
                if let (Some(name), Some(kind)) = (&var.name, uniform_kind(inner)) {
                    uniforms.push(UniformDecl {
                        name: name.clone(),
                        kind,
                        offset: 0,
                    });
                }
            }
        }
    }

    uniforms
}

fn float_components(inner: &TypeInner) -> Option<u32> {
    match *inner {
        TypeInner::Scalar {
            kind: ScalarKind::Float,
            ..
        } => Some(1),
        TypeInner::Vector {
            size,
            kind: ScalarKind::Float,
            ..
        } => Some(vector_len(size)),
        _ => None,
    }
}

fn uniform_kind(inner: &TypeInner) -> Option<UniformKind> {
    match *inner {
        TypeInner::Vector {
            size: naga::VectorSize::Quad,
            kind: ScalarKind::Float,
            ..
        } => Some(UniformKind::Vec4),
        TypeInner::Matrix {
            columns: naga::VectorSize::Quad,
            rows: naga::VectorSize::Quad,
            ..
        } => Some(UniformKind::Mat4),
        _ => None,
    }
}

fn vector_len(size: naga::VectorSize) -> u32 {
    match size {
        naga::VectorSize::Bi => 2,
        naga::VectorSize::Tri => 3,
        naga::VectorSize::Quad => 4,
    }
}

fn error_chain(err: &dyn Error) -> String {
    let mut log = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        log.push_str(": ");
        log.push_str(&cause.to_string());
        source = cause.source();
    }
    log
}
