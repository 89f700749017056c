use thiserror::Error;

use crate::shader::ShaderStage;

/// Errors raised while bringing the rendering pipeline up.
///
/// Every variant is terminal: nothing retries, and once one is returned the
/// draw/animate path is never reached.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("graphics context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("failed to compile {stage} shader: {log}")]
    ShaderCompileError { stage: ShaderStage, log: String },

    #[error("failed to link shader program: {log}")]
    ProgramLinkError { log: String },

    #[error("shader binding `{name}` not found in linked program")]
    BindingNotFound { name: String },
}

impl RendererError {
    pub fn binding_not_found(name: impl Into<String>) -> Self {
        Self::BindingNotFound { name: name.into() }
    }
}
