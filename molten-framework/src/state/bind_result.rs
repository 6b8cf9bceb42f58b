use molten_api::{
    MoltenConstantBufferBinding, MoltenError, MoltenIndexBufferBinding, MoltenSampler,
    MoltenShader, MoltenShaderStage, MoltenTexture, MoltenVertexBufferBinding,
};

/// Outcome of reconciling pipeline state before a draw or dispatch.
///
/// Anything other than `Successful` means the draw was skipped. These are expected, recoverable
/// conditions (an asset that hasn't finished loading, a resource that was disposed) so they are
/// returned as values instead of errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GraphicsBindResult {
    Successful,
    /// The pass has no shader for a stage the operation requires
    MissingShader(MoltenShaderStage),
    /// The bound vertex buffers do not provide every input the vertex shader consumes
    InvalidVertexLayout,
    /// Issuing a binding failed, usually because a bound resource was disposed
    BindFailed,
}

impl GraphicsBindResult {
    pub fn is_successful(self) -> bool {
        self == GraphicsBindResult::Successful
    }
}

/// Why a stage failed to bind
#[derive(Debug, Clone)]
pub enum BindError {
    MissingShader(MoltenShaderStage),
    /// Names the first shader input semantic that no bound vertex buffer provides
    InvalidVertexLayout(String),
    Device(MoltenError),
}

impl std::fmt::Display for BindError {
    fn fmt(
        &self,
        fmt: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        match self {
            BindError::MissingShader(stage) => write!(fmt, "no shader for stage {:?}", stage),
            BindError::InvalidVertexLayout(semantic) => write!(
                fmt,
                "no bound vertex buffer provides shader input {}",
                semantic
            ),
            BindError::Device(e) => write!(fmt, "{}", e),
        }
    }
}

impl From<MoltenError> for BindError {
    fn from(error: MoltenError) -> Self {
        BindError::Device(error)
    }
}

impl From<&BindError> for GraphicsBindResult {
    fn from(error: &BindError) -> Self {
        match error {
            BindError::MissingShader(stage) => GraphicsBindResult::MissingShader(*stage),
            BindError::InvalidVertexLayout(_) => GraphicsBindResult::InvalidVertexLayout,
            BindError::Device(_) => GraphicsBindResult::BindFailed,
        }
    }
}

/// Implemented by values stored in slots that refer to resources, so binders can refuse to issue
/// a resource that has been disposed
pub(crate) trait BindingValue {
    fn check_live(&self) -> Result<(), BindError>;
}

fn check_disposed(
    disposed: bool,
    id: molten_api::MoltenResourceId,
) -> Result<(), BindError> {
    if disposed {
        Err(BindError::Device(MoltenError::ResourceDisposed(id)))
    } else {
        Ok(())
    }
}

impl BindingValue for Option<MoltenShader> {
    fn check_live(&self) -> Result<(), BindError> {
        match self {
            Some(x) => check_disposed(x.is_disposed(), x.id()),
            None => Ok(()),
        }
    }
}

impl BindingValue for Option<MoltenTexture> {
    fn check_live(&self) -> Result<(), BindError> {
        match self {
            Some(x) => check_disposed(x.is_disposed(), x.id()),
            None => Ok(()),
        }
    }
}

// Samplers have no disposal state
impl BindingValue for Option<MoltenSampler> {
    fn check_live(&self) -> Result<(), BindError> {
        Ok(())
    }
}

impl BindingValue for Option<MoltenVertexBufferBinding> {
    fn check_live(&self) -> Result<(), BindError> {
        match self {
            Some(x) => check_disposed(x.buffer.is_disposed(), x.buffer.id()),
            None => Ok(()),
        }
    }
}

impl BindingValue for Option<MoltenIndexBufferBinding> {
    fn check_live(&self) -> Result<(), BindError> {
        match self {
            Some(x) => check_disposed(x.buffer.is_disposed(), x.buffer.id()),
            None => Ok(()),
        }
    }
}

impl BindingValue for Option<MoltenConstantBufferBinding> {
    fn check_live(&self) -> Result<(), BindError> {
        match self {
            Some(x) => check_disposed(x.buffer.is_disposed(), x.buffer.id()),
            None => Ok(()),
        }
    }
}

pub(crate) fn check_all_live<T: BindingValue>(values: &[T]) -> Result<(), BindError> {
    for value in values {
        value.check_live()?;
    }
    Ok(())
}
