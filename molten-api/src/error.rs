use crate::MoltenResourceId;
use std::sync::Arc;

pub type MoltenResult<T> = Result<T, MoltenError>;

/// Generic error that contains all the different kinds of errors that may occur when using the API
#[derive(Debug, Clone)]
pub enum MoltenError {
    StringError(String),
    /// The API was used incorrectly (begin while recording, pop on an empty state stack, mapping
    /// a resource that is already mapped, etc.)
    InvalidOperation(String),
    /// The resource was disposed before the operation could run
    ResourceDisposed(MoltenResourceId),
    /// The backend failed to carry out an operation
    DeviceError(String),
    IoError(Arc<std::io::Error>),
}

impl MoltenError {
    pub fn invalid_operation<T: Into<String>>(message: T) -> Self {
        let message = message.into();
        log::error!("Invalid operation: {}", message);
        MoltenError::InvalidOperation(message)
    }

    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, MoltenError::InvalidOperation(_))
    }
}

impl std::error::Error for MoltenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            MoltenError::StringError(_) => None,
            MoltenError::InvalidOperation(_) => None,
            MoltenError::ResourceDisposed(_) => None,
            MoltenError::DeviceError(_) => None,
            MoltenError::IoError(ref e) => Some(&**e),
        }
    }
}

impl core::fmt::Display for MoltenError {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::fmt::Result {
        match *self {
            MoltenError::StringError(ref e) => e.fmt(fmt),
            MoltenError::InvalidOperation(ref e) => write!(fmt, "invalid operation: {}", e),
            MoltenError::ResourceDisposed(ref id) => {
                write!(fmt, "resource {:?} has been disposed", id)
            }
            MoltenError::DeviceError(ref e) => write!(fmt, "device error: {}", e),
            MoltenError::IoError(ref e) => e.fmt(fmt),
        }
    }
}

impl From<&str> for MoltenError {
    fn from(str: &str) -> Self {
        MoltenError::StringError(str.to_string())
    }
}

impl From<String> for MoltenError {
    fn from(string: String) -> Self {
        MoltenError::StringError(string)
    }
}

impl From<std::io::Error> for MoltenError {
    fn from(error: std::io::Error) -> Self {
        MoltenError::IoError(Arc::new(error))
    }
}
