//! Errors surfaced by the module operations

use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by `save_block`, `update_block`, `delete_block` and
/// `load_blocks`
#[derive(Error, Debug)]
pub enum ModuleError {
    /// `id`, `label` or `markup` was blank after trimming
    #[error("Module definitions require id, label, and markup.")]
    Validation,

    /// No module exists with the given id
    #[error("Module not found.")]
    NotFound { id: String },

    /// Neither the primary nor the fallback store could complete the request
    #[error("Module storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl ModuleError {
    /// Whether the caller can fix this by changing its input
    pub fn is_caller_error(&self) -> bool {
        matches!(self, ModuleError::Validation | ModuleError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_messages() {
        assert_eq!(
            ModuleError::Validation.to_string(),
            "Module definitions require id, label, and markup."
        );
        assert_eq!(
            ModuleError::NotFound {
                id: "missing".to_string()
            }
            .to_string(),
            "Module not found."
        );
    }

    #[test]
    fn test_caller_errors() {
        assert!(ModuleError::Validation.is_caller_error());
        assert!(ModuleError::NotFound { id: "x".into() }.is_caller_error());

        let storage = ModuleError::from(StorageError::Unavailable { backend: "sqlite" });
        assert!(!storage.is_caller_error());
        assert!(storage.to_string().contains("sqlite"));
    }
}
