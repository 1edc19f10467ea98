// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the network compiler/runner.
//!
//! Every failure surfaces as a [`RuntimeError`], and every `RuntimeError`
//! carries a stable [`StatusCode`] alongside its message.

use accelerator::{AccelError, DeviceType};
use device_memory::MemoryError;
use model_ir::ModelError;
use tensor_core::DType;
use std::fmt;
use std::path::PathBuf;

/// Stable status codes reported alongside error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum StatusCode {
    /// Structure or resource missing from the interpreter.
    NullParam,
    DeviceNotSupported,
    OutOfMemory,
    /// A layer could not be constructed.
    LayerError,
    /// A blob has no matching engine binding.
    BindingError,
    /// Build, serialize, deserialize or enqueue failed.
    AcceleratorError,
    IoError,
    /// Another process holds the cache lock.
    CacheContention,
    ConfigError,
    InvalidInput,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NullParam => "NULL_PARAM",
            Self::DeviceNotSupported => "DEVICE_NOT_SUPPORTED",
            Self::OutOfMemory => "OUT_OF_MEMORY",
            Self::LayerError => "LAYER_ERROR",
            Self::BindingError => "BINDING_ERROR",
            Self::AcceleratorError => "ACCELERATOR_ERROR",
            Self::IoError => "IO_ERROR",
            Self::CacheContention => "CACHE_CONTENTION",
            Self::ConfigError => "CONFIG_ERROR",
            Self::InvalidInput => "INVALID_INPUT",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Blob errors ────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob '{0}' not found")]
    NotFound(String),

    #[error("blob '{0}' already exists")]
    AlreadyExists(String),

    /// A blob may carry a native tensor only once.
    #[error("blob '{0}' already carries a native tensor")]
    AlreadyDecorated(String),

    /// Dimension 0 (the batch) of an input is zero.
    #[error("input '{0}' has a zero batch dimension")]
    ZeroBatch(String),

    #[error("blob '{name}' has an invalid shape: {detail}")]
    InvalidShape { name: String, detail: String },

    #[error("blob '{name}' holds {expected} elements, got {actual}")]
    SizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("blob '{name}' is {dtype}; host data must be f32")]
    UnsupportedDType { name: String, dtype: DType },

    #[error("scratch request of {requested} bytes exceeds the workspace limit of {limit} bytes")]
    WorkspaceExceeded { requested: usize, limit: usize },

    #[error("blob memory allocation failed: {0}")]
    Memory(#[from] MemoryError),
}

// ── Layer errors ───────────────────────────────────────────────

/// Raised by a layer builder; the network adds the layer name and type.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("expects {expected} {what}, got {actual}")]
    Arity {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("missing resource '{0}'")]
    MissingResource(String),

    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("shape mismatch: {0}")]
    Shape(String),

    /// An input blob has no native tensor yet.
    #[error("input blob '{0}' has no native tensor")]
    NoNativeTensor(String),

    #[error("builder used before init")]
    NotInitialized,

    #[error(transparent)]
    Native(#[from] AccelError),
}

// ── Cache errors ───────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The lock is held elsewhere and the lock policy gave up.
    #[error("cache lock '{}' is held by another process", path.display())]
    Contention { path: PathBuf },

    #[error("cache file '{}' is invalid: {detail}", path.display())]
    Corrupt { path: PathBuf, detail: String },
}

impl CacheError {
    /// Whether trying again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Contention { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ── Runtime errors ─────────────────────────────────────────────

/// Errors returned by [`AcceleratedNetwork`](crate::AcceleratedNetwork).
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The interpreter has not parsed the named part of the model.
    #[error("interpreter provides no {0}")]
    NullParam(&'static str),

    #[error("device {device_type} (id {device_id}) is not supported")]
    DeviceNotSupported {
        device_type: DeviceType,
        device_id: u32,
    },

    #[error("blob error: {0}")]
    Blob(#[from] BlobError),

    #[error("cannot construct layer '{layer}' ({layer_type}): {detail}")]
    LayerConstruction {
        layer: String,
        layer_type: String,
        detail: String,
    },

    #[error("binding error: {0}")]
    Binding(String),

    #[error("accelerator error: {0}")]
    Accelerator(AccelError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("model error: {0}")]
    Model(#[source] ModelError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<AccelError> for RuntimeError {
    fn from(e: AccelError) -> Self {
        match e {
            AccelError::DeviceNotSupported {
                device_type,
                device_id,
            } => Self::DeviceNotSupported {
                device_type,
                device_id,
            },
            other => Self::Accelerator(other),
        }
    }
}

impl From<ModelError> for RuntimeError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::UnknownLayerType { layer, layer_type } => Self::LayerConstruction {
                layer,
                layer_type,
                detail: "no builder for this layer type".into(),
            },
            other => Self::Model(other),
        }
    }
}

impl RuntimeError {
    /// The status code reported for this error.
    pub fn code(&self) -> StatusCode {
        match self {
            Self::NullParam(_) => StatusCode::NullParam,
            Self::DeviceNotSupported { .. } => StatusCode::DeviceNotSupported,
            Self::Blob(BlobError::Memory(_)) => StatusCode::OutOfMemory,
            Self::Blob(BlobError::WorkspaceExceeded { .. }) => StatusCode::OutOfMemory,
            Self::Blob(_) => StatusCode::InvalidInput,
            Self::LayerConstruction { .. } => StatusCode::LayerError,
            Self::Binding(_) => StatusCode::BindingError,
            Self::Accelerator(AccelError::Memory(_)) => StatusCode::OutOfMemory,
            Self::Accelerator(_) => StatusCode::AcceleratorError,
            Self::Cache(CacheError::Contention { .. }) => StatusCode::CacheContention,
            Self::Cache(_) => StatusCode::IoError,
            Self::Model(ModelError::ManifestReadError(_)) => StatusCode::IoError,
            Self::Model(ModelError::InvalidLayer { .. }) => StatusCode::LayerError,
            Self::Model(_) => StatusCode::InvalidInput,
            Self::Config(_) => StatusCode::ConfigError,
            Self::InvalidInput(_) => StatusCode::InvalidInput,
        }
    }

    /// Whether the same call may succeed if retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cache(e) if e.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(RuntimeError::NullParam("resource map").code(), StatusCode::NullParam);
        assert_eq!(
            RuntimeError::from(AccelError::DeviceNotSupported {
                device_type: DeviceType::Cuda,
                device_id: 0
            })
            .code(),
            StatusCode::DeviceNotSupported
        );
        assert_eq!(
            RuntimeError::from(AccelError::Build("x".into())).code(),
            StatusCode::AcceleratorError
        );
        assert_eq!(
            RuntimeError::from(BlobError::ZeroBatch("x".into())).code(),
            StatusCode::InvalidInput
        );
        assert_eq!(RuntimeError::Binding("y".into()).code(), StatusCode::BindingError);
    }

    #[test]
    fn test_contention_is_retryable() {
        let err = RuntimeError::from(CacheError::Contention {
            path: PathBuf::from("/tmp/x.lock"),
        });
        assert!(err.is_retryable());
        assert_eq!(err.code(), StatusCode::CacheContention);

        let io = RuntimeError::from(CacheError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        ));
        assert!(!io.is_retryable());
        assert_eq!(io.code(), StatusCode::IoError);
    }

    #[test]
    fn test_model_errors_on_layers() {
        let unknown = RuntimeError::from(ModelError::UnknownLayerType {
            layer: "c1".into(),
            layer_type: "conv3d".into(),
        });
        assert_eq!(unknown.code(), StatusCode::LayerError);
        assert_eq!(
            unknown.to_string(),
            "cannot construct layer 'c1' (conv3d): no builder for this layer type"
        );

        let invalid = RuntimeError::from(ModelError::InvalidLayer {
            layer: "r".into(),
            detail: "duplicate layer name".into(),
        });
        assert_eq!(invalid.code(), StatusCode::LayerError);

        let graph = RuntimeError::from(ModelError::InvalidGraph("output 'x' is a network input".into()));
        assert_eq!(graph.code(), StatusCode::InvalidInput);
    }

    #[test]
    fn test_layer_error_display() {
        let err = RuntimeError::LayerConstruction {
            layer: "fc1".into(),
            layer_type: "inner_product".into(),
            detail: LayerError::MissingResource("weight".into()).to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot construct layer 'fc1' (inner_product): missing resource 'weight'"
        );
    }
}
