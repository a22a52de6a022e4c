//! RPC error codes and error type.

use tavern_store::StoreError;

use crate::rpc::types::RpcErrorBody;

// ── Error code constants ────────────────────────────────────────────

/// Invalid or missing parameters.
pub const INVALID_PARAMS: &str = "INVALID_PARAMS";
/// Unexpected internal error.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
/// Method not found in the registry.
pub const METHOD_NOT_FOUND: &str = "METHOD_NOT_FOUND";
/// Table does not exist.
pub const TABLE_NOT_FOUND: &str = "TABLE_NOT_FOUND";
/// Player does not exist.
pub const PLAYER_NOT_FOUND: &str = "PLAYER_NOT_FOUND";
/// Persistent store failure.
pub const STORE_ERROR: &str = "STORE_ERROR";

/// RPC error type returned by handlers.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Required parameter missing or wrong shape.
    #[error("{message}")]
    InvalidParams {
        /// Description of what is wrong.
        message: String,
    },

    /// Requested resource not found.
    #[error("{message}")]
    NotFound {
        /// Specific error code (e.g. `TABLE_NOT_FOUND`).
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Persistent store failure.
    #[error("{message}")]
    Store {
        /// Description.
        message: String,
    },

    /// Internal server error.
    #[error("{message}")]
    Internal {
        /// Description.
        message: String,
    },
}

impl RpcError {
    /// Machine-readable error code for this variant.
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidParams { .. } => INVALID_PARAMS,
            Self::NotFound { code, .. } => code,
            Self::Store { .. } => STORE_ERROR,
            Self::Internal { .. } => INTERNAL_ERROR,
        }
    }

    /// Convert to the wire-format error body.
    pub fn to_error_body(&self) -> RpcErrorBody {
        RpcErrorBody {
            code: self.code().to_owned(),
            message: self.to_string(),
        }
    }
}

impl From<StoreError> for RpcError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TableNotFound(id) => Self::NotFound {
                code: TABLE_NOT_FOUND,
                message: format!("table '{id}' not found"),
            },
            StoreError::PlayerNotFound(id) => Self::NotFound {
                code: PLAYER_NOT_FOUND,
                message: format!("player '{id}' not found"),
            },
            StoreError::Serde(e) => Self::InvalidParams {
                message: format!("malformed payload: {e}"),
            },
            other => Self::Store {
                message: other.to_string(),
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
