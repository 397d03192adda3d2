use serde_json::Value;
use thiserror::Error;

use crate::abi::decode_revert_reason;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("{message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;

    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(self, data: Value) -> Self {
        match self {
            Self::Rpc { code, message, .. } => Self::Rpc {
                code,
                message,
                data: Some(data),
            },
            other => other,
        }
    }

    pub fn from_rpc_object(error: &Value) -> Self {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(-32603);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Self::Rpc {
            code,
            message,
            data: error.get("data").cloned(),
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_user_rejected(&self) -> bool {
        self.code() == Some(Self::USER_REJECTED)
    }

    /// Some mobile wallets wrap 4902 inside `data.originalError`.
    pub fn is_unrecognized_chain(&self) -> bool {
        match self {
            Self::Rpc { code, data, .. } => {
                *code == Self::UNRECOGNIZED_CHAIN
                    || data
                        .as_ref()
                        .and_then(|d| d.get("originalError"))
                        .and_then(|e| e.get("code"))
                        .and_then(Value::as_i64)
                        == Some(Self::UNRECOGNIZED_CHAIN)
            }
            _ => false,
        }
    }

    /// Reason carried inside `data` (revert string, wrapped wallet error), if any.
    pub fn specific_reason(&self) -> Option<String> {
        match self {
            Self::Rpc { data, .. } => data.as_ref().and_then(nested_reason),
            _ => None,
        }
    }

    /// Most specific human-readable reason: a nested revert reason wins over
    /// the outer message, which wins over a generic fallback.
    pub fn reason(&self) -> String {
        let reason = match self {
            Self::Rpc { message, .. } => self
                .specific_reason()
                .unwrap_or_else(|| message.clone()),
            other => other.to_string(),
        };

        if reason.trim().is_empty() {
            "Transaction failed".to_owned()
        } else {
            reason
        }
    }
}

fn nested_reason(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) if raw.starts_with("0x") => decode_revert_reason(raw),
        Value::String(raw) if !raw.trim().is_empty() => Some(raw.clone()),
        Value::Object(map) => {
            for key in ["error", "data", "originalError"] {
                if let Some(reason) = map.get(key).and_then(nested_reason) {
                    return Some(reason);
                }
            }
            map.get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.trim().is_empty())
                .map(ToOwned::to_owned)
        }
        _ => None,
    }
}
