use thiserror::Error;

/// Errors raised when decoding stored parameter values into typed modes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("Unknown {kind} name: '{name}'")]
    UnknownName { kind: &'static str, name: String },

    #[error("{kind} index {index} is out of range")]
    IndexOutOfRange { kind: &'static str, index: i32 },
}
