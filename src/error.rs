use thiserror::Error;

/// Reasons a single datagram could not be turned into a message.
///
/// None of these are fatal to a listener; they describe one datagram only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Payload is not well-formed XML (or not UTF-8).
    #[error("malformed datagram: {0}")]
    Parse(String),

    /// Well-formed XML with a root tag we do not decode (weather, firmware status, ...).
    #[error("unsupported message type <{0}>")]
    Unsupported(String),

    /// Recognised message kind that breaks a structural rule.
    #[error("invalid message: {0}")]
    Validation(String),
}

impl DecodeError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::Unsupported(_) => "unsupported",
            Self::Validation(_) => "validation",
        }
    }
}

impl From<roxmltree::Error> for DecodeError {
    fn from(err: roxmltree::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<std::str::Utf8Error> for DecodeError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::Parse(err.to_string())
    }
}
