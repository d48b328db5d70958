use std::fmt::{Display, Formatter};

pub type BmResult<T> = Result<T, BmError>;

/// Error taxonomy for the core: malformed wire input, protocol violations during
/// the handshake, cryptographic failures, invalid proof-of-work, and bad arguments
/// passed into an encoder. Every decode/encode operation returns one of these
/// instead of panicking.
#[derive(Debug)]
pub enum BmError {
    /// Malformed wire input: bad magic, non-minimal var_int, truncated buffer, failed checksum.
    Codec(String),
    /// Protocol violation during handshake or object dispatch: wrong command, unsupported version,
    /// self-connection, stream mismatch, clock skew, missing service bits.
    Protocol(String),
    /// Cryptographic failure: invalid signature, ECIES MAC mismatch.
    Crypto(String),
    /// Proof-of-work did not meet the target, or the nonce search pool failed.
    Pow(String),
    /// Bad argument: oversized payload, invalid address version, bad bitfield position.
    Argument(String),
}

impl BmError {
    pub fn codec<S: Into<String>>(msg: S) -> Self {
        BmError::Codec(msg.into())
    }

    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        BmError::Protocol(msg.into())
    }

    pub fn crypto<S: Into<String>>(msg: S) -> Self {
        BmError::Crypto(msg.into())
    }

    pub fn pow<S: Into<String>>(msg: S) -> Self {
        BmError::Pow(msg.into())
    }

    pub fn argument<S: Into<String>>(msg: S) -> Self {
        BmError::Argument(msg.into())
    }

    fn msg(&self) -> &str {
        match self {
            BmError::Codec(m) => m,
            BmError::Protocol(m) => m,
            BmError::Crypto(m) => m,
            BmError::Pow(m) => m,
            BmError::Argument(m) => m,
        }
    }
}

impl Display for BmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg())
    }
}

impl std::error::Error for BmError {}

impl From<String> for BmError {
    fn from(msg: String) -> Self {
        BmError::Codec(msg)
    }
}

impl From<&str> for BmError {
    fn from(msg: &str) -> Self {
        BmError::from(msg.to_string())
    }
}

impl From<std::io::Error> for BmError {
    fn from(value: std::io::Error) -> Self {
        BmError::codec(format!("{}", value))
    }
}
