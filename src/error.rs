use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A stored value has an unexpected length or an unknown format tag.
    #[error("corrupt record: {what}")]
    Corruption { what: String },
    /// A fixed-width codec was handed the wrong number of bytes.
    #[error("invalid input: expected {expected} bytes, found {found}")]
    InvalidInput { expected: usize, found: usize },
    #[error("unknown speed id {0}")]
    UnknownSpeed(u8),
    #[error("store failure: {0}")]
    Store(rocksdb::Error),
}

impl Error {
    pub(crate) fn corruption(what: impl Into<String>) -> Error {
        Error::Corruption { what: what.into() }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Error {
        match err.kind() {
            rocksdb::ErrorKind::Corruption => Error::corruption(err.into_string()),
            _ => Error::Store(err),
        }
    }
}
