use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Stored data failed to decode: truncation, overlength fields,
    /// bad namespace bytes, or an unrepresentable varint.
    Corrupt,
    /// A decoded integer exceeds the domain of its target field.
    Range,
    /// The operation needs a table this database was built without.
    FeatureUnavailable,
    DatabaseClosed,
    InvalidArgument,
    Io,
    Internal,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    pub fn corrupt(context: &str) -> Self {
        Error::new(ErrorKind::Corrupt, context.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
