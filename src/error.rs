use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// The text measurer rejected a text/width combination.
    Measure(String),
    /// A font file could not be read or parsed.
    Font(String),
    Render(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Measure(msg) => write!(f, "Text measurement failed: {msg}"),
            Error::Font(msg) => write!(f, "Font error: {msg}"),
            Error::Render(msg) => write!(f, "PDF rendering failed: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
