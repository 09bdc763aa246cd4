/// Broad failure classes for a simulation run.
///
/// Degenerate inputs (zero weights, zero observed revenue, empty subgroups) are
/// not represented here: they are logged and produce neutral/NA results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid configuration, CLI input, or file I/O.
    Configuration,
    /// A required input category/column is absent.
    MissingData,
    /// An internal invariant was broken (logic defect).
    ShapeMismatch,
}

impl ErrorKind {
    fn default_exit_code(self) -> u8 {
        match self {
            ErrorKind::Configuration => 2,
            ErrorKind::MissingData => 3,
            ErrorKind::ShapeMismatch => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        let kind = match exit_code {
            3 => ErrorKind::MissingData,
            4 => ErrorKind::ShapeMismatch,
            _ => ErrorKind::Configuration,
        };
        Self {
            kind,
            exit_code,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Configuration, message)
    }

    pub fn missing_data(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::MissingData, message)
    }

    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::ShapeMismatch, message)
    }

    fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            exit_code: kind.default_exit_code(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_exit_codes() {
        assert_eq!(AppError::configuration("x").exit_code(), 2);
        assert_eq!(AppError::missing_data("x").exit_code(), 3);
        assert_eq!(AppError::shape_mismatch("x").exit_code(), 4);
        assert_eq!(AppError::new(3, "x").kind(), ErrorKind::MissingData);
    }
}
