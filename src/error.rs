use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the tool.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}: parse error: {details}", file.display())]
    Sniff { file: PathBuf, details: String },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Errors raised at the libxml2 FFI boundary.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("schema parsing failed: {details}")]
    SchemaParseFailed { details: String },

    #[error("validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("memory allocation failed in libxml2")]
    MemoryAllocation,

    #[error("{}: {details}", file.display())]
    DocumentParseFailed { file: PathBuf, details: String },

    #[error("validation generated an internal error (code {code}) for {}", file.display())]
    InternalError { code: i32, file: PathBuf },

    #[error("path is not representable as a C string: {}", file.display())]
    InvalidPath { file: PathBuf },

    #[error("no schema loaded")]
    NoSchema,
}

pub type Result<T> = std::result::Result<T, ToolError>;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_engine_error_display() {
        let parse_failed = EngineError::SchemaParseFailed {
            details: "element decl missing".to_string(),
        };
        assert!(parse_failed.to_string().contains("schema parsing failed"));
        assert!(parse_failed.to_string().contains("element decl missing"));

        let internal = EngineError::InternalError {
            code: -1,
            file: PathBuf::from("test.xml"),
        };
        assert!(internal.to_string().contains("internal error"));
        assert!(internal.to_string().contains("test.xml"));
    }

    #[test]
    fn test_engine_error_conversion() {
        let engine_error = EngineError::MemoryAllocation;
        let tool_error: ToolError = engine_error.into();
        match tool_error {
            ToolError::Engine(EngineError::MemoryAllocation) => (),
            other => panic!("expected Engine variant, got {:?}", other),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let tool_error: ToolError = io_error.into();
        assert!(tool_error.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let tool_error = ToolError::Io(io_error);
        assert_eq!(tool_error.source().unwrap().to_string(), "no such file");
    }
}
