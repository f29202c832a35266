//! Error types for the OXM library.

use thiserror::Error;

/// Errors that can occur while mapping objects to and from XML.
#[derive(Error, Debug)]
pub enum Error {
    /// No class mapping is registered for an element name or class identifier
    #[error("No mapping registered for '{0}'")]
    UnknownMapping(String),

    /// A required field had no value
    #[error("Required field '{field}' of '{class}' is missing")]
    RequiredFieldMissing {
        /// Class identifier of the mapping declaring the field
        class: String,
        /// Name of the missing field
        field: String,
    },

    /// The XML input is not in a state the unmarshaller can interpret
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// A scalar value could not be converted to or from text
    #[error("Cannot convert value of type '{type_name}': {message}")]
    Converter {
        /// The scalar type identifier
        type_name: String,
        /// Description of the failure
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A class mapping violates a mapping invariant
    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    /// An object accessor was handed a value of the wrong shape
    #[error("Invalid value for field '{field}' of '{class}': {message}")]
    InvalidFieldValue {
        /// Class identifier of the object
        class: String,
        /// Field that rejected the value
        field: String,
        /// Description of the mismatch
        message: String,
    },

    /// Element nesting exceeded the configured maximum depth
    #[error("Document nesting exceeds the maximum depth of {0}")]
    DepthLimitExceeded(usize),

    /// An unmarshalled object is not of the requested concrete type
    #[error("Expected an instance of '{expected}', found '{found}'")]
    UnexpectedType {
        /// The requested class identifier
        expected: String,
        /// The class identifier that was actually produced
        found: String,
    },

    /// A storage identifier cannot be used as a file name
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl Error {
    /// Creates a converter error for the given type identifier.
    pub fn converter(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Converter {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid field value error.
    pub fn invalid_field(
        class: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::InvalidFieldValue {
            class: class.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(io) => Error::Io(std::io::Error::new(io.kind(), io.to_string())),
            other => Error::MalformedDocument(other.to_string()),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::MalformedDocument(format!("invalid attribute: {}", err))
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::MalformedDocument(format!("invalid UTF-8: {}", err))
    }
}

/// Result type alias for OXM operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_xml_errors_are_malformed_documents() {
        let err: Error = quick_xml::Error::Syntax(quick_xml::errors::SyntaxError::UnclosedTag).into();
        assert!(matches!(err, Error::MalformedDocument(_)));
    }

    #[test]
    fn test_error_display() {
        let err = Error::RequiredFieldMissing {
            class: "library::Book".to_string(),
            field: "isbn".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Required field 'isbn' of 'library::Book' is missing"
        );
    }
}
