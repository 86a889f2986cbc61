use thiserror::Error;

use crate::value::AttributeValue;

pub type KvResult<T> = Result<T, KvError>;

#[derive(Error, Debug)]
pub enum KvError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("Encryption of attribute '{attribute}' failed: {message}")]
    Encryption { attribute: String, message: String },
    #[error("Decryption of attribute '{attribute}' failed: {message}")]
    Decryption { attribute: String, message: String },
    #[error("{0}")]
    Other(String),
}

/// Failure while moving a value between Rust and the wire encoding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Missing required attribute '{0}'")]
    MissingAttribute(String),

    #[error("Expected a {expected} attribute, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Value '{value}' is not a valid {target}")]
    InvalidNumber { value: String, target: &'static str },

    #[error("Invalid datetime '{0}'")]
    InvalidDateTime(String),

    #[error("Key '{found}' does not start with '{expected}'")]
    KeyPrefixMismatch { expected: String, found: String },

    #[error("Attribute '{attribute}' should match '{expected}' but was {found:?}")]
    DiscriminatorMismatch {
        attribute: String,
        expected: String,
        found: Option<String>,
    },

    #[error("Record with {attribute} = {value:?} matches no known entity type")]
    UnknownRecord {
        attribute: String,
        value: Option<String>,
    },

    #[error("Converter failed: {0}")]
    Converter(String),

    #[error("In attribute '{attribute}': {source}")]
    Attribute {
        attribute: String,
        #[source]
        source: Box<ConversionError>,
    },
}

impl ConversionError {
    pub fn type_mismatch(expected: &'static str, found: &AttributeValue) -> Self {
        ConversionError::TypeMismatch {
            expected,
            found: found.tag(),
        }
    }

    /// Attach the attribute name the failure happened in.
    ///
    /// Already-attributed errors are kept as they are so the innermost
    /// attribute is reported.
    pub fn at(self, attribute: &str) -> Self {
        match self {
            ConversionError::Attribute { .. } | ConversionError::MissingAttribute(_) => self,
            other => ConversionError::Attribute {
                attribute: attribute.to_string(),
                source: Box::new(other),
            },
        }
    }
}
