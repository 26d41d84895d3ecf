//! Error types for 3MF decoding
//!
//! This module provides the error and warning types used across the crate.
//! Fatal conditions are reported as [`Error`]; conditions that lenient decoding
//! can recover from are described by [`WarningKind`] and collected on the model
//! as [`Warning`]s.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and archive errors
//! - **E2xxx**: XML parsing and structure errors
//! - **E3xxx**: Model and reference errors
//! - **E4xxx**: Unsupported features
//! - **E5xxx**: Decode control (cancellation, part context)
//!
//! ## Common Error Codes
//!
//! - `E1001`: I/O error reading file
//! - `E1002`: ZIP archive format error
//! - `E1003`: Missing required file in archive
//! - `E2001`: XML parsing error
//! - `E2006`: Missing required attribute
//! - `E2007`: Invalid value for a required attribute
//! - `E3003`: Unresolved resource reference
//! - `E3008`: Vertex capacity exceeded
//! - `E5001`: Decoding cancelled

use std::io;
use thiserror::Error;

/// Result type for 3MF operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when decoding or encoding 3MF packages
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading the file
    ///
    /// **Error Code**: E1001
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Corrupted ZIP file
    /// - Unsupported compression method
    /// - Truncated archive
    #[error("[E1002] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Missing required file in the 3MF archive
    ///
    /// **Error Code**: E1003
    #[error("[E1003] Missing required file: {0}")]
    MissingFile(String),

    /// XML parsing error
    ///
    /// **Error Code**: E2001
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error
    ///
    /// **Error Code**: E2002
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// Invalid XML structure
    ///
    /// **Error Code**: E2003
    #[error("[E2003] Invalid XML structure: {0}")]
    InvalidXml(String),

    /// Invalid 3MF package format
    ///
    /// **Error Code**: E2004
    ///
    /// **Common Causes**:
    /// - Non-compliant OPC structure
    /// - Missing required OPC relationships
    #[error("[E2004] Invalid 3MF format: {0}")]
    InvalidFormat(String),

    /// XML writing error
    ///
    /// **Error Code**: E2005
    #[error("[E2005] XML writing error: {0}")]
    XmlWrite(String),

    /// A required attribute is absent
    ///
    /// **Error Code**: E2006
    ///
    /// Raised in strict mode; lenient decoding records a warning and skips
    /// the element instead.
    #[error("[E2006] Element '<{element}>' is missing required attribute '{name}'")]
    MissingRequiredField {
        /// Element carrying the attribute
        element: String,
        /// Attribute name
        name: String,
    },

    /// A required attribute is present but cannot be parsed
    ///
    /// **Error Code**: E2007
    ///
    /// Always fatal, in both strict and lenient mode.
    #[error("[E2007] Element '<{element}>' has an invalid value '{value}' for required attribute '{name}'")]
    InvalidRequiredValue {
        /// Element carrying the attribute
        element: String,
        /// Attribute name
        name: String,
        /// The offending value
        value: String,
    },

    /// Invalid model structure
    ///
    /// **Error Code**: E3001
    #[error("[E3001] Invalid model: {0}")]
    InvalidModel(String),

    /// Parse error for numeric values
    ///
    /// **Error Code**: E3002
    #[error("[E3002] Parse error: {0}")]
    ParseError(String),

    /// A reference names a resource that does not exist
    ///
    /// **Error Code**: E3003
    #[error("[E3003] Unresolved reference to resource {id} in part '{path}'")]
    UnresolvedReference {
        /// Part path of the referenced resource
        path: String,
        /// Numeric resource id
        id: u32,
    },

    /// A reference resolves to a resource that is not an object
    ///
    /// **Error Code**: E3004
    #[error("[E3004] Resource {id} in part '{path}' is not an object")]
    ReferenceTypeMismatch {
        /// Part path of the referenced resource
        path: String,
        /// Numeric resource id
        id: u32,
    },

    /// A non-root part tried to reference another part
    ///
    /// **Error Code**: E3005
    #[error("[E3005] Path attribute '{path}' is not allowed outside the root model part")]
    CrossPartPathInNonRoot {
        /// The rejected path value
        path: String,
    },

    /// Resource id zero
    ///
    /// **Error Code**: E3006
    #[error("[E3006] Invalid resource id {id} in part '{path}': ids must be positive")]
    InvalidResourceId {
        /// Part path
        path: String,
        /// The rejected id
        id: u32,
    },

    /// Resource id registered twice in the same part
    ///
    /// **Error Code**: E3007
    #[error("[E3007] Duplicate resource id {id} in part '{path}'")]
    DuplicateResourceId {
        /// Part path
        path: String,
        /// The duplicated id
        id: u32,
    },

    /// Vertex count would exceed the representable maximum
    ///
    /// **Error Code**: E3008
    #[error("[E3008] Mesh vertex capacity exceeded (maximum {max} vertices)")]
    CapacityExceeded {
        /// Maximum vertex count of the mesh
        max: u32,
    },

    /// An object fails its structural validity check
    ///
    /// **Error Code**: E3009
    ///
    /// **Common Causes**:
    /// - Model or solid support mesh that is open or inconsistently oriented
    /// - Support or surface mesh carrying beams
    /// - Components object without components
    #[error("[E3009] Object {id} in part '{path}' is not a valid {object_type} object: {reason}")]
    NotManifold {
        /// Part path
        path: String,
        /// Object id
        id: u32,
        /// Object type name
        object_type: String,
        /// Which validity rule the object breaks
        reason: InvalidObjectReason,
    },

    /// A sliced object is placed with a transform that is not planar in Z
    ///
    /// **Error Code**: E3010
    #[error("[E3010] Object {id} in part '{path}' is not valid for slices under its build transform")]
    NotValidForSlices {
        /// Part path
        path: String,
        /// Object id
        id: u32,
    },

    /// Assembly graph contains a cycle
    ///
    /// **Error Code**: E3011
    #[error("[E3011] Cyclic component reference through object {id} in part '{path}'")]
    CyclicReference {
        /// Part path of the object closing the cycle
        path: String,
        /// Object id closing the cycle
        id: u32,
    },

    /// Unsupported feature
    ///
    /// **Error Code**: E4001
    #[error("[E4001] Unsupported feature: {0}")]
    Unsupported(String),

    /// Decoding was cancelled
    ///
    /// **Error Code**: E5001
    #[error("[E5001] Decoding cancelled")]
    Cancelled,

    /// An error raised while decoding a specific part
    ///
    /// **Error Code**: E5002
    #[error("[E5002] In part '{part}' at <{element}>: {source}")]
    InPart {
        /// Part path
        part: String,
        /// Element being decoded when the error occurred
        element: String,
        /// The underlying error
        #[source]
        source: Box<Error>,
    },
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::ParseError(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ParseError(format!("Failed to parse integer: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl From<quick_xml::encoding::EncodingError> for Error {
    fn from(err: quick_xml::encoding::EncodingError) -> Self {
        Error::InvalidXml(format!("Invalid text encoding: {}", err))
    }
}

impl Error {
    /// Create an InvalidXml error with element context
    pub fn invalid_xml_element(element: &str, message: &str) -> Self {
        Error::InvalidXml(format!("Element '<{}>': {}", element, message))
    }

    /// Create a MissingRequiredField error
    ///
    /// # Example
    /// ```ignore
    /// Error::missing_attribute("object", "id")
    /// ```
    pub fn missing_attribute(element: &str, attribute: &str) -> Self {
        Error::MissingRequiredField {
            element: element.to_string(),
            name: attribute.to_string(),
        }
    }

    /// Create an InvalidRequiredValue error
    pub fn invalid_required(element: &str, attribute: &str, value: &str) -> Self {
        Error::InvalidRequiredValue {
            element: element.to_string(),
            name: attribute.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an InvalidFormat error with context about what structure is invalid
    pub fn invalid_format_context(context: &str, message: &str) -> Self {
        Error::InvalidFormat(format!("{}: {}", context, message))
    }

    /// Create an XmlWrite error
    pub fn xml_write(message: String) -> Self {
        Error::XmlWrite(message)
    }

    /// Attach part and element context to an error
    ///
    /// Errors that already carry part context and cancellation errors are
    /// returned unchanged.
    pub fn in_part(self, part: &str, element: &str) -> Self {
        match self {
            Error::InPart { .. } | Error::Cancelled => self,
            other => Error::InPart {
                part: part.to_string(),
                element: element.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The error with any part context removed
    pub fn innermost(&self) -> &Error {
        match self {
            Error::InPart { source, .. } => source.innermost(),
            other => other,
        }
    }

    /// Whether this error (or the error it wraps) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self.innermost(), Error::Cancelled)
    }
}

/// The validity rule an object breaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidObjectReason {
    /// Mesh object without a mesh
    MissingMesh,
    /// Model or solid support mesh that is open or inconsistently oriented
    NotManifold,
    /// Support or surface mesh carrying beams
    HasBeams,
    /// Objects of type `other` are never valid
    OtherType,
    /// Components object without components
    EmptyComponents,
}

impl std::fmt::Display for InvalidObjectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            InvalidObjectReason::MissingMesh => "mesh is missing",
            InvalidObjectReason::NotManifold => "mesh is not closed and consistently oriented",
            InvalidObjectReason::HasBeams => "support and surface meshes may not carry beams",
            InvalidObjectReason::OtherType => "objects of type other are never valid",
            InvalidObjectReason::EmptyComponents => "components object has no components",
        })
    }
}

/// Conditions that lenient decoding records instead of aborting
///
/// In strict mode each of these is promoted to the matching [`Error`]
/// variant through `From<WarningKind>`, except `InvalidOptionalValue`, which
/// is a warning in every mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// A required attribute is absent; the element was skipped
    #[error("missing required attribute '{name}'")]
    MissingRequiredField {
        /// Attribute name
        name: String,
    },

    /// An optional attribute has a value that could not be understood; the
    /// default was kept
    #[error("invalid value '{value}' for optional attribute '{name}'")]
    InvalidOptionalValue {
        /// Attribute name
        name: String,
        /// The offending value
        value: String,
    },

    /// A reference could not be resolved; the referencing element was dropped
    #[error("unresolved reference to resource {id} in part '{path}'")]
    UnresolvedReference {
        /// Part path of the referenced resource
        path: String,
        /// Numeric resource id
        id: u32,
    },

    /// A reference resolved to a non-object resource; the referencing
    /// element was dropped
    #[error("resource {id} in part '{path}' is not an object")]
    ReferenceTypeMismatch {
        /// Part path of the referenced resource
        path: String,
        /// Numeric resource id
        id: u32,
    },

    /// Structural problem with an object or build item
    #[error("{0}")]
    InvalidObject(String),

    /// Construct that is accepted but has no effect
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl WarningKind {
    /// Whether strict mode turns this condition into an error
    pub fn is_critical(&self) -> bool {
        !matches!(self, WarningKind::InvalidOptionalValue { .. })
    }
}

impl From<WarningKind> for Error {
    fn from(kind: WarningKind) -> Self {
        match kind {
            WarningKind::MissingRequiredField { name } => Error::MissingRequiredField {
                element: String::new(),
                name,
            },
            WarningKind::InvalidOptionalValue { name, value } => Error::ParseError(format!(
                "invalid value '{}' for optional attribute '{}'",
                value, name
            )),
            WarningKind::UnresolvedReference { path, id } => {
                Error::UnresolvedReference { path, id }
            }
            WarningKind::ReferenceTypeMismatch { path, id } => {
                Error::ReferenceTypeMismatch { path, id }
            }
            WarningKind::InvalidObject(message) => Error::InvalidModel(message),
            WarningKind::Unsupported(message) => Error::Unsupported(message),
        }
    }
}

/// A recoverable problem recorded during decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Part path where the problem was found
    pub part: String,
    /// Element being decoded
    pub element: String,
    /// What went wrong
    pub kind: WarningKind,
}

impl Warning {
    /// Create a new warning
    pub fn new(part: impl Into<String>, element: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            part: part.into(),
            element: element.into(),
            kind,
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@<{}>: {}", self.part, self.element, self.kind)
    }
}
