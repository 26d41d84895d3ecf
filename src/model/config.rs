//! Decoder configuration

use crate::parser::CancellationToken;

/// Default number of bytes consumed between cancellation checks (4 MiB)
pub const DEFAULT_CANCELLATION_CHECK_BYTES: u64 = 4 * 1024 * 1024;

/// Configuration for decoding 3MF packages
///
/// The default configuration is strict and validates the build after
/// decoding.
///
/// # Example
///
/// ```
/// use lib3mf_stream::{CancellationToken, ParserConfig};
///
/// let token = CancellationToken::new();
/// let config = ParserConfig::lenient()
///     .with_cancellation(token.clone())
///     .with_attachment_relationship("http://example.com/rel/customdata");
/// assert!(!config.is_strict());
/// ```
#[derive(Debug, Clone)]
pub struct ParserConfig {
    strict: bool,
    validate: bool,
    cancellation: Option<CancellationToken>,
    attachment_relationships: Vec<String>,
    cancellation_check_bytes: u64,
}

impl ParserConfig {
    /// Create a strict configuration
    ///
    /// Missing required attributes and unresolved references abort the
    /// decode.
    pub fn new() -> Self {
        Self {
            strict: true,
            validate: true,
            cancellation: None,
            attachment_relationships: Vec::new(),
            cancellation_check_bytes: DEFAULT_CANCELLATION_CHECK_BYTES,
        }
    }

    /// Create a lenient configuration
    ///
    /// Recoverable problems are recorded as [`crate::Warning`]s on the model
    /// and the offending element is skipped.
    pub fn lenient() -> Self {
        Self::new().with_strict(false)
    }

    /// Choose between strict and lenient decoding
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Enable or disable build validation after decoding
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Decode under an external cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Treat parts referenced with this relationship type as attachments
    ///
    /// Texture relationships are always collected.
    pub fn with_attachment_relationship(mut self, relationship_type: impl Into<String>) -> Self {
        self.attachment_relationships.push(relationship_type.into());
        self
    }

    /// Set how many bytes are consumed between cancellation checks
    ///
    /// A value of zero checks before every token.
    pub fn with_cancellation_check_bytes(mut self, bytes: u64) -> Self {
        self.cancellation_check_bytes = bytes;
        self
    }

    /// Whether decoding is strict
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Whether the build is validated after decoding
    pub fn validates(&self) -> bool {
        self.validate
    }

    /// The external cancellation token, if any
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Custom relationship types collected as attachments
    pub fn attachment_relationships(&self) -> &[String] {
        &self.attachment_relationships
    }

    /// Bytes consumed between cancellation checks
    pub fn cancellation_check_bytes(&self) -> u64 {
        self.cancellation_check_bytes
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}
