//! Per-part decoding state

use super::CancellationToken;
use crate::error::{Error, Result, Warning, WarningKind};
use crate::model::{Build, Extension, MetadataEntry, ParserConfig, Part, ResourceId};
use crate::opc::normalize_part_name;
use crate::registry::{ObjectResolver, ResourceRegistry};
use std::collections::HashMap;
use std::str::FromStr;

/// Everything one part contributes to the model
#[derive(Debug)]
pub(crate) struct DecodedPart {
    pub part: Part,
    pub warnings: Vec<Warning>,
    pub unit: Option<String>,
    pub language: Option<String>,
    pub required_extensions: Vec<Extension>,
    pub required_custom_extensions: Vec<String>,
    pub build: Option<Build>,
}

/// How a reference found while decoding was settled
pub(crate) enum Reference {
    /// Points at this part and resolved to an object
    Local(ResourceId),
    /// Points at another part; checked once every part is merged
    Deferred(ResourceId),
    /// Could not be resolved and was dropped with a warning
    Dropped,
}

/// State shared by all decoders of one part
pub(crate) struct DecodeContext<'a> {
    pub path: String,
    pub is_root: bool,
    pub config: &'a ParserConfig,
    pub registry: ResourceRegistry,
    pub metadata: Vec<MetadataEntry>,
    pub build: Option<Build>,
    pub unit: Option<String>,
    pub language: Option<String>,
    pub required_extensions: Vec<Extension>,
    pub required_custom_extensions: Vec<String>,
    pub model_seen: bool,
    warnings: Vec<Warning>,
    namespaces: HashMap<String, String>,
    cancellation: Option<CancellationToken>,
}

impl<'a> DecodeContext<'a> {
    pub fn new(
        path: &str,
        is_root: bool,
        config: &'a ParserConfig,
        cancellation: Option<CancellationToken>,
    ) -> Self {
        Self {
            path: path.to_string(),
            is_root,
            config,
            registry: ResourceRegistry::new(path),
            metadata: Vec::new(),
            build: None,
            unit: None,
            language: None,
            required_extensions: Vec::new(),
            required_custom_extensions: Vec::new(),
            model_seen: false,
            warnings: Vec::new(),
            namespaces: HashMap::new(),
            cancellation,
        }
    }

    /// Fail with [`Error::Cancelled`] when decoding has been cancelled
    pub fn check_cancelled(&self) -> Result<()> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        self.namespaces.insert(prefix.to_string(), uri.to_string());
    }

    /// Whether any element so far declared `uri`
    pub fn has_namespace(&self, uri: &str) -> bool {
        self.namespaces.values().any(|ns| ns == uri)
    }

    pub fn namespace_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }

    /// Record a warning that never aborts decoding
    pub fn warn(&mut self, element: &str, kind: WarningKind) {
        tracing::warn!(part = %self.path, element, "{}", kind);
        self.warnings.push(Warning::new(self.path.clone(), element, kind));
    }

    /// Apply the strict/lenient policy to a recoverable condition
    ///
    /// Strict decoding turns critical conditions into errors; otherwise the
    /// condition is recorded as a warning and decoding continues.
    pub fn recover(&mut self, element: &str, kind: WarningKind) -> Result<()> {
        if self.config.is_strict() && kind.is_critical() {
            return Err(match kind {
                WarningKind::MissingRequiredField { name } => {
                    Error::missing_attribute(element, &name)
                }
                other => other.into(),
            });
        }
        self.warn(element, kind);
        Ok(())
    }

    /// Parse a required attribute
    ///
    /// Returns `Ok(None)` when the attribute is absent and lenient decoding
    /// recorded a warning; the caller then skips the element. A value that
    /// does not parse is always an error.
    pub fn required<T: FromStr>(
        &mut self,
        element: &str,
        name: &str,
        value: Option<&str>,
    ) -> Result<Option<T>> {
        match value {
            None => {
                self.recover(
                    element,
                    WarningKind::MissingRequiredField {
                        name: name.to_string(),
                    },
                )?;
                Ok(None)
            }
            Some(v) => v
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| Error::invalid_required(element, name, v)),
        }
    }

    /// Parse a required finite coordinate
    pub fn required_coordinate(
        &mut self,
        element: &str,
        name: &str,
        value: Option<&str>,
    ) -> Result<Option<f64>> {
        match self.required::<f64>(element, name, value)? {
            Some(v) if !v.is_finite() => Err(Error::invalid_required(
                element,
                name,
                value.unwrap_or_default(),
            )),
            other => Ok(other),
        }
    }

    /// Parse an optional attribute whose value must be well formed
    pub fn number<T: FromStr>(
        &self,
        element: &str,
        name: &str,
        value: Option<&str>,
    ) -> Result<Option<T>> {
        value
            .map(|v| {
                v.trim().parse::<T>().map_err(|_| {
                    Error::invalid_xml_element(
                        element,
                        &format!("invalid value '{}' for attribute '{}'", v, name),
                    )
                })
            })
            .transpose()
    }

    /// Parse an optional attribute that falls back to its default when invalid
    pub fn optional<T: FromStr>(&mut self, element: &str, name: &str, value: Option<&str>) -> Option<T> {
        let v = value?;
        match v.trim().parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                self.warn(
                    element,
                    WarningKind::InvalidOptionalValue {
                        name: name.to_string(),
                        value: v.to_string(),
                    },
                );
                None
            }
        }
    }

    /// Validate the production `UUID` attribute of an element
    ///
    /// A malformed UUID is fatal when the production namespace is declared.
    /// A missing one follows the strict/lenient policy without skipping the
    /// element.
    pub fn production_uuid(&mut self, element: &str, value: Option<&str>) -> Result<Option<String>> {
        let declared = self.has_namespace(Extension::Production.namespace());
        match value {
            Some(v) if is_valid_uuid(v) => Ok(Some(v.to_string())),
            Some(v) if declared => Err(Error::invalid_required(element, "UUID", v)),
            Some(_) => Ok(None),
            None if declared => {
                self.recover(
                    element,
                    WarningKind::MissingRequiredField {
                        name: "UUID".to_string(),
                    },
                )?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Settle an object reference made by a component or build item
    ///
    /// References without a path must name an object already declared in
    /// this part. Only the root part may carry a path at all: its own path
    /// resolves locally, any other is deferred until all parts are merged.
    pub fn reference(&mut self, element: &str, path: Option<&str>, id: u32) -> Result<Reference> {
        if let Some(path) = path.map(normalize_part_name) {
            if !self.is_root {
                return Err(Error::CrossPartPathInNonRoot { path });
            }
            if path != self.path {
                return Ok(Reference::Deferred(ResourceId::new(path, id)));
            }
        }

        let target = ResourceId::new(self.path.clone(), id);
        match self.registry.resolve_object(&target) {
            Ok(_) => Ok(Reference::Local(target)),
            Err(err) => {
                self.recover(element, unresolved_kind(err)?)?;
                Ok(Reference::Dropped)
            }
        }
    }

    pub fn finish(self) -> DecodedPart {
        let mut part = Part::new(self.path, self.is_root);
        part.resources = self.registry;
        part.metadata = self.metadata;
        DecodedPart {
            part,
            warnings: self.warnings,
            unit: self.unit,
            language: self.language,
            required_extensions: self.required_extensions,
            required_custom_extensions: self.required_custom_extensions,
            build: self.build,
        }
    }
}

/// The warning for a failed resolution, or the error itself when it is not
/// a recoverable resolution failure
pub(crate) fn unresolved_kind(err: Error) -> Result<WarningKind> {
    match err {
        Error::UnresolvedReference { path, id } => Ok(WarningKind::UnresolvedReference { path, id }),
        Error::ReferenceTypeMismatch { path, id } => {
            Ok(WarningKind::ReferenceTypeMismatch { path, id })
        }
        other => Err(other),
    }
}

/// Canonical hyphenated UUID, e.g. `6f1e2c3a-0b1d-4c5e-8f90-123456789abc`
pub(crate) fn is_valid_uuid(value: &str) -> bool {
    value.len() == 36 && uuid::Uuid::try_parse(value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BaseMaterialGroup, Mesh, Object, Resource};

    const ROOT: &str = "/3D/3dmodel.model";

    #[test]
    fn test_required_policy() {
        let strict = ParserConfig::new();
        let mut ctx = DecodeContext::new(ROOT, true, &strict, None);
        let err = ctx.required::<u32>("object", "id", None).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { .. }));

        let lenient = ParserConfig::lenient();
        let mut ctx = DecodeContext::new(ROOT, true, &lenient, None);
        assert_eq!(ctx.required::<u32>("object", "id", None).unwrap(), None);
        assert_eq!(ctx.finish().warnings.len(), 1);
    }

    #[test]
    fn test_invalid_required_is_fatal_when_lenient() {
        let lenient = ParserConfig::lenient();
        let mut ctx = DecodeContext::new(ROOT, true, &lenient, None);
        let err = ctx.required::<u32>("object", "id", Some("abc")).unwrap_err();
        assert!(matches!(err, Error::InvalidRequiredValue { .. }));

        let err = ctx
            .required_coordinate("vertex", "x", Some("inf"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequiredValue { .. }));
    }

    #[test]
    fn test_optional_invalid_warns_in_strict_mode() {
        let strict = ParserConfig::new();
        let mut ctx = DecodeContext::new(ROOT, true, &strict, None);
        let parsed: Option<crate::model::ObjectType> = ctx.optional("object", "type", Some("bogus"));
        assert_eq!(parsed, None);
        let part = ctx.finish();
        assert!(matches!(
            part.warnings[0].kind,
            WarningKind::InvalidOptionalValue { .. }
        ));
    }

    #[test]
    fn test_uuid_validation() {
        assert!(is_valid_uuid("6f1e2c3a-0b1d-4c5e-8f90-123456789abc"));
        assert!(!is_valid_uuid("6f1e2c3a0b1d4c5e8f90123456789abc"));
        assert!(!is_valid_uuid("not-a-uuid"));

        let strict = ParserConfig::new();
        let mut ctx = DecodeContext::new(ROOT, true, &strict, None);
        assert_eq!(ctx.production_uuid("object", Some("bogus")).unwrap(), None);
        assert_eq!(ctx.production_uuid("object", None).unwrap(), None);

        ctx.declare_namespace("p", Extension::Production.namespace());
        assert!(ctx.production_uuid("object", Some("bogus")).is_err());
        assert!(ctx.production_uuid("object", None).is_err());
    }

    #[test]
    fn test_reference_resolution() {
        let lenient = ParserConfig::lenient();
        let mut ctx = DecodeContext::new(ROOT, true, &lenient, None);
        ctx.registry
            .register(Resource::Object(Object::new_mesh(1, Mesh::new())))
            .unwrap();
        ctx.registry
            .register(Resource::BaseMaterials(BaseMaterialGroup::new(2)))
            .unwrap();

        assert!(matches!(
            ctx.reference("component", None, 1).unwrap(),
            Reference::Local(ResourceId { id: 1, .. })
        ));
        assert!(matches!(
            ctx.reference("component", Some(ROOT), 1).unwrap(),
            Reference::Local(_)
        ));
        assert!(matches!(
            ctx.reference("component", Some("3D/other.model"), 4).unwrap(),
            Reference::Deferred(ResourceId { ref path, id: 4 }) if path == "/3D/other.model"
        ));
        assert!(matches!(
            ctx.reference("component", None, 2).unwrap(),
            Reference::Dropped
        ));
        assert!(matches!(
            ctx.reference("component", None, 3).unwrap(),
            Reference::Dropped
        ));
        assert_eq!(ctx.finish().warnings.len(), 2);
    }

    #[test]
    fn test_cross_part_path_in_non_root() {
        let lenient = ParserConfig::lenient();
        let mut ctx = DecodeContext::new("/3D/other.model", false, &lenient, None);
        let err = ctx
            .reference("component", Some("/3D/third.model"), 1)
            .err()
            .unwrap();
        assert!(matches!(err, Error::CrossPartPathInNonRoot { .. }));
    }

    #[test]
    fn test_own_path_in_non_root() {
        let config = ParserConfig::new();
        let mut ctx = DecodeContext::new("/3D/other.model", false, &config, None);
        ctx.registry
            .register(Resource::Object(Object::new_mesh(1, Mesh::new())))
            .unwrap();
        let err = ctx
            .reference("component", Some("/3D/other.model"), 1)
            .err()
            .unwrap();
        assert!(matches!(err, Error::CrossPartPathInNonRoot { .. }));
    }
}
