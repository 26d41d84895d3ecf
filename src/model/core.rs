//! Core 3MF types and structures

use super::transform::Transform;
use crate::error::Warning;
use crate::registry::ResourceRegistry;

/// Default location of the root model part
pub const DEFAULT_MODEL_PATH: &str = "/3D/3dmodel.model";

/// 3MF extension specification
///
/// The extensions this crate understands. Elements and attributes from any
/// other namespace are skipped while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    /// Core 3MF specification (always required)
    Core,
    /// Materials & Properties Extension
    Material,
    /// Production Extension
    Production,
    /// Slice Extension
    Slice,
    /// Beam Lattice Extension
    BeamLattice,
}

impl Extension {
    /// Get the namespace URI for this extension
    pub const fn namespace(&self) -> &'static str {
        match self {
            Extension::Core => "http://schemas.microsoft.com/3dmanufacturing/core/2015/02",
            Extension::Material => "http://schemas.microsoft.com/3dmanufacturing/material/2015/02",
            Extension::Production => {
                "http://schemas.microsoft.com/3dmanufacturing/production/2015/06"
            }
            Extension::Slice => "http://schemas.microsoft.com/3dmanufacturing/slice/2015/07",
            Extension::BeamLattice => {
                "http://schemas.microsoft.com/3dmanufacturing/beamlattice/2017/02"
            }
        }
    }

    /// Get extension from namespace URI
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        match namespace {
            "http://schemas.microsoft.com/3dmanufacturing/core/2015/02" => Some(Extension::Core),
            "http://schemas.microsoft.com/3dmanufacturing/material/2015/02" => {
                Some(Extension::Material)
            }
            "http://schemas.microsoft.com/3dmanufacturing/production/2015/06" => {
                Some(Extension::Production)
            }
            "http://schemas.microsoft.com/3dmanufacturing/slice/2015/07" => Some(Extension::Slice),
            "http://schemas.microsoft.com/3dmanufacturing/beamlattice/2017/02" => {
                Some(Extension::BeamLattice)
            }
            _ => None,
        }
    }

    /// Get a human-readable name for this extension
    pub fn name(&self) -> &'static str {
        match self {
            Extension::Core => "Core",
            Extension::Material => "Material",
            Extension::Production => "Production",
            Extension::Slice => "Slice",
            Extension::BeamLattice => "BeamLattice",
        }
    }

    /// Conventional namespace prefix used when writing documents
    pub fn prefix(&self) -> &'static str {
        match self {
            Extension::Core => "",
            Extension::Material => "m",
            Extension::Production => "p",
            Extension::Slice => "s",
            Extension::BeamLattice => "b",
        }
    }
}

/// Identity of a resource: the part that declares it plus its numeric id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    /// Absolute part path, e.g. `/3D/3dmodel.model`
    pub path: String,
    /// Id taken from the document
    pub id: u32,
}

impl ResourceId {
    /// Create a resource id
    pub fn new(path: impl Into<String>, id: u32) -> Self {
        Self {
            path: path.into(),
            id,
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.path, self.id)
    }
}

/// Metadata entry
///
/// Metadata elements contain a required `name` attribute and text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    /// Name of the metadata entry
    pub name: String,
    /// Value of the metadata entry
    pub value: String,
    /// Preservation flag (optional attribute)
    /// When true, indicates this metadata should be preserved during editing
    pub preserve: Option<bool>,
    /// Declared value type, e.g. `xs:string`
    pub metadata_type: Option<String>,
}

impl MetadataEntry {
    /// Create a new metadata entry
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            preserve: None,
            metadata_type: None,
        }
    }

    /// Create a new metadata entry with preservation flag
    pub fn new_with_preserve(
        name: impl Into<String>,
        value: impl Into<String>,
        preserve: bool,
    ) -> Self {
        Self {
            preserve: Some(preserve),
            ..Self::new(name, value)
        }
    }
}

/// A non-model part carried by the package (texture, thumbnail, custom data)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Absolute part path
    pub path: String,
    /// Relationship type that referenced the part
    pub relationship_type: String,
    /// Content type from `[Content_Types].xml`
    pub content_type: String,
    /// Raw part bytes
    pub data: Vec<u8>,
}

/// An item to be built, referencing an object
#[derive(Debug, Clone, PartialEq)]
pub struct BuildItem {
    /// Referenced object; `path` names the part that declares it
    pub object: ResourceId,
    /// Placement of the object on the build platform
    pub transform: Transform,
    /// Production extension UUID (`p:UUID`)
    pub uuid: Option<String>,
    /// Part number
    pub part_number: Option<String>,
    /// Item metadata (`metadatagroup`)
    pub metadata: Vec<MetadataEntry>,
}

impl BuildItem {
    /// Create a new build item with the identity transform
    pub fn new(object: ResourceId) -> Self {
        Self {
            object,
            transform: Transform::identity(),
            uuid: None,
            part_number: None,
            metadata: Vec::new(),
        }
    }
}

/// Build section specifying which objects to manufacture
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Build {
    /// List of items to build
    pub items: Vec<BuildItem>,
    /// Production extension UUID (`p:UUID`)
    pub uuid: Option<String>,
}

impl Build {
    /// Create a new empty build section
    pub fn new() -> Self {
        Self::default()
    }
}

/// One decoded model document of the package
#[derive(Debug, Clone)]
pub struct Part {
    /// Absolute part path
    pub path: String,
    /// Whether this is the root model part
    pub is_root: bool,
    /// Resources declared by this part
    pub resources: ResourceRegistry,
    /// Part-level metadata
    pub metadata: Vec<MetadataEntry>,
}

impl Part {
    /// Create an empty part
    pub fn new(path: impl Into<String>, is_root: bool) -> Self {
        let path = path.into();
        Self {
            resources: ResourceRegistry::new(path.clone()),
            path,
            is_root,
            metadata: Vec::new(),
        }
    }
}

/// Complete 3MF model
///
/// `parts[0]` is always the root part; secondary parts follow in the order
/// they were discovered through the root part's relationships.
#[derive(Debug, Clone)]
pub struct Model {
    /// Unit of measurement (e.g., "millimeter", "inch")
    pub unit: String,
    /// Document language (`xml:lang`)
    pub language: Option<String>,
    /// Required extensions for this model
    /// Extensions that the consumer must support to properly process this file
    pub required_extensions: Vec<Extension>,
    /// Required namespaces that are not known extensions
    pub required_custom_extensions: Vec<String>,
    /// Metadata entries of the root part
    pub metadata: Vec<MetadataEntry>,
    /// Decoded model parts, root first
    pub parts: Vec<Part>,
    /// Build specification
    pub build: Build,
    /// Package thumbnail
    pub thumbnail: Option<Attachment>,
    /// Textures and custom attachments
    pub attachments: Vec<Attachment>,
    /// Paths of the secondary model parts, in discovery order
    pub production_attachments: Vec<String>,
    /// Problems recovered from during a lenient decode
    pub warnings: Vec<Warning>,
}

impl Model {
    /// Create a new empty model with a root part at the default path
    pub fn new() -> Self {
        Self::with_root_path(DEFAULT_MODEL_PATH)
    }

    /// Create a new empty model whose root part lives at `path`
    pub fn with_root_path(path: impl Into<String>) -> Self {
        Self {
            unit: "millimeter".to_string(),
            language: None,
            required_extensions: Vec::new(),
            required_custom_extensions: Vec::new(),
            metadata: Vec::new(),
            parts: vec![Part::new(path, true)],
            build: Build::new(),
            thumbnail: None,
            attachments: Vec::new(),
            production_attachments: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Path of the root part
    pub fn path(&self) -> &str {
        &self.root_part().path
    }

    /// The root part
    pub fn root_part(&self) -> &Part {
        &self.parts[0]
    }

    /// The root part, mutably
    pub fn root_part_mut(&mut self) -> &mut Part {
        &mut self.parts[0]
    }

    /// Find a part by path; an empty path names the root part
    pub fn part(&self, path: &str) -> Option<&Part> {
        if path.is_empty() {
            return Some(self.root_part());
        }
        self.parts.iter().find(|p| p.path == path)
    }

    /// Get metadata value by name
    pub fn get_metadata(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
    }

    /// Check if metadata entry exists with the given name
    pub fn has_metadata(&self, name: &str) -> bool {
        self.metadata.iter().any(|entry| entry.name == name)
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_namespace_round_trip() {
        for ext in [
            Extension::Core,
            Extension::Material,
            Extension::Production,
            Extension::Slice,
            Extension::BeamLattice,
        ] {
            assert_eq!(Extension::from_namespace(ext.namespace()), Some(ext));
        }
        assert_eq!(Extension::from_namespace("http://example.com/ext"), None);
    }

    #[test]
    fn test_new_model_has_root_part() {
        let model = Model::new();
        assert_eq!(model.parts.len(), 1);
        assert!(model.root_part().is_root);
        assert_eq!(model.path(), DEFAULT_MODEL_PATH);
        assert!(model.part("").is_some());
        assert!(model.part("/3D/other.model").is_none());
    }

    #[test]
    fn test_metadata_lookup() {
        let mut model = Model::new();
        model.metadata.push(MetadataEntry::new("Title", "Cube"));
        assert_eq!(model.get_metadata("Title"), Some("Cube"));
        assert!(model.has_metadata("Title"));
        assert!(!model.has_metadata("Designer"));
    }

    #[test]
    fn test_resource_id_display() {
        assert_eq!(ResourceId::new("/3D/a.model", 3).to_string(), "/3D/a.model#3");
    }
}
