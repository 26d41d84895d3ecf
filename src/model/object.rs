//! Objects and the other resources a model part can declare

use super::beam_lattice::BeamLatticeAttributes;
use super::core::{MetadataEntry, ResourceId};
use super::mesh::Mesh;
use super::transform::Transform;

/// Type of 3D object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectType {
    /// A standard model object
    #[default]
    Model,
    /// A support structure
    Support,
    /// A solid support structure
    SolidSupport,
    /// A surface object
    Surface,
    /// Other types
    Other,
}

impl ObjectType {
    /// The attribute value used in documents
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Model => "model",
            ObjectType::Support => "support",
            ObjectType::SolidSupport => "solidsupport",
            ObjectType::Surface => "surface",
            ObjectType::Other => "other",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model" => Ok(ObjectType::Model),
            "support" => Ok(ObjectType::Support),
            "solidsupport" => Ok(ObjectType::SolidSupport),
            "surface" => Ok(ObjectType::Surface),
            "other" => Ok(ObjectType::Other),
            _ => Err(crate::error::Error::InvalidXml(format!(
                "Invalid object type '{}'. Must be one of: model, support, solidsupport, surface, other",
                s
            ))),
        }
    }
}

/// Resolution of the slices referenced by an object (Slice extension)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SliceResolution {
    /// Full resolution slices
    #[default]
    FullRes,
    /// Low resolution slices
    LowRes,
}

impl std::fmt::Display for SliceResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SliceResolution::FullRes => write!(f, "fullres"),
            SliceResolution::LowRes => write!(f, "lowres"),
        }
    }
}

impl std::str::FromStr for SliceResolution {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fullres" => Ok(SliceResolution::FullRes),
            "lowres" => Ok(SliceResolution::LowRes),
            _ => Err(crate::error::Error::InvalidXml(format!(
                "Invalid slice resolution '{}'. Must be 'fullres' or 'lowres'",
                s
            ))),
        }
    }
}

/// Default property of an object (`pid` / `pindex`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyRef {
    /// Property group id
    pub pid: u32,
    /// Index into the property group
    pub pindex: u32,
}

/// A component that places another object with a transform
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Referenced object; `path` names the part that declares it
    pub object: ResourceId,
    /// Transform from the referenced object's space into the owner's space
    pub transform: Transform,
    /// Production extension UUID (`p:UUID`)
    pub uuid: Option<String>,
}

impl Component {
    /// Create a component with the identity transform
    pub fn new(object: ResourceId) -> Self {
        Self {
            object,
            transform: Transform::identity(),
            uuid: None,
        }
    }

    /// Create a component with a transform
    pub fn with_transform(object: ResourceId, transform: Transform) -> Self {
        Self {
            object,
            transform,
            uuid: None,
        }
    }
}

/// Geometry of a mesh object
#[derive(Debug, Clone, Default)]
pub struct MeshObject {
    /// The mesh; absent when the document declared none
    pub mesh: Option<Mesh>,
    /// Beam lattice attributes
    pub beam_lattice: BeamLatticeAttributes,
}

/// An assembly of other objects
#[derive(Debug, Clone, Default)]
pub struct ComponentsObject {
    /// Components in document order
    pub components: Vec<Component>,
}

/// What an object is made of
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// Concrete geometry
    Mesh(MeshObject),
    /// References to other objects
    Components(ComponentsObject),
}

/// A 3D object: a mesh or an assembly of other objects
#[derive(Debug, Clone)]
pub struct Object {
    /// Object ID, unique within its part
    pub id: u32,
    /// Object name
    pub name: Option<String>,
    /// Part number
    pub part_number: Option<String>,
    /// Thumbnail path
    pub thumbnail: Option<String>,
    /// Type of object
    pub object_type: ObjectType,
    /// Default property
    pub default_property: Option<PropertyRef>,
    /// Production extension UUID (`p:UUID`)
    pub uuid: Option<String>,
    /// Slice stack id (Slice extension)
    pub slice_stack_id: Option<u32>,
    /// Slice resolution (Slice extension)
    pub slice_resolution: SliceResolution,
    /// Object metadata (`metadatagroup`)
    pub metadata: Vec<MetadataEntry>,
    /// Mesh or components
    pub kind: ObjectKind,
}

impl Object {
    /// Create a mesh object
    pub fn new_mesh(id: u32, mesh: Mesh) -> Self {
        Self::with_kind(
            id,
            ObjectKind::Mesh(MeshObject {
                mesh: Some(mesh),
                beam_lattice: BeamLatticeAttributes::default(),
            }),
        )
    }

    /// Create a components object
    pub fn new_components(id: u32, components: Vec<Component>) -> Self {
        Self::with_kind(id, ObjectKind::Components(ComponentsObject { components }))
    }

    /// Create an object with default attributes
    pub fn with_kind(id: u32, kind: ObjectKind) -> Self {
        Self {
            id,
            name: None,
            part_number: None,
            thumbnail: None,
            object_type: ObjectType::Model,
            default_property: None,
            uuid: None,
            slice_stack_id: None,
            slice_resolution: SliceResolution::FullRes,
            metadata: Vec::new(),
            kind,
        }
    }

    /// The mesh of a mesh object
    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            ObjectKind::Mesh(m) => m.mesh.as_ref(),
            ObjectKind::Components(_) => None,
        }
    }

    /// The components of a components object
    pub fn components(&self) -> Option<&[Component]> {
        match &self.kind {
            ObjectKind::Components(c) => Some(&c.components),
            ObjectKind::Mesh(_) => None,
        }
    }
}

/// A single base material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseMaterial {
    /// Material name
    pub name: String,
    /// sRGB display color (`#RRGGBB` or `#RRGGBBAA`)
    pub display_color: String,
}

/// A group of base materials (`basematerials`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseMaterialGroup {
    /// Resource id
    pub id: u32,
    /// Materials in index order
    pub materials: Vec<BaseMaterial>,
}

impl BaseMaterialGroup {
    /// Create an empty group
    pub fn new(id: u32) -> Self {
        Self {
            id,
            materials: Vec::new(),
        }
    }
}

/// Anything registered in a part's resource table
#[derive(Debug, Clone)]
pub enum Resource {
    /// A mesh or components object
    Object(Object),
    /// A base material group
    BaseMaterials(BaseMaterialGroup),
}

impl Resource {
    /// Resource id within its part
    pub fn id(&self) -> u32 {
        match self {
            Resource::Object(o) => o.id,
            Resource::BaseMaterials(b) => b.id,
        }
    }

    /// The object, if this resource is one
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Resource::Object(o) => Some(o),
            Resource::BaseMaterials(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_type_round_trip() {
        for t in [
            ObjectType::Model,
            ObjectType::Support,
            ObjectType::SolidSupport,
            ObjectType::Surface,
            ObjectType::Other,
        ] {
            assert_eq!(t.as_str().parse::<ObjectType>().unwrap(), t);
        }
        assert!("part".parse::<ObjectType>().is_err());
    }

    #[test]
    fn test_object_accessors() {
        let mesh_object = Object::new_mesh(1, Mesh::new());
        assert!(mesh_object.mesh().is_some());
        assert!(mesh_object.components().is_none());

        let assembly = Object::new_components(
            2,
            vec![Component::new(ResourceId::new("/3D/3dmodel.model", 1))],
        );
        assert!(assembly.mesh().is_none());
        assert_eq!(assembly.components().map(|c| c.len()), Some(1));
    }

    #[test]
    fn test_resource_ids() {
        assert_eq!(Resource::Object(Object::new_mesh(3, Mesh::new())).id(), 3);
        let group = Resource::BaseMaterials(BaseMaterialGroup::new(4));
        assert_eq!(group.id(), 4);
        assert!(group.as_object().is_none());
    }
}
