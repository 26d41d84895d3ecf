//! Per-part resource tables and reference resolution
//!
//! Every decoded part owns a [`ResourceRegistry`]. References between
//! resources are looked up through the [`ObjectResolver`] trait, which is
//! implemented both by a single registry (references local to one part) and
//! by [`Model`] (references qualified with any part path).

use crate::error::{Error, Result};
use crate::model::{Model, Object, Resource, ResourceId};
use std::collections::HashMap;

/// Insertion-ordered resource table of one part
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    path: String,
    resources: Vec<Resource>,
    index: HashMap<u32, usize>,
}

impl ResourceRegistry {
    /// Create an empty registry for the part at `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            resources: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Path of the owning part
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Register a resource
    ///
    /// Fails with [`Error::InvalidResourceId`] for id zero and
    /// [`Error::DuplicateResourceId`] when the id is already taken.
    pub fn register(&mut self, resource: Resource) -> Result<()> {
        let id = resource.id();
        if id == 0 {
            return Err(Error::InvalidResourceId {
                path: self.path.clone(),
                id,
            });
        }
        if self.index.contains_key(&id) {
            return Err(Error::DuplicateResourceId {
                path: self.path.clone(),
                id,
            });
        }
        self.index.insert(id, self.resources.len());
        self.resources.push(resource);
        Ok(())
    }

    /// Whether a resource with this id has been registered
    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    /// Look up a resource by id
    pub fn get(&self, id: u32) -> Option<&Resource> {
        self.index.get(&id).map(|&i| &self.resources[i])
    }

    /// Look up an object by id
    pub fn object(&self, id: u32) -> Option<&Object> {
        self.get(id).and_then(Resource::as_object)
    }

    pub(crate) fn object_mut(&mut self, id: u32) -> Option<&mut Object> {
        let &i = self.index.get(&id)?;
        match &mut self.resources[i] {
            Resource::Object(object) => Some(object),
            _ => None,
        }
    }

    /// All objects in registration order
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.resources.iter().filter_map(Resource::as_object)
    }

    /// All resources in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    /// Number of registered resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Resolves resource references to the resources they name
pub trait ObjectResolver {
    /// Find the resource named by `id`
    ///
    /// Fails with [`Error::UnresolvedReference`] when nothing is registered
    /// under that id.
    fn resolve(&self, id: &ResourceId) -> Result<&Resource>;

    /// Find the object named by `id`
    ///
    /// Fails with [`Error::ReferenceTypeMismatch`] when the resource exists
    /// but is not an object.
    fn resolve_object(&self, id: &ResourceId) -> Result<&Object> {
        match self.resolve(id)? {
            Resource::Object(object) => Ok(object),
            _ => Err(Error::ReferenceTypeMismatch {
                path: id.path.clone(),
                id: id.id,
            }),
        }
    }
}

fn unresolved(id: &ResourceId) -> Error {
    Error::UnresolvedReference {
        path: id.path.clone(),
        id: id.id,
    }
}

impl ObjectResolver for ResourceRegistry {
    fn resolve(&self, id: &ResourceId) -> Result<&Resource> {
        if !id.path.is_empty() && id.path != self.path {
            return Err(unresolved(id));
        }
        self.get(id.id).ok_or_else(|| unresolved(id))
    }
}

impl ObjectResolver for Model {
    fn resolve(&self, id: &ResourceId) -> Result<&Resource> {
        self.part(&id.path)
            .and_then(|part| part.resources.get(id.id))
            .ok_or_else(|| unresolved(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BaseMaterialGroup, Mesh, Part};

    const ROOT: &str = "/3D/3dmodel.model";

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ResourceRegistry::new(ROOT);
        registry
            .register(Resource::Object(Object::new_mesh(2, Mesh::new())))
            .unwrap();
        registry
            .register(Resource::BaseMaterials(BaseMaterialGroup::new(1)))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.object(2).is_some());
        assert!(registry.object(1).is_none());
        assert!(registry.get(1).is_some());
        assert_eq!(registry.objects().count(), 1);
        let ids: Vec<u32> = registry.iter().map(Resource::id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_register_rejects_zero_id() {
        let mut registry = ResourceRegistry::new(ROOT);
        let err = registry
            .register(Resource::Object(Object::new_mesh(0, Mesh::new())))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResourceId { id: 0, .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_rejects_duplicate() {
        let mut registry = ResourceRegistry::new(ROOT);
        registry
            .register(Resource::Object(Object::new_mesh(5, Mesh::new())))
            .unwrap();
        let err = registry
            .register(Resource::BaseMaterials(BaseMaterialGroup::new(5)))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateResourceId { id: 5, .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_resolver() {
        let mut registry = ResourceRegistry::new(ROOT);
        registry
            .register(Resource::Object(Object::new_mesh(1, Mesh::new())))
            .unwrap();
        registry
            .register(Resource::BaseMaterials(BaseMaterialGroup::new(2)))
            .unwrap();

        assert!(registry.resolve_object(&ResourceId::new("", 1)).is_ok());
        assert!(registry.resolve_object(&ResourceId::new(ROOT, 1)).is_ok());
        assert!(matches!(
            registry.resolve_object(&ResourceId::new(ROOT, 2)),
            Err(Error::ReferenceTypeMismatch { id: 2, .. })
        ));
        assert!(matches!(
            registry.resolve(&ResourceId::new(ROOT, 3)),
            Err(Error::UnresolvedReference { id: 3, .. })
        ));
        assert!(matches!(
            registry.resolve(&ResourceId::new("/3D/other.model", 1)),
            Err(Error::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_model_resolver_across_parts() {
        let mut model = Model::new();
        let mut part = Part::new("/3D/other.model", false);
        part.resources
            .register(Resource::Object(Object::new_mesh(7, Mesh::new())))
            .unwrap();
        model.parts.push(part);

        assert!(model.resolve_object(&ResourceId::new("/3D/other.model", 7)).is_ok());
        assert!(model.resolve(&ResourceId::new(ROOT, 7)).is_err());
        assert!(model.resolve(&ResourceId::new("/3D/missing.model", 7)).is_err());
    }
}
