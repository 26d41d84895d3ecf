//! Assembly flattening and structural validation
//!
//! Objects form a directed graph through their components. The
//! [`ObjectGeometry`] operations walk that graph through an
//! [`ObjectResolver`], carrying the chain of objects currently being visited
//! so that a cycle is reported as [`Error::CyclicReference`] instead of
//! recursing forever.

use crate::error::{Error, InvalidObjectReason, Result};
use crate::model::{BuildItem, Mesh, Model, Object, ObjectKind, ObjectType, ResourceId, Transform};
use crate::registry::ObjectResolver;

/// Geometry operations shared by mesh and components objects
pub trait ObjectGeometry {
    /// Merge this object's geometry into `dest` under `transform`
    ///
    /// Components objects recurse into every component, applying the
    /// component's own transform before `transform`. The first error stops
    /// the traversal.
    fn merge_into(
        &self,
        resolver: &dyn ObjectResolver,
        dest: &mut Mesh,
        transform: &Transform,
    ) -> Result<()>;

    /// Whether the object is structurally valid for its type
    fn is_valid(&self, resolver: &dyn ObjectResolver) -> Result<bool>;

    /// Whether the object can be placed with `transform` given its slices
    fn is_valid_for_slices(
        &self,
        resolver: &dyn ObjectResolver,
        transform: &Transform,
    ) -> Result<bool>;
}

impl ObjectGeometry for Object {
    fn merge_into(
        &self,
        resolver: &dyn ObjectResolver,
        dest: &mut Mesh,
        transform: &Transform,
    ) -> Result<()> {
        Walker::new(resolver).merge(self, dest, transform)
    }

    fn is_valid(&self, resolver: &dyn ObjectResolver) -> Result<bool> {
        Walker::new(resolver).is_valid(self)
    }

    fn is_valid_for_slices(
        &self,
        resolver: &dyn ObjectResolver,
        transform: &Transform,
    ) -> Result<bool> {
        Walker::new(resolver).is_valid_for_slices(self, transform)
    }
}

/// Depth-first traversal state: the chain of objects being visited
struct Walker<'a> {
    resolver: &'a dyn ObjectResolver,
    chain: Vec<ResourceId>,
}

impl<'a> Walker<'a> {
    fn new(resolver: &'a dyn ObjectResolver) -> Self {
        Self {
            resolver,
            chain: Vec::new(),
        }
    }

    fn enter(&mut self, id: &ResourceId) -> Result<&'a Object> {
        if self.chain.contains(id) {
            return Err(Error::CyclicReference {
                path: id.path.clone(),
                id: id.id,
            });
        }
        let object = self.resolver.resolve_object(id)?;
        self.chain.push(id.clone());
        Ok(object)
    }

    fn leave(&mut self) {
        self.chain.pop();
    }

    fn merge_ref(&mut self, id: &ResourceId, dest: &mut Mesh, transform: &Transform) -> Result<()> {
        let object = self.enter(id)?;
        self.merge(object, dest, transform)?;
        self.leave();
        Ok(())
    }

    fn merge(&mut self, object: &Object, dest: &mut Mesh, transform: &Transform) -> Result<()> {
        match &object.kind {
            ObjectKind::Mesh(m) => {
                if let Some(mesh) = &m.mesh {
                    dest.merge(mesh, transform)?;
                }
                Ok(())
            }
            ObjectKind::Components(c) => {
                for component in &c.components {
                    let local = component.transform.then(transform);
                    self.merge_ref(&component.object, dest, &local)?;
                }
                Ok(())
            }
        }
    }

    fn is_valid(&mut self, object: &Object) -> Result<bool> {
        Ok(self.defect(object)?.is_none())
    }

    /// First validity rule broken by `object` or one of its descendants
    fn defect(&mut self, object: &Object) -> Result<Option<InvalidObjectReason>> {
        match &object.kind {
            ObjectKind::Mesh(m) => {
                let Some(mesh) = &m.mesh else {
                    return Ok(Some(InvalidObjectReason::MissingMesh));
                };
                Ok(match object.object_type {
                    ObjectType::Model | ObjectType::SolidSupport => {
                        (!mesh.is_manifold_and_oriented()).then_some(InvalidObjectReason::NotManifold)
                    }
                    ObjectType::Support | ObjectType::Surface => {
                        (mesh.beam_count() > 0).then_some(InvalidObjectReason::HasBeams)
                    }
                    ObjectType::Other => Some(InvalidObjectReason::OtherType),
                })
            }
            ObjectKind::Components(c) => {
                if c.components.is_empty() {
                    return Ok(Some(InvalidObjectReason::EmptyComponents));
                }
                for component in &c.components {
                    let child = self.enter(&component.object)?;
                    let defect = self.defect(child)?;
                    self.leave();
                    if defect.is_some() {
                        return Ok(defect);
                    }
                }
                Ok(None)
            }
        }
    }

    fn is_valid_for_slices(&mut self, object: &Object, transform: &Transform) -> Result<bool> {
        match &object.kind {
            ObjectKind::Mesh(_) => {
                Ok(object.slice_stack_id.is_none() || transform.is_planar_in_z())
            }
            ObjectKind::Components(c) => {
                for component in &c.components {
                    let child = self.enter(&component.object)?;
                    let local = component.transform.then(transform);
                    let valid = self.is_valid_for_slices(child, &local)?;
                    self.leave();
                    if !valid {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

impl Model {
    /// Flatten one build item into a new deduplicated mesh
    pub fn flatten_item(&self, item: &BuildItem) -> Result<Mesh> {
        let mut dest = Mesh::with_dedup();
        Walker::new(self).merge_ref(&item.object, &mut dest, &item.transform)?;
        Ok(dest)
    }

    /// Flatten every build item, in build order, into one deduplicated mesh
    pub fn flatten(&self) -> Result<Mesh> {
        let mut dest = Mesh::with_dedup();
        for item in &self.build.items {
            Walker::new(self).merge_ref(&item.object, &mut dest, &item.transform)?;
        }
        Ok(dest)
    }

    /// Check every build item's object for validity under its placement
    ///
    /// Fails with [`Error::NotManifold`] or [`Error::NotValidForSlices`] for
    /// the first offending item, or with a resolution error when an item's
    /// assembly cannot be walked.
    pub fn validate_build(&self) -> Result<()> {
        self.build
            .items
            .iter()
            .try_for_each(|item| self.validate_item(item))
    }

    /// Check one build item's object for validity under its placement
    pub fn validate_item(&self, item: &BuildItem) -> Result<()> {
        let mut walker = Walker::new(self);
        let object = walker.enter(&item.object)?;
        if let Some(reason) = walker.defect(object)? {
            return Err(Error::NotManifold {
                path: item.object.path.clone(),
                id: item.object.id,
                object_type: object.object_type.to_string(),
                reason,
            });
        }
        if !walker.is_valid_for_slices(object, &item.transform)? {
            return Err(Error::NotValidForSlices {
                path: item.object.path.clone(),
                id: item.object.id,
            });
        }
        Ok(())
    }
}
