//! Data structures representing 3MF models

// Declare all submodules
mod beam_lattice;
mod config;
mod core;
mod mesh;
mod object;
mod spatial;
mod transform;

// Re-export all public types from core module
pub use core::{
    Attachment, Build, BuildItem, DEFAULT_MODEL_PATH, Extension, MetadataEntry, Model, Part,
    ResourceId,
};

pub use config::{DEFAULT_CANCELLATION_CHECK_BYTES, ParserConfig};

pub use object::{
    BaseMaterial, BaseMaterialGroup, Component, ComponentsObject, MeshObject, Object, ObjectKind,
    ObjectType, PropertyRef, Resource, SliceResolution,
};

pub use mesh::{
    DEFAULT_BEAM_RADIUS, DEFAULT_MIN_LENGTH, MAX_VERTEX_COUNT, Mesh, Triangle, Vertex,
};

pub use spatial::SpatialIndex;

pub use transform::{FULL_MATRIX_SIZE, TRANSFORM_MATRIX_SIZE, Transform};

// Re-export all public types from beam_lattice module
pub use beam_lattice::{Beam, BeamCapMode, BeamLatticeAttributes, BeamSet, ClipMode};
