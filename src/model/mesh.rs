//! Triangle meshes with optional beam lattices
//!
//! A [`Mesh`] owns an append-only vertex list in which every vertex records
//! its own index, so `vertices[i].index == i` always holds. Insertion goes
//! through [`Mesh::add_vertex`], which consults the mesh's [`SpatialIndex`]
//! when deduplication is enabled and enforces the mesh's vertex capacity.

use super::beam_lattice::{Beam, BeamCapMode, BeamSet};
use super::spatial::SpatialIndex;
use super::transform::Transform;
use crate::error::{Error, Result};
use nalgebra::Point3;
use std::collections::HashMap;

/// Maximum number of vertices a mesh can hold
///
/// One less than `i32::MAX`, keeping the top of the index range free.
pub const MAX_VERTEX_COUNT: u32 = 2_147_483_646;

/// Default beam radius when a lattice does not declare one
pub const DEFAULT_BEAM_RADIUS: f64 = 1.0;

/// Default minimum beam length when a lattice does not declare one
pub const DEFAULT_MIN_LENGTH: f64 = 0.0001;

/// A mesh vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position of the vertex in the mesh's vertex list
    pub index: u32,
    /// Coordinates
    pub position: Point3<f64>,
}

/// A triangle defined by three vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    /// Index of first vertex
    pub v1: u32,
    /// Index of second vertex
    pub v2: u32,
    /// Index of third vertex
    pub v3: u32,
    /// Optional property group id
    pub pid: Option<u32>,
    /// Optional property index for vertex 1
    pub p1: Option<u32>,
    /// Optional property index for vertex 2
    pub p2: Option<u32>,
    /// Optional property index for vertex 3
    pub p3: Option<u32>,
}

impl Triangle {
    /// Create a new triangle
    pub fn new(v1: u32, v2: u32, v3: u32) -> Self {
        Self {
            v1,
            v2,
            v3,
            pid: None,
            p1: None,
            p2: None,
            p3: None,
        }
    }

    /// Vertex indices in winding order
    pub fn indices(&self) -> [u32; 3] {
        [self.v1, self.v2, self.v3]
    }
}

/// A 3D mesh: vertices, triangles, beams and beam sets
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertices, append-only; grown through [`Mesh::add_vertex`]
    pub(crate) vertices: Vec<Vertex>,
    /// Triangles
    pub triangles: Vec<Triangle>,
    /// Beams (Beam Lattice extension)
    pub beams: Vec<Beam>,
    /// Named beam groups
    pub beam_sets: Vec<BeamSet>,
    /// Radius used for beams that omit `r1`
    pub default_radius: f64,
    /// Minimum beam length
    pub min_length: f64,
    /// Cap used for beams that omit a cap mode
    pub cap_mode: BeamCapMode,
    spatial: Option<SpatialIndex>,
    max_vertex_count: u32,
}

impl Mesh {
    /// Create a new empty mesh without deduplication
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
            beams: Vec::new(),
            beam_sets: Vec::new(),
            default_radius: DEFAULT_BEAM_RADIUS,
            min_length: DEFAULT_MIN_LENGTH,
            cap_mode: BeamCapMode::default(),
            spatial: None,
            max_vertex_count: MAX_VERTEX_COUNT,
        }
    }

    /// Create a new empty mesh that deduplicates coincident vertices
    pub fn with_dedup() -> Self {
        Self {
            spatial: Some(SpatialIndex::new()),
            ..Self::new()
        }
    }

    /// Create a new mesh with pre-allocated capacity
    ///
    /// This is useful for performance when the number of vertices and triangles
    /// is known in advance, as it avoids multiple reallocations.
    pub fn with_capacity(vertices: usize, triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            triangles: Vec::with_capacity(triangles),
            ..Self::new()
        }
    }

    /// Lower the maximum vertex count of this mesh
    ///
    /// Values above [`MAX_VERTEX_COUNT`] are clamped.
    pub fn with_max_vertex_count(mut self, max: u32) -> Self {
        self.max_vertex_count = max.min(MAX_VERTEX_COUNT);
        self
    }

    /// Maximum number of vertices this mesh accepts
    pub fn max_vertex_count(&self) -> u32 {
        self.max_vertex_count
    }

    /// Whether coincident vertices are merged on insertion
    pub fn deduplicates(&self) -> bool {
        self.spatial.is_some()
    }

    /// Vertices in index order
    ///
    /// Read-only, so every vertex goes through [`Mesh::add_vertex`] and its
    /// deduplication and capacity checks:
    ///
    /// ```compile_fail
    /// let mut mesh = lib3mf_stream::Mesh::new();
    /// mesh.vertices.clear();
    /// ```
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Number of beams
    pub fn beam_count(&self) -> u32 {
        self.beams.len() as u32
    }

    /// Position of the vertex at `index`, if present
    pub fn position(&self, index: u32) -> Option<&Point3<f64>> {
        self.vertices.get(index as usize).map(|v| &v.position)
    }

    /// Insert a vertex and return its index
    ///
    /// With deduplication enabled a bit-identical position returns the index
    /// of the existing vertex. Fails with [`Error::CapacityExceeded`] when a
    /// new vertex would exceed the maximum count; the mesh is left unchanged.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> Result<u32> {
        if let Some(index) = self.spatial.as_ref().and_then(|s| s.find(&position)) {
            return Ok(index);
        }

        let count = self.vertex_count();
        if count >= self.max_vertex_count {
            return Err(Error::CapacityExceeded {
                max: self.max_vertex_count,
            });
        }

        self.vertices.push(Vertex {
            index: count,
            position,
        });
        if let Some(spatial) = self.spatial.as_mut() {
            spatial.insert(&position, count);
        }
        Ok(count)
    }

    /// Append a triangle
    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Append a beam
    pub fn add_beam(&mut self, beam: Beam) {
        self.beams.push(beam);
    }

    /// Merge another mesh into this one under `transform`
    ///
    /// Every source vertex is transformed and inserted through
    /// [`Mesh::add_vertex`]. Triangles, beams and beam sets are then appended
    /// with their indices translated. Returns the old-to-new vertex index map.
    pub fn merge(&mut self, src: &Mesh, transform: &Transform) -> Result<Vec<u32>> {
        let mut map = Vec::with_capacity(src.vertices.len());
        for vertex in &src.vertices {
            map.push(self.add_vertex(transform.apply(&vertex.position))?);
        }

        let remap = |i: u32| -> Result<u32> {
            map.get(i as usize).copied().ok_or_else(|| {
                Error::InvalidModel(format!(
                    "Merged mesh references vertex {} but has {} vertices",
                    i,
                    map.len()
                ))
            })
        };

        self.triangles.reserve(src.triangles.len());
        for triangle in &src.triangles {
            self.triangles.push(Triangle {
                v1: remap(triangle.v1)?,
                v2: remap(triangle.v2)?,
                v3: remap(triangle.v3)?,
                ..*triangle
            });
        }

        let beam_offset = self.beam_count();
        self.beams.reserve(src.beams.len());
        for beam in &src.beams {
            self.beams.push(Beam {
                v1: remap(beam.v1)?,
                v2: remap(beam.v2)?,
                ..*beam
            });
        }

        for set in &src.beam_sets {
            self.beam_sets.push(BeamSet {
                name: set.name.clone(),
                identifier: set.identifier.clone(),
                refs: set.refs.iter().map(|r| r + beam_offset).collect(),
            });
        }

        Ok(map)
    }

    /// Check that every vertex records its own position in the list
    pub fn check_sanity(&self) -> bool {
        if self.vertices.len() > self.max_vertex_count as usize {
            return false;
        }
        self.vertices
            .iter()
            .enumerate()
            .all(|(i, v)| v.index as usize == i)
    }

    /// Whether the triangles form a closed, consistently oriented surface
    ///
    /// Every directed edge must be used by exactly one triangle and its
    /// reverse by exactly one other. A mesh without triangles is not manifold.
    pub fn is_manifold_and_oriented(&self) -> bool {
        if self.triangles.is_empty() {
            return false;
        }

        let vertex_count = self.vertex_count();
        let mut edges: HashMap<(u32, u32), u32> = HashMap::with_capacity(self.triangles.len() * 3);
        for triangle in &self.triangles {
            let [a, b, c] = triangle.indices();
            if a == b || b == c || a == c {
                return false;
            }
            if a >= vertex_count || b >= vertex_count || c >= vertex_count {
                return false;
            }
            for edge in [(a, b), (b, c), (c, a)] {
                let count = edges.entry(edge).or_insert(0);
                *count += 1;
                if *count > 1 {
                    return false;
                }
            }
        }

        edges.keys().all(|&(a, b)| edges.contains_key(&(b, a)))
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
