//! Beam Lattice extension types

use super::core::ResourceId;

/// Cap mode for beam lattice ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeamCapMode {
    /// Sphere cap (rounded ends)
    #[default]
    Sphere,
    /// Hemisphere cap (half sphere at end)
    Hemisphere,
    /// Butt cap (flat ends)
    Butt,
}

impl std::fmt::Display for BeamCapMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BeamCapMode::Sphere => write!(f, "sphere"),
            BeamCapMode::Hemisphere => write!(f, "hemisphere"),
            BeamCapMode::Butt => write!(f, "butt"),
        }
    }
}

impl std::str::FromStr for BeamCapMode {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sphere" => Ok(BeamCapMode::Sphere),
            "hemisphere" => Ok(BeamCapMode::Hemisphere),
            "butt" => Ok(BeamCapMode::Butt),
            _ => Err(crate::error::Error::InvalidXml(format!(
                "Invalid cap mode '{}'. Must be 'sphere', 'hemisphere', or 'butt'",
                s
            ))),
        }
    }
}

/// How a beam lattice is clipped against its clipping mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipMode {
    /// No clipping
    #[default]
    None,
    /// Keep the lattice inside the clipping mesh
    Inside,
    /// Keep the lattice outside the clipping mesh
    Outside,
}

impl std::fmt::Display for ClipMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClipMode::None => write!(f, "none"),
            ClipMode::Inside => write!(f, "inside"),
            ClipMode::Outside => write!(f, "outside"),
        }
    }
}

impl std::str::FromStr for ClipMode {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ClipMode::None),
            "inside" => Ok(ClipMode::Inside),
            "outside" => Ok(ClipMode::Outside),
            _ => Err(crate::error::Error::InvalidXml(format!(
                "Invalid clipping mode '{}'. Must be 'none', 'inside', or 'outside'",
                s
            ))),
        }
    }
}

/// A single beam in a beam lattice structure
///
/// Beams connect two vertices of the owning mesh. Radii and caps are stored
/// resolved: omitted values have already been filled from the lattice
/// defaults by the decoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beam {
    /// Index of first vertex
    pub v1: u32,
    /// Index of second vertex
    pub v2: u32,
    /// Radius at first vertex
    pub r1: f64,
    /// Radius at second vertex
    pub r2: f64,
    /// Cap mode at first vertex
    pub cap1: BeamCapMode,
    /// Cap mode at second vertex
    pub cap2: BeamCapMode,
}

impl Beam {
    /// Create a beam with the same radius and cap at both ends
    pub fn new(v1: u32, v2: u32, radius: f64, cap: BeamCapMode) -> Self {
        Self {
            v1,
            v2,
            r1: radius,
            r2: radius,
            cap1: cap,
            cap2: cap,
        }
    }

    /// Create a beam with different radii at both ends
    pub fn with_radii(v1: u32, v2: u32, r1: f64, r2: f64) -> Self {
        Self {
            v1,
            v2,
            r1,
            r2,
            cap1: BeamCapMode::default(),
            cap2: BeamCapMode::default(),
        }
    }
}

/// A named group of beams
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeamSet {
    /// Human-readable name
    pub name: Option<String>,
    /// Unique identifier
    pub identifier: Option<String>,
    /// Indices into the owning mesh's beams
    pub refs: Vec<u32>,
}

impl BeamSet {
    /// Create an empty beam set
    pub fn new() -> Self {
        Self::default()
    }
}

/// Lattice-level attributes of a mesh object
///
/// The clipping and representation meshes are weak references; they are
/// looked up through an [`crate::ObjectResolver`] when needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeamLatticeAttributes {
    /// Clipping mode
    pub clip_mode: ClipMode,
    /// Mesh object that clips the lattice
    pub clipping_mesh: Option<ResourceId>,
    /// Mesh object used as the lattice's alternative representation
    pub representation_mesh: Option<ResourceId>,
}
