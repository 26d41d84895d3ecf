//! # lib3mf-stream
//!
//! A pure Rust decoder for multi-part 3MF (3D Manufacturing Format) packages.
//!
//! A 3MF file is a ZIP container following the Open Packaging Conventions
//! (OPC). It holds a root model part and, with the Production extension, any
//! number of secondary model parts that the root part references by path.
//! This crate decodes the root part first, decodes the secondary parts in
//! parallel, and merges everything into a single validated [`Model`].
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Streaming XML decoding with cooperative cancellation
//! - Core objects, meshes and component assemblies
//! - Beam Lattice, Production and Slice extension attributes
//! - Assembly flattening with optional vertex deduplication
//! - Manifold and slice-compatibility validation of build items
//! - Strict and lenient decoding; lenient decoding records [`Warning`]s
//! - Package writing and binary STL import/export
//!
//! ## Example
//!
//! ```no_run
//! use lib3mf_stream::Model;
//! use std::fs::File;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("model.3mf")?;
//! let model = Model::from_reader(file)?;
//!
//! println!("Model contains {} parts", model.parts.len());
//! let mesh = model.flatten()?;
//! println!("Flattened build has {} triangles", mesh.triangles.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod geometry;
pub mod model;
pub mod opc;
pub mod parser;
pub mod registry;
pub mod stl;
mod writer;

pub use error::{Error, InvalidObjectReason, Result, Warning, WarningKind};
pub use geometry::ObjectGeometry;
pub use model::{
    Attachment, BaseMaterial, BaseMaterialGroup, Beam, BeamCapMode, BeamLatticeAttributes,
    BeamSet, Build, BuildItem, ClipMode, Component, ComponentsObject, Extension, Mesh, MeshObject,
    MetadataEntry, Model, Object, ObjectKind, ObjectType, ParserConfig, Part, PropertyRef,
    Resource, ResourceId, SliceResolution, SpatialIndex, Transform, Triangle, Vertex,
};
pub use parser::CancellationToken;
pub use registry::{ObjectResolver, ResourceRegistry};
pub use writer::write_part_xml;

use std::io::{Read, Seek, Write};

impl Model {
    /// Parse a 3MF file from a reader
    ///
    /// Uses the default configuration: strict decoding with build validation.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lib3mf_stream::Model;
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let file = File::open("model.3mf")?;
    /// let model = Model::from_reader(file)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_reader<R: Read + Seek + Send>(reader: R) -> Result<Self> {
        Self::from_reader_with_config(reader, ParserConfig::default())
    }

    /// Parse a 3MF file from a reader with custom configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lib3mf_stream::{CancellationToken, Model, ParserConfig};
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let file = File::open("model.3mf")?;
    /// let token = CancellationToken::new();
    ///
    /// // Recover from invalid content where possible and allow cancellation
    /// let config = ParserConfig::lenient().with_cancellation(token.clone());
    ///
    /// let model = Model::from_reader_with_config(file, config)?;
    /// for warning in &model.warnings {
    ///     eprintln!("{}", warning);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_reader_with_config<R: Read + Seek + Send>(
        reader: R,
        config: ParserConfig,
    ) -> Result<Self> {
        parser::parse_3mf_with_config(reader, config)
    }

    /// Read thumbnail binary data from a 3MF file
    ///
    /// Returns the thumbnail image data if the package has one, preferring
    /// the root model part's thumbnail over the package thumbnail.
    pub fn read_thumbnail<R: Read + Seek + Send>(reader: R) -> Result<Option<Vec<u8>>> {
        parser::read_thumbnail(reader)
    }

    /// Write a 3MF file to a writer
    ///
    /// Writes every part, the relationships between them and the model's
    /// attachments, and returns the writer once the archive is complete.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lib3mf_stream::Model;
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let model = Model::new();
    /// // ... populate model with data ...
    ///
    /// let file = File::create("output.3mf")?;
    /// model.to_writer(file)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn to_writer<W: Write + Seek>(&self, writer: W) -> Result<W> {
        writer::write_package(self, writer)
    }

    /// Write a 3MF file to a file path
    pub fn write_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let file = std::io::BufWriter::new(std::fs::File::create(path)?);
        let mut file = self.to_writer(file)?;
        file.flush()?;
        Ok(())
    }
}
