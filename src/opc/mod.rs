//! OPC (Open Packaging Conventions) handling for 3MF files
//!
//! 3MF files are ZIP archives following the OPC standard, containing
//! various parts including the main 3D model file and relationships.
//!
//! Decoding only needs the narrow [`PackageReader`] view of a package: read
//! a part by name and list the relationships of a part. [`ZipPackage`] is the
//! implementation over a ZIP archive; tests and embedders can provide their
//! own.

mod content_types;
mod reader;
mod relationships;
mod writer;

pub use content_types::ContentTypes;
pub use reader::ZipPackage;
pub use relationships::{Relationship, parse_relationships};
pub use writer::PackageWriter;

use crate::error::Result;

/// Content types file path
pub const CONTENT_TYPES_PATH: &str = "/[Content_Types].xml";

/// Package relationships file path
pub const RELS_PATH: &str = "/_rels/.rels";

/// 3D model relationship type
pub const MODEL_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";

/// Thumbnail relationship type (OPC standard)
pub const THUMBNAIL_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail";

/// 3D texture relationship type
pub const TEXTURE_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dtexture";

/// Content type of 3D model parts
pub const MODEL_CONTENT_TYPE: &str = "application/vnd.ms-package.3dmanufacturing-3dmodel+xml";

/// Content type of relationship parts
pub const RELS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";

/// Read access to the parts of a package
///
/// Paths are absolute part names such as `/3D/3dmodel.model`. Implementations
/// must be shareable across threads because secondary model parts are read
/// from parallel decoding tasks.
pub trait PackageReader: Sync {
    /// Raw bytes of a part
    ///
    /// Fails with [`crate::Error::MissingFile`] when the part does not exist.
    fn read_part(&self, path: &str) -> Result<Vec<u8>>;

    /// Whether the part exists
    fn has_part(&self, path: &str) -> bool;

    /// Content type of a part, when the package records one
    fn content_type(&self, _path: &str) -> Option<String> {
        None
    }

    /// Relationships whose source is `source` (`None` for the package)
    ///
    /// A missing relationships part means no relationships.
    fn relationships(&self, source: Option<&str>) -> Result<Vec<Relationship>> {
        let rels = relationships_path(source);
        if !self.has_part(&rels) {
            return Ok(Vec::new());
        }
        parse_relationships(&self.read_part(&rels)?, source)
    }
}

/// Target of the first relationship of `relationship_type` from `source`
pub fn find_part_by_relationship<P: PackageReader + ?Sized>(
    package: &P,
    source: Option<&str>,
    relationship_type: &str,
) -> Result<Option<String>> {
    Ok(package
        .relationships(source)?
        .into_iter()
        .find(|r| r.relationship_type == relationship_type)
        .map(|r| r.target))
}

/// Path of the relationships part for `source`
///
/// `/3D/3dmodel.model` maps to `/3D/_rels/3dmodel.model.rels`; the package
/// itself maps to `/_rels/.rels`.
pub fn relationships_path(source: Option<&str>) -> String {
    match source {
        None => RELS_PATH.to_string(),
        Some(path) => {
            let path = normalize_part_name(path);
            match path.rsplit_once('/') {
                Some((dir, name)) => format!("{}/_rels/{}.rels", dir, name),
                None => format!("/_rels/{}.rels", path),
            }
        }
    }
}

/// Make a part name absolute and percent-decoded
pub fn normalize_part_name(path: &str) -> String {
    let decoded = urlencoding::decode(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string());
    if decoded.starts_with('/') {
        decoded
    } else {
        format!("/{}", decoded)
    }
}

/// Resolve a relationship target against the part that declares it
///
/// Absolute targets are used as they are; relative targets are resolved
/// against the source part's directory, honouring `.` and `..` segments.
pub fn resolve_target(source: Option<&str>, target: &str) -> String {
    if target.starts_with('/') {
        return normalize_part_name(target);
    }

    let base = source
        .map(normalize_part_name)
        .and_then(|s| s.rsplit_once('/').map(|(dir, _)| dir.to_string()))
        .unwrap_or_default();

    let decoded = normalize_part_name(target);
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationships_path() {
        assert_eq!(relationships_path(None), "/_rels/.rels");
        assert_eq!(
            relationships_path(Some("/3D/3dmodel.model")),
            "/3D/_rels/3dmodel.model.rels"
        );
        assert_eq!(
            relationships_path(Some("3D/parts/a.model")),
            "/3D/parts/_rels/a.model.rels"
        );
    }

    #[test]
    fn test_normalize_part_name() {
        assert_eq!(normalize_part_name("3D/3dmodel.model"), "/3D/3dmodel.model");
        assert_eq!(normalize_part_name("/3D/my%20part.model"), "/3D/my part.model");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target(None, "/3D/a.model"), "/3D/a.model");
        assert_eq!(resolve_target(None, "3D/a.model"), "/3D/a.model");
        assert_eq!(
            resolve_target(Some("/3D/3dmodel.model"), "parts/b.model"),
            "/3D/parts/b.model"
        );
        assert_eq!(
            resolve_target(Some("/3D/3dmodel.model"), "../Textures/t.png"),
            "/Textures/t.png"
        );
    }
}
