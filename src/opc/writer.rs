//! Package writing functionality for creating 3MF files

use super::relationships::write_relationships;
use super::{
    CONTENT_TYPES_PATH, ContentTypes, MODEL_CONTENT_TYPE, Relationship, normalize_part_name,
    relationships_path,
};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::io::{Seek, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Incremental writer for a 3MF package
///
/// Parts are streamed into the archive as they are added. Relationships and
/// content types are collected and written by [`PackageWriter::finish`].
pub struct PackageWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
    content_types: ContentTypes,
    /// Source part (`None` for the package) -> relationships
    relationships: BTreeMap<Option<String>, Vec<Relationship>>,
}

impl<W: Write + Seek> PackageWriter<W> {
    /// Start a new package
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: SimpleFileOptions::default(),
            content_types: ContentTypes::with_3mf_defaults(),
            relationships: BTreeMap::new(),
        }
    }

    /// Write a model part
    pub fn add_model_part(&mut self, path: &str, xml: &[u8]) -> Result<()> {
        self.add_part(path, MODEL_CONTENT_TYPE, xml)
    }

    /// Write a part with an explicit content type
    ///
    /// Parts whose extension already maps to `content_type` need no override.
    pub fn add_part(&mut self, path: &str, content_type: &str, data: &[u8]) -> Result<()> {
        let path = normalize_part_name(path);
        if self.content_types.lookup(&path) != Some(content_type) {
            self.content_types.add_override(&path, content_type);
        }
        self.write_entry(&path, data)
    }

    /// Record a relationship from `source` (`None` for the package) to `target`
    pub fn add_relationship(&mut self, source: Option<&str>, target: &str, relationship_type: &str) {
        let rels = self
            .relationships
            .entry(source.map(normalize_part_name))
            .or_default();
        let id = format!("rel{}", rels.len());
        rels.push(Relationship {
            id,
            target: normalize_part_name(target),
            relationship_type: relationship_type.to_string(),
        });
    }

    /// Write relationships and content types and close the archive
    pub fn finish(mut self) -> Result<W> {
        let relationships = std::mem::take(&mut self.relationships);
        for (source, rels) in &relationships {
            let path = relationships_path(source.as_deref());
            self.write_entry(&path, write_relationships(rels).as_bytes())?;
        }

        let content_types = self.content_types.to_xml();
        self.write_entry(CONTENT_TYPES_PATH, content_types.as_bytes())?;

        self.zip
            .finish()
            .map_err(|e| Error::xml_write(format!("Failed to finalize ZIP archive: {}", e)))
    }

    fn write_entry(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let name = path.trim_start_matches('/');
        self.zip
            .start_file(name, self.options)
            .map_err(|e| Error::xml_write(format!("Failed to create {} file: {}", name, e)))?;
        self.zip
            .write_all(data)
            .map_err(|e| Error::xml_write(format!("Failed to write {}: {}", name, e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::{MODEL_REL_TYPE, PackageReader, THUMBNAIL_REL_TYPE, ZipPackage};
    use std::io::Cursor;

    #[test]
    fn test_written_package_reopens() {
        let mut writer = PackageWriter::new(Cursor::new(Vec::new()));
        writer.add_model_part("/3D/3dmodel.model", b"<model/>").unwrap();
        writer
            .add_part("/Metadata/thumbnail.png", "image/png", &[0x89, b'P', b'N', b'G'])
            .unwrap();
        writer.add_relationship(None, "/3D/3dmodel.model", MODEL_REL_TYPE);
        writer.add_relationship(None, "/Metadata/thumbnail.png", THUMBNAIL_REL_TYPE);
        let data = writer.finish().unwrap().into_inner();

        let package = ZipPackage::open(Cursor::new(data)).unwrap();
        let rels = package.relationships(None).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0].id, "rel0");
        assert_eq!(rels[1].target, "/Metadata/thumbnail.png");
        assert_eq!(
            package.content_type("/Metadata/thumbnail.png").as_deref(),
            Some("image/png")
        );
        assert_eq!(package.read_part("/3D/3dmodel.model").unwrap(), b"<model/>");
    }

    #[test]
    fn test_part_relationships_land_next_to_part() {
        let mut writer = PackageWriter::new(Cursor::new(Vec::new()));
        writer.add_model_part("/3D/3dmodel.model", b"<model/>").unwrap();
        writer.add_model_part("/3D/other.model", b"<model/>").unwrap();
        writer.add_relationship(None, "/3D/3dmodel.model", MODEL_REL_TYPE);
        writer.add_relationship(Some("/3D/3dmodel.model"), "/3D/other.model", MODEL_REL_TYPE);
        let data = writer.finish().unwrap().into_inner();

        let package = ZipPackage::open(Cursor::new(data)).unwrap();
        assert!(package.has_part("/3D/_rels/3dmodel.model.rels"));
        let rels = package.relationships(Some("/3D/3dmodel.model")).unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].target, "/3D/other.model");
    }
}
