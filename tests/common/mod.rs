//! Shared helpers for integration tests
//!
//! Packages are assembled in memory with `zip::ZipWriter` so each test can
//! describe exactly the parts and relationships it needs.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const CORE_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";
pub const PRODUCTION_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/production/2015/06";
pub const BEAM_LATTICE_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/beamlattice/2017/02";
pub const SLICE_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/slice/2015/07";

pub const MODEL_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";
pub const THUMBNAIL_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail";
pub const TEXTURE_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dtexture";

pub const ROOT_PATH: &str = "/3D/3dmodel.model";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
  <Default Extension="png" ContentType="image/png"/>
</Types>"#;

/// In-memory 3MF package under construction
pub struct PackageBuilder {
    files: Vec<(String, Vec<u8>)>,
    /// (source part or "" for the package, target, type)
    relationships: Vec<(String, String, String)>,
}

impl PackageBuilder {
    /// Package whose root model part is `xml`
    pub fn new(root_xml: &str) -> Self {
        let mut builder = Self {
            files: Vec::new(),
            relationships: Vec::new(),
        };
        builder.files.push((ROOT_PATH.to_string(), root_xml.as_bytes().to_vec()));
        builder.relationship("", ROOT_PATH, MODEL_REL_TYPE)
    }

    /// Add a secondary model part referenced from the root part
    pub fn part(self, path: &str, xml: &str) -> Self {
        self.file(path, xml.as_bytes())
            .relationship(ROOT_PATH, path, MODEL_REL_TYPE)
    }

    /// Add a raw file without any relationship
    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        self.files.push((path.to_string(), data.to_vec()));
        self
    }

    /// Add a relationship; an empty source means the package
    pub fn relationship(mut self, source: &str, target: &str, rel_type: &str) -> Self {
        self.relationships
            .push((source.to_string(), target.to_string(), rel_type.to_string()));
        self
    }

    /// Write the ZIP archive
    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();

        let mut sources: Vec<&str> = self.relationships.iter().map(|(s, _, _)| s.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();
        for source in sources {
            let mut xml = String::from(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
            );
            for (i, (_, target, rel_type)) in self
                .relationships
                .iter()
                .filter(|(s, _, _)| s == source)
                .enumerate()
            {
                xml.push_str(&format!(
                    "  <Relationship Id=\"rel{}\" Target=\"{}\" Type=\"{}\"/>\n",
                    i, target, rel_type
                ));
            }
            xml.push_str("</Relationships>");
            zip.start_file(rels_entry(source), options).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
        }

        for (path, data) in &self.files {
            zip.start_file(path.trim_start_matches('/'), options).unwrap();
            zip.write_all(data).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }
}

fn rels_entry(source: &str) -> String {
    if source.is_empty() {
        return "_rels/.rels".to_string();
    }
    let source = source.trim_start_matches('/');
    match source.rsplit_once('/') {
        Some((dir, name)) => format!("{}/_rels/{}.rels", dir, name),
        None => format!("_rels/{}.rels", source),
    }
}

/// Deterministic, well-formed UUID for fixtures
pub fn uuid(n: u32) -> String {
    format!("00000000-0000-4000-8000-{:012}", n)
}

/// `<model>` document with the given extra namespace declarations
pub fn model_xml(namespaces: &str, resources: &str, build: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="{}" {}>
  <resources>
{}
  </resources>
{}
</model>"#,
        CORE_NS, namespaces, resources, build
    )
}

/// Production namespace declaration for [`model_xml`]
pub fn production_ns() -> String {
    format!("xmlns:p=\"{}\"", PRODUCTION_NS)
}

/// Closed, consistently oriented tetrahedron offset along x
pub fn tetrahedron_mesh(offset: f64) -> String {
    let mut xml = String::from("      <mesh>\n        <vertices>\n");
    for (x, y, z) in [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0), (0.0, 0.0, 1.0)] {
        xml.push_str(&format!(
            "          <vertex x=\"{}\" y=\"{}\" z=\"{}\"/>\n",
            x + offset,
            y,
            z
        ));
    }
    xml.push_str("        </vertices>\n        <triangles>\n");
    for [a, b, c] in [[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]] {
        xml.push_str(&format!(
            "          <triangle v1=\"{}\" v2=\"{}\" v3=\"{}\"/>\n",
            a, b, c
        ));
    }
    xml.push_str("        </triangles>\n      </mesh>");
    xml
}

/// Tetrahedron object, with a production UUID when `uuid` is given
pub fn tetrahedron_object(id: u32, uuid: Option<&str>) -> String {
    let uuid = uuid.map(|u| format!(" p:UUID=\"{}\"", u)).unwrap_or_default();
    format!(
        "    <object id=\"{}\" type=\"model\"{}>\n{}\n    </object>",
        id,
        uuid,
        tetrahedron_mesh(0.0)
    )
}

/// Single-part package with one tetrahedron placed once
pub fn tetrahedron_package() -> Vec<u8> {
    let xml = model_xml(
        "",
        &tetrahedron_object(1, None),
        "  <build>\n    <item objectid=\"1\"/>\n  </build>",
    );
    PackageBuilder::new(&xml).build()
}
