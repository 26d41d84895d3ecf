//! `[Content_Types].xml` parsing and generation

use super::{MODEL_CONTENT_TYPE, RELS_CONTENT_TYPE, normalize_part_name};
use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::BTreeMap;

/// Content type table of a package
///
/// Overrides match a part name exactly; defaults match the part's file
/// extension case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    defaults: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

impl ContentTypes {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The defaults every 3MF package declares (`rels` and `model`)
    pub fn with_3mf_defaults() -> Self {
        let mut types = Self::new();
        types.add_default("rels", RELS_CONTENT_TYPE);
        types.add_default("model", MODEL_CONTENT_TYPE);
        types
    }

    /// Map a file extension to a content type
    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        self.defaults
            .insert(extension.to_ascii_lowercase(), content_type.to_string());
    }

    /// Map one part to a content type
    pub fn add_override(&mut self, part: &str, content_type: &str) {
        self.overrides
            .insert(normalize_part_name(part), content_type.to_string());
    }

    /// Content type of a part
    pub fn lookup(&self, part: &str) -> Option<&str> {
        let part = normalize_part_name(part);
        if let Some(ct) = self.overrides.get(&part) {
            return Some(ct);
        }
        let name = part.rsplit('/').next().unwrap_or(&part);
        let (_, extension) = name.rsplit_once('.')?;
        self.defaults
            .get(&extension.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Parse a `[Content_Types].xml` part
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut types = Self::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let name = e.local_name();
                    let mut extension = None;
                    let mut part_name = None;
                    let mut content_type = None;

                    for attr in e.attributes() {
                        let attr = attr?;
                        let key = std::str::from_utf8(attr.key.as_ref())
                            .map_err(|e| Error::InvalidXml(e.to_string()))?;
                        let value = std::str::from_utf8(&attr.value)
                            .map_err(|e| Error::InvalidXml(e.to_string()))?;

                        match key {
                            "Extension" => extension = Some(value.to_string()),
                            "PartName" => part_name = Some(value.to_string()),
                            "ContentType" => content_type = Some(value.to_string()),
                            _ => {}
                        }
                    }

                    match (name.as_ref(), extension, part_name, content_type) {
                        (b"Default", Some(ext), _, Some(ct)) => types.add_default(&ext, &ct),
                        (b"Override", _, Some(part), Some(ct)) => types.add_override(&part, &ct),
                        (b"Default", ..) | (b"Override", ..) => {
                            return Err(Error::invalid_format_context(
                                "Content types",
                                "Default and Override elements require a ContentType and \
                                 an Extension or PartName",
                            ));
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(types)
    }

    /// Serialize as a `[Content_Types].xml` part
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\n",
        );
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                "  <Default Extension=\"{}\" ContentType=\"{}\"/>\n",
                quick_xml::escape::escape(ext.as_str()),
                quick_xml::escape::escape(ct.as_str())
            ));
        }
        for (part, ct) in &self.overrides {
            xml.push_str(&format!(
                "  <Override PartName=\"{}\" ContentType=\"{}\"/>\n",
                quick_xml::escape::escape(part.as_str()),
                quick_xml::escape::escape(ct.as_str())
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}
