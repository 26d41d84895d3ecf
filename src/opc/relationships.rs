//! Relationship parts (`*.rels`)

use super::resolve_target;
use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event;

/// A typed link from a part (or the package) to another part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship id, unique within its relationships part
    pub id: String,
    /// Absolute path of the target part
    pub target: String,
    /// Relationship type URI
    pub relationship_type: String,
}

/// Parse a relationships part
///
/// Targets are resolved against `source`, the part the relationships belong
/// to (`None` for package relationships).
pub fn parse_relationships(xml: &[u8], source: Option<&str>) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() != b"Relationship" {
                    buf.clear();
                    continue;
                }

                let mut id = None;
                let mut target = None;
                let mut rel_type = None;

                for attr in e.attributes() {
                    let attr = attr?;
                    let key = std::str::from_utf8(attr.key.as_ref())
                        .map_err(|e| Error::InvalidXml(e.to_string()))?;
                    let value = std::str::from_utf8(&attr.value)
                        .map_err(|e| Error::InvalidXml(e.to_string()))?;

                    match key {
                        "Id" => id = Some(value.to_string()),
                        "Target" => target = Some(value.to_string()),
                        "Type" => rel_type = Some(value.to_string()),
                        _ => {}
                    }
                }

                match (target, rel_type) {
                    (Some(target), Some(relationship_type)) => {
                        relationships.push(Relationship {
                            id: id.unwrap_or_default(),
                            target: resolve_target(source, &target),
                            relationship_type,
                        });
                    }
                    _ => {
                        return Err(Error::invalid_format_context(
                            "Relationships",
                            "Relationship element requires 'Target' and 'Type' attributes",
                        ));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// Serialize relationships into a relationships part
pub(crate) fn write_relationships(relationships: &[Relationship]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\n",
    );
    for rel in relationships {
        xml.push_str(&format!(
            "  <Relationship Target=\"{}\" Id=\"{}\" Type=\"{}\"/>\n",
            quick_xml::escape::escape(rel.target.as_str()),
            quick_xml::escape::escape(rel.id.as_str()),
            quick_xml::escape::escape(rel.relationship_type.as_str()),
        ));
    }
    xml.push_str("</Relationships>");
    xml
}
