//! XML writing for 3MF packages
//!
//! Serializes a [`Model`] back into a package: the root part with the build,
//! every secondary part with its resources, the relationships that link them
//! and the attachments. The output decodes to an equivalent model; it is not
//! a byte-for-byte copy of the package the model was read from.

mod beam_lattice;
mod core;

use crate::error::{Error, Result};
use crate::model::*;
use crate::opc::{MODEL_REL_TYPE, PackageWriter, THUMBNAIL_REL_TYPE};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::collections::HashSet;
use std::io::{Seek, Write};

/// Write the model as a 3MF package and return the inner writer
pub(crate) fn write_package<W: Write + Seek>(model: &Model, writer: W) -> Result<W> {
    let mut package = PackageWriter::new(writer);
    let root = model.path();

    let mut xml = Vec::new();
    write_part_xml(model, model.root_part(), &mut xml)?;
    package.add_model_part(root, &xml)?;
    package.add_relationship(None, root, MODEL_REL_TYPE);

    for part in model.parts.iter().skip(1) {
        xml.clear();
        write_part_xml(model, part, &mut xml)?;
        package.add_model_part(&part.path, &xml)?;
        package.add_relationship(Some(root), &part.path, MODEL_REL_TYPE);
    }

    let mut written = HashSet::new();
    if let Some(thumbnail) = &model.thumbnail {
        package.add_part(&thumbnail.path, &thumbnail.content_type, &thumbnail.data)?;
        package.add_relationship(None, &thumbnail.path, THUMBNAIL_REL_TYPE);
        written.insert(thumbnail.path.as_str());
    }
    for attachment in &model.attachments {
        if written.insert(attachment.path.as_str()) {
            package.add_part(&attachment.path, &attachment.content_type, &attachment.data)?;
        }
        package.add_relationship(Some(root), &attachment.path, &attachment.relationship_type);
    }

    tracing::debug!(
        parts = model.parts.len(),
        attachments = model.attachments.len(),
        "wrote package"
    );
    package.finish()
}

/// Write one model part as XML
///
/// The root part carries the model's metadata, required extensions and the
/// build. Secondary parts carry only their own metadata and resources.
pub fn write_part_xml<W: Write>(model: &Model, part: &Part, writer: W) -> Result<()> {
    let mut xml = Writer::new_with_indent(writer, b' ', 2);
    let production = uses_production(model);

    emit(
        &mut xml,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        "XML declaration",
    )?;

    let mut elem = BytesStart::new("model");
    elem.push_attribute(("unit", model.unit.as_str()));
    if let Some(language) = &model.language {
        elem.push_attribute(("xml:lang", language.as_str()));
    }
    elem.push_attribute(("xmlns", Extension::Core.namespace()));

    let mut namespaces = Vec::new();
    if part.is_root {
        namespaces.extend(model.required_extensions.iter().copied());
    }
    if production {
        namespaces.push(Extension::Production);
    }
    if part.resources.objects().any(|o| o.slice_stack_id.is_some()) {
        namespaces.push(Extension::Slice);
    }
    if part
        .resources
        .objects()
        .any(|o| o.mesh().is_some_and(|m| !m.beams.is_empty()))
    {
        namespaces.push(Extension::BeamLattice);
    }
    let mut declared = Vec::new();
    for ext in namespaces {
        if ext != Extension::Core && !declared.contains(&ext) {
            declared.push(ext);
        }
    }
    for ext in &declared {
        elem.push_attribute((format!("xmlns:{}", ext.prefix()).as_str(), ext.namespace()));
    }

    if part.is_root {
        let required: Vec<&str> = model
            .required_extensions
            .iter()
            .filter(|e| **e != Extension::Core)
            .map(|e| e.prefix())
            .collect();
        if !required.is_empty() {
            elem.push_attribute(("requiredextensions", required.join(" ").as_str()));
        }
    }

    emit(&mut xml, Event::Start(elem), "model element")?;

    let metadata = if part.is_root {
        &model.metadata
    } else {
        &part.metadata
    };
    for entry in metadata {
        write_metadata(&mut xml, entry)?;
    }

    emit(&mut xml, Event::Start(BytesStart::new("resources")), "resources element")?;
    for resource in part.resources.iter() {
        match resource {
            Resource::BaseMaterials(group) => core::write_base_materials(&mut xml, group)?,
            Resource::Object(object) => core::write_object(&mut xml, part, object, production)?,
        }
    }
    emit(&mut xml, Event::End(BytesEnd::new("resources")), "resources element")?;

    if part.is_root {
        core::write_build(&mut xml, model, production)?;
    }

    emit(&mut xml, Event::End(BytesEnd::new("model")), "model element")?;
    Ok(())
}

/// Whether the package needs the production namespace
///
/// Multi-part packages reference secondary parts through `p:path`, and once
/// the namespace is declared every object, component and item needs a UUID.
fn uses_production(model: &Model) -> bool {
    model.parts.len() > 1
        || model.required_extensions.contains(&Extension::Production)
        || model.build.uuid.is_some()
        || model.build.items.iter().any(|i| i.uuid.is_some())
        || model.parts.iter().any(|p| {
            p.resources.objects().any(|o| {
                o.uuid.is_some() || o.components().is_some_and(|c| c.iter().any(|c| c.uuid.is_some()))
            })
        })
}

/// The element's UUID, or a fresh one when production attributes are written
fn production_uuid(uuid: Option<&String>, production: bool) -> Option<String> {
    match uuid {
        Some(uuid) => Some(uuid.clone()),
        None if production => Some(uuid::Uuid::new_v4().to_string()),
        None => None,
    }
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>, what: &str) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::xml_write(format!("Failed to write {}: {}", what, e)))
}

/// Write a metadata entry
fn write_metadata<W: Write>(writer: &mut Writer<W>, entry: &MetadataEntry) -> Result<()> {
    let mut elem = BytesStart::new("metadata");
    elem.push_attribute(("name", entry.name.as_str()));

    if let Some(preserve) = entry.preserve {
        elem.push_attribute(("preserve", if preserve { "1" } else { "0" }));
    }
    if let Some(metadata_type) = &entry.metadata_type {
        elem.push_attribute(("type", metadata_type.as_str()));
    }

    emit(writer, Event::Start(elem), "metadata element")?;
    emit(writer, Event::Text(BytesText::new(&entry.value)), "metadata value")?;
    emit(writer, Event::End(BytesEnd::new("metadata")), "metadata element")
}

/// Write a `metadatagroup`, skipped when empty
fn write_metadata_group<W: Write>(writer: &mut Writer<W>, entries: &[MetadataEntry]) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    emit(writer, Event::Start(BytesStart::new("metadatagroup")), "metadatagroup element")?;
    for entry in entries {
        write_metadata(writer, entry)?;
    }
    emit(writer, Event::End(BytesEnd::new("metadatagroup")), "metadatagroup element")
}
