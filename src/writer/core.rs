//! Core element writing: objects, meshes, components and the build

use super::beam_lattice::write_beam_lattice;
use super::{emit, production_uuid, write_metadata_group};
use crate::error::Result;
use crate::model::*;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use std::io::Write as IoWrite;

/// Write a base material group
pub(super) fn write_base_materials<W: IoWrite>(
    writer: &mut Writer<W>,
    group: &BaseMaterialGroup,
) -> Result<()> {
    let mut elem = BytesStart::new("basematerials");
    elem.push_attribute(("id", group.id.to_string().as_str()));
    emit(writer, Event::Start(elem), "basematerials element")?;

    for material in &group.materials {
        let mut base = BytesStart::new("base");
        base.push_attribute(("name", material.name.as_str()));
        base.push_attribute(("displaycolor", material.display_color.as_str()));
        emit(writer, Event::Empty(base), "base material")?;
    }

    emit(writer, Event::End(BytesEnd::new("basematerials")), "basematerials element")
}

/// Write an object declared in `part`
pub(super) fn write_object<W: IoWrite>(
    writer: &mut Writer<W>,
    part: &Part,
    object: &Object,
    production: bool,
) -> Result<()> {
    let mut elem = BytesStart::new("object");
    elem.push_attribute(("id", object.id.to_string().as_str()));
    elem.push_attribute(("type", object.object_type.as_str()));

    if let Some(name) = &object.name {
        elem.push_attribute(("name", name.as_str()));
    }
    if let Some(part_number) = &object.part_number {
        elem.push_attribute(("partnumber", part_number.as_str()));
    }
    if let Some(thumbnail) = &object.thumbnail {
        elem.push_attribute(("thumbnail", thumbnail.as_str()));
    }
    if let Some(property) = object.default_property {
        elem.push_attribute(("pid", property.pid.to_string().as_str()));
        elem.push_attribute(("pindex", property.pindex.to_string().as_str()));
    }
    if let Some(uuid) = production_uuid(object.uuid.as_ref(), production) {
        elem.push_attribute(("p:UUID", uuid.as_str()));
    }
    if let Some(stack) = object.slice_stack_id {
        elem.push_attribute(("s:slicestackid", stack.to_string().as_str()));
        if object.slice_resolution != SliceResolution::default() {
            elem.push_attribute((
                "s:meshresolution",
                object.slice_resolution.to_string().as_str(),
            ));
        }
    }

    emit(writer, Event::Start(elem), "object element")?;

    write_metadata_group(writer, &object.metadata)?;

    match &object.kind {
        ObjectKind::Mesh(mesh_object) => {
            if let Some(mesh) = &mesh_object.mesh {
                write_mesh(writer, mesh, &mesh_object.beam_lattice)?;
            }
        }
        ObjectKind::Components(components) => {
            write_components(writer, part, &components.components, production)?;
        }
    }

    emit(writer, Event::End(BytesEnd::new("object")), "object element")
}

/// Write a mesh
fn write_mesh<W: IoWrite>(
    writer: &mut Writer<W>,
    mesh: &Mesh,
    lattice: &BeamLatticeAttributes,
) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new("mesh")), "mesh element")?;

    emit(writer, Event::Start(BytesStart::new("vertices")), "vertices element")?;
    for vertex in &mesh.vertices {
        let mut elem = BytesStart::new("vertex");
        elem.push_attribute(("x", vertex.position.x.to_string().as_str()));
        elem.push_attribute(("y", vertex.position.y.to_string().as_str()));
        elem.push_attribute(("z", vertex.position.z.to_string().as_str()));
        emit(writer, Event::Empty(elem), "vertex")?;
    }
    emit(writer, Event::End(BytesEnd::new("vertices")), "vertices element")?;

    emit(writer, Event::Start(BytesStart::new("triangles")), "triangles element")?;
    for triangle in &mesh.triangles {
        let mut elem = BytesStart::new("triangle");
        elem.push_attribute(("v1", triangle.v1.to_string().as_str()));
        elem.push_attribute(("v2", triangle.v2.to_string().as_str()));
        elem.push_attribute(("v3", triangle.v3.to_string().as_str()));

        if let Some(pid) = triangle.pid {
            elem.push_attribute(("pid", pid.to_string().as_str()));
        }
        for (name, value) in [("p1", triangle.p1), ("p2", triangle.p2), ("p3", triangle.p3)] {
            if let Some(value) = value {
                elem.push_attribute((name, value.to_string().as_str()));
            }
        }

        emit(writer, Event::Empty(elem), "triangle")?;
    }
    emit(writer, Event::End(BytesEnd::new("triangles")), "triangles element")?;

    if !mesh.beams.is_empty() {
        write_beam_lattice(writer, mesh, lattice)?;
    }

    emit(writer, Event::End(BytesEnd::new("mesh")), "mesh element")
}

/// Write the components of an assembly declared in `part`
fn write_components<W: IoWrite>(
    writer: &mut Writer<W>,
    part: &Part,
    components: &[Component],
    production: bool,
) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new("components")), "components element")?;

    for component in components {
        let mut elem = BytesStart::new("component");
        elem.push_attribute(("objectid", component.object.id.to_string().as_str()));

        if !component.transform.is_identity() {
            elem.push_attribute(("transform", component.transform.to_string().as_str()));
        }
        if let Some(uuid) = production_uuid(component.uuid.as_ref(), production) {
            elem.push_attribute(("p:UUID", uuid.as_str()));
        }
        if component.object.path != part.path {
            elem.push_attribute(("p:path", component.object.path.as_str()));
        }

        emit(writer, Event::Empty(elem), "component")?;
    }

    emit(writer, Event::End(BytesEnd::new("components")), "components element")
}

/// Write the build section of the root part
pub(super) fn write_build<W: IoWrite>(
    writer: &mut Writer<W>,
    model: &Model,
    production: bool,
) -> Result<()> {
    let mut elem = BytesStart::new("build");
    if let Some(uuid) = production_uuid(model.build.uuid.as_ref(), production) {
        elem.push_attribute(("p:UUID", uuid.as_str()));
    }
    emit(writer, Event::Start(elem), "build element")?;

    for item in &model.build.items {
        write_build_item(writer, model.path(), item, production)?;
    }

    emit(writer, Event::End(BytesEnd::new("build")), "build element")
}

/// Write a build item
fn write_build_item<W: IoWrite>(
    writer: &mut Writer<W>,
    root: &str,
    item: &BuildItem,
    production: bool,
) -> Result<()> {
    let mut elem = BytesStart::new("item");
    elem.push_attribute(("objectid", item.object.id.to_string().as_str()));

    if !item.transform.is_identity() {
        elem.push_attribute(("transform", item.transform.to_string().as_str()));
    }
    if let Some(part_number) = &item.part_number {
        elem.push_attribute(("partnumber", part_number.as_str()));
    }
    if let Some(uuid) = production_uuid(item.uuid.as_ref(), production) {
        elem.push_attribute(("p:UUID", uuid.as_str()));
    }
    if item.object.path != root {
        elem.push_attribute(("p:path", item.object.path.as_str()));
    }

    if item.metadata.is_empty() {
        return emit(writer, Event::Empty(elem), "item");
    }
    emit(writer, Event::Start(elem), "item element")?;
    write_metadata_group(writer, &item.metadata)?;
    emit(writer, Event::End(BytesEnd::new("item")), "item element")
}
