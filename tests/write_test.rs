//! Tests for 3MF writing and encode/decode round trips

mod common;

use common::*;
use lib3mf_stream::{
    Attachment, BaseMaterial, BaseMaterialGroup, Beam, BeamCapMode, BuildItem, Component,
    Extension, Mesh, MetadataEntry, Model, Object, ParserConfig, Part, Resource, ResourceId,
    Transform, Triangle,
};
use nalgebra::Point3;
use std::io::Cursor;

fn tetrahedron() -> Mesh {
    let mut mesh = Mesh::new();
    for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]] {
        mesh.add_vertex(Point3::new(p[0], p[1], p[2])).unwrap();
    }
    for [a, b, c] in [[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]] {
        mesh.add_triangle(Triangle::new(a, b, c));
    }
    mesh
}

fn round_trip(model: &Model) -> Model {
    let cursor = model.to_writer(Cursor::new(Vec::new())).unwrap();
    Model::from_reader(Cursor::new(cursor.into_inner())).unwrap()
}

/// Single-part model with metadata, a material group and a placed object
fn single_part_model() -> Model {
    let mut model = Model::new();
    model.language = Some("en-US".to_string());
    model.metadata.push(MetadataEntry::new("Title", "Bracket & Hinge"));
    model
        .metadata
        .push(MetadataEntry::new_with_preserve("Designer", "someone", true));

    let resources = &mut model.root_part_mut().resources;
    let mut group = BaseMaterialGroup::new(2);
    group.materials.push(BaseMaterial {
        name: "PLA".to_string(),
        display_color: "#FF0000FF".to_string(),
    });
    resources.register(Resource::BaseMaterials(group)).unwrap();

    let mut object = Object::new_mesh(1, tetrahedron());
    object.name = Some("tetra".to_string());
    object.part_number = Some("T-1".to_string());
    resources.register(Resource::Object(object)).unwrap();

    let mut item = BuildItem::new(ResourceId::new(ROOT_PATH, 1));
    item.transform = Transform::translation(5.0, 0.0, 2.5);
    item.metadata.push(MetadataEntry::new("Station", "north"));
    model.build.items.push(item);
    model
}

#[test]
fn test_round_trip_single_part() {
    let model = single_part_model();
    let back = round_trip(&model);

    assert_eq!(back.unit, "millimeter");
    assert_eq!(back.language.as_deref(), Some("en-US"));
    assert_eq!(back.get_metadata("Title"), Some("Bracket & Hinge"));
    assert_eq!(back.metadata[1].preserve, Some(true));

    let resources = &back.root_part().resources;
    assert_eq!(resources.len(), 2);
    let object = resources.object(1).unwrap();
    assert_eq!(object.name.as_deref(), Some("tetra"));
    assert_eq!(object.part_number.as_deref(), Some("T-1"));
    assert_eq!(object.mesh().unwrap().triangles, tetrahedron().triangles);

    let item = &back.build.items[0];
    assert_eq!(item.transform, Transform::translation(5.0, 0.0, 2.5));
    assert_eq!(item.metadata[0].value, "north");

    // No production namespace, so no UUIDs were invented
    assert!(item.uuid.is_none());
    assert!(back.build.uuid.is_none());
    assert_eq!(back.flatten().unwrap().vertices(), model.flatten().unwrap().vertices());
}

#[test]
fn test_round_trip_multi_part() {
    let mut model = Model::new();
    let other = "/3D/objects/tetra.model";

    let mut part = Part::new(other, false);
    part.resources
        .register(Resource::Object(Object::new_mesh(1, tetrahedron())))
        .unwrap();
    model.parts.push(part);

    let components = vec![
        Component::new(ResourceId::new(other, 1)),
        Component::with_transform(ResourceId::new(other, 1), Transform::translation(0.0, 0.0, 4.0)),
    ];
    model
        .root_part_mut()
        .resources
        .register(Resource::Object(Object::new_components(5, components)))
        .unwrap();
    model.build.items.push(BuildItem::new(ResourceId::new(ROOT_PATH, 5)));

    let back = round_trip(&model);
    let paths: Vec<&str> = back.parts.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(paths, [ROOT_PATH, other]);

    // Every production element received a UUID
    assert!(back.build.uuid.is_some());
    assert!(back.build.items[0].uuid.is_some());
    let assembly = back.root_part().resources.object(5).unwrap();
    assert!(assembly.uuid.is_some());
    assert!(assembly.components().unwrap().iter().all(|c| c.uuid.is_some()));
    assert!(back.parts[1].resources.object(1).unwrap().uuid.is_some());

    let mesh = back.flatten().unwrap();
    assert_eq!(mesh.vertices().len(), 8);
    assert_eq!(mesh.position(4).unwrap().z, 4.0);
}

#[test]
fn test_round_trip_beam_lattice() {
    let mut mesh = tetrahedron();
    mesh.default_radius = 0.4;
    mesh.cap_mode = BeamCapMode::Butt;
    mesh.add_beam(Beam::new(0, 3, 0.4, BeamCapMode::Butt));
    mesh.add_beam(Beam::with_radii(1, 2, 0.6, 0.3));

    let mut model = Model::new();
    model
        .root_part_mut()
        .resources
        .register(Resource::Object(Object::new_mesh(1, mesh)))
        .unwrap();
    model.build.items.push(BuildItem::new(ResourceId::new(ROOT_PATH, 1)));

    let back = round_trip(&model);
    let mesh = back.root_part().resources.object(1).unwrap().mesh().unwrap();
    assert_eq!(mesh.default_radius, 0.4);
    assert_eq!(mesh.cap_mode, BeamCapMode::Butt);
    assert_eq!(mesh.beams.len(), 2);
    assert_eq!((mesh.beams[0].r1, mesh.beams[0].r2), (0.4, 0.4));
    assert_eq!((mesh.beams[1].r1, mesh.beams[1].r2), (0.6, 0.3));
    assert_eq!(mesh.beams[1].cap1, BeamCapMode::Sphere);
}

#[test]
fn test_round_trip_attachments() {
    let mut model = single_part_model();
    model.thumbnail = Some(Attachment {
        path: "/Metadata/thumbnail.png".to_string(),
        relationship_type: THUMBNAIL_REL_TYPE.to_string(),
        content_type: "image/png".to_string(),
        data: vec![0x89, b'P', b'N', b'G'],
    });
    model.attachments.push(Attachment {
        path: "/3D/Textures/grain.png".to_string(),
        relationship_type: TEXTURE_REL_TYPE.to_string(),
        content_type: "image/png".to_string(),
        data: b"grain".to_vec(),
    });

    let back = round_trip(&model);
    assert_eq!(back.thumbnail.as_ref().unwrap().data, [0x89, b'P', b'N', b'G']);
    assert_eq!(back.attachments.len(), 1);
    assert_eq!(back.attachments[0].path, "/3D/Textures/grain.png");
    assert_eq!(back.attachments[0].data, b"grain");
}

#[test]
fn test_required_extensions_survive() {
    let mut model = single_part_model();
    model.required_extensions.push(Extension::Production);

    let back = round_trip(&model);
    assert_eq!(back.required_extensions, vec![Extension::Production]);
    assert!(back.root_part().resources.object(1).unwrap().uuid.is_some());
}

#[test]
fn test_write_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bracket.3mf");

    let model = single_part_model();
    model.write_to_file(&path).unwrap();

    let file = std::fs::File::open(&path).unwrap();
    let back = Model::from_reader_with_config(file, ParserConfig::lenient()).unwrap();
    assert!(back.warnings.is_empty());
    assert_eq!(back.build.items.len(), 1);
}

#[test]
fn test_decoded_package_writes_back() {
    let original = Model::from_reader(Cursor::new(tetrahedron_package())).unwrap();
    let back = round_trip(&original);
    assert_eq!(
        back.root_part().resources.object(1).unwrap().mesh().unwrap().vertices(),
        original.root_part().resources.object(1).unwrap().mesh().unwrap().vertices()
    );
}
