//! Core 3MF element decoders
//!
//! This module decodes the model document itself: model attributes and
//! metadata, the resources section (objects, meshes, components, base
//! materials) and the build section.

use super::beam_lattice::BeamLatticeDecoder;
use super::context::{DecodeContext, Reference};
use super::decoder::{Attribute, Decoded, ElementDecoder, NS_XML, XmlName, attr};
use super::production::production_attributes;
use super::{NS_BEAM_LATTICE, NS_CORE, NS_SLICE};
use crate::error::{Error, Result, WarningKind};
use crate::model::{
    BaseMaterial, BaseMaterialGroup, BeamLatticeAttributes, Build, BuildItem, Component,
    ComponentsObject, Extension, Mesh, MeshObject, MetadataEntry, Object, ObjectKind, ObjectType,
    PropertyRef, Resource, SliceResolution, Transform, Triangle,
};
use nalgebra::Point3;

type Child = Option<Box<dyn ElementDecoder>>;

fn boxed<D: ElementDecoder + 'static>(decoder: D) -> Child {
    Some(Box::new(decoder))
}

/// Bottom of the stack: accepts the single `model` element
pub(crate) struct TopLevelDecoder;

impl ElementDecoder for TopLevelDecoder {
    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if name.is(NS_CORE, "model") {
            boxed(ModelDecoder)
        } else {
            None
        }
    }
}

struct ModelDecoder;

impl ElementDecoder for ModelDecoder {
    fn open(&mut self, ctx: &mut DecodeContext) -> Result<()> {
        ctx.model_seen = true;
        Ok(())
    }

    fn attributes(&mut self, ctx: &mut DecodeContext, attrs: &[Attribute]) -> Result<()> {
        if let Some(unit) = attr(attrs, "", "unit") {
            ctx.unit = Some(unit.to_string());
        }
        if let Some(lang) = attr(attrs, NS_XML, "lang") {
            ctx.language = Some(lang.to_string());
        }
        if let Some(required) = attr(attrs, "", "requiredextensions") {
            for prefix in required.split_whitespace() {
                let Some(namespace) = ctx.namespace_for_prefix(prefix).map(str::to_string) else {
                    ctx.warn(
                        "model",
                        WarningKind::InvalidOptionalValue {
                            name: "requiredextensions".to_string(),
                            value: prefix.to_string(),
                        },
                    );
                    continue;
                };
                match Extension::from_namespace(&namespace) {
                    Some(ext) => {
                        if !ctx.required_extensions.contains(&ext) {
                            ctx.required_extensions.push(ext);
                        }
                    }
                    None => {
                        tracing::debug!(part = %ctx.path, %namespace, "custom required extension");
                        if !ctx.required_custom_extensions.contains(&namespace) {
                            ctx.required_custom_extensions.push(namespace);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn child(&mut self, ctx: &DecodeContext, name: &XmlName) -> Child {
        if name.namespace != NS_CORE {
            return None;
        }
        match name.local.as_str() {
            "metadata" => boxed(MetadataDecoder::default()),
            "resources" => boxed(ResourcesDecoder),
            // Build items only count in the root part
            "build" if ctx.is_root => boxed(BuildDecoder::default()),
            _ => None,
        }
    }

    fn child_done(&mut self, ctx: &mut DecodeContext, product: Decoded) -> Result<()> {
        if let Decoded::Metadata(entry) = product {
            ctx.metadata.push(entry);
        }
        Ok(())
    }
}

#[derive(Default)]
struct MetadataDecoder {
    entry: Option<MetadataEntry>,
}

fn parse_preserve(ctx: &mut DecodeContext, value: Option<&str>) -> Option<bool> {
    match value?.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        other => {
            ctx.warn(
                "metadata",
                WarningKind::InvalidOptionalValue {
                    name: "preserve".to_string(),
                    value: other.to_string(),
                },
            );
            None
        }
    }
}

impl ElementDecoder for MetadataDecoder {
    fn attributes(&mut self, ctx: &mut DecodeContext, attrs: &[Attribute]) -> Result<()> {
        let Some(name) = ctx.required::<String>("metadata", "name", attr(attrs, "", "name"))? else {
            return Ok(());
        };
        let mut entry = MetadataEntry::new(name, String::new());
        entry.preserve = parse_preserve(ctx, attr(attrs, "", "preserve"));
        entry.metadata_type = attr(attrs, "", "type").map(str::to_string);
        self.entry = Some(entry);
        Ok(())
    }

    fn text(&mut self, _ctx: &mut DecodeContext, text: &str) -> Result<()> {
        if let Some(entry) = &mut self.entry {
            entry.value.push_str(text);
        }
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(self.entry.take().map(|mut entry| {
            entry.value = entry.value.trim().to_string();
            Decoded::Metadata(entry)
        }))
    }
}

#[derive(Default)]
struct MetadataGroupDecoder {
    entries: Vec<MetadataEntry>,
}

impl ElementDecoder for MetadataGroupDecoder {
    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if name.is(NS_CORE, "metadata") {
            boxed(MetadataDecoder::default())
        } else {
            None
        }
    }

    fn child_done(&mut self, _ctx: &mut DecodeContext, product: Decoded) -> Result<()> {
        if let Decoded::Metadata(entry) = product {
            self.entries.push(entry);
        }
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(Some(Decoded::MetadataGroup(std::mem::take(&mut self.entries))))
    }
}

struct ResourcesDecoder;

impl ElementDecoder for ResourcesDecoder {
    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if name.namespace != NS_CORE {
            return None;
        }
        match name.local.as_str() {
            "object" => boxed(ObjectDecoder::default()),
            "basematerials" => boxed(BaseMaterialsDecoder::default()),
            _ => None,
        }
    }
}

#[derive(Default)]
struct BaseMaterialsDecoder {
    group: Option<BaseMaterialGroup>,
}

impl ElementDecoder for BaseMaterialsDecoder {
    fn attributes(&mut self, ctx: &mut DecodeContext, attrs: &[Attribute]) -> Result<()> {
        self.group = ctx
            .required::<u32>("basematerials", "id", attr(attrs, "", "id"))?
            .map(BaseMaterialGroup::new);
        Ok(())
    }

    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if self.group.is_some() && name.is(NS_CORE, "base") {
            boxed(BaseDecoder::default())
        } else {
            None
        }
    }

    fn child_done(&mut self, _ctx: &mut DecodeContext, product: Decoded) -> Result<()> {
        if let (Some(group), Decoded::BaseMaterial(material)) = (&mut self.group, product) {
            group.materials.push(material);
        }
        Ok(())
    }

    fn close(&mut self, ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        if let Some(group) = self.group.take() {
            ctx.registry.register(Resource::BaseMaterials(group))?;
        }
        Ok(None)
    }
}

/// `#RRGGBB` or `#RRGGBBAA`
fn is_valid_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| (hex.len() == 6 || hex.len() == 8) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[derive(Default)]
struct BaseDecoder {
    material: Option<BaseMaterial>,
}

impl ElementDecoder for BaseDecoder {
    fn attributes(&mut self, ctx: &mut DecodeContext, attrs: &[Attribute]) -> Result<()> {
        let name = ctx.required::<String>("base", "name", attr(attrs, "", "name"))?;
        let color = ctx.required::<String>("base", "displaycolor", attr(attrs, "", "displaycolor"))?;
        let (Some(name), Some(display_color)) = (name, color) else {
            return Ok(());
        };
        if !is_valid_color(&display_color) {
            return Err(Error::invalid_required("base", "displaycolor", &display_color));
        }
        self.material = Some(BaseMaterial {
            name,
            display_color,
        });
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(self.material.take().map(Decoded::BaseMaterial))
    }
}

#[derive(Default)]
struct ObjectDecoder {
    object: Option<Object>,
    kind: Option<ObjectKind>,
}

impl ObjectDecoder {
    fn set_kind(&mut self, kind: ObjectKind) -> Result<()> {
        if self.kind.is_some() {
            return Err(Error::invalid_xml_element(
                "object",
                "an object holds either a mesh or components, not both",
            ));
        }
        self.kind = Some(kind);
        Ok(())
    }
}

impl ElementDecoder for ObjectDecoder {
    fn attributes(&mut self, ctx: &mut DecodeContext, attrs: &[Attribute]) -> Result<()> {
        let Some(id) = ctx.required::<u32>("object", "id", attr(attrs, "", "id"))? else {
            return Ok(());
        };

        let mut object = Object::with_kind(id, ObjectKind::Mesh(MeshObject::default()));
        object.name = attr(attrs, "", "name").map(str::to_string);
        object.part_number = attr(attrs, "", "partnumber").map(str::to_string);
        object.thumbnail = attr(attrs, "", "thumbnail").map(str::to_string);
        if let Some(object_type) = ctx.optional::<ObjectType>("object", "type", attr(attrs, "", "type")) {
            object.object_type = object_type;
        }

        let pid = ctx.number::<u32>("object", "pid", attr(attrs, "", "pid"))?;
        let pindex = ctx
            .number::<u32>("object", "pindex", attr(attrs, "", "pindex"))?
            .unwrap_or(0);
        object.default_property = pid.map(|pid| PropertyRef { pid, pindex });

        object.uuid = production_attributes(ctx, "object", attrs)?.uuid;

        if let Some(stack) = attr(attrs, NS_SLICE, "slicestackid") {
            object.slice_stack_id = ctx.required::<u32>("object", "slicestackid", Some(stack))?;
        }
        if let Some(resolution) =
            ctx.optional::<SliceResolution>("object", "meshresolution", attr(attrs, NS_SLICE, "meshresolution"))
        {
            object.slice_resolution = resolution;
        }

        self.object = Some(object);
        Ok(())
    }

    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if self.object.is_none() || name.namespace != NS_CORE {
            return None;
        }
        match name.local.as_str() {
            "mesh" => boxed(MeshDecoder::default()),
            "components" => boxed(ComponentsDecoder::default()),
            "metadatagroup" => boxed(MetadataGroupDecoder::default()),
            _ => None,
        }
    }

    fn child_done(&mut self, ctx: &mut DecodeContext, product: Decoded) -> Result<()> {
        match product {
            Decoded::Mesh(mesh, beam_lattice) => self.set_kind(ObjectKind::Mesh(MeshObject {
                mesh: Some(*mesh),
                beam_lattice,
            })),
            Decoded::Components(components) => {
                if let Some(object) = &mut self.object
                    && object.default_property.is_some()
                {
                    ctx.recover(
                        "object",
                        WarningKind::Unsupported(
                            "default property is not supported for components objects".to_string(),
                        ),
                    )?;
                    object.default_property = None;
                }
                self.set_kind(ObjectKind::Components(ComponentsObject { components }))
            }
            Decoded::MetadataGroup(entries) => {
                if let Some(object) = &mut self.object {
                    object.metadata.extend(entries);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn close(&mut self, ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        let Some(mut object) = self.object.take() else {
            return Ok(None);
        };
        if let Some(kind) = self.kind.take() {
            object.kind = kind;
        }
        ctx.registry.register(Resource::Object(object))?;
        Ok(None)
    }
}

#[derive(Default)]
struct MeshDecoder {
    mesh: Mesh,
    beam_lattice: BeamLatticeAttributes,
}

impl MeshDecoder {
    fn add_triangles(&mut self, triangles: Vec<Triangle>) -> Result<()> {
        let count = self.mesh.vertex_count();
        self.mesh.triangles.reserve(triangles.len());
        for triangle in triangles {
            for (name, index) in [("v1", triangle.v1), ("v2", triangle.v2), ("v3", triangle.v3)] {
                if index >= count {
                    return Err(Error::invalid_required("triangle", name, &index.to_string()));
                }
            }
            if triangle.v1 == triangle.v2 || triangle.v2 == triangle.v3 || triangle.v1 == triangle.v3 {
                return Err(Error::invalid_required(
                    "triangle",
                    "v1",
                    &format!("{} {} {}", triangle.v1, triangle.v2, triangle.v3),
                ));
            }
            self.mesh.add_triangle(triangle);
        }
        Ok(())
    }

    fn add_beam_lattice(&mut self, lattice: super::decoder::BeamLattice) -> Result<()> {
        let count = self.mesh.vertex_count();
        for beam in &lattice.beams {
            for (name, index) in [("v1", beam.v1), ("v2", beam.v2)] {
                if index >= count {
                    return Err(Error::invalid_required("beam", name, &index.to_string()));
                }
            }
        }

        self.mesh.default_radius = lattice.radius;
        self.mesh.min_length = lattice.min_length;
        self.mesh.cap_mode = lattice.cap_mode;
        self.mesh.beams.extend(lattice.beams);
        self.mesh.beam_sets.extend(lattice.beam_sets);
        self.beam_lattice = lattice.attributes;
        Ok(())
    }
}

impl ElementDecoder for MeshDecoder {
    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if name.is(NS_CORE, "vertices") {
            boxed(VerticesDecoder::default())
        } else if name.is(NS_CORE, "triangles") {
            boxed(TrianglesDecoder::default())
        } else if name.is(NS_BEAM_LATTICE, "beamlattice") {
            boxed(BeamLatticeDecoder::default())
        } else {
            None
        }
    }

    fn child_done(&mut self, _ctx: &mut DecodeContext, product: Decoded) -> Result<()> {
        match product {
            Decoded::Vertices(points) => {
                self.mesh.vertices.reserve(points.len());
                for point in points {
                    self.mesh.add_vertex(point)?;
                }
                Ok(())
            }
            Decoded::Triangles(triangles) => self.add_triangles(triangles),
            Decoded::BeamLattice(lattice) => self.add_beam_lattice(*lattice),
            _ => Ok(()),
        }
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(Some(Decoded::Mesh(
            Box::new(std::mem::take(&mut self.mesh)),
            std::mem::take(&mut self.beam_lattice),
        )))
    }
}

#[derive(Default)]
struct VerticesDecoder {
    points: Vec<Point3<f64>>,
}

impl ElementDecoder for VerticesDecoder {
    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if name.is(NS_CORE, "vertex") {
            boxed(VertexDecoder::default())
        } else {
            None
        }
    }

    fn child_done(&mut self, _ctx: &mut DecodeContext, product: Decoded) -> Result<()> {
        if let Decoded::Vertex(point) = product {
            self.points.push(point);
        }
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(Some(Decoded::Vertices(std::mem::take(&mut self.points))))
    }
}

#[derive(Default)]
struct VertexDecoder {
    point: Option<Point3<f64>>,
}

impl ElementDecoder for VertexDecoder {
    fn attributes(&mut self, ctx: &mut DecodeContext, attrs: &[Attribute]) -> Result<()> {
        let x = ctx.required_coordinate("vertex", "x", attr(attrs, "", "x"))?;
        let y = ctx.required_coordinate("vertex", "y", attr(attrs, "", "y"))?;
        let z = ctx.required_coordinate("vertex", "z", attr(attrs, "", "z"))?;
        if let (Some(x), Some(y), Some(z)) = (x, y, z) {
            self.point = Some(Point3::new(x, y, z));
        }
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(self.point.take().map(Decoded::Vertex))
    }
}

#[derive(Default)]
struct TrianglesDecoder {
    triangles: Vec<Triangle>,
}

impl ElementDecoder for TrianglesDecoder {
    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if name.is(NS_CORE, "triangle") {
            boxed(TriangleDecoder::default())
        } else {
            None
        }
    }

    fn child_done(&mut self, _ctx: &mut DecodeContext, product: Decoded) -> Result<()> {
        if let Decoded::Triangle(triangle) = product {
            self.triangles.push(triangle);
        }
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(Some(Decoded::Triangles(std::mem::take(&mut self.triangles))))
    }
}

#[derive(Default)]
struct TriangleDecoder {
    triangle: Option<Triangle>,
}

impl ElementDecoder for TriangleDecoder {
    fn attributes(&mut self, ctx: &mut DecodeContext, attrs: &[Attribute]) -> Result<()> {
        let v1 = ctx.required::<u32>("triangle", "v1", attr(attrs, "", "v1"))?;
        let v2 = ctx.required::<u32>("triangle", "v2", attr(attrs, "", "v2"))?;
        let v3 = ctx.required::<u32>("triangle", "v3", attr(attrs, "", "v3"))?;
        let (Some(v1), Some(v2), Some(v3)) = (v1, v2, v3) else {
            return Ok(());
        };

        let mut triangle = Triangle::new(v1, v2, v3);
        triangle.pid = ctx.number("triangle", "pid", attr(attrs, "", "pid"))?;
        triangle.p1 = ctx.number("triangle", "p1", attr(attrs, "", "p1"))?;
        triangle.p2 = ctx.number("triangle", "p2", attr(attrs, "", "p2"))?;
        triangle.p3 = ctx.number("triangle", "p3", attr(attrs, "", "p3"))?;
        self.triangle = Some(triangle);
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(self.triangle.take().map(Decoded::Triangle))
    }
}

#[derive(Default)]
struct ComponentsDecoder {
    components: Vec<Component>,
}

impl ElementDecoder for ComponentsDecoder {
    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if name.is(NS_CORE, "component") {
            boxed(ComponentDecoder::default())
        } else {
            None
        }
    }

    fn child_done(&mut self, _ctx: &mut DecodeContext, product: Decoded) -> Result<()> {
        if let Decoded::Component(component) = product {
            self.components.push(component);
        }
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(Some(Decoded::Components(std::mem::take(&mut self.components))))
    }
}

#[derive(Default)]
struct ComponentDecoder {
    component: Option<Component>,
}

impl ElementDecoder for ComponentDecoder {
    fn attributes(&mut self, ctx: &mut DecodeContext, attrs: &[Attribute]) -> Result<()> {
        let object_id = ctx.required::<u32>("component", "objectid", attr(attrs, "", "objectid"))?;
        let transform = ctx
            .optional::<Transform>("component", "transform", attr(attrs, "", "transform"))
            .unwrap_or_default();
        let production = production_attributes(ctx, "component", attrs)?;
        let Some(object_id) = object_id else {
            return Ok(());
        };

        let object = match ctx.reference("component", production.path.as_deref(), object_id)? {
            Reference::Local(id) | Reference::Deferred(id) => id,
            Reference::Dropped => return Ok(()),
        };
        self.component = Some(Component {
            object,
            transform,
            uuid: production.uuid,
        });
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(self.component.take().map(Decoded::Component))
    }
}

#[derive(Default)]
struct BuildDecoder {
    build: Build,
}

impl ElementDecoder for BuildDecoder {
    fn attributes(&mut self, ctx: &mut DecodeContext, attrs: &[Attribute]) -> Result<()> {
        self.build.uuid = production_attributes(ctx, "build", attrs)?.uuid;
        Ok(())
    }

    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if name.is(NS_CORE, "item") {
            boxed(ItemDecoder::default())
        } else {
            None
        }
    }

    fn child_done(&mut self, _ctx: &mut DecodeContext, product: Decoded) -> Result<()> {
        if let Decoded::BuildItem(item) = product {
            self.build.items.push(item);
        }
        Ok(())
    }

    fn close(&mut self, ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        ctx.build = Some(std::mem::take(&mut self.build));
        Ok(None)
    }
}

#[derive(Default)]
struct ItemDecoder {
    item: Option<BuildItem>,
}

impl ElementDecoder for ItemDecoder {
    fn attributes(&mut self, ctx: &mut DecodeContext, attrs: &[Attribute]) -> Result<()> {
        let object_id = ctx.required::<u32>("item", "objectid", attr(attrs, "", "objectid"))?;
        let transform = ctx
            .optional::<Transform>("item", "transform", attr(attrs, "", "transform"))
            .unwrap_or_default();
        let production = production_attributes(ctx, "item", attrs)?;
        let Some(object_id) = object_id else {
            return Ok(());
        };

        let object = match ctx.reference("item", production.path.as_deref(), object_id)? {
            Reference::Local(id) | Reference::Deferred(id) => id,
            Reference::Dropped => return Ok(()),
        };
        let mut item = BuildItem::new(object);
        item.transform = transform;
        item.uuid = production.uuid;
        item.part_number = attr(attrs, "", "partnumber").map(str::to_string);
        self.item = Some(item);
        Ok(())
    }

    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if self.item.is_some() && name.is(NS_CORE, "metadatagroup") {
            boxed(MetadataGroupDecoder::default())
        } else {
            None
        }
    }

    fn child_done(&mut self, _ctx: &mut DecodeContext, product: Decoded) -> Result<()> {
        if let (Some(item), Decoded::MetadataGroup(entries)) = (&mut self.item, product) {
            item.metadata.extend(entries);
        }
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(self.item.take().map(Decoded::BuildItem))
    }
}
