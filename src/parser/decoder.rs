//! Stack-driven element decoding
//!
//! A document is decoded by a stack of [`ElementDecoder`]s, one per open
//! element. When an element starts, the decoder on top of the stack is asked
//! for a child decoder; elements nobody claims are skipped together with
//! their whole subtree, so unknown extensions never cause errors. When an
//! element ends its decoder is closed and the [`Decoded`] value it produced
//! is handed to its parent.

use super::context::DecodeContext;
use crate::error::{Error, Result};
use crate::model::{
    BaseMaterial, Beam, BeamLatticeAttributes, BeamSet, BuildItem, Component, Mesh, MetadataEntry,
    Triangle,
};
use nalgebra::Point3;
use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;

/// Default buffer capacity for XML parsing (4KB)
const XML_BUFFER_CAPACITY: usize = 4096;

/// Namespace bound to the reserved `xml` prefix
pub(crate) const NS_XML: &str = "http://www.w3.org/XML/1998/namespace";

/// A namespace-resolved element or attribute name
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XmlName {
    /// Namespace URI; empty when the name is not in a namespace
    pub namespace: String,
    /// Local part of the name
    pub local: String,
}

impl XmlName {
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace == namespace && self.local == local
    }
}

/// An element attribute with its value unescaped
#[derive(Debug, Clone)]
pub(crate) struct Attribute {
    pub name: XmlName,
    pub value: String,
}

/// Value of an attribute in the given namespace
///
/// Unprefixed attributes are not in any namespace, so core attributes are
/// looked up with an empty namespace.
pub(crate) fn attr<'a>(attrs: &'a [Attribute], namespace: &str, local: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| a.name.is(namespace, local))
        .map(|a| a.value.as_str())
}

/// What a closed element hands to its parent
#[derive(Debug)]
pub(crate) enum Decoded {
    Metadata(MetadataEntry),
    MetadataGroup(Vec<MetadataEntry>),
    Vertex(Point3<f64>),
    Vertices(Vec<Point3<f64>>),
    Triangle(Triangle),
    Triangles(Vec<Triangle>),
    Mesh(Box<Mesh>, BeamLatticeAttributes),
    BeamLattice(Box<BeamLattice>),
    Beam(Beam),
    Beams(Vec<Beam>),
    BeamRef(u32),
    BeamSet(BeamSet),
    BeamSets(Vec<BeamSet>),
    Component(Component),
    Components(Vec<Component>),
    BaseMaterial(BaseMaterial),
    BuildItem(BuildItem),
}

/// Everything a `beamlattice` element contributes to its mesh
#[derive(Debug, Default)]
pub(crate) struct BeamLattice {
    pub radius: f64,
    pub min_length: f64,
    pub cap_mode: crate::model::BeamCapMode,
    pub attributes: BeamLatticeAttributes,
    pub beams: Vec<Beam>,
    pub beam_sets: Vec<BeamSet>,
}

/// One frame of the decoding stack
///
/// Every callback may fail; the first error aborts the whole document.
pub(crate) trait ElementDecoder {
    /// Called once when the element starts, before its attributes
    fn open(&mut self, _ctx: &mut DecodeContext) -> Result<()> {
        Ok(())
    }

    /// Receives the element's attributes, `xmlns` declarations excluded
    fn attributes(&mut self, _ctx: &mut DecodeContext, _attrs: &[Attribute]) -> Result<()> {
        Ok(())
    }

    /// Receives character data directly inside the element
    fn text(&mut self, _ctx: &mut DecodeContext, _text: &str) -> Result<()> {
        Ok(())
    }

    /// Decoder for a child element, or `None` to skip its subtree
    fn child(&mut self, _ctx: &DecodeContext, _name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        None
    }

    /// Receives the product of a closed child
    fn child_done(&mut self, _ctx: &mut DecodeContext, _product: Decoded) -> Result<()> {
        Ok(())
    }

    /// Called when the element ends
    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(None)
    }
}

struct Frame {
    name: String,
    decoder: Box<dyn ElementDecoder>,
}

/// Attach the part path and the innermost open element to an error
fn wrap(err: Error, ctx: &DecodeContext, stack: &[Frame]) -> Error {
    let element = stack.last().map_or("", |f| f.name.as_str());
    err.in_part(&ctx.path, element)
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::InvalidXml(e.to_string()))
}

fn namespace_of(result: &ResolveResult) -> Result<String> {
    Ok(match result {
        ResolveResult::Bound(ns) => utf8(ns.as_ref())?.to_string(),
        ResolveResult::Unbound => String::new(),
        ResolveResult::Unknown(prefix) => format!("unknown:{}", utf8(prefix)?),
    })
}

/// Decode one document with `root` as the bottom of the stack
///
/// Cancellation is polled before the first token and then whenever the
/// reader has consumed another `cancellation_check_bytes` bytes.
pub(crate) fn run(xml: &[u8], root: Box<dyn ElementDecoder>, ctx: &mut DecodeContext) -> Result<()> {
    let mut reader = NsReader::from_reader(xml);
    reader.config_mut().expand_empty_elements = true;

    let mut buf = Vec::with_capacity(XML_BUFFER_CAPACITY);
    let mut skip_buf = Vec::new();
    let mut stack = vec![Frame {
        name: String::new(),
        decoder: root,
    }];

    let interval = ctx.config.cancellation_check_bytes();
    let mut next_check = 0u64;

    loop {
        let position = reader.buffer_position() as u64;
        if position >= next_check {
            ctx.check_cancelled()?;
            next_check = position.saturating_add(interval);
        }

        match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, Event::Start(e))) => {
                let name = XmlName {
                    namespace: namespace_of(&ns).map_err(|err| wrap(err, ctx, &stack))?,
                    local: utf8(e.local_name().as_ref())
                        .map_err(|err| wrap(err, ctx, &stack))?
                        .to_string(),
                };

                let child = match stack.last_mut() {
                    Some(frame) => frame.decoder.child(ctx, &name),
                    None => None,
                };

                match child {
                    Some(mut decoder) => {
                        let mut attrs = Vec::new();
                        for a in e.attributes() {
                            let a = a.map_err(|err| Error::from(err).in_part(&ctx.path, &name.local))?;
                            let key = a.key.as_ref();
                            let value = utf8(&a.value)
                                .and_then(|v| {
                                    quick_xml::escape::unescape(v)
                                        .map(|v| v.into_owned())
                                        .map_err(|err| Error::InvalidXml(err.to_string()))
                                })
                                .map_err(|err| err.in_part(&ctx.path, &name.local))?;

                            if key == b"xmlns" {
                                ctx.declare_namespace("", &value);
                                continue;
                            }
                            if let Some(prefix) = key.strip_prefix(b"xmlns:") {
                                let prefix = utf8(prefix).map_err(|err| err.in_part(&ctx.path, &name.local))?;
                                ctx.declare_namespace(prefix, &value);
                                continue;
                            }

                            let (attr_ns, local) = reader.resolver().resolve_attribute(a.key);
                            attrs.push(Attribute {
                                name: XmlName {
                                    namespace: namespace_of(&attr_ns)
                                        .map_err(|err| err.in_part(&ctx.path, &name.local))?,
                                    local: utf8(local.as_ref())
                                        .map_err(|err| err.in_part(&ctx.path, &name.local))?
                                        .to_string(),
                                },
                                value,
                            });
                        }

                        decoder
                            .open(ctx)
                            .and_then(|()| decoder.attributes(ctx, &attrs))
                            .map_err(|err| err.in_part(&ctx.path, &name.local))?;
                        stack.push(Frame {
                            name: name.local,
                            decoder,
                        });
                    }
                    None => {
                        tracing::trace!(
                            part = %ctx.path,
                            element = %name.local,
                            namespace = %name.namespace,
                            "skipping unrecognized element"
                        );
                        let end = e.to_end().into_owned();
                        skip_buf.clear();
                        reader
                            .read_to_end_into(end.name(), &mut skip_buf)
                            .map_err(|err| Error::from(err).in_part(&ctx.path, &name.local))?;
                    }
                }
            }
            Ok((_, Event::End(_))) => {
                let Some(mut frame) = stack.pop() else {
                    return Err(wrap(
                        Error::InvalidXml("Unbalanced end element".to_string()),
                        ctx,
                        &stack,
                    ));
                };
                let product = frame
                    .decoder
                    .close(ctx)
                    .map_err(|err| err.in_part(&ctx.path, &frame.name))?;

                let Some(parent) = stack.last_mut() else {
                    return Err(Error::InvalidXml("End element without a parent".to_string())
                        .in_part(&ctx.path, &frame.name));
                };
                if let Some(product) = product {
                    parent
                        .decoder
                        .child_done(ctx, product)
                        .map_err(|err| err.in_part(&ctx.path, &parent.name))?;
                }
            }
            Ok((_, Event::Text(t))) => {
                let text = utf8(&t).map_err(|err| wrap(err, ctx, &stack))?.to_string();
                if let Some(frame) = stack.last_mut() {
                    frame.decoder.text(ctx, &text).map_err(|err| wrap(err, ctx, &stack))?;
                }
            }
            Ok((_, Event::CData(t))) => {
                let text = utf8(&t).map_err(|err| wrap(err, ctx, &stack))?.to_string();
                if let Some(frame) = stack.last_mut() {
                    frame.decoder.text(ctx, &text).map_err(|err| wrap(err, ctx, &stack))?;
                }
            }
            Ok((_, Event::GeneralRef(r))) => {
                let text = match r
                    .resolve_char_ref()
                    .map_err(|err| wrap(Error::InvalidXml(err.to_string()), ctx, &stack))?
                {
                    Some(ch) => ch.to_string(),
                    None => {
                        let entity = utf8(&r).map_err(|err| wrap(err, ctx, &stack))?;
                        quick_xml::escape::resolve_predefined_entity(entity)
                            .ok_or_else(|| {
                                wrap(
                                    Error::InvalidXml(format!("Unknown entity '&{};'", entity)),
                                    ctx,
                                    &stack,
                                )
                            })?
                            .to_string()
                    }
                };
                if let Some(frame) = stack.last_mut() {
                    frame.decoder.text(ctx, &text).map_err(|err| wrap(err, ctx, &stack))?;
                }
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(e) => return Err(wrap(Error::from(e), ctx, &stack)),
        }
        buf.clear();
    }

    if stack.len() != 1 {
        return Err(Error::InvalidXml("Unexpected end of document".to_string()).in_part(&ctx.path, ""));
    }
    Ok(())
}
