//! Production extension: UUIDs and references across model parts
//!
//! Components and build items of the root part may name objects declared in
//! other model parts through `p:path`. Those parts are decoded concurrently,
//! so such references cannot be checked while the root part is read. They
//! are kept as decoded and checked by [`resolve_cross_part_references`] once
//! every part has been merged into the model.

use super::NS_PRODUCTION;
use super::context::{DecodeContext, unresolved_kind};
use super::decoder::{Attribute, attr};
use crate::error::{Error, Result, Warning};
use crate::model::{Model, ObjectKind, ParserConfig};
use crate::registry::ObjectResolver;

/// Production attributes of one element
pub(super) struct ProductionAttributes {
    pub uuid: Option<String>,
    pub path: Option<String>,
}

/// Read and check `p:UUID` and `p:path`
pub(super) fn production_attributes(
    ctx: &mut DecodeContext,
    element: &str,
    attrs: &[Attribute],
) -> Result<ProductionAttributes> {
    let uuid = ctx.production_uuid(element, attr(attrs, NS_PRODUCTION, "UUID"))?;
    let path = attr(attrs, NS_PRODUCTION, "path")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);
    Ok(ProductionAttributes { uuid, path })
}

/// Check every root-part reference into another part against the merged model
///
/// Strict decoding fails on the first reference that does not name an
/// object. Lenient decoding drops the offending component or build item and
/// records a warning on the model.
pub(crate) fn resolve_cross_part_references(model: &mut Model, config: &ParserConfig) -> Result<()> {
    let root = model.path().to_string();
    let mut warnings = Vec::new();
    let mut dropped_components = Vec::new();
    let mut dropped_items = Vec::new();

    let check = |element: &str, err: Error, warnings: &mut Vec<Warning>| -> Result<()> {
        let kind = unresolved_kind(err).map_err(|e| e.in_part(&root, element))?;
        if config.is_strict() {
            return Err(Error::from(kind).in_part(&root, element));
        }
        tracing::warn!(part = %root, element, "{}", kind);
        warnings.push(Warning::new(root.clone(), element, kind));
        Ok(())
    };

    for object in model.root_part().resources.objects() {
        let Some(components) = object.components() else {
            continue;
        };
        for (index, component) in components.iter().enumerate() {
            if component.object.path == root {
                continue;
            }
            if let Err(err) = model.resolve_object(&component.object) {
                check("component", err, &mut warnings)?;
                dropped_components.push((object.id, index));
            }
        }
    }

    for (index, item) in model.build.items.iter().enumerate() {
        if item.object.path == root {
            continue;
        }
        if let Err(err) = model.resolve_object(&item.object) {
            check("item", err, &mut warnings)?;
            dropped_items.push(index);
        }
    }

    let registry = &mut model.root_part_mut().resources;
    for (id, index) in dropped_components.into_iter().rev() {
        if let Some(object) = registry.object_mut(id)
            && let ObjectKind::Components(c) = &mut object.kind
        {
            c.components.remove(index);
        }
    }
    for index in dropped_items.into_iter().rev() {
        model.build.items.remove(index);
    }

    model.warnings.extend(warnings);
    Ok(())
}
