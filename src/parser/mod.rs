//! Decoding of 3MF packages
//!
//! The root model part is decoded on the calling thread first. Secondary
//! model parts, found through the root part's relationships, are then decoded
//! in parallel, each into its own resource registry, and merged into the
//! model in the order they were discovered. Root-part references into
//! secondary parts are checked after the merge, and finally every build item
//! is validated.
//!
//! Cancellation is cooperative: decoders poll a [`CancellationToken`] while
//! they read. The secondary batch shares one token derived from the caller's,
//! so the first failing part stops its siblings.

mod beam_lattice;
mod cancel;
mod context;
mod core;
mod decoder;
mod production;

pub use cancel::CancellationToken;

use crate::error::{Error, Result, Warning, WarningKind};
use crate::model::{Attachment, DEFAULT_MODEL_PATH, Extension, Model, ParserConfig};
use crate::opc::{
    self, MODEL_REL_TYPE, PackageReader, Relationship, TEXTURE_REL_TYPE, THUMBNAIL_REL_TYPE,
    ZipPackage,
};
use context::{DecodeContext, DecodedPart};
use rayon::prelude::*;
use std::io::{Read, Seek};

pub(crate) const NS_CORE: &str = Extension::Core.namespace();
pub(crate) const NS_PRODUCTION: &str = Extension::Production.namespace();
pub(crate) const NS_SLICE: &str = Extension::Slice.namespace();
pub(crate) const NS_BEAM_LATTICE: &str = Extension::BeamLattice.namespace();

/// Content type recorded for attachments the package does not describe
const DEFAULT_ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";

/// Parse a 3MF file from a reader
pub fn parse_3mf<R: Read + Seek + Send>(reader: R) -> Result<Model> {
    parse_3mf_with_config(reader, ParserConfig::default())
}

/// Parse a 3MF file from a reader with custom configuration
pub fn parse_3mf_with_config<R: Read + Seek + Send>(reader: R, config: ParserConfig) -> Result<Model> {
    let package = ZipPackage::open(reader)?;
    decode_package(&package, &config)
}

/// Read thumbnail binary data from a 3MF file
///
/// The root model part's thumbnail takes precedence over the package
/// thumbnail. Returns `None` when the package has neither.
pub fn read_thumbnail<R: Read + Seek + Send>(reader: R) -> Result<Option<Vec<u8>>> {
    let package = ZipPackage::open(reader)?;
    let root = find_root(&package)?;
    let root_rels = package.relationships(Some(&root))?;
    Ok(find_thumbnail(&package, &root_rels)?.map(|a| a.data))
}

/// Decode a package through any [`PackageReader`]
pub fn decode_package<P: PackageReader + ?Sized>(package: &P, config: &ParserConfig) -> Result<Model> {
    let discovery = discover(package, config)?;
    tracing::debug!(
        root = %discovery.root,
        secondary = discovery.secondary.len(),
        attachments = discovery.attachments.len(),
        "discovered model parts"
    );

    let external = config.cancellation().cloned();
    let root_xml = package.read_part(&discovery.root)?;
    let root = decode_part(&root_xml, &discovery.root, true, config, external.clone())?;
    if external.as_ref().is_some_and(CancellationToken::is_cancelled) {
        return Err(Error::Cancelled);
    }

    let secondary = decode_secondary_parts(package, &discovery.secondary, config, external.as_ref())?;

    let mut model = merge(root, secondary, discovery);
    production::resolve_cross_part_references(&mut model, config)?;
    if config.validates() {
        validate(&mut model, config)?;
    }
    Ok(model)
}

/// Parse a single model document as the root part of a model
///
/// Useful for tests and tools that work on bare model XML; references to
/// other parts cannot be resolved.
pub fn parse_model_xml(xml: &str) -> Result<Model> {
    parse_model_xml_with_config(xml, &ParserConfig::default())
}

/// Parse a single model document with custom configuration
pub fn parse_model_xml_with_config(xml: &str, config: &ParserConfig) -> Result<Model> {
    let root = decode_part(
        xml.as_bytes(),
        DEFAULT_MODEL_PATH,
        true,
        config,
        config.cancellation().cloned(),
    )?;
    let discovery = Discovery {
        root: DEFAULT_MODEL_PATH.to_string(),
        secondary: Vec::new(),
        attachments: Vec::new(),
        thumbnail: None,
    };
    let mut model = merge(root, Vec::new(), discovery);
    production::resolve_cross_part_references(&mut model, config)?;
    if config.validates() {
        validate(&mut model, config)?;
    }
    Ok(model)
}

/// Model parts and attachments reachable from the package relationships
struct Discovery {
    root: String,
    /// Secondary model parts in relationship order
    secondary: Vec<String>,
    attachments: Vec<Attachment>,
    thumbnail: Option<Attachment>,
}

fn find_root<P: PackageReader + ?Sized>(package: &P) -> Result<String> {
    opc::find_part_by_relationship(package, None, MODEL_REL_TYPE)?.ok_or_else(|| {
        Error::invalid_format_context(
            "OPC package structure",
            "No 3D model relationship found in the package relationships",
        )
    })
}

fn discover<P: PackageReader + ?Sized>(package: &P, config: &ParserConfig) -> Result<Discovery> {
    let root = find_root(package)?;
    let root_rels = package.relationships(Some(&root))?;

    let mut secondary: Vec<String> = Vec::new();
    for rel in root_rels.iter().filter(|r| r.relationship_type == MODEL_REL_TYPE) {
        if rel.target == root || secondary.contains(&rel.target) {
            continue;
        }
        if !package.has_part(&rel.target) {
            tracing::warn!(target = %rel.target, "model relationship points to a missing part");
            continue;
        }
        secondary.push(rel.target.clone());
    }

    let mut attachments = Vec::new();
    collect_attachments(package, &root_rels, config, &mut attachments)?;
    for path in &secondary {
        let rels = package.relationships(Some(path))?;
        collect_attachments(package, &rels, config, &mut attachments)?;
    }

    let thumbnail = find_thumbnail(package, &root_rels)?;

    Ok(Discovery {
        root,
        secondary,
        attachments,
        thumbnail,
    })
}

fn read_attachment<P: PackageReader + ?Sized>(package: &P, rel: &Relationship) -> Result<Attachment> {
    Ok(Attachment {
        path: rel.target.clone(),
        relationship_type: rel.relationship_type.clone(),
        content_type: package
            .content_type(&rel.target)
            .unwrap_or_else(|| DEFAULT_ATTACHMENT_CONTENT_TYPE.to_string()),
        data: package.read_part(&rel.target)?,
    })
}

/// Copy textures, thumbnails and configured custom relationship targets
fn collect_attachments<P: PackageReader + ?Sized>(
    package: &P,
    rels: &[Relationship],
    config: &ParserConfig,
    attachments: &mut Vec<Attachment>,
) -> Result<()> {
    for rel in rels {
        let wanted = rel.relationship_type == TEXTURE_REL_TYPE
            || rel.relationship_type == THUMBNAIL_REL_TYPE
            || config
                .attachment_relationships()
                .iter()
                .any(|t| *t == rel.relationship_type);
        if !wanted || attachments.iter().any(|a| a.path == rel.target) {
            continue;
        }
        if !package.has_part(&rel.target) {
            tracing::warn!(target = %rel.target, "attachment relationship points to a missing part");
            continue;
        }
        attachments.push(read_attachment(package, rel)?);
    }
    Ok(())
}

/// The root part's thumbnail, falling back to the package thumbnail
fn find_thumbnail<P: PackageReader + ?Sized>(
    package: &P,
    root_rels: &[Relationship],
) -> Result<Option<Attachment>> {
    let package_rels = package.relationships(None)?;
    let rel = root_rels
        .iter()
        .chain(package_rels.iter())
        .find(|r| r.relationship_type == THUMBNAIL_REL_TYPE && package.has_part(&r.target));
    rel.map(|rel| read_attachment(package, rel)).transpose()
}

/// Decode one model part
fn decode_part(
    xml: &[u8],
    path: &str,
    is_root: bool,
    config: &ParserConfig,
    cancellation: Option<CancellationToken>,
) -> Result<DecodedPart> {
    tracing::debug!(part = path, is_root, bytes = xml.len(), "decoding model part");
    let mut ctx = DecodeContext::new(path, is_root, config, cancellation);
    decoder::run(xml, Box::new(core::TopLevelDecoder), &mut ctx)?;
    if !ctx.model_seen {
        return Err(Error::invalid_format_context(
            path,
            "Part does not contain a <model> element in the 3MF core namespace",
        ));
    }
    let part = ctx.finish();
    tracing::debug!(
        part = path,
        resources = part.part.resources.len(),
        warnings = part.warnings.len(),
        "decoded model part"
    );
    Ok(part)
}

/// Decode secondary parts in parallel, results in discovery order
///
/// The first failing part cancels the rest of the batch. The error reported
/// is the first one in discovery order that is not a cancellation.
fn decode_secondary_parts<P: PackageReader + ?Sized>(
    package: &P,
    paths: &[String],
    config: &ParserConfig,
    external: Option<&CancellationToken>,
) -> Result<Vec<DecodedPart>> {
    let batch = external.map(CancellationToken::child).unwrap_or_default();

    let results: Vec<Result<DecodedPart>> = paths
        .par_iter()
        .map(|path| {
            let result = package
                .read_part(path)
                .and_then(|xml| decode_part(&xml, path, false, config, Some(batch.clone())));
            if result.is_err() {
                batch.cancel();
            }
            result
        })
        .collect();

    let mut parts = Vec::with_capacity(results.len());
    let mut cancelled = false;
    let mut first_error = None;
    for result in results {
        match result {
            Ok(part) => parts.push(part),
            Err(err) if err.is_cancelled() => cancelled = true,
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None if cancelled => Err(Error::Cancelled),
        None => Ok(parts),
    }
}

/// Assemble the model: root part first, then secondary parts in order
fn merge(root: DecodedPart, secondary: Vec<DecodedPart>, discovery: Discovery) -> Model {
    let mut model = Model::with_root_path(root.part.path.clone());

    if let Some(unit) = root.unit {
        model.unit = unit;
    }
    model.language = root.language;
    model.required_extensions = root.required_extensions;
    model.required_custom_extensions = root.required_custom_extensions;
    model.metadata = root.part.metadata.clone();
    model.build = root.build.unwrap_or_default();
    model.warnings = root.warnings;
    model.parts = vec![root.part];

    for part in secondary {
        model.production_attachments.push(part.part.path.clone());
        model.warnings.extend(part.warnings);
        model.parts.push(part.part);
    }

    model.attachments = discovery.attachments;
    model.thumbnail = discovery.thumbnail;
    tracing::debug!(
        parts = model.parts.len(),
        items = model.build.items.len(),
        warnings = model.warnings.len(),
        "merged model"
    );
    model
}

/// Validate every build item
///
/// Invalid objects fail strict decoding and become warnings otherwise.
/// Errors that prevent walking an assembly are always fatal.
fn validate(model: &mut Model, config: &ParserConfig) -> Result<()> {
    let mut warnings = Vec::new();
    for item in &model.build.items {
        match model.validate_item(item) {
            Ok(()) => {}
            Err(err @ (Error::NotManifold { .. } | Error::NotValidForSlices { .. })) => {
                if config.is_strict() {
                    return Err(err);
                }
                let kind = WarningKind::InvalidObject(err.to_string());
                tracing::warn!(part = %model.path(), element = "item", "{}", kind);
                warnings.push(Warning::new(model.path(), "item", kind));
            }
            Err(err) => return Err(err),
        }
    }
    model.warnings.extend(warnings);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryPackage {
        parts: HashMap<String, Vec<u8>>,
    }

    impl MemoryPackage {
        fn with(mut self, path: &str, content: &str) -> Self {
            self.parts.insert(path.to_string(), content.as_bytes().to_vec());
            self
        }
    }

    impl PackageReader for MemoryPackage {
        fn read_part(&self, path: &str) -> Result<Vec<u8>> {
            self.parts
                .get(path)
                .cloned()
                .ok_or_else(|| Error::MissingFile(path.to_string()))
        }

        fn has_part(&self, path: &str) -> bool {
            self.parts.contains_key(path)
        }
    }

    fn rels(entries: &[(&str, &str)]) -> String {
        let mut xml = String::from(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (i, (target, rel_type)) in entries.iter().enumerate() {
            xml.push_str(&format!(
                r#"<Relationship Id="r{}" Target="{}" Type="{}"/>"#,
                i, target, rel_type
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }

    const EMPTY_MODEL: &str = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"><resources/><build/></model>"#;

    #[test]
    fn test_discovery_order_and_attachments() {
        let package = MemoryPackage::default()
            .with("/_rels/.rels", &rels(&[("/3D/3dmodel.model", MODEL_REL_TYPE)]))
            .with(
                "/3D/_rels/3dmodel.model.rels",
                &rels(&[
                    ("/3D/b.model", MODEL_REL_TYPE),
                    ("/3D/a.model", MODEL_REL_TYPE),
                    ("/3D/missing.model", MODEL_REL_TYPE),
                    ("/3D/Textures/t.png", TEXTURE_REL_TYPE),
                    ("/Custom/data.bin", "urn:example:custom"),
                    ("/Metadata/thumb.png", THUMBNAIL_REL_TYPE),
                ]),
            )
            .with("/3D/3dmodel.model", EMPTY_MODEL)
            .with("/3D/a.model", EMPTY_MODEL)
            .with("/3D/b.model", EMPTY_MODEL)
            .with("/3D/Textures/t.png", "png")
            .with("/Custom/data.bin", "bin")
            .with("/Metadata/thumb.png", "thumb");

        let config = ParserConfig::new().with_attachment_relationship("urn:example:custom");
        let model = decode_package(&package, &config).unwrap();

        assert_eq!(model.path(), "/3D/3dmodel.model");
        assert_eq!(model.production_attachments, vec!["/3D/b.model", "/3D/a.model"]);
        let paths: Vec<_> = model.parts.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["/3D/3dmodel.model", "/3D/b.model", "/3D/a.model"]);
        assert!(model.parts[0].is_root);
        assert!(!model.parts[1].is_root);

        let attachment_paths: Vec<_> = model.attachments.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(
            attachment_paths,
            vec!["/3D/Textures/t.png", "/Custom/data.bin", "/Metadata/thumb.png"]
        );
        assert_eq!(model.attachments[1].content_type, DEFAULT_ATTACHMENT_CONTENT_TYPE);
        assert_eq!(model.thumbnail.as_ref().unwrap().data, b"thumb");
    }

    #[test]
    fn test_missing_root_relationship() {
        let package = MemoryPackage::default().with("/_rels/.rels", &rels(&[]));
        let err = decode_package(&package, &ParserConfig::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_part_without_model_element() {
        let package = MemoryPackage::default()
            .with("/_rels/.rels", &rels(&[("/3D/3dmodel.model", MODEL_REL_TYPE)]))
            .with(
                "/3D/3dmodel.model",
                r#"<notamodel xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"/>"#,
            );
        let err = decode_package(&package, &ParserConfig::new()).unwrap_err();
        assert!(err.to_string().contains("/3D/3dmodel.model"));
    }

    #[test]
    fn test_secondary_error_is_reported_in_discovery_order() {
        let package = MemoryPackage::default()
            .with("/_rels/.rels", &rels(&[("/3D/3dmodel.model", MODEL_REL_TYPE)]))
            .with(
                "/3D/_rels/3dmodel.model.rels",
                &rels(&[
                    ("/3D/a.model", MODEL_REL_TYPE),
                    ("/3D/b.model", MODEL_REL_TYPE),
                ]),
            )
            .with("/3D/3dmodel.model", EMPTY_MODEL)
            .with(
                "/3D/a.model",
                r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"><resources><object id="0"/></resources></model>"#,
            )
            .with(
                "/3D/b.model",
                r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"><resources><object/></resources></model>"#,
            );

        let err = decode_package(&package, &ParserConfig::new()).unwrap_err();
        match &err {
            Error::InPart { part, .. } => assert_eq!(part, "/3D/a.model"),
            other => panic!("expected part context, got {other:?}"),
        }
        assert!(matches!(err.innermost(), Error::InvalidResourceId { id: 0, .. }));
    }

    #[test]
    fn test_external_cancellation_before_decode() {
        let package = MemoryPackage::default()
            .with("/_rels/.rels", &rels(&[("/3D/3dmodel.model", MODEL_REL_TYPE)]))
            .with("/3D/3dmodel.model", EMPTY_MODEL);
        let token = CancellationToken::new();
        token.cancel();
        let config = ParserConfig::new().with_cancellation(token);
        assert!(matches!(
            decode_package(&package, &config),
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn test_parse_model_xml_validates_build() {
        let xml = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
            <resources><object id="1"><mesh><vertices/><triangles/></mesh></object></resources>
            <build><item objectid="1"/></build>
        </model>"#;

        let err = parse_model_xml(xml).unwrap_err();
        assert!(matches!(err, Error::NotManifold { id: 1, .. }));

        let model = parse_model_xml_with_config(xml, &ParserConfig::lenient()).unwrap();
        assert_eq!(model.warnings.len(), 1);
        assert!(matches!(model.warnings[0].kind, WarningKind::InvalidObject(_)));

        let model =
            parse_model_xml_with_config(xml, &ParserConfig::new().with_validation(false)).unwrap();
        assert!(model.warnings.is_empty());
    }
}
