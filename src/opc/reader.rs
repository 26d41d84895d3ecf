//! Package reading over a ZIP archive

use super::{CONTENT_TYPES_PATH, ContentTypes, PackageReader, RELS_PATH, normalize_part_name};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::sync::Mutex;
use zip::ZipArchive;

/// Upper bound on bytes preallocated from an entry's declared size
const MAX_PREALLOCATED_ENTRY_BYTES: u64 = 1 << 24;

/// A 3MF package backed by a ZIP archive
///
/// Part lookups are by absolute, percent-decoded part name. The archive is
/// guarded by a mutex so parts can be read from parallel decoding tasks; the
/// lock is held only while a single entry is decompressed.
pub struct ZipPackage<R> {
    archive: Mutex<ZipArchive<R>>,
    /// Part name -> entry name inside the archive
    entries: HashMap<String, String>,
    content_types: ContentTypes,
}

impl<R: Read + Seek> ZipPackage<R> {
    /// Open a package and check its OPC structure
    ///
    /// Fails when `[Content_Types].xml` or `_rels/.rels` is absent.
    pub fn open(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let entries: HashMap<String, String> = archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(|name| (normalize_part_name(name), name.to_string()))
            .collect();

        for required in [CONTENT_TYPES_PATH, RELS_PATH] {
            if !entries.contains_key(required) {
                return Err(Error::invalid_format_context(
                    "OPC package structure",
                    &format!(
                        "Missing required file '{}'. \
                         The 3MF file may be corrupt or improperly formatted.",
                        required.trim_start_matches('/')
                    ),
                ));
            }
        }

        let content_types = match entries.get(CONTENT_TYPES_PATH) {
            Some(name) => ContentTypes::parse(&read_entry(&mut archive, name)?)?,
            None => ContentTypes::new(),
        };

        Ok(Self {
            archive: Mutex::new(archive),
            entries,
            content_types,
        })
    }

    /// Number of parts in the package
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the package has no parts
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of all parts, sorted
    pub fn part_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// The package's content type table
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// Give back the underlying reader
    pub fn into_inner(self) -> R {
        self.archive
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .into_inner()
    }
}

impl<R: Read + Seek + Send> PackageReader for ZipPackage<R> {
    fn read_part(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize_part_name(path);
        let name = self
            .entries
            .get(&path)
            .ok_or_else(|| Error::MissingFile(path.clone()))?;
        let mut archive = self
            .archive
            .lock()
            .map_err(|_| Error::InvalidFormat("package archive lock poisoned".to_string()))?;
        read_entry(&mut archive, name)
    }

    fn has_part(&self, path: &str) -> bool {
        self.entries.contains_key(&normalize_part_name(path))
    }

    fn content_type(&self, path: &str) -> Option<String> {
        self.content_types.lookup(path).map(str::to_string)
    }
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut file = archive
        .by_name(name)
        .map_err(|_| Error::MissingFile(name.to_string()))?;
    let mut content = Vec::with_capacity(initial_capacity(file.size()));
    file.read_to_end(&mut content)?;
    Ok(content)
}

/// The declared size comes from the archive header and is not trusted
fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOCATED_ENTRY_BYTES) as usize
}
