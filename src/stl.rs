//! Binary STL import and export
//!
//! STL stores an unindexed triangle soup: an 80-byte header, a little-endian
//! `u32` facet count, then per facet a normal, three vertices (all `f32`
//! triples) and a 16-bit attribute word. Imported meshes deduplicate
//! coincident corners so shared edges become shared vertex indices.

use crate::error::Result;
use crate::model::{Mesh, Triangle};
use nalgebra::{Point3, Vector3};
use std::io::{Read, Write};

const HEADER_SIZE: usize = 80;
const FACET_SIZE: usize = 50;

/// Upper bound on facets preallocated from an untrusted header
const MAX_PREALLOCATED_FACETS: usize = 1 << 20;

/// Read a binary STL stream into a deduplicating mesh
///
/// A stream that ends before the declared number of facets fails with an
/// I/O error.
pub fn read_binary<R: Read>(mut reader: R) -> Result<Mesh> {
    let mut header = [0u8; HEADER_SIZE + 4];
    reader.read_exact(&mut header)?;
    let count = u32::from_le_bytes([header[80], header[81], header[82], header[83]]) as usize;
    tracing::debug!(facets = count, "reading binary STL");

    let facets = count.min(MAX_PREALLOCATED_FACETS);
    let mut mesh = Mesh::with_dedup();
    mesh.vertices.reserve(facets / 2);
    mesh.triangles.reserve(facets);

    let mut facet = [0u8; FACET_SIZE];
    for _ in 0..count {
        reader.read_exact(&mut facet)?;
        let mut corners = [0u32; 3];
        for (i, corner) in corners.iter_mut().enumerate() {
            // Skip the 12-byte normal
            let offset = 12 + i * 12;
            *corner = mesh.add_vertex(Point3::new(
                read_f32(&facet, offset) as f64,
                read_f32(&facet, offset + 4) as f64,
                read_f32(&facet, offset + 8) as f64,
            ))?;
        }
        mesh.add_triangle(Triangle::new(corners[0], corners[1], corners[2]));
    }

    Ok(mesh)
}

/// Write the triangles of a mesh as binary STL
///
/// Positions are narrowed to `f32` and facet normals are recomputed from
/// the winding order. Beams are not representable and are left out.
pub fn write_binary<W: Write>(mesh: &Mesh, mut writer: W) -> Result<()> {
    let count = u32::try_from(mesh.triangles.len()).unwrap_or(u32::MAX);
    let mut header = [0u8; HEADER_SIZE + 4];
    header[HEADER_SIZE..].copy_from_slice(&count.to_le_bytes());
    writer.write_all(&header)?;

    for triangle in mesh.triangles.iter().take(count as usize) {
        let [a, b, c] = triangle.indices().map(|i| {
            mesh.position(i)
                .copied()
                .unwrap_or_else(Point3::origin)
        });
        let normal = facet_normal(&a, &b, &c);

        let mut facet = [0u8; FACET_SIZE];
        let values = [
            normal.x, normal.y, normal.z, a.x, a.y, a.z, b.x, b.y, b.z, c.x, c.y, c.z,
        ];
        for (i, value) in values.iter().enumerate() {
            facet[i * 4..i * 4 + 4].copy_from_slice(&(*value as f32).to_le_bytes());
        }
        writer.write_all(&facet)?;
    }

    Ok(())
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Unit normal of a counter-clockwise triangle, zero when degenerate
fn facet_normal(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Vector3<f64> {
    (b - a)
        .cross(&(c - a))
        .try_normalize(f64::EPSILON)
        .unwrap_or_else(Vector3::zeros)
}
