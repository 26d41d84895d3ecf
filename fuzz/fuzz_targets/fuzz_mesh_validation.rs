#![no_main]

use libfuzzer_sys::arbitrary::{Arbitrary, Result, Unstructured};
use libfuzzer_sys::fuzz_target;
use lib3mf_stream::{Mesh, Transform, Triangle};
use nalgebra::Point3;

#[derive(Debug)]
struct FuzzMesh {
    vertices: Vec<(f64, f64, f64)>,
    triangles: Vec<(u32, u32, u32)>,
    translation: (f64, f64, f64),
}

impl<'a> Arbitrary<'a> for FuzzMesh {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        let vertex_count = u.int_in_range(0..=100u32)?;
        let mut vertices = Vec::new();
        for _ in 0..vertex_count {
            vertices.push((u.arbitrary()?, u.arbitrary()?, u.arbitrary()?));
        }

        // Indices stay in range so the fuzzer spends its time on topology
        let triangle_count = u.int_in_range(0..=50)?;
        let mut triangles = Vec::new();
        if vertex_count > 0 {
            for _ in 0..triangle_count {
                let v1 = u.int_in_range(0..=(vertex_count - 1))?;
                let v2 = u.int_in_range(0..=(vertex_count - 1))?;
                let v3 = u.int_in_range(0..=(vertex_count - 1))?;
                triangles.push((v1, v2, v3));
            }
        }

        Ok(FuzzMesh {
            vertices,
            triangles,
            translation: (u.arbitrary()?, u.arbitrary()?, u.arbitrary()?),
        })
    }
}

fuzz_target!(|input: FuzzMesh| {
    let mut mesh = Mesh::new();
    for &(x, y, z) in &input.vertices {
        let _ = mesh.add_vertex(Point3::new(x, y, z));
    }
    for &(v1, v2, v3) in &input.triangles {
        mesh.add_triangle(Triangle::new(v1, v2, v3));
    }

    let _ = mesh.is_manifold_and_oriented();

    let (x, y, z) = input.translation;
    let mut dest = Mesh::with_dedup();
    if dest.merge(&mesh, &Transform::translation(x, y, z)).is_ok() {
        assert!(dest.check_sanity());
        let mut stl = Vec::new();
        let _ = lib3mf_stream::stl::write_binary(&dest, &mut stl);
        let _ = lib3mf_stream::stl::read_binary(stl.as_slice());
    }
});
