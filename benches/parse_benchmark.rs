use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lib3mf_stream::{Mesh, Model, Transform};
use std::hint::black_box;
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const CORE_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";
const PRODUCTION_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/production/2015/06";
const MODEL_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";

/// Grid mesh object with `size * size` vertices
fn grid_object(id: u32, size: usize, uuid: Option<String>) -> String {
    let uuid = uuid.map(|u| format!(" p:UUID=\"{}\"", u)).unwrap_or_default();
    let mut xml = format!("<object id=\"{}\" type=\"surface\"{}><mesh><vertices>\n", id, uuid);
    for i in 0..size * size {
        xml.push_str(&format!(
            "<vertex x=\"{}\" y=\"{}\" z=\"0\"/>\n",
            i % size,
            i / size
        ));
    }
    xml.push_str("</vertices><triangles>\n");
    for row in 0..size - 1 {
        for col in 0..size - 1 {
            let a = row * size + col;
            xml.push_str(&format!(
                "<triangle v1=\"{}\" v2=\"{}\" v3=\"{}\"/>\n<triangle v1=\"{}\" v2=\"{}\" v3=\"{}\"/>\n",
                a,
                a + 1,
                a + size,
                a + 1,
                a + size + 1,
                a + size
            ));
        }
    }
    xml.push_str("</triangles></mesh></object>");
    xml
}

fn uuid(n: usize) -> String {
    format!("00000000-0000-4000-8000-{:012}", n)
}

/// Package with one grid per secondary part, each placed by the root part
fn generate_3mf(parts: usize, size: usize) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let content_types = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#;
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(content_types.as_bytes()).unwrap();

    let rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rel0" Target="/3D/3dmodel.model" Type="{}"/>
</Relationships>"#,
        MODEL_REL_TYPE
    );
    zip.start_file("_rels/.rels", options).unwrap();
    zip.write_all(rels.as_bytes()).unwrap();

    let mut root_rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );
    let mut items = String::new();
    for i in 0..parts {
        let path = format!("/3D/grid{}.model", i);
        root_rels.push_str(&format!(
            "    <Relationship Id=\"rel{}\" Target=\"{}\" Type=\"{}\"/>\n",
            i, path, MODEL_REL_TYPE
        ));
        items.push_str(&format!(
            "<item objectid=\"1\" p:path=\"{}\" p:UUID=\"{}\" transform=\"1 0 0 0 1 0 0 0 1 0 0 {}\"/>\n",
            path,
            uuid(i),
            i
        ));

        let part = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xmlns="{}" xmlns:p="{}"><resources>{}</resources></model>"#,
            CORE_NS,
            PRODUCTION_NS,
            grid_object(1, size, Some(uuid(1000 + i)))
        );
        zip.start_file(path.trim_start_matches('/'), options).unwrap();
        zip.write_all(part.as_bytes()).unwrap();
    }
    root_rels.push_str("</Relationships>");
    zip.start_file("3D/_rels/3dmodel.model.rels", options).unwrap();
    zip.write_all(root_rels.as_bytes()).unwrap();

    let root = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xmlns="{}" xmlns:p="{}"><resources/><build p:UUID="{}">
{}</build></model>"#,
        CORE_NS,
        PRODUCTION_NS,
        uuid(9999),
        items
    );
    zip.start_file("3D/3dmodel.model", options).unwrap();
    zip.write_all(root.as_bytes()).unwrap();

    zip.finish().unwrap().into_inner()
}

fn bench_parse_single_part(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_single_part");

    for &size in &[10, 50, 100] {
        let data = generate_3mf(1, size);
        group.bench_with_input(
            BenchmarkId::new("grid", format!("{}x{}", size, size)),
            &data,
            |b, data| {
                b.iter(|| black_box(Model::from_reader(Cursor::new(data.as_slice())).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_parse_multi_part(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_multi_part");
    group.sample_size(20);

    for &parts in &[2, 8, 32] {
        let data = generate_3mf(parts, 50);
        group.bench_with_input(BenchmarkId::new("parts", parts), &data, |b, data| {
            b.iter(|| black_box(Model::from_reader(Cursor::new(data.as_slice())).unwrap()));
        });
    }

    group.finish();
}

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");

    let model = Model::from_reader(Cursor::new(generate_3mf(8, 50))).unwrap();
    group.bench_function("dedup_8_parts", |b| {
        b.iter(|| black_box(model.flatten().unwrap()));
    });

    let source = model.flatten().unwrap();
    group.bench_function("merge_without_dedup", |b| {
        b.iter(|| {
            let mut dest = Mesh::new();
            dest.merge(&source, &Transform::translation(1.0, 2.0, 3.0)).unwrap();
            black_box(dest)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_parse_single_part, bench_parse_multi_part, bench_flatten);
criterion_main!(benches);
