//! Beam lattice extension writing

use super::emit;
use crate::error::Result;
use crate::model::*;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use std::io::Write as IoWrite;

/// Write the beam lattice of a mesh
///
/// Radii and caps equal to the lattice defaults are left out.
pub(super) fn write_beam_lattice<W: IoWrite>(
    writer: &mut Writer<W>,
    mesh: &Mesh,
    attributes: &BeamLatticeAttributes,
) -> Result<()> {
    let mut elem = BytesStart::new("b:beamlattice");
    elem.push_attribute(("radius", mesh.default_radius.to_string().as_str()));
    elem.push_attribute(("minlength", mesh.min_length.to_string().as_str()));
    elem.push_attribute(("cap", mesh.cap_mode.to_string().as_str()));

    if attributes.clip_mode != ClipMode::None {
        elem.push_attribute(("clippingmode", attributes.clip_mode.to_string().as_str()));
    }
    if let Some(clipping) = &attributes.clipping_mesh {
        elem.push_attribute(("clippingmesh", clipping.id.to_string().as_str()));
    }
    if let Some(representation) = &attributes.representation_mesh {
        elem.push_attribute(("representationmesh", representation.id.to_string().as_str()));
    }

    emit(writer, Event::Start(elem), "beamlattice element")?;

    emit(writer, Event::Start(BytesStart::new("b:beams")), "beams element")?;
    for beam in &mesh.beams {
        let mut elem = BytesStart::new("b:beam");
        elem.push_attribute(("v1", beam.v1.to_string().as_str()));
        elem.push_attribute(("v2", beam.v2.to_string().as_str()));

        if beam.r1 != mesh.default_radius || beam.r2 != beam.r1 {
            elem.push_attribute(("r1", beam.r1.to_string().as_str()));
        }
        if beam.r2 != beam.r1 {
            elem.push_attribute(("r2", beam.r2.to_string().as_str()));
        }
        if beam.cap1 != mesh.cap_mode {
            elem.push_attribute(("cap1", beam.cap1.to_string().as_str()));
        }
        if beam.cap2 != mesh.cap_mode {
            elem.push_attribute(("cap2", beam.cap2.to_string().as_str()));
        }

        emit(writer, Event::Empty(elem), "beam")?;
    }
    emit(writer, Event::End(BytesEnd::new("b:beams")), "beams element")?;

    if !mesh.beam_sets.is_empty() {
        emit(writer, Event::Start(BytesStart::new("b:beamsets")), "beamsets element")?;
        for set in &mesh.beam_sets {
            let mut elem = BytesStart::new("b:beamset");
            if let Some(name) = &set.name {
                elem.push_attribute(("name", name.as_str()));
            }
            if let Some(identifier) = &set.identifier {
                elem.push_attribute(("identifier", identifier.as_str()));
            }
            emit(writer, Event::Start(elem), "beamset element")?;
            for index in &set.refs {
                let mut elem = BytesStart::new("b:ref");
                elem.push_attribute(("index", index.to_string().as_str()));
                emit(writer, Event::Empty(elem), "beam reference")?;
            }
            emit(writer, Event::End(BytesEnd::new("b:beamset")), "beamset element")?;
        }
        emit(writer, Event::End(BytesEnd::new("b:beamsets")), "beamsets element")?;
    }

    emit(writer, Event::End(BytesEnd::new("b:beamlattice")), "beamlattice element")
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_defaults_are_left_out() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0)).unwrap();
        mesh.add_vertex(Point3::new(0.0, 0.0, 5.0)).unwrap();
        mesh.default_radius = 0.5;
        mesh.add_beam(Beam::new(0, 1, 0.5, BeamCapMode::Sphere));
        mesh.add_beam(Beam::with_radii(1, 0, 0.5, 0.25));
        let mut set = BeamSet::new();
        set.name = Some("struts".to_string());
        set.refs = vec![1];
        mesh.beam_sets.push(set);

        let mut writer = Writer::new(Vec::new());
        write_beam_lattice(&mut writer, &mesh, &BeamLatticeAttributes::default()).unwrap();
        let xml = String::from_utf8(writer.into_inner()).unwrap();

        assert!(xml.contains("<b:beamlattice radius=\"0.5\" minlength=\"0.0001\" cap=\"sphere\">"));
        assert!(xml.contains("<b:beam v1=\"0\" v2=\"1\"/>"));
        assert!(xml.contains("<b:beam v1=\"1\" v2=\"0\" r1=\"0.5\" r2=\"0.25\"/>"));
        assert!(xml.contains("<b:beamset name=\"struts\"><b:ref index=\"1\"/></b:beamset>"));
        assert!(!xml.contains("clippingmode"));
    }
}
