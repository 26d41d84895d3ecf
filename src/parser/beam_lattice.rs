//! Beam lattice extension decoders
//!
//! A `beamlattice` element inside a mesh carries the lattice defaults, the
//! beams and optional beam sets. Omitted beam radii and caps are resolved
//! against the lattice defaults here, so the model only stores final values.

use super::NS_BEAM_LATTICE;
use super::context::DecodeContext;
use super::decoder::{Attribute, BeamLattice, Decoded, ElementDecoder, XmlName, attr};
use crate::error::{Error, Result};
use crate::model::{
    Beam, BeamCapMode, BeamSet, ClipMode, DEFAULT_BEAM_RADIUS, DEFAULT_MIN_LENGTH, ResourceId,
};

type Child = Option<Box<dyn ElementDecoder>>;

pub(crate) struct BeamLatticeDecoder {
    lattice: BeamLattice,
}

impl Default for BeamLatticeDecoder {
    fn default() -> Self {
        Self {
            lattice: BeamLattice {
                radius: DEFAULT_BEAM_RADIUS,
                min_length: DEFAULT_MIN_LENGTH,
                ..BeamLattice::default()
            },
        }
    }
}

impl ElementDecoder for BeamLatticeDecoder {
    fn attributes(&mut self, ctx: &mut DecodeContext, attrs: &[Attribute]) -> Result<()> {
        const ELEMENT: &str = "beamlattice";
        let lattice = &mut self.lattice;

        if let Some(radius) = ctx.number::<f64>(ELEMENT, "radius", attr(attrs, "", "radius"))? {
            lattice.radius = radius;
        }
        // `precision` and `clipping` are legacy spellings
        let min_length = attr(attrs, "", "minlength").or_else(|| attr(attrs, "", "precision"));
        if let Some(min_length) = ctx.number::<f64>(ELEMENT, "minlength", min_length)? {
            lattice.min_length = min_length;
        }
        let clip = attr(attrs, "", "clippingmode").or_else(|| attr(attrs, "", "clipping"));
        if let Some(mode) = ctx.optional::<ClipMode>(ELEMENT, "clippingmode", clip) {
            lattice.attributes.clip_mode = mode;
        }
        if let Some(cap) = ctx.optional::<BeamCapMode>(ELEMENT, "cap", attr(attrs, "", "cap")) {
            lattice.cap_mode = cap;
        }

        lattice.attributes.clipping_mesh = ctx
            .number::<u32>(ELEMENT, "clippingmesh", attr(attrs, "", "clippingmesh"))?
            .map(|id| ResourceId::new(ctx.path.clone(), id));
        lattice.attributes.representation_mesh = ctx
            .number::<u32>(ELEMENT, "representationmesh", attr(attrs, "", "representationmesh"))?
            .map(|id| ResourceId::new(ctx.path.clone(), id));
        Ok(())
    }

    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if name.is(NS_BEAM_LATTICE, "beams") {
            Some(Box::new(BeamsDecoder {
                radius: self.lattice.radius,
                cap: self.lattice.cap_mode,
                beams: Vec::new(),
            }))
        } else if name.is(NS_BEAM_LATTICE, "beamsets") {
            Some(Box::new(BeamSetsDecoder::default()))
        } else {
            None
        }
    }

    fn child_done(&mut self, _ctx: &mut DecodeContext, product: Decoded) -> Result<()> {
        match product {
            Decoded::Beams(beams) => self.lattice.beams.extend(beams),
            Decoded::BeamSets(sets) => {
                let count = self.lattice.beams.len();
                for set in &sets {
                    if let Some(bad) = set.refs.iter().find(|&&r| r as usize >= count) {
                        return Err(Error::invalid_required("ref", "index", &bad.to_string()));
                    }
                }
                self.lattice.beam_sets.extend(sets);
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(Some(Decoded::BeamLattice(Box::new(std::mem::take(
            &mut self.lattice,
        )))))
    }
}

struct BeamsDecoder {
    radius: f64,
    cap: BeamCapMode,
    beams: Vec<Beam>,
}

impl ElementDecoder for BeamsDecoder {
    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if name.is(NS_BEAM_LATTICE, "beam") {
            Some(Box::new(BeamDecoder {
                radius: self.radius,
                cap: self.cap,
                beam: None,
            }))
        } else {
            None
        }
    }

    fn child_done(&mut self, _ctx: &mut DecodeContext, product: Decoded) -> Result<()> {
        if let Decoded::Beam(beam) = product {
            self.beams.push(beam);
        }
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(Some(Decoded::Beams(std::mem::take(&mut self.beams))))
    }
}

struct BeamDecoder {
    radius: f64,
    cap: BeamCapMode,
    beam: Option<Beam>,
}

impl ElementDecoder for BeamDecoder {
    fn attributes(&mut self, ctx: &mut DecodeContext, attrs: &[Attribute]) -> Result<()> {
        let v1 = ctx.required::<u32>("beam", "v1", attr(attrs, "", "v1"))?;
        let v2 = ctx.required::<u32>("beam", "v2", attr(attrs, "", "v2"))?;
        let r1 = ctx.number::<f64>("beam", "r1", attr(attrs, "", "r1"))?;
        let r2 = ctx.number::<f64>("beam", "r2", attr(attrs, "", "r2"))?;
        let cap1 = ctx.optional::<BeamCapMode>("beam", "cap1", attr(attrs, "", "cap1"));
        let cap2 = ctx.optional::<BeamCapMode>("beam", "cap2", attr(attrs, "", "cap2"));
        let (Some(v1), Some(v2)) = (v1, v2) else {
            return Ok(());
        };

        // Zero counts as omitted
        let r1 = r1.filter(|&r| r != 0.0).unwrap_or(self.radius);
        let r2 = r2.filter(|&r| r != 0.0).unwrap_or(r1);
        self.beam = Some(Beam {
            v1,
            v2,
            r1,
            r2,
            cap1: cap1.unwrap_or(self.cap),
            cap2: cap2.unwrap_or(self.cap),
        });
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(self.beam.take().map(Decoded::Beam))
    }
}

#[derive(Default)]
struct BeamSetsDecoder {
    sets: Vec<BeamSet>,
}

impl ElementDecoder for BeamSetsDecoder {
    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if name.is(NS_BEAM_LATTICE, "beamset") {
            Some(Box::new(BeamSetDecoder::default()))
        } else {
            None
        }
    }

    fn child_done(&mut self, _ctx: &mut DecodeContext, product: Decoded) -> Result<()> {
        if let Decoded::BeamSet(set) = product {
            self.sets.push(set);
        }
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(Some(Decoded::BeamSets(std::mem::take(&mut self.sets))))
    }
}

#[derive(Default)]
struct BeamSetDecoder {
    set: BeamSet,
}

impl ElementDecoder for BeamSetDecoder {
    fn attributes(&mut self, _ctx: &mut DecodeContext, attrs: &[Attribute]) -> Result<()> {
        self.set.name = attr(attrs, "", "name").map(str::to_string);
        self.set.identifier = attr(attrs, "", "identifier").map(str::to_string);
        Ok(())
    }

    fn child(&mut self, _ctx: &DecodeContext, name: &XmlName) -> Child {
        if name.is(NS_BEAM_LATTICE, "ref") {
            Some(Box::new(BeamRefDecoder::default()))
        } else {
            None
        }
    }

    fn child_done(&mut self, _ctx: &mut DecodeContext, product: Decoded) -> Result<()> {
        if let Decoded::BeamRef(index) = product {
            self.set.refs.push(index);
        }
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(Some(Decoded::BeamSet(std::mem::take(&mut self.set))))
    }
}

#[derive(Default)]
struct BeamRefDecoder {
    index: Option<u32>,
}

impl ElementDecoder for BeamRefDecoder {
    fn attributes(&mut self, ctx: &mut DecodeContext, attrs: &[Attribute]) -> Result<()> {
        self.index = ctx.required::<u32>("ref", "index", attr(attrs, "", "index"))?;
        Ok(())
    }

    fn close(&mut self, _ctx: &mut DecodeContext) -> Result<Option<Decoded>> {
        Ok(self.index.take().map(Decoded::BeamRef))
    }
}
