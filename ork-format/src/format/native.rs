//! The native `.ork` document format.

use std::io::{self, Read, Write};

use tracing::debug;

use super::xml::{self, Element, XmlWriter};
use super::{RocketLoader, RocketSaver};
use crate::context::LoadingContext;
use crate::diagnostics::{ErrorSet, Warning, WarningSet};
use crate::document::{
    Appearance, Component, ComponentKind, Document, FlightDataBranch, MotorPlacement, Simulation,
};
use crate::error::ParseError;
use crate::motor::{MotorDescriptor, MotorType};
use crate::options::StorageOptions;

const ROOT: &str = "openrocket";

/// Version written by [`NativeSaver`].
pub const FILE_VERSION: &str = "1.9";

const SUPPORTED_VERSIONS: &[&str] = &["1.0", "1.1", "1.2", "1.3", "1.4", "1.5", "1.6", "1.7", "1.8", "1.9"];

/// Motor digests are only trusted from this file version on (1.4).
const DIGEST_VERSION: u32 = 104;

const CREATOR: &str = concat!("ork ", env!("CARGO_PKG_VERSION"));

/// Parses "major.minor" into `major * 100 + minor`.
fn parse_version(version: &str) -> Option<u32> {
    let (major, minor) = version.trim().split_once('.')?;
    Some(major.parse::<u32>().ok()? * 100 + minor.parse::<u32>().ok()?)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeLoader;

impl RocketLoader for NativeLoader {
    fn load(
        &self,
        context: &mut LoadingContext<'_>,
        source: &mut dyn Read,
        _file_name: Option<&str>,
        warnings: &mut WarningSet,
    ) -> Result<(), ParseError> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        let root = xml::parse_root(&bytes, ROOT)?;

        let version = root.attr("version");
        if !version.map(|v| SUPPORTED_VERSIONS.contains(&v.trim())).unwrap_or(false) {
            warnings.add(Warning::UnsupportedVersion {
                version: version.map(str::to_string),
                creator: root.attr("creator").map(str::to_string),
            });
        }
        let file_version = version.and_then(parse_version).unwrap_or(0);
        debug!(?version, file_version, "Reading native document");

        let rocket = root
            .child("rocket")
            .ok_or_else(|| ParseError::Malformed("Document contains no <rocket> element.".into()))?;

        let mut reader = TreeReader {
            context,
            warnings,
            use_digest: file_version >= DIGEST_VERSION,
        };
        let children = reader.read_subcomponents(rocket);
        let simulations = root
            .child("simulations")
            .map(|sims| sims.children_named("simulation").map(read_simulation).collect())
            .unwrap_or_default();

        let document = reader.context.document_mut();
        if let Some(name) = rocket.child_text("name") {
            document.rocket.name = name.to_string();
        }
        document.rocket.children = children;
        document.simulations = simulations;
        Ok(())
    }
}

struct TreeReader<'c, 'a, 'w> {
    context: &'c mut LoadingContext<'a>,
    warnings: &'w mut WarningSet,
    use_digest: bool,
}

impl TreeReader<'_, '_, '_> {
    fn read_subcomponents(&mut self, parent: &Element) -> Vec<Component> {
        match parent.child("subcomponents") {
            Some(sub) => sub.children.iter().map(|e| self.read_component(e)).collect(),
            None => Vec::new(),
        }
    }

    fn read_component(&mut self, element: &Element) -> Component {
        let kind = ComponentKind::from_tag(&element.name);
        let name = element
            .child_text("name")
            .map(str::to_string)
            .unwrap_or_else(|| kind.display_name().to_string());

        let mut component = Component::new(kind, name);
        component.appearance = element.child("appearance").map(|a| self.read_appearance(a));
        component.inside_appearance = element
            .child("insideappearance")
            .map(|a| self.read_appearance(a));
        if let Some(mount) = element.child("motormount") {
            component.motors = mount
                .children_named("motor")
                .map(|m| self.read_motor(m))
                .collect();
        }
        component.children = self.read_subcomponents(element);
        component
    }

    fn read_appearance(&self, element: &Element) -> Appearance {
        let decal = element
            .child("decal")
            .and_then(|d| d.attr("name"))
            .map(|name| self.context.attachment(name));
        Appearance { decal }
    }

    fn read_motor(&mut self, element: &Element) -> MotorPlacement {
        let mut descriptor = MotorDescriptor {
            manufacturer: element.child_text("manufacturer").map(str::to_string),
            designation: element.child_text("designation").map(str::to_string),
            ..MotorDescriptor::default()
        };

        if let Some(text) = element.child_text("type") {
            match text.parse::<MotorType>() {
                Ok(t) => descriptor.motor_type = Some(t),
                Err(_) => {
                    self.warnings
                        .add(Warning::other(format!("Unknown motor type '{}', ignoring.", text)));
                }
            }
        }
        descriptor.diameter = self.read_dimension(element, "diameter");
        descriptor.length = self.read_dimension(element, "length");
        if self.use_digest {
            descriptor.digest = element.child_text("digest").map(str::to_string);
        }

        let motor = self.context.find_motor(&descriptor, self.warnings);
        MotorPlacement {
            config_id: element.attr("configid").map(str::to_string),
            descriptor,
            motor,
        }
    }

    fn read_dimension(&mut self, element: &Element, name: &str) -> Option<f64> {
        let text = element.child_text(name)?;
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                self.warnings.add(Warning::other(format!(
                    "Illegal motor {} specified, ignoring.",
                    name
                )));
                None
            }
        }
    }
}

fn read_simulation(element: &Element) -> Simulation {
    let flight_data = element
        .child("flightdata")
        .map(|data| data.children_named("databranch").map(read_branch).collect())
        .unwrap_or_default();
    Simulation {
        name: element.child_text("name").unwrap_or("Simulation").to_string(),
        flight_data,
    }
}

fn read_branch(element: &Element) -> FlightDataBranch {
    let types = element
        .attr("types")
        .map(|t| t.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default();
    let points = element
        .children_named("datapoint")
        .map(|p| {
            p.text
                .split(',')
                .map(|v| v.trim().parse::<f64>().unwrap_or(f64::NAN))
                .collect()
        })
        .collect();
    FlightDataBranch {
        name: element.attr("name").unwrap_or_default().to_string(),
        types,
        points,
    }
}

/// Writes the document XML. Packaging it with its decals is left to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeSaver;

impl RocketSaver for NativeSaver {
    fn save(
        &self,
        output: &mut dyn Write,
        document: &Document,
        options: &StorageOptions,
        _warnings: &mut WarningSet,
        _errors: &mut ErrorSet,
    ) -> io::Result<()> {
        let mut w = XmlWriter::new(output);
        w.declaration()?;
        w.open(ROOT, &[("version", FILE_VERSION), ("creator", CREATOR)])?;

        w.open("rocket", &[])?;
        w.text_element("name", &document.rocket.name)?;
        write_subcomponents(&mut w, &document.rocket.children)?;
        w.close("rocket")?;

        if !document.simulations.is_empty() {
            w.open("simulations", &[])?;
            for simulation in &document.simulations {
                write_simulation(&mut w, simulation, options.save_simulation_data)?;
            }
            w.close("simulations")?;
        }

        w.close(ROOT)
    }

    fn estimate_file_size(&self, document: &Document, options: &StorageOptions) -> u64 {
        let components = document.rocket.components().count() as u64 + 1;
        let mut size = components * 80 + document.simulations.len() as u64 * 100;
        if options.save_simulation_data {
            size += document.flight_data_points() as u64 * 100;
        }
        size
    }

    fn packages_attachments(&self) -> bool {
        true
    }
}

fn write_subcomponents(w: &mut XmlWriter<'_>, children: &[Component]) -> io::Result<()> {
    if children.is_empty() {
        return Ok(());
    }
    w.open("subcomponents", &[])?;
    for child in children {
        write_component(w, child)?;
    }
    w.close("subcomponents")
}

fn write_component(w: &mut XmlWriter<'_>, component: &Component) -> io::Result<()> {
    let tag = component.kind.tag();
    w.open(tag, &[])?;
    w.text_element("name", &component.name)?;
    if let Some(appearance) = &component.appearance {
        write_appearance(w, "appearance", appearance)?;
    }
    if let Some(appearance) = &component.inside_appearance {
        write_appearance(w, "insideappearance", appearance)?;
    }
    if !component.motors.is_empty() {
        w.open("motormount", &[])?;
        for placement in &component.motors {
            write_motor(w, placement)?;
        }
        w.close("motormount")?;
    }
    write_subcomponents(w, &component.children)?;
    w.close(tag)
}

fn write_appearance(w: &mut XmlWriter<'_>, tag: &str, appearance: &Appearance) -> io::Result<()> {
    w.open(tag, &[])?;
    if let Some(decal) = &appearance.decal {
        w.empty("decal", &[("name", decal.name())])?;
    }
    w.close(tag)
}

fn write_motor(w: &mut XmlWriter<'_>, placement: &MotorPlacement) -> io::Result<()> {
    let descriptor = placement.effective_descriptor();
    match &placement.config_id {
        Some(id) => w.open("motor", &[("configid", id.as_str())])?,
        None => w.open("motor", &[])?,
    }
    if let Some(t) = descriptor.motor_type {
        w.text_element("type", t.name())?;
    }
    if let Some(m) = &descriptor.manufacturer {
        w.text_element("manufacturer", m)?;
    }
    if let Some(d) = &descriptor.digest {
        w.text_element("digest", d)?;
    }
    if let Some(d) = &descriptor.designation {
        w.text_element("designation", d)?;
    }
    if let Some(d) = descriptor.diameter {
        w.text_element("diameter", &d.to_string())?;
    }
    if let Some(l) = descriptor.length {
        w.text_element("length", &l.to_string())?;
    }
    w.close("motor")
}

fn write_simulation(w: &mut XmlWriter<'_>, simulation: &Simulation, with_data: bool) -> io::Result<()> {
    w.open("simulation", &[])?;
    w.text_element("name", &simulation.name)?;
    if with_data && !simulation.flight_data.is_empty() {
        w.open("flightdata", &[])?;
        for branch in &simulation.flight_data {
            let types = branch.types.join(",");
            w.open("databranch", &[("name", branch.name.as_str()), ("types", types.as_str())])?;
            for point in &branch.points {
                let values: Vec<String> = point.iter().map(|v| v.to_string()).collect();
                w.text_element("datapoint", &values.join(","))?;
            }
            w.close("databranch")?;
        }
        w.close("flightdata")?;
    }
    w.close("simulation")
}
