//! RockSim `.rkt` documents: rocket name and the staged part tree.

use std::io::{self, Read, Write};

use tracing::debug;

use super::xml::{self, Element, XmlWriter};
use super::{RocketLoader, RocketSaver};
use crate::context::LoadingContext;
use crate::diagnostics::{ErrorSet, Fault, Warning, WarningSet};
use crate::document::{Component, ComponentKind, Document};
use crate::error::ParseError;
use crate::options::StorageOptions;

const ROOT: &str = "RockSimDocument";
const FILE_VERSION: &str = "4";

/// Stage containers, sustainer first.
const STAGE_TAGS: [&str; 3] = ["Stage3Parts", "Stage2Parts", "Stage1Parts"];
const STAGE_NAMES: [&str; 3] = ["Sustainer", "Booster 1", "Booster 2"];

fn kind_for_part(tag: &str, attached: bool) -> Option<ComponentKind> {
    Some(match tag {
        "NoseCone" => ComponentKind::NoseCone,
        "BodyTube" if attached => ComponentKind::InnerTube,
        "BodyTube" => ComponentKind::BodyTube,
        "Transition" => ComponentKind::Transition,
        "FinSet" => ComponentKind::FinSet,
        "Ring" => ComponentKind::CenteringRing,
        "Parachute" => ComponentKind::Parachute,
        "Streamer" => ComponentKind::Streamer,
        "MassObject" => ComponentKind::MassComponent,
        "LaunchLug" => ComponentKind::LaunchLug,
        _ => return None,
    })
}

fn part_for_kind(kind: &ComponentKind) -> Option<&'static str> {
    Some(match kind {
        ComponentKind::NoseCone => "NoseCone",
        ComponentKind::BodyTube | ComponentKind::InnerTube => "BodyTube",
        ComponentKind::Transition => "Transition",
        ComponentKind::FinSet => "FinSet",
        ComponentKind::CenteringRing => "Ring",
        ComponentKind::Parachute => "Parachute",
        ComponentKind::Streamer => "Streamer",
        ComponentKind::MassComponent => "MassObject",
        ComponentKind::LaunchLug => "LaunchLug",
        _ => return None,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RockSimLoader;

impl RocketLoader for RockSimLoader {
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

        let design = root
            .child("DesignInformation")
            .and_then(|d| d.child("RocketDesign"))
            .ok_or_else(|| ParseError::Malformed("Document contains no <RocketDesign> element.".into()))?;

        let stage_count = match design.child_text("StageCount") {
            Some(text) => text
                .parse::<usize>()
                .map_err(|_| ParseError::Malformed(format!("Invalid stage count '{}'.", text)))?,
            None => 1,
        };
        debug!(version = ?root.child_text("FileVersion"), stage_count, "Reading RockSim document");

        let mut stages = Vec::new();
        for (index, tag) in STAGE_TAGS.iter().enumerate().take(stage_count.clamp(1, 3)) {
            let mut stage = Component::new(ComponentKind::Stage, STAGE_NAMES[index]);
            if let Some(parts) = design.child(tag) {
                stage.children = read_parts(parts, false, warnings);
            }
            stages.push(stage);
        }

        let document = context.document_mut();
        if let Some(name) = design.child_text("Name") {
            document.rocket.name = name.to_string();
        }
        document.rocket.children = stages;
        Ok(())
    }
}

fn read_parts(container: &Element, attached: bool, warnings: &mut WarningSet) -> Vec<Component> {
    let mut parts = Vec::new();
    for element in &container.children {
        let kind = match kind_for_part(&element.name, attached) {
            Some(kind) => kind,
            None => {
                warnings.add(Warning::other(format!(
                    "Unknown RockSim part '{}', ignoring.",
                    element.name
                )));
                continue;
            }
        };
        let name = element
            .child_text("Name")
            .map(str::to_string)
            .unwrap_or_else(|| kind.display_name().to_string());
        let mut component = Component::new(kind, name);
        if let Some(attached_parts) = element.child("AttachedParts") {
            component.children = read_parts(attached_parts, true, warnings);
        }
        parts.push(component);
    }
    parts
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RockSimSaver;

impl RocketSaver for RockSimSaver {
    fn save(
        &self,
        output: &mut dyn Write,
        document: &Document,
        _options: &StorageOptions,
        warnings: &mut WarningSet,
        errors: &mut ErrorSet,
    ) -> io::Result<()> {
        let stages: Vec<&Component> = document.rocket.stages().collect();
        if stages.len() > STAGE_TAGS.len() {
            errors.add(Fault::new(format!(
                "RockSim supports at most {} stages, {} stages were not saved.",
                STAGE_TAGS.len(),
                stages.len() - STAGE_TAGS.len()
            )));
        }

        let mut w = XmlWriter::new(output);
        w.declaration()?;
        w.open(ROOT, &[])?;
        w.text_element("FileVersion", FILE_VERSION)?;
        w.open("DesignInformation", &[])?;
        w.open("RocketDesign", &[])?;
        w.text_element("Name", &document.rocket.name)?;
        let count = stages.len().min(STAGE_TAGS.len()).max(1);
        w.text_element("StageCount", &count.to_string())?;

        for (tag, stage) in STAGE_TAGS.iter().zip(stages.iter()) {
            w.open(tag, &[])?;
            write_parts(&mut w, &stage.children, warnings)?;
            w.close(tag)?;
        }

        w.close("RocketDesign")?;
        w.close("DesignInformation")?;
        w.close(ROOT)
    }

    fn estimate_file_size(&self, document: &Document, _options: &StorageOptions) -> u64 {
        400 + document.rocket.components().count() as u64 * 250
    }
}

fn write_parts(w: &mut XmlWriter<'_>, components: &[Component], warnings: &mut WarningSet) -> io::Result<()> {
    for component in components {
        let tag = match part_for_kind(&component.kind) {
            Some(tag) => tag,
            None => {
                warnings.add(Warning::other(format!(
                    "{} '{}' cannot be saved in RockSim format, ignoring.",
                    component.kind, component.name
                )));
                continue;
            }
        };
        w.open(tag, &[])?;
        w.text_element("Name", &component.name)?;
        if !component.children.is_empty() {
            w.open("AttachedParts", &[])?;
            write_parts(w, &component.children, warnings)?;
            w.close("AttachedParts")?;
        }
        w.close(tag)?;
    }
    Ok(())
}
