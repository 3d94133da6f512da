//! RASAero `.CDX1` documents: a flat part list plus the engines of each
//! simulation.

use std::io::{self, Read, Write};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::xml::{self, XmlWriter};
use super::{RocketLoader, RocketSaver};
use crate::context::LoadingContext;
use crate::diagnostics::{ErrorSet, Fault, Warning, WarningSet};
use crate::document::{Component, ComponentKind, Document, MotorPlacement};
use crate::error::ParseError;
use crate::motor::MotorDescriptor;
use crate::options::StorageOptions;

const ROOT: &str = "RASAeroDocument";
const FILE_VERSION: &str = "2";

/// Engine elements of a simulation, by stage index.
const ENGINE_TAGS: [&str; 3] = ["SustainerEngine", "Booster1Engine", "Booster2Engine"];

static ENGINE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn engine_pattern() -> &'static Regex {
    ENGINE_PATTERN.get_or_init(|| Regex::new(r"^\s*(.+?)\s*\(\s*(.+?)\s*\)\s*$").expect("Invalid engine pattern"))
}

/// Splits `"C6-5 (Estes)"` into designation and manufacturer. Returns `None`
/// for the "no engine" values RASAero writes.
fn parse_engine(text: &str) -> Option<MotorDescriptor> {
    let text = text.trim();
    if text.is_empty() || text == "0" {
        return None;
    }
    Some(match engine_pattern().captures(text) {
        Some(caps) => MotorDescriptor::designation(&caps[1]).with_manufacturer(&caps[2]),
        None => MotorDescriptor::designation(text),
    })
}

fn format_engine(descriptor: &MotorDescriptor) -> Option<String> {
    let designation = descriptor.designation.as_deref()?;
    Some(match &descriptor.manufacturer {
        Some(m) => format!("{} ({})", designation, m),
        None => designation.to_string(),
    })
}

fn is_mount(kind: &ComponentKind) -> bool {
    matches!(kind, ComponentKind::BodyTube)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RasAeroLoader;

impl RocketLoader for RasAeroLoader {
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
        debug!(version = ?root.child_text("FileVersion"), "Reading RASAero document");

        let design = root
            .child("RocketDesign")
            .ok_or_else(|| ParseError::Malformed("Document contains no <RocketDesign> element.".into()))?;

        let mut stages = vec![Component::new(ComponentKind::Stage, "Sustainer")];
        for (index, element) in design.children.iter().enumerate() {
            let part = match element.name.as_str() {
                "NoseCone" => Component::new(ComponentKind::NoseCone, "Nose cone"),
                "BodyTube" => Component::new(ComponentKind::BodyTube, "Body tube"),
                "Transition" => Component::new(ComponentKind::Transition, "Transition"),
                "BoatTail" => Component::new(ComponentKind::Transition, "Boattail"),
                "FinCan" => Component::new(ComponentKind::BodyTube, "Fin can"),
                "Booster" => {
                    let number = stages.len();
                    stages.push(Component::new(ComponentKind::Stage, format!("Booster {}", number)));
                    Component::new(ComponentKind::BodyTube, format!("Booster {} tube", number))
                }
                other => {
                    warnings.add(Warning::other(format!(
                        "Unknown RASAero part '{}', ignoring.",
                        other
                    )));
                    continue;
                }
            };
            if index == 0 && part.kind != ComponentKind::NoseCone {
                warnings.add(Warning::other("First RASAero part is not a nose cone."));
            }
            let part = match element.child("Fin") {
                Some(_) => part.with_child(Component::new(ComponentKind::FinSet, "Fins")),
                None => part,
            };
            if let Some(stage) = stages.last_mut() {
                stage.children.push(part);
            }
        }

        if let Some(list) = root.child("SimulationList") {
            for (number, simulation) in list.children_named("Simulation").enumerate() {
                let config_id = format!("simulation-{}", number + 1);
                for (stage_number, tag) in ENGINE_TAGS.iter().enumerate() {
                    let descriptor = match simulation.child_text(tag).and_then(parse_engine) {
                        Some(d) => d,
                        None => continue,
                    };
                    let mount = stages
                        .get_mut(stage_number)
                        .and_then(|s| s.children.iter_mut().rev().find(|c| is_mount(&c.kind)));
                    match mount {
                        Some(mount) => {
                            let motor = context.find_motor(&descriptor, warnings);
                            mount.motors.push(MotorPlacement {
                                config_id: Some(config_id.clone()),
                                descriptor,
                                motor,
                            });
                        }
                        None => {
                            warnings.add(Warning::other(format!(
                                "No motor mount found for stage {}. Ignoring motor.",
                                stage_number
                            )));
                        }
                    }
                }
            }
        }

        context.document_mut().rocket.children = stages;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RasAeroSaver;

impl RocketSaver for RasAeroSaver {
    fn save(
        &self,
        output: &mut dyn Write,
        document: &Document,
        _options: &StorageOptions,
        warnings: &mut WarningSet,
        errors: &mut ErrorSet,
    ) -> io::Result<()> {
        let stages: Vec<&Component> = document.rocket.stages().collect();
        let first = stages.first().and_then(|s| s.children.first());
        if first.map(|c| c.kind != ComponentKind::NoseCone).unwrap_or(true) {
            errors.add(Fault::new("First component of the sustainer must be a nose cone in RASAero."));
        }
        if stages.len() > ENGINE_TAGS.len() {
            errors.add(Fault::new(format!(
                "RASAero supports at most {} stages.",
                ENGINE_TAGS.len()
            )));
        }

        let mut w = XmlWriter::new(output);
        w.declaration()?;
        w.open(ROOT, &[])?;
        w.text_element("FileVersion", FILE_VERSION)?;
        w.open("RocketDesign", &[])?;

        for (index, stage) in stages.iter().take(ENGINE_TAGS.len()).enumerate() {
            let mut booster_written = false;
            for component in &stage.children {
                let tag = match (&component.kind, index) {
                    (ComponentKind::BodyTube, 0) => "BodyTube",
                    (ComponentKind::BodyTube, _) if !booster_written => {
                        booster_written = true;
                        "Booster"
                    }
                    (ComponentKind::NoseCone, 0) => "NoseCone",
                    (ComponentKind::Transition, _) => "Transition",
                    _ => {
                        warnings.add(Warning::other(format!(
                            "{} '{}' cannot be saved in RASAero format, ignoring.",
                            component.kind, component.name
                        )));
                        continue;
                    }
                };
                w.open(tag, &[])?;
                w.text_element("PartType", tag)?;
                if component.children.iter().any(|c| c.kind == ComponentKind::FinSet) {
                    w.open("Fin", &[])?;
                    w.text_element("Count", "3")?;
                    w.close("Fin")?;
                }
                w.close(tag)?;
            }
        }
        w.close("RocketDesign")?;

        let engines: Vec<Option<String>> = stages
            .iter()
            .take(ENGINE_TAGS.len())
            .map(|stage| {
                stage
                    .children
                    .iter()
                    .flat_map(|c| c.motors.iter())
                    .next()
                    .and_then(|p| format_engine(&p.effective_descriptor()))
            })
            .collect();
        w.open("SimulationList", &[])?;
        w.open("Simulation", &[])?;
        for (tag, engine) in ENGINE_TAGS.iter().zip(engines.iter()) {
            w.text_element(tag, engine.as_deref().unwrap_or("0"))?;
        }
        w.close("Simulation")?;
        w.close("SimulationList")?;

        w.close(ROOT)
    }

    fn estimate_file_size(&self, document: &Document, _options: &StorageOptions) -> u64 {
        600 + document.rocket.components().count() as u64 * 200
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::NoopAttachmentResolver;
    use crate::motor::tests::motor;
    use crate::motor::{DatabaseMotorFinder, Manufacturer, MotorSetDatabase};

    const DESIGN: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<RASAeroDocument>
  <FileVersion>2</FileVersion>
  <RocketDesign>
    <NoseCone><PartType>NoseCone</PartType></NoseCone>
    <BodyTube><PartType>BodyTube</PartType><Fin><Count>4</Count></Fin></BodyTube>
  </RocketDesign>
  <SimulationList>
    <Simulation>
      <SustainerEngine>C6 (Estes)</SustainerEngine>
      <Booster1Engine>D12 (Estes)</Booster1Engine>
    </Simulation>
  </SimulationList>
</RASAeroDocument>"#;

    fn load(xml: &str) -> (Document, WarningSet) {
        let finder = DatabaseMotorFinder::new(MotorSetDatabase::new(vec![motor("C6", "abc")]));
        let mut context = LoadingContext::new(&finder, Box::new(NoopAttachmentResolver));
        let mut warnings = WarningSet::new();
        RasAeroLoader
            .load(&mut context, &mut xml.as_bytes(), Some("design.CDX1"), &mut warnings)
            .unwrap();
        (context.into_document(), warnings)
    }

    #[test]
    fn engine_text() {
        let d = parse_engine(" H128W-14A ( AeroTech ) ").unwrap();
        assert_eq!(d.designation.as_deref(), Some("H128W-14A"));
        assert_eq!(d.manufacturer.as_deref(), Some("AeroTech"));
        assert_eq!(parse_engine("G80").unwrap().manufacturer, None);
        assert!(parse_engine("0").is_none());
        assert_eq!(format_engine(&d).unwrap(), "H128W-14A (AeroTech)");
    }

    #[test]
    fn sustainer_engine_goes_into_last_body_tube() {
        let (document, warnings) = load(DESIGN);
        let tube = document
            .rocket
            .components()
            .find(|c| c.kind == ComponentKind::BodyTube)
            .unwrap();
        assert_eq!(tube.children[0].kind, ComponentKind::FinSet);
        let placement = &tube.motors[0];
        assert_eq!(placement.config_id.as_deref(), Some("simulation-1"));
        assert_eq!(
            placement.motor.as_ref().unwrap().manufacturer,
            Manufacturer::new("Estes").with_alias("E")
        );

        // the booster engine has no booster stage to go into
        let messages: Vec<String> = warnings.iter().map(|w| w.to_string()).collect();
        assert_eq!(messages, vec!["No motor mount found for stage 1. Ignoring motor."]);
    }

    #[test]
    fn missing_motor_is_reported_but_kept_as_descriptor() {
        let (document, warnings) = load(&DESIGN.replace("C6 (Estes)", "Z99 (Nobody)"));
        let tube = document
            .rocket
            .components()
            .find(|c| c.kind == ComponentKind::BodyTube)
            .unwrap();
        assert!(tube.motors[0].motor.is_none());
        assert_eq!(tube.motors[0].descriptor.designation.as_deref(), Some("Z99"));
        assert!(matches!(warnings.iter().next(), Some(Warning::MissingMotor(_))));
    }

    #[test]
    fn sustainer_must_start_with_a_nose_cone() {
        let mut document = Document::new();
        document.rocket.children.push(
            Component::new(ComponentKind::Stage, "Sustainer")
                .with_child(Component::new(ComponentKind::BodyTube, "Tube")),
        );

        let mut out = Vec::new();
        let mut errors = ErrorSet::new();
        RasAeroSaver
            .save(&mut out, &document, &StorageOptions::default(), &mut WarningSet::new(), &mut errors)
            .unwrap();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn saved_output_loads_back() {
        let (document, _) = load(DESIGN);
        let mut out = Vec::new();
        let mut warnings = WarningSet::new();
        let mut errors = ErrorSet::new();
        RasAeroSaver
            .save(&mut out, &document, &StorageOptions::default(), &mut warnings, &mut errors)
            .unwrap();
        assert!(errors.is_empty());

        let (reloaded, warnings) = load(std::str::from_utf8(&out).unwrap());
        assert!(warnings.is_empty(), "{:?}", warnings);
        assert_eq!(reloaded.rocket.components().count(), document.rocket.components().count());
        let tube = reloaded.rocket.components().find(|c| !c.motors.is_empty()).unwrap();
        assert_eq!(tube.motors[0].descriptor.designation.as_deref(), Some("C6"));
    }
}
