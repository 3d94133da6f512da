//! The in-memory rocket design, as populated by loaders and read by savers.

use std::fmt;

use crate::attachment::Attachment;
use crate::motor::{Motor, MotorDescriptor};
use crate::options::StorageOptions;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub rocket: Rocket,
    pub simulations: Vec<Simulation>,
    /// Options the document was loaded with, used as defaults when saving it again.
    pub storage_options: StorageOptions,
}

impl Document {
    pub fn new() -> Document {
        Document::default()
    }

    /// Every attachment referenced by the design, in tree order. An attachment
    /// shared by several components appears once per reference.
    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> + '_ {
        self.rocket.components().flat_map(|c| {
            c.appearance
                .iter()
                .chain(c.inside_appearance.iter())
                .filter_map(|a| a.decal.as_ref())
        })
    }

    /// Number of flight data points across all simulations.
    pub fn flight_data_points(&self) -> usize {
        self.simulations
            .iter()
            .flat_map(|s| s.flight_data.iter())
            .map(|b| b.points.len())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rocket {
    pub name: String,
    pub children: Vec<Component>,
}

impl Default for Rocket {
    fn default() -> Self {
        Rocket {
            name: "Rocket".to_string(),
            children: Vec::new(),
        }
    }
}

impl Rocket {
    /// Depth-first, pre-order walk of every component below the rocket.
    pub fn components(&self) -> Components<'_> {
        Components {
            stack: self.children.iter().rev().collect(),
        }
    }

    pub fn stages(&self) -> impl Iterator<Item = &Component> + '_ {
        self.children.iter().filter(|c| c.kind == ComponentKind::Stage)
    }
}

pub struct Components<'a> {
    stack: Vec<&'a Component>,
}

impl<'a> Iterator for Components<'a> {
    type Item = &'a Component;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Stage,
    NoseCone,
    BodyTube,
    Transition,
    FinSet,
    InnerTube,
    CenteringRing,
    Parachute,
    Streamer,
    MassComponent,
    LaunchLug,
    Other(String),
}

impl ComponentKind {
    /// Element name used by the native format.
    pub fn tag(&self) -> &str {
        match self {
            ComponentKind::Stage => "stage",
            ComponentKind::NoseCone => "nosecone",
            ComponentKind::BodyTube => "bodytube",
            ComponentKind::Transition => "transition",
            ComponentKind::FinSet => "trapezoidfinset",
            ComponentKind::InnerTube => "innertube",
            ComponentKind::CenteringRing => "centeringring",
            ComponentKind::Parachute => "parachute",
            ComponentKind::Streamer => "streamer",
            ComponentKind::MassComponent => "masscomponent",
            ComponentKind::LaunchLug => "launchlug",
            ComponentKind::Other(tag) => tag,
        }
    }

    pub fn from_tag(tag: &str) -> ComponentKind {
        match tag {
            "stage" => ComponentKind::Stage,
            "nosecone" => ComponentKind::NoseCone,
            "bodytube" => ComponentKind::BodyTube,
            "transition" => ComponentKind::Transition,
            "trapezoidfinset" | "ellipticalfinset" | "freeformfinset" => ComponentKind::FinSet,
            "innertube" => ComponentKind::InnerTube,
            "centeringring" => ComponentKind::CenteringRing,
            "parachute" => ComponentKind::Parachute,
            "streamer" => ComponentKind::Streamer,
            "masscomponent" => ComponentKind::MassComponent,
            "launchlug" => ComponentKind::LaunchLug,
            other => ComponentKind::Other(other.to_string()),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            ComponentKind::Stage => "Stage",
            ComponentKind::NoseCone => "Nose cone",
            ComponentKind::BodyTube => "Body tube",
            ComponentKind::Transition => "Transition",
            ComponentKind::FinSet => "Fin set",
            ComponentKind::InnerTube => "Inner tube",
            ComponentKind::CenteringRing => "Centering ring",
            ComponentKind::Parachute => "Parachute",
            ComponentKind::Streamer => "Streamer",
            ComponentKind::MassComponent => "Mass component",
            ComponentKind::LaunchLug => "Launch lug",
            ComponentKind::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub kind: ComponentKind,
    pub name: String,
    pub appearance: Option<Appearance>,
    pub inside_appearance: Option<Appearance>,
    pub motors: Vec<MotorPlacement>,
    pub children: Vec<Component>,
}

impl Component {
    pub fn new<S: Into<String>>(kind: ComponentKind, name: S) -> Component {
        Component {
            kind,
            name: name.into(),
            appearance: None,
            inside_appearance: None,
            motors: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: Component) -> Component {
        self.children.push(child);
        self
    }

    pub fn with_decal(mut self, decal: Attachment) -> Component {
        self.appearance = Some(Appearance { decal: Some(decal) });
        self
    }

    /// Walks this component and everything below it.
    pub fn iter(&self) -> Components<'_> {
        Components { stack: vec![self] }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Appearance {
    pub decal: Option<Attachment>,
}

/// A motor loaded into a motor mount for one flight configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorPlacement {
    pub config_id: Option<String>,
    /// What the document said about the motor.
    pub descriptor: MotorDescriptor,
    /// The motor the descriptor resolved to, if any.
    pub motor: Option<Motor>,
}

impl MotorPlacement {
    /// The descriptor to write back: the resolved motor when there is one.
    pub fn effective_descriptor(&self) -> MotorDescriptor {
        match &self.motor {
            Some(motor) => MotorDescriptor::from(motor),
            None => self.descriptor.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Simulation {
    pub name: String,
    pub flight_data: Vec<FlightDataBranch>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightDataBranch {
    pub name: String,
    pub types: Vec<String>,
    pub points: Vec<Vec<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Rocket {
        Rocket {
            name: "Test".into(),
            children: vec![Component::new(ComponentKind::Stage, "Sustainer")
                .with_child(Component::new(ComponentKind::NoseCone, "Nose"))
                .with_child(
                    Component::new(ComponentKind::BodyTube, "Body")
                        .with_child(Component::new(ComponentKind::FinSet, "Fins")),
                )],
        }
    }

    #[test]
    fn components_are_walked_in_pre_order() {
        let rocket = sample();
        let names: Vec<&str> = rocket.components().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Sustainer", "Nose", "Body", "Fins"]);
    }

    #[test]
    fn attachments_repeat_per_reference() {
        let decal = Attachment::in_memory("a.png", b"x".to_vec());
        let mut rocket = sample();
        rocket.children[0].children[0] =
            Component::new(ComponentKind::NoseCone, "Nose").with_decal(decal.clone());
        rocket.children[0].children[1].inside_appearance = Some(Appearance {
            decal: Some(decal),
        });

        let document = Document {
            rocket,
            ..Document::default()
        };
        assert_eq!(document.attachments().count(), 2);
    }

    #[test]
    fn tags_round_trip() {
        for kind in &[ComponentKind::Stage, ComponentKind::FinSet, ComponentKind::Other("pod".into())] {
            assert_eq!(&ComponentKind::from_tag(kind.tag()), kind);
        }
    }
}
