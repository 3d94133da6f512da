use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod database;
mod finder;

pub use self::database::{MotorDatabase, MotorSetDatabase};
pub use self::finder::{DatabaseMotorFinder, MissingMotorHandler, MotorFinder, ReportMissingMotor};

/// Dimensions closer than this (in metres) are considered equal.
pub const DIMENSION_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotorType {
    Single,
    Reload,
    Hybrid,
    Unknown,
}

impl MotorType {
    pub const fn name(self) -> &'static str {
        match self {
            MotorType::Single => "single",
            MotorType::Reload => "reload",
            MotorType::Hybrid => "hybrid",
            MotorType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MotorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMotorType(pub String);

impl std::error::Error for UnknownMotorType {}

impl fmt::Display for UnknownMotorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown motor type '{}'", self.0)
    }
}

impl FromStr for MotorType {
    type Err = UnknownMotorType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "single" => Ok(MotorType::Single),
            "reload" => Ok(MotorType::Reload),
            "hybrid" => Ok(MotorType::Hybrid),
            "unknown" => Ok(MotorType::Unknown),
            other => Err(UnknownMotorType(other.to_string())),
        }
    }
}

/// A motor manufacturer, matched by its full name or any of its aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manufacturer {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Manufacturer {
    pub fn new<S: Into<String>>(name: S) -> Manufacturer {
        Manufacturer {
            name: name.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_alias<S: Into<String>>(mut self, alias: S) -> Manufacturer {
        self.aliases.push(alias.into());
        self
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        self.name.eq_ignore_ascii_case(query)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(query))
    }
}

/// A concrete motor as held by a motor database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motor {
    pub manufacturer: Manufacturer,
    pub designation: String,
    #[serde(default)]
    pub common_name: Option<String>,
    pub motor_type: MotorType,
    /// Metres.
    pub diameter: f64,
    /// Metres.
    pub length: f64,
    /// Fingerprint of the thrust curve.
    pub digest: String,
}

/// Everything a document records about a motor, used to look the real one up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotorDescriptor {
    pub motor_type: Option<MotorType>,
    pub manufacturer: Option<String>,
    pub designation: Option<String>,
    pub diameter: Option<f64>,
    pub length: Option<f64>,
    pub digest: Option<String>,
}

impl MotorDescriptor {
    pub fn designation<S: Into<String>>(designation: S) -> MotorDescriptor {
        MotorDescriptor {
            designation: Some(designation.into()),
            ..MotorDescriptor::default()
        }
    }

    pub fn with_manufacturer<S: Into<String>>(mut self, manufacturer: S) -> MotorDescriptor {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_digest<S: Into<String>>(mut self, digest: S) -> MotorDescriptor {
        self.digest = Some(digest.into());
        self
    }

    /// Whether `motor` agrees with every field of this descriptor except the digest.
    pub fn describes(&self, motor: &Motor) -> bool {
        if let Some(motor_type) = self.motor_type {
            if motor_type != motor.motor_type {
                return false;
            }
        }

        if let Some(manufacturer) = &self.manufacturer {
            if !motor.manufacturer.matches(manufacturer) {
                return false;
            }
        }

        if let Some(designation) = &self.designation {
            let designation = designation.trim();
            let common = motor
                .common_name
                .as_deref()
                .map(|c| c.eq_ignore_ascii_case(designation))
                .unwrap_or(false);
            if !motor.designation.eq_ignore_ascii_case(designation) && !common {
                return false;
            }
        }

        let within = |wanted: Option<f64>, actual: f64| match wanted {
            Some(wanted) => (wanted - actual).abs() <= DIMENSION_TOLERANCE,
            None => true,
        };

        within(self.diameter, motor.diameter) && within(self.length, motor.length)
    }
}

impl From<&Motor> for MotorDescriptor {
    fn from(motor: &Motor) -> Self {
        MotorDescriptor {
            motor_type: Some(motor.motor_type),
            manufacturer: Some(motor.manufacturer.name.clone()),
            designation: Some(motor.designation.clone()),
            diameter: Some(motor.diameter),
            length: Some(motor.length),
            digest: Some(motor.digest.clone()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn motor(designation: &str, digest: &str) -> Motor {
        Motor {
            manufacturer: Manufacturer::new("Estes").with_alias("E"),
            designation: designation.to_string(),
            common_name: None,
            motor_type: MotorType::Single,
            diameter: 0.018,
            length: 0.070,
            digest: digest.to_string(),
        }
    }

    #[test]
    fn motor_type_round_trips_names() {
        for t in &[
            MotorType::Single,
            MotorType::Reload,
            MotorType::Hybrid,
            MotorType::Unknown,
        ] {
            assert_eq!(t.name().parse::<MotorType>().unwrap(), *t);
        }
        assert!("solid".parse::<MotorType>().is_err());
    }

    #[test]
    fn manufacturer_matches_aliases_ignoring_case() {
        let m = Manufacturer::new("AeroTech").with_alias("AT");
        assert!(m.matches("aerotech"));
        assert!(m.matches(" at "));
        assert!(!m.matches("Estes"));
    }

    #[test]
    fn descriptor_tolerates_small_dimension_differences() {
        let m = motor("C6", "abc");
        let mut d = MotorDescriptor::designation("c6");
        d.diameter = Some(0.0181);
        assert!(d.describes(&m));

        d.length = Some(0.1);
        assert!(!d.describes(&m));
    }

    #[test]
    fn descriptor_matches_common_name() {
        let mut m = motor("C6-5", "abc");
        m.common_name = Some("C6".into());
        assert!(MotorDescriptor::designation("C6").describes(&m));
    }
}
