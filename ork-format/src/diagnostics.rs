//! Ordered warning and error collections threaded through every load and save.
//!
//! A sub-operation (a single format loader or saver) always writes into a private
//! set, which the caller merges into its own set once the sub-operation is done.

use std::fmt;

use crate::motor::MotorDescriptor;

/// A non-fatal problem found while loading or saving a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A motor element carried no designation.
    NoMotorSpecified,

    /// No motor in the database matched the descriptor.
    MissingMotor(MotorDescriptor),

    /// The chosen motor's digest differs from the one stored in the document.
    DifferingThrustCurve {
        designation: String,
        manufacturer: Option<String>,
    },

    /// Several motors matched and none could be preferred.
    MultipleMotors {
        designation: String,
        manufacturer: Option<String>,
    },

    /// The document declares a version this crate was not written against.
    UnsupportedVersion {
        version: Option<String>,
        creator: Option<String>,
    },

    Other(String),
}

impl Warning {
    pub fn other<S: Into<String>>(message: S) -> Warning {
        Warning::Other(message.into())
    }
}

fn write_designation(
    f: &mut fmt::Formatter<'_>,
    designation: &str,
    manufacturer: Option<&str>,
) -> fmt::Result {
    write!(f, "designation '{}'", designation)?;
    if let Some(manufacturer) = manufacturer {
        write!(f, " for manufacturer '{}'", manufacturer)?;
    }
    Ok(())
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NoMotorSpecified => write!(f, "No motor specified, ignoring."),
            Warning::MissingMotor(descriptor) => {
                write!(f, "No motor with ")?;
                write_designation(
                    f,
                    descriptor.designation.as_deref().unwrap_or("-"),
                    descriptor.manufacturer.as_deref(),
                )?;
                write!(f, " found.")
            }
            Warning::DifferingThrustCurve {
                designation,
                manufacturer,
            } => {
                write!(f, "Motor with ")?;
                write_designation(f, designation, manufacturer.as_deref())?;
                write!(f, " has differing thrust curve than the original.")
            }
            Warning::MultipleMotors {
                designation,
                manufacturer,
            } => {
                write!(f, "Multiple motors with ")?;
                write_designation(f, designation, manufacturer.as_deref())?;
                write!(f, " found, one chosen arbitrarily.")
            }
            Warning::UnsupportedVersion { version, creator } => {
                write!(f, "Unsupported document version")?;
                if let Some(version) = version {
                    write!(f, " {}", version)?;
                }
                if let Some(creator) = creator.as_deref().map(str::trim) {
                    if !creator.is_empty() {
                        write!(f, " (written using '{}')", creator)?;
                    }
                }
                write!(f, ", attempting to read file anyway.")
            }
            Warning::Other(message) => f.write_str(message),
        }
    }
}

/// A problem that made part of a document impossible to express in the target format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault(String);

impl Fault {
    pub fn new<S: Into<String>>(message: S) -> Fault {
        Fault(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Insertion-ordered set of warnings. Adding a warning equal to one already
/// present is a no-op.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarningSet {
    warnings: Vec<Warning>,
}

impl WarningSet {
    pub fn new() -> WarningSet {
        WarningSet::default()
    }

    /// Returns `true` if the warning was not already present.
    pub fn add(&mut self, warning: Warning) -> bool {
        if self.warnings.contains(&warning) {
            return false;
        }
        self.warnings.push(warning);
        true
    }

    /// Merges a sub-operation's warnings, preserving their order.
    pub fn merge(&mut self, other: WarningSet) {
        for warning in other.warnings {
            self.add(warning);
        }
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Warning> {
        self.warnings.iter()
    }
}

impl<'a> IntoIterator for &'a WarningSet {
    type Item = &'a Warning;
    type IntoIter = std::slice::Iter<'a, Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.warnings.iter()
    }
}

/// Insertion-ordered set of faults, collected by savers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSet {
    faults: Vec<Fault>,
}

impl ErrorSet {
    pub fn new() -> ErrorSet {
        ErrorSet::default()
    }

    pub fn add(&mut self, fault: Fault) -> bool {
        if self.faults.contains(&fault) {
            return false;
        }
        self.faults.push(fault);
        true
    }

    pub fn merge(&mut self, other: ErrorSet) {
        for fault in other.faults {
            self.add(fault);
        }
    }

    pub fn len(&self) -> usize {
        self.faults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Fault> {
        self.faults.iter()
    }
}

impl<'a> IntoIterator for &'a ErrorSet {
    type Item = &'a Fault;
    type IntoIter = std::slice::Iter<'a, Fault>;

    fn into_iter(self) -> Self::IntoIter {
        self.faults.iter()
    }
}
