use tracing::debug;

use super::{Motor, MotorDatabase, MotorDescriptor};
use crate::diagnostics::{Warning, WarningSet};

/// Resolves a motor descriptor stored in a document to a concrete motor.
///
/// Resolution never fails a load. It returns the best candidate it can and
/// records a warning whenever the answer is not an exact match.
pub trait MotorFinder {
    fn find_motor(&self, descriptor: &MotorDescriptor, warnings: &mut WarningSet) -> Option<Motor>;
}

/// What to do when the database has no candidate at all.
pub trait MissingMotorHandler {
    fn handle_missing_motor(
        &self,
        descriptor: &MotorDescriptor,
        warnings: &mut WarningSet,
    ) -> Option<Motor>;
}

/// Records a [`Warning::MissingMotor`] and resolves to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportMissingMotor;

impl MissingMotorHandler for ReportMissingMotor {
    fn handle_missing_motor(
        &self,
        descriptor: &MotorDescriptor,
        warnings: &mut WarningSet,
    ) -> Option<Motor> {
        warnings.add(Warning::MissingMotor(descriptor.clone()));
        None
    }
}

/// A [`MotorFinder`] backed by a shared [`MotorDatabase`].
#[derive(Debug, Clone)]
pub struct DatabaseMotorFinder<D, H = ReportMissingMotor> {
    database: D,
    missing: H,
}

impl<D: MotorDatabase> DatabaseMotorFinder<D> {
    pub fn new(database: D) -> Self {
        DatabaseMotorFinder {
            database,
            missing: ReportMissingMotor,
        }
    }
}

impl<D: MotorDatabase, H: MissingMotorHandler> DatabaseMotorFinder<D, H> {
    pub fn with_missing_handler<H2: MissingMotorHandler>(self, missing: H2) -> DatabaseMotorFinder<D, H2> {
        DatabaseMotorFinder {
            database: self.database,
            missing,
        }
    }

    pub fn database(&self) -> &D {
        &self.database
    }
}

impl<D: MotorDatabase, H: MissingMotorHandler> MotorFinder for DatabaseMotorFinder<D, H> {
    fn find_motor(&self, descriptor: &MotorDescriptor, warnings: &mut WarningSet) -> Option<Motor> {
        let designation = match &descriptor.designation {
            Some(d) => d.clone(),
            None => {
                warnings.add(Warning::NoMotorSpecified);
                return None;
            }
        };

        let mut candidates = self.database.find_motors(descriptor);
        debug!(
            "{} candidate motor(s) for designation {:?}",
            candidates.len(),
            designation
        );

        let differing = || Warning::DifferingThrustCurve {
            designation: designation.clone(),
            manufacturer: descriptor.manufacturer.clone(),
        };

        match candidates.len() {
            0 => self.missing.handle_missing_motor(descriptor, warnings),
            1 => {
                let motor = candidates.remove(0);
                if let Some(digest) = &descriptor.digest {
                    if *digest != motor.digest {
                        warnings.add(differing());
                    }
                }
                Some(motor)
            }
            _ => {
                if let Some(digest) = &descriptor.digest {
                    if let Some(pos) = candidates.iter().position(|m| m.digest == *digest) {
                        return Some(candidates.swap_remove(pos));
                    }
                    warnings.add(differing());
                } else {
                    warnings.add(Warning::MultipleMotors {
                        designation: designation.clone(),
                        manufacturer: descriptor.manufacturer.clone(),
                    });
                }
                Some(candidates.remove(0))
            }
        }
    }
}

impl<F: MotorFinder + ?Sized> MotorFinder for &F {
    fn find_motor(&self, descriptor: &MotorDescriptor, warnings: &mut WarningSet) -> Option<Motor> {
        (**self).find_motor(descriptor, warnings)
    }
}

impl<F: MotorFinder + ?Sized> MotorFinder for std::sync::Arc<F> {
    fn find_motor(&self, descriptor: &MotorDescriptor, warnings: &mut WarningSet) -> Option<Motor> {
        (**self).find_motor(descriptor, warnings)
    }
}
