use std::io::Read;

use super::{Motor, MotorDescriptor};

/// Lookup contract of a motor database.
///
/// Implementations return every candidate for the descriptor, best matches
/// first. Choosing among them is the job of a [`MotorFinder`](super::MotorFinder).
pub trait MotorDatabase {
    fn find_motors(&self, descriptor: &MotorDescriptor) -> Vec<Motor>;
}

/// A flat, in-memory motor database.
#[derive(Debug, Clone, Default)]
pub struct MotorSetDatabase {
    motors: Vec<Motor>,
}

impl MotorSetDatabase {
    pub fn new(motors: Vec<Motor>) -> MotorSetDatabase {
        MotorSetDatabase { motors }
    }

    /// Reads a JSON array of motors.
    pub fn from_json<R: Read>(reader: R) -> serde_json::Result<MotorSetDatabase> {
        let motors: Vec<Motor> = serde_json::from_reader(reader)?;
        Ok(MotorSetDatabase::new(motors))
    }

    pub fn insert(&mut self, motor: Motor) {
        self.motors.push(motor);
    }

    pub fn len(&self) -> usize {
        self.motors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motors.is_empty()
    }
}

impl MotorDatabase for MotorSetDatabase {
    /// Motors matching both description and digest win, then motors matching
    /// the digest alone, then motors matching the description alone.
    fn find_motors(&self, descriptor: &MotorDescriptor) -> Vec<Motor> {
        let mut full = Vec::new();
        let mut by_digest = Vec::new();
        let mut by_description = Vec::new();

        for motor in &self.motors {
            let digest_match = descriptor.digest.as_deref() == Some(motor.digest.as_str());
            let description_match = descriptor.describes(motor);

            if digest_match && description_match {
                full.push(motor.clone());
            }
            if digest_match {
                by_digest.push(motor.clone());
            }
            if description_match {
                by_description.push(motor.clone());
            }
        }

        if !full.is_empty() {
            full
        } else if !by_digest.is_empty() {
            by_digest
        } else {
            by_description
        }
    }
}

impl<D: MotorDatabase + ?Sized> MotorDatabase for std::sync::Arc<D> {
    fn find_motors(&self, descriptor: &MotorDescriptor) -> Vec<Motor> {
        (**self).find_motors(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::tests::motor;

    #[test]
    fn full_match_is_preferred() {
        let db = MotorSetDatabase::new(vec![motor("C6", "A"), motor("C6", "B")]);
        let found = db.find_motors(&MotorDescriptor::designation("C6").with_digest("B"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].digest, "B");
    }

    #[test]
    fn digest_alone_finds_renamed_motor() {
        let db = MotorSetDatabase::new(vec![motor("C6-3", "A"), motor("D12", "B")]);
        let found = db.find_motors(&MotorDescriptor::designation("C6").with_digest("B"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].designation, "D12");
    }

    #[test]
    fn falls_back_to_description() {
        let db = MotorSetDatabase::new(vec![motor("C6", "A"), motor("C6", "B"), motor("D12", "D")]);
        let found = db.find_motors(&MotorDescriptor::designation("C6").with_digest("C"));
        let digests: Vec<&str> = found.iter().map(|m| m.digest.as_str()).collect();
        assert_eq!(digests, vec!["A", "B"]);
    }

    #[test]
    fn reads_json() {
        let json = r#"[{
            "manufacturer": { "name": "Estes", "aliases": ["E"] },
            "designation": "C6",
            "motor_type": "single",
            "diameter": 0.018,
            "length": 0.07,
            "digest": "abc"
        }]"#;
        let db = MotorSetDatabase::from_json(json.as_bytes()).unwrap();
        assert_eq!(db.len(), 1);
        let found = db.find_motors(&MotorDescriptor::designation("C6").with_manufacturer("e"));
        assert_eq!(found.len(), 1);
    }
}
