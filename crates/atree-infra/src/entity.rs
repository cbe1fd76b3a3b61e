//! Entity records stored in branches
//!
//! Every entity owns a [`Container`] holding the user fields declared in the
//! branch schema (one vector per [`FieldType`], indexed by field id) plus
//! the builtin members of its kind, addressed by negative field ids.

use atree_core::{BranchConfig, BranchKind, FieldType, FieldValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Typed storage of the user fields of one entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    id: usize,
    floats: Vec<f32>,
    ints: Vec<i32>,
    bools: Vec<bool>,
}

impl Container {
    /// Create an empty container
    #[inline]
    #[must_use]
    pub fn new(id: usize) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Entry id
    #[inline]
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Set the entry id
    #[inline]
    pub fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    /// Size storage for the user fields of `config`, keeping existing values
    pub fn init(&mut self, config: &BranchConfig) {
        self.floats.resize(config.size_of(FieldType::Float), 0.0);
        self.ints.resize(config.size_of(FieldType::Integer), 0);
        self.bools.resize(config.size_of(FieldType::Boolean), false);
    }

    /// Value of user field `id`
    #[must_use]
    pub fn value(&self, field_type: FieldType, id: i16) -> Option<FieldValue> {
        let idx = usize::try_from(id).ok()?;
        match field_type {
            FieldType::Float => self.floats.get(idx).copied().map(FieldValue::Float),
            FieldType::Integer => self.ints.get(idx).copied().map(FieldValue::Integer),
            FieldType::Boolean => self.bools.get(idx).copied().map(FieldValue::Boolean),
        }
    }

    /// Store a value into user field `id`; returns false if there is no slot
    pub fn set_value(&mut self, id: i16, value: FieldValue) -> bool {
        let Ok(idx) = usize::try_from(id) else {
            return false;
        };
        let slot = match value {
            FieldValue::Float(v) => self.floats.get_mut(idx).map(|s| *s = v),
            FieldValue::Integer(v) => self.ints.get_mut(idx).map(|s| *s = v),
            FieldValue::Boolean(v) => self.bools.get_mut(idx).map(|s| *s = v),
        };
        slot.is_some()
    }
}

/// A record type that can be stored in a branch
pub trait Entity: Debug + Clone + Default + PartialEq + Serialize + DeserializeOwned {
    /// Branch kind storing this entity
    const KIND: BranchKind;

    /// User field storage
    fn container(&self) -> &Container;

    /// Mutable user field storage
    fn container_mut(&mut self) -> &mut Container;

    /// Value of builtin field `id` (negative)
    fn builtin(&self, field_type: FieldType, id: i16) -> Option<FieldValue>;

    /// Store a builtin field; returns false if `id` is not a builtin of this kind
    fn set_builtin(&mut self, id: i16, value: FieldValue) -> bool;

    /// Value of any field
    fn value(&self, field_type: FieldType, id: i16) -> Option<FieldValue> {
        if id < 0 {
            self.builtin(field_type, id)
        } else {
            self.container().value(field_type, id)
        }
    }

    /// Store any field; the value must already have the field's type
    fn set_value(&mut self, id: i16, value: FieldValue) -> bool {
        if id < 0 {
            self.set_builtin(id, value)
        } else {
            self.container_mut().set_value(id, value)
        }
    }
}

/// Event-level record (primary vertex)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventHeader {
    container: Container,
    vertex: [f32; 3],
}

impl EventHeader {
    /// Primary vertex position
    #[inline]
    #[must_use]
    pub fn vertex(&self) -> [f32; 3] {
        self.vertex
    }

    /// Set primary vertex position
    #[inline]
    pub fn set_vertex(&mut self, x: f32, y: f32, z: f32) {
        self.vertex = [x, y, z];
    }
}

impl Entity for EventHeader {
    const KIND: BranchKind = BranchKind::EventHeader;

    fn container(&self) -> &Container {
        &self.container
    }

    fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    fn builtin(&self, field_type: FieldType, id: i16) -> Option<FieldValue> {
        match (field_type, id) {
            (FieldType::Float, -3..=-1) => Some(FieldValue::Float(self.vertex[vector_slot(id)])),
            _ => None,
        }
    }

    fn set_builtin(&mut self, id: i16, value: FieldValue) -> bool {
        match (value, id) {
            (FieldValue::Float(v), -3..=-1) => {
                self.vertex[vector_slot(id)] = v;
                true
            }
            _ => false,
        }
    }
}

/// Reconstructed track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    container: Container,
    momentum: [f32; 3],
    charge: i32,
}

impl Track {
    /// Momentum vector
    #[inline]
    #[must_use]
    pub fn momentum(&self) -> [f32; 3] {
        self.momentum
    }

    /// Set momentum vector
    #[inline]
    pub fn set_momentum(&mut self, px: f32, py: f32, pz: f32) {
        self.momentum = [px, py, pz];
    }

    /// Electric charge
    #[inline]
    #[must_use]
    pub fn charge(&self) -> i32 {
        self.charge
    }

    /// Set electric charge
    #[inline]
    pub fn set_charge(&mut self, charge: i32) {
        self.charge = charge;
    }
}

impl Entity for Track {
    const KIND: BranchKind = BranchKind::Track;

    fn container(&self) -> &Container {
        &self.container
    }

    fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    fn builtin(&self, field_type: FieldType, id: i16) -> Option<FieldValue> {
        match (field_type, id) {
            (FieldType::Float, -3..=-1) => Some(FieldValue::Float(self.momentum[vector_slot(id)])),
            (FieldType::Integer, -1) => Some(FieldValue::Integer(self.charge)),
            _ => None,
        }
    }

    fn set_builtin(&mut self, id: i16, value: FieldValue) -> bool {
        match (value, id) {
            (FieldValue::Float(v), -3..=-1) => self.momentum[vector_slot(id)] = v,
            (FieldValue::Integer(v), -1) => self.charge = v,
            _ => return false,
        }
        true
    }
}

/// Identified particle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    container: Container,
    momentum: [f32; 3],
    mass: f32,
    charge: i32,
    pid: i32,
}

impl Particle {
    /// Momentum vector
    #[inline]
    #[must_use]
    pub fn momentum(&self) -> [f32; 3] {
        self.momentum
    }

    /// Set momentum vector
    #[inline]
    pub fn set_momentum(&mut self, px: f32, py: f32, pz: f32) {
        self.momentum = [px, py, pz];
    }

    /// Mass
    #[inline]
    #[must_use]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// PDG code
    #[inline]
    #[must_use]
    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// Set PDG code and mass together
    #[inline]
    pub fn set_identity(&mut self, pid: i32, mass: f32) {
        self.pid = pid;
        self.mass = mass;
    }
}

impl Entity for Particle {
    const KIND: BranchKind = BranchKind::Particle;

    fn container(&self) -> &Container {
        &self.container
    }

    fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    fn builtin(&self, field_type: FieldType, id: i16) -> Option<FieldValue> {
        match (field_type, id) {
            (FieldType::Float, -3..=-1) => Some(FieldValue::Float(self.momentum[vector_slot(id)])),
            (FieldType::Float, -4) => Some(FieldValue::Float(self.mass)),
            (FieldType::Integer, -1) => Some(FieldValue::Integer(self.charge)),
            (FieldType::Integer, -2) => Some(FieldValue::Integer(self.pid)),
            _ => None,
        }
    }

    fn set_builtin(&mut self, id: i16, value: FieldValue) -> bool {
        match (value, id) {
            (FieldValue::Float(v), -3..=-1) => self.momentum[vector_slot(id)] = v,
            (FieldValue::Float(v), -4) => self.mass = v,
            (FieldValue::Integer(v), -1) => self.charge = v,
            (FieldValue::Integer(v), -2) => self.pid = v,
            _ => return false,
        }
        true
    }
}

/// Detector module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    container: Container,
    signal: f32,
    number: i32,
}

impl Module {
    /// Module signal
    #[inline]
    #[must_use]
    pub fn signal(&self) -> f32 {
        self.signal
    }

    /// Module number
    #[inline]
    #[must_use]
    pub fn number(&self) -> i32 {
        self.number
    }
}

impl Entity for Module {
    const KIND: BranchKind = BranchKind::Module;

    fn container(&self) -> &Container {
        &self.container
    }

    fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    fn builtin(&self, field_type: FieldType, id: i16) -> Option<FieldValue> {
        match (field_type, id) {
            (FieldType::Float, -1) => Some(FieldValue::Float(self.signal)),
            (FieldType::Integer, -1) => Some(FieldValue::Integer(self.number)),
            _ => None,
        }
    }

    fn set_builtin(&mut self, id: i16, value: FieldValue) -> bool {
        match (value, id) {
            (FieldValue::Float(v), -1) => self.signal = v,
            (FieldValue::Integer(v), -1) => self.number = v,
            _ => return false,
        }
        true
    }
}

/// Detector hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    container: Container,
    position: [f32; 3],
    signal: f32,
}

impl Hit {
    /// Hit position
    #[inline]
    #[must_use]
    pub fn position(&self) -> [f32; 3] {
        self.position
    }

    /// Hit signal
    #[inline]
    #[must_use]
    pub fn signal(&self) -> f32 {
        self.signal
    }
}

impl Entity for Hit {
    const KIND: BranchKind = BranchKind::Hit;

    fn container(&self) -> &Container {
        &self.container
    }

    fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    fn builtin(&self, field_type: FieldType, id: i16) -> Option<FieldValue> {
        match (field_type, id) {
            (FieldType::Float, -3..=-1) => Some(FieldValue::Float(self.position[vector_slot(id)])),
            (FieldType::Float, -4) => Some(FieldValue::Float(self.signal)),
            _ => None,
        }
    }

    fn set_builtin(&mut self, id: i16, value: FieldValue) -> bool {
        match (value, id) {
            (FieldValue::Float(v), -3..=-1) => self.position[vector_slot(id)] = v,
            (FieldValue::Float(v), -4) => self.signal = v,
            _ => return false,
        }
        true
    }
}

/// Index into a 3-vector for builtin ids -1, -2, -3
#[inline]
fn vector_slot(id: i16) -> usize {
    usize::from(id.unsigned_abs()) - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_sized_from_config() {
        let mut config = BranchConfig::new("tracks", 1, BranchKind::Track);
        config.add_fields(FieldType::Float, &["chi2", "dca"]).unwrap();
        config.add_fields(FieldType::Boolean, &["good"]).unwrap();

        let mut container = Container::new(4);
        container.init(&config);
        assert_eq!(container.value(FieldType::Float, 1), Some(FieldValue::Float(0.0)));
        assert_eq!(container.value(FieldType::Boolean, 0), Some(FieldValue::Boolean(false)));
        assert_eq!(container.value(FieldType::Integer, 0), None);
        assert_eq!(container.id(), 4);
    }

    #[test]
    fn container_init_keeps_values() {
        let mut config = BranchConfig::new("hits", 2, BranchKind::Hit);
        config.add_fields(FieldType::Integer, &["layer"]).unwrap();
        let mut container = Container::new(0);
        container.init(&config);
        assert!(container.set_value(0, FieldValue::Integer(7)));

        config.add_fields(FieldType::Integer, &["station"]).unwrap();
        container.init(&config);
        assert_eq!(container.value(FieldType::Integer, 0), Some(FieldValue::Integer(7)));
        assert_eq!(container.value(FieldType::Integer, 1), Some(FieldValue::Integer(0)));
    }

    #[test]
    fn container_rejects_missing_slot() {
        let mut container = Container::new(0);
        assert!(!container.set_value(0, FieldValue::Float(1.0)));
        assert!(!container.set_value(-1, FieldValue::Float(1.0)));
    }

    #[test]
    fn track_builtins() {
        let mut track = Track::default();
        assert!(track.set_value(-2, FieldValue::Float(1.5)));
        assert!(track.set_value(-1, FieldValue::Integer(-1)));
        assert_eq!(track.momentum(), [0.0, 1.5, 0.0]);
        assert_eq!(track.value(FieldType::Integer, -1), Some(FieldValue::Integer(-1)));
        assert!(!track.set_value(-4, FieldValue::Float(0.1)));
    }

    #[test]
    fn particle_builtins_match_schema() {
        let config = BranchConfig::new("sim", 3, BranchKind::Particle);
        let mut particle = Particle::default();
        particle.set_identity(211, 0.139);
        for (name, spec) in config.fields() {
            assert!(
                particle.value(spec.field_type, spec.id).is_some(),
                "builtin {name} not readable"
            );
        }
        assert_eq!(particle.value(FieldType::Integer, -2), Some(FieldValue::Integer(211)));
    }

    #[test]
    fn every_kind_exposes_its_builtins() {
        fn check<E: Entity>() {
            let config = BranchConfig::new("b", 0, E::KIND);
            let mut entity = E::default();
            for (name, spec) in config.fields() {
                let value = FieldValue::from_f64(spec.field_type, 3.0);
                assert!(entity.set_value(spec.id, value), "{name} not writable");
                assert_eq!(entity.value(spec.field_type, spec.id), Some(value));
            }
        }
        check::<EventHeader>();
        check::<Track>();
        check::<Particle>();
        check::<Module>();
        check::<Hit>();
    }
}
