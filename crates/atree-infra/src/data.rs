//! Tagged union over the entity collections a branch can own
//!
//! [`BranchData`] is a closed set: every operation dispatches by exhaustive
//! `match`. Generic code reaches the concrete collection through
//! [`BranchVisitor`] / [`BranchVisitorMut`].

use atree_core::{BranchConfig, BranchKind, FieldType, FieldValue};
use serde::{Deserialize, Serialize};

use crate::detector::{Detector, EntityCollection};
use crate::entity::{Entity, EventHeader, Hit, Module, Particle, Track};

/// Operation over a borrowed collection of any kind
pub trait BranchVisitor {
    /// Result type
    type Output;

    /// Visit the concrete collection
    fn visit<C: EntityCollection>(self, collection: &C) -> Self::Output;
}

/// Operation over a mutably borrowed collection of any kind
pub trait BranchVisitorMut {
    /// Result type
    type Output;

    /// Visit the concrete collection
    fn visit_mut<C: EntityCollection>(self, collection: &mut C) -> Self::Output;
}

/// Entity collection owned by a branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BranchData {
    /// Single event header
    EventHeader(EventHeader),
    /// Tracks
    Tracks(Detector<Track>),
    /// Particles
    Particles(Detector<Particle>),
    /// Modules
    Modules(Detector<Module>),
    /// Hits
    Hits(Detector<Hit>),
}

impl BranchData {
    /// Empty collection for a branch of `kind`
    #[must_use]
    pub fn new(kind: BranchKind, id: usize) -> Self {
        match kind {
            BranchKind::EventHeader => {
                let mut header = EventHeader::default();
                header.set_id(id);
                Self::EventHeader(header)
            }
            BranchKind::Track => Self::Tracks(Detector::new(id)),
            BranchKind::Particle => Self::Particles(Detector::new(id)),
            BranchKind::Module => Self::Modules(Detector::new(id)),
            BranchKind::Hit => Self::Hits(Detector::new(id)),
        }
    }

    /// Empty collection sized for `config`
    #[must_use]
    pub fn for_config(config: &BranchConfig) -> Self {
        let mut data = Self::new(config.kind(), config.id());
        data.apply_mut(Reinit { config });
        data
    }

    /// Kind of the owned collection
    #[must_use]
    pub fn kind(&self) -> BranchKind {
        match self {
            Self::EventHeader(_) => EventHeader::KIND,
            Self::Tracks(_) => Track::KIND,
            Self::Particles(_) => Particle::KIND,
            Self::Modules(_) => Module::KIND,
            Self::Hits(_) => Hit::KIND,
        }
    }

    /// Run `visitor` on the concrete collection
    pub fn apply<V: BranchVisitor>(&self, visitor: V) -> V::Output {
        match self {
            Self::EventHeader(c) => visitor.visit(c),
            Self::Tracks(c) => visitor.visit(c),
            Self::Particles(c) => visitor.visit(c),
            Self::Modules(c) => visitor.visit(c),
            Self::Hits(c) => visitor.visit(c),
        }
    }

    /// Run `visitor` on the concrete collection, mutably
    pub fn apply_mut<V: BranchVisitorMut>(&mut self, visitor: V) -> V::Output {
        match self {
            Self::EventHeader(c) => visitor.visit_mut(c),
            Self::Tracks(c) => visitor.visit_mut(c),
            Self::Particles(c) => visitor.visit_mut(c),
            Self::Modules(c) => visitor.visit_mut(c),
            Self::Hits(c) => visitor.visit_mut(c),
        }
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.apply(Len)
    }

    /// Check if there are no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collection id
    #[must_use]
    pub fn id(&self) -> usize {
        self.apply(Id)
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        self.apply_mut(SetId(id));
    }

    /// Read field `(field_type, id)` of entry `index`
    #[must_use]
    pub fn value(&self, index: usize, field_type: FieldType, id: i16) -> Option<FieldValue> {
        self.apply(Read {
            index,
            field_type,
            id,
        })
    }

    /// Write field `id` of entry `index`; the value must carry the field's type
    pub fn set_value(&mut self, index: usize, id: i16, value: FieldValue) -> bool {
        self.apply_mut(Write { index, id, value })
    }

    pub(crate) fn push_entry(&mut self, config: &BranchConfig) -> usize {
        self.apply_mut(Push { config })
    }

    pub(crate) fn clear_entries(&mut self, config: &BranchConfig) {
        self.apply_mut(Clear { config });
    }

    pub(crate) fn resize_entries(&mut self, len: usize, config: &BranchConfig) -> bool {
        self.apply_mut(Resize { len, config })
    }

    pub(crate) fn reinit_entries(&mut self, config: &BranchConfig) {
        self.apply_mut(Reinit { config });
    }
}

struct Len;

impl BranchVisitor for Len {
    type Output = usize;

    fn visit<C: EntityCollection>(self, collection: &C) -> usize {
        collection.len()
    }
}

struct Id;

impl BranchVisitor for Id {
    type Output = usize;

    fn visit<C: EntityCollection>(self, collection: &C) -> usize {
        collection.id()
    }
}

struct SetId(usize);

impl BranchVisitorMut for SetId {
    type Output = ();

    fn visit_mut<C: EntityCollection>(self, collection: &mut C) {
        collection.set_id(self.0);
    }
}

struct Read {
    index: usize,
    field_type: FieldType,
    id: i16,
}

impl BranchVisitor for Read {
    type Output = Option<FieldValue>;

    fn visit<C: EntityCollection>(self, collection: &C) -> Option<FieldValue> {
        collection
            .entity(self.index)
            .and_then(|entity| entity.value(self.field_type, self.id))
    }
}

struct Write {
    index: usize,
    id: i16,
    value: FieldValue,
}

impl BranchVisitorMut for Write {
    type Output = bool;

    fn visit_mut<C: EntityCollection>(self, collection: &mut C) -> bool {
        collection
            .entity_mut(self.index)
            .is_some_and(|entity| entity.set_value(self.id, self.value))
    }
}

struct Push<'a> {
    config: &'a BranchConfig,
}

impl BranchVisitorMut for Push<'_> {
    type Output = usize;

    fn visit_mut<C: EntityCollection>(self, collection: &mut C) -> usize {
        collection.push_entry(self.config)
    }
}

struct Clear<'a> {
    config: &'a BranchConfig,
}

impl BranchVisitorMut for Clear<'_> {
    type Output = ();

    fn visit_mut<C: EntityCollection>(self, collection: &mut C) {
        collection.clear_entries(self.config);
    }
}

struct Resize<'a> {
    len: usize,
    config: &'a BranchConfig,
}

impl BranchVisitorMut for Resize<'_> {
    type Output = bool;

    fn visit_mut<C: EntityCollection>(self, collection: &mut C) -> bool {
        collection.resize_entries(self.len, self.config)
    }
}

struct Reinit<'a> {
    config: &'a BranchConfig,
}

impl BranchVisitorMut for Reinit<'_> {
    type Output = ();

    fn visit_mut<C: EntityCollection>(self, collection: &mut C) {
        collection.reinit_entries(self.config);
    }
}
