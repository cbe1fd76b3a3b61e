//! Entity collections
//!
//! [`EntityCollection`] is the uniform surface of everything a branch can
//! own: a [`Detector`] of many entities, or a single [`EventHeader`].

use atree_core::BranchConfig;
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EventHeader};

/// Collection of entities owned by one branch
pub trait EntityCollection {
    /// Entity type
    type Entity: Entity;

    /// Collection id (the owning branch id)
    fn id(&self) -> usize;

    /// Set the collection id
    fn set_id(&mut self, id: usize);

    /// Number of entries
    fn len(&self) -> usize;

    /// Check if there are no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry at `index`
    fn entity(&self, index: usize) -> Option<&Self::Entity>;

    /// Mutable entry at `index`
    fn entity_mut(&mut self, index: usize) -> Option<&mut Self::Entity>;

    /// Append an entry sized for `config`; returns its index
    fn push_entry(&mut self, config: &BranchConfig) -> usize;

    /// Remove all entries
    fn clear_entries(&mut self, config: &BranchConfig);

    /// Grow or shrink to `len` entries; returns false if the collection has
    /// a fixed size different from `len`
    fn resize_entries(&mut self, len: usize, config: &BranchConfig) -> bool;

    /// Re-size the field storage of every entry after a schema change
    fn reinit_entries(&mut self, config: &BranchConfig);
}

/// Ordered collection of entities of one kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detector<E> {
    id: usize,
    channels: Vec<E>,
}

impl<E: Entity> Detector<E> {
    /// Create an empty detector
    #[inline]
    #[must_use]
    pub fn new(id: usize) -> Self {
        Self {
            id,
            channels: Vec::new(),
        }
    }

    /// All entries
    #[inline]
    #[must_use]
    pub fn channels(&self) -> &[E] {
        &self.channels
    }

    /// Iterate over entries
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.channels.iter()
    }
}

impl<E: Entity> EntityCollection for Detector<E> {
    type Entity = E;

    fn id(&self) -> usize {
        self.id
    }

    fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    fn len(&self) -> usize {
        self.channels.len()
    }

    fn entity(&self, index: usize) -> Option<&E> {
        self.channels.get(index)
    }

    fn entity_mut(&mut self, index: usize) -> Option<&mut E> {
        self.channels.get_mut(index)
    }

    fn push_entry(&mut self, config: &BranchConfig) -> usize {
        let index = self.channels.len();
        let mut entity = E::default();
        entity.container_mut().set_id(index);
        entity.container_mut().init(config);
        self.channels.push(entity);
        index
    }

    fn clear_entries(&mut self, _config: &BranchConfig) {
        self.channels.clear();
    }

    fn resize_entries(&mut self, len: usize, config: &BranchConfig) -> bool {
        self.channels.truncate(len);
        while self.channels.len() < len {
            self.push_entry(config);
        }
        true
    }

    fn reinit_entries(&mut self, config: &BranchConfig) {
        for entity in &mut self.channels {
            entity.container_mut().init(config);
        }
    }
}

impl EntityCollection for EventHeader {
    type Entity = EventHeader;

    fn id(&self) -> usize {
        self.container().id()
    }

    fn set_id(&mut self, id: usize) {
        self.container_mut().set_id(id);
    }

    fn len(&self) -> usize {
        1
    }

    fn entity(&self, index: usize) -> Option<&EventHeader> {
        (index == 0).then_some(self)
    }

    fn entity_mut(&mut self, index: usize) -> Option<&mut EventHeader> {
        if index == 0 {
            Some(self)
        } else {
            None
        }
    }

    fn push_entry(&mut self, config: &BranchConfig) -> usize {
        self.container_mut().init(config);
        0
    }

    fn clear_entries(&mut self, config: &BranchConfig) {
        let id = self.container().id();
        *self = EventHeader::default();
        self.container_mut().set_id(id);
        self.container_mut().init(config);
    }

    fn resize_entries(&mut self, len: usize, config: &BranchConfig) -> bool {
        self.container_mut().init(config);
        len == 1
    }

    fn reinit_entries(&mut self, config: &BranchConfig) {
        self.container_mut().init(config);
    }
}
