//! Runtime branch
//!
//! A [`Branch`] owns one entity collection ([`BranchData`]) and the schema
//! describing it. It gates schema changes behind the frozen flag and value
//! writes behind the mutable flag, keeps a schema hash for compatibility
//! checks, and caches the field correspondences used to copy entries from
//! other branches.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use atree_core::{name_hash, BranchConfig, BranchKind, FieldType, FieldValue, SchemaError, SchemaHash};

use crate::channel::{BranchChannel, BranchChannelMut};
use crate::data::{BranchData, BranchVisitor, BranchVisitorMut};
use crate::error::BranchError;
use crate::field::Field;
use crate::session::ConfigHandle;
use crate::store::{StoreError, TreeReader, TreeWriter};

/// Ordered `(source, destination)` field pairs for copying between two branches
///
/// Stamped with the schema hashes it was built from; a mapping whose stamps
/// no longer match is rebuilt before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldsMapping {
    source_hash: SchemaHash,
    target_hash: SchemaHash,
    field_pairs: Vec<(Field, Field)>,
}

impl FieldsMapping {
    /// Matched `(source, destination)` pairs, in source schema order
    #[inline]
    #[must_use]
    pub fn field_pairs(&self) -> &[(Field, Field)] {
        &self.field_pairs
    }

    /// Number of matched fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.field_pairs.len()
    }

    /// Check if no field matched
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.field_pairs.is_empty()
    }

    fn is_current(&self, source_hash: SchemaHash, target_hash: SchemaHash) -> bool {
        self.source_hash == source_hash && self.target_hash == target_hash
    }
}

/// Schema-described container of entity records
#[derive(Debug)]
pub struct Branch {
    config: BranchConfig,
    data: BranchData,
    config_hash: SchemaHash,
    is_mutable: bool,
    is_frozen: bool,
    is_connected_to_input: bool,
    is_connected_to_output: bool,
    parent_config: Option<ConfigHandle>,
    copy_fields_mapping: HashMap<String, FieldsMapping>,
}

impl Branch {
    /// Create a branch with an empty collection of the configured kind
    #[must_use]
    pub fn new(config: BranchConfig) -> Self {
        let data = BranchData::for_config(&config);
        Self::from_parts(config, data)
    }

    /// Create a branch adopting an existing collection
    ///
    /// # Errors
    /// Returns [`BranchError::KindMismatch`] if `data` holds another kind
    pub fn with_data(config: BranchConfig, mut data: BranchData) -> Result<Self, BranchError> {
        if data.kind() != config.kind() {
            return Err(BranchError::KindMismatch {
                branch: config.name().to_string(),
                expected: config.kind(),
                actual: data.kind(),
            });
        }
        data.set_id(config.id());
        data.reinit_entries(&config);
        Ok(Self::from_parts(config, data))
    }

    fn from_parts(config: BranchConfig, data: BranchData) -> Self {
        let config_hash = config.schema_hash();
        Self {
            config,
            data,
            config_hash,
            is_mutable: false,
            is_frozen: false,
            is_connected_to_input: false,
            is_connected_to_output: false,
            parent_config: None,
            copy_fields_mapping: HashMap::new(),
        }
    }

    /* Accessors */

    /// Branch name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.config.name()
    }

    /// Entity kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> BranchKind {
        self.config.kind()
    }

    /// Branch id
    #[inline]
    #[must_use]
    pub fn id(&self) -> usize {
        self.data.id()
    }

    /// Current schema
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BranchConfig {
        &self.config
    }

    /// Owned collection
    #[inline]
    #[must_use]
    pub fn data(&self) -> &BranchData {
        &self.data
    }

    /// Session whose configuration this branch was created from
    #[inline]
    #[must_use]
    pub fn parent_config(&self) -> Option<ConfigHandle> {
        self.parent_config
    }

    pub(crate) fn set_parent_config(&mut self, handle: ConfigHandle) {
        self.parent_config = Some(handle);
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if there are no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /* State */

    /// Check if the schema is frozen
    #[inline]
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.is_frozen
    }

    /// Check if values may be written
    #[inline]
    #[must_use]
    pub fn is_mutable(&self) -> bool {
        self.is_mutable
    }

    /// Check if attached to an input store
    #[inline]
    #[must_use]
    pub fn is_connected_to_input(&self) -> bool {
        self.is_connected_to_input
    }

    /// Check if attached to an output store
    #[inline]
    #[must_use]
    pub fn is_connected_to_output(&self) -> bool {
        self.is_connected_to_output
    }

    /// Freeze or unfreeze the schema
    pub fn freeze(&mut self, freeze: bool) {
        tracing::debug!(branch = self.name(), freeze, "branch freeze state changed");
        self.is_frozen = freeze;
    }

    /// Allow or forbid value writes
    pub fn set_mutable(&mut self, is_mutable: bool) {
        self.is_mutable = is_mutable;
    }

    /// Fail unless the frozen flag equals `expected`
    ///
    /// # Errors
    /// Returns [`BranchError::BranchState`]
    pub fn check_frozen(&self, expected: bool) -> Result<(), BranchError> {
        if self.is_frozen == expected {
            return Ok(());
        }
        Err(BranchError::state(
            self.name(),
            if expected { "branch is not frozen" } else { "branch is frozen" },
        ))
    }

    /// Fail unless the mutable flag equals `expected`
    ///
    /// # Errors
    /// Returns [`BranchError::BranchState`]
    pub fn check_mutable(&self, expected: bool) -> Result<(), BranchError> {
        if self.is_mutable == expected {
            return Ok(());
        }
        Err(BranchError::state(
            self.name(),
            if expected { "branch is not mutable" } else { "branch is mutable" },
        ))
    }

    /* Entries */

    /// Append an entry and return a writable view of it
    ///
    /// # Errors
    /// Returns [`BranchError::BranchState`] if the branch is not mutable
    pub fn new_channel(&mut self) -> Result<BranchChannelMut<'_>, BranchError> {
        self.check_mutable(true)?;
        let index = self.data.push_entry(&self.config);
        Ok(BranchChannelMut::new(self, index))
    }

    /// Remove all entries, keeping schema and resolved fields valid
    ///
    /// # Errors
    /// Returns [`BranchError::BranchState`] if the branch is not mutable
    pub fn clear_channels(&mut self) -> Result<(), BranchError> {
        self.check_mutable(true)?;
        self.data.clear_entries(&self.config);
        Ok(())
    }

    /// Read-only view of entry `index`
    ///
    /// # Errors
    /// Returns [`BranchError::ChannelOutOfRange`]
    pub fn channel(&self, index: usize) -> Result<BranchChannel<'_>, BranchError> {
        self.check_index(index)?;
        Ok(BranchChannel::new(self, index))
    }

    /// Writable view of entry `index`
    ///
    /// # Errors
    /// Returns [`BranchError::ChannelOutOfRange`]
    pub fn channel_mut(&mut self, index: usize) -> Result<BranchChannelMut<'_>, BranchError> {
        self.check_index(index)?;
        Ok(BranchChannelMut::new(self, index))
    }

    /// Iterate over read-only views of all entries
    pub fn channels(&self) -> impl Iterator<Item = BranchChannel<'_>> {
        (0..self.len()).map(move |index| BranchChannel::new(self, index))
    }

    /* Schema */

    /// Declare a new field at runtime; existing entries get a default value
    ///
    /// # Errors
    /// - [`BranchError::BranchState`] if the branch is frozen
    /// - [`SchemaError::DuplicateField`] if the name exists
    pub fn new_variable(&mut self, field_name: &str, field_type: FieldType) -> Result<Field, BranchError> {
        self.check_frozen(false)?;
        self.config.add_field(field_name, field_type, "")?;
        self.data.reinit_entries(&self.config);
        self.update_config_hash();
        self.field(field_name)
    }

    /// Declare every user field of `other` missing here; returns how many were added
    ///
    /// # Errors
    /// Returns [`BranchError::BranchState`] if the branch is frozen
    pub fn clone_variables(&mut self, other: &BranchConfig) -> Result<usize, BranchError> {
        self.check_frozen(false)?;
        let mut added = 0;
        for (name, spec) in other.user_fields() {
            if self.config.has_field(name) {
                continue;
            }
            self.config.add_field(name, spec.field_type, spec.title.clone())?;
            added += 1;
        }
        if added > 0 {
            self.data.reinit_entries(&self.config);
            self.update_config_hash();
        }
        Ok(added)
    }

    /// Resolve a field of this branch
    ///
    /// # Errors
    /// Returns [`SchemaError::FieldNotFound`]
    pub fn field(&self, field_name: &str) -> Result<Field, BranchError> {
        let mut field = Field::new(self.name(), field_name);
        field.init(&self.config)?;
        Ok(field)
    }

    /// Resolve several fields at once, positionally matching `names`
    ///
    /// ```rust
    /// # use atree_core::{BranchConfig, BranchKind};
    /// # use atree_infra::Branch;
    /// let branch = Branch::new(BranchConfig::new("tracks", 1, BranchKind::Track));
    /// let [px, py] = branch.vars(["px", "py"]).unwrap();
    /// assert_eq!(py.name(), "py");
    /// # let _ = px;
    /// ```
    ///
    /// # Errors
    /// Returns the first [`SchemaError::FieldNotFound`]
    pub fn vars<const N: usize>(&self, names: [&str; N]) -> Result<[Field; N], BranchError> {
        let fields = names
            .into_iter()
            .map(|name| self.field(name))
            .collect::<Result<Vec<_>, _>>()?;
        <[Field; N]>::try_from(fields).map_err(|fields: Vec<Field>| {
            BranchError::state(self.name(), format!("resolved {} of {N} fields", fields.len()))
        })
    }

    /// Resolve caller-owned fields by name
    ///
    /// With `ignore_missing`, names absent from the schema are skipped and
    /// their fields stay untouched.
    ///
    /// # Errors
    /// Returns [`SchemaError::FieldNotFound`] unless `ignore_missing`
    pub fn use_fields(&self, vars: &mut [(&str, &mut Field)], ignore_missing: bool) -> Result<(), BranchError> {
        for (name, field) in vars.iter_mut() {
            let name: &str = name;
            if ignore_missing && !self.has_field(name) {
                tracing::warn!(branch = self.name(), field = name, "field not found, skipped");
                continue;
            }
            **field = self.field(name)?;
        }
        Ok(())
    }

    /// Check if a field is declared
    #[inline]
    #[must_use]
    pub fn has_field(&self, field_name: &str) -> bool {
        self.config.has_field(field_name)
    }

    /// Declared field names (builtins first)
    #[inline]
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.config.field_names()
    }

    /* Copying */

    /// Replace all entries with a verbatim copy of `other`'s entries
    ///
    /// # Errors
    /// - [`BranchError::BranchState`] if this branch is not mutable
    /// - [`BranchError::SchemaMismatch`] if the schema hashes differ
    pub fn copy_contents_raw(&mut self, other: &Branch) -> Result<(), BranchError> {
        self.check_mutable(true)?;
        if self.config_hash != other.config_hash {
            return Err(BranchError::SchemaMismatch {
                branch: self.name().to_string(),
                other: other.name().to_string(),
            });
        }
        let mut data = other.data.clone();
        data.set_id(self.config.id());
        self.data = data;
        Ok(())
    }

    /// Compute and cache the field correspondence from `other` to this branch
    ///
    /// Fields are matched by name; fields present on only one side are
    /// left out.
    ///
    /// # Errors
    /// Returns error if a matched field fails to resolve
    pub fn create_mapping(&mut self, other: &Branch) -> Result<&FieldsMapping, BranchError> {
        let mapping = self.build_mapping(other)?;
        let slot = match self.copy_fields_mapping.entry(other.name().to_string()) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(mapping);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(mapping),
        };
        Ok(slot)
    }

    /// Cached mapping from the branch called `other`
    #[inline]
    #[must_use]
    pub fn mapping_for(&self, other: &str) -> Option<&FieldsMapping> {
        self.copy_fields_mapping.get(other)
    }

    fn build_mapping(&self, other: &Branch) -> Result<FieldsMapping, BranchError> {
        let mut field_pairs = Vec::new();
        for (name, _) in other.config.fields() {
            if !self.config.has_field(name) {
                continue;
            }
            field_pairs.push((other.field(name)?, self.field(name)?));
        }
        tracing::debug!(
            from = other.name(),
            to = self.name(),
            matched = field_pairs.len(),
            source_hash = %other.config_hash.short(),
            target_hash = %self.config_hash.short(),
            "fields mapping created"
        );
        Ok(FieldsMapping {
            source_hash: other.config_hash,
            target_hash: self.config_hash,
            field_pairs,
        })
    }

    /// Copy the name-matched fields of every entry of `other`
    ///
    /// This branch is resized to `other`'s entry count. Fields without a
    /// counterpart keep their values in entries that already existed.
    ///
    /// # Errors
    /// - [`BranchError::BranchState`] if this branch is not mutable
    /// - [`BranchError::SelfCopy`] if `other` has the same name
    /// - [`BranchError::KindMismatch`] if an event header would need more
    ///   than one entry
    pub fn copy_contents(&mut self, other: &Branch) -> Result<(), BranchError> {
        self.check_mutable(true)?;
        if other.name() == self.name() {
            return Err(BranchError::SelfCopy(self.name().to_string()));
        }
        let mapping = match self.copy_fields_mapping.remove(other.name()) {
            Some(mapping) if mapping.is_current(other.config_hash, self.config_hash) => mapping,
            _ => self.build_mapping(other)?,
        };
        let result = self.copy_mapped(other, &mapping);
        self.copy_fields_mapping
            .insert(other.name().to_string(), mapping);
        result
    }

    fn copy_mapped(&mut self, other: &Branch, mapping: &FieldsMapping) -> Result<(), BranchError> {
        if !self.data.resize_entries(other.len(), &self.config) {
            return Err(BranchError::KindMismatch {
                branch: self.name().to_string(),
                expected: self.kind(),
                actual: other.kind(),
            });
        }
        for index in 0..other.len() {
            let source = BranchChannel::new(other, index);
            BranchChannelMut::new(self, index).copy_from(&source, mapping)?;
        }
        Ok(())
    }

    /* Hashing */

    /// Recompute the schema hash after a schema change
    pub fn update_config_hash(&mut self) {
        self.config_hash = self.config.schema_hash();
    }

    /// Schema hash
    #[inline]
    #[must_use]
    pub fn config_hash(&self) -> SchemaHash {
        self.config_hash
    }

    /// Short identity hash of the branch name
    #[inline]
    #[must_use]
    pub fn hash(&self) -> u16 {
        name_hash(self.name())
    }

    /* Dispatch */

    /// Run `visitor` on the owned collection
    pub fn apply<V: BranchVisitor>(&self, visitor: V) -> V::Output {
        self.data.apply(visitor)
    }

    /// Run `visitor` on the owned collection, mutably
    ///
    /// # Errors
    /// Returns [`BranchError::BranchState`] if the branch is not mutable
    pub fn apply_mut<V: BranchVisitorMut>(&mut self, visitor: V) -> Result<V::Output, BranchError> {
        self.check_mutable(true)?;
        Ok(self.data.apply_mut(visitor))
    }

    /* Store connection */

    /// Attach to an output store
    ///
    /// # Errors
    /// Returns the store's error if it refuses the branch
    pub fn connect_output_tree(&mut self, tree: &mut dyn TreeWriter) -> Result<(), BranchError> {
        tree.attach(&self.config)?;
        tracing::debug!(branch = self.name(), "connected to output tree");
        self.is_connected_to_output = true;
        Ok(())
    }

    /// Write the current entries as one store entry
    ///
    /// # Errors
    /// Returns [`BranchError::BranchState`] if not connected to an output
    pub fn fill(&self, tree: &mut dyn TreeWriter) -> Result<(), BranchError> {
        if !self.is_connected_to_output {
            return Err(BranchError::state(self.name(), "branch is not connected to output"));
        }
        tree.write_entry(self.name(), &self.data)?;
        Ok(())
    }

    /// Attach to an input store holding this branch
    ///
    /// # Errors
    /// - [`StoreError::UnknownBranch`] if the store lacks the branch
    /// - [`BranchError::KindMismatch`] if the store holds another kind
    pub fn connect_input_tree(&mut self, tree: &dyn TreeReader) -> Result<(), BranchError> {
        let stored = tree.branch_kind(self.name())?;
        if stored != self.kind() {
            return Err(BranchError::KindMismatch {
                branch: self.name().to_string(),
                expected: self.kind(),
                actual: stored,
            });
        }
        tracing::debug!(branch = self.name(), "connected to input tree");
        self.is_connected_to_input = true;
        Ok(())
    }

    /// Replace the entries with store entry `entry`
    ///
    /// # Errors
    /// Returns [`BranchError::BranchState`] if not connected to an input, or
    /// the store's error
    pub fn read_entry(&mut self, tree: &dyn TreeReader, entry: usize) -> Result<(), BranchError> {
        if !self.is_connected_to_input {
            return Err(BranchError::state(self.name(), "branch is not connected to input"));
        }
        let mut data = tree.read_entry(self.name(), entry)?;
        if data.kind() != self.kind() {
            return Err(StoreError::KindMismatch {
                branch: self.name().to_string(),
                expected: self.kind(),
                actual: data.kind(),
            }
            .into());
        }
        data.set_id(self.config.id());
        data.reinit_entries(&self.config);
        self.data = data;
        Ok(())
    }

    /* Value access for channels */

    fn check_index(&self, index: usize) -> Result<(), BranchError> {
        let len = self.len();
        if index < len {
            Ok(())
        } else {
            Err(BranchError::ChannelOutOfRange {
                branch: self.name().to_string(),
                index,
                len,
            })
        }
    }

    fn check_field(&self, field: &Field) -> Result<(), BranchError> {
        if field.branch_name() == self.name() {
            Ok(())
        } else {
            Err(BranchError::ForeignField {
                field: field.name().to_string(),
                field_branch: field.branch_name().to_string(),
                branch: self.name().to_string(),
            })
        }
    }

    fn missing_field(&self, field: &Field) -> BranchError {
        SchemaError::FieldNotFound {
            branch: self.name().to_string(),
            field: field.name().to_string(),
        }
        .into()
    }

    pub(crate) fn read_value(&self, index: usize, field: &Field) -> Result<FieldValue, BranchError> {
        self.check_field(field)?;
        let binding = field.binding()?;
        self.check_index(index)?;
        self.data
            .value(index, binding.field_type, binding.id)
            .ok_or_else(|| self.missing_field(field))
    }

    pub(crate) fn write_value(&mut self, index: usize, field: &Field, value: FieldValue) -> Result<(), BranchError> {
        self.check_mutable(true)?;
        self.check_field(field)?;
        let binding = field.binding()?;
        if value.field_type() != binding.field_type {
            return Err(BranchError::TypeMismatch {
                field: field.name().to_string(),
                expected: binding.field_type,
                actual: value.field_type(),
            });
        }
        self.check_index(index)?;
        if self.data.set_value(index, binding.id, value) {
            Ok(())
        } else {
            Err(self.missing_field(field))
        }
    }
}
