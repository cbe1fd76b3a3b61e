//! Branch schema descriptors
//!
//! A [`BranchConfig`] names a branch, gives it a numeric id and an entity
//! [`BranchKind`], and lists its fields in declaration order. Every kind
//! comes with builtin fields (negative ids) that map onto dedicated entity
//! members; user fields get non-negative ids allocated per [`FieldType`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

use crate::error::SchemaError;
use crate::field_type::FieldType;
use crate::hash::SchemaHash;

/// Entity kind stored by a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BranchKind {
    /// One record per event (vertex position and event-level quantities)
    EventHeader,
    /// Reconstructed tracks
    Track,
    /// Tracks with particle identification
    Particle,
    /// Detector modules
    Module,
    /// Detector hits
    Hit,
}

/// Builtin field of an entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinField {
    /// Field name
    pub name: &'static str,
    /// Storage type
    pub field_type: FieldType,
    /// Negative field id
    pub id: i16,
    /// Short description
    pub title: &'static str,
}

const fn builtin(name: &'static str, field_type: FieldType, id: i16, title: &'static str) -> BuiltinField {
    BuiltinField {
        name,
        field_type,
        id,
        title,
    }
}

const EVENT_HEADER_FIELDS: &[BuiltinField] = &[
    builtin("vtx_x", FieldType::Float, -1, "x-position of primary vertex"),
    builtin("vtx_y", FieldType::Float, -2, "y-position of primary vertex"),
    builtin("vtx_z", FieldType::Float, -3, "z-position of primary vertex"),
];

const TRACK_FIELDS: &[BuiltinField] = &[
    builtin("px", FieldType::Float, -1, "x-component of momentum"),
    builtin("py", FieldType::Float, -2, "y-component of momentum"),
    builtin("pz", FieldType::Float, -3, "z-component of momentum"),
    builtin("q", FieldType::Integer, -1, "charge"),
];

const PARTICLE_FIELDS: &[BuiltinField] = &[
    builtin("px", FieldType::Float, -1, "x-component of momentum"),
    builtin("py", FieldType::Float, -2, "y-component of momentum"),
    builtin("pz", FieldType::Float, -3, "z-component of momentum"),
    builtin("mass", FieldType::Float, -4, "mass"),
    builtin("q", FieldType::Integer, -1, "charge"),
    builtin("pid", FieldType::Integer, -2, "PDG code"),
];

const MODULE_FIELDS: &[BuiltinField] = &[
    builtin("signal", FieldType::Float, -1, "module signal"),
    builtin("number", FieldType::Integer, -1, "module number"),
];

const HIT_FIELDS: &[BuiltinField] = &[
    builtin("x", FieldType::Float, -1, "x-position"),
    builtin("y", FieldType::Float, -2, "y-position"),
    builtin("z", FieldType::Float, -3, "z-position"),
    builtin("signal", FieldType::Float, -4, "hit signal"),
];

impl BranchKind {
    /// Stable name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EventHeader => "EventHeader",
            Self::Track => "Track",
            Self::Particle => "Particle",
            Self::Module => "Module",
            Self::Hit => "Hit",
        }
    }

    /// Builtin fields carried by every branch of this kind
    #[inline]
    #[must_use]
    pub const fn builtin_fields(self) -> &'static [BuiltinField] {
        match self {
            Self::EventHeader => EVENT_HEADER_FIELDS,
            Self::Track => TRACK_FIELDS,
            Self::Particle => PARTICLE_FIELDS,
            Self::Module => MODULE_FIELDS,
            Self::Hit => HIT_FIELDS,
        }
    }
}

impl Display for BranchKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared field of a branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Id within the field's type; negative for builtins
    pub id: i16,
    /// Storage type
    pub field_type: FieldType,
    /// Free-form description
    #[serde(default)]
    pub title: String,
}

impl FieldSpec {
    /// Builtin fields live in entity members rather than the typed vectors
    #[inline]
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        self.id < 0
    }
}

/// Schema descriptor of one branch
///
/// # Invariants
/// - Field names are unique
/// - User field ids of each type are `0..size_of(type)` in declaration order
/// - Builtin fields of `kind` are always present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchConfig {
    name: String,
    id: usize,
    kind: BranchKind,
    fields: IndexMap<String, FieldSpec>,
}

impl BranchConfig {
    /// Create a schema holding only the builtin fields of `kind`
    #[must_use]
    pub fn new(name: impl Into<String>, id: usize, kind: BranchKind) -> Self {
        let fields = kind
            .builtin_fields()
            .iter()
            .map(|b| {
                (
                    b.name.to_string(),
                    FieldSpec {
                        id: b.id,
                        field_type: b.field_type,
                        title: b.title.to_string(),
                    },
                )
            })
            .collect();
        Self {
            name: name.into(),
            id,
            kind,
            fields,
        }
    }

    /// Branch name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Branch id
    #[inline]
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Entity kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> BranchKind {
        self.kind
    }

    /// Declare a user field
    ///
    /// # Errors
    /// - [`SchemaError::DuplicateField`] if the name is taken
    /// - [`SchemaError::TooManyFields`] if the type's id range is exhausted
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        field_type: FieldType,
        title: impl Into<String>,
    ) -> Result<&FieldSpec, SchemaError> {
        let name = name.into();
        if self.fields.contains_key(&name) {
            return Err(SchemaError::DuplicateField {
                branch: self.name.clone(),
                field: name,
            });
        }
        let id = i16::try_from(self.size_of(field_type)).map_err(|_| SchemaError::TooManyFields {
            branch: self.name.clone(),
            field_type,
        })?;
        let entry = self.fields.entry(name).or_insert(FieldSpec {
            id,
            field_type,
            title: title.into(),
        });
        Ok(entry)
    }

    /// Declare several user fields of one type without titles
    ///
    /// Stops at the first duplicate; earlier fields stay declared.
    ///
    /// # Errors
    /// Returns [`SchemaError::DuplicateField`] on a name clash
    pub fn add_fields(&mut self, field_type: FieldType, names: &[&str]) -> Result<(), SchemaError> {
        for name in names {
            self.add_field(*name, field_type, "")?;
        }
        Ok(())
    }

    /// Check if a field is declared
    #[inline]
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Look up a field
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Field names in declaration order (builtins first)
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Iterate over `(name, spec)` in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// User (non-builtin) fields in declaration order
    pub fn user_fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields().filter(|(_, spec)| !spec.is_builtin())
    }

    /// Number of user fields of a type
    #[must_use]
    pub fn size_of(&self, field_type: FieldType) -> usize {
        self.fields
            .values()
            .filter(|spec| spec.field_type == field_type && !spec.is_builtin())
            .count()
    }

    /// Hash of kind and fields
    ///
    /// Name, id and titles are not part of the hash: two branches with the
    /// same kind and the same fields in the same order hash equal.
    #[must_use]
    pub fn schema_hash(&self) -> SchemaHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.kind.as_str().as_bytes());
        for (name, spec) in &self.fields {
            hasher.update(&[0]);
            hasher.update(name.as_bytes());
            hasher.update(&[0]);
            hasher.update(spec.field_type.as_str().as_bytes());
            hasher.update(&spec.id.to_le_bytes());
        }
        SchemaHash::new(*hasher.finalize().as_bytes())
    }
}

impl Display for BranchConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Branch {} (id={}, kind={})", self.name, self.id, self.kind)?;
        for (name, spec) in &self.fields {
            writeln!(
                f,
                "  {:>5} {:<6} {:<20} {}",
                spec.id, spec.field_type, name, spec.title
            )?;
        }
        Ok(())
    }
}
