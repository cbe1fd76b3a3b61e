//! Named field handles
//!
//! A [`Field`] starts out holding only a branch name and a field name. It
//! becomes usable once [`Field::init`] binds it to the field's type and id
//! in a [`BranchConfig`]; the binding never changes afterwards.

use atree_core::{BranchConfig, FieldType, SchemaError};

use crate::error::BranchError;

/// Storage location of a resolved field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldBinding {
    /// Storage type
    pub field_type: FieldType,
    /// Id within the type (negative for builtins)
    pub id: i16,
}

/// Handle to one named field of a branch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    branch_name: String,
    field_name: String,
    binding: Option<FieldBinding>,
}

impl Field {
    /// Create an unresolved field
    #[inline]
    #[must_use]
    pub fn new(branch_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            branch_name: branch_name.into(),
            field_name: field_name.into(),
            binding: None,
        }
    }

    /// Resolve against the schema of the field's branch
    ///
    /// A field that is already resolved keeps its binding.
    ///
    /// # Errors
    /// - [`BranchError::ForeignField`] if `config` describes another branch
    /// - [`SchemaError::FieldNotFound`] if the name is not declared
    pub fn init(&mut self, config: &BranchConfig) -> Result<(), BranchError> {
        if config.name() != self.branch_name {
            return Err(BranchError::ForeignField {
                field: self.field_name.clone(),
                field_branch: self.branch_name.clone(),
                branch: config.name().to_string(),
            });
        }
        if self.binding.is_some() {
            return Ok(());
        }
        let spec = config
            .field(&self.field_name)
            .ok_or_else(|| SchemaError::FieldNotFound {
                branch: self.branch_name.clone(),
                field: self.field_name.clone(),
            })?;
        self.binding = Some(FieldBinding {
            field_type: spec.field_type,
            id: spec.id,
        });
        Ok(())
    }

    /// Field name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.field_name
    }

    /// Name of the branch this field belongs to
    #[inline]
    #[must_use]
    pub fn branch_name(&self) -> &str {
        &self.branch_name
    }

    /// Check if [`Field::init`] succeeded
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.binding.is_some()
    }

    /// Storage location
    ///
    /// # Errors
    /// Returns [`BranchError::UnresolvedField`] before resolution
    pub fn binding(&self) -> Result<FieldBinding, BranchError> {
        self.binding.ok_or_else(|| BranchError::UnresolvedField {
            branch: self.branch_name.clone(),
            field: self.field_name.clone(),
        })
    }

    /// Storage type
    ///
    /// # Errors
    /// Returns [`BranchError::UnresolvedField`] before resolution
    pub fn field_type(&self) -> Result<FieldType, BranchError> {
        self.binding().map(|b| b.field_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atree_core::BranchKind;

    fn config() -> BranchConfig {
        let mut config = BranchConfig::new("tracks", 1, BranchKind::Track);
        config.add_field("chi2", FieldType::Float, "").unwrap();
        config.add_field("nhits", FieldType::Integer, "").unwrap();
        config
    }

    #[test]
    fn resolves_user_and_builtin_fields() {
        let config = config();
        let mut nhits = Field::new("tracks", "nhits");
        assert!(!nhits.is_resolved());
        nhits.init(&config).unwrap();
        assert_eq!(
            nhits.binding().unwrap(),
            FieldBinding {
                field_type: FieldType::Integer,
                id: 0
            }
        );

        let mut px = Field::new("tracks", "px");
        px.init(&config).unwrap();
        assert_eq!(px.binding().unwrap().id, -1);
    }

    #[test]
    fn missing_field_fails() {
        let mut field = Field::new("tracks", "nope");
        let err = field.init(&config()).unwrap_err();
        assert!(matches!(err, BranchError::Schema(SchemaError::FieldNotFound { .. })));
        assert!(err.is_not_found());
        assert!(!field.is_resolved());
    }

    #[test]
    fn foreign_config_rejected() {
        let other = BranchConfig::new("hits", 2, BranchKind::Hit);
        let mut field = Field::new("tracks", "x");
        assert!(matches!(field.init(&other), Err(BranchError::ForeignField { .. })));
    }

    #[test]
    fn unresolved_access_fails() {
        let field = Field::new("tracks", "chi2");
        assert!(matches!(field.field_type(), Err(BranchError::UnresolvedField { .. })));
    }

    #[test]
    fn resolution_is_deterministic() {
        let config = config();
        let mut a = Field::new("tracks", "chi2");
        let mut b = Field::new("tracks", "chi2");
        a.init(&config).unwrap();
        b.init(&config).unwrap();
        assert_eq!(a, b);
    }
}
