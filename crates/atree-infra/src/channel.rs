//! Indexed views onto single branch entries

use atree_core::FieldValue;

use crate::branch::{Branch, FieldsMapping};
use crate::error::BranchError;
use crate::field::Field;

/// Read-only view of entry `index` of a branch
#[derive(Debug, Clone, Copy)]
pub struct BranchChannel<'a> {
    branch: &'a Branch,
    index: usize,
}

impl<'a> BranchChannel<'a> {
    pub(crate) fn new(branch: &'a Branch, index: usize) -> Self {
        Self { branch, index }
    }

    /// Entry index
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Branch viewed
    #[inline]
    #[must_use]
    pub fn branch(&self) -> &'a Branch {
        self.branch
    }

    /// Typed value of `field`
    ///
    /// # Errors
    /// Returns error if the field is unresolved or belongs to another branch
    pub fn typed_value(&self, field: &Field) -> Result<FieldValue, BranchError> {
        self.branch.read_value(self.index, field)
    }

    /// Value of `field` widened to `f64`
    ///
    /// # Errors
    /// Returns error if the field is unresolved or belongs to another branch
    pub fn value(&self, field: &Field) -> Result<f64, BranchError> {
        self.typed_value(field).map(|v| v.as_f64())
    }
}

/// Read-write view of entry `index` of a branch
#[derive(Debug)]
pub struct BranchChannelMut<'a> {
    branch: &'a mut Branch,
    index: usize,
}

impl<'a> BranchChannelMut<'a> {
    pub(crate) fn new(branch: &'a mut Branch, index: usize) -> Self {
        Self { branch, index }
    }

    /// Entry index
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Read-only view of the same entry
    #[inline]
    #[must_use]
    pub fn as_channel(&self) -> BranchChannel<'_> {
        BranchChannel::new(&*self.branch, self.index)
    }

    /// Typed value of `field`
    ///
    /// # Errors
    /// Returns error if the field is unresolved or belongs to another branch
    pub fn typed_value(&self, field: &Field) -> Result<FieldValue, BranchError> {
        self.branch.read_value(self.index, field)
    }

    /// Value of `field` widened to `f64`
    ///
    /// # Errors
    /// Returns error if the field is unresolved or belongs to another branch
    pub fn value(&self, field: &Field) -> Result<f64, BranchError> {
        self.typed_value(field).map(|v| v.as_f64())
    }

    /// Store a number, converted to the field's type
    ///
    /// # Errors
    /// Returns error if the branch is not mutable, or the field is
    /// unresolved or foreign
    pub fn set_value(&mut self, field: &Field, value: f64) -> Result<(), BranchError> {
        let typed = FieldValue::from_f64(field.field_type()?, value);
        self.branch.write_value(self.index, field, typed)
    }

    /// Store a typed value
    ///
    /// # Errors
    /// Returns [`BranchError::TypeMismatch`] if `value` has another type than
    /// the field, plus the errors of [`BranchChannelMut::set_value`]
    pub fn set_typed(&mut self, field: &Field, value: FieldValue) -> Result<(), BranchError> {
        let expected = field.field_type()?;
        if value.field_type() != expected {
            return Err(BranchError::TypeMismatch {
                field: field.name().to_string(),
                expected,
                actual: value.field_type(),
            });
        }
        self.branch.write_value(self.index, field, value)
    }

    /// Copy the mapped fields of `source` into this entry
    ///
    /// Values are converted to the destination field types.
    ///
    /// # Errors
    /// Returns error if a mapped field cannot be read or written
    pub fn copy_from(&mut self, source: &BranchChannel<'_>, mapping: &FieldsMapping) -> Result<(), BranchError> {
        for (src, dst) in mapping.field_pairs() {
            let value = source.typed_value(src)?;
            self.branch
                .write_value(self.index, dst, value.convert(dst.field_type()?))?;
        }
        Ok(())
    }
}
