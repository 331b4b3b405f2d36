//! Table constraints.

use super::index::IndexDef;
use alloc::string::String;
use alloc::vec::Vec;

/// Reaction of a foreign key to a parent row being updated or deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ConstraintAction {
    /// The change fails while children still point at the parent.
    #[default]
    Restrict,
    /// Children follow the parent: updated keys are copied, deleted
    /// parents take their children with them.
    Cascade,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ConstraintTiming {
    /// Checked by every insert, update or delete.
    #[default]
    Immediate,
    /// Checked once at commit.
    Deferrable,
}

/// `child_table.child_column` references `parent_table.parent_column`.
#[derive(Clone, Debug, PartialEq)]
pub struct ForeignKey {
    pub name: String,
    pub child_table: String,
    pub child_column: String,
    pub parent_table: String,
    pub parent_column: String,
    pub action: ConstraintAction,
    pub timing: ConstraintTiming,
}

impl ForeignKey {
    #[inline]
    pub fn is_cascade(&self) -> bool {
        matches!(self.action, ConstraintAction::Cascade)
    }

    /// Whether child rows must reference an existing parent at `timing`.
    /// The action plays no part here.
    #[inline]
    pub fn checks_child_at(&self, timing: ConstraintTiming) -> bool {
        self.timing == timing
    }

    /// Whether a referenced parent key may not change or disappear at
    /// `timing`. Cascading keys rewrite or delete the children instead.
    #[inline]
    pub fn restricts_parent_at(&self, timing: ConstraintTiming) -> bool {
        !self.is_cascade() && self.timing == timing
    }
}

/// Primary key, NOT NULL columns and outgoing foreign keys of a table.
#[derive(Clone, Debug, Default)]
pub struct Constraints {
    pub(crate) primary_key: Option<IndexDef>,
    pub(crate) not_nullable: Vec<String>,
    pub(crate) foreign_keys: Vec<ForeignKey>,
}

impl Constraints {
    pub fn primary_key(&self) -> Option<&IndexDef> {
        self.primary_key.as_ref()
    }

    pub fn not_nullable(&self) -> &[String] {
        &self.not_nullable
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }
}
