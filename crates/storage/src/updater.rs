//! Applies row modifications to indices and the cache.

use crate::diff::Modification;
use crate::store::Store;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use strata_core::schema::Table;
use strata_core::{Error, Result};
use tracing::trace;

/// Writes `(before, after)` pairs through to the in-memory state.
///
/// Indices are updated before the cache, so a failing index update leaves
/// the cache untouched.
pub struct InMemoryUpdater;

impl InMemoryUpdater {
    /// Fails with `UniqueConstraint` if applying `modification` would put a
    /// second row under a key of a unique index of `table`.
    pub fn check_unique(store: &Store, table: &Table, modification: &Modification) -> Result<()> {
        let Some(after) = &modification.1 else {
            return Ok(());
        };
        for def in table.indices().iter().filter(|d| d.is_unique()) {
            let name = def.normalized_name();
            let index = store.indices().index(&name)?;
            let key = table.index_key(def, after);
            let owners = index.get(&key);
            if owners.iter().any(|id| *id != after.id()) {
                return Err(Error::unique_constraint(name, render_key(&key)));
            }
        }
        Ok(())
    }

    /// Applies `modifications` to the indices and then the cache of
    /// `table`. All old keys are removed before any new key is added, so a
    /// batch that moves a unique key between rows applies cleanly.
    pub fn apply(store: &mut Store, table: &Table, modifications: &[Modification]) -> Result<()> {
        let (cache, indices) = store.parts_mut();
        for def in table.indices() {
            let index = indices.index_mut(&def.normalized_name())?;
            for (before, _) in modifications {
                if let Some(row) = before {
                    index.remove(&table.index_key(def, row), Some(row.id()));
                }
            }
            let added = modifications
                .iter()
                .filter_map(|(_, after)| after.as_ref())
                .map(|row| (table.index_key(def, row), row.id()))
                .collect();
            index.add_batch(added)?;
        }

        for modification in modifications {
            match modification {
                (_, Some(after)) => cache.set(table.name(), after.clone()),
                (Some(before), None) => {
                    cache.remove(table.name(), before.id());
                }
                (None, None) => {}
            }
        }
        trace!(table = table.name(), count = modifications.len(), "applied modifications");
        Ok(())
    }
}

pub(crate) fn render_key(key: &[strata_core::Value]) -> String {
    let parts: Vec<String> = key.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}
