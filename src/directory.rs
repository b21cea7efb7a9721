//! Directory of display names
//!
//! Maps every taken display name to the connection that owns it. This is the
//! only place nickname uniqueness is decided.

use std::collections::HashMap;

use crate::error::AppError;
use crate::types::ClientId;

/// Name → owner lookup
///
/// Names are compared by exact string match.
#[derive(Debug, Default)]
pub struct Directory {
    names: HashMap<String, ClientId>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owner of `name`, if taken
    pub fn lookup(&self, name: &str) -> Option<ClientId> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Give `client_id` the name `new`, releasing `old` if it had one
    ///
    /// Fails with `NameInUse` when `new` is already taken, by anyone,
    /// and leaves the directory untouched.
    pub fn rename(
        &mut self,
        client_id: ClientId,
        old: Option<&str>,
        new: &str,
    ) -> Result<(), AppError> {
        if self.names.contains_key(new) {
            return Err(AppError::NameInUse(new.to_string()));
        }
        if let Some(old) = old {
            self.names.remove(old);
        }
        self.names.insert(new.to_string(), client_id);
        Ok(())
    }

    /// Release `name`; returns the former owner
    pub fn remove(&mut self, name: &str) -> Option<ClientId> {
        self.names.remove(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
