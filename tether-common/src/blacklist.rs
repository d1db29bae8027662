// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Persisted set of addresses that failed to respond.
//!
//! Membership is exact string equality on the canonical address text, not
//! semantic matching. Entries can be appended or the whole list replaced;
//! there is no single-entry removal.

use crate::error::SettingsError;
use crate::settings::{SettingsDocument, BLACKLIST_KEY};

#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    entries: Vec<String>,
    store: Option<SettingsDocument>,
}

impl Blacklist {
    /// Load the list stored in `store`; later changes are written back to it.
    pub fn load(store: SettingsDocument) -> Result<Self, SettingsError> {
        let stored: Vec<String> = store.get(BLACKLIST_KEY)?.unwrap_or_default();
        let mut blacklist = Self {
            entries: Vec::with_capacity(stored.len()),
            store: Some(store),
        };
        for entry in stored {
            blacklist.insert(entry);
        }
        Ok(blacklist)
    }

    /// A blacklist that is never persisted.
    pub fn in_memory<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut blacklist = Self::default();
        for entry in entries {
            blacklist.insert(entry.into());
        }
        blacklist
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.iter().any(|entry| entry == address)
    }

    /// Append `address` if absent and persist the list.
    ///
    /// Returns `true` if the entry was new. On a save failure the list is
    /// left unchanged.
    pub fn add(&mut self, address: impl Into<String>) -> Result<bool, SettingsError> {
        let address = address.into();
        if self.contains(&address) {
            return Ok(false);
        }
        let mut next = self.entries.clone();
        next.push(address);
        self.commit(next)?;
        Ok(true)
    }

    /// Replace the whole list and persist it. Duplicates are dropped.
    pub fn replace<I, S>(&mut self, entries: I) -> Result<(), SettingsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry.into();
            if !next.contains(&entry) {
                next.push(entry);
            }
        }
        self.commit(next)
    }

    pub fn clear(&mut self) -> Result<(), SettingsError> {
        self.replace(std::iter::empty::<String>())
    }

    /// Current entries, in insertion order.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, entry: String) -> bool {
        if self.contains(&entry) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Save `entries`, then adopt them.
    fn commit(&mut self, entries: Vec<String>) -> Result<(), SettingsError> {
        if let Some(store) = self.store.as_mut() {
            store.set(BLACKLIST_KEY, &entries)?;
            store.save()?;
        }
        self.entries = entries;
        Ok(())
    }
}
