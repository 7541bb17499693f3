//! Fixed-size tables indexed by [`SlotId`].

use crate::command::{SLOT_COUNT, SlotId};

/// A table with one optional entry per two-digit base-36 slot.
///
/// Two base-36 digits bound the index space, so the table is allocated once with
/// [`SLOT_COUNT`] entries and never grows.
#[derive(Clone, PartialEq)]
pub struct SlotTable<T> {
    entries: Box<[Option<T>]>,
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self {
            entries: std::iter::repeat_with(|| None).take(SLOT_COUNT).collect(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SlotTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T> SlotTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry of `id`.
    #[must_use]
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.entries.get(id.index()).and_then(Option::as_ref)
    }

    /// Sets the entry of `id`, returning the previous one.
    pub fn insert(&mut self, id: SlotId, value: T) -> Option<T> {
        self.entries
            .get_mut(id.index())
            .and_then(|entry| entry.replace(value))
    }

    /// Returns the number of filled entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    /// Returns whether no entry is filled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    /// Iterates the filled entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| Some((SlotId::from_index(index)?, entry.as_ref()?)))
    }
}

impl<T> FromIterator<(SlotId, T)> for SlotTable<T> {
    fn from_iter<I: IntoIterator<Item = (SlotId, T)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (id, value) in iter {
            table.insert(id, value);
        }
        table
    }
}
