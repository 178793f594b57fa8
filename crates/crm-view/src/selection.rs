// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crm_app::RecordId;
use std::collections::BTreeSet;

/// Selected record ids; each id appears at most once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    ids: BTreeSet<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    Toggle(RecordId),
    /// Replace the selection with exactly these ids.
    SelectAll(Vec<RecordId>),
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderCheck {
    Unchecked,
    Indeterminate,
    Checked,
}

impl HeaderCheck {
    pub fn for_counts(selected: usize, filtered: usize) -> Self {
        if selected == 0 || filtered == 0 {
            Self::Unchecked
        } else if selected < filtered {
            Self::Indeterminate
        } else {
            Self::Checked
        }
    }

    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Unchecked => "[ ]",
            Self::Indeterminate => "[-]",
            Self::Checked => "[x]",
        }
    }
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordId> {
        self.ids.iter()
    }

    /// Returns whether `id` is selected afterwards.
    pub fn toggle(&mut self, id: RecordId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn apply(&mut self, change: SelectionChange) {
        match change {
            SelectionChange::Toggle(id) => {
                self.toggle(id);
            }
            SelectionChange::SelectAll(ids) => {
                self.ids = ids.into_iter().collect();
            }
            SelectionChange::Clear => self.ids.clear(),
        }
    }

    /// How many of `ids` are currently selected.
    pub fn count_within<'a>(&self, ids: impl IntoIterator<Item = &'a RecordId>) -> usize {
        ids.into_iter().filter(|id| self.ids.contains(*id)).count()
    }

    /// Drops ids that no longer exist in `live`.
    pub fn retain_existing<'a>(&mut self, live: impl IntoIterator<Item = &'a RecordId>) {
        let live: BTreeSet<&RecordId> = live.into_iter().collect();
        self.ids.retain(|id| live.contains(id));
    }
}

impl FromIterator<RecordId> for Selection {
    fn from_iter<I: IntoIterator<Item = RecordId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{HeaderCheck, Selection, SelectionChange};
    use crm_app::RecordId;

    #[test]
    fn toggling_twice_removes() {
        let mut selection = Selection::new();
        assert!(selection.toggle(RecordId::Int(4)));
        assert!(!selection.toggle(RecordId::Int(4)));
        assert!(selection.is_empty());
    }

    #[test]
    fn select_all_replaces_and_dedupes() {
        let mut selection: Selection = [RecordId::Int(9)].into_iter().collect();
        selection.apply(SelectionChange::SelectAll(vec![
            RecordId::Int(1),
            RecordId::Int(2),
            RecordId::Int(2),
        ]));
        assert_eq!(selection.len(), 2);
        assert!(!selection.contains(&RecordId::Int(9)));
    }

    #[test]
    fn header_state_follows_counts() {
        assert_eq!(HeaderCheck::for_counts(0, 3), HeaderCheck::Unchecked);
        assert_eq!(HeaderCheck::for_counts(2, 3), HeaderCheck::Indeterminate);
        assert_eq!(HeaderCheck::for_counts(3, 3), HeaderCheck::Checked);
        assert_eq!(HeaderCheck::for_counts(0, 0), HeaderCheck::Unchecked);
    }

    #[test]
    fn retain_existing_drops_vanished_ids() {
        let mut selection: Selection = [RecordId::Int(1), RecordId::Int(2)].into_iter().collect();
        let live = [RecordId::Int(2), RecordId::Int(3)];
        selection.retain_existing(live.iter());
        assert_eq!(selection.iter().cloned().collect::<Vec<_>>(), vec![RecordId::Int(2)]);
    }
}
