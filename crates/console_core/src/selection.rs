use std::collections::HashMap;

/// Tombstones tolerated beyond the live entry count before compacting.
const COMPACT_SLACK: usize = 8;

/// Insertion-ordered set of ids with toggle semantics.
///
/// Removal leaves a tombstone in `slots` so that toggling stays O(1); the
/// slot vector is compacted once tombstones outnumber live entries, which
/// keeps the cost amortized constant. Ids are not checked against any device
/// list.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    slots: Vec<Option<String>>,
    index: HashMap<String, usize>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes `id` if present, appends it otherwise. Returns whether `id` is
    /// selected afterwards.
    pub fn toggle(&mut self, id: &str) -> bool {
        if let Some(slot) = self.index.remove(id) {
            self.slots[slot] = None;
            self.compact_if_sparse();
            false
        } else {
            self.index.insert(id.to_string(), self.slots.len());
            self.slots.push(Some(id.to_string()));
            true
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().filter_map(|slot| slot.as_deref())
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    fn compact_if_sparse(&mut self) {
        let live = self.index.len();
        if self.slots.len() - live <= live + COMPACT_SLACK {
            return;
        }
        self.slots.retain(Option::is_some);
        for (position, slot) in self.slots.iter().enumerate() {
            if let Some(id) = slot {
                self.index.insert(id.clone(), position);
            }
        }
    }
}

impl PartialEq for Selection {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for Selection {}

impl<'a> FromIterator<&'a str> for Selection {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut selection = Self::new();
        for id in iter {
            if !selection.contains(id) {
                selection.toggle(id);
            }
        }
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_appends_absent_and_removes_present() {
        let mut selection = Selection::new();
        assert!(selection.toggle("a"));
        assert!(selection.toggle("b"));
        assert!(selection.toggle("c"));
        assert!(!selection.toggle("b"));
        assert_eq!(selection.to_vec(), vec!["a", "c"]);
        assert!(selection.toggle("b"));
        assert_eq!(selection.to_vec(), vec!["a", "c", "b"]);
    }

    #[test]
    fn double_toggle_leaves_selection_unchanged() {
        let before: Selection = ["1", "2", "3"].into_iter().collect();

        for id in ["9", "3"] {
            let mut selection = before.clone();
            selection.toggle(id);
            selection.toggle(id);
            assert_eq!(selection, before, "double toggle of {id}");
        }
    }

    #[test]
    fn double_toggle_of_earlier_id_keeps_membership() {
        let mut selection: Selection = ["1", "2", "3"].into_iter().collect();
        selection.toggle("1");
        selection.toggle("1");
        assert_eq!(selection.to_vec(), vec!["2", "3", "1"]);
    }

    #[test]
    fn compaction_preserves_order_and_lookup() {
        let mut selection = Selection::new();
        for n in 0..100 {
            selection.toggle(&n.to_string());
        }
        for n in (0..100).filter(|n| n % 10 != 0) {
            selection.toggle(&n.to_string());
        }
        assert_eq!(
            selection.to_vec(),
            vec!["0", "10", "20", "30", "40", "50", "60", "70", "80", "90"]
        );
        assert!(selection.slots.len() < 100);
        assert!(!selection.toggle("50"));
        assert!(!selection.contains("50"));
        assert!(selection.contains("60"));
    }

    #[test]
    fn clear_empties_the_set() {
        let mut selection: Selection = ["x", "y"].into_iter().collect();
        selection.clear();
        assert!(selection.is_empty());
        assert_eq!(selection.iter().count(), 0);
    }
}
