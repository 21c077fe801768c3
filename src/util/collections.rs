//! Copy-on-write helpers for collections held in state.
//!
//! Each function leaves its input untouched and returns an updated copy,
//! which is what a reducer needs. Out-of-range indices and missing keys
//! produce an unchanged copy.

use std::collections::HashMap;
use std::hash::Hash;

/// Replace the item at `index` with `reducer(item)`.
pub fn update_item<T: Clone>(items: &[T], index: usize, reducer: impl FnOnce(&T) -> T) -> Vec<T> {
    let mut updated = items.to_vec();
    if let Some(item) = updated.get_mut(index) {
        *item = reducer(item);
    }
    updated
}

/// Replace every item matching `predicate` with `reducer(item)`.
pub fn update_items<T: Clone>(
    items: &[T],
    predicate: impl Fn(&T) -> bool,
    reducer: impl Fn(&T) -> T,
) -> Vec<T> {
    items
        .iter()
        .map(|item| if predicate(item) { reducer(item) } else { item.clone() })
        .collect()
}

/// Replace the value under `key` with `reducer(value)`.
pub fn update_entry<K, V>(map: &HashMap<K, V>, key: &K, reducer: impl FnOnce(&V) -> V) -> HashMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    let mut updated = map.clone();
    if let Some(value) = updated.get_mut(key) {
        *value = reducer(value);
    }
    updated
}

/// Like [`update_entry`], creating the value with `factory` when missing.
pub fn update_entry_or_insert_with<K, V>(
    map: &HashMap<K, V>,
    key: &K,
    factory: impl FnOnce(&K) -> V,
    reducer: impl FnOnce(&V) -> V,
) -> HashMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    let mut updated = map.clone();
    let next = match updated.get(key) {
        Some(value) => reducer(value),
        None => reducer(&factory(key)),
    };
    updated.insert(key.clone(), next);
    updated
}

/// Move the item at `from` to position `to`, shifting the items between.
pub fn move_item<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut updated = items.to_vec();
    if from < updated.len() && to < updated.len() {
        let item = updated.remove(from);
        updated.insert(to, item);
    }
    updated
}

/// Remove the item at `index`.
pub fn remove_item<T: Clone>(items: &[T], index: usize) -> Vec<T> {
    let mut updated = items.to_vec();
    if index < updated.len() {
        updated.remove(index);
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_item_touches_only_index() {
        let items = vec![1, 2, 3];
        assert_eq!(update_item(&items, 1, |v| v * 10), vec![1, 20, 3]);
        assert_eq!(update_item(&items, 5, |v| v * 10), items);
    }

    #[test]
    fn update_items_by_predicate() {
        let items = vec![1, 2, 3, 4];
        assert_eq!(update_items(&items, |v| v % 2 == 0, |v| -v), vec![1, -2, 3, -4]);
    }

    #[test]
    fn update_entry_ignores_missing_key() {
        let map = HashMap::from([("a", 1)]);
        assert_eq!(update_entry(&map, &"a", |v| v + 1)[&"a"], 2);
        assert_eq!(update_entry(&map, &"b", |v| v + 1), map);
    }

    #[test]
    fn update_entry_with_factory_inserts() {
        let map: HashMap<&str, i32> = HashMap::new();
        let updated = update_entry_or_insert_with(&map, &"a", |_| 10, |v| v + 1);
        assert_eq!(updated[&"a"], 11);
        assert!(map.is_empty());
    }

    #[test]
    fn move_item_both_directions() {
        let items = vec!['a', 'b', 'c', 'd'];
        assert_eq!(move_item(&items, 0, 2), vec!['b', 'c', 'a', 'd']);
        assert_eq!(move_item(&items, 3, 1), vec!['a', 'd', 'b', 'c']);
        assert_eq!(move_item(&items, 0, 9), items);
    }

    #[test]
    fn remove_item_out_of_range_is_noop() {
        let items = vec![1, 2, 3];
        assert_eq!(remove_item(&items, 0), vec![2, 3]);
        assert_eq!(remove_item(&items, 3), items);
    }
}
