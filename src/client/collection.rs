use thiserror::Error;

use crate::models::{Point, SelectionCandidate, contains_location};

#[derive(Debug, Error, PartialEq)]
pub enum CollectionError {
    #[error("index {index} out of range for collection of {len} points")]
    OutOfRange { index: usize, len: usize },
}

/// 会话内的地址集合，按用户添加顺序保存，不持久化。
///
/// 同时持有待确认的搜索候选以及搜索框、名字框里的临时文本。
#[derive(Debug, Default, Clone)]
pub struct AddressCollection {
    points: Vec<Point>,
    selection: Option<SelectionCandidate>,
    search_text: String,
    name_text: String,
}

impl AddressCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 最后一次搜索覆盖之前未消费的候选
    pub fn set_selection(&mut self, candidate: SelectionCandidate) {
        self.selection = Some(candidate);
    }

    pub fn selection(&self) -> Option<&SelectionCandidate> {
        self.selection.as_ref()
    }

    pub fn discard_selection(&mut self) -> Option<SelectionCandidate> {
        self.selection.take()
    }

    /// 候选已被使用：清掉候选以及搜索框、名字框文本
    pub fn consume_selection(&mut self) -> Option<SelectionCandidate> {
        self.search_text.clear();
        self.name_text.clear();
        self.selection.take()
    }

    /// 用待确认候选和名字生成一个点并追加。
    ///
    /// 没有候选、名字为空白、或坐标已存在时静默忽略，返回 `false`。
    pub fn add(&mut self, name: &str) -> bool {
        let Some(candidate) = self.selection.take() else {
            tracing::debug!("add ignored: no pending selection");
            return false;
        };
        if name.trim().is_empty() {
            tracing::debug!("add ignored: empty name");
            self.selection = Some(candidate);
            return false;
        }
        if contains_location(&self.points, candidate.lat, candidate.lng) {
            tracing::debug!(
                "add ignored: ({}, {}) already collected",
                candidate.lat,
                candidate.lng
            );
            self.selection = Some(candidate);
            return false;
        }

        self.points.push(Point::from_candidate(candidate, name));
        self.consume_selection();
        true
    }

    /// 使用名字输入框里的文本调用 `add`
    pub fn add_from_input(&mut self) -> bool {
        let name = std::mem::take(&mut self.name_text);
        let added = self.add(&name);
        if !added {
            self.name_text = name;
        }
        added
    }

    pub fn remove(&mut self, index: usize) -> Result<Point, CollectionError> {
        if index >= self.points.len() {
            return Err(CollectionError::OutOfRange {
                index,
                len: self.points.len(),
            });
        }
        Ok(self.points.remove(index))
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.selection = None;
        self.search_text.clear();
        self.name_text.clear();
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
    }

    pub fn name_text(&self) -> &str {
        &self.name_text
    }

    pub fn set_name_text(&mut self, text: impl Into<String>) {
        self.name_text = text.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidate(address: &str, lat: f64, lng: f64) -> SelectionCandidate {
        SelectionCandidate {
            address: address.to_string(),
            lat,
            lng,
        }
    }

    #[test]
    fn add_requires_pending_selection() {
        let mut collection = AddressCollection::new();
        assert!(!collection.add("chow"));
        assert!(collection.is_empty());
    }

    #[test]
    fn add_requires_non_blank_name() {
        let mut collection = AddressCollection::new();
        collection.set_selection(candidate("528 S Alexandria Ave", 34.0644661, -118.2975625));
        assert!(!collection.add("   "));
        assert!(collection.is_empty());
        // 候选仍然保留，可以补上名字后再添加
        assert!(collection.selection().is_some());
        assert!(collection.add("chow"));
    }

    #[test]
    fn add_consumes_selection_and_clears_inputs() {
        let mut collection = AddressCollection::new();
        collection.set_search_text("528 S Alex");
        collection.set_name_text("chow");
        collection.set_selection(candidate("528 S Alexandria Ave", 34.0644661, -118.2975625));

        assert!(collection.add_from_input());
        assert_eq!(collection.len(), 1);
        assert!(collection.selection().is_none());
        assert_eq!(collection.search_text(), "");
        assert_eq!(collection.name_text(), "");

        let point = &collection.points()[0];
        assert_eq!(point.name, "chow");
        assert_eq!(point.address, "528 S Alexandria Ave");
    }

    #[test]
    fn last_search_wins() {
        let mut collection = AddressCollection::new();
        collection.set_selection(candidate("first", 1.0, 1.0));
        collection.set_selection(candidate("second", 2.0, 2.0));
        assert!(collection.add("x"));
        assert_eq!(collection.points()[0].address, "second");
    }

    #[test]
    fn duplicate_coordinates_are_ignored() {
        let mut collection = AddressCollection::new();
        collection.set_selection(candidate("A", 1.0, 1.0));
        assert!(collection.add("a"));
        collection.set_selection(candidate("A again", 1.0, 1.0));
        collection.set_name_text("b");
        assert!(!collection.add_from_input());
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.name_text(), "b");
    }

    #[test]
    fn remove_checks_range() {
        let mut collection = AddressCollection::new();
        collection.set_selection(candidate("A", 1.0, 1.0));
        collection.add("a");
        collection.set_selection(candidate("B", 2.0, 2.0));
        collection.add("b");

        assert_eq!(
            collection.remove(2),
            Err(CollectionError::OutOfRange { index: 2, len: 2 })
        );
        let removed = collection.remove(0).unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(collection.points()[0].name, "b");
    }

    #[test]
    fn clear_resets_everything() {
        let mut collection = AddressCollection::new();
        collection.set_selection(candidate("A", 1.0, 1.0));
        collection.add("a");
        collection.set_selection(candidate("B", 2.0, 2.0));
        collection.set_search_text("B");
        collection.clear();
        assert!(collection.is_empty());
        assert!(collection.selection().is_none());
        assert_eq!(collection.search_text(), "");
    }

    proptest! {
        #[test]
        fn adds_preserve_order_and_uniqueness(
            picks in prop::collection::vec((0u8..6, 0u8..6, "[a-z]{0,3}"), 0..40)
        ) {
            let mut collection = AddressCollection::new();
            let mut expected: Vec<(f64, f64)> = Vec::new();

            for (lat, lng, name) in picks {
                let (lat, lng) = (lat as f64 / 4.0, lng as f64 / 4.0);
                let before = collection.points().to_vec();
                collection.set_selection(candidate("somewhere", lat, lng));
                let added = collection.add(&name);

                let fresh = !expected.contains(&(lat, lng));
                prop_assert_eq!(added, fresh && !name.trim().is_empty());
                if added {
                    expected.push((lat, lng));
                } else {
                    prop_assert_eq!(collection.points(), before.as_slice());
                }
            }

            let actual: Vec<(f64, f64)> =
                collection.points().iter().map(|p| (p.lat, p.lng)).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
