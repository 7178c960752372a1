//! # Tag Diff
//!
//! Order-insensitive comparison of desired and observed tag sets.
//!
//! Keys always compare case-sensitively. Values compare case-sensitively
//! unless the kind documents otherwise. A missing value and an empty value
//! are different values.

use crate::crd::Tag;
use std::collections::BTreeMap;

/// How tag values are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueComparison {
    #[default]
    CaseSensitive,
    CaseInsensitive,
}

impl ValueComparison {
    fn equal(self, a: Option<&str>, b: Option<&str>) -> bool {
        match (self, a, b) {
            (_, None, None) => true,
            (ValueComparison::CaseSensitive, Some(a), Some(b)) => a == b,
            (ValueComparison::CaseInsensitive, Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

/// Tags to add (or overwrite) and tag keys to remove
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    pub add: Vec<Tag>,
    pub remove: Vec<String>,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Key -> value view of a tag list; later duplicates win
pub fn tag_map(tags: &[Tag]) -> BTreeMap<&str, Option<&str>> {
    tags.iter()
        .map(|tag| (tag.key.as_str(), tag.value.as_deref()))
        .collect()
}

/// Diff `desired` against `observed`; the result is sorted by key
pub fn diff_tags(desired: &[Tag], observed: &[Tag], values: ValueComparison) -> TagDiff {
    let desired = tag_map(desired);
    let observed = tag_map(observed);

    let add = desired
        .iter()
        .filter(|(key, value)| {
            observed
                .get(*key)
                .is_none_or(|current| !values.equal(**value, *current))
        })
        .map(|(key, value)| Tag {
            key: (*key).to_string(),
            value: value.map(str::to_string),
        })
        .collect();

    let remove = observed
        .keys()
        .filter(|key| !desired.contains_key(*key))
        .map(|key| (*key).to_string())
        .collect();

    TagDiff { add, remove }
}

pub fn tags_up_to_date(desired: &[Tag], observed: &[Tag], values: ValueComparison) -> bool {
    diff_tags(desired, observed, values).is_empty()
}

/// Build tags from SDK `(key, value)` pairs, dropping entries without a key
pub fn tags_from_pairs<I>(pairs: I) -> Vec<Tag>
where
    I: IntoIterator<Item = (Option<String>, Option<String>)>,
{
    let mut tags: Vec<Tag> = pairs
        .into_iter()
        .filter_map(|(key, value)| key.map(|key| Tag { key, value }))
        .collect();
    tags.sort();
    tags
}
