//! Tree structure as delivered by the upstream pipeline.
//!
//! `{ "name": …, "length": …, "split_indices": [...], "children": [...] }`.
//! The core never inspects topology beyond handing it to the layout
//! calculator.

use serde::{Deserialize, Deserializer, Serialize};

use crate::layout::SplitSet;

/// Length used when a branch carries none.
pub const DEFAULT_BRANCH_LENGTH: f64 = 1.0;

/// One node of a serialized tree (recursive).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TreeData {
    /// Node label; taxon name for leaves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Branch length to the parent. Accepts numbers or numeric strings.
    #[serde(
        default,
        deserialize_with = "deserialize_length",
        skip_serializing_if = "Option::is_none"
    )]
    pub length: Option<f64>,
    /// Leaves beneath this node. Derived from leaf order when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_indices: Option<SplitSet>,
    /// Child subtrees; empty for leaves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeData>,
}

impl TreeData {
    /// Leaf with a name and branch length.
    pub fn leaf(name: impl Into<String>, length: f64) -> Self {
        Self {
            name: Some(name.into()),
            length: Some(length),
            split_indices: None,
            children: Vec::new(),
        }
    }

    /// Internal node over `children`.
    pub fn internal(length: f64, children: Vec<TreeData>) -> Self {
        Self {
            name: None,
            length: Some(length),
            split_indices: None,
            children,
        }
    }

    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Branch length, defaulting to [`DEFAULT_BRANCH_LENGTH`].
    pub fn branch_length(&self) -> f64 {
        self.length.unwrap_or(DEFAULT_BRANCH_LENGTH)
    }

    /// Number of leaves in this subtree.
    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(Self::leaf_count).sum()
        }
    }

    /// Leaf names in leaf order; unnamed leaves give empty strings.
    pub fn leaf_names(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.collect_leaf_names(&mut out);
        out
    }

    fn collect_leaf_names(&self, out: &mut Vec<String>) {
        if self.is_leaf() {
            out.push(self.name.clone().unwrap_or_default());
        } else {
            for child in &self.children {
                child.collect_leaf_names(out);
            }
        }
    }

    /// Whether every node already carries split indices.
    pub fn has_split_indices(&self) -> bool {
        self.split_indices.is_some()
            && self.children.iter().all(Self::has_split_indices)
    }

    /// Copy of this tree with split indices filled in from leaf order
    /// wherever they are missing.
    #[must_use]
    pub fn with_derived_splits(&self) -> Self {
        let mut next_leaf = 0;
        self.derive_splits(&mut next_leaf)
    }

    fn derive_splits(&self, next_leaf: &mut u32) -> Self {
        if self.is_leaf() {
            let idx = *next_leaf;
            *next_leaf += 1;
            return Self {
                split_indices: Some(
                    self.split_indices
                        .clone()
                        .unwrap_or_else(|| SplitSet::new([idx])),
                ),
                ..self.clone()
            };
        }
        let children: Vec<TreeData> = self
            .children
            .iter()
            .map(|c| c.derive_splits(next_leaf))
            .collect();
        let splits = self.split_indices.clone().unwrap_or_else(|| {
            children
                .iter()
                .filter_map(|c| c.split_indices.as_ref())
                .fold(SplitSet::default(), |acc, s| acc.union(s))
        });
        Self {
            name: self.name.clone(),
            length: self.length,
            split_indices: Some(splits),
            children,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LengthRepr {
    Number(f64),
    Text(String),
}

fn deserialize_length<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<LengthRepr> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(LengthRepr::Number(v)) => Some(v),
        Some(LengthRepr::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_accept_strings_and_blanks() {
        let tree: TreeData = serde_json::from_str(
            r#"{"name":"root","children":[
                {"name":"A","length":"0.5"},
                {"name":"B","length":""},
                {"name":"C","length":2}
            ]}"#,
        )
        .unwrap();
        assert_eq!(tree.children[0].length, Some(0.5));
        assert_eq!(tree.children[1].branch_length(), DEFAULT_BRANCH_LENGTH);
        assert_eq!(tree.children[2].length, Some(2.0));
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn derived_splits_follow_leaf_order() {
        let tree = TreeData::internal(
            0.0,
            vec![
                TreeData::internal(
                    1.0,
                    vec![TreeData::leaf("A", 1.0), TreeData::leaf("B", 1.0)],
                ),
                TreeData::leaf("C", 1.0),
            ],
        );
        assert!(!tree.has_split_indices());
        let derived = tree.with_derived_splits();
        assert!(derived.has_split_indices());
        assert_eq!(
            derived.split_indices.as_ref().map(SplitSet::as_slice),
            Some(&[0, 1, 2][..])
        );
        assert_eq!(
            derived.children[0].split_indices.as_ref().map(SplitSet::as_slice),
            Some(&[0, 1][..])
        );
        assert_eq!(
            derived.children[1].split_indices.as_ref().map(SplitSet::as_slice),
            Some(&[2][..])
        );
        assert_eq!(tree.leaf_names(), vec!["A", "B", "C"]);
    }
}
