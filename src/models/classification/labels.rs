//! Ordered class names of a trained classifier.

use crate::core::errors::{SmearError, SmearResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The ordered disease categories a classifier can output.
///
/// Index position is the class identity used to align raw scores with names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ClassLabelSet(Vec<String>);

impl ClassLabelSet {
    /// Creates a label set, rejecting empty sets, blank names and duplicates.
    pub fn new(names: Vec<String>) -> SmearResult<Self> {
        if names.is_empty() {
            return Err(SmearError::invalid_input("class label set is empty"));
        }
        let mut seen = HashSet::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(SmearError::invalid_input(format!(
                    "class name at index {i} is blank"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(SmearError::invalid_input(format!(
                    "class name '{name}' appears more than once"
                )));
            }
        }
        Ok(Self(names))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for ClassLabelSet {
    type Error = SmearError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<ClassLabelSet> for Vec<String> {
    fn from(labels: ClassLabelSet) -> Self {
        labels.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_order_is_identity() {
        let labels = ClassLabelSet::new(names(&["babesia", "leishmania", "trypanosome"])).unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.get(1), Some("leishmania"));
        assert_eq!(labels.get(3), None);
        assert_eq!(
            labels.iter().collect::<Vec<_>>(),
            vec!["babesia", "leishmania", "trypanosome"]
        );
    }

    #[test]
    fn test_rejects_invalid_sets() {
        assert!(ClassLabelSet::new(vec![]).is_err());
        assert!(ClassLabelSet::new(names(&["a", " "])).is_err());
        assert!(ClassLabelSet::new(names(&["a", "b", "a"])).is_err());
    }

    #[test]
    fn test_serde_validates() {
        let labels: ClassLabelSet = serde_json::from_str(r#"["monocyte", "neutrophil"]"#).unwrap();
        assert_eq!(labels.len(), 2);
        assert!(serde_json::from_str::<ClassLabelSet>("[]").is_err());
    }
}
