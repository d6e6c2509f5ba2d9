// Category -> candidate log files
// Static table; a category without an entry has no candidate files.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::Category;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CategoryLogMap(BTreeMap<Category, Vec<String>>);

// Keys must name a real category; a typo must not turn into an UNKNOWN entry.
impl<'de> Deserialize<'de> for CategoryLogMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
        let mut map = Self::empty();
        for (label, files) in raw {
            match Category::from_label(&label) {
                Some(Category::Unknown) | None => {
                    return Err(D::Error::custom(format!("unknown category in log map: {label:?}")));
                }
                Some(category) => map.insert(category, files),
            }
        }
        Ok(map)
    }
}

impl CategoryLogMap {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Replace the file list for a category
    pub fn insert(&mut self, category: Category, files: Vec<String>) {
        self.0.insert(category, files);
    }

    /// Ordered candidate file names for a category (empty if unmapped)
    pub fn candidates(&self, category: Category) -> &[String] {
        self.0.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.0.keys().copied()
    }
}

impl Default for CategoryLogMap {
    fn default() -> Self {
        let mut map = Self::empty();
        map.insert(Category::Container, vec!["container_service.log".to_string()]);
        map.insert(
            Category::Vessel,
            vec![
                "vessel_registry_service.log".to_string(),
                "vessel_advice_service.log".to_string(),
                "berth_application_service.log".to_string(),
            ],
        );
        map.insert(
            Category::EdiApi,
            vec![
                "api_event_service.log".to_string(),
                "edi_advice_service.log".to_string(),
            ],
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping() {
        let map = CategoryLogMap::default();
        assert_eq!(map.candidates(Category::Container), ["container_service.log"]);
        assert_eq!(map.candidates(Category::Vessel).len(), 3);
        assert_eq!(map.candidates(Category::EdiApi)[1], "edi_advice_service.log");
    }

    #[test]
    fn test_unmapped_category_has_no_candidates() {
        let map = CategoryLogMap::default();
        assert!(map.candidates(Category::DataSync).is_empty());
        assert!(map.candidates(Category::Unknown).is_empty());
    }

    #[test]
    fn test_deserialize_from_labels() {
        let map: CategoryLogMap = serde_json::from_str(r#"{"cntr": ["a.log"], "EA": []}"#).unwrap();
        assert_eq!(map.candidates(Category::Container), ["a.log"]);
        assert!(map.candidates(Category::EdiApi).is_empty());
        assert_eq!(map.categories().count(), 2);
    }

    #[test]
    fn test_unrecognized_key_is_rejected() {
        let err = serde_json::from_str::<CategoryLogMap>(r#"{"CNTRR": ["a.log"]}"#).unwrap_err();
        assert!(err.to_string().contains("CNTRR"));

        assert!(serde_json::from_str::<CategoryLogMap>(r#"{"UNKNOWN": ["a.log"]}"#).is_err());
    }
}
