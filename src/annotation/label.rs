use super::LabelId;
use crate::{io, Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Read-only `label id → display name` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct LabelNames(HashMap<String, String>);

impl LabelNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        io::read_json(path)
    }

    /// Parse the `{0: 'person', 1: 'bicycle'}` literal that exported detectors
    /// store in their model metadata.
    pub fn parse_names_literal(names: &str) -> Result<Self> {
        let re = Regex::new(r#"(\d+)\s*:\s*['"]([^'"]*)['"]"#)
            .map_err(|e| Error::invalid(e.to_string()))?;
        let parsed: Self = re
            .captures_iter(names)
            .map(|c| c.extract())
            .map(|(_, [id, name])| (id.to_string(), name.to_string()))
            .collect();
        let body = names.trim().trim_matches(|c: char| c == '{' || c == '}');
        if parsed.is_empty() && !body.trim().is_empty() {
            return Err(Error::invalid(format!("cannot parse label names from {names:?}")));
        }
        Ok(parsed)
    }

    pub fn get(&self, id: &LabelId) -> Option<&str> {
        self.0.get(id.as_str()).map(String::as_str)
    }

    /// Lookup for the box at `index`; a missing id is a malformed annotation.
    pub fn name_of(&self, index: usize, id: &LabelId) -> Result<&str> {
        self.get(id).ok_or_else(|| {
            Error::malformed(format!("box {index}: label id '{id}' has no display name"))
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for LabelNames
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        LabelNames(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names_literal() {
        let names = LabelNames::parse_names_literal("{0: 'person', 1: \"traffic light\", 12: 'stop sign'}").unwrap();
        assert_eq!(names.len(), 3);
        assert_eq!(names.get(&LabelId::from(1u32)), Some("traffic light"));
        assert_eq!(names.get(&LabelId::from(12u32)), Some("stop sign"));

        assert!(LabelNames::parse_names_literal("{}").unwrap().is_empty());
        assert!(LabelNames::parse_names_literal("person, car").is_err());
    }

    #[test]
    fn missing_label_reports_box_index() {
        let names: LabelNames = [("0", "cat")].into_iter().collect();
        assert_eq!(names.name_of(0, &LabelId::from(0u32)).unwrap(), "cat");

        let err = names.name_of(4, &LabelId::from("dog")).unwrap_err();
        assert!(matches!(err, Error::MalformedAnnotation(_)));
        assert!(err.to_string().contains("box 4"));
    }

    #[test]
    fn json_map() {
        let names: LabelNames = serde_json::from_str(r#"{"1": "aeroplane", "2": "bicycle"}"#).unwrap();
        assert_eq!(names.get(&LabelId::from(2u32)), Some("bicycle"));
    }
}
