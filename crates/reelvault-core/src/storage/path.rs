//! Field paths into series documents and their application to JSON values.

use anyhow::{Result, bail};
use serde_json::{Map, Value};
use std::fmt;

/// Path to a field inside a series document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn root(field: impl Into<String>) -> Self {
        Self(vec![field.into()])
    }

    pub fn language(lang_id: &str) -> Self {
        Self::root("languages").child(lang_id)
    }

    pub fn season(lang_id: &str, season_id: &str) -> Self {
        Self::language(lang_id).child("seasons").child(season_id)
    }

    pub fn batch_quality(lang_id: &str, season_id: &str, quality_id: &str) -> Self {
        Self::season(lang_id, season_id)
            .child("qualities")
            .child(quality_id)
    }

    pub fn episodes(lang_id: &str, season_id: &str) -> Self {
        Self::season(lang_id, season_id).child("episodes")
    }

    pub fn episode(lang_id: &str, season_id: &str, episode_id: &str) -> Self {
        Self::episodes(lang_id, season_id).child(episode_id)
    }

    pub fn episode_quality(
        lang_id: &str,
        season_id: &str,
        episode_id: &str,
        quality_id: &str,
    ) -> Self {
        Self::episode(lang_id, season_id, episode_id)
            .child("qualities")
            .child(quality_id)
    }

    /// Extend the path by one segment.
    pub fn child(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Value at this path, if present.
    pub fn lookup<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(document, |node, segment| node.get(segment.as_str()))
    }

    /// Set the value, creating missing intermediate objects.
    pub fn set(&self, document: &mut Value, value: Value) -> Result<()> {
        let Some((last, parents)) = self.0.split_last() else {
            bail!("Cannot set an empty field path");
        };
        let mut node = document;
        for segment in parents {
            let object = as_object_mut(node, self)?;
            node = object
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        as_object_mut(node, self)?.insert(last.clone(), value);
        Ok(())
    }

    /// Remove the field. Missing paths are a no-op; returns whether anything was removed.
    pub fn unset(&self, document: &mut Value) -> bool {
        let Some((last, parents)) = self.0.split_last() else {
            return false;
        };
        let mut node = document;
        for segment in parents {
            match node.get_mut(segment.as_str()) {
                Some(next) => node = next,
                None => return false,
            }
        }
        node.as_object_mut()
            .map(|object| object.remove(last).is_some())
            .unwrap_or(false)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

fn as_object_mut<'a>(node: &'a mut Value, path: &FieldPath) -> Result<&'a mut Map<String, Value>> {
    match node.as_object_mut() {
        Some(object) => Ok(object),
        None => bail!("Field path '{}' crosses a non-object value", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut doc = json!({"title": "Show"});
        let path = FieldPath::batch_quality("en", "s1", "q1").child("published");
        path.set(&mut doc, json!(true)).unwrap();

        assert_eq!(
            doc["languages"]["en"]["seasons"]["s1"]["qualities"]["q1"]["published"],
            json!(true)
        );
        assert_eq!(path.lookup(&doc), Some(&json!(true)));
        assert_eq!(
            path.to_string(),
            "languages.en.seasons.s1.qualities.q1.published"
        );
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let mut doc = json!({"languages": 3});
        let err = FieldPath::language("en").set(&mut doc, json!({})).unwrap_err();
        assert!(err.to_string().contains("non-object"));
    }

    #[test]
    fn test_unset() {
        let mut doc = json!({"languages": {"en": {"name": "English"}, "hi": {"name": "Hindi"}}});
        assert!(FieldPath::language("en").unset(&mut doc));
        assert!(!FieldPath::language("en").unset(&mut doc));
        assert!(!FieldPath::season("xx", "s1").unset(&mut doc));
        assert_eq!(doc, json!({"languages": {"hi": {"name": "Hindi"}}}));
    }
}
