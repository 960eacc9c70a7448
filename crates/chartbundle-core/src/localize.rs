//! Localized values
//!
//! When unbundling, every image relation turns into one entry of the
//! `localized-values.yaml` overlay, placed at the relation's target path and
//! carrying the requested attribute of the bundled image.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::relation::{ImageRelations, validate_target_path};

/// One value in an [`Overlay`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OverlayNode {
    Scalar(String),
    Node(Overlay),
}

impl OverlayNode {
    fn type_name(&self) -> &'static str {
        match self {
            OverlayNode::Scalar(_) => "string",
            OverlayNode::Node(_) => "mapping",
        }
    }
}

/// Nested value overrides, serialized as a plain YAML mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Overlay(BTreeMap<String, OverlayNode>);

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a node by dotted path
    pub fn get(&self, path: &str) -> Option<&OverlayNode> {
        match path.split_once('.') {
            None => self.0.get(path),
            Some((key, rest)) => match self.0.get(key)? {
                OverlayNode::Node(inner) => inner.get(rest),
                OverlayNode::Scalar(_) => None,
            },
        }
    }

    /// Insert a value at a dotted path, creating intermediate mappings
    ///
    /// Fails if a path segment is already taken by a value of the other kind,
    /// i.e. when one path is used both as a leaf and as a prefix.
    pub fn insert(&mut self, path: &str, value: impl Into<String>) -> Result<()> {
        validate_target_path(path)?;
        self.insert_at(path, value.into())
    }

    fn insert_at(&mut self, path: &str, value: String) -> Result<()> {
        let Some((key, subpath)) = path.split_once('.') else {
            if let Some(existing @ OverlayNode::Node(_)) = self.0.get(path) {
                return Err(CoreError::OverlayConflict {
                    subpath: path.to_string(),
                    found: existing.type_name().to_string(),
                });
            }
            self.0.insert(path.to_string(), OverlayNode::Scalar(value));
            return Ok(());
        };

        let node = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| OverlayNode::Node(Overlay::new()));
        match node {
            OverlayNode::Node(inner) => inner.insert_at(subpath, value),
            OverlayNode::Scalar(_) => Err(CoreError::OverlayConflict {
                subpath: subpath.to_string(),
                found: node.type_name().to_string(),
            }),
        }
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl ImageRelations {
    /// Build the `localized-values.yaml` overlay from resolved relations
    pub fn localize(&self) -> Result<Overlay> {
        let mut overlay = Overlay::new();
        for rel in self {
            let value = rel.value()?;
            overlay.insert(&rel.target_path, value)?;
        }
        Ok(overlay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ImageReference;
    use crate::relation::{Attribute, ImageRelation};
    use serde_json::json;

    fn rel(path: &str, attribute: Attribute, reference: &str) -> ImageRelation {
        ImageRelation {
            target_path: path.to_string(),
            attribute,
            image_reference: ImageReference::parse(reference).unwrap(),
            resource_name: None,
        }
    }

    #[test]
    fn test_single_nested_value() {
        let rels: ImageRelations = vec![rel("a.b", Attribute::Tag, "docker.io/library/nginx:1.25")]
            .into_iter()
            .collect();
        let overlay = rels.localize().unwrap();
        assert_eq!(serde_json::to_value(&overlay).unwrap(), json!({"a": {"b": "1.25"}}));
    }

    #[test]
    fn test_siblings_share_a_mapping() {
        let image = "quay.io/prometheuscommunity/postgres_exporter:0.16.0";
        let rels: ImageRelations = vec![
            rel("db_metrics.image.repository", Attribute::Repository, image),
            rel("db_metrics.image.tag", Attribute::Tag, image),
            rel("proxy.image", Attribute::Reference, "nginx:1.25"),
        ]
        .into_iter()
        .collect();
        let overlay = rels.localize().unwrap();
        assert_eq!(
            serde_json::to_value(&overlay).unwrap(),
            json!({
                "db_metrics": {
                    "image": {
                        "repository": "quay.io/prometheuscommunity/postgres_exporter",
                        "tag": "0.16.0"
                    }
                },
                "proxy": {"image": "docker.io/library/nginx:1.25"}
            })
        );
        assert_eq!(
            overlay.get("db_metrics.image.tag"),
            Some(&OverlayNode::Scalar("0.16.0".to_string()))
        );
    }

    #[test]
    fn test_top_level_key() {
        let mut overlay = Overlay::new();
        overlay.insert("image", "nginx").unwrap();
        assert_eq!(serde_json::to_value(&overlay).unwrap(), json!({"image": "nginx"}));
    }

    #[test]
    fn test_scalar_used_as_prefix_fails() {
        let mut overlay = Overlay::new();
        overlay.insert("image", "nginx").unwrap();
        let err = overlay.insert("image.tag", "1.25").unwrap_err();
        match err {
            CoreError::OverlayConflict { subpath, found } => {
                assert_eq!(subpath, "tag");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mapping_used_as_leaf_fails() {
        let mut overlay = Overlay::new();
        overlay.insert("image.tag", "1.25").unwrap();
        let err = overlay.insert("image", "nginx").unwrap_err();
        assert!(matches!(err, CoreError::OverlayConflict { .. }));
        assert_eq!(overlay.get("image.tag"), Some(&OverlayNode::Scalar("1.25".to_string())));
    }

    #[test]
    fn test_repeated_leaf_is_overwritten() {
        let mut overlay = Overlay::new();
        overlay.insert("image.tag", "1.24").unwrap();
        overlay.insert("image.tag", "1.25").unwrap();
        assert_eq!(serde_json::to_value(&overlay).unwrap(), json!({"image": {"tag": "1.25"}}));
    }

    #[test]
    fn test_empty_segment_is_rejected() {
        let mut overlay = Overlay::new();
        assert!(overlay.insert("a..b", "x").is_err());
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_missing_attribute_aborts() {
        let rels: ImageRelations = vec![
            rel("a", Attribute::Tag, "nginx:1.25"),
            rel("b", Attribute::Digest, "nginx:1.25"),
        ]
        .into_iter()
        .collect();
        assert!(matches!(rels.localize(), Err(CoreError::MissingAttribute { .. })));
    }

    #[test]
    fn test_yaml_output() {
        let mut overlay = Overlay::new();
        overlay.insert("z.image", "nginx").unwrap();
        overlay.insert("a.image", "redis").unwrap();
        let yaml = overlay.to_yaml().unwrap();
        assert_eq!(yaml, "a:\n  image: redis\nz:\n  image: nginx\n");
    }
}
