//! Resource names for bundled images
//!
//! Every distinct image reference gets one resource name of the form
//! `image-<basename>`, disambiguated with `-1`, `-2`, ... when two different
//! images share a basename. Names that were already assigned are kept.

use std::collections::HashMap;

use crate::error::{CoreError, Result};
use crate::reference::ImageReference;
use crate::relation::{ImageRelation, ImageRelations};

/// Compute one resource name per relation, in input order
///
/// The mapping between resource names and image references is a bijection:
/// equal references get equal names and no name is shared by two different
/// references. The result depends only on the input order.
pub fn assign_resource_names(relations: &[ImageRelation]) -> Result<Vec<String>> {
    let mut name_for_reference: HashMap<&ImageReference, String> = HashMap::new();
    let mut reference_for_name: HashMap<String, &ImageReference> = HashMap::new();

    // seed with names chosen by the caller
    for rel in relations {
        let Some(name) = rel.resource_name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        let reference = &rel.image_reference;

        if let Some(other) = reference_for_name.get(name) {
            if *other != reference {
                return Err(CoreError::NameConflict {
                    name: name.to_string(),
                    first: other.to_string(),
                    second: reference.to_string(),
                });
            }
        }
        if let Some(existing) = name_for_reference.get(reference) {
            if existing != name {
                return Err(CoreError::NameConflict {
                    name: reference.to_string(),
                    first: existing.clone(),
                    second: name.to_string(),
                });
            }
        }

        name_for_reference.insert(reference, name.to_string());
        reference_for_name.insert(name.to_string(), reference);
    }

    let mut names = Vec::with_capacity(relations.len());
    for rel in relations {
        let reference = &rel.image_reference;
        if let Some(name) = name_for_reference.get(reference) {
            names.push(name.clone());
            continue;
        }

        let basename = reference.basename();
        let mut name = format!("image-{}", basename);
        let mut counter = 0;
        while reference_for_name.contains_key(&name) {
            counter += 1;
            name = format!("image-{}-{}", basename, counter);
        }

        tracing::debug!("assigned resource name {:?} to image {}", name, reference);
        name_for_reference.insert(reference, name.clone());
        reference_for_name.insert(name.clone(), reference);
        names.push(name);
    }

    Ok(names)
}

impl ImageRelations {
    /// Return a copy of this set in which every relation carries a resource name
    ///
    /// Running this on an already named set yields the same set.
    pub fn with_resource_names(&self) -> Result<ImageRelations> {
        let names = assign_resource_names(&self.0)?;
        Ok(self
            .iter()
            .zip(names)
            .map(|(rel, name)| ImageRelation {
                resource_name: Some(name),
                ..rel.clone()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::Attribute;

    fn rel(path: &str, reference: &str) -> ImageRelation {
        ImageRelation {
            target_path: path.to_string(),
            attribute: Attribute::Reference,
            image_reference: ImageReference::parse(reference).unwrap(),
            resource_name: None,
        }
    }

    fn named(path: &str, reference: &str, name: &str) -> ImageRelation {
        ImageRelation {
            resource_name: Some(name.to_string()),
            ..rel(path, reference)
        }
    }

    #[test]
    fn test_same_image_shares_a_name() {
        let rels = vec![
            rel("db_metrics.image.repository", "quay.io/x/postgres_exporter:0.16.0"),
            rel("db_metrics.image.tag", "quay.io/x/postgres_exporter:0.16.0"),
        ];
        let names = assign_resource_names(&rels).unwrap();
        assert_eq!(names, vec!["image-postgres_exporter", "image-postgres_exporter"]);
    }

    #[test]
    fn test_basename_collisions_are_numbered() {
        let rels = vec![
            rel("a", "quay.io/one/app:1"),
            rel("b", "quay.io/two/app:1"),
            rel("c", "quay.io/one/app:2"),
            rel("d", "quay.io/two/app:1"),
        ];
        let names = assign_resource_names(&rels).unwrap();
        assert_eq!(names, vec!["image-app", "image-app-1", "image-app-2", "image-app-1"]);
    }

    #[test]
    fn test_normalized_references_share_a_name() {
        let rels = vec![
            rel("a", "nginx:1.25"),
            rel("b", "docker.io/library/nginx:1.25"),
        ];
        let names = assign_resource_names(&rels).unwrap();
        assert_eq!(names[0], "image-nginx");
        assert_eq!(names[1], "image-nginx");
    }

    #[test]
    fn test_preassigned_names_are_respected() {
        let rels = vec![
            rel("a", "quay.io/one/app:1"),
            named("b", "quay.io/two/app:1", "image-app"),
            rel("c", "quay.io/two/app:1"),
        ];
        let names = assign_resource_names(&rels).unwrap();
        assert_eq!(names, vec!["image-app-1", "image-app", "image-app"]);
    }

    #[test]
    fn test_empty_preassigned_name_counts_as_unnamed() {
        let rels = vec![named("a", "quay.io/one/app:1", "")];
        let names = assign_resource_names(&rels).unwrap();
        assert_eq!(names, vec!["image-app"]);
    }

    #[test]
    fn test_conflicting_preassigned_names() {
        let rels = vec![
            named("a", "quay.io/one/app:1", "shared"),
            named("b", "quay.io/two/app:1", "shared"),
        ];
        let err = assign_resource_names(&rels).unwrap_err();
        assert!(matches!(err, CoreError::NameConflict { .. }));
    }

    #[test]
    fn test_one_image_with_two_preassigned_names() {
        let rels = vec![
            named("a", "quay.io/one/app:1", "first"),
            named("b", "quay.io/one/app:1", "second"),
        ];
        assert!(assign_resource_names(&rels).is_err());
    }

    #[test]
    fn test_naming_is_deterministic_and_idempotent() {
        let rels: ImageRelations = vec![
            rel("a", "quay.io/one/app:1"),
            rel("b", "quay.io/two/app:1"),
            rel("c", "ghcr.io/three/app:1"),
            rel("d", "nginx:1.25"),
        ]
        .into_iter()
        .collect();

        let first = rels.with_resource_names().unwrap();
        let second = rels.with_resource_names().unwrap();
        assert_eq!(first, second);

        let again = first.with_resource_names().unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_names_form_a_bijection() {
        let rels: ImageRelations = vec![
            rel("a", "quay.io/one/app:1"),
            rel("b", "quay.io/two/app:1"),
            rel("c", "quay.io/one/app:1"),
            rel("d", "quay.io/one/app-1:1"),
            rel("e", "quay.io/three/app:1"),
        ]
        .into_iter()
        .collect();
        let named = rels.with_resource_names().unwrap();

        let mut by_name: HashMap<String, String> = HashMap::new();
        let mut by_reference: HashMap<String, String> = HashMap::new();
        for rel in &named {
            let name = rel.resource_name.clone().unwrap();
            let reference = rel.image_reference.to_string();
            assert_eq!(by_name.entry(name.clone()).or_insert(reference.clone()), &reference);
            assert_eq!(by_reference.entry(reference).or_insert(name.clone()), &name);
        }
        assert_eq!(by_name.len(), 4);
    }
}
