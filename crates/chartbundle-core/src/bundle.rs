//! Projection of image relations into component resources
//!
//! When bundling, every distinct image becomes one `ociImage` resource, and
//! the relations are serialized into the image relations label of the chart
//! resource. The label intentionally omits the image references: when
//! unbundling they are looked up again from the resources by name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::component::{
    OCI_IMAGE_TYPE, ResourceAccess, ResourceDeclaration, ResourceInfoSet,
};
use crate::error::{CoreError, Result};
use crate::reference::ImageReference;
use crate::relation::{Attribute, ImageRelation, ImageRelations, validate_target_path};

/// Serialized form of one image relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelationRecord {
    pub target_path: String,
    pub attribute: Attribute,
    pub image_resource_name: String,
}

impl RelationRecord {
    /// Parse the value of the image relations label
    pub fn parse_list(json: &str) -> Result<Vec<RelationRecord>> {
        let records: Vec<RelationRecord> = serde_json::from_str(json)?;
        for record in &records {
            validate_target_path(&record.target_path)?;
        }
        Ok(records)
    }

    /// Rebuild the full relation by looking up its image resource
    pub fn resolve(&self, resources: &ResourceInfoSet) -> Result<ImageRelation> {
        let resource = resources.by_name(&self.image_resource_name)?;
        let raw = resource.image_reference()?;
        let image_reference =
            ImageReference::parse(raw).map_err(|e| CoreError::ResourceReference {
                name: resource.name.clone(),
                reference: raw.to_string(),
                source: Box::new(e),
            })?;

        Ok(ImageRelation {
            target_path: self.target_path.clone(),
            attribute: self.attribute,
            image_reference,
            resource_name: Some(self.image_resource_name.clone()),
        })
    }
}

/// Output of [`ImageRelations::project`]
#[derive(Debug, Clone, PartialEq)]
pub struct BundleProjection {
    /// One resource per distinct image, sorted by name
    pub resources: Vec<ResourceDeclaration>,
    /// JSON list of [`RelationRecord`]s, `[]` when there are no relations
    pub relations_json: String,
}

impl ImageRelations {
    /// Render resource declarations and the serialized relation set
    ///
    /// Images without a tag use `fallback_version` as their resource version.
    pub fn project(&self, fallback_version: &str) -> Result<BundleProjection> {
        if self.is_empty() {
            return Ok(BundleProjection {
                resources: Vec::new(),
                relations_json: "[]".to_string(),
            });
        }

        let named = self.with_resource_names()?;
        let records = named.records();
        let relations_json = serde_json::to_string(&records)?;

        let mut image_for_name: BTreeMap<&str, &ImageReference> = BTreeMap::new();
        for rel in &named {
            if let Some(name) = rel.resource_name.as_deref() {
                image_for_name.insert(name, &rel.image_reference);
            }
        }

        let resources = image_for_name
            .into_iter()
            .map(|(name, image)| ResourceDeclaration {
                name: name.to_string(),
                resource_type: OCI_IMAGE_TYPE.to_string(),
                version: image.tag().unwrap_or(fallback_version).to_string(),
                labels: Vec::new(),
                access: Some(ResourceAccess::OciArtifact {
                    image_reference: image.to_string(),
                }),
                input: None,
            })
            .collect();

        Ok(BundleProjection {
            resources,
            relations_json,
        })
    }

    /// Serializable records of named relations; unnamed ones are skipped
    pub fn records(&self) -> Vec<RelationRecord> {
        self.iter()
            .filter_map(|rel| {
                rel.resource_name.as_ref().map(|name| RelationRecord {
                    target_path: rel.target_path.clone(),
                    attribute: rel.attribute,
                    image_resource_name: name.clone(),
                })
            })
            .collect()
    }

    /// Resolve serialized records against the resources of a component version
    pub fn resolve(records: &[RelationRecord], resources: &ResourceInfoSet) -> Result<Self> {
        records.iter().map(|record| record.resolve(resources)).collect()
    }
}
