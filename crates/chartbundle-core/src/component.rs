//! OCM component descriptors
//!
//! Two views on the same data: the `component-constructor.yaml` that is
//! produced when bundling (consumed by `ocm add componentversions`), and the
//! resource listing printed by `ocm get resources -o json` that is read when
//! unbundling. Only the fields this tool needs are modelled.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Label on the chart resource holding the serialized image relations
pub const IMAGE_RELATIONS_LABEL: &str = "cloud.sap/image-relations";

/// Label on the chart resource holding the JSON-encoded Git location
pub const GIT_LOCATION_LABEL: &str = "cloud.sap/git-location";

/// Resource type of a Helm chart
pub const HELM_CHART_TYPE: &str = "helmChart";

/// Resource type of a container image
pub const OCI_IMAGE_TYPE: &str = "ociImage";

/// Access type pointing into an OCI registry
pub const OCI_ARTIFACT_ACCESS: &str = "ociArtifact";

/// Top level of a `component-constructor.yaml` file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentConstructor {
    pub components: Vec<ComponentDeclaration>,
}

/// `components[]` in a component constructor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDeclaration {
    pub name: String,
    pub version: String,
    pub provider: Provider,
    pub resources: Vec<ResourceDeclaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
}

/// `components[].resources[]` in a component constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<ResourceAccess>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<ResourceInput>,
}

/// Resource label; OCM allows arbitrary YAML as value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Where the artifact store fetches a resource from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResourceAccess {
    #[serde(rename = "ociArtifact")]
    OciArtifact {
        #[serde(rename = "imageReference")]
        image_reference: String,
    },
}

/// Local input the artifact store packs into the component version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResourceInput {
    #[serde(rename = "dir")]
    Dir { path: String },
}

/// A resource as reported by `ocm get resources -o json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// e.g. "helmChart" or "ociImage"
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub access: ResourceAccessInfo,
}

impl ResourceInfo {
    /// Look up a label value by name
    pub fn label(&self, name: &str) -> Option<&serde_json::Value> {
        self.labels
            .iter()
            .find(|label| label.name == name)
            .map(|label| &label.value)
    }

    /// Read a label whose value must be a string
    pub fn string_label(&self, name: &str) -> Result<Option<&str>> {
        match self.label(name) {
            None => Ok(None),
            Some(serde_json::Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(CoreError::InvalidLabel {
                label: name.to_string(),
                resource: self.name.clone(),
                message: format!("expected string value, but got {}", other),
            }),
        }
    }

    /// The image reference of an `ociImage` resource with `ociArtifact` access
    pub fn image_reference(&self) -> Result<&str> {
        if self.resource_type != OCI_IMAGE_TYPE
            || self.access.access_type != OCI_ARTIFACT_ACCESS
            || self.access.image_reference.is_empty()
        {
            return Err(CoreError::NotAnImage {
                name: self.name.clone(),
            });
        }
        Ok(&self.access.image_reference)
    }
}

/// `access` of a listed resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAccessInfo {
    /// e.g. "localBlob" or "ociArtifact"
    #[serde(rename = "type", default)]
    pub access_type: String,
    /// only for "ociArtifact"
    #[serde(default)]
    pub image_reference: String,
    /// only for "localBlob"
    #[serde(default)]
    pub media_type: String,
    /// only for "localBlob"
    #[serde(default)]
    pub local_reference: String,
}

/// All resources of one component version
#[derive(Debug, Clone, Default)]
pub struct ResourceInfoSet(pub Vec<ResourceInfo>);

#[derive(Deserialize)]
struct ResourceListing {
    #[serde(default)]
    items: Vec<ResourceListingItem>,
}

#[derive(Deserialize)]
struct ResourceListingItem {
    element: ResourceInfo,
}

impl ResourceInfoSet {
    /// Parse the output of `ocm get resources -o json`
    pub fn from_ocm_json(json: &[u8]) -> Result<Self> {
        let listing: ResourceListing = serde_json::from_slice(json)?;
        Ok(Self(listing.items.into_iter().map(|item| item.element).collect()))
    }

    /// Return the only resource matching the predicate
    ///
    /// `description` names the criterion in the error when there are zero
    /// or several matches.
    pub fn find_exactly_one_with<F>(&self, description: &str, predicate: F) -> Result<&ResourceInfo>
    where
        F: Fn(&ResourceInfo) -> bool,
    {
        let matches: Vec<&ResourceInfo> = self.0.iter().filter(|&res| predicate(res)).collect();
        match matches.as_slice() {
            [] => Err(CoreError::ResourceNotFound {
                description: description.to_string(),
            }),
            [only] => Ok(*only),
            _ => Err(CoreError::AmbiguousResource {
                description: description.to_string(),
                count: matches.len(),
            }),
        }
    }

    /// The single Helm chart resource
    pub fn helm_chart(&self) -> Result<&ResourceInfo> {
        self.find_exactly_one_with(&format!("type: {:?}", HELM_CHART_TYPE), |res| {
            res.resource_type == HELM_CHART_TYPE
        })
    }

    /// The single resource with the given name
    pub fn by_name(&self, name: &str) -> Result<&ResourceInfo> {
        self.find_exactly_one_with(&format!("name: {:?}", name), |res| res.name == name)
    }
}
