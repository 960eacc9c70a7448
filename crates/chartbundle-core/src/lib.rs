//! Chartbundle Core - Image relations and chart bundling for OCM
//!
//! This crate provides the building blocks of the `chartbundle` tool:
//! - `ImageRelation`: Declarations that tie a chart value to an image attribute
//! - `assign_resource_names`: Deterministic resource names for referenced images
//! - `BundleProjection`: Image resources and the serialized relation label
//! - `Overlay`: The `localized-values.yaml` produced when unbundling
//! - `HelmChart`: Chart metadata, subchart validation and version stamping

pub mod archive;
pub mod bundle;
pub mod chart;
pub mod component;
pub mod error;
pub mod git;
pub mod localize;
pub mod naming;
pub mod reference;
pub mod relation;
pub mod substitute;

pub use archive::unpack_chart_tarball;
pub use bundle::{BundleProjection, RelationRecord};
pub use chart::{CHART_RESOURCE_PREFIX, ChartDependency, ChartMetadata, HelmChart};
pub use component::{
    ComponentConstructor, ComponentDeclaration, Label, Provider, ResourceAccess,
    ResourceDeclaration, ResourceInfo, ResourceInfoSet, ResourceInput,
};
pub use error::{CoreError, Result};
pub use git::GitLocation;
pub use localize::{Overlay, OverlayNode};
pub use naming::assign_resource_names;
pub use reference::ImageReference;
pub use relation::{Attribute, ImageRelation, ImageRelations};
pub use substitute::{Environment, ProcessEnvironment, substitute};
