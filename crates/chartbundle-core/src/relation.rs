//! Image relation declarations
//!
//! An image relation ties a Helm value path to one attribute of a container
//! image, e.g.
//!
//! ```text
//! .Values.db_metrics.image.tag is tag of quay.io/prometheuscommunity/postgres_exporter:0.16.0
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::reference::ImageReference;
use crate::substitute::{self, Environment};

static IMAGE_RELATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\.Values\.(\S+)\s+is\s+(repository|tag|digest|reference)\s+of\s+(\S+)$")
        .expect("valid regex")
});

static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r",|\n").expect("valid regex"));

/// Which part of an image reference a relation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    /// Repository name without tag or digest
    Repository,
    /// Content digest, e.g. `sha256:...`
    Digest,
    /// Tag as written in the declaration, e.g. `1.25`
    Tag,
    /// Full normalized reference
    Reference,
}

impl Attribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Repository => "repository",
            Attribute::Digest => "digest",
            Attribute::Tag => "tag",
            Attribute::Reference => "reference",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "repository" => Ok(Attribute::Repository),
            "digest" => Ok(Attribute::Digest),
            "tag" => Ok(Attribute::Tag),
            "reference" => Ok(Attribute::Reference),
            other => Err(format!("unknown image attribute: {}", other)),
        }
    }
}

/// One parsed `--image-relation` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRelation {
    /// Dot-separated Helm value path to overwrite
    pub target_path: String,
    pub attribute: Attribute,
    pub image_reference: ImageReference,
    /// Name of the bundled image resource, once assigned
    pub resource_name: Option<String>,
}

impl ImageRelation {
    /// Parse a single declaration, after `${VAR}` and `$(cmd)` substitution
    pub fn parse(input: &str, env: &dyn Environment) -> Result<Self> {
        let input = substitute::substitute(input, env)?;

        let caps = IMAGE_RELATION
            .captures(&input)
            .ok_or_else(|| CoreError::GrammarMismatch {
                pattern: IMAGE_RELATION.as_str().to_string(),
                input: input.clone(),
            })?;

        let target_path = validate_target_path(&caps[1])?;
        let attribute = caps[2]
            .parse::<Attribute>()
            .map_err(|_| CoreError::GrammarMismatch {
                pattern: IMAGE_RELATION.as_str().to_string(),
                input: input.clone(),
            })?;
        let image_reference = ImageReference::parse(&caps[3])?;

        Ok(Self {
            target_path,
            attribute,
            image_reference,
            resource_name: None,
        })
    }

    /// Read the attribute named by `attribute` off the image reference
    pub fn value(&self) -> Result<String> {
        let reference = &self.image_reference;
        let value = match self.attribute {
            Attribute::Reference => Some(reference.to_string()),
            Attribute::Repository => Some(reference.name()),
            Attribute::Digest => reference.digest().map(str::to_string),
            Attribute::Tag => reference.tag().map(str::to_string),
        };
        value.ok_or_else(|| CoreError::MissingAttribute {
            attribute: self.attribute.to_string(),
            reference: reference.to_string(),
        })
    }
}

/// Reject paths like `a..b`, `.a` or `a.`
pub(crate) fn validate_target_path(path: &str) -> Result<String> {
    if path.split('.').any(str::is_empty) {
        return Err(CoreError::InvalidTargetPath {
            path: path.to_string(),
        });
    }
    Ok(path.to_string())
}

/// An ordered set of image relations
///
/// Order follows the command line, which keeps derived output reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRelations(pub Vec<ImageRelation>);

impl ImageRelations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the values of all `--image-relation` options
    ///
    /// Each value may hold several declarations separated by commas or
    /// newlines. Empty segments are skipped so that trailing separators are
    /// harmless.
    pub fn parse<S: AsRef<str>>(inputs: &[S], env: &dyn Environment) -> Result<Self> {
        let mut relations = Vec::new();
        for input in inputs {
            for segment in SEPARATOR.split(input.as_ref()) {
                let segment = segment.trim();
                if segment.is_empty() {
                    continue;
                }
                let relation = ImageRelation::parse(segment, env)
                    .map_err(|e| e.in_declaration(segment))?;
                relations.push(relation);
            }
        }
        Ok(Self(relations))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageRelation> {
        self.0.iter()
    }
}

impl FromIterator<ImageRelation> for ImageRelations {
    fn from_iter<I: IntoIterator<Item = ImageRelation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ImageRelations {
    type Item = &'a ImageRelation;
    type IntoIter = std::slice::Iter<'a, ImageRelation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
