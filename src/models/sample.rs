//! Canonical sample record.
//!
//! K_i: Every registry response is mapped onto these types before it leaves a client.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single sample attribute.
///
/// K_i: Tags are not unique. A sample may carry the same tag more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name (characteristic name or XML `TAG`)
    pub tag: String,

    /// Free-text value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Unit of the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Ontology term URIs attached to the value
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub iris: BTreeSet<String>,
}

impl Attribute {
    pub fn new(tag: impl Into<String>, value: Option<String>, unit: Option<String>) -> Self {
        Self {
            tag: tag.into(),
            value,
            unit,
            iris: BTreeSet::new(),
        }
    }

    pub fn with_iris<I, S>(mut self, iris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.iris = iris.into_iter().map(Into::into).collect();
        self
    }
}

/// Canonical sample metadata.
///
/// K_i: A resolved sample carries at least one of `biosample_id` / `sra_sample_id`.
/// B_i: `tax_id` may be missing; the resolver treats that as incomplete, not as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// BioSamples accession (SAM...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biosample_id: Option<String>,

    /// Internal submission registry identifier (ERS..., SRS..., DRS...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sra_sample_id: Option<String>,

    /// Display alias
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Scientific name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organism: Option<String>,

    /// NCBI taxonomy ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<u32>,

    /// Attributes in registry order
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Sample {
    /// A sample is usable once its taxonomy is known.
    pub fn is_usable(&self) -> bool {
        self.tax_id.is_some()
    }

    /// Replace the attribute list, filling the name if it is still unknown.
    ///
    /// Identifiers, organism and taxonomy are left untouched.
    pub fn merge_attributes_from(mut self, other: Sample) -> Self {
        self.attributes = other.attributes;
        if self.name.is_none() {
            self.name = other.name;
        }
        self
    }

    /// First value recorded under a tag (case-insensitive).
    pub fn attribute_value(&self, tag: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.tag.eq_ignore_ascii_case(tag))
            .and_then(|a| a.value.as_deref())
    }
}

/// Minimal record from the submission registry.
///
/// K_i: Only samples the submitter may reference are ever represented here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleReference {
    /// Internal registry identifier
    pub id: String,
    /// BioSamples accession the sample is registered under
    pub biosample_id: Option<String>,
    pub organism: Option<String>,
    pub tax_id: Option<u32>,
}

impl SampleReference {
    pub fn is_usable(&self) -> bool {
        self.tax_id.is_some()
    }

    /// Canonical sample carrying only the reference fields.
    pub fn to_sample(&self) -> Sample {
        Sample {
            biosample_id: self.biosample_id.clone(),
            sra_sample_id: Some(self.id.clone()),
            organism: self.organism.clone(),
            tax_id: self.tax_id,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_requires_tax_id() {
        let mut sample = Sample {
            biosample_id: Some("SAMEA1".to_string()),
            ..Default::default()
        };
        assert!(!sample.is_usable());

        sample.tax_id = Some(9606);
        assert!(sample.is_usable());
    }

    #[test]
    fn test_merge_keeps_identity() {
        let sample = Sample {
            biosample_id: Some("SAMEA9403245".to_string()),
            organism: Some("Homo sapiens".to_string()),
            tax_id: Some(9606),
            ..Default::default()
        };
        let xml = Sample {
            name: Some("test_custom".to_string()),
            organism: Some("Other".to_string()),
            tax_id: Some(1),
            attributes: vec![
                Attribute::new("sex", Some("female".to_string()), None),
                Attribute::new("sex", Some("male".to_string()), None),
            ],
            ..Default::default()
        };

        let merged = sample.merge_attributes_from(xml);
        assert_eq!(merged.tax_id, Some(9606));
        assert_eq!(merged.organism.as_deref(), Some("Homo sapiens"));
        assert_eq!(merged.name.as_deref(), Some("test_custom"));
        assert_eq!(merged.attributes.len(), 2);
        assert_eq!(merged.attribute_value("SEX"), Some("female"));
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let sample = Sample {
            sra_sample_id: Some("ERS000002".to_string()),
            tax_id: Some(580239),
            ..Default::default()
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(
            json,
            r#"{"sra_sample_id":"ERS000002","tax_id":580239,"attributes":[]}"#
        );
    }
}
