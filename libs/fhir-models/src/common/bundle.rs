//! FHIR Bundle model
//!
//! Measure bundles carry the `Measure` and its libraries; test-case bundles
//! carry a synthetic `Patient` together with the clinical resources that
//! episode-based measures count as episodes.

use super::error::{Error, Result};
use super::measure::Measure;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// FHIR Bundle resource
///
/// A container for a collection of resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Resource type - always "Bundle"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    /// Logical id of this artifact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Indicates the purpose of this bundle - how it was intended to be used
    #[serde(rename = "type")]
    pub bundle_type: BundleType,

    /// When the bundle was assembled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Entry in the bundle - will have a resource or information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Vec<BundleEntry>>,

    /// Additional content beyond core fields (meta, link, signature, ...)
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

fn default_resource_type() -> String {
    "Bundle".to_string()
}

/// Type of Bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleType {
    Document,
    Message,
    Transaction,
    TransactionResponse,
    Batch,
    BatchResponse,
    History,
    Searchset,
    Collection,
}

/// Entry in the bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    /// Full URL for the entry (relative to the base URL, or absolute)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    /// A resource in this bundle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,

    /// Additional content beyond core fields (request, response, search)
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

impl BundleEntry {
    /// Wrap a resource in an entry without a full URL
    pub fn from_resource(resource: Value) -> Self {
        Self {
            full_url: None,
            resource: Some(resource),
            extensions: HashMap::new(),
        }
    }
}

impl Bundle {
    /// Create a new Bundle with minimal required fields
    pub fn new(bundle_type: BundleType) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            id: None,
            bundle_type,
            timestamp: None,
            entry: None,
            extensions: HashMap::new(),
        }
    }

    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        let bundle: Self = serde_json::from_value(value.clone())?;
        if bundle.resource_type != "Bundle" {
            return Err(Error::InvalidResource(format!(
                "expected resourceType 'Bundle', found '{}'",
                bundle.resource_type
            )));
        }
        Ok(bundle)
    }

    /// Convert to JSON Value
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Error::from)
    }

    /// Get the number of entries in the bundle
    pub fn entry_count(&self) -> usize {
        self.entry.as_ref().map(|e| e.len()).unwrap_or(0)
    }

    /// Get entries as a slice
    pub fn entries(&self) -> &[BundleEntry] {
        self.entry.as_deref().unwrap_or(&[])
    }

    /// Add an entry to the bundle
    pub fn add_entry(&mut self, entry: BundleEntry) {
        self.entry.get_or_insert_with(Vec::new).push(entry);
    }

    /// Iterate over every resource carried by the bundle
    pub fn resources(&self) -> impl Iterator<Item = &Value> {
        self.entries().iter().filter_map(|e| e.resource.as_ref())
    }

    /// Iterate over the resources of one `resourceType`
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a Value> + 'a {
        self.resources()
            .filter(move |r| r.get("resourceType").and_then(Value::as_str) == Some(resource_type))
    }

    /// Find a resource by its logical id, regardless of type
    pub fn find_resource(&self, id: &str) -> Option<&Value> {
        self.resources()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
    }

    /// The first `Measure` in the bundle, typed
    pub fn measure(&self) -> Result<Measure> {
        let resource = self
            .resources_of_type("Measure")
            .next()
            .ok_or_else(|| Error::ResourceNotFound("Measure".to_string()))?;
        Measure::from_value(resource)
    }
}
