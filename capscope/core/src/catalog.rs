//! The static per-provider operation catalog.
//!
//! Consumed, never produced, by this engine: the provider-integration
//! layer hands the catalog in, the filter partitions it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One operation from the catalog: id, wire shape, and parameter needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// `"{module}/{action}"` or `"{resourceType}/{action}"`.
    pub id: String,
    pub method: String,
    pub path_template: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_params: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_params: Vec<String>,
}

impl OperationDescriptor {
    pub fn new(
        id: impl Into<String>,
        method: impl Into<String>,
        path_template: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            path_template: path_template.into(),
            required_params: Vec::new(),
            optional_params: Vec::new(),
        }
    }

    /// The governing namespace: everything before the first `/`, or the
    /// whole id when there is none.
    pub fn namespace(&self) -> &str {
        namespace_of(&self.id)
    }
}

/// The namespace part of an operation id.
pub fn namespace_of(operation_id: &str) -> &str {
    operation_id
        .split_once('/')
        .map(|(ns, _)| ns)
        .unwrap_or(operation_id)
}

/// Catalog of operations, looked up by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationCatalog {
    operations: BTreeMap<String, OperationDescriptor>,
}

impl OperationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: OperationDescriptor) {
        self.operations.insert(descriptor.id.clone(), descriptor);
    }

    pub fn get(&self, operation_id: &str) -> Option<&OperationDescriptor> {
        self.operations.get(operation_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.operations.values()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl FromIterator<OperationDescriptor> for OperationCatalog {
    fn from_iter<I: IntoIterator<Item = OperationDescriptor>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for descriptor in iter {
            catalog.insert(descriptor);
        }
        catalog
    }
}
