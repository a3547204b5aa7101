//! Representation of the entity producing telemetry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{Key, KeyValue, Value};

/// Resource attribute naming the deployed service instance class.
pub const SERVICE_NAME: &str = "service.name";
/// Resource attribute naming the deployment environment (`dev`, `prod`, ...).
pub const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment";

#[derive(Debug, PartialEq)]
struct ResourceInner {
    attrs: HashMap<Key, Value>,
}

/// An immutable set of attributes identifying a telemetry-producing entity.
///
/// Built once at process startup and shared (`Arc`-backed clone) with every
/// provider; attached to every exported payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

impl Resource {
    /// Creates a [`ResourceBuilder`].
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder {
            attrs: HashMap::new(),
        }
    }

    /// An empty resource, used where no identity has been configured.
    pub fn empty() -> Self {
        Resource {
            inner: Arc::new(ResourceInner {
                attrs: HashMap::new(),
            }),
        }
    }

    /// Retrieve the attribute value for the given key, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.attrs.get(&Key::new(key.to_string()))
    }

    /// The `service.name` attribute as a string, if present.
    pub fn service_name(&self) -> Option<String> {
        self.get(SERVICE_NAME).map(Value::to_string)
    }

    /// Iterate over all attributes.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.inner.attrs.iter()
    }

    /// Returns the number of attributes.
    pub fn len(&self) -> usize {
        self.inner.attrs.len()
    }

    /// Returns `true` if the resource has no attributes.
    pub fn is_empty(&self) -> bool {
        self.inner.attrs.is_empty()
    }
}

impl Default for Resource {
    fn default() -> Self {
        Resource::empty()
    }
}

/// Builder for [`Resource`].
#[derive(Debug)]
pub struct ResourceBuilder {
    attrs: HashMap<Key, Value>,
}

impl ResourceBuilder {
    /// Set the `service.name` attribute.
    pub fn with_service_name(mut self, name: impl Into<Value>) -> Self {
        self.attrs.insert(Key::from_static_str(SERVICE_NAME), name.into());
        self
    }

    /// Set the `deployment.environment` attribute.
    pub fn with_deployment_environment(mut self, environment: impl Into<Value>) -> Self {
        self.attrs
            .insert(Key::from_static_str(DEPLOYMENT_ENVIRONMENT), environment.into());
        self
    }

    /// Add an arbitrary attribute. Values are de-duplicated by key, and the
    /// last value for a key wins.
    pub fn with_attribute(mut self, kv: KeyValue) -> Self {
        self.attrs.insert(kv.key, kv.value);
        self
    }

    /// Build the immutable [`Resource`].
    pub fn build(self) -> Resource {
        Resource {
            inner: Arc::new(ResourceInner { attrs: self.attrs }),
        }
    }
}
