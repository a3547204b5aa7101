//! Counter metrics.
//!
//! The only instrument kind in this pipeline is the monotonic [`Counter`]:
//! a running total plus one sub-total per distinct attribute combination.
//! Increments are `u64`, so a negative delta is unrepresentable, and each
//! sub-total is updated under a lock — concurrent increments never lose
//! updates.

mod attribute_set;
mod periodic_reader;

pub(crate) use attribute_set::AttributeSet;
pub use periodic_reader::PeriodicMetricReader;

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::common::KeyValue;
use crate::resource::Resource;

/// A cumulative data point: one attribute combination's running total.
#[derive(Clone, Debug, PartialEq)]
pub struct DataPoint {
    /// The attribute combination this sub-total is keyed by.
    pub attributes: Vec<KeyValue>,
    /// Running total for this combination.
    pub value: u64,
    /// Time the snapshot was taken.
    pub time: SystemTime,
}

/// A cumulative snapshot of one instrument.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricData {
    /// Instrument name, unique within the producing service.
    pub name: Cow<'static, str>,
    /// Human-readable description.
    pub description: Cow<'static, str>,
    /// One point per attribute combination observed so far.
    pub points: Vec<DataPoint>,
}

#[derive(Debug)]
struct CounterInner {
    name: Cow<'static, str>,
    description: Cow<'static, str>,
    points: Mutex<HashMap<AttributeSet, u64>>,
}

/// A monotonically increasing instrument.
///
/// Cheap to clone; all clones share the same totals.
#[derive(Clone, Debug)]
pub struct Counter {
    inner: Arc<CounterInner>,
}

impl Counter {
    /// Add `value` to the running total for the given attribute
    /// combination. Attribute order does not matter; duplicate keys keep
    /// the last value.
    pub fn add(&self, value: u64, attributes: &[KeyValue]) {
        let set = AttributeSet::from(attributes);
        let mut points = self.inner.points.lock().expect("counter state poisoned");
        *points.entry(set).or_insert(0) += value;
    }

    fn snapshot(&self, time: SystemTime) -> MetricData {
        let points = self.inner.points.lock().expect("counter state poisoned");
        let mut points: Vec<DataPoint> = points
            .iter()
            .map(|(set, value)| DataPoint {
                attributes: set.to_vec(),
                value: *value,
                time,
            })
            .collect();
        // Stable output order for exporters and assertions.
        points.sort_by(|a, b| {
            let key = |p: &DataPoint| {
                p.attributes
                    .iter()
                    .map(|kv| format!("{}={}", kv.key, kv.value))
                    .collect::<Vec<_>>()
                    .join(",")
            };
            key(a).cmp(&key(b))
        });
        MetricData {
            name: self.inner.name.clone(),
            description: self.inner.description.clone(),
            points,
        }
    }
}

/// Configures and creates a [`Counter`].
#[derive(Debug)]
pub struct CounterBuilder<'a> {
    meter: &'a Meter,
    name: Cow<'static, str>,
    description: Cow<'static, str>,
}

impl CounterBuilder<'_> {
    /// Set the human-readable description.
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = description.into();
        self
    }

    /// Register the instrument with the provider and return its handle.
    ///
    /// Instrument names are unique per provider: building an already
    /// registered name returns the existing instrument (the original
    /// description wins).
    pub fn build(self) -> Counter {
        self.meter
            .provider
            .register_counter(self.name, self.description)
    }
}

/// Creates instruments for a single instrumentation scope.
#[derive(Clone, Debug)]
pub struct Meter {
    provider: MeterProvider,
}

impl Meter {
    /// Start building a `u64` monotonic counter.
    pub fn u64_counter(&self, name: impl Into<Cow<'static, str>>) -> CounterBuilder<'_> {
        CounterBuilder {
            meter: self,
            name: name.into(),
            description: Cow::Borrowed(""),
        }
    }
}

#[derive(Debug)]
struct MeterProviderInner {
    resource: Resource,
    instruments: Mutex<HashMap<Cow<'static, str>, Counter>>,
}

/// Owner of every registered instrument and the metrics-side resource.
#[derive(Clone, Debug)]
pub struct MeterProvider {
    inner: Arc<MeterProviderInner>,
}

impl MeterProvider {
    /// Create a provider with the given resource identity.
    pub fn new(resource: Resource) -> Self {
        MeterProvider {
            inner: Arc::new(MeterProviderInner {
                resource,
                instruments: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Obtain a meter backed by this provider.
    pub fn meter(&self) -> Meter {
        Meter {
            provider: self.clone(),
        }
    }

    /// The resource attached to every snapshot from this provider.
    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    /// Take a cumulative snapshot of every instrument, in registration
    /// order-independent (name-sorted) order.
    pub fn snapshot(&self) -> Vec<MetricData> {
        let time = SystemTime::now();
        let instruments = self
            .inner
            .instruments
            .lock()
            .expect("instrument registry poisoned");
        let mut batch: Vec<MetricData> = instruments
            .values()
            .map(|counter| counter.snapshot(time))
            .collect();
        batch.sort_by(|a, b| a.name.cmp(&b.name));
        batch
    }

    fn register_counter(
        &self,
        name: Cow<'static, str>,
        description: Cow<'static, str>,
    ) -> Counter {
        let mut instruments = self
            .inner
            .instruments
            .lock()
            .expect("instrument registry poisoned");
        if let Some(existing) = instruments.get(&name) {
            if existing.inner.description != description {
                tracing::debug!(
                    name: "meter_provider.duplicate_instrument",
                    instrument = %name,
                    "instrument already registered; keeping original description"
                );
            }
            return existing.clone();
        }
        let counter = Counter {
            inner: Arc::new(CounterInner {
                name: name.clone(),
                description,
                points: Mutex::new(HashMap::new()),
            }),
        };
        instruments.insert(name, counter.clone());
        counter
    }
}
