//! In-memory exporters and deterministic id generation for tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::export::{ExportResult, LogExporter, MetricExporter, SpanExporter};
use crate::logs::LogRecord;
use crate::metrics::MetricData;
use crate::resource::Resource;
use crate::trace::{IdGenerator, SpanData, SpanId, TraceId};

/// A [`SpanExporter`] that stores exported spans for later inspection.
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
    resource: Arc<Mutex<Resource>>,
}

impl InMemorySpanExporter {
    /// All spans exported so far, in export order.
    pub fn exported_spans(&self) -> Vec<SpanData> {
        self.spans.lock().unwrap().clone()
    }

    /// The resource the owning processor installed.
    pub fn resource(&self) -> Resource {
        self.resource.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpanExporter for InMemorySpanExporter {
    async fn export(&mut self, mut batch: Vec<SpanData>) -> ExportResult {
        self.spans.lock().unwrap().append(&mut batch);
        Ok(())
    }

    fn set_resource(&mut self, resource: &Resource) {
        *self.resource.lock().unwrap() = resource.clone();
    }
}

/// A [`LogExporter`] that stores exported records for later inspection.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLogExporter {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl InMemoryLogExporter {
    /// All records exported so far, in export order.
    pub fn exported_records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogExporter for InMemoryLogExporter {
    async fn export(&mut self, mut batch: Vec<LogRecord>) -> ExportResult {
        self.records.lock().unwrap().append(&mut batch);
        Ok(())
    }
}

/// A [`MetricExporter`] that stores every exported snapshot.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMetricExporter {
    batches: Arc<Mutex<Vec<Vec<MetricData>>>>,
}

impl InMemoryMetricExporter {
    /// Every snapshot exported so far, oldest first.
    pub fn exported_batches(&self) -> Vec<Vec<MetricData>> {
        self.batches.lock().unwrap().clone()
    }

    /// The most recent snapshot, if any.
    pub fn latest(&self) -> Option<Vec<MetricData>> {
        self.batches.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MetricExporter for InMemoryMetricExporter {
    async fn export(&mut self, batch: Vec<MetricData>) -> ExportResult {
        self.batches.lock().unwrap().push(batch);
        Ok(())
    }
}

/// [`IdGenerator`] that increments a counter for each new id, producing
/// predictable ids for assertions.
#[derive(Clone, Debug)]
pub struct IncrementIdGenerator(Arc<AtomicU64>);

impl IncrementIdGenerator {
    /// Create a new generator starting at 1.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for IncrementIdGenerator {
    fn default() -> Self {
        Self(Arc::new(AtomicU64::new(1)))
    }
}

impl IdGenerator for IncrementIdGenerator {
    fn new_trace_id(&self) -> TraceId {
        TraceId::from(self.0.fetch_add(1, Ordering::SeqCst) as u128)
    }

    fn new_span_id(&self) -> SpanId {
        SpanId::from(self.0.fetch_add(1, Ordering::SeqCst))
    }
}
