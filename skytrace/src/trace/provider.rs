use std::sync::Arc;

use crate::export::{ExportResult, SpanExporter};
use crate::resource::Resource;

use super::{IdGenerator, RandomIdGenerator, SimpleSpanProcessor, SpanData, SpanProcessor, Tracer};

#[derive(Debug)]
struct TracerProviderInner {
    resource: Resource,
    id_generator: Box<dyn IdGenerator>,
    processors: Vec<Box<dyn SpanProcessor>>,
}

/// Owner of span processors and the trace-side resource identity.
///
/// Constructed explicitly at startup, cloned (cheaply) wherever spans are
/// started, and shut down exactly once when the process stops serving.
#[derive(Clone, Debug)]
pub struct TracerProvider {
    inner: Arc<TracerProviderInner>,
}

impl TracerProvider {
    /// Create a [`TracerProviderBuilder`].
    pub fn builder() -> TracerProviderBuilder {
        TracerProviderBuilder {
            resource: Resource::empty(),
            id_generator: None,
            exporters: Vec::new(),
            processors: Vec::new(),
        }
    }

    /// Obtain a tracer backed by this provider.
    pub fn tracer(&self) -> Tracer {
        Tracer::new(self.clone())
    }

    /// The resource attached to every span from this provider.
    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    pub(crate) fn id_generator(&self) -> &dyn IdGenerator {
        self.inner.id_generator.as_ref()
    }

    pub(crate) fn on_end(&self, span: SpanData) {
        for processor in &self.inner.processors {
            processor.on_end(span.clone());
        }
    }

    /// Wait until every span handed to the processors so far has been
    /// exported.
    pub async fn force_flush(&self) -> ExportResult {
        for processor in &self.inner.processors {
            processor.force_flush().await?;
        }
        Ok(())
    }

    /// Flush and shut down all span processors.
    pub async fn shutdown(&self) -> ExportResult {
        for processor in &self.inner.processors {
            processor.shutdown().await?;
        }
        Ok(())
    }
}

/// Builder for [`TracerProvider`].
#[derive(Debug)]
pub struct TracerProviderBuilder {
    resource: Resource,
    id_generator: Option<Box<dyn IdGenerator>>,
    exporters: Vec<Box<dyn SpanExporter>>,
    processors: Vec<Box<dyn SpanProcessor>>,
}

impl TracerProviderBuilder {
    /// Set the resource identifying the producing entity.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = resource;
        self
    }

    /// Replace the default random id generator.
    pub fn with_id_generator(mut self, id_generator: impl IdGenerator + 'static) -> Self {
        self.id_generator = Some(Box::new(id_generator));
        self
    }

    /// Install a [`SimpleSpanProcessor`] exporting each finished span to
    /// `exporter` as soon as it closes.
    pub fn with_simple_exporter(mut self, exporter: impl SpanExporter) -> Self {
        self.exporters.push(Box::new(exporter));
        self
    }

    /// Install a pre-built span processor.
    pub fn with_span_processor(mut self, processor: impl SpanProcessor + 'static) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Build the provider. Must be called within a Tokio runtime: simple
    /// processors spawn their export task here.
    pub fn build(self) -> TracerProvider {
        let mut processors = self.processors;
        for exporter in self.exporters {
            processors.push(Box::new(SimpleSpanProcessor::new(exporter, &self.resource)));
        }

        TracerProvider {
            inner: Arc::new(TracerProviderInner {
                resource: self.resource,
                id_generator: self
                    .id_generator
                    .unwrap_or_else(|| Box::new(RandomIdGenerator::default())),
                processors,
            }),
        }
    }
}
