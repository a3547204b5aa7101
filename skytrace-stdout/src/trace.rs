use std::fmt;

use async_trait::async_trait;

use skytrace::export::{ExportError, ExportResult};
use skytrace::trace::SpanData;
use skytrace::Resource;

/// An exporter that writes spans to stdout on export.
pub struct SpanExporter {
    resource: Resource,
    resource_emitted: bool,
    is_shutdown: bool,
}

impl fmt::Debug for SpanExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("stdout::SpanExporter")
    }
}

impl Default for SpanExporter {
    fn default() -> Self {
        SpanExporter {
            resource: Resource::empty(),
            resource_emitted: false,
            is_shutdown: false,
        }
    }
}

#[async_trait]
impl skytrace::export::SpanExporter for SpanExporter {
    async fn export(&mut self, batch: Vec<SpanData>) -> ExportResult {
        if self.is_shutdown {
            return Err(ExportError::Shutdown);
        }
        if !self.resource_emitted {
            self.resource_emitted = true;
            super::print_resource(&self.resource);
        }
        print_spans(batch);
        Ok(())
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.resource = resource.clone();
    }

    fn shutdown(&mut self) {
        self.is_shutdown = true;
    }
}

fn print_spans(batch: Vec<SpanData>) {
    for (i, span) in batch.into_iter().enumerate() {
        println!("Span #{i}");
        println!("\t Name: {:?}", span.name);
        println!("\t TraceId: {:?}", span.span_context.trace_id());
        println!("\t SpanId: {:?}", span.span_context.span_id());
        println!("\t ParentSpanId: {:?}", span.parent_span_id);
        println!("\t Start time: {}", super::format_time(span.start_time));
        println!("\t End time: {}", super::format_time(span.end_time));
        println!("\t Status: {:?}", span.status);

        let mut print_header = true;
        for kv in span.attributes.iter() {
            if print_header {
                println!("\t Attributes:");
                print_header = false;
            }
            println!("\t\t {}: {:?}", kv.key, kv.value);
        }
    }
}
