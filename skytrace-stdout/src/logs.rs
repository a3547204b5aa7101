use std::fmt;

use async_trait::async_trait;

use skytrace::export::{ExportError, ExportResult};
use skytrace::logs::LogRecord;
use skytrace::Resource;

/// An exporter that writes log records to stdout on export.
pub struct LogExporter {
    resource: Resource,
    resource_emitted: bool,
    is_shutdown: bool,
}

impl fmt::Debug for LogExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("stdout::LogExporter")
    }
}

impl Default for LogExporter {
    fn default() -> Self {
        LogExporter {
            resource: Resource::empty(),
            resource_emitted: false,
            is_shutdown: false,
        }
    }
}

#[async_trait]
impl skytrace::export::LogExporter for LogExporter {
    async fn export(&mut self, batch: Vec<LogRecord>) -> ExportResult {
        if self.is_shutdown {
            return Err(ExportError::Shutdown);
        }
        if !self.resource_emitted {
            self.resource_emitted = true;
            super::print_resource(&self.resource);
        }
        for record in batch {
            println!(
                "{} {:5} {}",
                super::format_time(record.timestamp),
                record.severity.as_str(),
                record.body
            );
            if let (Some(trace_id), Some(span_id)) = (record.trace_id, record.span_id) {
                println!("\t TraceId: {trace_id:?}");
                println!("\t SpanId: {span_id:?}");
            }
            for kv in record.attributes.iter() {
                println!("\t {}: {:?}", kv.key, kv.value);
            }
        }
        Ok(())
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.resource = resource.clone();
    }

    fn shutdown(&mut self) {
        self.is_shutdown = true;
    }
}
