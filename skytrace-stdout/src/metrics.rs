use std::fmt;

use async_trait::async_trait;

use skytrace::export::{ExportError, ExportResult};
use skytrace::metrics::MetricData;
use skytrace::Resource;

/// An exporter that writes counter snapshots to stdout on export.
pub struct MetricExporter {
    resource: Resource,
    resource_emitted: bool,
    is_shutdown: bool,
}

impl fmt::Debug for MetricExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("stdout::MetricExporter")
    }
}

impl Default for MetricExporter {
    fn default() -> Self {
        MetricExporter {
            resource: Resource::empty(),
            resource_emitted: false,
            is_shutdown: false,
        }
    }
}

#[async_trait]
impl skytrace::export::MetricExporter for MetricExporter {
    async fn export(&mut self, batch: Vec<MetricData>) -> ExportResult {
        if self.is_shutdown {
            return Err(ExportError::Shutdown);
        }
        if !self.resource_emitted {
            self.resource_emitted = true;
            super::print_resource(&self.resource);
        }
        for metric in batch {
            println!("Metric {:?}", metric.name);
            if !metric.description.is_empty() {
                println!("\t Description: {}", metric.description);
            }
            for point in metric.points.iter() {
                let attrs = point
                    .attributes
                    .iter()
                    .map(|kv| format!("{}={}", kv.key, kv.value))
                    .collect::<Vec<_>>()
                    .join(",");
                println!("\t Sum{{{attrs}}} = {}", point.value);
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
