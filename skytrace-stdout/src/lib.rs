//! Exporters that write signals to stdout in a human-readable layout.
//!
//! Used as the always-on secondary ("debug") sink of the collector's
//! fan-out, and by demo services running without a collector. Output is for
//! eyes, not machines; the format carries no compatibility promise.

mod logs;
mod metrics;
mod trace;

pub use logs::LogExporter;
pub use metrics::MetricExporter;
pub use trace::SpanExporter;

use chrono::{DateTime, Utc};
use std::time::SystemTime;

fn format_time(time: SystemTime) -> String {
    let datetime: DateTime<Utc> = time.into();
    datetime.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn print_resource(resource: &skytrace::Resource) {
    println!("Resource");
    let mut attrs: Vec<_> = resource.iter().collect();
    attrs.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in attrs {
        println!("\t {key}={value:?}");
    }
}
