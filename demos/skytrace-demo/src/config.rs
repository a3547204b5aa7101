//! Environment configuration shared by the demo binaries.

use std::env;

use crate::ServiceError;

/// Collector ingestion endpoint (text/HTTP transport). Unset means "no
/// collector": signals go to stdout instead.
pub const SKYTRACE_COLLECTOR_ENDPOINT: &str = "SKYTRACE_COLLECTOR_ENDPOINT";
/// Value of the `deployment.environment` resource attribute.
pub const SKYTRACE_ENVIRONMENT: &str = "SKYTRACE_ENVIRONMENT";
/// Listen address override, one per binary.
pub const SKYTRACE_LISTEN: &str = "SKYTRACE_LISTEN";
/// Base URL of the gateway, consumed by the frontend.
pub const GATEWAY_URL: &str = "GATEWAY_URL";
/// Base URL of the geolocator service, consumed by the gateway.
pub const GEOLOCATOR_SERVICE_URL: &str = "GEOLOCATOR_SERVICE_URL";
/// Base URL of the ISS distance service, consumed by the gateway.
pub const ISS_DISTANCE_SERVICE_URL: &str = "ISS_DISTANCE_SERVICE_URL";
/// URL of the public ISS position API.
pub const ISS_API_URL: &str = "ISS_API_URL";
/// URL of the geocoding search endpoint.
pub const GEOCODER_URL: &str = "GEOCODER_URL";

/// Default ISS position API.
pub const DEFAULT_ISS_API_URL: &str = "http://api.open-notify.org/iss-now.json";
/// Default geocoding endpoint.
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Read an optional variable; empty counts as unset.
pub fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

/// Read a variable, falling back to a default.
pub fn with_default(name: &'static str, default: &str) -> String {
    optional(name).unwrap_or_else(|| default.to_string())
}

/// Read a variable the binary cannot run without.
pub fn required(name: &'static str) -> Result<String, ServiceError> {
    optional(name).ok_or(ServiceError::MissingConfig(name))
}
