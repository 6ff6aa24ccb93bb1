// ============================
// crates/backend-lib/src/geo.rs
// ============================
//! Best-effort location lookup for audit records.
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

const UNKNOWN: &str = "Unknown";
const LOCAL: &str = "Local";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country: String,
    pub city: String,
}

impl GeoLocation {
    pub fn new(country: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            city: city.into(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN)
    }

    pub fn local() -> Self {
        Self::new(LOCAL, LOCAL)
    }
}

/// Resolves an address to a location; never fails, unknowns are "Unknown"
pub trait GeoResolver: Send + Sync {
    fn locate(&self, address: &str) -> GeoLocation;
}

/// Offline resolver: local ranges plus a short table of well-known addresses
#[derive(Debug, Clone, Default)]
pub struct StaticGeoResolver;

impl GeoResolver for StaticGeoResolver {
    fn locate(&self, address: &str) -> GeoLocation {
        let Ok(ip) = address.trim().parse::<IpAddr>() else {
            return GeoLocation::unknown();
        };
        if is_local(&ip) {
            return GeoLocation::local();
        }
        match address.trim() {
            "8.8.8.8" | "8.8.4.4" => GeoLocation::new("United States", "Mountain View"),
            "1.1.1.1" | "1.0.0.1" => GeoLocation::new("United States", "San Francisco"),
            _ => GeoLocation::unknown(),
        }
    }
}

fn is_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            // fc00::/7 unique local
            v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xfe00) == 0xfc00
        },
    }
}
