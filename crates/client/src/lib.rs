//! Client code for ipscope.
//!
//! This crate provides the HTTP client for the ip-api.com geolocation
//! service, implementing the core [`GeoLookup`](ipscope_core::GeoLookup)
//! interface used by the resolver.

pub mod ipapi;

pub use ipapi::{IpApiClient, IpApiConfig, IpApiError};
