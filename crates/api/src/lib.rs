//! HTTP API: router, handlers, and request/response mapping for the catalog.

pub mod app;
