//! # Mediatorr Server
//!
//! HTTP surface over the Mediatorr core: catalog browsing, artifact
//! regeneration, scan control, and a server-sent event stream of scan
//! progress and logs.

pub mod handlers;
pub mod infra;
pub mod routes;
