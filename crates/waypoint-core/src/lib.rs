//! # Waypoint Core
//!
//! Core types and traits shared by every Waypoint crate.
//!
//! This crate provides the foundational types used throughout Waypoint:
//!
//! - [`RoutingError`] - The routing error taxonomy and its JSON envelope
//! - [`Request`] / [`Response`] - HTTP message aliases over `http`
//! - [`Handler`], [`Reply`], [`IntoReply`] - Handler invocation and return coercion
//! - [`HandlerRef`] - A handler given as a callable or as a container alias
//! - [`Resolver`], [`Container`], [`ClassRegistry`] - Alias resolution capabilities
//! - [`RequestTarget`] - Host, scheme and port of a server-side request
//! - [`Params`] / [`RouteArgs`] - Captured path variables
//! - [`Emitter`] - The transport emission boundary

#![doc(html_root_url = "https://docs.rs/waypoint-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod di;
mod emit;
mod error;
mod handler;
mod params;
mod target;
mod types;

pub use di::{ClassRegistry, Container, Controller, Lookup, Resolver, Service};
pub use emit::Emitter;
pub use error::{ErrorCategory, ErrorDetail, ErrorEnvelope, RoutingError, RoutingResult};
pub use handler::{Handler, HandlerRef, IntoReply, Json, Reply, RouteArgs};
pub use params::Params;
pub use target::{default_port, RequestTarget};
pub use types::{BoxFuture, Request, Response, ResponseExt};
