//! Client core for the team/user registry service.
//!
//! # Overview
//! The registry speaks JSON:API. This crate turns domain operations (create,
//! find and update teams, create and get users, add and remove members) into
//! `HttpRequest` values, and turns JSON:API responses back into denormalized
//! domain objects with relationships already resolved.
//!
//! # Design
//! - `RegistryClient` is stateless: it holds only a `ClientConfig`.
//! - Each operation is split into `build_*` (produces request) and `parse_*`
//!   (consumes response), so the I/O boundary is explicit.
//! - `TeamRegistry` chains build → `Transport::execute` → parse for callers
//!   that want a one-call API. `UreqTransport` is the default transport.
//! - Non-2xx statuses are envelopes with `ok == false`, never errors.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod jsonapi;
pub mod registry;
pub mod transport;
pub mod types;

pub use client::RegistryClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use registry::TeamRegistry;
pub use transport::{Transport, UreqTransport};
pub use types::{
    is_success, ApiResponse, Member, Related, Team, TeamResponse, TeamsResponse, User, UserResponse,
};
