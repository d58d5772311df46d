//! Blocking client for a single-endpoint, form-POST REST API with JSON
//! payloads.
//!
//! # Overview
//! Every remote operation is one POST to one URL, carrying the operation name
//! and a JSON-encoded parameter mapping. The client renders that URL from a
//! template, authenticates, merges the session id into session-scoped calls
//! and classifies every outcome into a typed `ApiError`.
//!
//! # Design
//! - `EntryPointBuilder` renders the URL and bumps a generation counter on
//!   every change.
//! - `Transport` / `Connector` separate "send one POST" from "bind to a URL";
//!   `HttpConnector` is the live `ureq` implementation.
//! - `ApiDispatcher` is the only path to the network. It rebinds the
//!   transport when the generation moves and keeps the last error.
//! - `SessionManager` owns credentials and the session id and drives login
//!   and logout through the dispatcher.
//! - `SugarClient` ties one dispatcher to one session and carries the typed
//!   per-operation wrappers. There is no global client.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod operations;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use client::SugarClient;
pub use config::ClientConfig;
pub use dispatch::{ApiDispatcher, Scope};
pub use endpoint::EntryPointBuilder;
pub use error::{ApiError, TransportError};
pub use http::{FormFields, HttpResponse};
pub use operations::{
    DocumentRevision, EntryListQuery, LayoutQuery, NoteAttachment, RelationshipQuery, SearchQuery,
};
pub use session::{Credentials, SessionManager, SessionState};
pub use transport::{Connector, HttpConnector, HttpTransport, Transport};
pub use types::{name_value_list, name_value_map, parameters, Fault, Parameters};
