//! # archer-link
//!
//! Session and field-metadata client for the Archer GRC REST API - THE CLIENT.
//!
//! ```text
//! SessionResolver ──> AmbientSessionProvider   (hosted? borrow its token)
//!        │        ──> KeyValueStore (session)  (stored external token)
//!        │        ──> ArcherClient ──> HttpTransport
//!        └──> metadata + ChangeAwareCache      (alias <-> id tables)
//!
//! Session ──> endpoints (field get/set, applications, values lists, feeds)
//! ```
//!
//! The pure pieces (cache, stores, mapping, wire types) live in
//! `archer-link-core`; this crate adds the network and the CLI.

pub mod ambient;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod metadata;
pub mod paths;
pub mod session;

#[cfg(test)]
mod testing;

pub use ambient::{AmbientContext, AmbientSessionProvider, EnvAmbient, NotHosted};
pub use client::{
    ApiRequest, ApiResponse, ArcherClient, Authorization, HttpTransport, ReqwestTransport,
};
pub use config::ClientConfig;
pub use endpoints::Tagged;
pub use session::{
    Credentials, Session, SessionRequest, SessionResolver, SessionScope, StoredToken,
};
