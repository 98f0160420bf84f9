//! Network seam for Tessera replicas.
//!
//! Outbound traffic goes through the [`Transport`] trait (fire-and-forget,
//! one HTTP POST per message). Inbound traffic arrives on an axum
//! [`Router`](axum::Router) that decodes each endpoint into its typed
//! message and hands it to the replica as a [`WireMessage`](tessera_messages::WireMessage).

pub mod directory;
pub mod endpoint;
pub mod error;
pub mod inbound;
pub mod transport;

pub use directory::PeerDirectory;
pub use endpoint::Endpoint;
pub use error::NetworkError;
pub use inbound::{inbound_router, InboundChannels};
pub use transport::{HttpTransport, Transport};
