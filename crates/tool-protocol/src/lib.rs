//! # tool-protocol
//!
//! Out-of-process tools over JSON-RPC 2.0, one message per line on a
//! subprocess's stdin/stdout.
//!
//! - [`ToolProvider`] serves a [`agent_core::ToolRegistry`] to whoever is on
//!   the other end of the pipe.
//! - [`Session`] is the consumer side of one connection: handshake, request
//!   correlation by id, per-request timeouts.
//! - [`ToolConsumer`] and [`RemoteTool`] put remote tools behind the same
//!   [`agent_core::Tool`] seam as local ones.
//!
//! ```rust,ignore
//! let consumer = ToolConsumer::new(ProviderCommand::new("datetime-server"));
//! for tool in consumer.discover().await? {
//!     println!("{}: {}", tool.name, tool.description);
//! }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;
pub mod transport;

pub use client::{RemoteTool, ToolConsumer};
pub use error::{McpError, Result};
pub use protocol::{Content, Implementation, McpTool, ResourceDescriptor, extract_text};
pub use server::{ConnectionState, Resource, ToolProvider};
pub use transport::{DEFAULT_REQUEST_TIMEOUT, ProviderCommand, Session};
