//! Agent Client - capability wrapper around the external agent platform
//!
//! This crate owns everything that touches the conversational-AI platform:
//! - `AgentPlatform` (`platform`) - the narrow seam the gateway talks
//!   through: create-or-fetch an agent identity, run a message against it
//! - `StudioClient` (`studio`) - the reqwest implementation of the
//!   platform's HTTP protocol
//! - `AgentCache` (`cache`) - process-wide handle cache keyed by credential
//! - `AgentResolver` (`resolver`) - ordered credential resolution:
//!   explicit request credential, pre-warmed default, then failure
//!
//! # Key Principle
//!
//! The platform is an opaque black box. All reasoning, memory, and
//! conversation history live on its side of the wire, partitioned by the
//! session identifier the gateway threads through. Nothing here retries,
//! reorders, or interprets replies beyond extracting the response text.

pub mod cache;
pub mod platform;
pub mod resolver;
pub mod studio;

pub use cache::AgentCache;
pub use platform::{AgentError, AgentHandle, AgentPlatform};
pub use resolver::{AgentResolver, ResolveError, ResolvedVia};
pub use studio::StudioClient;
