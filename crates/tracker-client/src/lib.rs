//! # tracker-client
//!
//! Client side of the tracker's realtime channel. A [`RealtimeClient`]
//! subscribes with the user's token and keeps a [`QueryCache`] honest: each
//! server event marks the affected query families stale so the next read
//! re-fetches authoritative data instead of trusting the event payload.
//!
//! ```rust,ignore
//! let mut client = RealtimeClient::new(ClientConfig::new("http://localhost:3001"))?;
//! client.set_credential(Some(token));
//! let issues = client
//!     .cache()
//!     .get_or_fetch(CacheKey::new(QueryKey::Issues, project_id), || fetch_issues())
//!     .await?;
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod sse;

pub use cache::{CacheKey, QueryCache};
pub use client::RealtimeClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use query::{invalidations_for, parse_frame, ClientEvent, ParsedFrame, QueryKey};
pub use sse::SseDecoder;
