//! Lazily populated navigation tree over a PxWeb API
//!
//! Nodes live in an arena owned by [`PxWebApi`] and are addressed by
//! [`NodeId`]. A database node fetches its directory listing on first use;
//! resolved children are memoized for the lifetime of the API value.

mod api;
mod resolve;

pub use api::{statfin_url, verohallinto_url, DatabaseNode, Node, NodeId, PxWebApi};
pub use resolve::{find_entry, TABLE_SUFFIX};
