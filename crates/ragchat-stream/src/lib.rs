//! Streaming transport for ragchat.
//!
//! A response body arrives as newline-delimited JSON records in arbitrary,
//! non-line-aligned chunks. [`RecordDemuxer`] turns those chunks into
//! [`StreamEvent`](ragchat_core::StreamEvent)s, [`StreamClient`] drives it
//! over a single long-lived HTTP response, and [`TransferSlot`] tracks the one
//! transfer a stop control can target.

/// HTTP streaming client.
pub mod client;
/// Chunk-to-event demultiplexing.
pub mod demux;
/// The single current transfer.
pub mod slot;

pub use client::{StreamClient, StreamOptions};
pub use demux::RecordDemuxer;
pub use slot::{TransferGuard, TransferSlot};
