//! Smooth reveal of streamed text.
//!
//! Text arrives in bursts; [`RevealTimeline`] buffers it and releases characters
//! at a steady rate, crediting real elapsed time so throttled or missed ticks
//! catch up instead of freezing. [`RevealStore`] keeps one timeline per
//! [`PersistKey`](ragchat_core::PersistKey) for the life of the process, so a
//! view that is torn down and rebuilt resumes exactly where it left off.
//! [`RevealSubscription`] drives a timeline on a tokio interval and publishes
//! the displayed text.

/// Reveal pace.
pub mod rate;
/// Keyed arena of timelines.
pub mod store;
/// Tokio-driven ticking of one timeline.
pub mod subscription;
/// Animation state of one field.
pub mod timeline;

pub use rate::RevealRate;
pub use store::RevealStore;
pub use subscription::RevealSubscription;
pub use timeline::{RevealTimeline, TimelineSnapshot};
