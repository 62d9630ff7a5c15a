// dqscore-core/src/ports/mod.rs
//
// What the pipeline needs from the outside world, without knowing how it's done.

pub mod alert_sink;
pub mod store;

pub use alert_sink::AlertSink;
pub use store::{FeedRead, QualityStore, SchemaSnapshots};
