// The infra module contains implementations of core traits.
// Each external service gets its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "slack/mod.rs"]
pub mod slack;

#[path = "firestore/mod.rs"]
pub mod firestore;
