//! Webhook event classification.
//!
//! This module turns a raw GitHub webhook delivery (event-type header plus
//! JSON payload) into a typed [`ClassifiedEvent`], or decides the delivery
//! is not one we track.

pub mod classify;
pub mod events;

pub use classify::{classify, ClassifyError};
pub use events::{Action, ClassifiedEvent, Subject};
