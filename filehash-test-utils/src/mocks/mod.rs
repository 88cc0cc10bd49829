//! Mock implementations for testing

mod client;
mod hasher;

pub use client::{ClientEvent, RecordingClient};
pub use hasher::MockHasher;
