//! Integration test crate for Vodon.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on multiple vodon crates to verify they work together.

#[cfg(test)]
mod timeline;

#[cfg(test)]
mod playback;

#[cfg(test)]
mod collab;
