//! Vodon Core - Foundation types for synchronized video review
//!
//! This crate provides the fundamental types used throughout Vodon:
//! - Time representation (RationalTime, FrameRate)
//! - Annotation records (shapes, bindings, assets) and drawing snapshots
//! - Change sets exchanged with the replication layer

pub mod drawing;
pub mod error;
pub mod time;

pub use drawing::{
    Asset, AssetKind, Binding, Container, DashStyle, DocumentDelta, DrawingSnapshot, Shape,
    ShapeKind, ShapeStyle, SizeStyle,
};
pub use error::{Result, VodonError};
pub use time::{FrameRate, RationalTime};
