//! Error Types
//!
//! This module defines the error types used throughout the animation engine.
//!
//! # Overview
//!
//! Errors are only ever returned from *construction* APIs (skeleton building,
//! graph definition building, clip validation). The per-frame evaluation path
//! never fails: invalid indices are logged and ignored, and scratch exhaustion
//! degrades the affected output to the rest pose for that frame.
//!
//! ```rust,ignore
//! use marionette_core::errors::{AnimationError, Result};
//!
//! fn build() -> Result<usize> {
//!     let mut skeleton = Skeleton::new("hero");
//!     skeleton.add_joint("root", None, JointTransform::IDENTITY, Affine3A::IDENTITY)
//! }
//! ```

use thiserror::Error;

/// The main error type for the animation engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    // ========================================================================
    // Construction Errors
    // ========================================================================
    /// A fixed-capacity table is full.
    #[error("Capacity exceeded: {table} holds at most {capacity} entries")]
    CapacityExceeded {
        /// Name of the table that overflowed
        table: &'static str,
        /// Its fixed capacity
        capacity: usize,
    },

    /// An index referenced an entry that does not exist.
    #[error("Invalid index: {context} (index: {index})")]
    InvalidIndex {
        /// Description of what was being accessed
        context: &'static str,
        /// The invalid index
        index: usize,
    },

    /// A name was registered twice in the same table.
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    // ========================================================================
    // Asset Data Errors
    // ========================================================================
    /// The skeleton hierarchy is malformed.
    #[error("Invalid skeleton: {0}")]
    InvalidSkeleton(String),

    /// A clip channel has malformed keyframe data.
    #[error("Invalid channel: {0}")]
    InvalidChannel(String),

    // ========================================================================
    // Runtime Errors
    // ========================================================================
    /// The per-frame scratch arena ran out of space.
    #[error("Scratch memory exhausted: requested {requested} joints")]
    ScratchExhausted {
        /// Number of joint transforms that could not be allocated
        requested: usize,
    },
}

/// Alias for `Result<T, AnimationError>`.
pub type Result<T> = std::result::Result<T, AnimationError>;
