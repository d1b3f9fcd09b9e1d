//! Error Types
//!
//! This module defines the error types used throughout the post-effect cores.
//!
//! # Overview
//!
//! Only **setup-time** failures are reported through [`PostFxError`]:
//! - Technique attach failures (missing shader passes, buffer registration)
//! - Settings loading and colour parsing
//!
//! Per-frame problems (a missing depth-stencil view, a node without the
//! required pass, a malformed colour attribute) are recovered locally by the
//! render cores and never surface as errors.
//!
//! ```rust,ignore
//! use myth_postfx::errors::Result;
//!
//! fn setup(core: &mut CrossSectionCore, technique: &dyn Technique) -> Result<()> {
//!     core.attach(technique)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::resources::color::ColorParseError;

/// The main error type for the post-effect cores.
#[derive(Error, Debug)]
pub enum PostFxError {
    // ========================================================================
    // Attach Errors
    // ========================================================================
    /// A shader pass required by a render core is not provided by the technique.
    #[error("Technique '{technique}' has no '{pass}' pass")]
    PassUnavailable {
        /// Name of the technique that was searched
        technique: String,
        /// Name of the missing pass
        pass: &'static str,
    },

    /// A constant buffer was registered twice under the same name with different sizes.
    #[error("Constant buffer '{name}' already registered with {registered} bytes (requested {requested})")]
    BufferSizeMismatch {
        /// Buffer name
        name: &'static str,
        /// Size of the existing registration
        registered: usize,
        /// Size requested by the caller
        requested: usize,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A colour string in the settings could not be parsed.
    #[error("Invalid color: {0}")]
    InvalidColor(#[from] ColorParseError),

    /// Settings JSON could not be parsed.
    #[error("Settings parse error: {0}")]
    Settings(#[from] serde_json::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, PostFxError>`.
pub type Result<T> = std::result::Result<T, PostFxError>;
