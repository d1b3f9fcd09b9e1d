//! Post-Effect Settings
//!
//! Serializable configuration for the render cores and the depth-stencil pool.
//!
//! All sections use `#[serde(default)]`, so a settings file only needs the
//! fields it wants to change. Colours are stored as strings in any form
//! accepted by [`parse_color`](crate::resources::color::parse_color) and are
//! resolved when a core is built.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_postfx::settings::PostFxSettings;
//! use myth_postfx::renderer::passes::{CrossSectionCore, XRayEffectCore};
//!
//! let settings = PostFxSettings::from_json_str(r#"{
//!     "cross_section": { "section_color": "#FF0000", "planes_enabled": [true, false, false, false] },
//!     "xray": { "double_pass": true }
//! }"#)?;
//!
//! let clip = CrossSectionCore::from_settings(&settings.cross_section)?;
//! let xray = XRayEffectCore::from_settings(&settings.xray)?;
//! ```

use std::path::Path;

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::renderer::core::technique_names;
use crate::resources::color::parse_color;

// ---------------------------------------------------------------------------
// DepthFormat
// ---------------------------------------------------------------------------

/// Depth-stencil formats usable by the pooled X-ray buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthFormat {
    #[default]
    Depth32FloatStencil8,
    Depth24PlusStencil8,
}

impl From<DepthFormat> for wgpu::TextureFormat {
    fn from(format: DepthFormat) -> Self {
        match format {
            DepthFormat::Depth32FloatStencil8 => wgpu::TextureFormat::Depth32FloatStencil8,
            DepthFormat::Depth24PlusStencil8 => wgpu::TextureFormat::Depth24PlusStencil8,
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossSectionSettings {
    pub section_color: String,
    pub planes_enabled: [bool; 4],
    /// Planes as `[nx, ny, nz, d]`.
    pub planes: [[f32; 4]; 4],
}

impl Default for CrossSectionSettings {
    fn default() -> Self {
        Self {
            section_color: "firebrick".to_string(),
            planes_enabled: [false; 4],
            planes: [[0.0; 4]; 4],
        }
    }
}

impl CrossSectionSettings {
    pub fn section_color(&self) -> Result<Vec4> {
        Ok(parse_color(&self.section_color)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XRaySettings {
    pub effect_name: String,
    pub color: String,
    pub double_pass: bool,
    pub outline_fading_factor: f32,
    /// Clear the post-process target to transparent before drawing.
    pub clear_target: bool,
    pub depth_format: DepthFormat,
}

impl Default for XRaySettings {
    fn default() -> Self {
        Self {
            effect_name: technique_names::POST_EFFECT_MESH_XRAY.to_string(),
            color: "blue".to_string(),
            double_pass: false,
            outline_fading_factor: 1.5,
            clear_target: true,
            depth_format: DepthFormat::default(),
        }
    }
}

impl XRaySettings {
    pub fn color(&self) -> Result<Vec4> {
        Ok(parse_color(&self.color)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Free buffers idle for more than this many frames are released by `trim`.
    pub max_idle_frames: u32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self { max_idle_frames: 3 }
    }
}

// ---------------------------------------------------------------------------
// PostFxSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostFxSettings {
    pub cross_section: CrossSectionSettings,
    pub xray: XRaySettings,
    pub pool: PoolSettings,
}

impl PostFxSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::color;

    #[test]
    fn test_empty_json_is_default() {
        let settings = PostFxSettings::from_json_str("{}").unwrap();
        assert_eq!(settings, PostFxSettings::default());
        assert_eq!(settings.cross_section.section_color().unwrap(), color::FIREBRICK);
        assert_eq!(settings.xray.color().unwrap(), color::BLUE);
    }

    #[test]
    fn test_partial_section() {
        let settings = PostFxSettings::from_json_str(
            r#"{ "xray": { "double_pass": true, "depth_format": "depth24_plus_stencil8" } }"#,
        )
        .unwrap();
        assert!(settings.xray.double_pass);
        assert!(settings.xray.clear_target);
        assert_eq!(
            wgpu::TextureFormat::from(settings.xray.depth_format),
            wgpu::TextureFormat::Depth24PlusStencil8
        );
    }

    #[test]
    fn test_bad_color_is_reported() {
        let settings = XRaySettings {
            color: "not-a-color".to_string(),
            ..XRaySettings::default()
        };
        assert!(matches!(
            settings.color(),
            Err(crate::errors::PostFxError::InvalidColor(_))
        ));
    }
}
