//! Settings Tests
//!
//! Tests for:
//! - JSON round trip through `to_json_string` / `from_json_str`
//! - Building cores from settings (colours, planes, flags, depth format)
//! - Loading from a file and reporting malformed input

use glam::Vec4;

use myth_postfx::errors::PostFxError;
use myth_postfx::renderer::passes::{CrossSectionCore, XRayEffectCore};
use myth_postfx::resources::color;
use myth_postfx::settings::{DepthFormat, PostFxSettings};

#[test]
fn json_round_trip_preserves_every_field() {
    let mut settings = PostFxSettings::default();
    settings.cross_section.section_color = "#00FF00".to_string();
    settings.cross_section.planes_enabled = [true, false, true, false];
    settings.cross_section.planes[2] = [0.0, 0.0, 1.0, -0.25];
    settings.xray.double_pass = true;
    settings.xray.outline_fading_factor = 3.0;
    settings.xray.depth_format = DepthFormat::Depth24PlusStencil8;
    settings.pool.max_idle_frames = 10;

    let json = settings.to_json_string().unwrap();
    assert!(json.contains("depth24_plus_stencil8"));
    let parsed = PostFxSettings::from_json_str(&json).unwrap();
    assert_eq!(parsed, settings);
}

#[test]
fn cross_section_core_from_settings() {
    let settings = PostFxSettings::from_json_str(
        r##"{
            "cross_section": {
                "section_color": "#FF0000",
                "planes_enabled": [false, true, false, false],
                "planes": [[0,0,0,0],[1,0,0,-0.5],[0,0,0,0],[0,0,0,0]]
            }
        }"##,
    )
    .unwrap();

    let core = CrossSectionCore::from_settings(&settings.cross_section).unwrap();
    assert_eq!(core.section_color(), color::RED);
    assert_eq!(core.planes_enabled(), [false, true, false, false]);
    assert_eq!(core.plane_params().col(1), Vec4::new(1.0, 0.0, 0.0, -0.5));
}

#[test]
fn xray_core_from_settings() {
    let settings = PostFxSettings::from_json_str(
        r#"{
            "xray": {
                "effect_name": "Highlight",
                "color": "yellow",
                "double_pass": true,
                "clear_target": false,
                "depth_format": "depth24_plus_stencil8"
            }
        }"#,
    )
    .unwrap();

    let core = XRayEffectCore::from_settings(&settings.xray).unwrap();
    assert_eq!(core.effect_name(), "Highlight");
    assert_eq!(core.color(), color::YELLOW);
    assert!(core.double_pass());
    assert!(!core.clear_target());
    assert!((core.outline_fading_factor() - 1.5).abs() < f32::EPSILON);
    assert_eq!(core.depth_format(), wgpu::TextureFormat::Depth24PlusStencil8);
}

#[test]
fn invalid_color_fails_core_construction() {
    let mut settings = PostFxSettings::default();
    settings.xray.color = "#GGGGGG".to_string();
    let err = XRayEffectCore::from_settings(&settings.xray).unwrap_err();
    assert!(matches!(err, PostFxError::InvalidColor(_)));
}

#[test]
fn malformed_json_is_a_settings_error() {
    let err = PostFxSettings::from_json_str("{ \"xray\": { \"double_pass\": 1 } }").unwrap_err();
    assert!(matches!(err, PostFxError::Settings(_)));
}

#[test]
fn load_from_file() {
    let path = std::env::temp_dir().join(format!("myth_postfx_settings_{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "pool": { "max_idle_frames": 7 } }"#).unwrap();
    let settings = PostFxSettings::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(settings.pool.max_idle_frames, 7);
    assert_eq!(settings.xray, PostFxSettings::default().xray);

    let missing = PostFxSettings::from_json_file(&path).unwrap_err();
    assert!(matches!(missing, PostFxError::Io(_)));
}
