//! Per-node post-effect attributes.
//!
//! A scene node carries one [`EffectAttributes`] set per post effect it is
//! tagged with. Values are stored as a tagged [`AttributeValue`]; raw strings
//! coming from scene files are resolved once by [`EffectAttributes::insert_raw`]
//! so the render loop never parses text.

use glam::Vec4;
use rustc_hash::FxHashMap;

use super::color::parse_color;

/// Attribute key holding the per-node overlay colour.
pub const COLOR_ATTRIBUTE: &str = "Color";

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Color(Vec4),
    Scalar(f32),
    Flag(bool),
    /// Unresolved text, including colour strings that failed to parse.
    Text(String),
}

impl AttributeValue {
    #[must_use]
    pub fn as_color(&self) -> Option<Vec4> {
        match self {
            Self::Color(c) => Some(*c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            Self::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(v) => Some(*v),
            _ => None,
        }
    }
}

/// Attribute set of one post effect on one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectAttributes {
    effect_name: String,
    values: FxHashMap<String, AttributeValue>,
}

impl EffectAttributes {
    #[must_use]
    pub fn new(effect_name: impl Into<String>) -> Self {
        Self {
            effect_name: effect_name.into(),
            values: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn effect_name(&self) -> &str {
        &self.effect_name
    }

    pub fn insert(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.values.insert(key.into(), value);
    }

    /// Inserts a raw string value, resolving it to a typed value.
    ///
    /// The `"Color"` key is parsed as a colour; when parsing fails the text is
    /// kept as [`AttributeValue::Text`] and later resolves to the effect default.
    /// Other keys become `Flag` for `true`/`false`, `Scalar` for numbers and
    /// `Text` otherwise.
    pub fn insert_raw(&mut self, key: impl Into<String>, raw: &str) {
        let key = key.into();
        let value = if key == COLOR_ATTRIBUTE {
            match parse_color(raw) {
                Ok(color) => AttributeValue::Color(color),
                Err(err) => {
                    log::debug!("Effect '{}': unparseable color '{raw}': {err}", self.effect_name);
                    AttributeValue::Text(raw.to_string())
                }
            }
        } else if let Ok(flag) = raw.trim().parse::<bool>() {
            AttributeValue::Flag(flag)
        } else if let Ok(scalar) = raw.trim().parse::<f32>() {
            AttributeValue::Scalar(scalar)
        } else {
            AttributeValue::Text(raw.to_string())
        };
        self.values.insert(key, value);
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn with_raw(mut self, key: impl Into<String>, raw: &str) -> Self {
        self.insert_raw(key, raw);
        self
    }

    #[must_use]
    pub fn try_get(&self, key: &str) -> Option<&AttributeValue> {
        self.values.get(key)
    }

    /// Resolves the overlay colour: the `"Color"` attribute when it holds a
    /// colour, `default` otherwise.
    #[must_use]
    pub fn resolve_color(&self, default: Vec4) -> Vec4 {
        self.try_get(COLOR_ATTRIBUTE)
            .and_then(AttributeValue::as_color)
            .unwrap_or(default)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::color::{BLUE, RED};

    #[test]
    fn test_color_resolved_at_insert() {
        let attrs = EffectAttributes::new("xray").with_raw(COLOR_ATTRIBUTE, "#FF0000");
        assert_eq!(attrs.try_get(COLOR_ATTRIBUTE), Some(&AttributeValue::Color(RED)));
        assert_eq!(attrs.resolve_color(BLUE), RED);
    }

    #[test]
    fn test_malformed_color_falls_back() {
        let attrs = EffectAttributes::new("xray").with_raw(COLOR_ATTRIBUTE, "not a color");
        assert!(matches!(attrs.try_get(COLOR_ATTRIBUTE), Some(AttributeValue::Text(_))));
        assert_eq!(attrs.resolve_color(BLUE), BLUE);
    }

    #[test]
    fn test_missing_color_falls_back() {
        let attrs = EffectAttributes::new("xray");
        assert_eq!(attrs.resolve_color(BLUE), BLUE);
    }

    #[test]
    fn test_raw_scalars_and_flags() {
        let attrs = EffectAttributes::new("xray")
            .with_raw("Width", "2.5")
            .with_raw("Enabled", "true")
            .with_raw("Mode", "outline");
        assert_eq!(attrs.try_get("Width").and_then(AttributeValue::as_scalar), Some(2.5));
        assert_eq!(attrs.try_get("Enabled").and_then(AttributeValue::as_flag), Some(true));
        assert_eq!(attrs.try_get("Mode"), Some(&AttributeValue::Text("outline".into())));
        assert_eq!(attrs.len(), 3);
    }
}
