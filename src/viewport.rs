use serde::Serialize;

use crate::error::ConfigError;

/// A named rendering preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportProfile {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub device_scale: f64,
}

impl ViewportProfile {
    pub const DESKTOP: ViewportProfile = ViewportProfile {
        name: "desktop",
        width: 1920,
        height: 1080,
        device_scale: 1.0,
    };
    pub const LAPTOP: ViewportProfile = ViewportProfile {
        name: "laptop",
        width: 1366,
        height: 768,
        device_scale: 1.0,
    };
    pub const TABLET: ViewportProfile = ViewportProfile {
        name: "tablet",
        width: 768,
        height: 1024,
        device_scale: 1.0,
    };
    pub const MOBILE: ViewportProfile = ViewportProfile {
        name: "mobile",
        width: 375,
        height: 812,
        device_scale: 2.0,
    };

    /// Looks up a preset by name.
    pub fn by_name(name: &str) -> Result<&'static ViewportProfile, ConfigError> {
        VIEWPORTS
            .iter()
            .find(|profile| profile.name == name)
            .ok_or_else(|| ConfigError::UnknownViewport {
                name: name.to_string(),
                valid: names().join(", "),
            })
    }

    /// Whether this preset emulates a handheld device.
    pub fn is_mobile(&self) -> bool {
        self.device_scale > 1.0
    }
}

/// The fixed preset registry, in presentation order.
pub static VIEWPORTS: [ViewportProfile; 4] = [
    ViewportProfile::DESKTOP,
    ViewportProfile::LAPTOP,
    ViewportProfile::TABLET,
    ViewportProfile::MOBILE,
];

pub fn names() -> Vec<&'static str> {
    VIEWPORTS.iter().map(|profile| profile.name).collect()
}
