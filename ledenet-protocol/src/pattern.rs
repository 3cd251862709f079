//! Preset pattern and built-in effect code tables.
//!
//! Immutable process-wide mappings between firmware codes and their
//! human-readable names, safe for concurrent read-only access.

/// Preset animation patterns supported by the standard dialect.
pub struct PresetPattern;

impl PresetPattern {
    pub const SEVEN_COLOR_CROSS_FADE: u8 = 0x25;
    pub const RED_GRADUAL_CHANGE: u8 = 0x26;
    pub const GREEN_GRADUAL_CHANGE: u8 = 0x27;
    pub const BLUE_GRADUAL_CHANGE: u8 = 0x28;
    pub const YELLOW_GRADUAL_CHANGE: u8 = 0x29;
    pub const CYAN_GRADUAL_CHANGE: u8 = 0x2a;
    pub const PURPLE_GRADUAL_CHANGE: u8 = 0x2b;
    pub const WHITE_GRADUAL_CHANGE: u8 = 0x2c;
    pub const RED_GREEN_CROSS_FADE: u8 = 0x2d;
    pub const RED_BLUE_CROSS_FADE: u8 = 0x2e;
    pub const GREEN_BLUE_CROSS_FADE: u8 = 0x2f;
    pub const SEVEN_COLOR_STROBE_FLASH: u8 = 0x30;
    pub const RED_STROBE_FLASH: u8 = 0x31;
    pub const GREEN_STROBE_FLASH: u8 = 0x32;
    pub const BLUE_STROBE_FLASH: u8 = 0x33;
    pub const YELLOW_STROBE_FLASH: u8 = 0x34;
    pub const CYAN_STROBE_FLASH: u8 = 0x35;
    pub const PURPLE_STROBE_FLASH: u8 = 0x36;
    pub const WHITE_STROBE_FLASH: u8 = 0x37;
    pub const SEVEN_COLOR_JUMPING: u8 = 0x38;

    /// Code-to-name table; codes are contiguous in 0x25..=0x38.
    const NAMES: [(u8, &'static str); 20] = [
        (0x25, "seven color cross fade"),
        (0x26, "red gradual change"),
        (0x27, "green gradual change"),
        (0x28, "blue gradual change"),
        (0x29, "yellow gradual change"),
        (0x2a, "cyan gradual change"),
        (0x2b, "purple gradual change"),
        (0x2c, "white gradual change"),
        (0x2d, "red green cross fade"),
        (0x2e, "red blue cross fade"),
        (0x2f, "green blue cross fade"),
        (0x30, "seven color strobe flash"),
        (0x31, "red strobe flash"),
        (0x32, "green strobe flash"),
        (0x33, "blue strobe flash"),
        (0x34, "yellow strobe flash"),
        (0x35, "cyan strobe flash"),
        (0x36, "purple strobe flash"),
        (0x37, "white strobe flash"),
        (0x38, "seven color jumping"),
    ];

    /// Returns whether `code` is a known preset pattern.
    pub fn is_valid(code: u8) -> bool {
        (Self::SEVEN_COLOR_CROSS_FADE..=Self::SEVEN_COLOR_JUMPING).contains(&code)
    }

    /// Returns the human-readable name for a preset code.
    pub fn name(code: u8) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| *name)
    }

    /// Iterates every known preset as (code, name).
    pub fn all() -> impl Iterator<Item = (u8, &'static str)> {
        Self::NAMES.iter().copied()
    }

    /// Looks a preset code up by its human-readable name.
    pub fn from_name(name: &str) -> Option<u8> {
        Self::NAMES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(c, _)| *c)
    }
}

/// Built-in sunrise/sunset timer effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltInEffect {
    Sunrise,
    Sunset,
}

impl BuiltInEffect {
    pub const SUNRISE: u8 = 0xa1;
    pub const SUNSET: u8 = 0xa2;

    /// Returns whether `code` names a built-in effect.
    pub fn is_valid(code: u8) -> bool {
        code == Self::SUNRISE || code == Self::SUNSET
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            Self::SUNRISE => Some(BuiltInEffect::Sunrise),
            Self::SUNSET => Some(BuiltInEffect::Sunset),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            BuiltInEffect::Sunrise => Self::SUNRISE,
            BuiltInEffect::Sunset => Self::SUNSET,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BuiltInEffect::Sunrise => "sunrise",
            BuiltInEffect::Sunset => "sunset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_range() {
        assert!(!PresetPattern::is_valid(0x24));
        assert!(PresetPattern::is_valid(0x25));
        assert!(PresetPattern::is_valid(0x38));
        assert!(!PresetPattern::is_valid(0x39));
        // Solid color and custom codes are not presets
        assert!(!PresetPattern::is_valid(0x61));
        assert!(!PresetPattern::is_valid(0x60));
    }

    #[test]
    fn test_preset_names_cover_range() {
        for code in 0x25..=0x38 {
            assert!(PresetPattern::name(code).is_some(), "{code:#04x} unnamed");
        }
        assert!(PresetPattern::name(0x61).is_none());
    }

    #[test]
    fn test_preset_name_lookup() {
        assert_eq!(
            PresetPattern::name(PresetPattern::SEVEN_COLOR_CROSS_FADE),
            Some("seven color cross fade")
        );
        assert_eq!(
            PresetPattern::from_name("Seven Color Jumping"),
            Some(0x38)
        );
        assert_eq!(PresetPattern::from_name("disco"), None);
    }

    #[test]
    fn test_built_in_effects() {
        assert!(BuiltInEffect::is_valid(0xa1));
        assert!(BuiltInEffect::is_valid(0xa2));
        assert!(!BuiltInEffect::is_valid(0xa0));

        assert_eq!(BuiltInEffect::from_code(0xa1), Some(BuiltInEffect::Sunrise));
        assert_eq!(BuiltInEffect::Sunset.code(), 0xa2);
        assert_eq!(BuiltInEffect::Sunrise.name(), "sunrise");
    }
}
