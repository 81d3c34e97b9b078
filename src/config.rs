use std::fs;

use crate::bitmap::Color;

/// Application configuration loaded from ~/.xbackdroprc
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Overlay blended over the background. `None` shows it untinted.
    pub tint: Option<Color>,
    /// Overlay drawn while the pointer is over the window.
    pub highlight: Option<Color>,
    /// Used wherever no wallpaper is available
    pub fallback_color: Color,
    pub width: u16,
    pub height: u16,
    pub title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tint: Some(Color(0x60_00_00_00)),
            highlight: Some(Color(0x30_ff_ff_ff)),
            fallback_color: Color::WHITE,
            width: 480,
            height: 320,
            title: "xbackdrop".to_string(),
        }
    }
}

/// `none` disables an optional color.
fn parse_optional_color(value: &str) -> Option<Option<Color>> {
    if value.eq_ignore_ascii_case("none") {
        Some(None)
    } else {
        Color::parse(value).map(Some)
    }
}

impl Config {
    /// Load configuration from ~/.xbackdroprc
    /// Falls back to defaults if file doesn't exist or has parse errors.
    pub fn load() -> Self {
        let path = match dirs::home_dir() {
            Some(home) => home.join(".xbackdroprc"),
            None => return Self::default(),
        };

        match fs::read_to_string(&path) {
            Ok(contents) => Self::parse(&contents),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(contents: &str) -> Self {
        let mut config = Self::default();

        for line in contents.lines() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Parse "Key Value" format
            let (key, value) = match line.split_once(char::is_whitespace) {
                Some((k, v)) => (k, v.trim()),
                None => continue,
            };

            match key {
                "Tint" => {
                    if let Some(tint) = parse_optional_color(value) {
                        config.tint = tint;
                        log::debug!("Config: Tint = {:?}", tint);
                    }
                }
                "Highlight" => {
                    if let Some(highlight) = parse_optional_color(value) {
                        config.highlight = highlight;
                        log::debug!("Config: Highlight = {:?}", highlight);
                    }
                }
                "FallbackColor" => {
                    if let Some(color) = Color::parse(value) {
                        config.fallback_color = color;
                        log::debug!("Config: FallbackColor = {:?}", color);
                    }
                }
                "Width" => {
                    if let Ok(width) = value.parse::<u16>() {
                        if width > 0 {
                            config.width = width;
                            log::debug!("Config: Width = {}", width);
                        }
                    }
                }
                "Height" => {
                    if let Ok(height) = value.parse::<u16>() {
                        if height > 0 {
                            config.height = height;
                            log::debug!("Config: Height = {}", height);
                        }
                    }
                }
                "Title" => {
                    config.title = value.to_string();
                    log::debug!("Config: Title = {}", value);
                }
                _ => {
                    log::debug!("Config: unknown key '{}'", key);
                }
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = Config::parse(
            "# comment\n\
             Tint #80102030\n\
             Highlight none\n\
             FallbackColor #336699\n\
             Width 640\n\
             Height 0\n\
             Title My backdrop\n\
             Bogus 1\n",
        );
        assert_eq!(config.tint, Some(Color(0x80102030)));
        assert_eq!(config.highlight, None);
        assert_eq!(config.fallback_color, Color(0xff336699));
        assert_eq!(config.width, 640);
        // Zero is rejected
        assert_eq!(config.height, 320);
        assert_eq!(config.title, "My backdrop");
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let config = Config::parse("Tint red\nWidth wide\nTint\n");
        assert_eq!(config, Config::default());
    }
}
