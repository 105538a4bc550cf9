use std::str::FromStr;

use ratatui::style::{Color, Style};
use serde::{Deserialize, Serialize};

/// Catppuccin palette variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeVariant {
    /// Dark theme (default)
    Mocha,
    /// Light theme
    Latte,
}

impl Default for ThemeVariant {
    fn default() -> Self {
        Self::Mocha
    }
}

impl FromStr for ThemeVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mocha" | "dark" => Ok(Self::Mocha),
            "latte" | "light" => Ok(Self::Latte),
            other => Err(anyhow::anyhow!("unknown theme variant '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub rosewater: Color,
    pub flamingo: Color,
    pub pink: Color,
    pub mauve: Color,
    pub red: Color,
    pub maroon: Color,
    pub peach: Color,
    pub yellow: Color,
    pub green: Color,
    pub teal: Color,
    pub sky: Color,
    pub sapphire: Color,
    pub blue: Color,
    pub lavender: Color,
    pub text: Color,
    pub subtext1: Color,
    pub subtext0: Color,
    pub overlay2: Color,
    pub overlay1: Color,
    pub overlay0: Color,
    pub surface2: Color,
    pub surface1: Color,
    pub surface0: Color,
    pub base: Color,
    pub mantle: Color,
    pub crust: Color,
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb(
        ((hex >> 16) & 0xff) as u8,
        ((hex >> 8) & 0xff) as u8,
        (hex & 0xff) as u8,
    )
}

impl Theme {
    pub fn new(variant: ThemeVariant) -> Self {
        match variant {
            ThemeVariant::Mocha => Self::mocha(),
            ThemeVariant::Latte => Self::latte(),
        }
    }

    fn mocha() -> Self {
        Self {
            rosewater: rgb(0xf5e0dc),
            flamingo: rgb(0xf2cdcd),
            pink: rgb(0xf5c2e7),
            mauve: rgb(0xcba6f7),
            red: rgb(0xf38ba8),
            maroon: rgb(0xeba0ac),
            peach: rgb(0xfab387),
            yellow: rgb(0xf9e2af),
            green: rgb(0xa6e3a1),
            teal: rgb(0x94e2d5),
            sky: rgb(0x89dceb),
            sapphire: rgb(0x74c7ec),
            blue: rgb(0x89b4fa),
            lavender: rgb(0xb4befe),
            text: rgb(0xcdd6f4),
            subtext1: rgb(0xbac2de),
            subtext0: rgb(0xa6adc8),
            overlay2: rgb(0x9399b2),
            overlay1: rgb(0x7f849c),
            overlay0: rgb(0x6c7086),
            surface2: rgb(0x585b70),
            surface1: rgb(0x45475a),
            surface0: rgb(0x313244),
            base: rgb(0x1e1e2e),
            mantle: rgb(0x181825),
            crust: rgb(0x11111b),
        }
    }

    fn latte() -> Self {
        Self {
            rosewater: rgb(0xdc8a78),
            flamingo: rgb(0xdd7878),
            pink: rgb(0xea76cb),
            mauve: rgb(0x8839ef),
            red: rgb(0xd20f39),
            maroon: rgb(0xe64553),
            peach: rgb(0xfe640b),
            yellow: rgb(0xdf8e1d),
            green: rgb(0x40a02b),
            teal: rgb(0x179299),
            sky: rgb(0x04a5e5),
            sapphire: rgb(0x209fb5),
            blue: rgb(0x1e66f5),
            lavender: rgb(0x7287fd),
            text: rgb(0x4c4f69),
            subtext1: rgb(0x5c5f77),
            subtext0: rgb(0x6c6f85),
            overlay2: rgb(0x7c7f93),
            overlay1: rgb(0x8c8fa1),
            overlay0: rgb(0x9ca0b0),
            surface2: rgb(0xacb0be),
            surface1: rgb(0xbcc0cc),
            surface0: rgb(0xccd0da),
            base: rgb(0xeff1f5),
            mantle: rgb(0xe6e9ef),
            crust: rgb(0xdce0e8),
        }
    }

    /// Muted style for secondary text
    pub fn dimmed(&self) -> Style {
        Style::default().fg(self.overlay1)
    }

    /// Style for error text
    pub fn error(&self) -> Style {
        Style::default().fg(self.red)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(ThemeVariant::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_parses_aliases() {
        assert_eq!(ThemeVariant::from_str("latte").unwrap(), ThemeVariant::Latte);
        assert_eq!(ThemeVariant::from_str("DARK").unwrap(), ThemeVariant::Mocha);
        assert!(ThemeVariant::from_str("solarized").is_err());
    }

    #[test]
    fn rgb_unpacks_channels() {
        assert_eq!(rgb(0x1e1e2e), Color::Rgb(0x1e, 0x1e, 0x2e));
    }
}
