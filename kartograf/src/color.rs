use serde::{Deserialize, Serialize};

/// RGBA color with straight (not premultiplied) alpha.
///
/// Serialized as a `#RRGGBBAA` string. `#RRGGBB` is also accepted when parsing.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from_hex(&value).ok_or_else(|| format!("invalid color {value}"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl Color {
    /// `#00000000`
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    /// `#FF0000FF`
    pub const RED: Color = Color::rgba(255, 0, 0, 255);
    /// `#00FF00FF`
    pub const GREEN: Color = Color::rgba(0, 255, 0, 255);
    /// `#0000FFFF`
    pub const BLUE: Color = Color::rgba(0, 0, 255, 255);
    /// `#FFFFFFFF`
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    /// `#000000FF`
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    /// Color of the given channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Red channel.
    pub fn r(&self) -> u8 {
        self.r
    }

    /// Green channel.
    pub fn g(&self) -> u8 {
        self.g
    }

    /// Blue channel.
    pub fn b(&self) -> u8 {
        self.b
    }

    /// Alpha channel.
    pub fn a(&self) -> u8 {
        self.a
    }

    /// Channels in RGBA order.
    pub fn channels(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// `#RRGGBBAA` representation of the color.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA`. Returns `None` for anything else.
    pub fn try_from_hex(hex_string: &str) -> Option<Self> {
        if hex_string.len() != 7 && hex_string.len() != 9 || !hex_string.starts_with('#') {
            return None;
        }

        let r = u8::from_str_radix(hex_string.get(1..3)?, 16).ok()?;
        let g = u8::from_str_radix(hex_string.get(3..5)?, 16).ok()?;
        let b = u8::from_str_radix(hex_string.get(5..7)?, 16).ok()?;
        let a = if hex_string.len() == 9 {
            u8::from_str_radix(hex_string.get(7..9)?, 16).ok()?
        } else {
            255
        };

        Some(Self { r, g, b, a })
    }

    /// The same color with another alpha.
    pub fn with_alpha(&self, a: u8) -> Self {
        Self { a, ..*self }
    }

    /// Whether the alpha is zero.
    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Black or white, whichever is more legible over this color.
    pub fn contrasting(&self) -> Self {
        let luminance = 0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32;
        if luminance > 140.0 {
            Self::BLACK
        } else {
            Self::WHITE
        }
    }

    pub(crate) fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }

    /// Anti-aliased solid paint of the color.
    pub(crate) fn to_paint(self) -> tiny_skia::Paint<'static> {
        let mut paint = tiny_skia::Paint::default();
        paint.set_color(self.to_skia());
        paint.anti_alias = true;
        paint
    }
}
