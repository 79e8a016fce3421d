use crate::sample::ColorSample;
use image::Rgba;
use std::fmt;

/// The three most prominent colors of an image.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorPalette {
    pub primary: Option<Rgba<u8>>,
    pub secondary: Option<Rgba<u8>>,
    pub tertiary: Option<Rgba<u8>>,
}

impl ColorPalette {
    pub fn new(
        primary: Option<Rgba<u8>>,
        secondary: Option<Rgba<u8>>,
        tertiary: Option<Rgba<u8>>,
    ) -> Self {
        Self {
            primary,
            secondary,
            tertiary,
        }
    }

    /// Maps ranked clusters onto the palette roles. Clusters without members
    /// never fill a role.
    pub fn from_clusters(clusters: &[ColorSample]) -> Self {
        let mut roles = clusters
            .iter()
            .filter(|c| c.count > 0)
            .map(Rgba::<u8>::from);
        Self {
            primary: roles.next(),
            secondary: roles.next(),
            tertiary: roles.next(),
        }
    }

    #[inline]
    pub fn roles(&self) -> [(&'static str, Option<Rgba<u8>>); 3] {
        [
            ("primary", self.primary),
            ("secondary", self.secondary),
            ("tertiary", self.tertiary),
        ]
    }

    pub fn to_hex(&self) -> [Option<String>; 3] {
        self.roles().map(|(_, color)| color.map(hex))
    }
}

fn hex(color: Rgba<u8>) -> String {
    let [r, g, b, a] = color.0;
    format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
}

impl fmt::Display for ColorPalette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, color)) in self.roles().into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match color {
                Some(color) => write!(f, "{name}: {}", hex(color))?,
                None => write!(f, "{name}: none")?,
            }
        }
        Ok(())
    }
}
