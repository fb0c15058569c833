//! Color handling for node and edge styling.
//!
//! This module provides the [`Color`] type which wraps the `DynamicColor`
//! type from the color crate. Layout directives carry colors as strings;
//! [`Color::new`] validates them so the layout generator can warn about
//! values a renderer would not understand.

use std::{fmt, str::FromStr};

use color::DynamicColor;

/// A validated CSS color, keeping the text it was written as.
#[derive(Clone, PartialEq, Debug)]
pub struct Color {
    color: DynamicColor,
    source: String,
}

impl Color {
    /// Parse CSS color text such as "#ff0000", "rgb(255, 0, 0)" or "red".
    ///
    /// # Examples
    ///
    /// ```
    /// use spytial_core::color::Color;
    ///
    /// let red = Color::new("#ff0000").unwrap();
    /// assert_eq!(red.as_str(), "#ff0000");
    /// assert!(Color::new("not a color").is_err());
    /// ```
    pub fn new(color_str: &str) -> Result<Self, String> {
        match DynamicColor::from_str(color_str.trim()) {
            Ok(color) => Ok(Self {
                color,
                source: color_str.to_string(),
            }),
            Err(err) => Err(format!("invalid color `{color_str}`: {err}")),
        }
    }

    /// The text the color was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.color)
    }
}
