//! Image generation options
//!
//! The three generation parameters offered by the image tab, with the option
//! sets the backend accepts. Stored values that fail to parse fall back to
//! the defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1024x1024")]
    Square,
    #[serde(rename = "1792x1024")]
    Landscape,
    #[serde(rename = "1024x1792")]
    Portrait,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Landscape => "1792x1024",
            ImageSize::Portrait => "1024x1792",
        }
    }

    pub const ALL: [ImageSize; 3] = [ImageSize::Square, ImageSize::Landscape, ImageSize::Portrait];
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1024x1024" => Ok(ImageSize::Square),
            "1792x1024" => Ok(ImageSize::Landscape),
            "1024x1792" => Ok(ImageSize::Portrait),
            _ => Err(format!("Unknown image size: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    #[default]
    Standard,
    Hd,
}

impl ImageQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageQuality::Standard => "standard",
            ImageQuality::Hd => "hd",
        }
    }

    pub const ALL: [ImageQuality; 2] = [ImageQuality::Standard, ImageQuality::Hd];
}

impl std::fmt::Display for ImageQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ImageQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(ImageQuality::Standard),
            "hd" => Ok(ImageQuality::Hd),
            _ => Err(format!("Unknown image quality: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStyle {
    #[default]
    Vivid,
    Natural,
}

impl ImageStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStyle::Vivid => "vivid",
            ImageStyle::Natural => "natural",
        }
    }

    pub const ALL: [ImageStyle; 2] = [ImageStyle::Vivid, ImageStyle::Natural];
}

impl std::fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ImageStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vivid" => Ok(ImageStyle::Vivid),
            "natural" => Ok(ImageStyle::Natural),
            _ => Err(format!("Unknown image style: {}", s)),
        }
    }
}

/// Generation parameters sent with every image request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageOptions {
    pub size: ImageSize,
    pub quality: ImageQuality,
    pub style: ImageStyle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ImageOptions::default();
        assert_eq!(options.size, ImageSize::Square);
        assert_eq!(options.quality, ImageQuality::Standard);
        assert_eq!(options.style, ImageStyle::Vivid);
    }

    #[test]
    fn test_wire_values_round_trip() {
        for size in ImageSize::ALL {
            assert_eq!(size.as_str().parse::<ImageSize>().unwrap(), size);
        }
        for quality in ImageQuality::ALL {
            assert_eq!(quality.as_str().parse::<ImageQuality>().unwrap(), quality);
        }
        for style in ImageStyle::ALL {
            assert_eq!(style.as_str().parse::<ImageStyle>().unwrap(), style);
        }
    }

    #[test]
    fn test_unknown_values_rejected() {
        assert!("2048x2048".parse::<ImageSize>().is_err());
        assert!("ultra".parse::<ImageQuality>().is_err());
        assert!("painterly".parse::<ImageStyle>().is_err());
    }
}
