//! Page images and their classification labels.

use serde::{Deserialize, Serialize};

/// Confidence assigned when classification fails outright.
pub const FALLBACK_IMAGE_CONFIDENCE: f64 = 0.1;

/// Closed set of page image labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Floorplan,
    Exterior,
    Interior,
    Bath,
    Kitchen,
    View,
    Map,
    Logo,
    #[default]
    Other,
}

impl ImageType {
    /// Every label, in prompt order.
    pub const ALL: [ImageType; 9] = [
        Self::Floorplan,
        Self::Exterior,
        Self::Interior,
        Self::Bath,
        Self::Kitchen,
        Self::View,
        Self::Map,
        Self::Logo,
        Self::Other,
    ];

    /// Label as sent to and received from the vision service.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Floorplan => "floorplan",
            Self::Exterior => "exterior",
            Self::Interior => "interior",
            Self::Bath => "bath",
            Self::Kitchen => "kitchen",
            Self::View => "view",
            Self::Map => "map",
            Self::Logo => "logo",
            Self::Other => "other",
        }
    }

    /// Parse a label. Exact match only; anything else is out of set.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == label)
    }
}

/// Region of the page an image occupies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A rendered page image with its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedImage {
    /// `{session}_{file}_page_{n}`
    pub id: String,

    /// Where the rendered page was stored
    pub url: String,

    /// Zero-based page index
    pub page_index: usize,

    /// Classification label
    #[serde(rename = "type")]
    pub image_type: ImageType,

    /// Classification confidence in `[0, 1]`
    pub confidence: f64,

    /// Element bounds, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<ImageBounds>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parsing_is_exact() {
        assert_eq!(ImageType::from_label("floorplan"), Some(ImageType::Floorplan));
        assert_eq!(ImageType::from_label("Floorplan"), None);
        assert_eq!(ImageType::from_label("balcony"), None);
    }

    #[test]
    fn test_image_serializes_type_key() {
        let image = ExtractedImage {
            id: "s_a.pdf_page_1".into(),
            url: "https://example.com/x.png".into(),
            page_index: 0,
            image_type: ImageType::Kitchen,
            confidence: 0.8,
            bounds: None,
        };
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["type"], "kitchen");
        assert_eq!(json["pageIndex"], 0);
        assert!(json.get("bounds").is_none());
    }
}
