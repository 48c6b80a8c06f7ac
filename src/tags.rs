//! Per-service styling of portfolio tag pills

use serde::Serialize;

/// Inline style overrides for one tag item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagStyle {
    pub border_radius: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<&'static str>,
}

/// Style for a `.service-label` text; `None` leaves the tag untouched
pub fn style_for_label(label: &str) -> Option<TagStyle> {
    let style = match label.trim().to_uppercase().as_str() {
        "CREATIVE" => TagStyle {
            border_radius: "0.2em",
            padding: None,
        },
        "MARKETING" => TagStyle {
            border_radius: "2em",
            padding: Some("0 0.2em"),
        },
        "STRATEGY" => TagStyle {
            border_radius: "0",
            padding: None,
        },
        "WEBSITE" => TagStyle {
            border_radius: "0.4em",
            padding: None,
        },
        _ => return None,
    };
    Some(style)
}
