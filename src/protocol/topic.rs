use serde::Deserialize;
use serde_json::{Value, json};

use super::color::Rgb;
use super::envelope::Envelope;

/// Default namespace prepended to every display topic
pub const DEFAULT_NAMESPACE: &str = "paas_";

/// Topics understood by a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayTopic {
    /// Single key update
    Pixel,
    /// Whole buffer overwrite
    AllPixels,
    /// Batch of single key updates
    MultiPixel,
    /// Explicit flush request
    ShowPixels,
}

impl DisplayTopic {
    pub const ALL: [DisplayTopic; 4] = [
        DisplayTopic::Pixel,
        DisplayTopic::AllPixels,
        DisplayTopic::MultiPixel,
        DisplayTopic::ShowPixels,
    ];

    /// Suffix appended to the namespace on the wire
    pub fn suffix(self) -> &'static str {
        match self {
            DisplayTopic::Pixel => "pixel",
            DisplayTopic::AllPixels => "allpixels",
            DisplayTopic::MultiPixel => "multipixel",
            DisplayTopic::ShowPixels => "showpixels",
        }
    }
}

/// Maps wire topics to display topics for one namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSet {
    namespace: String,
}

impl TopicSet {
    pub fn new(namespace: impl Into<String>) -> Self {
        TopicSet {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Full wire topic for a display topic
    pub fn topic(&self, topic: DisplayTopic) -> String {
        format!("{}{}", self.namespace, topic.suffix())
    }

    /// Exact-match classification of a wire topic
    pub fn classify(&self, topic: &str) -> Option<DisplayTopic> {
        let suffix = topic.strip_prefix(self.namespace.as_str())?;
        DisplayTopic::ALL
            .into_iter()
            .find(|candidate| candidate.suffix() == suffix)
    }

    fn envelope(&self, topic: DisplayTopic, payload: Value) -> Envelope {
        Envelope {
            topic: self.topic(topic),
            payload,
        }
    }

    /// Builds a single key update
    pub fn pixel(&self, key: &str, rgb: Rgb, show: bool) -> Envelope {
        self.envelope(DisplayTopic::Pixel, json!({"key": key, "rgb": rgb, "show": show}))
    }

    /// Builds a whole buffer overwrite
    pub fn all_pixels(&self, rgb: Rgb, show: bool) -> Envelope {
        self.envelope(DisplayTopic::AllPixels, json!({"rgb": rgb, "show": show}))
    }

    /// Builds a batch update from `(key, color)` pairs
    pub fn multi_pixel<'a>(
        &self,
        pixels: impl IntoIterator<Item = (&'a str, Rgb)>,
        show: bool,
    ) -> Envelope {
        let pixels: Vec<Value> = pixels
            .into_iter()
            .map(|(key, rgb)| json!({"key": key, "rgb": rgb}))
            .collect();
        self.envelope(DisplayTopic::MultiPixel, json!({"pixels": pixels, "show": show}))
    }

    /// Builds an explicit flush request
    pub fn show_pixels(&self) -> Envelope {
        self.envelope(DisplayTopic::ShowPixels, Value::String(String::new()))
    }
}

impl Default for TopicSet {
    fn default() -> Self {
        TopicSet::new(DEFAULT_NAMESPACE)
    }
}

fn default_show() -> bool {
    true
}

/// Payload of a single key update
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PixelUpdate {
    pub key: String,
    pub rgb: Rgb,
    #[serde(default = "default_show")]
    pub show: bool,
}

/// Payload of a whole buffer overwrite
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AllPixelsUpdate {
    pub rgb: Rgb,
    #[serde(default = "default_show")]
    pub show: bool,
}

/// One entry of a batch update
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PixelEntry {
    pub key: String,
    pub rgb: Rgb,
}

/// Payload of a batch update
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MultiPixelUpdate {
    pub pixels: Vec<PixelEntry>,
    #[serde(default = "default_show")]
    pub show: bool,
}

/// Keyed color extracted by the mirror from any stored topic.
///
/// Producers are not consistent about the spelling of the color field, so
/// `color` and `colour` are accepted next to `rgb`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeyedColor {
    pub key: String,
    #[serde(alias = "color", alias = "colour")]
    pub rgb: Rgb,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_default_namespace() {
        let topics = TopicSet::default();
        assert_eq!(topics.classify("paas_pixel"), Some(DisplayTopic::Pixel));
        assert_eq!(topics.classify("paas_allpixels"), Some(DisplayTopic::AllPixels));
        assert_eq!(topics.classify("paas_multipixel"), Some(DisplayTopic::MultiPixel));
        assert_eq!(topics.classify("paas_showpixels"), Some(DisplayTopic::ShowPixels));
    }

    #[test]
    fn test_classify_is_exact() {
        let topics = TopicSet::default();
        assert_eq!(topics.classify("pixel"), None);
        assert_eq!(topics.classify("paas_pixels"), None);
        assert_eq!(topics.classify("paas_pixel_store"), None);
        assert_eq!(topics.classify("other_pixel"), None);
    }

    #[test]
    fn test_custom_namespace() {
        let topics = TopicSet::new("hat/");
        assert_eq!(topics.topic(DisplayTopic::AllPixels), "hat/allpixels");
        assert_eq!(topics.classify("hat/pixel"), Some(DisplayTopic::Pixel));
        assert_eq!(topics.classify("paas_pixel"), None);
    }

    #[test]
    fn test_show_defaults_to_true() {
        let update: PixelUpdate =
            serde_json::from_value(json!({"key": "item_1", "rgb": [1, 2, 3]})).unwrap();
        assert!(update.show);
        let update: AllPixelsUpdate =
            serde_json::from_value(json!({"rgb": [1, 2, 3], "show": false})).unwrap();
        assert!(!update.show);
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        assert!(serde_json::from_value::<PixelUpdate>(json!({"key": "item_1"})).is_err());
        assert!(serde_json::from_value::<PixelUpdate>(json!({"rgb": [1, 2, 3]})).is_err());
        assert!(serde_json::from_value::<MultiPixelUpdate>(json!({"show": true})).is_err());
    }

    #[test]
    fn test_builders_match_payload_types() {
        let topics = TopicSet::default();

        let envelope = topics.pixel("item_1", Rgb::RED, false);
        assert_eq!(envelope.topic, "paas_pixel");
        let update = PixelUpdate::deserialize(&envelope.payload).unwrap();
        assert_eq!(update.key, "item_1");
        assert!(!update.show);

        let envelope = topics.multi_pixel([("a", Rgb::GREEN), ("b", Rgb::BLUE)], true);
        assert_eq!(topics.classify(&envelope.topic), Some(DisplayTopic::MultiPixel));
        let update = MultiPixelUpdate::deserialize(&envelope.payload).unwrap();
        assert_eq!(update.pixels[1].rgb, Rgb::BLUE);

        let envelope = topics.show_pixels();
        assert_eq!(envelope.encode(), r#"paas_showpixels """#);
        assert_eq!(
            topics.all_pixels(Rgb::WHITE, true).payload,
            json!({"rgb": [255, 255, 255], "show": true})
        );
    }

    #[test]
    fn test_keyed_color_aliases() {
        for field in ["rgb", "color", "colour"] {
            let keyed: KeyedColor =
                serde_json::from_value(json!({"key": "k", field: [4, 5, 6], "extra": 1})).unwrap();
            assert_eq!(keyed.rgb, Rgb::new(4, 5, 6));
        }
    }
}
