use prometheus::{PROTOBUF_FORMAT, TEXT_FORMAT};

const PROTO_TYPE: &str = "application/vnd.google.protobuf";
const PROTO_PROTOCOL: &str = "io.prometheus.client.MetricFamily";
const TEXT_VERSION: &str = "0.0.4";

/// Supported scrape encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpositionFormat {
    /// Text format, version 0.0.4.
    #[default]
    Text,
    /// Length-delimited `io.prometheus.client.MetricFamily` protobuf messages.
    Protobuf,
}

impl ExpositionFormat {
    /// Pick an encoding from an `Accept` header.
    ///
    /// Media ranges are tried by decreasing quality; the first one naming a supported
    /// encoding wins. Anything else, including a missing header, falls back to text.
    pub fn negotiate(accept: Option<&str>) -> Self {
        let Some(accept) = accept else {
            return Self::Text;
        };

        let mut ranges: Vec<MediaRange<'_>> = accept.split(',').filter_map(MediaRange::parse).collect();
        // stable: equal quality keeps header order
        ranges.sort_by(|a, b| b.quality.total_cmp(&a.quality));

        ranges
            .iter()
            .filter(|range| range.quality > 0.0)
            .find_map(MediaRange::format)
            .unwrap_or_default()
    }

    /// `Content-Type` of a response in this encoding.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Text => TEXT_FORMAT,
            Self::Protobuf => PROTOBUF_FORMAT,
        }
    }
}

struct MediaRange<'a> {
    essence: String,
    params: Vec<(String, &'a str)>,
    quality: f32,
}

impl<'a> MediaRange<'a> {
    fn parse(raw: &'a str) -> Option<Self> {
        let mut parts = raw.split(';');
        let essence = parts.next()?.trim().to_ascii_lowercase();
        if essence.is_empty() {
            return None;
        }

        let mut quality = 1.0;
        let mut params = Vec::new();
        for param in parts {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim().trim_matches('"');
            if key == "q" {
                quality = value.parse().unwrap_or(0.0);
            } else {
                params.push((key, value));
            }
        }

        Some(Self {
            essence,
            params,
            quality,
        })
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    fn format(&self) -> Option<ExpositionFormat> {
        match self.essence.as_str() {
            PROTO_TYPE if self.param("proto") == Some(PROTO_PROTOCOL) => {
                match self.param("encoding") {
                    Some("delimited") => Some(ExpositionFormat::Protobuf),
                    _ => None,
                }
            }
            "text/plain" => match self.param("version") {
                None | Some("") | Some(TEXT_VERSION) => Some(ExpositionFormat::Text),
                _ => None,
            },
            _ => None,
        }
    }
}
