use serde::{Deserialize, Serialize};

/// Opening and closing tags a backend wraps its reasoning trace in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningMarkers {
    pub open: String,
    pub close: String,
}

impl Default for ReasoningMarkers {
    fn default() -> Self {
        Self { open: "<think>".to_string(), close: "</think>".to_string() }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResponseSanitizer {
    markers: ReasoningMarkers,
}

impl ResponseSanitizer {
    pub fn new(markers: ReasoningMarkers) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &ReasoningMarkers {
        &self.markers
    }

    /// Removes every `open ... close` block, pairing each opening marker with
    /// the nearest closing marker after it. An opening marker that is never
    /// closed leaves the rest of the text untouched.
    pub fn sanitize(&self, raw: Option<&str>) -> String {
        let Some(raw) = raw else {
            return String::new();
        };
        let (open, close) = (self.markers.open.as_str(), self.markers.close.as_str());
        if open.is_empty() || close.is_empty() {
            return raw.to_string();
        }

        let mut output = String::with_capacity(raw.len());
        let mut remaining = raw;
        while let Some(start) = remaining.find(open) {
            let body_start = start + open.len();
            let Some(relative_end) = remaining[body_start..].find(close) else {
                break;
            };
            output.push_str(&remaining[..start]);
            remaining = &remaining[body_start + relative_end + close.len()..];
        }
        output.push_str(remaining);
        output
    }
}
