//! AI lighting suggestions.
//!
//! The image-analysis service answers with loosely typed JSON. [`adapt`] is
//! the single place where that payload becomes a [`ConfigurationModel`]:
//! every missing or malformed field falls back to a default, so adaptation
//! itself cannot fail. Failures of the service (error field, bad status,
//! unreadable body) are reported separately as [`SuggestionError`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use shared::{Color, ConfigurationModel, Pattern};
use thiserror::Error;
use tracing::{debug, info};

pub const FALLBACK_BRIGHTNESS: i64 = 50;
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/analyze-image/";
pub const DEFAULT_MODEL: &str = "llava-phi3";

#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("{0}")]
    Service(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("could not read image: {0}")]
    Image(#[from] std::io::Error),
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Adapter
// ═══════════════════════════════════════════════════════════════════════════════

/// The suggestion fields as the service sent them, types unchecked.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawSuggestion {
    #[serde(default)]
    pub brightness: Option<Value>,
    #[serde(default)]
    pub color: Option<Value>,
    #[serde(default)]
    pub pattern: Option<Value>,
}

/// Converts a raw suggestion into a usable configuration.
///
/// - `brightness`: integer, or a string starting with one; anything else, or
///   a value outside `0..=100`, becomes 50.
/// - `color`: a non-empty hex string, else `#ffffff`.
/// - `pattern`: `steady`, `pulse` or `strobe`, else `steady`.
///
/// Saturation and screen brightness keep their defaults.
pub fn adapt(raw: &RawSuggestion) -> ConfigurationModel {
    let defaults = ConfigurationModel::default();

    let brightness = raw
        .brightness
        .as_ref()
        .and_then(leading_integer)
        .filter(|v| (0..=100).contains(v))
        .unwrap_or(FALLBACK_BRIGHTNESS);

    let color = raw
        .color
        .as_ref()
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| Color::parse_hex(s).ok())
        .unwrap_or(Color::WHITE);

    let pattern = raw
        .pattern
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Pattern>().ok())
        .unwrap_or(Pattern::Steady);

    ConfigurationModel::new(
        brightness,
        color,
        pattern,
        defaults.saturation() as i64,
        defaults.screen_brightness() as i64,
    )
}

/// Integer parsing that tolerates trailing garbage: `"77"`, `"77%"` and
/// `77.9` all give 77.
fn leading_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim_start();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|v| sign * v)
        }
        _ => None,
    }
}

/// Splits a service response body into a suggestion or a reported error.
pub fn classify_body(body: &str) -> Result<RawSuggestion, SuggestionError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| SuggestionError::MalformedResponse(e.to_string()))?;

    // Some backends return `[body, status]` for their error path.
    let object = match value {
        Value::Array(mut items) if !items.is_empty() && items[0].is_object() => items.swap_remove(0),
        other => other,
    };

    let Value::Object(map) = object else {
        return Err(SuggestionError::MalformedResponse(
            "expected a JSON object".to_string(),
        ));
    };

    match map.get("error") {
        None | Some(Value::Null) => {}
        Some(Value::String(msg)) => return Err(SuggestionError::Service(msg.clone())),
        Some(other) => return Err(SuggestionError::Service(other.to_string())),
    }

    serde_json::from_value(Value::Object(map))
        .map_err(|e| SuggestionError::MalformedResponse(e.to_string()))
}

/// Name for a template auto-saved from a suggestion on `file_name`.
pub fn suggestion_template_name(file_name: &str) -> String {
    let stem = file_name.split('.').next().unwrap_or("").trim();
    if stem.is_empty() {
        "AI Suggestion".to_string()
    } else {
        format!("AI Suggestion ({stem})")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Service
// ═══════════════════════════════════════════════════════════════════════════════

/// An image to analyse.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, SuggestionError> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, bytes))
    }

    pub fn mime_type(&self) -> &'static str {
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "heic" => "image/heic",
            "bmp" => "image/bmp",
            _ => "image/jpeg",
        }
    }
}

/// Request parameters sent alongside the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionParams {
    pub model: String,
    pub api_key: Option<String>,
    /// Free-text lighting preference, e.g. "warm and soft".
    pub preference: Option<String>,
}

impl Default for SuggestionParams {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            preference: None,
        }
    }
}

#[async_trait]
pub trait SuggestionService: Send + Sync {
    async fn analyze(
        &self,
        image: &ImageUpload,
        params: &SuggestionParams,
    ) -> Result<RawSuggestion, SuggestionError>;
}

/// Posts the image as multipart form data to the analysis endpoint.
#[derive(Debug, Clone)]
pub struct HttpSuggestionService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSuggestionService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SuggestionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SuggestionError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form(image: &ImageUpload, params: &SuggestionParams) -> Result<Form, SuggestionError> {
        let file = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(image.mime_type())
            .map_err(|e| SuggestionError::Transport(e.to_string()))?;

        let mut form = Form::new()
            .part("file", file)
            .text("model", params.model.clone());
        if let Some(key) = &params.api_key {
            form = form.text("api_key", key.clone());
        }
        if let Some(preference) = &params.preference {
            form = form.text("preference", preference.clone());
        }
        Ok(form)
    }
}

#[async_trait]
impl SuggestionService for HttpSuggestionService {
    async fn analyze(
        &self,
        image: &ImageUpload,
        params: &SuggestionParams,
    ) -> Result<RawSuggestion, SuggestionError> {
        info!(
            endpoint = %self.endpoint,
            file = %image.file_name,
            bytes = image.bytes.len(),
            model = %params.model,
            "requesting lighting suggestion"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(Self::form(image, params)?)
            .send()
            .await
            .map_err(|e| SuggestionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SuggestionError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SuggestionError::Transport(e.to_string()))?;
        debug!(body = %body, "suggestion response");
        classify_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawSuggestion {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_payload_falls_back_to_defaults() {
        let cfg = adapt(&RawSuggestion::default());
        assert_eq!(cfg.brightness(), 50);
        assert_eq!(cfg.color().to_hex(), "#ffffff");
        assert_eq!(cfg.pattern(), Pattern::Steady);
        assert_eq!(cfg, ConfigurationModel::default());
    }

    #[test]
    fn well_formed_strings_are_used() {
        let cfg = adapt(&raw(json!({"brightness": "77", "color": "#112233", "pattern": "strobe"})));
        assert_eq!(cfg.brightness(), 77);
        assert_eq!(cfg.color().to_hex(), "#112233");
        assert_eq!(cfg.pattern(), Pattern::Strobe);
    }

    #[test]
    fn brightness_parsing_rules() {
        let b = |v: Value| adapt(&raw(json!({ "brightness": v }))).brightness();
        assert_eq!(b(json!(80)), 80);
        assert_eq!(b(json!(64.9)), 64);
        assert_eq!(b(json!("45%")), 45);
        assert_eq!(b(json!(" 12 lux")), 12);
        assert_eq!(b(json!(0)), 0);
        assert_eq!(b(json!("bright")), 50);
        assert_eq!(b(json!(150)), 50);
        assert_eq!(b(json!(-5)), 50);
        assert_eq!(b(json!(null)), 50);
        assert_eq!(b(json!([70])), 50);
        assert_eq!(b(json!(true)), 50);
    }

    #[test]
    fn color_and_pattern_fallbacks() {
        let cfg = adapt(&raw(json!({"color": "", "pattern": "disco"})));
        assert_eq!(cfg.color(), Color::WHITE);
        assert_eq!(cfg.pattern(), Pattern::Steady);

        let cfg = adapt(&raw(json!({"color": "warm white", "pattern": 3})));
        assert_eq!(cfg.color(), Color::WHITE);
        assert_eq!(cfg.pattern(), Pattern::Steady);

        let cfg = adapt(&raw(json!({"color": "#FFCC00", "pattern": "Pulse"})));
        assert_eq!(cfg.color(), Color::new(0xff, 0xcc, 0x00));
        assert_eq!(cfg.pattern(), Pattern::Pulse);
    }

    #[test]
    fn classify_accepts_suggestions() {
        let s = classify_body(r##"{"brightness": 70, "color": "#ffffff", "pattern": "pulse"}"##).unwrap();
        assert_eq!(adapt(&s).pattern(), Pattern::Pulse);
        let s = classify_body("{}").unwrap();
        assert_eq!(s, RawSuggestion::default());
    }

    #[test]
    fn classify_reports_service_errors() {
        match classify_body(r#"{"error": "quota exceeded"}"#) {
            Err(SuggestionError::Service(msg)) => assert_eq!(msg, "quota exceeded"),
            other => panic!("unexpected {other:?}"),
        }
        match classify_body(r#"[{"error": "Failed to process image"}, 500]"#) {
            Err(SuggestionError::Service(msg)) => assert_eq!(msg, "Failed to process image"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(classify_body(r#"{"error": null, "brightness": 10}"#).is_ok());
    }

    #[test]
    fn classify_rejects_garbage() {
        assert!(matches!(classify_body("not json"), Err(SuggestionError::MalformedResponse(_))));
        assert!(matches!(classify_body("42"), Err(SuggestionError::MalformedResponse(_))));
        assert!(matches!(classify_body("[]"), Err(SuggestionError::MalformedResponse(_))));
    }

    #[test]
    fn template_names_use_file_stem() {
        assert_eq!(suggestion_template_name("beach.sunset.jpg"), "AI Suggestion (beach)");
        assert_eq!(suggestion_template_name("IMG_0042.PNG"), "AI Suggestion (IMG_0042)");
        assert_eq!(suggestion_template_name(".hidden"), "AI Suggestion");
        assert_eq!(suggestion_template_name(""), "AI Suggestion");
    }

    #[test]
    fn upload_mime_follows_extension() {
        assert_eq!(ImageUpload::new("a.PNG", vec![]).mime_type(), "image/png");
        assert_eq!(ImageUpload::new("a.jpeg", vec![]).mime_type(), "image/jpeg");
        assert_eq!(ImageUpload::new("noext", vec![]).mime_type(), "image/jpeg");
    }

    #[test]
    fn upload_reads_file_name_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selfie.jpg");
        std::fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();
        let upload = ImageUpload::from_path(&path).unwrap();
        assert_eq!(upload.file_name, "selfie.jpg");
        assert_eq!(upload.bytes.len(), 3);
        assert!(ImageUpload::from_path(&dir.path().join("missing.jpg")).is_err());
    }
}
