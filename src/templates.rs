//! The saved-template collection.
//!
//! Insertion order is display order. The whole collection lives under a
//! single storage key and is rewritten on every save and delete; a write
//! that fails leaves the in-memory collection untouched.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::{Color, ConfigurationModel, Pattern, Template, TemplateId, ValidationError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::storage::{KeyValueStore, StorageError};

pub const TEMPLATES_KEY: &str = "savedTemplates";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid template name: {0}")]
    InvalidName(#[from] ValidationError),
    #[error("template {0} not found")]
    NotFound(TemplateId),
    #[error("failed to persist templates: {0}")]
    Persistence(#[from] StorageError),
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Persisted shape
// ═══════════════════════════════════════════════════════════════════════════════

/// Numbers written by older front-ends may arrive as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LooseNumber {
    fn to_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.is_finite() => Some(*v as i64),
            Self::Float(_) => None,
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateRecordOut<'a> {
    id: TemplateId,
    name: &'a str,
    brightness: u8,
    color: Color,
    pattern: Pattern,
    saturation: u8,
    screen_brightness: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateRecordIn {
    id: TemplateId,
    name: String,
    brightness: LooseNumber,
    color: Color,
    #[serde(default)]
    pattern: Pattern,
    #[serde(default)]
    saturation: Option<LooseNumber>,
    #[serde(default)]
    screen_brightness: Option<LooseNumber>,
}

impl TemplateRecordIn {
    fn into_template(self) -> Template {
        let defaults = ConfigurationModel::default();
        let percent = |n: Option<&LooseNumber>, fallback: u8| {
            n.and_then(LooseNumber::to_i64).unwrap_or(fallback as i64)
        };
        let config = ConfigurationModel::new(
            percent(Some(&self.brightness), defaults.brightness()),
            self.color,
            self.pattern,
            percent(self.saturation.as_ref(), defaults.saturation()),
            percent(self.screen_brightness.as_ref(), defaults.screen_brightness()),
        );
        Template::new(self.id, self.name, config)
    }
}

fn encode(templates: &[Template]) -> Result<String, StorageError> {
    let records: Vec<TemplateRecordOut<'_>> = templates
        .iter()
        .map(|t| {
            let c = t.config();
            TemplateRecordOut {
                id: t.id(),
                name: t.name(),
                brightness: c.brightness(),
                color: c.color(),
                pattern: c.pattern(),
                saturation: c.saturation(),
                screen_brightness: c.screen_brightness(),
            }
        })
        .collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Decodes the collection record by record. A malformed record is skipped
/// with a warning; only a value that is not an array fails as a whole.
fn decode(raw: &str) -> Result<Vec<Template>, serde_json::Error> {
    let records: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    Ok(records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            match serde_json::from_value::<TemplateRecordIn>(record) {
                Ok(record) => Some(record.into_template()),
                Err(err) => {
                    warn!(index, error = %err, "skipping malformed saved template");
                    None
                }
            }
        })
        .collect())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Store
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TemplateStore {
    storage: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    /// `None` until the first access loads from storage.
    templates: Option<Vec<Template>>,
    last_id: u64,
}

impl TemplateStore {
    pub fn new(storage: Box<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            templates: None,
            last_id: 0,
        }
    }

    /// Saved templates in insertion order.
    pub fn list(&mut self) -> &[Template] {
        self.loaded()
    }

    pub fn get(&mut self, id: TemplateId) -> Option<&Template> {
        self.loaded().iter().find(|t| t.id() == id)
    }

    /// Appends a new template and persists the collection.
    pub fn save(
        &mut self,
        name: &str,
        config: ConfigurationModel,
    ) -> Result<Template, TemplateError> {
        let name = Template::validate_name(name)?.to_string();
        let mut next = self.loaded().clone();
        let id = self.next_id();
        let template = Template::new(id, name, config);
        next.push(template.clone());
        self.persist(&next)?;
        self.templates = Some(next);
        self.last_id = self.last_id.max(id.get());

        info!(id = %id, name = template.name(), "template saved");
        Ok(template)
    }

    /// Removes the template with `id`. Unknown ids are a no-op.
    pub fn delete(&mut self, id: TemplateId) -> Result<(), TemplateError> {
        let current = self.loaded();
        if !current.iter().any(|t| t.id() == id) {
            debug!(id = %id, "delete ignored, template not found");
            return Ok(());
        }

        let next: Vec<Template> = current.iter().filter(|t| t.id() != id).cloned().collect();
        self.persist(&next)?;
        self.templates = Some(next);

        info!(id = %id, "template deleted");
        Ok(())
    }

    /// A copy of the stored configuration for `id`.
    pub fn apply(&mut self, id: TemplateId) -> Result<ConfigurationModel, TemplateError> {
        self.get(id)
            .map(Template::config)
            .ok_or(TemplateError::NotFound(id))
    }

    fn loaded(&mut self) -> &mut Vec<Template> {
        if self.templates.is_none() {
            let templates = self.read_persisted();
            self.last_id = templates.iter().map(|t| t.id().get()).max().unwrap_or(0);
            self.templates = Some(templates);
        }
        self.templates.get_or_insert_with(Vec::new)
    }

    fn read_persisted(&self) -> Vec<Template> {
        let raw = match self.storage.get(TEMPLATES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no saved templates yet");
                return Vec::new();
            }
            Err(err) => {
                warn!(error = %err, "could not read saved templates, starting empty");
                return Vec::new();
            }
        };

        match decode(&raw) {
            Ok(templates) => {
                debug!(count = templates.len(), "loaded saved templates");
                templates
            }
            Err(err) => {
                warn!(error = %err, "saved templates are corrupt, starting empty");
                Vec::new()
            }
        }
    }

    fn persist(&mut self, templates: &[Template]) -> Result<(), StorageError> {
        let json = encode(templates)?;
        self.storage.set(TEMPLATES_KEY, &json)
    }

    /// Creation time in milliseconds, bumped past the last allocated id so
    /// two saves within one millisecond stay distinct.
    fn next_id(&self) -> TemplateId {
        let candidate = self.clock.epoch_millis().max(self.last_id.saturating_add(1));
        if candidate > self.last_id {
            return TemplateId::new(candidate);
        }
        // Nothing is left above the largest id; take the highest free one below it.
        let taken: HashSet<u64> = self.templates.iter().flatten().map(|t| t.id().get()).collect();
        let free = (0..candidate).rev().find(|id| !taken.contains(id)).unwrap_or(0);
        TemplateId::new(free)
    }
}
