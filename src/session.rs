//! The session controller: single owner of what is currently shown.
//!
//! All user actions go through [`SessionController`], which keeps the
//! working configuration, the advisory selection, the display mode and the
//! suggestion request state in one [`Session`] value, and drives the
//! [`PatternScheduler`] exactly at fullscreen transitions and pattern changes.

use std::sync::Arc;
use std::time::Instant;

use shared::{ConfigurationModel, Edit, PRESETS, Template, TemplateId};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::notify::Notifier;
use crate::scheduler::{DisplayColor, PatternScheduler, display_color};
use crate::suggestion::{
    ImageUpload, RawSuggestion, SuggestionError, SuggestionParams, SuggestionService, adapt,
    suggestion_template_name,
};
use crate::templates::{TemplateError, TemplateStore};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("no preset at index {0}")]
    UnknownPreset(usize),
    #[error("a suggestion request is already in progress")]
    SuggestionInFlight,
    #[error("Failed to get AI suggestion: {0}")]
    SuggestionFailed(SuggestionError),
    #[error("suggestion request was abandoned")]
    SuggestionDiscarded,
}

/// What the working configuration was last copied from. Advisory only:
/// any edit clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Preset(usize),
    Template(TemplateId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Editing,
    Fullscreen,
}

/// Identifies one suggestion request; a result is only applied while its
/// ticket is still the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionTicket(u64);

#[derive(Debug)]
pub enum SuggestionOutcome {
    Applied {
        config: ConfigurationModel,
        saved: Option<Template>,
    },
    Failed(SuggestionError),
    /// The request was abandoned or superseded; nothing changed.
    Discarded,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    current: ConfigurationModel,
    selected: Option<Selection>,
    display_mode: DisplayMode,
    loading: bool,
    error: Option<String>,
    in_flight: Option<SuggestionTicket>,
}

impl Session {
    pub fn current(&self) -> ConfigurationModel {
        self.current
    }

    pub fn selected(&self) -> Option<Selection> {
        self.selected
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn is_fullscreen(&self) -> bool {
        self.display_mode == DisplayMode::Fullscreen
    }

    /// A suggestion request is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// User-visible error from the last failed suggestion or save.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

pub struct SessionController {
    session: Session,
    store: TemplateStore,
    scheduler: PatternScheduler,
    notifier: Box<dyn Notifier>,
    clock: Arc<dyn Clock>,
    auto_save_suggestions: bool,
    next_ticket: u64,
}

impl SessionController {
    pub fn new(store: TemplateStore, notifier: Box<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            session: Session::default(),
            store,
            scheduler: PatternScheduler::new(),
            notifier,
            clock,
            auto_save_suggestions: true,
            next_ticket: 0,
        }
    }

    /// Whether an applied suggestion is also saved as a template.
    pub fn with_auto_save(mut self, enabled: bool) -> Self {
        self.auto_save_suggestions = enabled;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn current(&self) -> ConfigurationModel {
        self.session.current
    }

    pub fn scheduler(&self) -> &PatternScheduler {
        &self.scheduler
    }

    pub fn templates(&mut self) -> &[Template] {
        self.store.list()
    }

    // ─── Configuration ──────────────────────────────────────────────────────

    pub fn select_template(&mut self, id: TemplateId) -> Result<(), SessionError> {
        let config = self.store.apply(id)?;
        let name = self
            .store
            .get(id)
            .map(|t| t.name().to_string())
            .unwrap_or_default();

        self.set_current(config);
        self.session.selected = Some(Selection::Template(id));
        self.notifier.notify("Template applied", &name);
        Ok(())
    }

    pub fn select_preset(&mut self, index: usize) -> Result<(), SessionError> {
        let preset = PRESETS.get(index).ok_or(SessionError::UnknownPreset(index))?;
        self.set_current(preset.config());
        self.session.selected = Some(Selection::Preset(index));
        self.notifier.notify("Template applied", preset.name);
        Ok(())
    }

    /// Applies one field change and clears the selection.
    pub fn edit_field(&mut self, edit: Edit) {
        let next = self.session.current.with_field(edit);
        self.set_current(next);
        self.session.selected = None;
    }

    /// Saves the working configuration under `name`.
    pub fn save_current_as(&mut self, name: &str) -> Result<Template, SessionError> {
        Ok(self.store.save(name, self.session.current)?)
    }

    pub fn delete_template(&mut self, id: TemplateId) -> Result<(), SessionError> {
        self.store.delete(id)?;
        if self.session.selected == Some(Selection::Template(id)) {
            self.session.selected = None;
        }
        Ok(())
    }

    fn set_current(&mut self, config: ConfigurationModel) {
        self.session.current = config;
        self.scheduler.set_pattern(config.pattern(), self.clock.now());
    }

    // ─── Display ────────────────────────────────────────────────────────────

    pub fn enter_fullscreen(&mut self) {
        if self.session.is_fullscreen() {
            return;
        }
        self.session.display_mode = DisplayMode::Fullscreen;
        self.scheduler
            .start(self.session.current.pattern(), self.clock.now());
    }

    pub fn exit_fullscreen(&mut self) {
        if !self.session.is_fullscreen() {
            return;
        }
        self.session.display_mode = DisplayMode::Editing;
        self.scheduler.stop();
    }

    pub fn toggle_fullscreen(&mut self) {
        if self.session.is_fullscreen() {
            self.exit_fullscreen();
        } else {
            self.enter_fullscreen();
        }
    }

    /// Advances pattern timing to the clock's current time. Returns whether
    /// the displayed color changed.
    pub fn tick(&mut self) -> bool {
        self.scheduler.poll(self.clock.now())
    }

    /// When [`tick`](Self::tick) next has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn display_color(&self) -> DisplayColor {
        display_color(&self.session.current, self.scheduler.phase())
    }

    // ─── Suggestions ────────────────────────────────────────────────────────

    /// Marks a suggestion request as in flight. Only one may be in flight.
    pub fn begin_suggestion(&mut self) -> Result<SuggestionTicket, SessionError> {
        if self.session.in_flight.is_some() {
            return Err(SessionError::SuggestionInFlight);
        }
        self.next_ticket += 1;
        let ticket = SuggestionTicket(self.next_ticket);
        self.session.in_flight = Some(ticket);
        self.session.loading = true;
        self.session.error = None;
        debug!(ticket = ticket.0, "suggestion request started");
        Ok(ticket)
    }

    /// Drops the in-flight request; its result will be discarded on arrival.
    pub fn abandon_suggestion(&mut self) {
        if let Some(ticket) = self.session.in_flight.take() {
            info!(ticket = ticket.0, "suggestion request abandoned");
        }
        self.session.loading = false;
    }

    /// Applies the service's answer for `ticket`. `source_file` names the
    /// analysed image and is used for the auto-saved template name.
    pub fn complete_suggestion(
        &mut self,
        ticket: SuggestionTicket,
        source_file: &str,
        result: Result<RawSuggestion, SuggestionError>,
    ) -> SuggestionOutcome {
        if self.session.in_flight != Some(ticket) {
            info!(ticket = ticket.0, "discarding stale suggestion result");
            return SuggestionOutcome::Discarded;
        }
        self.session.in_flight = None;
        self.session.loading = false;

        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "suggestion failed");
                self.session.error = Some(format!("Failed to get AI suggestion: {err}"));
                return SuggestionOutcome::Failed(err);
            }
        };

        let config = adapt(&raw);
        self.set_current(config);
        self.session.selected = None;
        info!(
            brightness = config.brightness(),
            color = %config.color(),
            pattern = %config.pattern(),
            "suggestion applied"
        );
        self.notifier.notify(
            "AI suggestion applied",
            &format!(
                "{} · {}% · {}",
                config.color(),
                config.brightness(),
                config.pattern().label()
            ),
        );

        let saved = if self.auto_save_suggestions {
            match self.store.save(&suggestion_template_name(source_file), config) {
                Ok(template) => Some(template),
                Err(err) => {
                    warn!(error = %err, "could not save suggestion as template");
                    self.session.error = Some(format!("Could not save suggestion: {err}"));
                    None
                }
            }
        } else {
            None
        };

        SuggestionOutcome::Applied { config, saved }
    }

    /// Runs one suggestion round trip against `service`.
    pub async fn request_suggestion(
        &mut self,
        service: &dyn SuggestionService,
        image: &ImageUpload,
        params: &SuggestionParams,
    ) -> Result<ConfigurationModel, SessionError> {
        let ticket = self.begin_suggestion()?;
        let result = service.analyze(image, params).await;
        match self.complete_suggestion(ticket, &image.file_name, result) {
            SuggestionOutcome::Applied { config, .. } => Ok(config),
            SuggestionOutcome::Failed(err) => Err(SessionError::SuggestionFailed(err)),
            SuggestionOutcome::Discarded => Err(SessionError::SuggestionDiscarded),
        }
    }

    pub fn dismiss_error(&mut self) {
        self.session.error = None;
    }
}
