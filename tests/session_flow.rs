use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fill_light::clock::{Clock, ManualClock};
use fill_light::notify::RecordingNotifier;
use fill_light::scheduler::Phase;
use fill_light::session::{SessionController, SessionError};
use fill_light::storage::FileStore;
use fill_light::suggestion::{
    ImageUpload, RawSuggestion, SuggestionError, SuggestionParams, SuggestionService,
};
use fill_light::templates::TemplateStore;
use serde_json::json;
use shared::{Color, ConfigurationModel, Edit, Pattern};
use tempfile::TempDir;

/// Answers every request with a canned reply and records what was asked.
struct FakeService {
    reply: Mutex<Option<Result<RawSuggestion, SuggestionError>>>,
    seen: Mutex<Vec<(String, SuggestionParams)>>,
}

impl FakeService {
    fn answering(reply: Result<RawSuggestion, SuggestionError>) -> Self {
        Self {
            reply: Mutex::new(Some(reply)),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SuggestionService for FakeService {
    async fn analyze(
        &self,
        image: &ImageUpload,
        params: &SuggestionParams,
    ) -> Result<RawSuggestion, SuggestionError> {
        self.seen
            .lock()
            .unwrap()
            .push((image.file_name.clone(), params.clone()));
        self.reply
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(SuggestionError::Transport("no more replies".into())))
    }
}

fn open(dir: &TempDir, clock: &ManualClock, notes: &RecordingNotifier) -> SessionController {
    let clock = Arc::new(clock.clone());
    let store = TemplateStore::new(Box::new(FileStore::new(dir.path())), clock.clone());
    SessionController::new(store, Box::new(notes.clone()), clock)
}

fn photo() -> ImageUpload {
    ImageUpload::new("beach.jpg", vec![0xff, 0xd8, 0xff])
}

#[tokio::test]
async fn suggestion_is_applied_and_auto_saved() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::default();
    let notes = RecordingNotifier::new();
    let mut controller = open(&dir, &clock, &notes);

    let raw = serde_json::from_value(json!({
        "brightness": "80",
        "color": "#ffaa00",
        "pattern": "pulse"
    }))
    .unwrap();
    let service = FakeService::answering(Ok(raw));
    let params = SuggestionParams {
        preference: Some("warm".into()),
        ..SuggestionParams::default()
    };

    let applied = controller
        .request_suggestion(&service, &photo(), &params)
        .await
        .unwrap();

    assert_eq!(applied.brightness(), 80);
    assert_eq!(applied.color(), Color::new(0xff, 0xaa, 0x00));
    assert_eq!(applied.pattern(), Pattern::Pulse);
    assert_eq!(controller.current(), applied);
    assert!(!controller.session().is_loading());
    // Still editing: the pulse must not run until the light is shown.
    assert!(!controller.scheduler().has_timer());
    assert_eq!(controller.scheduler().phase(), Phase::Idle);

    controller.enter_fullscreen();
    assert_eq!(controller.scheduler().phase(), Phase::PulseOn);
    assert_eq!(
        controller.next_deadline(),
        Some(clock.now() + Duration::from_millis(1000))
    );
    clock.advance(Duration::from_millis(1000));
    assert!(controller.tick());
    assert_eq!(controller.scheduler().phase(), Phase::PulseOff);

    controller.exit_fullscreen();
    assert!(!controller.scheduler().has_timer());

    let seen = service.seen.lock().unwrap();
    assert_eq!(seen[0].0, "beach.jpg");
    assert_eq!(seen[0].1.preference.as_deref(), Some("warm"));

    let templates = controller.templates();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].name(), "AI Suggestion (beach)");
    assert!(notes.sent().iter().any(|(t, _)| t == "AI suggestion applied"));
}

#[tokio::test]
async fn failed_suggestion_leaves_configuration_alone() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::default();
    let notes = RecordingNotifier::new();
    let mut controller = open(&dir, &clock, &notes);
    controller.edit_field(Edit::Brightness(33));
    let before = controller.current();

    let service = FakeService::answering(Err(SuggestionError::Service("quota exceeded".into())));
    let err = controller
        .request_suggestion(&service, &photo(), &SuggestionParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::SuggestionFailed(_)));
    assert_eq!(controller.current(), before);
    assert_eq!(
        controller.session().error(),
        Some("Failed to get AI suggestion: quota exceeded")
    );
    assert!(!controller.session().is_loading());
    assert!(controller.templates().is_empty());
}

#[tokio::test]
async fn garbage_suggestion_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::default();
    let notes = RecordingNotifier::new();
    let mut controller = open(&dir, &clock, &notes).with_auto_save(false);

    let raw = serde_json::from_value(json!({
        "brightness": 250,
        "color": 7,
        "pattern": "disco"
    }))
    .unwrap();
    let service = FakeService::answering(Ok(raw));
    let applied = controller
        .request_suggestion(&service, &photo(), &SuggestionParams::default())
        .await
        .unwrap();

    assert_eq!(applied, ConfigurationModel::new(50, Color::WHITE, Pattern::Steady, 50, 75));
    assert!(!controller.scheduler().has_timer());
    assert!(controller.templates().is_empty());
}

#[test]
fn templates_survive_reopening_the_store() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::default();
    let notes = RecordingNotifier::new();

    let first = {
        let mut controller = open(&dir, &clock, &notes);
        controller.edit_field(Edit::Color(Color::new(0x12, 0x34, 0x56)));
        controller.edit_field(Edit::Pattern(Pattern::Strobe));
        let first = controller.save_current_as("Studio").unwrap();
        clock.advance(Duration::from_millis(5));
        controller.save_current_as("  Backup  ").unwrap();
        first
    };

    let mut reopened = open(&dir, &clock, &notes);
    let names: Vec<_> = reopened.templates().iter().map(|t| t.name().to_string()).collect();
    assert_eq!(names, ["Studio", "Backup"]);

    reopened.select_template(first.id()).unwrap();
    assert_eq!(reopened.current().color(), Color::new(0x12, 0x34, 0x56));
    assert_eq!(reopened.current().pattern(), Pattern::Strobe);

    reopened.delete_template(first.id()).unwrap();
    let mut again = open(&dir, &clock, &notes);
    assert_eq!(again.templates().len(), 1);
    assert_eq!(again.templates()[0].name(), "Backup");
}
