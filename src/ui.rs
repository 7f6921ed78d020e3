//! Terminal front-end: configuration editor, template list, save/suggest
//! prompts and the fullscreen light itself.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::*;
use shared::{ConfigurationModel, Edit, Field, PRESETS, Template, TemplateId};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::notify::RecordingNotifier;
use crate::session::{
    Selection, SessionController, SessionError, SuggestionOutcome, SuggestionTicket,
};
use crate::suggestion::{
    ImageUpload, RawSuggestion, SuggestionError, SuggestionParams, SuggestionService,
};
use crate::templates::TemplateError;

const TICK: Duration = Duration::from_millis(250);
const PERCENT_STEP: i64 = 5;

// ═══════════════════════════════════════════════════════════════════════════════
//  Theme: Studio Amber
// ═══════════════════════════════════════════════════════════════════════════════

struct Theme;

impl Theme {
    const ACCENT: Color = Color::Rgb(255, 196, 64);
    const ACCENT2: Color = Color::Rgb(255, 230, 160);
    const DIM: Color = Color::Rgb(150, 110, 40);
    const DARK: Color = Color::Rgb(70, 50, 20);
    const BG_HEADER: Color = Color::Rgb(22, 16, 6);
    const FG: Color = Color::Rgb(230, 225, 215);
    const FG_DIM: Color = Color::Rgb(140, 135, 125);
    const OK: Color = Color::Rgb(120, 220, 120);
    const ERR: Color = Color::Rgb(255, 80, 60);
}

fn term_color(c: shared::Color) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

/// Readable text over a light surface of color `c`.
fn contrast(c: shared::Color) -> Color {
    let luma = 0.299 * c.r as f32 + 0.587 * c.g as f32 + 0.114 * c.b as f32;
    if luma > 140.0 { Color::Black } else { Color::White }
}

const COLOR_PALETTE: &[(&str, shared::Color)] = &[
    ("White", shared::Color::WHITE),
    ("Warm White", shared::Color::new(255, 214, 170)),
    ("Cool White", shared::Color::new(214, 232, 255)),
    ("Gold", shared::Color::new(255, 204, 0)),
    ("Orange", shared::Color::new(255, 128, 0)),
    ("Red", shared::Color::new(255, 0, 0)),
    ("Pink", shared::Color::new(255, 105, 180)),
    ("Magenta", shared::Color::new(255, 0, 255)),
    ("Purple", shared::Color::new(128, 0, 255)),
    ("Blue", shared::Color::new(0, 0, 255)),
    ("Cyan", shared::Color::new(0, 255, 255)),
    ("Green", shared::Color::new(0, 255, 0)),
];

fn palette_name(c: shared::Color) -> Option<&'static str> {
    COLOR_PALETTE.iter().find(|(_, p)| *p == c).map(|(n, _)| *n)
}

fn cycle_palette(current: shared::Color, forward: bool) -> shared::Color {
    let len = COLOR_PALETTE.len();
    let next = match COLOR_PALETTE.iter().position(|(_, p)| *p == current) {
        Some(i) if forward => (i + 1) % len,
        Some(i) => (i + len - 1) % len,
        None => 0,
    };
    COLOR_PALETTE[next].1
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Application State
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(PartialEq, Clone, Copy)]
enum Tab {
    Light,
    Templates,
}

enum Prompt {
    SaveName(String),
    ImagePath(String),
    FieldValue(Field, String),
}

impl Prompt {
    fn input_mut(&mut self) -> &mut String {
        match self {
            Self::SaveName(s) | Self::ImagePath(s) | Self::FieldValue(_, s) => s,
        }
    }

    fn title(&self) -> String {
        match self {
            Self::SaveName(_) => " Save Template ".into(),
            Self::ImagePath(_) => " AI Suggestion: image path ".into(),
            Self::FieldValue(field, _) => format!(" Set {field} "),
        }
    }
}

struct PendingSuggestion {
    ticket: SuggestionTicket,
    file_name: String,
    rx: oneshot::Receiver<Result<RawSuggestion, SuggestionError>>,
    cancel: CancellationToken,
}

pub struct App {
    controller: SessionController,
    notes: RecordingNotifier,
    service: Arc<dyn SuggestionService>,
    params: SuggestionParams,
    runtime: Handle,
    /// Snapshot of the saved templates, refreshed after every change.
    templates: Vec<Template>,
    tab: Tab,
    field_sel: usize,
    list_sel: usize,
    prompt: Option<Prompt>,
    pending: Option<PendingSuggestion>,
    status: String,
    err: bool,
    quit: bool,
}

impl App {
    /// `notes` must be the notifier the controller was built with.
    pub fn new(
        controller: SessionController,
        notes: RecordingNotifier,
        service: Arc<dyn SuggestionService>,
        params: SuggestionParams,
        runtime: Handle,
    ) -> Self {
        let mut app = Self {
            controller,
            notes,
            service,
            params,
            runtime,
            templates: Vec::new(),
            tab: Tab::Light,
            field_sel: 0,
            list_sel: 0,
            prompt: None,
            pending: None,
            status: "Ready — F1: Light  F2: Templates  F: Fullscreen  A: AI suggestion".into(),
            err: false,
            quit: false,
        };
        app.refresh_templates();
        app
    }

    fn refresh_templates(&mut self) {
        self.templates = self.controller.templates().to_vec();
        let len = self.entry_count();
        if self.list_sel >= len {
            self.list_sel = len.saturating_sub(1);
        }
    }

    fn set_status(&mut self, msg: impl Into<String>, err: bool) {
        self.status = msg.into();
        self.err = err;
    }

    fn tick(&mut self) {
        self.poll_suggestion();
        if let Some((title, body)) = self.notes.drain().pop() {
            self.set_status(format!("  ✓ {title} — {body}"), false);
        }
    }

    // ─── Template list ──────────────────────────────────────────────────────

    fn entry_count(&self) -> usize {
        PRESETS.len() + self.templates.len()
    }

    /// Name, configuration and (for saved templates) id of a list row.
    fn entry(&self, idx: usize) -> Option<(&str, ConfigurationModel, Option<TemplateId>)> {
        if let Some(preset) = PRESETS.get(idx) {
            return Some((preset.name, preset.config(), None));
        }
        self.templates
            .get(idx - PRESETS.len())
            .map(|t| (t.name(), t.config(), Some(t.id())))
    }

    fn entry_selected(&self, idx: usize) -> bool {
        match self.controller.session().selected() {
            Some(Selection::Preset(i)) => i == idx,
            Some(Selection::Template(id)) => {
                self.entry(idx).and_then(|(_, _, tid)| tid) == Some(id)
            }
            None => false,
        }
    }

    fn apply_entry(&mut self) {
        let idx = self.list_sel;
        let target = self.entry(idx).map(|(_, _, id)| id);
        let result = match target {
            Some(Some(id)) => self.controller.select_template(id),
            Some(None) => self.controller.select_preset(idx),
            None => return,
        };
        match result {
            Ok(()) => self.tick(),
            Err(e) => self.set_status(format!("  ✗ {e}"), true),
        }
    }

    fn delete_entry(&mut self) {
        let Some((name, id)) = self
            .entry(self.list_sel)
            .map(|(name, _, id)| (name.to_string(), id))
        else {
            return;
        };
        let Some(id) = id else {
            self.set_status("  Presets cannot be deleted", true);
            return;
        };
        match self.controller.delete_template(id) {
            Ok(()) => {
                self.refresh_templates();
                self.set_status(format!("  ✓ Deleted '{name}'"), false);
            }
            Err(e) => self.set_status(format!("  ✗ {e}"), true),
        }
    }

    // ─── Editing ────────────────────────────────────────────────────────────

    fn adjust(&mut self, forward: bool) {
        let cur = self.controller.current();
        let step = if forward { PERCENT_STEP } else { -PERCENT_STEP };
        let edit = match Field::ALL[self.field_sel] {
            Field::Brightness => Edit::Brightness(cur.brightness() as i64 + step),
            Field::Saturation => Edit::Saturation(cur.saturation() as i64 + step),
            Field::ScreenBrightness => {
                Edit::ScreenBrightness(cur.screen_brightness() as i64 + step)
            }
            Field::Color => Edit::Color(cycle_palette(cur.color(), forward)),
            Field::Pattern => Edit::Pattern(if forward {
                cur.pattern().next()
            } else {
                cur.pattern().prev()
            }),
        };
        self.controller.edit_field(edit);
    }

    fn submit_prompt(&mut self, prompt: Prompt) {
        match prompt {
            Prompt::SaveName(name) => match self.controller.save_current_as(&name) {
                Ok(t) => {
                    self.refresh_templates();
                    self.set_status(format!("  ✓ Saved template '{}'", t.name()), false);
                }
                Err(SessionError::Template(TemplateError::InvalidName(e))) => {
                    self.set_status(format!("  ✗ {e}"), true);
                    self.prompt = Some(Prompt::SaveName(name));
                }
                Err(e) => self.set_status(format!("  ✗ {e}"), true),
            },
            Prompt::ImagePath(path) => self.start_suggestion(PathBuf::from(path.trim())),
            Prompt::FieldValue(field, raw) => match Edit::parse(field, &raw) {
                Ok(edit) => self.controller.edit_field(edit),
                Err(e) => self.set_status(format!("  ✗ {e}"), true),
            },
        }
    }

    // ─── Suggestions ────────────────────────────────────────────────────────

    fn start_suggestion(&mut self, path: PathBuf) {
        let image = match ImageUpload::from_path(&path) {
            Ok(image) => image,
            Err(e) => {
                self.set_status(format!("  ✗ {}: {e}", path.display()), true);
                return;
            }
        };
        let ticket = match self.controller.begin_suggestion() {
            Ok(ticket) => ticket,
            Err(e) => {
                self.set_status(format!("  ✗ {e}"), true);
                return;
            }
        };

        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let service = Arc::clone(&self.service);
        let params = self.params.clone();
        let file_name = image.file_name.clone();

        self.runtime.spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => return,
                result = service.analyze(&image, &params) => result,
            };
            let _ = tx.send(result);
        });

        self.pending = Some(PendingSuggestion {
            ticket,
            file_name: file_name.clone(),
            rx,
            cancel,
        });
        self.set_status(format!("  ⟳ Analyzing {file_name}... (Esc to cancel)"), false);
    }

    fn poll_suggestion(&mut self) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        let result = match pending.rx.try_recv() {
            Ok(result) => result,
            Err(oneshot::error::TryRecvError::Empty) => return,
            Err(oneshot::error::TryRecvError::Closed) => Err(SuggestionError::Transport(
                "request task ended without a result".into(),
            )),
        };
        let Some(pending) = self.pending.take() else {
            return;
        };

        match self
            .controller
            .complete_suggestion(pending.ticket, &pending.file_name, result)
        {
            SuggestionOutcome::Applied { saved, .. } => {
                self.refresh_templates();
                let msg = match saved {
                    Some(t) => format!("  ✓ AI suggestion applied and saved as '{}'", t.name()),
                    None => "  ✓ AI suggestion applied".into(),
                };
                self.notes.drain();
                self.set_status(msg, false);
            }
            SuggestionOutcome::Failed(_) => {
                let msg = self.controller.session().error().unwrap_or_default().to_string();
                self.set_status(format!("  ✗ {msg}"), true);
            }
            SuggestionOutcome::Discarded => {}
        }
    }

    fn cancel_suggestion(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel.cancel();
            self.controller.abandon_suggestion();
            info!("suggestion cancelled from the UI");
            self.set_status("  Suggestion cancelled", false);
        }
    }

    // ─── Key Handling ───────────────────────────────────────────────────────

    fn on_key(&mut self, k: KeyEvent) {
        if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
            self.quit = true;
            return;
        }

        if let Some(mut prompt) = self.prompt.take() {
            match k.code {
                KeyCode::Esc => self.set_status("Cancelled", false),
                KeyCode::Enter => self.submit_prompt(prompt),
                KeyCode::Backspace => {
                    prompt.input_mut().pop();
                    self.prompt = Some(prompt);
                }
                KeyCode::Char(c) => {
                    prompt.input_mut().push(c);
                    self.prompt = Some(prompt);
                }
                _ => self.prompt = Some(prompt),
            }
            return;
        }

        if self.controller.session().is_fullscreen() {
            match k.code {
                KeyCode::Char('s') | KeyCode::Char('S') => {
                    self.controller.exit_fullscreen();
                    self.prompt = Some(Prompt::SaveName(String::new()));
                }
                _ => self.controller.exit_fullscreen(),
            }
            return;
        }

        match k.code {
            KeyCode::F(1) => {
                self.tab = Tab::Light;
                return;
            }
            KeyCode::F(2) => {
                self.tab = Tab::Templates;
                return;
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.tab = if self.tab == Tab::Light {
                    Tab::Templates
                } else {
                    Tab::Light
                };
                return;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.quit = true;
                return;
            }
            KeyCode::Char('f') | KeyCode::Char('F') => {
                self.controller.enter_fullscreen();
                return;
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                self.prompt = Some(Prompt::SaveName(String::new()));
                return;
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                if self.controller.session().is_loading() {
                    self.set_status("  A suggestion is already being analyzed", true);
                } else {
                    self.prompt = Some(Prompt::ImagePath(String::new()));
                }
                return;
            }
            KeyCode::Esc => {
                if self.pending.is_some() {
                    self.cancel_suggestion();
                } else {
                    self.controller.dismiss_error();
                    self.set_status("", false);
                }
                return;
            }
            _ => {}
        }

        match self.tab {
            Tab::Light => self.on_key_light(k),
            Tab::Templates => self.on_key_templates(k),
        }
    }

    fn on_key_light(&mut self, k: KeyEvent) {
        let len = Field::ALL.len();
        match k.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.field_sel = if self.field_sel > 0 {
                    self.field_sel - 1
                } else {
                    len - 1
                };
            }
            KeyCode::Down | KeyCode::Char('j') => self.field_sel = (self.field_sel + 1) % len,
            KeyCode::Left | KeyCode::Char('h') => self.adjust(false),
            KeyCode::Right | KeyCode::Char('l') => self.adjust(true),
            KeyCode::Enter | KeyCode::Char('e') => {
                let field = Field::ALL[self.field_sel];
                self.prompt = Some(Prompt::FieldValue(field, String::new()));
            }
            _ => {}
        }
    }

    fn on_key_templates(&mut self, k: KeyEvent) {
        let len = self.entry_count();
        if len == 0 {
            return;
        }
        match k.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.list_sel = if self.list_sel > 0 {
                    self.list_sel - 1
                } else {
                    len - 1
                };
            }
            KeyCode::Down | KeyCode::Char('j') => self.list_sel = (self.list_sel + 1) % len,
            KeyCode::Enter | KeyCode::Char(' ') => self.apply_entry(),
            KeyCode::Char('d') | KeyCode::Delete => self.delete_entry(),
            _ => {}
        }
    }

    // ─── Main Loop ──────────────────────────────────────────────────────────

    pub fn run(mut self, mut term: ratatui::DefaultTerminal) -> Result<()> {
        let mut last = Instant::now();
        loop {
            term.draw(|f| draw(f, &self))?;

            let mut timeout = TICK.saturating_sub(last.elapsed());
            if let Some(deadline) = self.controller.next_deadline() {
                timeout = timeout.min(deadline.saturating_duration_since(Instant::now()));
            }
            if event::poll(timeout)?
                && let Event::Key(k) = event::read()?
                && k.kind == KeyEventKind::Press
            {
                self.on_key(k);
            }

            self.controller.tick();
            if last.elapsed() >= TICK {
                self.tick();
                last = Instant::now();
            }

            if self.quit {
                break;
            }
        }
        self.cancel_suggestion();
        self.controller.exit_fullscreen();
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  UI Rendering
// ═══════════════════════════════════════════════════════════════════════════════

fn draw(f: &mut Frame, app: &App) {
    if app.controller.session().is_fullscreen() {
        draw_fullscreen(f, app);
        return;
    }

    let [header, tab_bar, body, detail, status] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(10),
        Constraint::Length(5),
        Constraint::Length(3),
    ])
    .areas(f.area());

    draw_header(f, header);
    draw_tab_bar(f, tab_bar, app);

    let [left, right] =
        Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(body);

    match app.tab {
        Tab::Light => {
            draw_editor(f, left, app);
            draw_preview(f, right, " Preview ", &app.controller.current());
        }
        Tab::Templates => {
            draw_template_list(f, left, app);
            match app.entry(app.list_sel) {
                Some((name, cfg, _)) => draw_preview(f, right, &format!(" {name} "), &cfg),
                None => draw_preview(f, right, " Preview ", &app.controller.current()),
            }
        }
    }

    draw_detail(f, detail, app);
    draw_status(f, status, app);

    if let Some(prompt) = &app.prompt {
        draw_prompt(f, prompt);
    }
}

// ─── Fullscreen ─────────────────────────────────────────────────────────────

fn draw_fullscreen(f: &mut Frame, app: &App) {
    let shown = app.controller.display_color().composited();
    let area = f.area();
    f.render_widget(Block::new().style(Style::new().bg(term_color(shown))), area);

    let hint = Line::from(Span::styled(
        " any key: back  │  S: save template ",
        Style::new().fg(contrast(shown)),
    ))
    .centered();
    let [_, bottom] = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(area);
    f.render_widget(Paragraph::new(hint), bottom);
}

// ─── Header ─────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect) {
    let block = Block::bordered()
        .border_type(BorderType::Double)
        .border_style(Style::new().fg(Theme::ACCENT))
        .style(Style::new().bg(Theme::BG_HEADER));

    let text = Line::from(vec![
        Span::styled("  ☀ ", Style::new().fg(Theme::ACCENT).bold()),
        Span::styled("F I L L - L I G H T", Style::new().fg(Theme::ACCENT).bold()),
        Span::styled("  ☀  ", Style::new().fg(Theme::ACCENT)),
        Span::styled("Selfie & photo light", Style::new().fg(Theme::FG_DIM)),
    ])
    .centered();

    f.render_widget(Paragraph::new(text).block(block), area);
}

// ─── Tab Bar ────────────────────────────────────────────────────────────────

fn draw_tab_bar(f: &mut Frame, area: Rect, app: &App) {
    let style_for = |tab: Tab| {
        if app.tab == tab {
            Style::new().fg(Color::Black).bg(Theme::ACCENT).bold()
        } else {
            Style::new().fg(Theme::FG_DIM)
        }
    };

    let line = Line::from(vec![
        Span::raw("  "),
        Span::styled(" F1 Light ", style_for(Tab::Light)),
        Span::raw("  "),
        Span::styled(" F2 Templates ", style_for(Tab::Templates)),
        Span::styled(
            "                              Tab to switch",
            Style::new().fg(Theme::DARK),
        ),
    ]);

    f.render_widget(Paragraph::new(line), area);
}

// ─── Editor ─────────────────────────────────────────────────────────────────

fn make_bar(pct: u8, w: usize) -> Vec<Span<'static>> {
    let fill = (pct as usize * w) / 100;
    vec![
        Span::styled("━".repeat(fill), Style::new().fg(Theme::ACCENT)),
        Span::styled("─".repeat(w - fill), Style::new().fg(Theme::DARK)),
        Span::styled(format!(" {pct:>3}%"), Style::new().fg(Theme::FG)),
    ]
}

fn draw_editor(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::new().fg(Theme::DIM))
        .title(Span::styled(
            " Configuration ",
            Style::new().fg(Theme::ACCENT).bold(),
        ));

    let cfg = app.controller.current();
    let bar_w: usize = 20;

    let lines: Vec<Line> = Field::ALL
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let sel = idx == app.field_sel;
            let ls = if sel {
                Style::new().fg(Theme::ACCENT).bold()
            } else {
                Style::new().fg(Theme::FG)
            };
            let mut spans = vec![
                Span::styled(if sel { " ▸ " } else { "   " }, ls),
                Span::styled(format!("{:<19}", field.label()), ls),
            ];
            match field {
                Field::Brightness => spans.extend(make_bar(cfg.brightness(), bar_w)),
                Field::Saturation => spans.extend(make_bar(cfg.saturation(), bar_w)),
                Field::ScreenBrightness => spans.extend(make_bar(cfg.screen_brightness(), bar_w)),
                Field::Color => {
                    let c = cfg.color();
                    spans.push(Span::styled("◀ ", Style::new().fg(Theme::DIM)));
                    spans.push(Span::styled("████", Style::new().fg(term_color(c))));
                    spans.push(Span::styled(
                        format!(" {} {}", c, palette_name(c).unwrap_or("")),
                        Style::new().fg(Theme::ACCENT2),
                    ));
                    spans.push(Span::styled(" ▶", Style::new().fg(Theme::DIM)));
                }
                Field::Pattern => {
                    spans.push(Span::styled("◀ ", Style::new().fg(Theme::DIM)));
                    spans.push(Span::styled(
                        cfg.pattern().label(),
                        Style::new().fg(Theme::ACCENT2).bold(),
                    ));
                    spans.push(Span::styled(" ▶", Style::new().fg(Theme::DIM)));
                }
            }
            Line::from(spans)
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

// ─── Preview Swatch ─────────────────────────────────────────────────────────

fn draw_preview(f: &mut Frame, area: Rect, title: &str, cfg: &ConfigurationModel) {
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::new().fg(Theme::DIM))
        .title(Span::styled(
            title.to_string(),
            Style::new().fg(Theme::ACCENT).bold(),
        ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let c = cfg.color();
    let text = vec![
        Line::default(),
        Line::from(Span::styled(
            format!("{} · {}% · {}", c, cfg.brightness(), cfg.pattern().label()),
            Style::new().fg(contrast(c)).bold(),
        ))
        .centered(),
    ];
    f.render_widget(
        Paragraph::new(text).style(Style::new().bg(term_color(c))),
        inner,
    );
}

// ─── Template List ──────────────────────────────────────────────────────────

fn draw_template_list(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::new().fg(Theme::DIM))
        .title(Span::styled(
            " Presets & Templates ",
            Style::new().fg(Theme::ACCENT).bold(),
        ));

    let mut lines = Vec::with_capacity(app.entry_count() + 2);
    for idx in 0..app.entry_count() {
        if idx == PRESETS.len() {
            lines.push(Line::from(Span::styled(
                "   ── my templates ──",
                Style::new().fg(Theme::DARK),
            )));
        }
        let Some((name, cfg, id)) = app.entry(idx) else {
            continue;
        };
        let sel = idx == app.list_sel;
        let ls = if sel {
            Style::new().fg(Theme::ACCENT).bold()
        } else {
            Style::new().fg(Theme::FG)
        };
        let marker = if app.entry_selected(idx) { "● " } else { "  " };
        let kind = if id.is_some() { "" } else { " (preset)" };
        lines.push(Line::from(vec![
            Span::styled(if sel { " ▸ " } else { "   " }, ls),
            Span::styled(marker, Style::new().fg(Theme::OK)),
            Span::styled("██ ", Style::new().fg(term_color(cfg.color()))),
            Span::styled(format!("{name}{kind}"), ls),
            Span::styled(
                format!("  {}% {}", cfg.brightness(), cfg.pattern().label()),
                Style::new().fg(Theme::FG_DIM),
            ),
        ]));
    }
    if app.templates.is_empty() {
        lines.push(Line::from(Span::styled(
            "   ── no saved templates yet ──",
            Style::new().fg(Theme::DARK),
        )));
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}

// ─── Detail Panel ───────────────────────────────────────────────────────────

fn draw_detail(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::new().fg(Theme::DIM))
        .title(Span::styled(" Details ", Style::new().fg(Theme::ACCENT).bold()));

    let mut lines = Vec::new();
    if let Some(error) = app.controller.session().error() {
        lines.push(Line::from(vec![
            Span::styled("  Error: ", Style::new().fg(Theme::ERR).bold()),
            Span::styled(error.to_string(), Style::new().fg(Theme::ERR)),
        ]));
    }

    let hint = match app.tab {
        Tab::Light => match Field::ALL[app.field_sel] {
            Field::Saturation | Field::ScreenBrightness => {
                "  Kept with the template; the light itself ignores it."
            }
            Field::Pattern => "  Steady: constant │ Pulse: dims every 1s │ Strobe: blacks out every 200ms",
            _ => "  ←→: Adjust  │  Enter: Type a value  │  ↑↓: Field",
        },
        Tab::Templates => "  Enter: Apply  │  D: Delete saved template  │  ↑↓: Select",
    };
    lines.push(Line::from(Span::styled(hint, Style::new().fg(Theme::FG_DIM))));
    lines.push(Line::from(Span::styled(
        "  F: Fullscreen  │  S: Save as template  │  A: AI suggestion from photo",
        Style::new().fg(Theme::DIM),
    )));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

// ─── Status Bar ─────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let tab_span = match app.tab {
        Tab::Light => Span::styled(
            " LIGHT ",
            Style::new().fg(Color::Black).bg(Theme::ACCENT).bold(),
        ),
        Tab::Templates => Span::styled(
            " TEMPLATES ",
            Style::new().fg(Color::Black).bg(Theme::ACCENT2).bold(),
        ),
    };

    let ai_span = if app.controller.session().is_loading() {
        Span::styled(" ⟳ ANALYZING ", Style::new().fg(Theme::ACCENT).bold())
    } else {
        Span::styled(" AI idle ", Style::new().fg(Theme::FG_DIM))
    };

    let sc = if app.err { Theme::ERR } else { Theme::FG_DIM };

    let lines = vec![
        Line::from(vec![
            tab_span,
            Span::raw(" "),
            ai_span,
            Span::raw(" "),
            Span::styled(app.status.clone(), Style::new().fg(sc)),
        ]),
        Line::from(Span::styled(
            " F1/F2 Tab │ ↑↓ Select │ ←→ Adjust │ Esc Cancel │ q Quit ",
            Style::new().fg(Theme::FG_DIM),
        )),
    ];

    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::new().fg(Theme::DARK));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

// ─── Prompt ─────────────────────────────────────────────────────────────────

fn draw_prompt(f: &mut Frame, prompt: &Prompt) {
    let area = f.area();
    let w = area.width.min(60);
    let popup = Rect::new(
        area.x + (area.width - w) / 2,
        area.y + area.height.saturating_sub(5) / 2,
        w,
        5.min(area.height),
    );

    let input = match prompt {
        Prompt::SaveName(s) | Prompt::ImagePath(s) | Prompt::FieldValue(_, s) => s.as_str(),
    };
    let block = Block::bordered()
        .border_type(BorderType::Double)
        .border_style(Style::new().fg(Theme::ACCENT))
        .title(Span::styled(prompt.title(), Style::new().fg(Theme::ACCENT).bold()));

    let lines = vec![
        Line::from(vec![
            Span::styled(" › ", Style::new().fg(Theme::ACCENT)),
            Span::styled(format!("{input}▏"), Style::new().fg(Theme::FG)),
        ]),
        Line::from(Span::styled(
            " Enter: confirm  │  Esc: cancel",
            Style::new().fg(Theme::FG_DIM),
        )),
    ];

    f.render_widget(Clear, popup);
    f.render_widget(Paragraph::new(lines).block(block), popup);
}
