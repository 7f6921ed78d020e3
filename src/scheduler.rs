//! Pattern timing for the active light.
//!
//! The scheduler is a plain state machine driven by explicit timestamps: the
//! owner calls [`PatternScheduler::start`] when the light becomes visible,
//! [`PatternScheduler::stop`] when it is hidden, and [`PatternScheduler::poll`]
//! from its event loop. While idle it holds no timer at all.

use std::time::{Duration, Instant};

use shared::{Color, ConfigurationModel, Pattern};
use tracing::debug;

pub const PULSE_PERIOD: Duration = Duration::from_millis(1000);
pub const STROBE_PERIOD: Duration = Duration::from_millis(200);
/// Opacity of the dim half of a pulse.
pub const PULSE_DIM_OPACITY: f32 = 0.5;

/// Toggle period for a pattern, `None` when the pattern does not oscillate.
pub fn period(pattern: Pattern) -> Option<Duration> {
    match pattern {
        Pattern::Steady => None,
        Pattern::Pulse => Some(PULSE_PERIOD),
        Pattern::Strobe => Some(STROBE_PERIOD),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Steady,
    PulseOn,
    PulseOff,
    StrobeOn,
    StrobeOff,
}

impl Phase {
    fn initial(pattern: Pattern) -> Self {
        match pattern {
            Pattern::Steady => Self::Steady,
            Pattern::Pulse => Self::PulseOn,
            Pattern::Strobe => Self::StrobeOn,
        }
    }

    fn toggled(self) -> Self {
        match self {
            Self::PulseOn => Self::PulseOff,
            Self::PulseOff => Self::PulseOn,
            Self::StrobeOn => Self::StrobeOff,
            Self::StrobeOff => Self::StrobeOn,
            other => other,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Display color
// ═══════════════════════════════════════════════════════════════════════════════

/// What the light surface should show right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayColor {
    pub color: Color,
    /// 1.0 is fully opaque; pulses dim to [`PULSE_DIM_OPACITY`].
    pub opacity: f32,
}

impl DisplayColor {
    pub fn is_dimmed(&self) -> bool {
        self.opacity < 1.0
    }

    /// The color as seen over a black background.
    pub fn composited(&self) -> Color {
        self.color.scaled(self.opacity)
    }
}

/// Strobe-off blacks the color out; pulse-off keeps the color and lowers
/// opacity. Brightness, saturation and screen brightness are not applied.
pub fn display_color(config: &ConfigurationModel, phase: Phase) -> DisplayColor {
    match (config.pattern(), phase) {
        (Pattern::Strobe, Phase::StrobeOff) => DisplayColor {
            color: Color::BLACK,
            opacity: 1.0,
        },
        (Pattern::Pulse, Phase::PulseOff) => DisplayColor {
            color: config.color(),
            opacity: PULSE_DIM_OPACITY,
        },
        _ => DisplayColor {
            color: config.color(),
            opacity: 1.0,
        },
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
struct Ticker {
    period: Duration,
    next_due: Instant,
}

/// Counts of timers armed and cancelled over the scheduler's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerStats {
    pub armed: u64,
    pub cancelled: u64,
}

#[derive(Debug, Default)]
pub struct PatternScheduler {
    phase: Phase,
    active: Option<Pattern>,
    ticker: Option<Ticker>,
    stats: TimerStats,
}

impl PatternScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates the light with `pattern`. Restarting an active scheduler
    /// cancels its timer first, so at most one timer is ever armed.
    pub fn start(&mut self, pattern: Pattern, now: Instant) {
        if self.active.is_some() {
            self.stop();
        }

        self.active = Some(pattern);
        self.phase = Phase::initial(pattern);
        self.ticker = period(pattern).map(|period| Ticker {
            period,
            next_due: now + period,
        });
        if self.ticker.is_some() {
            self.stats.armed += 1;
        }
        debug!(pattern = %pattern, phase = ?self.phase, "pattern scheduler started");
    }

    pub fn stop(&mut self) {
        if self.ticker.take().is_some() {
            self.stats.cancelled += 1;
        }
        if self.active.take().is_some() {
            debug!("pattern scheduler stopped");
        }
        self.phase = Phase::Idle;
    }

    /// Follows a pattern change on the current configuration. Does nothing
    /// while idle or when the pattern is unchanged.
    pub fn set_pattern(&mut self, pattern: Pattern, now: Instant) {
        match self.active {
            Some(current) if current != pattern => self.start(pattern, now),
            _ => {}
        }
    }

    /// Fires every toggle that fell due up to `now`. Returns whether the
    /// phase changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(ticker) = self.ticker.as_mut() else {
            return false;
        };
        if now < ticker.next_due {
            return false;
        }

        let period_nanos = ticker.period.as_nanos();
        let overdue_nanos = (now - ticker.next_due).as_nanos();
        let toggles = 1 + overdue_nanos / period_nanos;
        let into_period = (overdue_nanos % period_nanos) as u64;
        ticker.next_due = now + ticker.period - Duration::from_nanos(into_period);

        if toggles % 2 == 1 {
            self.phase = self.phase.toggled();
            true
        } else {
            false
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn has_timer(&self) -> bool {
        self.ticker.is_some()
    }

    /// When the next toggle is due, if a timer is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.ticker.map(|t| t.next_due)
    }

    pub fn stats(&self) -> TimerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Edit;

    fn config(pattern: Pattern) -> ConfigurationModel {
        ConfigurationModel::default()
            .with_field(Edit::Color(Color::new(0x11, 0x22, 0x33)))
            .with_field(Edit::Pattern(pattern))
    }

    #[test]
    fn idle_scheduler_holds_no_timer() {
        let mut s = PatternScheduler::new();
        assert_eq!(s.phase(), Phase::Idle);
        assert!(!s.has_timer());
        assert!(!s.poll(Instant::now() + Duration::from_secs(10)));
    }

    #[test]
    fn steady_never_toggles() {
        let t0 = Instant::now();
        let mut s = PatternScheduler::new();
        s.start(Pattern::Steady, t0);
        assert_eq!(s.phase(), Phase::Steady);
        assert!(!s.has_timer());
        for ms in (0..5_000).step_by(100) {
            assert!(!s.poll(t0 + Duration::from_millis(ms)));
            assert_eq!(s.phase(), Phase::Steady);
        }
        assert_eq!(s.stats().armed, 0);
    }

    #[test]
    fn strobe_toggles_every_200ms() {
        let t0 = Instant::now();
        let mut s = PatternScheduler::new();
        s.start(Pattern::Strobe, t0);
        assert_eq!(s.phase(), Phase::StrobeOn);

        assert!(!s.poll(t0 + Duration::from_millis(199)));
        assert!(s.poll(t0 + Duration::from_millis(200)));
        assert_eq!(s.phase(), Phase::StrobeOff);
        assert!(!s.poll(t0 + Duration::from_millis(399)));
        assert!(s.poll(t0 + Duration::from_millis(400)));
        assert_eq!(s.phase(), Phase::StrobeOn);
        assert_eq!(s.next_deadline(), Some(t0 + Duration::from_millis(600)));
    }

    #[test]
    fn pulse_toggles_every_second() {
        let t0 = Instant::now();
        let mut s = PatternScheduler::new();
        s.start(Pattern::Pulse, t0);
        assert_eq!(s.phase(), Phase::PulseOn);
        assert!(!s.poll(t0 + Duration::from_millis(999)));
        assert!(s.poll(t0 + Duration::from_millis(1000)));
        assert_eq!(s.phase(), Phase::PulseOff);
    }

    #[test]
    fn late_poll_catches_up_parity() {
        let t0 = Instant::now();
        let mut s = PatternScheduler::new();
        s.start(Pattern::Strobe, t0);
        // 3 toggles due at 200/400/600: net result is Off.
        assert!(s.poll(t0 + Duration::from_millis(650)));
        assert_eq!(s.phase(), Phase::StrobeOff);
        assert_eq!(s.next_deadline(), Some(t0 + Duration::from_millis(800)));
        // 2 toggles due at 800/1000: net unchanged.
        assert!(!s.poll(t0 + Duration::from_millis(1000)));
        assert_eq!(s.phase(), Phase::StrobeOff);
    }

    #[test]
    fn stop_cancels_timer_once_and_freezes_phase() {
        let t0 = Instant::now();
        let mut s = PatternScheduler::new();
        s.start(Pattern::Strobe, t0);
        s.poll(t0 + Duration::from_millis(200));
        s.stop();
        s.stop();
        assert_eq!(s.phase(), Phase::Idle);
        assert!(!s.has_timer());
        assert_eq!(s.stats(), TimerStats { armed: 1, cancelled: 1 });
        for ms in (200..3_000).step_by(50) {
            assert!(!s.poll(t0 + Duration::from_millis(ms)));
            assert_eq!(s.phase(), Phase::Idle);
        }
    }

    #[test]
    fn restart_never_doubles_timers() {
        let t0 = Instant::now();
        let mut s = PatternScheduler::new();
        s.start(Pattern::Pulse, t0);
        s.start(Pattern::Pulse, t0 + Duration::from_millis(10));
        let stats = s.stats();
        assert_eq!(stats.armed - stats.cancelled, 1);
    }

    #[test]
    fn pattern_change_resets_phase() {
        let t0 = Instant::now();
        let mut s = PatternScheduler::new();
        s.start(Pattern::Strobe, t0);
        s.poll(t0 + Duration::from_millis(200));
        assert_eq!(s.phase(), Phase::StrobeOff);

        let t1 = t0 + Duration::from_millis(250);
        s.set_pattern(Pattern::Pulse, t1);
        assert_eq!(s.phase(), Phase::PulseOn);
        assert_eq!(s.next_deadline(), Some(t1 + PULSE_PERIOD));

        s.set_pattern(Pattern::Steady, t1);
        assert_eq!(s.phase(), Phase::Steady);
        assert!(!s.has_timer());
        assert_eq!(s.stats(), TimerStats { armed: 2, cancelled: 2 });
    }

    #[test]
    fn set_pattern_while_idle_is_ignored() {
        let mut s = PatternScheduler::new();
        s.set_pattern(Pattern::Strobe, Instant::now());
        assert!(!s.is_active());
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn strobe_off_blacks_out() {
        let cfg = config(Pattern::Strobe);
        assert_eq!(display_color(&cfg, Phase::StrobeOn).color, cfg.color());
        let off = display_color(&cfg, Phase::StrobeOff);
        assert_eq!(off.color, Color::BLACK);
        assert!(!off.is_dimmed());
    }

    #[test]
    fn pulse_off_dims_without_swapping_color() {
        let cfg = config(Pattern::Pulse);
        let on = display_color(&cfg, Phase::PulseOn);
        assert_eq!(on.opacity, 1.0);
        let off = display_color(&cfg, Phase::PulseOff);
        assert_eq!(off.color, cfg.color());
        assert_eq!(off.opacity, PULSE_DIM_OPACITY);
        assert_eq!(off.composited(), cfg.color().scaled(0.5));
    }

    #[test]
    fn display_ignores_ui_only_fields() {
        let cfg = config(Pattern::Steady);
        let tweaked = cfg
            .with_field(Edit::Saturation(0))
            .with_field(Edit::ScreenBrightness(0))
            .with_field(Edit::Brightness(0));
        assert_eq!(display_color(&cfg, Phase::Steady), display_color(&tweaked, Phase::Steady));
    }
}
