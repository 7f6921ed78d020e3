use crate::{Color, ConfigurationModel, Pattern};

/// A read-only setup that ships with the app and is listed ahead of saved
/// templates.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub brightness: u8,
    pub color: Color,
    pub pattern: Pattern,
}

impl Preset {
    /// Saturation and screen brightness take the default configuration's values.
    pub fn config(&self) -> ConfigurationModel {
        let base = ConfigurationModel::default();
        ConfigurationModel::new(
            self.brightness as i64,
            self.color,
            self.pattern,
            base.saturation() as i64,
            base.screen_brightness() as i64,
        )
    }
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "Portrait",
        brightness: 70,
        color: Color::WHITE,
        pattern: Pattern::Steady,
    },
    Preset {
        name: "Night",
        brightness: 90,
        color: Color::WHITE,
        pattern: Pattern::Steady,
    },
    Preset {
        name: "Ambient",
        brightness: 40,
        color: Color::new(0xff, 0xcc, 0x00),
        pattern: Pattern::Pulse,
    },
    Preset {
        name: "Party",
        brightness: 60,
        color: Color::new(0xff, 0x00, 0xff),
        pattern: Pattern::Strobe,
    },
];
