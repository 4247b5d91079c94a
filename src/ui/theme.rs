//! cliclack theme

use cliclack::ThemeState;
use console::Style;

/// Green framing; errors red, cancelled steps dimmed
#[derive(Debug, Clone, Default)]
pub struct KitprepTheme;

impl KitprepTheme {
    fn state_style(state: &ThemeState) -> Style {
        match state {
            ThemeState::Active | ThemeState::Submit => Style::new().green(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
        }
    }
}

impl cliclack::Theme for KitprepTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Submit => Style::new().green().dim(),
            other => Self::state_style(other),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        Self::state_style(state)
    }
}

/// Install as the process-wide cliclack theme
pub fn init_theme() {
    cliclack::set_theme(KitprepTheme);
}
