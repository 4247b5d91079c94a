//! Terminal output with CI fallback
//!
//! Interactive terminals get `cliclack` framing and `indicatif` spinners; CI
//! logs and pipes get plain `[OK]` / `[WARN]` lines.
//!
//! ```rust,ignore
//! use kitprep::ui::{self, UiContext};
//!
//! let ctx = UiContext::detect();
//! ui::step_ok(&ctx, "Cache ready");
//! ui::step_warn_hint(&ctx, "Cache preparing", "Run: kitprep prefetch");
//! ```

mod context;
mod output;
mod progress;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, remark, section, step_error, step_ok, step_ok_detail,
    step_warn_hint,
};
pub use progress::{PrefetchProgress, TaskSpinner};
pub use theme::{init_theme, KitprepTheme};
