use crate::cli::ColorChoice;
use crate::error::Error;
use console::{Emoji, style};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Display;
use std::sync::OnceLock;
use std::time::Duration;

static EMOJI_SUCCESS: Emoji<'_, '_> = Emoji("✔ ", "+ ");
static EMOJI_WARNING: Emoji<'_, '_> = Emoji("⚠ ", "! ");
static EMOJI_ERROR: Emoji<'_, '_> = Emoji("✖ ", "x ");

static QUIET_MODE: OnceLock<bool> = OnceLock::new();

/// Initializes the terminal output settings.
/// Should be called once at startup with CLI args.
pub fn init(quiet: bool, color: ColorChoice) {
    QUIET_MODE.set(quiet).ok();

    let no_color = std::env::var("NO_COLOR").is_ok();
    let color_enabled = if no_color {
        // NO_COLOR standard: https://no-color.org/
        false
    } else {
        match color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => console::colors_enabled(),
        }
    };

    if !color_enabled {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
}

fn is_quiet() -> bool {
    *QUIET_MODE.get().unwrap_or(&false)
}

/// Creates a spinner on stderr with the given message.
/// Returns a hidden spinner in quiet mode.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    if is_quiet() {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    let template = "{spinner:.cyan} {msg} {elapsed:.dim}";
    if let Ok(template) = ProgressStyle::default_spinner().template(template) {
        spinner.set_style(template);
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Prints a success message with a green checkmark to stderr.
pub fn success(message: impl Display) {
    if is_quiet() {
        return;
    }
    eprintln!("{} {}", EMOJI_SUCCESS, style(message).green());
}

/// Prints a warning message with a yellow warning sign to stderr.
pub fn warning(message: impl Display) {
    eprintln!("{} {}", EMOJI_WARNING, style(message).yellow());
}

/// Prints an error message with a red X to stderr.
pub fn error(message: impl Display) {
    eprintln!("  {} {}", EMOJI_ERROR, style(message).red());
}

/// Prints an error followed by its structured details, one per line.
pub fn error_with_details(err: &Error) {
    error(err);
    for (key, value) in err.details() {
        if key == "kind" {
            continue;
        }
        eprintln!("      {} {}", style(format!("{key}:")).dim(), value);
    }
}

/// Prints a hint/next step message in dim style to stderr.
pub fn hint(message: impl Display) {
    if is_quiet() {
        return;
    }
    eprintln!("  {}", style(message).dim());
}

/// Prints a secondary info line (indented, dim) to stderr.
pub fn info(message: impl Display) {
    if is_quiet() {
        return;
    }
    eprintln!("  {}", style(message).dim());
}

/// Returns a bold styled value for inline use.
pub fn bold(value: impl Display) -> impl Display {
    style(value).bold()
}

/// Prints command output to stdout. Never suppressed by quiet mode.
pub fn output(message: impl Display) {
    println!("{}", message);
}

/// Warns if no API key is configured.
/// Should be called before polling a remote endpoint.
pub fn warn_if_no_api_key(api_key: Option<&str>) {
    if api_key.is_none() && !is_quiet() {
        warning("TPOLL_API_KEY is not set. Requests will be sent without credentials.");
        hint("Set TPOLL_API_KEY, use --api-key, or add api_key to tpoll.toml.");
    }
}
