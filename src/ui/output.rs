use crate::ui::Icons;
use owo_colors::{OwoColorize, Style};
use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();
static STDOUT_COLOR: OnceLock<bool> = OnceLock::new();
static STDERR_COLOR: OnceLock<bool> = OnceLock::new();

/// `PADDOCK_QUIET=1` silences decorative stdout output
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("PADDOCK_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

/// Role of a piece of console text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Header,
    Success,
    Failure,
    Caution,
    Label,
}

impl Tone {
    /// Errors and warnings are written to stderr, the rest to stdout
    fn on_stderr(self) -> bool {
        matches!(self, Tone::Failure | Tone::Caution)
    }

    fn style(self) -> Style {
        let colored = if self.on_stderr() {
            *STDERR_COLOR.get_or_init(|| console::Term::stderr().is_term())
        } else {
            *STDOUT_COLOR.get_or_init(|| console::Term::stdout().is_term())
        };
        if !colored {
            return Style::new();
        }

        match self {
            Tone::Header => Style::new().red().bold(),
            Tone::Success => Style::new().green().bold(),
            Tone::Failure => Style::new().red().bold(),
            Tone::Caution => Style::new().yellow().bold(),
            Tone::Label => Style::new().white().dimmed(),
        }
    }
}

pub fn header(text: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::FLAG, text.style(Tone::Header.style()));
}

pub fn success(label: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::CHECK, label.style(Tone::Success.style()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(Tone::Failure.style()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(Tone::Caution.style()));
}

pub fn info(label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}: {}", Icons::INFO, label.style(Tone::Label.style()), value);
}

pub fn section(title: &str) {
    if is_quiet() {
        return;
    }
    println!();
    println!("━{}━", title.style(Tone::Header.style()));
}

pub fn summary_row(label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    println!("  {} {}", label.style(Tone::Label.style()), value);
}
