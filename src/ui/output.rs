//! Run narrative: banners, sections and one line per step

use super::context::UiContext;
use console::style;

/// Kind of a narrative step, deciding its marker and color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Info,
    Ok,
    Warn,
    Skip,
}

impl Step {
    fn marker(self) -> String {
        match self {
            Step::Info => style("[..]").dim().to_string(),
            Step::Ok => style("[OK]").green().to_string(),
            Step::Warn => style("[WARN]").yellow().to_string(),
            Step::Skip => style("[SKIP]").dim().to_string(),
        }
    }
}

fn with_detail(message: &str, detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("{} ({})", message, detail),
        None => message.to_string(),
    }
}

/// Line printed for a step when there is no terminal
fn plain_line(step: Step, message: &str, detail: Option<&str>) -> String {
    format!("  {} {}", step.marker(), with_detail(message, detail))
}

fn step(ctx: &UiContext, kind: Step, message: &str, detail: Option<&str>) {
    if !ctx.use_fancy_output() {
        println!("{}", plain_line(kind, message, detail));
        return;
    }

    let detail = detail.map(|d| style(d).dim().to_string());
    let text = with_detail(message, detail.as_deref());
    let _ = match kind {
        Step::Info => cliclack::log::step(text),
        Step::Ok => cliclack::log::success(text),
        Step::Warn => cliclack::log::warning(text),
        Step::Skip => cliclack::log::remark(style(text).dim()),
    };
}

/// Banner opening a command
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).cyan().bold()).ok();
    } else {
        println!("{}", style(title).cyan().bold());
    }
}

/// Closing line of a successful command
pub fn outro_success(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::outro(style(message).green().bold()).ok();
    } else {
        println!("{} {}", Step::Ok.marker(), message);
    }
}

/// Header for a group of steps (buildable, binary-only)
pub fn section(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::info(style(title).bold()).ok();
    } else {
        println!("{}", style(title).bold());
    }
}

pub fn step_info(ctx: &UiContext, message: &str) {
    step(ctx, Step::Info, message, None);
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    step(ctx, Step::Ok, message, None);
}

pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    step(ctx, Step::Ok, message, Some(detail));
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    step(ctx, Step::Warn, message, None);
}

pub fn step_skip(ctx: &UiContext, message: &str) {
    step(ctx, Step::Skip, message, None);
}
