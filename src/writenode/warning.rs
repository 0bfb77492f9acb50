//! User-facing warning text shown on write nodes.

use crate::constants::{WARNING_REASON_WRAP_WIDTH, WARNING_WRAP_WIDTH};

const REASON_INDENT: &str = "   ";

/// Wraps `text` on spaces into lines of roughly `width` characters.
///
/// A line is closed as soon as it reaches `width`; words at least `width`
/// long get a line of their own.
#[must_use]
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split(' ') {
        if word.chars().count() >= width {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            lines.push(word.to_string());
            continue;
        }

        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
        if line.chars().count() >= width {
            lines.push(std::mem::take(&mut line));
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn paragraph(text: &str) -> String {
    wrap_text(text, WARNING_WRAP_WIDTH).join("\n")
}

/// Warning for a path that could not be computed.
///
/// `has_cached_path` tells whether a previous path is still usable.
#[must_use]
pub fn frozen_path_warning(reason: &str, has_cached_path: bool) -> String {
    let mut text = paragraph(
        "The render path is currently frozen because a valid path could not be \
         determined! This was due to the following problem:",
    );
    text.push_str("\n\n");
    let reason_lines: Vec<String> = wrap_text(reason, WARNING_REASON_WRAP_WIDTH)
        .into_iter()
        .map(|line| format!("{REASON_INDENT}{line}"))
        .collect();
    text.push_str(&reason_lines.join("\n"));

    if has_cached_path {
        text.push_str("\n\n");
        text.push_str(&paragraph(
            "You can still render to the frozen path but you won't be able to publish this node!",
        ));
    }
    text
}

/// Warning for a locked path.
#[must_use]
pub fn locked_path_warning() -> String {
    let mut text = paragraph(
        "The path does not match the current work area. You can still render but you \
         will not be able to publish this node.",
    );
    text.push_str("\n\n");
    text.push_str(&paragraph(
        "The path will be automatically reset next time you version-up, publish or click \
         'Reset Path'.",
    ));
    text
}

/// Warning shown in proxy mode when proxy and full-res paths coincide.
#[must_use]
pub fn proxy_collision_warning() -> String {
    paragraph(
        "The full & proxy resolution render paths are currently the same. Rendering in \
         proxy mode will overwrite any previously rendered full-res frames!",
    )
}
