// normalize.rs — Canonical form for diff text.
//
// Normalization strips trailing whitespace from every line, joins lines with
// `\n` and always ends with exactly one `\n`. Downstream steps (analysis,
// fingerprinting, applying) only ever see the normalized text.

/// Normalize diff text. Total and idempotent.
///
/// Line splitting follows [`str::lines`]: `\n` and `\r\n` both terminate a
/// line, and a stray `\r` at the end of a line is trailing whitespace anyway.
pub fn normalize_diff(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 1);
    for (idx, line) in text.lines().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(line.trim_end());
    }
    out.push('\n');
    out
}
