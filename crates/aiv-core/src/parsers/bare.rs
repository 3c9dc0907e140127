//! Last-resort parser: the whole payload is one hash token.

use super::{clean_filename, content_lines, entry, ParseContext, ParseError, ParsedChecksumEntry};

/// The first token is the hash. A filename may follow on the same line or on
/// the next one; without it the hash applies to the default filename.
pub(super) fn parse(
    text: &str,
    ctx: &ParseContext<'_>,
) -> Result<Vec<ParsedChecksumEntry>, ParseError> {
    let mut lines = content_lines(text);
    let first = lines.next().ok_or(ParseError::Empty)?;

    let (token, same_line) = match first.split_once(char::is_whitespace) {
        Some((t, rest)) => (t, clean_filename(rest)),
        None => (first, ""),
    };

    let filename = if !same_line.is_empty() {
        same_line
    } else {
        lines
            .next()
            .and_then(|l| l.split_whitespace().next())
            .map(clean_filename)
            .filter(|f| !f.is_empty())
            .unwrap_or(ctx.default_filename)
    };

    let e = entry(filename, token, ctx.algorithm_hint)?;
    Ok(vec![e])
}
