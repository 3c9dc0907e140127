//! Line-based sums files as written by `sha256sum`, `sha512sum` and BSD `shasum --tag`.

use super::{clean_filename, content_lines, entry, EntryCollector, ParseContext, ParseError};
use crate::algorithm::HashAlgorithm;
use crate::parsers::ParsedChecksumEntry;

/// Parse one entry per content line.
///
/// Accepted shapes:
/// - `<hash>  <file>` and `<hash> *<file>` (text / binary mode)
/// - `SHA256 (<file>) = <hash>` (BSD tag)
/// - `<file>  <hash>` when the first token is not a hash but the last one is
/// - a lone `<hash>`, applied to the default filename
pub(super) fn parse(
    text: &str,
    ctx: &ParseContext<'_>,
) -> Result<Vec<ParsedChecksumEntry>, ParseError> {
    let mut collector = EntryCollector::default();
    for line in content_lines(text) {
        if let Some(result) = parse_bsd_line(line, ctx.algorithm_hint) {
            collector.push(result);
            continue;
        }

        let (first, rest) = match line.split_once(char::is_whitespace) {
            Some((h, r)) => (h, clean_filename(r)),
            None => (line, ""),
        };

        if rest.is_empty() {
            collector.push(entry(ctx.default_filename, first, ctx.algorithm_hint));
            continue;
        }

        match entry(rest, first, ctx.algorithm_hint) {
            Ok(e) => collector.push(Ok(e)),
            Err(err) => {
                // Some publishers write the filename first.
                let reversed = line
                    .rsplit_once(char::is_whitespace)
                    .map(|(name, hash)| (clean_filename(name), hash))
                    .filter(|(name, _)| !name.is_empty())
                    .and_then(|(name, hash)| entry(name, hash, ctx.algorithm_hint).ok());
                match reversed {
                    Some(e) => collector.push(Ok(e)),
                    None => collector.push(Err(err)),
                }
            }
        }
    }
    collector.finish()
}

/// `SHA256 (file name) = hash`. Returns `None` when the line is not in tag form.
fn parse_bsd_line(
    line: &str,
    hint: Option<HashAlgorithm>,
) -> Option<Result<ParsedChecksumEntry, crate::normalize::HashFormatError>> {
    let open = line.find(" (")?;
    let close = line.rfind(") =")?;
    if close <= open {
        return None;
    }
    let tag = HashAlgorithm::from_label(&line[..open])?;
    let filename = clean_filename(&line[open + 2..close]);
    let hash = line[close + 3..].trim();
    Some(entry(filename, hash, Some(tag).or(hint)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA256: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";
    const MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

    fn ctx() -> ParseContext<'static> {
        ParseContext::new("default.AppImage")
    }

    #[test]
    fn two_space_text_mode() {
        let text = format!("{SHA256}  myapp.AppImage\n");
        let entries = parse(&text, &ctx()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].matched_filename, "myapp.AppImage");
        assert_eq!(entries[0].hash, SHA256);
        assert_eq!(entries[0].algorithm, HashAlgorithm::Sha256);
    }

    #[test]
    fn binary_marker_and_extra_whitespace() {
        let text = format!(
            "  {}   *./dist/tool.AppImage  \n\n{MD5} other.bin\n",
            SHA256.to_uppercase()
        );
        let entries = parse(&text, &ctx()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].matched_filename, "dist/tool.AppImage");
        assert_eq!(entries[0].hash, SHA256);
        assert_eq!(entries[1].algorithm, HashAlgorithm::Md5);
    }

    #[test]
    fn bsd_tag_lines() {
        let text = format!("# comment\nSHA256 (Tool 1.0.AppImage) = {SHA256}\nMD5 (x) = {MD5}\n");
        let entries = parse(&text, &ctx()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].matched_filename, "Tool 1.0.AppImage");
        assert_eq!(entries[0].algorithm, HashAlgorithm::Sha256);
    }

    #[test]
    fn filename_first_order() {
        let text = format!("tool.AppImage {SHA256}\n");
        let entries = parse(&text, &ctx()).unwrap();
        assert_eq!(entries[0].matched_filename, "tool.AppImage");
        assert_eq!(entries[0].hash, SHA256);
    }

    #[test]
    fn lone_hash_uses_default_filename() {
        let entries = parse(SHA256, &ctx()).unwrap();
        assert_eq!(entries[0].matched_filename, "default.AppImage");
    }

    #[test]
    fn bad_lines_are_skipped_when_others_parse() {
        let text = format!("zzzz  broken.bin\n{SHA256}  ok.bin\n");
        let entries = parse(&text, &ctx()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].matched_filename, "ok.bin");
    }

    #[test]
    fn all_bad_lines_report_hash_error() {
        let err = parse("zzzz  broken.bin\n", &ctx()).unwrap_err();
        assert!(matches!(err, ParseError::Hash(_)));
    }
}
