//! Pattern tables for structural text matching
//!
//! Every regular expression the crate relies on lives here, so the
//! patterns can be tested independently of the control flow that uses
//! them: token-density heuristics, tool-result and file-read recognition,
//! tool-call tag scanning, and the JSON cleanup passes of the parser.

use std::sync::LazyLock;

use regex::Regex;

// ---------------------------------------------------------------------------
// Token density heuristics
// ---------------------------------------------------------------------------

/// Opening or closing XML-ish tags as emitted by the tool-call protocol
pub static TOOL_MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z_][A-Za-z0-9_\-]*>").unwrap());

/// Code fences
pub static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```").unwrap());

/// Common programming keywords
///
/// A keyword only counts once its terminator has been seen, so appending
/// text can never retract an earlier match.
pub static CODE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:fn|function|const|let|var|class|def|import|export|return|public|private|impl|struct|interface|async|await)[\s(<{:;]",
    )
    .unwrap()
});

/// Path-like tokens and file names with a known extension
pub static TECHNICAL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:[A-Za-z0-9_.\-]+/)+[A-Za-z0-9_.\-]+|\b[A-Za-z0-9_\-]+\.(?:rs|ts|tsx|js|jsx|py|json|md|toml|ya?ml|html|css|go|java|c|cpp|h|sh)[^A-Za-z0-9_]",
    )
    .unwrap()
});

// ---------------------------------------------------------------------------
// Tool results and file reads
// ---------------------------------------------------------------------------

/// Status line of a formatted tool result: `✓ name(...)`, `✗ name(...)`,
/// `[name for '...'] Result:` or a `<tool_result>` block
pub static TOOL_RESULT_STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:[✓✗]\s*[A-Za-z_][A-Za-z0-9_]*.*|\[[A-Za-z_][A-Za-z0-9_]*(?: for [^\]]*)?\] Result:.*|<tool_result[^>]*>.*)$")
        .unwrap()
});

/// Success markers inside tool output
pub static SUCCESS_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^.*(?:✓|\bsuccess(?:fully)?\b|\bcompleted\b).*$").unwrap());

/// Error markers inside tool output
pub static ERROR_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^.*(?:✗|\berror\b|\bfailed\b|\bexception\b|\bpanicked\b).*$").unwrap()
});

/// File read results; each alternative captures the path as `path`
pub static FILE_READ: [LazyLock<Regex>; 3] = [
    LazyLock::new(|| {
        Regex::new(r"^\s*✓\s*(?:read_file|view_file|cat)\((?P<path>[^)\n]+)\)").unwrap()
    }),
    LazyLock::new(|| {
        Regex::new(r#"^\s*\[(?:read_file|view_file) for ['"`](?P<path>[^'"`\n]+)['"`]\] Result:"#)
            .unwrap()
    }),
    LazyLock::new(|| {
        Regex::new(r#"<file_content\s+path=["'](?P<path>[^"'\n]+)["']\s*>"#).unwrap()
    }),
];

/// Extract the file path from content that is a whole-file read result
pub fn file_read_path(content: &str) -> Option<&str> {
    FILE_READ.iter().find_map(|pattern| {
        pattern
            .captures(content)
            .and_then(|caps| caps.name("path"))
            .map(|m| m.as_str().trim())
    })
}

/// Status line of a tool result, if the content is one
pub fn tool_result_status(content: &str) -> Option<&str> {
    let first_line = content.lines().find(|line| !line.trim().is_empty())?;
    TOOL_RESULT_STATUS
        .find(first_line)
        .map(|m| m.as_str().trim_end())
}

// ---------------------------------------------------------------------------
// Tool-call tags
// ---------------------------------------------------------------------------

/// An opening tag with no attributes
pub static OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z_][A-Za-z0-9_\-]*)>").unwrap());

/// Anything resembling a tag pair, attributes and mismatched names included
pub static LOOSE_TAG_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<[A-Za-z_][A-Za-z0-9_\-]*(?:\s[^<>]*)?>.*?</\s*[A-Za-z_][A-Za-z0-9_\-]*\s*>")
        .unwrap()
});

/// Runs of three or more newlines
pub static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// A same-name `<name>inner</name>` pair located in a larger string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPair<'a> {
    pub name: &'a str,
    pub inner: &'a str,
    /// Byte offset of the opening `<`
    pub start: usize,
    /// Byte offset just past the closing `>`
    pub end: usize,
}

/// Scan for same-name tag pairs, left to right, non-greedy
///
/// Each opening tag is matched with the first following closing tag of the
/// same name; scanning resumes after that closing tag. Nested same-name
/// tags are not supported.
pub fn tag_pairs(text: &str) -> Vec<TagPair<'_>> {
    let mut pairs = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let Some(caps) = OPEN_TAG.captures_at(text, pos) else {
            break;
        };
        let (Some(open), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };

        let closing = format!("</{}>", name.as_str());
        match text[open.end()..].find(&closing) {
            Some(offset) => {
                let inner_end = open.end() + offset;
                let end = inner_end + closing.len();
                pairs.push(TagPair {
                    name: name.as_str(),
                    inner: &text[open.end()..inner_end],
                    start: open.start(),
                    end,
                });
                pos = end;
            }
            None => pos = open.end(),
        }
    }

    pairs
}

// ---------------------------------------------------------------------------
// JSON cleanup passes
// ---------------------------------------------------------------------------

/// Object keys without quotes: `{ key: ` or `, key:`
pub static BARE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:").unwrap());

/// A comma directly before a closing brace or bracket
pub static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").unwrap());

/// Any whitespace run
pub static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_pairs_basic() {
        let text = "before <read_file>{\"path\":\"a\"}</read_file> after";
        let pairs = tag_pairs(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].name, "read_file");
        assert_eq!(pairs[0].inner, "{\"path\":\"a\"}");
        assert_eq!(&text[pairs[0].start..pairs[0].end], "<read_file>{\"path\":\"a\"}</read_file>");
    }

    #[test]
    fn test_tag_pairs_outer_consumes_inner_params() {
        let text = "<write_file><path>a.txt</path><content>hi</content></write_file>";
        let pairs = tag_pairs(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].name, "write_file");

        let params = tag_pairs(pairs[0].inner);
        let names: Vec<_> = params.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["path", "content"]);
    }

    #[test]
    fn test_tag_pairs_skips_unclosed() {
        let pairs = tag_pairs("<a> dangling <b>x</b>");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].name, "b");
    }

    #[test]
    fn test_loose_tag_pair() {
        assert!(LOOSE_TAG_PAIR.is_match("<write_file path=\"x\">body</write_file>"));
        assert!(LOOSE_TAG_PAIR.is_match("<write_file>body</read_file>"));
        assert!(!LOOSE_TAG_PAIR.is_match("a < b and c > d"));
    }

    #[test]
    fn test_file_read_path_variants() {
        assert_eq!(file_read_path("✓ read_file(src/main.rs)\nfn main() {}"), Some("src/main.rs"));
        assert_eq!(
            file_read_path("[read_file for 'lib/a.ts'] Result:\nexport {}"),
            Some("lib/a.ts")
        );
        assert_eq!(
            file_read_path("<file_content path=\"docs/x.md\">\n# x\n</file_content>"),
            Some("docs/x.md")
        );
        assert_eq!(file_read_path("just some prose"), None);
    }

    #[test]
    fn test_tool_result_status() {
        assert_eq!(
            tool_result_status("✗ run_command(cargo test): exit 101\nmore"),
            Some("✗ run_command(cargo test): exit 101")
        );
        assert_eq!(tool_result_status("plain reply"), None);
    }

    #[test]
    fn test_json_cleanup_patterns() {
        assert_eq!(BARE_KEY.replace_all("{a: 1, b: 2}", "$1\"$2\":"), "{\"a\": 1, \"b\": 2}");
        assert_eq!(TRAILING_COMMA.replace_all("[1, 2, ]", "$1"), "[1, 2]");
    }
}
