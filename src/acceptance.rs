//! Deciding whether a candidate should be treated as Markdown.
//!
//! Drag sources do not always supply a trustworthy name, so the check is a
//! short, ordered series of rules: extension first, then a permissive pass
//! for extension-less names, then a content sniff of the first few hundred
//! bytes. It is a plausibility filter, not a grammar check.

use std::sync::OnceLock;

use regex::RegexSet;

use crate::candidate::{decode_text, CandidateFile, ReadError};

/// Number of leading bytes inspected by the content sniff.
pub const SAMPLE_LEN: usize = 500;

const MARKDOWN_EXTENSIONS: [&str; 2] = [".md", ".markdown"];

/// Why a candidate was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    ByExtension,
    NoExtension,
    ContentSniffed,
}

#[derive(Debug, thiserror::Error)]
pub enum AcceptError {
    #[error("{name} does not look like a Markdown file")]
    Unsupported { name: String },
    #[error(transparent)]
    Read(#[from] ReadError),
}

fn markdown_signals() -> &'static RegexSet {
    static SIGNALS: OnceLock<RegexSet> = OnceLock::new();
    SIGNALS.get_or_init(|| {
        RegexSet::new([
            r"(?m)^#{1,6}\s",
            r"(?m)^[-*+]\s",
            r"(?m)^\d+\.\s",
            r"(?m)^```",
            r"(?m)^>",
            r"\[[^\]]*\]\([^)]*\)",
            r"`[^`]+`",
            r"(?m)^\|.*\|",
        ])
        .expect("markdown signal patterns are valid")
    })
}

/// True when the name alone says Markdown.
pub fn has_markdown_extension(name: &str) -> bool {
    let lower = name.to_lowercase();
    MARKDOWN_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// True when any Markdown signal appears in `sample`.
pub fn looks_like_markdown(sample: &str) -> bool {
    markdown_signals().is_match(sample)
}

/// Run the acceptance rules against `file`. Only the sniffing rule reads
/// anything, and then at most `SAMPLE_LEN` bytes.
pub fn accept(file: &CandidateFile) -> Result<Acceptance, AcceptError> {
    if file.name().is_some_and(has_markdown_extension) {
        return Ok(Acceptance::ByExtension);
    }
    if !file.has_extension() {
        return Ok(Acceptance::NoExtension);
    }

    // Extension-less names never get here, so a failed sample read is
    // always reported.
    let sample = decode_text(&file.read_prefix(SAMPLE_LEN)?);

    if looks_like_markdown(&sample) {
        log::debug!("{} accepted by content sniff", file.display_name());
        Ok(Acceptance::ContentSniffed)
    } else {
        Err(AcceptError::Unsupported {
            name: file.display_name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn memory(name: Option<&str>, body: &str) -> CandidateFile {
        CandidateFile::from_bytes(name.map(str::to_string), Arc::from(body.as_bytes()))
    }

    #[test]
    fn test_markdown_extensions_accepted_regardless_of_content() {
        for name in ["a.md", "B.MD", "notes.Markdown", "x.tar.md"] {
            let file = memory(Some(name), "\u{0}\u{1} binary junk");
            assert_eq!(accept(&file).expect(name), Acceptance::ByExtension);
        }
    }

    #[test]
    fn test_extensionless_names_accepted_without_reading() {
        for name in [None, Some(""), Some("README"), Some("Makefile")] {
            let file = memory(name, "plain words");
            assert_eq!(accept(&file).expect("accept"), Acceptance::NoExtension);
        }
        // A path that does not exist is never opened for extension-less names.
        let missing = CandidateFile::from_path("/nonexistent/LICENSE");
        assert_eq!(accept(&missing).expect("accept"), Acceptance::NoExtension);
    }

    #[test]
    fn test_txt_with_heading_is_sniffed() {
        let file = memory(Some("notes.txt"), "intro line\n# Title\nbody");
        assert_eq!(accept(&file).expect("accept"), Acceptance::ContentSniffed);
    }

    #[test]
    fn test_plain_prose_is_rejected() {
        let file = memory(
            Some("notes.txt"),
            "Just some ordinary prose.\nNothing to see here, really.",
        );
        let err = accept(&file).expect_err("reject");
        assert!(matches!(err, AcceptError::Unsupported { ref name } if name == "notes.txt"));
    }

    #[test]
    fn test_png_without_signals_is_rejected() {
        let file = CandidateFile::from_bytes(
            Some("image.png".into()),
            Arc::from(&b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"[..]),
        );
        assert!(matches!(accept(&file), Err(AcceptError::Unsupported { .. })));
    }

    #[test]
    fn test_signal_beyond_sample_is_ignored() {
        let mut body = "word ".repeat(120);
        body.push_str("\n# Late heading\n");
        assert!(body.len() > SAMPLE_LEN);
        let file = memory(Some("long.txt"), &body);
        assert!(accept(&file).is_err());
    }

    #[test]
    fn test_each_signal_pattern() {
        let hits = [
            "## Heading",
            "- item",
            "* item",
            "+ item",
            "12. item",
            "```rust",
            "> quoted",
            "see [docs](https://example.com)",
            "call `run()` now",
            "| a | b |",
        ];
        for sample in hits {
            assert!(looks_like_markdown(sample), "{sample:?} should match");
        }
        let misses = [
            "####### seven hashes",
            "#hashtag",
            "-dash without space",
            "1.5 is a number",
            "a | b",
            "plain text",
        ];
        for sample in misses {
            assert!(!looks_like_markdown(sample), "{sample:?} should not match");
        }
    }

    #[test]
    fn test_sample_read_failure_with_extension_is_error() {
        let missing = CandidateFile::from_path("/nonexistent/dir/notes.txt");
        assert!(matches!(accept(&missing), Err(AcceptError::Read(_))));
    }

    #[test]
    fn test_sniff_reads_real_file() -> anyhow::Result<()> {
        let mut temp = tempfile::Builder::new().suffix(".log").tempfile()?;
        temp.write_all(b"| col | col |\n|-----|-----|\n")?;
        temp.flush()?;
        let file = CandidateFile::from_path(temp.path());
        assert_eq!(accept(&file)?, Acceptance::ContentSniffed);

        let mut plain: NamedTempFile = tempfile::Builder::new().suffix(".log").tempfile()?;
        plain.write_all(b"2024-01-01 started\n2024-01-01 stopped\n")?;
        plain.flush()?;
        assert!(accept(&CandidateFile::from_path(plain.path())).is_err());
        Ok(())
    }

    #[test]
    fn test_file_written_after_acquisition_is_sniffed() -> anyhow::Result<()> {
        let mut temp = tempfile::Builder::new().suffix(".txt").tempfile()?;
        let file = CandidateFile::from_path(temp.path());
        temp.write_all(b"# Written late\n")?;
        temp.flush()?;
        assert_eq!(accept(&file)?, Acceptance::ContentSniffed);
        Ok(())
    }
}
