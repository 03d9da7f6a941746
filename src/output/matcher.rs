//! Output boundary matcher
//!
//! Decides whether the text accumulated for the current command is complete.
//! Inside the buffer the prompt only counts when it occupies a whole line
//! (start of line, exact token, nothing but whitespace after it), so
//! prompt-like text inside data output never ends a command early. At the
//! very end of the buffer the token also counts after unterminated text,
//! because `echo`, `output` and `printf` leave the prompt on the same line as
//! their output.

use regex::Regex;

use crate::error::Result;
use crate::types::options::DebuggerOptions;

/// Classification of an output buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Boundary {
    /// No boundary yet; keep reading
    Incomplete,
    /// Prompt found; `output` is the text before it
    CompleteOk {
        /// Text preceding the prompt line
        output: String,
        /// Bytes of the buffer up to and including the prompt line
        consumed: usize,
    },
    /// Prompt found and an error pattern matched the text before it
    CompleteError {
        /// Text preceding the prompt line
        output: String,
        /// Bytes of the buffer up to and including the prompt line
        consumed: usize,
    },
    /// A pager prompt ends the buffer; answer it and strip `start..end`
    PagerPrompt {
        /// Byte offset where the pager prompt starts
        start: usize,
        /// Byte offset where it ends
        end: usize,
    },
    /// End of stream reached without a prompt
    ProcessExited {
        /// Everything that was read
        output: String,
    },
}

impl Boundary {
    /// Whether the command's output is finished (either classification)
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::CompleteOk { .. } | Self::CompleteError { .. })
    }
}

/// Ordered set of prompt, pager, and error patterns
#[derive(Debug, Clone)]
pub struct BoundaryMatcher {
    prompt: String,
    errors: Vec<Regex>,
    pager: Option<Regex>,
}

impl BoundaryMatcher {
    /// Compile a matcher
    ///
    /// Error patterns are compiled in multi-line mode so `^`/`$` anchor to
    /// line boundaries.
    ///
    /// # Errors
    /// Returns `InvalidPattern` if any regex fails to compile
    pub fn new(
        prompt: impl Into<String>,
        error_patterns: &[String],
        pager_pattern: Option<&str>,
    ) -> Result<Self> {
        let errors = error_patterns
            .iter()
            .map(|p| Regex::new(&format!("(?m){p}")))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let pager = pager_pattern.map(Regex::new).transpose()?;
        Ok(Self {
            prompt: prompt.into().trim().to_string(),
            errors,
            pager,
        })
    }

    /// Compile the matcher configured in `options`
    ///
    /// # Errors
    /// Returns `InvalidPattern` if any regex fails to compile
    pub fn from_options(options: &DebuggerOptions) -> Result<Self> {
        Self::new(
            options.prompt.as_str(),
            &options.error_patterns,
            options.pager_pattern.as_deref(),
        )
    }

    /// Prompt token
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Classify `buffer`; `eof` tells whether the stream has ended
    #[must_use]
    pub fn classify(&self, buffer: &str, eof: bool) -> Boundary {
        if let Some((start, consumed)) = self.find_prompt(buffer) {
            let output = trim_output(&buffer[..start]).to_string();
            if self.is_error(&output) {
                return Boundary::CompleteError { output, consumed };
            }
            return Boundary::CompleteOk { output, consumed };
        }

        if let Some((start, end)) = self.find_pager(buffer) {
            return Boundary::PagerPrompt { start, end };
        }

        if eof {
            return Boundary::ProcessExited {
                output: trim_output(buffer).to_string(),
            };
        }

        Boundary::Incomplete
    }

    /// Whether any error pattern matches `text`
    #[must_use]
    pub fn is_error(&self, text: &str) -> bool {
        self.errors.iter().any(|re| re.is_match(text))
    }

    /// Locate the prompt: the first line consisting solely of the token, or
    /// else the token ending the buffer
    ///
    /// Returns `(prompt_start, end)` where `end` includes the line's newline
    /// when there is one.
    fn find_prompt(&self, buffer: &str) -> Option<(usize, usize)> {
        self.find_prompt_line(buffer)
            .or_else(|| self.find_trailing_prompt(buffer))
    }

    fn find_prompt_line(&self, buffer: &str) -> Option<(usize, usize)> {
        let mut line_start = 0;
        loop {
            let newline = buffer[line_start..].find('\n').map(|i| line_start + i);
            let line_end = newline.unwrap_or(buffer.len());
            let line = buffer[line_start..line_end].trim_end_matches([' ', '\t', '\r']);
            if line == self.prompt {
                return Some((line_start, newline.map_or(buffer.len(), |i| i + 1)));
            }
            line_start = newline? + 1;
        }
    }

    /// Prompt printed right after output that has no trailing newline
    fn find_trailing_prompt(&self, buffer: &str) -> Option<(usize, usize)> {
        if self.prompt.is_empty() {
            return None;
        }
        let trimmed = buffer.trim_end();
        let start = trimmed.strip_suffix(self.prompt.as_str())?.len();
        Some((start, buffer.len()))
    }

    /// A pager prompt only counts when nothing but whitespace follows it
    fn find_pager(&self, buffer: &str) -> Option<(usize, usize)> {
        let pager = self.pager.as_ref()?;
        let found = pager.find_iter(buffer).last()?;
        if buffer[found.end()..].trim().is_empty() {
            Some((found.start(), buffer.len()))
        } else {
            None
        }
    }
}

fn trim_output(text: &str) -> &str {
    text.trim_end_matches(['\n', '\r'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::options::{DEFAULT_ERROR_PATTERNS, DEFAULT_PAGER_PATTERN};

    fn gdb() -> BoundaryMatcher {
        let errors: Vec<String> = DEFAULT_ERROR_PATTERNS.iter().map(|s| (*s).to_string()).collect();
        BoundaryMatcher::new("(gdb)", &errors, Some(DEFAULT_PAGER_PATTERN)).unwrap()
    }

    #[test]
    fn trailing_prompt_completes() {
        let m = gdb();
        assert_eq!(
            m.classify("$1 = 42\n(gdb) ", false),
            Boundary::CompleteOk {
                output: "$1 = 42".to_string(),
                consumed: 14,
            }
        );
    }

    #[test]
    fn prompt_alone_yields_empty_output() {
        let m = gdb();
        assert_eq!(
            m.classify("(gdb) ", false),
            Boundary::CompleteOk {
                output: String::new(),
                consumed: 6,
            }
        );
    }

    #[test]
    fn partial_prompt_is_incomplete() {
        let m = gdb();
        assert_eq!(m.classify("$1 = 42\n(gd", false), Boundary::Incomplete);
        assert_eq!(m.classify("", false), Boundary::Incomplete);
    }

    #[test]
    fn chunking_does_not_change_classification() {
        let m = gdb();
        let full = "Breakpoint 1 at 0x1139: file t.c, line 3.\n(gdb) ";
        let mut buffer = String::new();
        let mut results = Vec::new();
        for ch in full.chars() {
            buffer.push(ch);
            results.push(m.classify(&buffer, false));
        }
        let first_complete = results.iter().position(Boundary::is_complete).unwrap();
        // "(gdb)" completes as soon as the token is whole
        assert_eq!(first_complete, full.len() - 2);
        assert!(results[..first_complete].iter().all(|b| *b == Boundary::Incomplete));
    }

    #[test]
    fn prompt_inside_data_is_not_a_boundary() {
        let m = gdb();
        let data = "$1 = \"(gdb) \"\nprompt was (gdb) here\n";
        assert_eq!(m.classify(data, false), Boundary::Incomplete);
    }

    #[test]
    fn prompt_after_unterminated_output_completes() {
        let m = gdb();
        assert_eq!(
            m.classify("foo(gdb) ", false),
            Boundary::CompleteOk {
                output: "foo".to_string(),
                consumed: 9,
            }
        );
        assert_eq!(
            m.classify("$1 = 5\n42(gdb) ", false),
            Boundary::CompleteOk {
                output: "$1 = 5\n42".to_string(),
                consumed: 15,
            }
        );
    }

    #[test]
    fn unterminated_output_chunking_is_stable() {
        let m = gdb();
        let full = "hello from printf(gdb) ";
        let mut buffer = String::new();
        let mut first_complete = None;
        for (i, ch) in full.chars().enumerate() {
            buffer.push(ch);
            if first_complete.is_none() && m.classify(&buffer, false).is_complete() {
                first_complete = Some(i);
            }
        }
        assert_eq!(first_complete, Some(full.len() - 2));
        match m.classify(full, false) {
            Boundary::CompleteOk { output, consumed } => {
                assert_eq!(output, "hello from printf");
                assert_eq!(consumed, full.len());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mid_line_prompt_inside_buffer_is_not_a_boundary() {
        let m = gdb();
        assert_eq!(m.classify("foo(gdb) bar\n", false), Boundary::Incomplete);
    }

    #[test]
    fn mi_prompt_line_splits_leftover() {
        let m = gdb();
        let buffer = "^done\n(gdb) \n*stopped,reason=\"breakpoint-hit\"\n";
        match m.classify(buffer, false) {
            Boundary::CompleteOk { output, consumed } => {
                assert_eq!(output, "^done");
                assert_eq!(&buffer[consumed..], "*stopped,reason=\"breakpoint-hit\"\n");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn error_pattern_marks_error() {
        let m = gdb();
        let result = m.classify("No symbol \"argc\" in current context.\n(gdb) ", false);
        assert!(matches!(result, Boundary::CompleteError { ref output, .. } if output.starts_with("No symbol")));
    }

    #[test]
    fn error_pattern_is_line_anchored() {
        let m = gdb();
        let result = m.classify("$1 = \"No symbol here\"\n(gdb) ", false);
        assert!(matches!(result, Boundary::CompleteOk { .. }));
    }

    #[test]
    fn pager_prompt_detected_at_tail() {
        let m = gdb();
        let buffer = "#0 main\n--Type <RET> for more, q to quit, c to continue without paging--";
        assert_eq!(
            m.classify(buffer, false),
            Boundary::PagerPrompt {
                start: 8,
                end: buffer.len(),
            }
        );
    }

    #[test]
    fn eof_without_prompt_is_exit() {
        let m = gdb();
        assert_eq!(
            m.classify("fatal: giving up\n", true),
            Boundary::ProcessExited {
                output: "fatal: giving up".to_string(),
            }
        );
    }

    #[test]
    fn prompt_wins_over_eof() {
        let m = gdb();
        assert!(m.classify("bye\n(gdb) ", true).is_complete());
    }

    #[test]
    fn custom_prompt_token() {
        let m = BoundaryMatcher::new("(lldb)", &[], None).unwrap();
        assert!(m.classify("frame #0\n(lldb) ", false).is_complete());
        assert_eq!(m.classify("frame #0\n(gdb) ", false), Boundary::Incomplete);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(BoundaryMatcher::new("(gdb)", &["([".to_string()], None).is_err());
    }
}
