//! Incremental assembly of a streamed completion.
//!
//! Some backends leak chat-template control tokens into the content deltas.
//! [`StreamAccumulator`] strips them from every fragment as it arrives and
//! once more over the whole buffer at [`StreamAccumulator::finalize`], which
//! catches a token that was split across two fragments.

/// Literal substrings treated as stream noise.
pub const ARTIFACT_PATTERNS: &[&str] = &["<s>", "<|im_start|>", "<|im_end|>", "<|OUT|>"];

/// Remove every artifact pattern from `text`.
///
/// Repeats until no pattern remains, so removing one token can never leave
/// another one behind (`"<<s>s>"` becomes `""`). The result is therefore a
/// fixed point: `strip_artifacts(&strip_artifacts(x)) == strip_artifacts(x)`.
pub fn strip_artifacts(text: &str) -> String {
    let mut out = text.to_string();
    loop {
        let before = out.len();
        for pattern in ARTIFACT_PATTERNS {
            if out.contains(pattern) {
                out = out.replace(pattern, "");
            }
        }
        if out.len() == before {
            return out;
        }
    }
}

/// Running concatenation of cleaned fragments for one response.
///
/// Append-only: a previously returned snapshot is always a prefix of every
/// later one, which lets a terminal print only the new suffix.
#[derive(Debug, Clone, Default)]
pub struct StreamAccumulator {
    buffer: String,
    fragments: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clean `fragment`, append it, and return the full buffer so far.
    ///
    /// An empty fragment (or one made only of artifacts) leaves the buffer
    /// untouched.
    pub fn ingest(&mut self, fragment: &str) -> &str {
        if !fragment.is_empty() {
            let cleaned = strip_artifacts(fragment);
            self.buffer.push_str(&cleaned);
            self.fragments += 1;
        }
        &self.buffer
    }

    /// Current buffer without the final cleanup pass.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Number of non-empty fragments ingested.
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Strip artifacts over the whole buffer and trim surrounding whitespace.
    ///
    /// Does not consume or mutate the accumulator; calling it twice without
    /// an intervening `ingest` yields the same string.
    pub fn finalize(&self) -> String {
        strip_artifacts(&self.buffer).trim().to_string()
    }
}

/// Run `fragments` through a fresh accumulator and return the finalized text.
pub fn accumulate<I, S>(fragments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut acc = StreamAccumulator::new();
    for fragment in fragments {
        acc.ingest(fragment.as_ref());
    }
    acc.finalize()
}
