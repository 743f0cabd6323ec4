//! Comment size governor
//!
//! GitHub rejects comment bodies above 65,535 characters. Only the comment
//! path goes through here; check runs and the results file keep the full text.

/// Maximum comment body length accepted by GitHub
pub const MAX_COMMENT_CHARS: usize = 65_535;

/// Prepended to a truncated report
pub const TRUNCATION_CALLOUT: &str = "> [!IMPORTANT]\n\
> The coverage report exceeded the comment size limit and has been truncated.\n\
> The full report is available through the `coverage-results-file-path` output.\n\n";

/// Appended where the report was cut
pub const TRUNCATION_MARKER: &str = "\n\n_... report truncated_";

/// Output of [`limit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limited {
    pub text: String,
    pub truncated: bool,
}

/// Cap `text` at `max_chars` characters, flagging when it had to cut
pub fn limit(text: &str, max_chars: usize) -> Limited {
    if text.chars().count() <= max_chars {
        return Limited {
            text: text.to_string(),
            truncated: false,
        };
    }

    let reserve = TRUNCATION_CALLOUT.chars().count() + TRUNCATION_MARKER.chars().count();
    let keep = max_chars.saturating_sub(reserve);

    let mut limited = String::with_capacity(max_chars);
    limited.push_str(TRUNCATION_CALLOUT);
    limited.extend(text.chars().take(keep));
    limited.push_str(TRUNCATION_MARKER);

    // Limits smaller than the callout itself can only be met by cutting it
    if max_chars < reserve {
        limited = limited.chars().take(max_chars).collect();
    }

    Limited {
        text: limited,
        truncated: true,
    }
}
