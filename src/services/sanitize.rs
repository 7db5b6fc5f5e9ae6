// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Free-text input sanitizer.
//!
//! Defense in depth only. Queries are always built from typed predicates and
//! sent as parameters, never by string interpolation.

use regex::Regex;
use std::sync::LazyLock;

/// Default limits applied to discovery inputs.
pub const MAX_LOCATION_LEN: usize = 100;
pub const MAX_CATEGORY_LEN: usize = 50;
pub const MAX_SEARCH_LEN: usize = 100;

static FORBIDDEN_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"`;\\<>]"#).expect("static regex"));

static COMMENT_SEQUENCES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--|/\*|\*/").expect("static regex"));

static DENYLIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(select|insert|update|delete|drop|union|alter|create|truncate|exec|execute|script|javascript|onerror|onload)\b",
    )
    .expect("static regex")
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Strip SQL/XSS-significant characters and keywords, then truncate to
/// `max_len` characters.
pub fn sanitize_input(raw: &str, max_len: usize) -> String {
    let mut s = raw.to_string();

    // Removing one sequence can join its neighbours into another.
    loop {
        let next = DENYLIST.replace_all(&s, " ");
        let next = FORBIDDEN_CHARS.replace_all(&next, "");
        let next = COMMENT_SEQUENCES.replace_all(&next, "").into_owned();
        if next == s {
            break;
        }
        s = next;
    }

    let collapsed = WHITESPACE.replace_all(s.trim(), " ");
    collapsed.trim().chars().take(max_len).collect::<String>().trim_end().to_string()
}

/// Sanitize an optional input; absent or blank results become `None`.
pub fn sanitize_opt(raw: Option<&str>, max_len: usize) -> Option<String> {
    raw.map(|r| sanitize_input(r, max_len))
        .filter(|s| !s.is_empty())
}
