//! Extractive fallback: the first few substantial sentences, verbatim.

/// Split on `.`, `!` and `?`, keeping the terminator with its sentence
pub(crate) fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = end;
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

/// Join up to `count` sentences longer than `min_len` characters
pub(crate) fn extractive_summary(text: &str, count: usize, min_len: usize) -> String {
    sentences(text)
        .into_iter()
        .filter(|sentence| sentence.chars().count() > min_len)
        .take(count)
        .collect::<Vec<_>>()
        .join(" ")
}
