//! Read-time text cleanup.
//!
//! Some document loaders insert spurious whitespace between adjacent CJK
//! characters. The cleanup runs on every served passage, not only at
//! ingestion, so historical data self-heals at read time.

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// Removes whitespace runs that sit between two CJK characters, leaving
/// all other whitespace untouched. Idempotent: normalizing an already
/// normalized string is a no-op.
#[must_use]
pub fn normalize_cjk_spacing(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            let mut j = i;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            let follows_cjk = out.chars().last().is_some_and(is_cjk);
            let precedes_cjk = chars.get(j).copied().is_some_and(is_cjk);
            if !(follows_cjk && precedes_cjk) {
                out.extend(&chars[i..j]);
            }
            i = j;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}
