//! Segment-boundary package rewriting, shared by class-file constant pool
//! entries, manifest values, and service descriptor names/contents.

use crate::rule::RelocationRule;

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Rewrite every whole-segment occurrence of `from` with `to` in `text`.
/// A match only counts if the bytes immediately before and after it are not
/// identifier characters, so `com/foo` matches inside `com/foo/Bar` and
/// `Lcom/foo/Bar;` but not inside `com/foobar`.
fn rewrite_segment(text: &str, from: &str, to: &str) -> (String, bool) {
    if from.is_empty() || from == to {
        return (text.to_string(), false);
    }
    let bytes = text.as_bytes();
    let pat = from.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(pat) {
            let left_ok = i == 0 || !is_ident_byte(bytes[i - 1]);
            let right = i + pat.len();
            let right_ok = right == bytes.len() || !is_ident_byte(bytes[right]);
            if left_ok && right_ok {
                out.push_str(to);
                changed = true;
                i = right;
                continue;
            }
        }
        // Safe: we only ever step past ASCII boundaries found above, and
        // otherwise copy one UTF-8 char at a time.
        let ch = text[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    (out, changed)
}

/// Apply every rule's slash form to `text`. Used for class internal names
/// and descriptors, where names are always `/`-separated.
pub fn rewrite_slash(text: &str, rules: &[RelocationRule]) -> (String, bool) {
    let mut current = text.to_string();
    let mut any = false;
    for rule in rules {
        let (next, changed) = rewrite_segment(&current, &rule.from, &rule.to);
        current = next;
        any |= changed;
    }
    (current, any)
}

/// Apply every rule's slash and dot forms to `text`. Used for manifest
/// values, service descriptor file names and contents, and other textual
/// resources where either form may appear.
pub fn rewrite_slash_and_dot(text: &str, rules: &[RelocationRule]) -> (String, bool) {
    let mut current = text.to_string();
    let mut any = false;
    for rule in rules {
        let (next, changed) = rewrite_segment(&current, &rule.from, &rule.to);
        current = next;
        any |= changed;
        let (next, changed) = rewrite_segment(&current, &rule.from_dot(), &rule.to_dot());
        current = next;
        any |= changed;
    }
    (current, any)
}
