//! Variable expansion and reverse substitution.
//!
//! Placeholders use `${NAME}` syntax. `%NAME%` is reserved for OS-native
//! runtime expansion and always passes through untouched.

use std::collections::HashMap;

/// Expand every `${NAME}` placeholder in `input` against `variables`.
/// Unknown names expand to the empty string. Expansion is a single pass;
/// nested references are handled by the fixed-point loop at load time.
pub fn expand(input: &str, variables: &HashMap<String, String>) -> String {
    expand_inner(input, variables, false)
}

/// Like [`expand`], but leaves unknown placeholders in place. The load-time
/// fixed-point loop needs them preserved so it can report what never
/// resolved.
pub fn expand_keeping_unknown(input: &str, variables: &HashMap<String, String>) -> String {
    expand_inner(input, variables, true)
}

fn expand_inner(input: &str, variables: &HashMap<String, String>, keep_unknown: bool) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match variables.get(name) {
                    Some(value) => result.push_str(value),
                    None if keep_unknown => {
                        result.push_str(&rest[start..start + 2 + end + 1]);
                    }
                    None => {}
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated placeholder, keep it literally
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    result
}

/// True if `input` still contains an unexpanded `${...}` placeholder.
pub fn has_placeholder(input: &str) -> bool {
    input.contains("${")
}

/// Replace every case-insensitive occurrence of `needle` in `input` with
/// `replacement`. Case folding is ASCII-only, which keeps byte offsets
/// aligned between the folded and original strings.
pub fn replace_all_nocase(input: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return input.to_string();
    }

    let folded_input: String = input.chars().map(|c| c.to_ascii_lowercase()).collect();
    let folded_needle: String = needle.chars().map(|c| c.to_ascii_lowercase()).collect();

    let mut result = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(found) = folded_input[pos..].find(&folded_needle) {
        let at = pos + found;
        result.push_str(&input[pos..at]);
        result.push_str(replacement);
        pos = at + needle.len();
    }

    result.push_str(&input[pos..]);
    result
}
