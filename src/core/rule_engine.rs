// batchreplace - core/rule_engine.rs
//
// Pure text transformer: applies an ordered list of enabled literal
// find/replace rules to a string, left to right, non-overlapping, with
// optional case-folding and whole-word boundary checks.
//
// Rule `k` sees rule `k-1`'s output — each rule in the cascade is applied to
// the *result* of the previous one, not to independent copies of the input.
//
// Matching is literal (no regex) by design: `find` is a Unicode scalar
// sequence searched for verbatim. Case-insensitive comparison folds each
// candidate character with `char::to_lowercase()` rather than precomputing
// a lowercased copy of the haystack, because Unicode lowercasing can change
// a string's byte length and would desynchronise byte offsets between the
// folded copy and the original.

use crate::core::model::{Rule, RuleHit, Ruleset};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// One located, not-yet-applied match of a single rule.
struct Match {
    byte_start: usize,
    byte_end: usize,
}

/// Find every non-overlapping literal match of `needle` in `haystack`.
fn find_literal_matches(
    haystack: &str,
    needle: &str,
    case_sensitive: bool,
    whole_word: bool,
) -> Vec<Match> {
    if needle.is_empty() {
        return Vec::new();
    }

    let hay_chars: Vec<(usize, char)> = haystack.char_indices().collect();
    let needle_chars: Vec<char> = needle.chars().collect();
    let needle_len = needle_chars.len();

    let mut matches = Vec::new();
    let mut i = 0usize;
    while i + needle_len <= hay_chars.len() {
        if chars_equal(&hay_chars, i, &needle_chars, case_sensitive) {
            let byte_start = hay_chars[i].0;
            let byte_end = if i + needle_len < hay_chars.len() {
                hay_chars[i + needle_len].0
            } else {
                haystack.len()
            };

            let accept = if whole_word {
                let before_ok = i == 0 || !is_word_char(hay_chars[i - 1].1);
                let after_ok = i + needle_len >= hay_chars.len() || !is_word_char(hay_chars[i + needle_len].1);
                before_ok && after_ok
            } else {
                true
            };

            if accept {
                matches.push(Match { byte_start, byte_end });
                i += needle_len; // non-overlapping: skip past the whole match
                continue;
            }
        }
        i += 1;
    }
    matches
}

fn chars_equal(hay: &[(usize, char)], start: usize, needle: &[char], case_sensitive: bool) -> bool {
    for (offset, &nc) in needle.iter().enumerate() {
        let hc = hay[start + offset].1;
        let eq = if case_sensitive {
            hc == nc
        } else {
            char_eq_ignore_case(hc, nc)
        };
        if !eq {
            return false;
        }
    }
    true
}

fn char_eq_ignore_case(a: char, b: char) -> bool {
    if a == b {
        return true;
    }
    a.to_lowercase().eq(b.to_lowercase())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Apply a single rule to `text`, returning the transformed text (borrowed
/// unchanged when there were no matches) and the number of replacements.
fn apply_rule<'a>(text: &'a str, rule: &Rule) -> (Cow<'a, str>, usize) {
    let matches = find_literal_matches(text, &rule.find, rule.case_sensitive, rule.whole_word);
    if matches.is_empty() {
        return (Cow::Borrowed(text), 0);
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for m in &matches {
        out.push_str(&text[cursor..m.byte_start]);
        out.push_str(&rule.replace);
        cursor = m.byte_end;
    }
    out.push_str(&text[cursor..]);

    (Cow::Owned(out), matches.len())
}

/// Apply every enabled rule in `ruleset`, in order, to `text`. Returns the
/// final text and a per-rule match count (present for every enabled rule,
/// even ones that matched zero times, so callers can report "rule N had no
/// effect on this file").
pub fn apply(text: &str, ruleset: &Ruleset) -> (String, BTreeMap<String, usize>) {
    let mut current = Cow::Borrowed(text);
    let mut counts = BTreeMap::new();

    for rule in ruleset.enabled_rules() {
        let (next, count) = apply_rule(&current, rule);
        counts.insert(rule.id.clone(), count);
        current = Cow::Owned(next.into_owned());
    }

    (current.into_owned(), counts)
}

/// 1-indexed (line, column) of a byte offset within `text`. Column counts
/// Unicode scalar values since the start of the line, not bytes.
fn line_col_of(text: &str, byte_offset: usize) -> (usize, usize) {
    let mut line = 1usize;
    let mut col = 1usize;
    for (idx, ch) in text.char_indices() {
        if idx >= byte_offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Non-mutating replay of `apply`, used by the preview builder: runs the
/// same cascade but records located `RuleHit`s instead of writing output,
/// up to `max_hits` total across the whole ruleset.
pub fn find_matches(text: &str, ruleset: &Ruleset, max_hits: usize) -> Vec<RuleHit> {
    let mut current = Cow::Borrowed(text);
    let mut hits = Vec::new();

    for rule in ruleset.enabled_rules() {
        if hits.len() >= max_hits {
            break;
        }
        let matches = find_literal_matches(&current, &rule.find, rule.case_sensitive, rule.whole_word);
        for m in &matches {
            if hits.len() >= max_hits {
                break;
            }
            let (line, column) = line_col_of(&current, m.byte_start);
            hits.push(RuleHit {
                rule_id: rule.id.clone(),
                byte_offset: m.byte_start,
                line,
                column,
                matched_text: current[m.byte_start..m.byte_end].to_string(),
                replacement: rule.replace.clone(),
            });
        }

        if !matches.is_empty() {
            let (next, _) = apply_rule(&current, rule);
            current = Cow::Owned(next.into_owned());
        }
    }

    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Rule;

    fn rule(id: &str, find: &str, replace: &str) -> Rule {
        Rule {
            id: id.to_string(),
            find: find.to_string(),
            replace: replace.to_string(),
            enabled: true,
            case_sensitive: true,
            whole_word: false,
        }
    }

    #[test]
    fn basic_replace() {
        let rs = Ruleset { rules: vec![rule("r1", "foo", "bar")] };
        let (out, counts) = apply("foo foo baz", &rs);
        assert_eq!(out, "bar bar baz");
        assert_eq!(counts["r1"], 2);
    }

    #[test]
    fn disabled_rule_is_a_no_op() {
        let mut r = rule("r1", "foo", "bar");
        r.enabled = false;
        let rs = Ruleset { rules: vec![r] };
        let (out, counts) = apply("foo foo", &rs);
        assert_eq!(out, "foo foo");
        assert!(!counts.contains_key("r1"));
    }

    #[test]
    fn cascading_rules_see_prior_output() {
        let rs = Ruleset {
            rules: vec![rule("r1", "foo", "bar"), rule("r2", "bar", "baz")],
        };
        let (out, counts) = apply("foo", &rs);
        assert_eq!(out, "baz");
        assert_eq!(counts["r1"], 1);
        assert_eq!(counts["r2"], 1); // r2 sees r1's output, so it matches too
    }

    #[test]
    fn case_insensitive_match() {
        let mut r = rule("r1", "foo", "bar");
        r.case_sensitive = false;
        let rs = Ruleset { rules: vec![r] };
        let (out, counts) = apply("FOO Foo foo", &rs);
        assert_eq!(out, "bar bar bar");
        assert_eq!(counts["r1"], 3);
    }

    #[test]
    fn whole_word_respects_boundaries() {
        let mut r = rule("r1", "cat", "dog");
        r.whole_word = true;
        let rs = Ruleset { rules: vec![r] };
        let (out, counts) = apply("cat concatenate cats cat", &rs);
        assert_eq!(out, "dog concatenate cats dog");
        assert_eq!(counts["r1"], 2);
    }

    #[test]
    fn non_overlapping_scan() {
        let rs = Ruleset { rules: vec![rule("r1", "aa", "b")] };
        let (out, counts) = apply("aaaa", &rs);
        // Non-overlapping: "aa" "aa" -> "b" "b", not 3 overlapping matches.
        assert_eq!(out, "bb");
        assert_eq!(counts["r1"], 2);
    }

    #[test]
    fn find_matches_tracks_line_and_column() {
        let rs = Ruleset { rules: vec![rule("r1", "needle", "x")] };
        let hits = find_matches("line one\nline needle here", &rs, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line, 2);
        assert_eq!(hits[0].column, 6);
    }

    #[test]
    fn find_matches_respects_max_hits() {
        let rs = Ruleset { rules: vec![rule("r1", "a", "b")] };
        let hits = find_matches("aaaaa", &rs, 2);
        assert_eq!(hits.len(), 2);
    }
}
