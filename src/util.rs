//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// No nested/conditional logic; unknown placeholders are left untouched.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Keep at most `max` characters (not bytes) of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    Some((idx, _)) => s[..idx].to_string(),
    None => s.to_string(),
  }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    format!("{}… ({} bytes total)", truncate_chars(s, max), s.len())
  }
}

/// Spreadsheet-style letter for an option position: 0 -> "A", 25 -> "Z", 26 -> "AA".
pub fn option_letter(mut idx: usize) -> String {
  let mut out = Vec::new();
  loop {
    out.push((b'A' + (idx % 26) as u8) as char);
    if idx < 26 { break; }
    idx = idx / 26 - 1;
  }
  out.iter().rev().collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_every_occurrence() {
    let out = fill_template("{a} and {a}, then {b} {missing}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x and x, then y {missing}");
  }

  #[test]
  fn truncate_chars_respects_multibyte_boundaries() {
    assert_eq!(truncate_chars("héllo wörld", 4), "héll");
    assert_eq!(truncate_chars("abc", 10), "abc");
  }

  #[test]
  fn trunc_for_log_marks_truncated_payloads() {
    assert_eq!(trunc_for_log("short", 10), "short");
    let out = trunc_for_log("abcdefghij", 3);
    assert!(out.starts_with("abc…"));
    assert!(out.contains("10 bytes total"));
  }

  #[test]
  fn option_letters() {
    assert_eq!(option_letter(0), "A");
    assert_eq!(option_letter(3), "D");
    assert_eq!(option_letter(25), "Z");
    assert_eq!(option_letter(26), "AA");
  }
}
