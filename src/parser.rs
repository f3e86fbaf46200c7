//! Tolerant parsing of model output into quiz questions.
//!
//! Pipeline: strip markdown fences -> cut to the outermost JSON value -> repair LaTeX
//! backslashes -> `serde_json` -> loose raw records -> typed `QuizQuestion`s with fresh ids.
//!
//! Models routinely emit `\frac{1}{2}` inside JSON strings, which is an invalid escape
//! (or worse, a valid `\f` form feed). `escape_latex` doubles backslashes that do not form a
//! JSON escape. A letter run starting with `b f n r t` is LaTeX when it sits inside a `$...$`
//! span; outside math it is LaTeX only when it spells a known command or command family
//! (`\neq`, `\bigl`, `\rightarrow`, `\textstyle` ...), so `\nThen` stays a newline.

use std::sync::OnceLock;

use rand::seq::SliceRandom;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{QuizOption, QuizQuestion, OPTIONS_PER_QUESTION};
use crate::error::{AppError, AppResult};
use crate::util::trunc_for_log;

/// LaTeX commands whose first letter collides with a JSON escape (`b f n r t`).
const AMBIGUOUS_LATEX_COMMANDS: &[&str] = &[
  "backslash", "bar", "because", "begin", "beta", "binom", "bmod", "boldsymbol", "bot",
  "boxed", "bullet", "bf",
  "flat", "forall", "frac", "frown",
  "nabla", "ncong", "ne", "nearrow", "neg", "neq", "nexists", "newline", "ngeq", "ngtr", "ni",
  "nleq", "nless", "nmid", "not", "notin", "nparallel", "nsubset", "nsubseteq", "nsupset",
  "nsupseteq", "nu", "nwarrow",
  "rangle", "rbrace", "rbrack", "rceil", "rfloor", "rho", "rm", "rVert", "rvert",
  "tan", "tanh", "tau", "tbinom", "tfrac", "therefore", "theta", "tilde", "times", "to", "top",
  "triangle",
];

/// Command families matched by prefix (`\bigl`, `\Bigr`, `\rightleftharpoons`, `\textstyle`).
const AMBIGUOUS_LATEX_PREFIXES: &[&str] = &["big", "right", "text", "bold", "frac", "triangle"];

fn is_latex_command(name: &str) -> bool {
  AMBIGUOUS_LATEX_COMMANDS.contains(&name)
    || AMBIGUOUS_LATEX_PREFIXES.iter().any(|p| name.starts_with(p))
}

fn backslash_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"(?s)\\(u[0-9a-fA-F]{4}|[A-Za-z]+|.)?").expect("static regex is valid")
  })
}

/// Remove a surrounding ```` ```json ... ``` ```` block if present.
pub fn strip_code_fences(raw: &str) -> &str {
  let s = raw.trim();
  let Some(rest) = s.strip_prefix("```") else {
    return s;
  };
  // Drop the info string (`json`, `JSON`, ...) on the opening line.
  let body = match rest.find('\n') {
    Some(nl) => &rest[nl + 1..],
    None => rest,
  };
  body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Slice from the first `{`/`[` to the last `}`/`]`, dropping chatter around the JSON.
pub fn extract_json_block(s: &str) -> &str {
  let start = s.find(|c: char| c == '{' || c == '[');
  let end = s.rfind(|c: char| c == '}' || c == ']');
  match (start, end) {
    (Some(a), Some(b)) if a < b => &s[a..=b],
    _ => s,
  }
}

/// Double backslashes that are not part of a valid JSON escape.
pub fn escape_latex(raw: &str) -> String {
  // Unescaped `$` seen so far; odd means the current match is inside a math span.
  let mut scanned = 0;
  let mut dollars = 0usize;
  backslash_re()
    .replace_all(raw, |caps: &Captures| {
      if let Some(m) = caps.get(0) {
        dollars += raw[scanned..m.start()].matches('$').count();
        scanned = m.end();
      }
      let in_math = dollars % 2 == 1;

      let Some(tail) = caps.get(1).map(|m| m.as_str()) else {
        // Lone trailing backslash.
        return r"\\".to_string();
      };
      match tail {
        r"\" | "\"" | "/" => format!(r"\{}", tail),
        t if t.len() == 5 && t.starts_with('u') && t[1..].chars().all(|c| c.is_ascii_hexdigit()) => {
          format!(r"\{}", t)
        }
        t if t.chars().all(|c| c.is_ascii_alphabetic()) => {
          let first = t.chars().next().unwrap_or(' ');
          let json_escape = matches!(first, 'b' | 'f' | 'n' | 'r' | 't');
          let latex = t.len() > 1 && (in_math || is_latex_command(t));
          if json_escape && !latex {
            format!(r"\{}", t)
          } else {
            format!(r"\\{}", t)
          }
        }
        t => format!(r"\\{}", t),
      }
    })
    .into_owned()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOption {
  Plain(String),
  Full {
    #[serde(alias = "option", alias = "answer", alias = "label", alias = "value")]
    text: String,
    #[serde(default, rename = "isCorrect", alias = "is_correct", alias = "correct")]
    is_correct: Option<bool>,
  },
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
  #[serde(alias = "text", alias = "questionText", alias = "question_text", alias = "prompt")]
  question: String,
  #[serde(default, alias = "answers", alias = "choices")]
  options: Vec<RawOption>,
  #[serde(
    default,
    rename = "multipleAnswers",
    alias = "multiple_answers",
    alias = "isMultipleAnswer",
    alias = "multiAnswer"
  )]
  multiple_answers: Option<bool>,
  /// Index / indices / option text / letter, for models that list options as plain strings.
  #[serde(
    default,
    rename = "correctAnswers",
    alias = "correct_answers",
    alias = "correctAnswer",
    alias = "correct_answer",
    alias = "answer",
    alias = "correct"
  )]
  correct_answers: Option<Value>,
}

fn question_values(v: Value) -> Vec<Value> {
  match v {
    Value::Array(items) => items,
    Value::Object(mut map) => {
      for key in ["questions", "quiz", "items"] {
        if let Some(Value::Array(items)) = map.remove(key) {
          return items;
        }
      }
      vec![Value::Object(map)]
    }
    _ => vec![],
  }
}

/// Does `reference` (from `correctAnswers`) point at option `idx` with text `text`?
fn refers_to(reference: &Value, idx: usize, text: &str) -> bool {
  match reference {
    Value::Number(n) => n.as_u64() == Some(idx as u64),
    Value::String(s) => {
      let s = s.trim();
      let letter = crate::util::option_letter(idx);
      s.eq_ignore_ascii_case(&letter) || s.eq_ignore_ascii_case(text.trim())
    }
    Value::Array(items) => items.iter().any(|r| refers_to(r, idx, text)),
    _ => false,
  }
}

fn into_question(raw: RawQuestion, expected_multi: Option<bool>) -> Option<QuizQuestion> {
  let text = raw.question.trim().to_string();
  if text.is_empty() {
    return None;
  }

  let options: Vec<QuizOption> = raw
    .options
    .into_iter()
    .enumerate()
    .filter_map(|(idx, o)| {
      let (t, flag) = match o {
        RawOption::Plain(t) => (t, None),
        RawOption::Full { text, is_correct } => (text, is_correct),
      };
      let t = t.trim().to_string();
      if t.is_empty() {
        return None;
      }
      let by_ref = raw.correct_answers.as_ref().map(|r| refers_to(r, idx, &t)).unwrap_or(false);
      Some(QuizOption::new(t, flag.unwrap_or(false) || by_ref))
    })
    .collect();

  if options.len() != OPTIONS_PER_QUESTION {
    warn!(target: "quiz", question = %trunc_for_log(&text, 60), options = options.len(), "Skipping question without exactly four options");
    return None;
  }

  let correct = options.iter().filter(|o| o.is_correct).count();
  let multiple_answers = expected_multi
    .or(raw.multiple_answers)
    .unwrap_or(correct > 1);
  Some(QuizQuestion::new(text, options, multiple_answers))
}

fn parse_value(text: &str) -> AppResult<Value> {
  let repaired = escape_latex(text);
  match serde_json::from_str::<Value>(&repaired) {
    Ok(v) => Ok(v),
    Err(repair_err) => serde_json::from_str::<Value>(text).map_err(|_| {
      AppError::Parse(format!("invalid JSON ({})", repair_err))
    }),
  }
}

/// Parse a model response into questions.
/// `expected_multi` forces the multi-answer flag (used for single-question regeneration).
pub fn parse_questions(raw: &str, expected_multi: Option<bool>) -> AppResult<Vec<QuizQuestion>> {
  let body = extract_json_block(strip_code_fences(raw));
  if body.is_empty() {
    return Err(AppError::Parse("empty response".into()));
  }

  let value = parse_value(body).map_err(|e| {
    warn!(target: "quiz", response = %trunc_for_log(body, 200), error = %e, "Model response is not JSON");
    e
  })?;

  let questions: Vec<QuizQuestion> = question_values(value)
    .into_iter()
    .filter_map(|v| match serde_json::from_value::<RawQuestion>(v) {
      Ok(raw) => into_question(raw, expected_multi),
      Err(e) => {
        warn!(target: "quiz", error = %e, "Skipping malformed question entry");
        None
      }
    })
    .collect();

  if questions.is_empty() {
    return Err(AppError::Parse("no usable questions in response".into()));
  }
  debug!(target: "quiz", count = questions.len(), "Parsed questions");
  Ok(questions)
}

/// Reorder options in place so the correct answer position varies.
pub fn shuffle_options(questions: &mut [QuizQuestion]) {
  let mut rng = rand::thread_rng();
  for q in questions.iter_mut() {
    q.options.shuffle(&mut rng);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strips_fences_with_and_without_language() {
    assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fences("  ```\n[1]\n```  "), "[1]");
    assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
  }

  #[test]
  fn extracts_json_from_chatter() {
    assert_eq!(extract_json_block("Sure! {\"a\": [1]} Enjoy."), "{\"a\": [1]}");
    assert_eq!(extract_json_block("no json here"), "no json here");
  }

  #[test]
  fn latex_commands_are_doubled() {
    assert_eq!(escape_latex(r#"$\frac{1}{2}$"#), r#"$\\frac{1}{2}$"#);
    assert_eq!(escape_latex(r#"$\alpha + \sqrt{x}$"#), r#"$\\alpha + \\sqrt{x}$"#);
    assert_eq!(escape_latex(r#"$a \neq b \times c$"#), r#"$a \\neq b \\times c$"#);
    assert_eq!(escape_latex(r#"\( x \)"#), r#"\\( x \\)"#);
    assert_eq!(escape_latex(r#"\underline{x}"#), r#"\\underline{x}"#);
  }

  #[test]
  fn escape_letter_commands_outside_math() {
    for cmd in ["bigl", "Bigr", "rightleftharpoons", "rbrace", "rvert", "nexists", "nsubseteq", "textstyle", "tbinom"] {
      let raw = format!(r"\{}", cmd);
      assert_eq!(escape_latex(&raw), format!(r"\\{}", cmd), "{}", cmd);
    }
  }

  #[test]
  fn escape_letter_runs_inside_math_are_latex() {
    assert_eq!(escape_latex(r"$\nmid x$ then\nMore"), r"$\\nmid x$ then\nMore");
    // `\$` is a literal dollar and does not open a math span.
    assert_eq!(escape_latex(r"costs \$5\nthen"), r"costs \\$5\nthen");
    assert_eq!(escape_latex(r"$\foo \n$"), r"$\\foo \n$");
  }

  #[test]
  fn math_commands_never_become_control_characters() {
    let raw = r#"[{"question": "$A \rightleftharpoons B$, $\nexists x$, $\bigl( x \bigr)$, $\rbrace$, $\fracture$",
      "options": ["$\textstyle a$", "$\tbinom{n}{k}$", "$\rvert x \rvert$", "$\nsubseteq$"], "correctAnswers": 0}]"#;
    let qs = parse_questions(raw, None).unwrap();
    let all: String = std::iter::once(qs[0].text.clone())
      .chain(qs[0].options.iter().map(|o| o.text.clone()))
      .collect();
    assert!(!all.chars().any(|c| matches!(c, '\u{8}' | '\u{c}' | '\n' | '\r' | '\t')), "{:?}", all);
    assert!(qs[0].text.contains(r"\bigl( x \bigr)"));
    assert_eq!(qs[0].options[1].text, r"$\tbinom{n}{k}$");
  }

  #[test]
  fn json_escapes_are_kept() {
    let s = r#"{"q": "Line one\nLine two \"quoted\" \\frac a\/b \u00e9\tend"}"#;
    assert_eq!(escape_latex(s), s);
    // newline followed by ordinary words is still a newline
    assert_eq!(escape_latex(r#"first\nThen"#), r#"first\nThen"#);
  }

  #[test]
  fn parses_fenced_response_with_latex() {
    let raw = "```json\n{\"questions\": [{\"question\": \"What is $\\frac{1}{2} + \\frac{1}{4}$?\", \"multipleAnswers\": false, \"options\": [{\"text\": \"$\\frac{3}{4}$\", \"isCorrect\": true}, {\"text\": \"$\\frac{2}{6}$\", \"isCorrect\": false}, {\"text\": \"1\", \"isCorrect\": false}, {\"text\": \"$\\frac{1}{8}$\", \"isCorrect\": false}]}]}\n```";
    let qs = parse_questions(raw, None).unwrap();
    assert_eq!(qs.len(), 1);
    assert_eq!(qs[0].text, r"What is $\frac{1}{2} + \frac{1}{4}$?");
    assert_eq!(qs[0].options.len(), 4);
    assert_eq!(qs[0].options[0].text, r"$\frac{3}{4}$");
    assert!(qs[0].options[0].is_correct);
    assert!(!qs[0].multiple_answers);
    assert_ne!(qs[0].id, qs[0].options[0].id);
  }

  #[test]
  fn accepts_plain_string_options_with_correct_indices() {
    let raw = r#"[{"text": "Pick the primes", "options": ["2", "4", "5", "9"], "correctAnswers": [0, 2]}]"#;
    let qs = parse_questions(raw, None).unwrap();
    let flags: Vec<bool> = qs[0].options.iter().map(|o| o.is_correct).collect();
    assert_eq!(flags, vec![true, false, true, false]);
    assert!(qs[0].multiple_answers);
  }

  #[test]
  fn accepts_single_object_and_letter_answer() {
    let raw = r#"{"question": "Capital of France?", "answers": ["Rome", "Paris", "Oslo", "Bern"], "answer": "B"}"#;
    let qs = parse_questions(raw, Some(false)).unwrap();
    assert_eq!(qs.len(), 1);
    assert!(qs[0].options[1].is_correct);
    assert!(!qs[0].multiple_answers);
  }

  #[test]
  fn keeps_only_questions_with_four_options() {
    let raw = r#"{"questions": [
      {"question": "Four options", "options": [{"text":"a","isCorrect":true},{"text":"b"},{"text":"c"},{"text":"d"}]},
      {"question": "Three options", "options": [{"text":"a","isCorrect":true},{"text":"b"},{"text":"c"}]},
      {"question": "Five options", "options": ["a", "b", "c", "d", "e"], "correctAnswers": 4},
      {"question": "Blank option", "options": ["a", "b", "  ", "d"], "correctAnswers": 0},
      {"question": "   ", "options": ["w", "x", "y", "z"]},
      {"nonsense": true}
    ]}"#;
    let qs = parse_questions(raw, None).unwrap();
    assert_eq!(qs.len(), 1);
    assert_eq!(qs[0].text, "Four options");
    assert_eq!(qs[0].options.len(), OPTIONS_PER_QUESTION);
    assert_eq!(qs[0].correct_count(), 1);
  }

  #[test]
  fn expected_flag_overrides_model() {
    let raw = r#"[{"question": "Q", "multipleAnswers": false, "options": ["a", "b", "c", "d"]}]"#;
    let qs = parse_questions(raw, Some(true)).unwrap();
    assert!(qs[0].multiple_answers);
  }

  #[test]
  fn errors_on_garbage() {
    assert!(matches!(parse_questions("", None), Err(AppError::Parse(_))));
    assert!(matches!(parse_questions("I cannot help with that.", None), Err(AppError::Parse(_))));
    assert!(matches!(parse_questions(r#"{"questions": []}"#, None), Err(AppError::Parse(_))));
  }

  #[test]
  fn shuffle_keeps_option_set() {
    let mut qs = parse_questions(r#"[{"question": "Q", "options": ["a", "b", "c", "d"], "correctAnswers": 3}]"#, None).unwrap();
    shuffle_options(&mut qs);
    let mut texts: Vec<&str> = qs[0].options.iter().map(|o| o.text.as_str()).collect();
    texts.sort();
    assert_eq!(texts, vec!["a", "b", "c", "d"]);
    assert_eq!(qs[0].correct_count(), 1);
    assert!(qs[0].options.iter().any(|o| o.is_correct && o.text == "d"));
  }
}
