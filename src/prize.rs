//! Prize code generation from templates like `"QUEST-{digits:6}"`.
//!
//! The `{digits:N}` placeholder is replaced by N independent, uniformly chosen
//! decimal digits. Everything else in the template is kept as written, and a
//! template without a placeholder is returned verbatim.

use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;

/// Upper bound on N accepted by config validation.
pub const MAX_DIGITS: usize = 32;

fn placeholder() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\{digits:(\d+)\}").expect("static placeholder regex"))
}

/// Number of placeholders in the template (valid templates have 0 or 1).
pub fn placeholder_count(template: &str) -> usize {
  placeholder().find_iter(template).count()
}

/// Digit count requested by the placeholder, if there is one and it parses.
pub fn digit_count(template: &str) -> Option<usize> {
  placeholder()
    .captures(template)
    .and_then(|c| c.get(1))
    .and_then(|m| m.as_str().parse::<usize>().ok())
}

pub fn generate_code<R: Rng + ?Sized>(template: &str, rng: &mut R) -> String {
  let Some(caps) = placeholder().captures(template) else {
    return template.to_string();
  };
  let (Some(whole), Some(n)) = (caps.get(0), caps.get(1)) else {
    return template.to_string();
  };
  let n = n.as_str().parse::<usize>().unwrap_or(0).min(MAX_DIGITS);

  let digits: String = (0..n)
    .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
    .collect();

  let mut out = String::with_capacity(template.len() + n);
  out.push_str(&template[..whole.start()]);
  out.push_str(&digits);
  out.push_str(&template[whole.end()..]);
  out
}
