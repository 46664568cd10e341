/* URL templates: `{name}` placeholder binding and static query extraction */

use indexmap::IndexMap;
use serde_derive::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum PathPart {
  Literal(String),
  /* Reference to a method parameter */
  Param(String),
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct PathTemplate {
  /* Verb annotation value, query suffix included */
  pub raw: String,
  pub parts: Vec<PathPart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
  Text(String),
  Placeholder(String),
}

impl PathTemplate {
  /// Parses `raw`, binding each `{name}` placeholder through `bind`.
  /// Unbound placeholders stay literal; the `?` query suffix is dropped.
  pub fn bind(raw: &str, bind: impl Fn(&str) -> Option<String>) -> Self {
    let mut parts: Vec<PathPart> = Vec::new();
    for segment in segments(strip_query(raw)) {
      match segment {
        Segment::Placeholder(name) => match bind(&name) {
          Some(param) => parts.push(PathPart::Param(param)),
          None => push_literal(&mut parts, &format!("{{{}}}", name)),
        },
        Segment::Text(text) => push_literal(&mut parts, &text),
      }
    }
    Self {
      raw: raw.to_string(),
      parts,
    }
  }

  /// Java string concatenation for the path: `"/group/" + id + "/users"`.
  pub fn expression(&self) -> String {
    let mut out = String::from("\"");
    for part in &self.parts {
      match part {
        PathPart::Literal(text) => out.push_str(&escape_java(text)),
        PathPart::Param(param) => {
          out.push_str("\" + ");
          out.push_str(param);
          out.push_str(" + \"");
        }
      }
    }
    out.push('"');
    out
  }
}

fn push_literal(parts: &mut Vec<PathPart>, text: &str) {
  if let Some(PathPart::Literal(last)) = parts.last_mut() {
    last.push_str(text);
  } else if !text.is_empty() {
    parts.push(PathPart::Literal(text.to_string()));
  }
}

fn strip_query(raw: &str) -> &str {
  raw.split_once('?').map(|(path, _)| path).unwrap_or(raw)
}

fn segments(path: &str) -> Vec<Segment> {
  let mut segments = Vec::new();
  let mut rest = path;
  while let Some(open) = rest.find('{') {
    let Some(close) = rest[open..].find('}').map(|c| open + c) else {
      break;
    };
    if open > 0 {
      segments.push(Segment::Text(rest[..open].to_string()));
    }
    let name = &rest[open + 1..close];
    if name.is_empty() {
      segments.push(Segment::Text("{}".to_string()));
    } else {
      segments.push(Segment::Placeholder(name.to_string()));
    }
    rest = &rest[close + 1..];
  }
  if !rest.is_empty() {
    segments.push(Segment::Text(rest.to_string()));
  }
  segments
}

/// Static query pairs from the `?` suffix of a template.
/// A pair without `=` maps to the empty string; empty pairs are ignored.
pub fn static_queries(raw: &str) -> IndexMap<String, String> {
  let mut queries = IndexMap::new();
  let Some((_, query)) = raw.split_once('?') else {
    return queries;
  };
  for pair in query.split('&') {
    if pair.is_empty() {
      continue;
    }
    let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
    if key.is_empty() {
      continue;
    }
    queries.insert(key.to_string(), value.to_string());
  }
  queries
}

pub fn escape_java(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\t' => out.push_str("\\t"),
      _ => out.push(c),
    }
  }
  out
}

/* Java string literal for `text` */
pub fn quote_java(text: &str) -> String {
  format!("\"{}\"", escape_java(text))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bind_same_name(name: &str) -> Option<String> {
    (name == "id" || name == "user").then(|| name.to_string())
  }

  #[test]
  fn binds_placeholder_into_concatenation() {
    let template = PathTemplate::bind("/group/{id}/users", bind_same_name);
    assert_eq!(template.expression(), "\"/group/\" + id + \"/users\"");
    assert_eq!(
      template.parts,
      vec![
        PathPart::Literal("/group/".into()),
        PathPart::Param("id".into()),
        PathPart::Literal("/users".into()),
      ]
    );
  }

  #[test]
  fn trailing_placeholder_keeps_empty_suffix() {
    let template = PathTemplate::bind("/{id}", bind_same_name);
    assert_eq!(template.expression(), "\"/\" + id + \"\"");
  }

  #[test]
  fn query_suffix_never_reaches_the_path() {
    let template = PathTemplate::bind("/group/{id}/users?sort={id}&x=1", bind_same_name);
    assert_eq!(template.expression(), "\"/group/\" + id + \"/users\"");
  }

  #[test]
  fn unmatched_placeholders_stay_literal() {
    let template = PathTemplate::bind("/{org}/{user}", bind_same_name);
    assert_eq!(template.expression(), "\"/{org}/\" + user + \"\"");
    assert!(template.parts.iter().any(|part| matches!(part, PathPart::Param(p) if p == "user")));
  }

  #[test]
  fn static_query_pairs() {
    let queries = static_queries("/list?sort=desc&&flag&=x&page=2");
    assert_eq!(queries.get("sort").map(String::as_str), Some("desc"));
    assert_eq!(queries.get("flag").map(String::as_str), Some(""));
    assert_eq!(queries.get("page").map(String::as_str), Some("2"));
    assert_eq!(queries.len(), 3);
    assert!(static_queries("/list").is_empty());
  }
}
