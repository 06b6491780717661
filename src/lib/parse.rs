use std::{borrow::Cow, collections::BTreeMap, convert::TryFrom, fmt, str::FromStr};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

const COMMENT_PREFIX: &str = "#";
const ASSIGNMENT_OPERATOR: &str = "=";

/// Key/value pairs read from a single env file.
///
/// Keys are unique: when a file assigns the same key twice, the last
/// assignment wins. Iteration is in key order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvMap<'a> {
  vars: BTreeMap<Cow<'a, str>, Cow<'a, str>>,
}

impl<'a> EnvMap<'a> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(|value| value.as_ref())
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.vars.contains_key(key)
  }

  /// Inserts a pair, returning the value it replaced.
  pub fn insert(
    &mut self,
    key: impl Into<Cow<'a, str>>,
    value: impl Into<Cow<'a, str>>,
  ) -> Option<Cow<'a, str>> {
    self.vars.insert(key.into(), value.into())
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.vars.keys().map(|key| key.as_ref())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .vars
      .iter()
      .map(|(key, value)| (key.as_ref(), value.as_ref()))
  }

  pub fn len(&self) -> usize {
    self.vars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }

  /// Detaches the map from the text it was parsed from.
  pub fn into_owned(self) -> EnvMap<'static> {
    EnvMap {
      vars: self
        .vars
        .into_iter()
        .map(|(key, value)| (Cow::Owned(key.into_owned()), Cow::Owned(value.into_owned())))
        .collect(),
    }
  }
}

impl<'a> fmt::Display for EnvMap<'a> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (key, value) in self.iter() {
      writeln!(f, "{}{}{}", key, ASSIGNMENT_OPERATOR, value)?;
    }
    Ok(())
  }
}

impl<'a> TryFrom<&'a str> for EnvMap<'a> {
  type Error = ParseError;

  fn try_from(s: &'a str) -> Result<Self, Self::Error> {
    #[cfg(feature = "tracing")]
    debug!("Parsing env file with {} lines", s.lines().count());

    let mut map = EnvMap::new();

    // `lines` splits on both "\n" and "\r\n", whatever the host platform.
    for (index, raw) in s.lines().enumerate() {
      #[cfg(feature = "tracing")]
      trace!("Parsing line {}", index + 1);

      if let EnvLine::Assignment { key, value } = EnvLine::parse(index + 1, raw)? {
        #[cfg(feature = "tracing")]
        if map.contains_key(key) {
          trace!("Key {} assigned again, overwriting", key);
        }

        map.insert(key, value);
      }
    }

    #[cfg(feature = "tracing")]
    debug!("Parsed {} variables", map.len());

    Ok(map)
  }
}

impl FromStr for EnvMap<'static> {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    EnvMap::try_from(s).map(EnvMap::into_owned)
  }
}

/// A single classified line of an env file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvLine<'a> {
  Blank,
  Comment(&'a str),
  Assignment { key: &'a str, value: &'a str },
}

impl<'a> EnvLine<'a> {
  /// Classifies `raw`, the `line`-th (1-based) line of a file.
  pub fn parse(line: usize, raw: &'a str) -> Result<Self, ParseError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
      return Ok(EnvLine::Blank);
    }

    if let Some(comment) = trimmed.strip_prefix(COMMENT_PREFIX) {
      return Ok(EnvLine::Comment(comment));
    }

    let Some((key, value)) = trimmed.split_once(ASSIGNMENT_OPERATOR) else {
      return Err(ParseError::InvalidLine {
        line,
        content: trimmed.to_string(),
      });
    };

    let key = key.trim();
    if key.is_empty() {
      return Err(ParseError::EmptyKey {
        line,
        content: trimmed.to_string(),
      });
    }

    Ok(EnvLine::Assignment {
      key,
      value: value.trim(),
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
  #[error("Invalid line {line}: expected KEY=VALUE, found {content:?}")]
  InvalidLine { line: usize, content: String },
  #[error("Invalid line {line}: missing key before '=' in {content:?}")]
  EmptyKey { line: usize, content: String },
}

impl ParseError {
  /// 1-based number of the offending line.
  pub fn line(&self) -> usize {
    match self {
      ParseError::InvalidLine { line, .. } | ParseError::EmptyKey { line, .. } => *line,
    }
  }
}
