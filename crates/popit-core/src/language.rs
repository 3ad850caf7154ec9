//! Language codes used to scope translated attributes.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A language tag such as `en`, `ms` or `zh-Hans`.
///
/// Kept exactly as given. Only ASCII letters, digits, `-` and `_` are
/// allowed, at most 16 characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
  pub fn new(code: impl Into<String>) -> Result<Self> {
    let code = code.into();
    let valid = !code.is_empty()
      && code.len() <= 16
      && code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
      return Err(Error::InvalidLanguage(code));
    }
    Ok(Self(code))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

/// English, the language records are written in unless told otherwise.
impl Default for LanguageCode {
  fn default() -> Self { Self("en".to_owned()) }
}

impl fmt::Display for LanguageCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl FromStr for LanguageCode {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::new(s) }
}

impl TryFrom<String> for LanguageCode {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { Self::new(s) }
}

impl From<LanguageCode> for String {
  fn from(code: LanguageCode) -> Self { code.0 }
}
