//! Linker configuration with sane defaults, optionally loaded from TOML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::Classification;

/// One ordered keyword category. Exactly one of `words` / `words_file` is
/// expected; a words file is resolved relative to the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryConfig {
  pub label: Classification,
  #[serde(default)]
  pub words: Vec<String>,
  #[serde(default)]
  pub words_file: Option<PathBuf>,
}

impl CategoryConfig {
  pub fn new(label: Classification, words: &[&str]) -> Self {
    Self {
      label,
      words: words.iter().map(|w| w.to_string()).collect(),
      words_file: None,
    }
  }
}

/// Tunables for region extraction, attribution windows and classification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
  /// Extensions of files whose regions may be attributed (case-insensitive, dot optional).
  pub source_extensions: Vec<String>,
  /// Max days before the fix to accept an inducing commit, when no issue date is known.
  pub lookback_days: Option<u32>,
  /// Keyword categories in precedence order.
  pub categories: Vec<CategoryConfig>,
}

impl Default for LinkerConfig {
  fn default() -> Self {
    Self {
      source_extensions: DEFAULT_SOURCE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
      lookback_days: None,
      categories: default_categories(),
    }
  }
}

const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &[
  "c", "h", "cc", "cpp", "cxx", "hpp", "hh", "cs", "java", "kt", "kts", "scala", "groovy",
  "go", "rs", "py", "rb", "php", "pl", "pm", "js", "jsx", "mjs", "cjs", "ts", "tsx", "swift",
  "m", "mm", "erl", "ex", "exs", "hs", "ml", "mli", "clj", "lua", "r", "sh", "bash", "zsh",
  "sql", "vb", "fs", "dart", "zig",
];

/// Built-in categories: merge first, then corrective, then the rest.
pub fn default_categories() -> Vec<CategoryConfig> {
  vec![
    CategoryConfig::new(Classification::Merge, &["merge"]),
    CategoryConfig::new(
      Classification::Corrective,
      &["fix", "bug", "wrong", "fail", "problem"],
    ),
    CategoryConfig::new(
      Classification::FeatureAddition,
      &["new", "add", "requirement", "initial", "create", "implement"],
    ),
    CategoryConfig::new(
      Classification::NonFunctional,
      &["doc", "readme", "license", "comment", "format", "style"],
    ),
    CategoryConfig::new(
      Classification::Perfective,
      &["clean", "better", "refactor", "improve", "simplif", "optimi"],
    ),
    CategoryConfig::new(
      Classification::Preventative,
      &["test", "junit", "coverage", "assert"],
    ),
  ]
}

impl LinkerConfig {
  /// Parse TOML text. Word files are resolved against `base_dir`.
  pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self, ConfigError> {
    let mut config: LinkerConfig = toml::from_str(text)?;
    config.resolve_word_files(base_dir)?;
    config.normalize();
    config.validate()?;
    Ok(config)
  }

  /// Load from a TOML file on disk.
  pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    Self::from_toml_str(&text, base_dir)
  }

  /// Whether a path's extension is on the allow-list.
  pub fn is_source_file(&self, path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let ext = match file_name.rsplit_once('.') {
      Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
      _ => return false,
    };
    self
      .source_extensions
      .iter()
      .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(&ext))
  }

  fn resolve_word_files(&mut self, base_dir: &Path) -> Result<(), ConfigError> {
    for category in &mut self.categories {
      if let Some(file) = category.words_file.take() {
        let path = if file.is_absolute() {
          file
        } else {
          base_dir.join(file)
        };
        let text = fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;
        category.words.extend(parse_word_list(&text));
      }
    }
    Ok(())
  }

  fn normalize(&mut self) {
    for ext in &mut self.source_extensions {
      *ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    }
    self.source_extensions.retain(|e| !e.is_empty());
    for category in &mut self.categories {
      for word in &mut category.words {
        *word = word.trim().to_lowercase();
      }
      category.words.retain(|w| !w.is_empty());
    }
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if self.source_extensions.is_empty() {
      return Err(ConfigError::invalid(
        "source_extensions",
        "must list at least one extension",
      ));
    }
    if self.categories.is_empty() {
      return Err(ConfigError::invalid("categories", "must define at least one category"));
    }
    for category in &self.categories {
      if category.words.is_empty() {
        return Err(ConfigError::invalid(
          "categories",
          &format!("{} has no words", category.label),
        ));
      }
    }
    Ok(())
  }
}

/// Split a flat word file: comma or newline separated, `|` quoting tolerated.
pub fn parse_word_list(text: &str) -> Vec<String> {
  text
    .split(|c| c == ',' || c == '\n' || c == '\r')
    .map(|w| w.trim().trim_matches('|').trim().to_lowercase())
    .filter(|w| !w.is_empty())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_allows_python_but_not_markdown() {
    let config = LinkerConfig::default();
    assert!(config.is_source_file("src/core.py"));
    assert!(config.is_source_file("lib/Main.JAVA"));
    assert!(!config.is_source_file("README.md"));
    assert!(!config.is_source_file("assets/logo.png"));
  }

  #[test]
  fn dotfiles_and_extensionless_paths_are_not_source() {
    let config = LinkerConfig::default();
    assert!(!config.is_source_file("Makefile"));
    assert!(!config.is_source_file("scripts/.sh"));
    assert!(!config.is_source_file("a.b/Makefile"));
  }

  #[test]
  fn toml_overrides_extensions_and_window() {
    let text = r#"
      source_extensions = [".PY", "rs"]
      lookback_days = 90
    "#;
    let config = LinkerConfig::from_toml_str(text, Path::new(".")).unwrap();
    assert_eq!(config.source_extensions, vec!["py", "rs"]);
    assert_eq!(config.lookback_days, Some(90));
    assert_eq!(config.categories, default_categories());
  }

  #[test]
  fn categories_load_from_word_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("corrective.csv"), "fix,bug\nhotfix\n").unwrap();
    let text = r#"
      [[categories]]
      label = "Corrective"
      words_file = "corrective.csv"

      [[categories]]
      label = "Feature Addition"
      words = ["Add"]
    "#;
    let config = LinkerConfig::from_toml_str(text, dir.path()).unwrap();
    assert_eq!(config.categories.len(), 2);
    assert_eq!(config.categories[0].words, vec!["fix", "bug", "hotfix"]);
    assert_eq!(config.categories[1].words, vec!["add"]);
  }

  #[test]
  fn empty_extension_list_is_rejected() {
    let err = LinkerConfig::from_toml_str("source_extensions = []", Path::new(".")).unwrap_err();
    assert!(err.to_string().contains("source_extensions"));
  }

  #[test]
  fn missing_word_file_reports_path() {
    let text = r#"
      [[categories]]
      label = "Corrective"
      words_file = "nope.csv"
    "#;
    let err = LinkerConfig::from_toml_str(text, Path::new("/nonexistent")).unwrap_err();
    assert!(err.to_string().contains("nope.csv"));
  }

  #[test]
  fn word_list_tolerates_quotes_and_blanks() {
    assert_eq!(parse_word_list("|fix|, bug ,,\r\nwrong"), vec!["fix", "bug", "wrong"]);
  }
}
