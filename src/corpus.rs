use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

/// Immutable mapping from category name to its templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    categories: BTreeMap<String, Vec<String>>,
}

impl Corpus {
    /// Loads one category per regular file in `dir`, one template per line.
    ///
    /// Backup files (trailing `~`) and hidden files are skipped. Lines are
    /// trimmed and blank lines dropped.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries =
            fs::read_dir(dir).with_context(|| format!("Reading corpus directory {}", dir.display()))?;

        let mut categories = BTreeMap::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("Listing {}", dir.display()))?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                warn!(path = %path.display(), "skipping corpus file with a non UTF-8 name");
                continue;
            };
            if name.ends_with('~') || name.starts_with('.') || !path.is_file() {
                continue;
            }
            let contents =
                fs::read_to_string(&path).with_context(|| format!("Reading {}", path.display()))?;
            let templates = parse_lines(&contents);
            if templates.is_empty() {
                warn!(category = name, "corpus file has no templates");
            }
            categories.insert(name.to_string(), templates);
        }

        info!(
            dir = %dir.display(),
            categories = categories.len(),
            "loaded corpus"
        );
        Ok(Self { categories })
    }

    pub fn from_categories<I, C, T>(categories: I) -> Self
    where
        I: IntoIterator<Item = (C, Vec<T>)>,
        C: Into<String>,
        T: Into<String>,
    {
        Self {
            categories: categories
                .into_iter()
                .map(|(name, templates)| {
                    (name.into(), templates.into_iter().map(Into::into).collect())
                })
                .collect(),
        }
    }

    pub fn templates(&self, category: &str) -> Option<&[String]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }
}

fn parse_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn parses_one_template_per_line() {
        let contents = indoc! {"
            1 + 2
              {num_expr} * 3

            abs(-4)
        "};
        assert_eq!(parse_lines(contents), vec!["1 + 2", "{num_expr} * 3", "abs(-4)"]);
    }

    #[test]
    fn builds_from_memory() {
        let corpus = Corpus::from_categories([("num_expr", vec!["1", "2"]), ("name", vec!["x"])]);
        assert_eq!(corpus.categories().collect::<Vec<_>>(), vec!["name", "num_expr"]);
        assert_eq!(
            corpus.templates("num_expr"),
            Some(&["1".to_string(), "2".to_string()][..])
        );
        assert_eq!(corpus.templates("missing"), None);
    }

    #[test]
    fn load_skips_backups_hidden_files_and_subdirectories() {
        let dir = std::env::temp_dir().join(format!("pydrill-corpus-{}", std::process::id()));
        fs::create_dir_all(dir.join("nested")).expect("create corpus dir");
        fs::write(dir.join("num_expr"), "1 + 2\n\n   \n  {num_expr} * 3  \n").expect("write");
        fs::write(dir.join("num_expr~"), "99\n").expect("write");
        fs::write(dir.join(".hidden"), "0\n").expect("write");
        fs::write(dir.join("nested").join("name"), "x\n").expect("write");

        let corpus = Corpus::load(&dir);
        fs::remove_dir_all(&dir).expect("remove corpus dir");

        let corpus = corpus.expect("load corpus");
        assert_eq!(corpus.categories().collect::<Vec<_>>(), vec!["num_expr"]);
        assert_eq!(
            corpus.templates("num_expr"),
            Some(&["1 + 2".to_string(), "{num_expr} * 3".to_string()][..])
        );
    }

    #[test]
    fn load_reports_missing_directory() {
        let error = Corpus::load("/nonexistent/pydrill-corpus").expect_err("missing dir");
        assert!(error.to_string().contains("Reading corpus directory"));
    }
}
