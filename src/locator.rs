use regex::Regex;
use tracing::info;

use crate::domain::DatasetFile;
use crate::error::CatalogError;
use crate::storage::DatasetStore;

/// Shell-style file name pattern. `*` matches any run of characters and `?`
/// a single character, neither crossing `/`.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self, CatalogError> {
        if pattern.is_empty() {
            return Err(CatalogError::InvalidPattern("empty pattern".to_string()));
        }
        let mut expr = String::from("^");
        let mut literal = [0u8; 4];
        for ch in pattern.chars() {
            match ch {
                '*' => expr.push_str("[^/]*"),
                '?' => expr.push_str("[^/]"),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut literal))),
            }
        }
        expr.push('$');
        let regex = Regex::new(&expr).map_err(|err| CatalogError::InvalidPattern(err.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Matching files under the store root, sorted by name and cut to `limit`.
pub fn locate<S: DatasetStore + ?Sized>(
    store: &S,
    pattern: &GlobPattern,
    limit: Option<usize>,
) -> Result<Vec<DatasetFile>, CatalogError> {
    let mut files = store
        .list()?
        .into_iter()
        .filter(|file| pattern.matches(&file.name))
        .collect::<Vec<_>>();
    files.sort_by(|a, b| a.name.cmp(&b.name));
    let matched = files.len();
    if let Some(limit) = limit {
        files.truncate(limit);
    }
    info!(
        root = %store.describe(),
        pattern = pattern.as_str(),
        matched,
        selected = files.len(),
        "located datasets"
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_suffix() {
        let pattern = GlobPattern::new("*.csv.gz").unwrap();
        assert!(pattern.matches("CMIP.A.ModelX.ssp245.r1.day.BC.tasmax.csv.gz"));
        assert!(!pattern.matches("CMIP.A.ModelX.ssp245.r1.day.BC.tasmax.csv"));
        assert!(!pattern.matches("nested/a.csv.gz"));
        assert!(!pattern.matches("a_csv.gz"));
    }

    #[test]
    fn glob_question_mark_is_single_char() {
        let pattern = GlobPattern::new("r?.txt").unwrap();
        assert!(pattern.matches("r1.txt"));
        assert!(!pattern.matches("r10.txt"));
    }

    #[test]
    fn glob_escapes_regex_metacharacters() {
        let pattern = GlobPattern::new("a+(b).csv").unwrap();
        assert!(pattern.matches("a+(b).csv"));
        assert!(!pattern.matches("aa(b).csv"));
    }

    #[test]
    fn empty_glob_is_rejected() {
        assert!(GlobPattern::new("").is_err());
    }
}
