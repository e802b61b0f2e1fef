//! Corpus provider: per-user text units on local disk
//!
//! Layout: `<root>/<user_id>/<file_name>`, UTF-8, one unit per line.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Data file missing for user '{user_id}': expected {}", .path.display())]
    Missing { user_id: String, path: PathBuf },

    #[error("User id '{0}' cannot name a corpus folder")]
    InvalidUserId(String),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct CorpusProvider {
    root: PathBuf,
    file_name: String,
}

impl CorpusProvider {
    pub fn new(root: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            file_name: file_name.into(),
        }
    }

    /// Corpus file for `user_id`; the id must be a single plain path component
    pub fn path_for(&self, user_id: &str) -> Result<PathBuf, CorpusError> {
        let unsafe_id = user_id.is_empty()
            || user_id == "."
            || user_id == ".."
            || user_id.contains(['/', '\\'])
            || user_id.contains('\0');
        if unsafe_id {
            return Err(CorpusError::InvalidUserId(user_id.to_string()));
        }
        Ok(self.root.join(user_id).join(&self.file_name))
    }

    /// Load the user's text units in file order
    ///
    /// A missing file is a setup error, not something to recover from.
    pub async fn load_texts(&self, user_id: &str) -> Result<Vec<String>, CorpusError> {
        let path = self.path_for(user_id)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CorpusError::Missing {
                    user_id: user_id.to_string(),
                    path,
                });
            }
            Err(source) => return Err(CorpusError::Io { path, source }),
        };
        Ok(parse_corpus(&content))
    }
}

/// Trim every line and drop blank ones
pub fn parse_corpus(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_corpus(root: &Path, user_id: &str, content: &str) {
        let dir = root.join(user_id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("texts.txt"), content).unwrap();
    }

    #[test]
    fn test_parse_trims_and_drops_blank_lines() {
        let texts = parse_corpus("  [1] a  \n\n\t\n[2] b\r\n   [3] c");
        assert_eq!(texts, vec!["[1] a", "[2] b", "[3] c"]);
    }

    #[test]
    fn test_path_rejects_traversal() {
        let provider = CorpusProvider::new("/data", "texts.txt");
        assert!(provider.path_for("anna").is_ok());
        for bad in ["", ".", "..", "../etc", "a/b", "a\\b"] {
            assert!(
                matches!(provider.path_for(bad), Err(CorpusError::InvalidUserId(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_load_texts_preserves_order() {
        let temp_dir = TempDir::new().unwrap();
        write_corpus(temp_dir.path(), "anna", "[3] c\n[1] a\n\n[2] b\n");

        let provider = CorpusProvider::new(temp_dir.path(), "texts.txt");
        let texts = provider.load_texts("anna").await.unwrap();
        assert_eq!(texts, vec!["[3] c", "[1] a", "[2] b"]);
    }

    #[tokio::test]
    async fn test_missing_file_reports_expected_path() {
        let temp_dir = TempDir::new().unwrap();
        let provider = CorpusProvider::new(temp_dir.path(), "texts.txt");

        match provider.load_texts("bo").await {
            Err(CorpusError::Missing { user_id, path }) => {
                assert_eq!(user_id, "bo");
                assert_eq!(path, temp_dir.path().join("bo").join("texts.txt"));
            }
            other => panic!("expected Missing, got {:?}", other),
        }
    }
}
