// src/refine/prompt.rs — Few-shot prompt assembly

use std::path::Path;

use crate::infra::errors::QuickenError;

/// Separator between sections of one worked example.
pub const SECTION_SEP: &str = "\n\n";

/// A fixed few-shot prefix plus a rendered query.
///
/// The prefix is loaded once at construction from a static examples file and
/// never changes for the lifetime of the template. Rendering is plain
/// concatenation; field content is not validated.
#[derive(Debug)]
pub struct PromptTemplate {
    prefix: String,
}

impl PromptTemplate {
    pub fn from_examples_file(path: &Path) -> Result<Self, QuickenError> {
        let prefix = std::fs::read_to_string(path).map_err(|e| {
            QuickenError::Config(format!(
                "prompt examples file {} unreadable: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self { prefix })
    }

    /// Mainly for tests: build from an in-memory prefix.
    pub fn from_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn render(&self, query: &str) -> String {
        let mut prompt = String::with_capacity(self.prefix.len() + query.len());
        prompt.push_str(&self.prefix);
        prompt.push_str(query);
        prompt
    }
}

/// Join example sections with blank lines, trailing separator included so the
/// model continues at a fresh section boundary.
pub fn join_sections(sections: &[&str]) -> String {
    let mut out = String::new();
    for section in sections {
        out.push_str(section);
        out.push_str(SECTION_SEP);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_render_is_prefix_plus_query() {
        let t = PromptTemplate::from_prefix("EXAMPLES\n\n");
        assert_eq!(t.render("query"), "EXAMPLES\n\nquery");
    }

    #[test]
    fn test_from_examples_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "few-shot body").unwrap();
        let t = PromptTemplate::from_examples_file(f.path()).unwrap();
        assert_eq!(t.render(" + q"), "few-shot body + q");
    }

    #[test]
    fn test_missing_examples_file_is_config_error() {
        let err = PromptTemplate::from_examples_file(Path::new("/no/such/file.txt")).unwrap_err();
        assert!(matches!(err, QuickenError::Config(_)));
    }

    #[test]
    fn test_join_sections() {
        assert_eq!(join_sections(&["a", "b"]), "a\n\nb\n\n");
    }
}
