// file: src/utils/validation.rs
// description: input validation for organization slugs, repository names and urls
// reference: input validation patterns

use crate::error::{MirrorError, Result};

pub struct Validator;

impl Validator {
    /// Repository names become a scratch directory component, so path
    /// separators and dot segments are rejected.
    pub fn validate_repo_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(MirrorError::Validation(
                "Repository name is empty".to_string(),
            ));
        }

        if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
            return Err(MirrorError::Validation(format!(
                "Repository name is not a single path component: {}",
                name
            )));
        }

        if name.chars().any(|c| c.is_control()) {
            return Err(MirrorError::Validation(format!(
                "Repository name contains control characters: {:?}",
                name
            )));
        }

        Ok(())
    }

    pub fn validate_org_slug(org: &str) -> Result<()> {
        let trimmed = org.trim();
        if trimmed.is_empty() {
            return Err(MirrorError::Configuration(
                "Organization slug is empty".to_string(),
            ));
        }

        if trimmed.contains('/') || trimmed.chars().any(char::is_whitespace) {
            return Err(MirrorError::Configuration(format!(
                "Invalid organization slug: {}",
                org
            )));
        }

        Ok(())
    }

    pub fn validate_url(url: &str) -> Result<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(MirrorError::InvalidUrl(format!(
                "unsupported URL scheme: {}",
                url
            )));
        }
        Ok(())
    }
}
