use thiserror::Error;

/// Recoverable extraction conditions.
///
/// None of these abort a document: the owning step records the `Display`
/// text as a record warning and carries on with the field unset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("malformed number: {token:?}")]
    MalformedNumber { token: String },

    #[error("missing anchor {anchor:?}: {fallback}")]
    MissingAnchor {
        anchor: &'static str,
        fallback: &'static str,
    },

    #[error("unrecognized template, extracting with the general layout")]
    UnrecognizedTemplate,
}

impl ExtractError {
    pub fn malformed(token: impl Into<String>) -> Self {
        Self::MalformedNumber {
            token: token.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("cannot merge an empty group")]
    EmptyMergeGroup,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_render_readably() {
        assert_eq!(
            ExtractError::malformed("1,2,3").to_string(),
            "malformed number: \"1,2,3\""
        );
        let missing = ExtractError::MissingAnchor {
            anchor: "EMPRESA",
            fallback: "scanned whole text",
        };
        assert_eq!(
            missing.to_string(),
            "missing anchor \"EMPRESA\": scanned whole text"
        );
    }
}
