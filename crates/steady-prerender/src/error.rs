use thiserror::Error;

/// Why a prerender could not produce a document. Every variant aborts the build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrerenderError {
    #[error("expected to find {role} chunk `{name}`, found: [{}]", .available.join(", "))]
    ChunkResolution {
        /// `entry` or `renderer`.
        role: String,
        name: String,
        available: Vec<String>,
    },

    #[error("failed to load chunk `{chunk}`: {message}")]
    Load { chunk: String, message: String },

    #[error("missing dependency `{dependency}`: {message}")]
    MissingDependency { dependency: String, message: String },

    #[error("render failed: {message}")]
    Render { message: String },

    #[error("script host failed: {message}")]
    Host { message: String },
}

impl PrerenderError {
    pub(crate) fn host(message: impl Into<String>) -> Self {
        PrerenderError::Host {
            message: message.into(),
        }
    }
}
