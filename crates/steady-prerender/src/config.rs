use serde::{Deserialize, Serialize};

/// Options the prerender step reads from the project configuration.
///
/// Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrerenderOptions {
    /// Chunk whose default export is the page component.
    pub entry_chunk_name: String,
    /// Chunk whose default export turns the component into markup.
    pub renderer_chunk_name: Option<String>,
    pub include_stylesheets: bool,
}

pub const DEFAULT_ENTRY_CHUNK: &str = "main";

impl Default for PrerenderOptions {
    fn default() -> Self {
        Self {
            entry_chunk_name: DEFAULT_ENTRY_CHUNK.to_string(),
            renderer_chunk_name: None,
            include_stylesheets: true,
        }
    }
}
