use serde::Serialize;

use crate::chunk::{AssetManifest, CompiledChunk};
use crate::error::PrerenderError;

/// A chunk the host has accepted for evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleHandle(usize);

impl ModuleHandle {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// What turns the entry component into markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererRef {
    /// Default export of a separate renderer chunk, called as `(component, context)`.
    Chunk(ModuleHandle),
    /// The entry's default export is itself the render function, called as `(context)`.
    Entry,
    /// The host's built-in renderer.
    Default,
}

/// Build metadata visible to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderContext {
    pub mode: String,
    pub entry_chunk_name: String,
    pub assets: AssetManifest,
    pub public_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub component: ModuleHandle,
    pub renderer: RendererRef,
    pub context: RenderContext,
}

/// Evaluates compiled chunk text and runs the render call.
///
/// Chunks are only ever passed as text; a host must not read them from disk.
#[allow(async_fn_in_trait)]
pub trait ScriptHost {
    fn load(&mut self, chunk: &CompiledChunk) -> Result<ModuleHandle, PrerenderError>;

    async fn render(&mut self, request: RenderRequest) -> Result<String, PrerenderError>;

    /// Drop every chunk loaded for the current compilation.
    ///
    /// Handles issued before a reset are invalid afterwards.
    fn reset(&mut self);
}
