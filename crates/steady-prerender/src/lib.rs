//! Build-time prerendering: load compiled chunks, render the page, link stylesheets.

mod chunk;
mod config;
mod document;
mod error;
mod host;
mod node;
mod orchestrator;

pub use chunk::{AssetManifest, Compilation, CompiledChunk};
pub use config::{PrerenderOptions, DEFAULT_ENTRY_CHUNK};
pub use document::{PageDocument, HEAD_CLOSE};
pub use error::PrerenderError;
pub use host::{ModuleHandle, RenderContext, RenderRequest, RendererRef, ScriptHost};
pub use node::{NodeHost, RESULT_MARKER};
pub use orchestrator::{BuildHook, PrerenderOrchestrator, Stage};
