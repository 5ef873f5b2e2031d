use std::fmt;

use tracing::{debug, error, info};

use crate::chunk::{Compilation, CompiledChunk};
use crate::config::PrerenderOptions;
use crate::document::PageDocument;
use crate::error::PrerenderError;
use crate::host::{RenderContext, RenderRequest, RendererRef, ScriptHost};

/// Where a prerender currently is. `Fail` can follow any other stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitCompilation,
    LocateChunks,
    LoadEntry,
    Render,
    InjectStyles,
    Done,
    Fail,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::AwaitCompilation => "await-compilation",
            Stage::LocateChunks => "locate-chunks",
            Stage::LoadEntry => "load-entry",
            Stage::Render => "render",
            Stage::InjectStyles => "inject-styles",
            Stage::Done => "done",
            Stage::Fail => "fail",
        };
        f.write_str(name)
    }
}

/// The bundler-side hook invoked once per compilation before the page is emitted.
#[allow(async_fn_in_trait)]
pub trait BuildHook {
    async fn before_emit(&mut self, compilation: Compilation, html: String) -> Result<String, PrerenderError>;
}

/// Turns one build's compiled chunks into the final page.
pub struct PrerenderOrchestrator<H> {
    host: H,
    options: PrerenderOptions,
    mode: String,
    public_path: String,
    stage: Stage,
}

impl<H: ScriptHost> PrerenderOrchestrator<H> {
    pub fn new(host: H, options: PrerenderOptions) -> Self {
        Self {
            host,
            options,
            mode: "production".to_string(),
            public_path: String::new(),
            stage: Stage::AwaitCompilation,
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn with_public_path(mut self, public_path: impl Into<String>) -> Self {
        self.public_path = public_path.into();
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Render the page for `compilation` on top of `shell`.
    ///
    /// The compilation is consumed and the host is reset afterwards, on success
    /// and on failure alike; nothing from it outlives the returned document.
    pub async fn process(&mut self, compilation: Compilation, shell: &str) -> Result<PageDocument, PrerenderError> {
        self.stage = Stage::AwaitCompilation;
        let result = self.run(compilation, shell).await;
        self.host.reset();
        match result {
            Ok(document) => {
                self.advance(Stage::Done);
                Ok(document)
            }
            Err(err) => {
                error!(stage = %self.stage, "prerender failed: {err}");
                self.stage = Stage::Fail;
                Err(err)
            }
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!(from = %self.stage, to = %next, "prerender stage");
        self.stage = next;
    }

    fn locate<'c>(
        &self,
        compilation: &'c Compilation,
        role: &str,
        name: &str,
    ) -> Result<&'c CompiledChunk, PrerenderError> {
        let found = compilation.chunk(name);
        debug!(role, name, found = found.is_some(), "chunk lookup");
        found.ok_or_else(|| PrerenderError::ChunkResolution {
            role: role.to_string(),
            name: name.to_string(),
            available: compilation.chunk_names(),
        })
    }

    async fn run(&mut self, compilation: Compilation, shell: &str) -> Result<PageDocument, PrerenderError> {
        self.advance(Stage::LocateChunks);
        let entry = self.locate(&compilation, "entry", &self.options.entry_chunk_name)?;
        let renderer_chunk = match &self.options.renderer_chunk_name {
            Some(name) => Some(self.locate(&compilation, "renderer", name)?),
            None => None,
        };

        self.advance(Stage::LoadEntry);
        let component = self.host.load(entry)?;
        let renderer = match renderer_chunk {
            Some(chunk) => RendererRef::Chunk(self.host.load(chunk)?),
            None if entry.is_entry_render_function => RendererRef::Entry,
            None => RendererRef::Default,
        };

        self.advance(Stage::Render);
        let context = RenderContext {
            mode: self.mode.clone(),
            entry_chunk_name: entry.name.clone(),
            assets: compilation.assets.clone(),
            public_path: self.public_path.clone(),
        };
        let markup = self
            .host
            .render(RenderRequest {
                component,
                renderer,
                context,
            })
            .await?;
        let mut document = PageDocument::assemble(shell, &markup);

        self.advance(Stage::InjectStyles);
        if self.options.include_stylesheets {
            let linked = document.inject_stylesheets(&compilation.assets.css);
            debug!(linked, "stylesheets injected");
        }

        info!(
            entry = %entry.name,
            renderer = ?renderer,
            bytes = markup.len(),
            "page prerendered"
        );
        Ok(document)
    }
}

impl<H: ScriptHost> BuildHook for PrerenderOrchestrator<H> {
    async fn before_emit(&mut self, compilation: Compilation, html: String) -> Result<String, PrerenderError> {
        self.process(compilation, &html).await.map(PageDocument::into_html)
    }
}
