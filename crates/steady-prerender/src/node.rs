use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::chunk::CompiledChunk;
use crate::error::PrerenderError;
use crate::host::{ModuleHandle, RenderContext, RenderRequest, RendererRef, ScriptHost};

/// Script run by `node -e`; reads the payload from stdin.
const BOOTSTRAP: &str = include_str!("bootstrap.js");

/// Prefix of the stdout line that carries the result.
pub const RESULT_MARKER: &str = "__STEADY_RESULT__";

/// [`ScriptHost`] that evaluates chunks inside a Node.js child process.
///
/// Chunk text is piped over stdin and compiled in memory; `cwd` is the
/// project root, so `require` inside chunks resolves against its `node_modules`.
#[derive(Debug, Clone)]
pub struct NodeHost {
    node: PathBuf,
    cwd: PathBuf,
    mode: String,
    chunks: Vec<LoadedChunk>,
}

#[derive(Debug, Clone)]
struct LoadedChunk {
    name: String,
    source: String,
}

impl NodeHost {
    pub fn new(node: impl Into<PathBuf>, cwd: impl Into<PathBuf>, mode: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            cwd: cwd.into(),
            mode: mode.into(),
            chunks: Vec::new(),
        }
    }

}

impl ScriptHost for NodeHost {
    fn load(&mut self, chunk: &CompiledChunk) -> Result<ModuleHandle, PrerenderError> {
        if chunk.source_text.trim().is_empty() {
            return Err(PrerenderError::Load {
                chunk: chunk.name.clone(),
                message: "chunk has no source".into(),
            });
        }
        self.chunks.push(LoadedChunk {
            name: chunk.name.clone(),
            source: chunk.source_text.clone(),
        });
        debug!(chunk = %chunk.name, bytes = chunk.source_text.len(), "chunk queued for node");
        Ok(ModuleHandle::new(self.chunks.len() - 1))
    }

    async fn render(&mut self, request: RenderRequest) -> Result<String, PrerenderError> {
        // Chunks are sent once and never kept past this render.
        let chunks = std::mem::take(&mut self.chunks);
        let payload = build_payload(&self.cwd, &chunks, &request)?;
        drop(chunks);
        info!(node = %self.node.display(), renderer = ?request.renderer, "rendering page in node");

        let mut child = Command::new(&self.node)
            .arg("-e")
            .arg(BOOTSTRAP)
            .current_dir(&self.cwd)
            .env("NODE_ENV", &self.mode)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.node, e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PrerenderError::host("node stdin is not available"))?;
        stdin
            .write_all(payload.as_bytes())
            .await
            .map_err(|e| PrerenderError::host(format!("failed to send chunks to node: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| PrerenderError::host(format!("failed to wait for node: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        parse_response(&stdout, &stderr)
    }

    fn reset(&mut self) {
        self.chunks.clear();
    }
}

fn spawn_error(node: &Path, err: std::io::Error) -> PrerenderError {
    if err.kind() == ErrorKind::NotFound {
        PrerenderError::MissingDependency {
            dependency: "node".into(),
            message: format!(
                "`{}` was not found; install Node.js or set \"node\" in steady.config.json",
                node.display()
            ),
        }
    } else {
        PrerenderError::host(format!("failed to start `{}`: {err}", node.display()))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Payload<'a> {
    cwd: &'a Path,
    chunks: Vec<PayloadChunk<'a>>,
    component: usize,
    renderer: PayloadRenderer,
    context: &'a RenderContext,
}

#[derive(Serialize)]
struct PayloadChunk<'a> {
    name: &'a str,
    source: &'a str,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum PayloadRenderer {
    Chunk { index: usize },
    Entry,
    Default,
}

fn build_payload(
    cwd: &Path,
    chunks: &[LoadedChunk],
    request: &RenderRequest,
) -> Result<String, PrerenderError> {
    let renderer = match request.renderer {
        RendererRef::Chunk(handle) => PayloadRenderer::Chunk {
            index: handle.index(),
        },
        RendererRef::Entry => PayloadRenderer::Entry,
        RendererRef::Default => PayloadRenderer::Default,
    };
    let payload = Payload {
        cwd,
        chunks: chunks
            .iter()
            .map(|c| PayloadChunk {
                name: &c.name,
                source: &c.source,
            })
            .collect(),
        component: request.component.index(),
        renderer,
        context: &request.context,
    };
    serde_json::to_string(&payload)
        .map_err(|e| PrerenderError::host(format!("failed to encode render payload: {e}")))
}

#[derive(Debug, Deserialize)]
struct Response {
    ok: bool,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    chunk: Option<String>,
    #[serde(default)]
    dependency: Option<String>,
    #[serde(default)]
    message: String,
}

/// Read the marked result line out of node's stdout.
///
/// Anything the chunks printed themselves is passed to the debug log.
fn parse_response(stdout: &str, stderr: &str) -> Result<String, PrerenderError> {
    let mut result = None;
    for line in stdout.lines() {
        match line.strip_prefix(RESULT_MARKER) {
            Some(json) => result = Some(json),
            None if !line.is_empty() => debug!(target: "steady::node", "{line}"),
            None => {}
        }
    }

    let Some(json) = result else {
        let detail = stderr.trim();
        return Err(PrerenderError::host(if detail.is_empty() {
            "node exited without a result".to_string()
        } else {
            format!("node exited without a result: {detail}")
        }));
    };

    let response: Response = serde_json::from_str(json)
        .map_err(|e| PrerenderError::host(format!("unreadable result from node: {e}")))?;

    if response.ok {
        return response
            .html
            .ok_or_else(|| PrerenderError::host("node result carries no markup"));
    }

    Err(match response.kind.as_str() {
        "missing-dependency" => PrerenderError::MissingDependency {
            dependency: response.dependency.unwrap_or_default(),
            message: response.message,
        },
        "load" => PrerenderError::Load {
            chunk: response.chunk.unwrap_or_default(),
            message: response.message,
        },
        "render" => PrerenderError::Render {
            message: response.message,
        },
        _ => PrerenderError::Host {
            message: response.message,
        },
    })
}
