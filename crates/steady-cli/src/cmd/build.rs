use anyhow::{Context, Result};
use console::style;
use std::fs;
use std::path::Path;
use steady_context::project::{SteadyProject, MANIFEST_FILE};
use steady_macro::BuildMode;
use steady_prerender::{BuildHook, NodeHost, PrerenderOrchestrator};

pub async fn run(config: Option<&Path>, mode: BuildMode) -> Result<()> {
    let project = SteadyProject::load_cwd(config)?;
    let compilation = project.load_compilation()?;
    let shell = project.shell_template()?;

    println!(
        "{} '{}' ({} chunk(s), {} stylesheet(s), {} mode)",
        style("Prerendering").bold().cyan(),
        project.config.prerender.entry_chunk_name,
        compilation.chunks.len(),
        compilation.assets.css.len(),
        mode
    );

    let host = NodeHost::new(&project.config.node, &project.root, mode.as_str());
    let mut orchestrator = PrerenderOrchestrator::new(host, project.config.prerender.clone())
        .with_mode(mode.as_str())
        .with_public_path(project.config.public_path.as_str());
    let html = orchestrator
        .before_emit(compilation, shell)
        .await
        .context("Prerender failed, no document written")?;

    // Only touch the output directory once the page exists.
    let dist_dir = project.output_dir();
    if dist_dir.exists() {
        fs::remove_dir_all(&dist_dir)?;
    }
    fs::create_dir_all(&dist_dir)?;

    let index = dist_dir.join("index.html");
    fs::write(&index, &html).with_context(|| format!("Failed to write {}", index.display()))?;
    let copied = copy_assets(&project.chunks_dir(), &dist_dir)?;

    println!(
        "  {}  {}",
        style("+").green().bold(),
        index.strip_prefix(&project.root).unwrap_or(&index).display()
    );
    println!(
        "\n{} 1 page, {} asset(s) in {}/",
        style("Build complete:").green().bold(),
        copied,
        project.config.output_dir
    );
    Ok(())
}

/// Copy everything the bundler emitted except chunk code and the manifest.
fn copy_assets(from: &Path, to: &Path) -> Result<usize> {
    let mut count = 0;
    copy_assets_recursive(from, from, to, &mut count)?;
    Ok(count)
}

fn copy_assets_recursive(dir: &Path, base: &Path, to: &Path, count: &mut usize) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            copy_assets_recursive(&path, base, to, count)?;
            continue;
        }
        let is_chunk = path.extension().and_then(|e| e.to_str()) == Some("js");
        let is_manifest = path.parent() == Some(base) && path.file_name().and_then(|n| n.to_str()) == Some(MANIFEST_FILE);
        if is_chunk || is_manifest {
            continue;
        }
        let rel = path.strip_prefix(base).unwrap_or(&path);
        let target = to.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&path, &target).with_context(|| format!("Failed to copy {}", path.display()))?;
        *count += 1;
    }
    Ok(())
}
