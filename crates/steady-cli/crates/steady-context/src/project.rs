use crate::config::SteadyConfig;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use steady_prerender::{AssetManifest, Compilation, CompiledChunk};
use tracing::debug;

pub const CONFIG_FILE: &str = "steady.config.json";
pub const CHUNKS_DIR: &str = "chunks";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const DEFAULT_SHELL: &str = "<!DOCTYPE html>";

/// Files under `srcDir` whose presence makes the entry chunk a render function.
const RENDER_ENTRIES: &[&str] = &["_render.js", "_render.jsx", "_render.ts", "_render.tsx"];

/// A loaded Steady project, providing source collection and build output access.
#[derive(Debug, Clone)]
pub struct SteadyProject {
    pub root: PathBuf,
    pub config: SteadyConfig,
}

impl SteadyProject {
    /// Load a project from `dir`.
    ///
    /// `config_path` (relative to `dir` unless absolute) must exist when given;
    /// otherwise `steady.config.json` is read if present, defaults if not.
    pub fn load(dir: &Path, config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => {
                let p = dir.join(p);
                if !p.exists() {
                    bail!("Config file {} not found.", p.display());
                }
                p
            }
            None => dir.join(CONFIG_FILE),
        };

        let config = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            SteadyConfig::default()
        };

        Ok(Self {
            root: dir.to_path_buf(),
            config,
        })
    }

    /// Load a project from the current working directory.
    pub fn load_cwd(config_path: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::load(&cwd, config_path)
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join(&self.config.src_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.config.output_dir)
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.join(&self.config.work_dir)
    }

    /// Where transformed sources are written for the bundler.
    pub fn transformed_dir(&self) -> PathBuf {
        self.work_dir().join("src")
    }

    /// Where the bundler leaves its compiled chunks and stylesheets.
    pub fn chunks_dir(&self) -> PathBuf {
        self.work_dir().join(CHUNKS_DIR)
    }

    /// Collect all template modules under `srcDir`.
    ///
    /// Keyed by path relative to `srcDir` with `/` separators (e.g. `"pages/index.jsx"`).
    pub fn collect_sources(&self) -> Result<BTreeMap<String, String>> {
        let src_dir = self.src_dir();
        if !src_dir.exists() {
            bail!("No {}/ directory found.", self.config.src_dir);
        }
        let mut files = BTreeMap::new();
        collect_files_recursive(&src_dir, &src_dir, &mut files)?;
        Ok(files)
    }

    /// Files under `srcDir` that are not modules (stylesheets, images), relative paths.
    pub fn static_files(&self) -> Result<Vec<String>> {
        let src_dir = self.src_dir();
        let mut files = Vec::new();
        if src_dir.exists() {
            collect_static_recursive(&src_dir, &src_dir, &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    /// Whether the project provides its own render entry (`src/_render.js`).
    pub fn has_render_entry(&self) -> bool {
        let src_dir = self.src_dir();
        RENDER_ENTRIES.iter().any(|name| src_dir.join(name).exists())
    }

    /// Read the bundler's output directory into an in-memory compilation.
    ///
    /// `*.js` files become chunks named by their path without extension,
    /// `*.css` files become stylesheet assets. A `manifest.json` listing
    /// `{ "css": [...], "js": [...] }` fixes the asset order; without one the
    /// order is alphabetical.
    pub fn load_compilation(&self) -> Result<Compilation> {
        let dir = self.chunks_dir();
        if !dir.exists() {
            bail!(
                "No compiled chunks found in {}. Bundle {} into it first.",
                dir.display(),
                self.transformed_dir().display()
            );
        }

        let mut files = BTreeMap::new();
        collect_output_recursive(&dir, &dir, &mut files)?;

        let is_render_entry = self.has_render_entry();
        let mut chunks = Vec::new();
        let mut css = Vec::new();
        let mut js = Vec::new();
        for (rel, path) in &files {
            match extension(path) {
                Some("js") => {
                    let source_text = fs::read_to_string(path)
                        .with_context(|| format!("Failed to read chunk {}", path.display()))?;
                    let name = rel.strip_suffix(".js").unwrap_or(rel).to_string();
                    let is_entry_render_function =
                        is_render_entry && name == self.config.prerender.entry_chunk_name;
                    chunks.push(CompiledChunk {
                        name,
                        is_entry_render_function,
                        source_text,
                    });
                    js.push(rel.clone());
                }
                Some("css") => css.push(rel.clone()),
                _ => {}
            }
        }

        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.exists() {
            let raw = fs::read_to_string(&manifest_path)
                .with_context(|| format!("Failed to read {}", manifest_path.display()))?;
            let manifest: AssetManifest = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", manifest_path.display()))?;
            css = manifest.css;
            js = manifest.js;
        }

        let public = |rel: &String| format!("{}{}", self.config.public_path, rel);
        let assets = AssetManifest {
            css: css.iter().map(public).collect(),
            js: js.iter().map(public).collect(),
        };
        debug!(chunks = chunks.len(), css = assets.css.len(), "compilation loaded");

        Ok(Compilation { chunks, assets })
    }

    /// The page shell: the configured template file, or a bare doctype.
    pub fn shell_template(&self) -> Result<String> {
        match &self.config.template {
            Some(rel) => {
                let path = self.root.join(rel);
                fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read template {}", path.display()))
            }
            None => Ok(DEFAULT_SHELL.to_string()),
        }
    }
}

fn relative_key(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

/// Recursively collect template modules into the map.
/// Keys are relative to `base` (e.g. `pages/index.jsx`).
fn collect_files_recursive(
    dir: &Path,
    base: &Path,
    files: &mut BTreeMap<String, String>,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, base, files)?;
        } else if is_source_file(&path) {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            files.insert(relative_key(&path, base), content);
        }
    }
    Ok(())
}

fn collect_static_recursive(dir: &Path, base: &Path, files: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_static_recursive(&path, base, files)?;
        } else if !is_source_file(&path) {
            files.push(relative_key(&path, base));
        }
    }
    Ok(())
}

fn collect_output_recursive(
    dir: &Path,
    base: &Path,
    files: &mut BTreeMap<String, PathBuf>,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_output_recursive(&path, base, files)?;
        } else if matches!(extension(&path), Some("js" | "css")) {
            files.insert(relative_key(&path, base), path);
        }
    }
    Ok(())
}

pub fn is_source_file(path: &Path) -> bool {
    matches!(extension(path), Some("js" | "jsx" | "mjs" | "ts" | "tsx"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("steady-context-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_is_source_file() {
        assert!(is_source_file(Path::new("page.jsx")));
        assert!(is_source_file(Path::new("page.tsx")));
        assert!(is_source_file(Path::new("util.mjs")));
        assert!(!is_source_file(Path::new("style.css")));
        assert!(!is_source_file(Path::new("readme.md")));
    }

    #[test]
    fn test_load_without_config_uses_defaults() {
        let dir = scratch("defaults");
        let project = SteadyProject::load(&dir, None).unwrap();
        assert_eq!(project.config, SteadyConfig::default());
        assert_eq!(project.chunks_dir(), dir.join(".steady").join("chunks"));
        assert_eq!(project.shell_template().unwrap(), DEFAULT_SHELL);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = scratch("explicit");
        assert!(SteadyProject::load(&dir, Some(Path::new("other.json"))).is_err());

        write(&dir.join("other.json"), r#"{"outputDir":"out"}"#);
        let project = SteadyProject::load(&dir, Some(Path::new("other.json"))).unwrap();
        assert_eq!(project.output_dir(), dir.join("out"));
    }

    #[test]
    fn test_collect_sources() {
        let dir = scratch("sources");
        write(&dir.join("src/index.jsx"), "x");
        write(&dir.join("src/parts/nav.tsx"), "y");
        write(&dir.join("src/style.css"), "z");
        let project = SteadyProject::load(&dir, None).unwrap();
        let files = project.collect_sources().unwrap();
        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["index.jsx", "parts/nav.tsx"]);
        assert_eq!(project.static_files().unwrap(), vec!["style.css"]);
    }

    #[test]
    fn test_load_compilation_sorted() {
        let dir = scratch("compilation");
        write(&dir.join("steady.config.json"), r#"{"publicPath":"/static/"}"#);
        write(&dir.join(".steady/chunks/main.js"), "module.exports = 1;");
        write(&dir.join(".steady/chunks/b.css"), "");
        write(&dir.join(".steady/chunks/a.css"), "");
        let project = SteadyProject::load(&dir, None).unwrap();
        let compilation = project.load_compilation().unwrap();
        assert_eq!(compilation.chunk_names(), vec!["main"]);
        assert!(!compilation.chunks[0].is_entry_render_function);
        assert_eq!(compilation.assets.css, vec!["/static/a.css", "/static/b.css"]);
        assert_eq!(compilation.assets.js, vec!["/static/main.js"]);
    }

    #[test]
    fn test_load_compilation_manifest_order_and_render_entry() {
        let dir = scratch("manifest");
        write(&dir.join("src/_render.js"), "export default () => '';");
        write(&dir.join(".steady/chunks/main.js"), "module.exports = 1;");
        write(&dir.join(".steady/chunks/a.css"), "");
        write(&dir.join(".steady/chunks/b.css"), "");
        write(&dir.join(".steady/chunks/manifest.json"), r#"{"css":["b.css","a.css"],"js":["main.js"]}"#);
        let project = SteadyProject::load(&dir, None).unwrap();
        let compilation = project.load_compilation().unwrap();
        assert!(compilation.chunk("main").unwrap().is_entry_render_function);
        assert_eq!(compilation.assets.css, vec!["b.css", "a.css"]);
    }

    #[test]
    fn test_chunk_name_drops_one_extension() {
        let dir = scratch("doubleext");
        write(&dir.join(".steady/chunks/a.js.js"), "module.exports = 1;");
        write(&dir.join(".steady/chunks/pages/home.js"), "module.exports = 2;");
        let project = SteadyProject::load(&dir, None).unwrap();
        let compilation = project.load_compilation().unwrap();
        assert_eq!(compilation.chunk_names(), vec!["a.js", "pages/home"]);
        assert_eq!(compilation.assets.js, vec!["a.js.js", "pages/home.js"]);
    }

    #[test]
    fn test_missing_chunks_dir() {
        let dir = scratch("nochunks");
        let project = SteadyProject::load(&dir, None).unwrap();
        assert!(project.load_compilation().is_err());
    }
}
