use serde::{Deserialize, Serialize};

/// One named unit of compiled output, held in memory for a single build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledChunk {
    pub name: String,
    /// The chunk's default export renders the page itself instead of being a component.
    pub is_entry_render_function: bool,
    pub source_text: String,
}

impl CompiledChunk {
    pub fn new(name: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_entry_render_function: false,
            source_text: source_text.into(),
        }
    }
}

/// Public URLs of the build's emitted assets, in emit order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    #[serde(default)]
    pub css: Vec<String>,
    #[serde(default)]
    pub js: Vec<String>,
}

/// Everything the bundler hands over once a build's compilation has settled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compilation {
    pub chunks: Vec<CompiledChunk>,
    pub assets: AssetManifest,
}

impl Compilation {
    pub fn chunk(&self, name: &str) -> Option<&CompiledChunk> {
        self.chunks.iter().find(|c| c.name == name)
    }

    pub fn chunk_names(&self) -> Vec<String> {
        self.chunks.iter().map(|c| c.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_lookup() {
        let mut main = CompiledChunk::new("main", "module.exports = 1;");
        main.is_entry_render_function = true;
        let compilation = Compilation {
            chunks: vec![main, CompiledChunk::new("vendor", "")],
            assets: AssetManifest::default(),
        };
        assert!(compilation.chunk("main").unwrap().is_entry_render_function);
        assert!(!compilation.chunk("vendor").unwrap().is_entry_render_function);
        assert!(compilation.chunk("render").is_none());
        assert_eq!(compilation.chunk_names(), vec!["main", "vendor"]);
    }

    #[test]
    fn test_manifest_tolerates_missing_lists() {
        let manifest: AssetManifest = serde_json::from_str(r#"{"css":["/a.css"]}"#).unwrap();
        assert_eq!(manifest.css, vec!["/a.css"]);
        assert!(manifest.js.is_empty());
    }
}
