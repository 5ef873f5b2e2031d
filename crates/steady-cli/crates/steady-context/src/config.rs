use serde::{Deserialize, Serialize};
use steady_macro::{BuildMode, MacroOptions, DEFAULT_MACRO_MODULE, DEFAULT_TARGET};
use steady_prerender::PrerenderOptions;

/// Represents the optional `steady.config.json` at the project root.
///
/// Every key has a default and unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SteadyConfig {
    pub src_dir: String,
    pub output_dir: String,
    /// Transformed sources and the bundler's chunk output live here.
    pub work_dir: String,
    /// Page shell the rendered markup is appended to, relative to the project root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub public_path: String,
    pub macro_module: String,
    pub target: String,
    /// Node.js executable used for prerendering.
    pub node: String,
    pub prerender: PrerenderOptions,
}

impl Default for SteadyConfig {
    fn default() -> Self {
        Self {
            src_dir: "src".into(),
            output_dir: "dist".into(),
            work_dir: ".steady".into(),
            template: None,
            public_path: String::new(),
            macro_module: DEFAULT_MACRO_MODULE.into(),
            target: DEFAULT_TARGET.into(),
            node: "node".into(),
            prerender: PrerenderOptions::default(),
        }
    }
}

impl SteadyConfig {
    pub fn macro_options(&self, mode: BuildMode) -> MacroOptions {
        MacroOptions {
            mode,
            target: self.target.clone(),
            macro_module: self.macro_module.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config: SteadyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SteadyConfig::default());
        assert_eq!(config.work_dir, ".steady");
        assert_eq!(config.prerender.entry_chunk_name, "main");
    }

    #[test]
    fn test_partial_config_and_unknown_keys() {
        let config: SteadyConfig = serde_json::from_str(
            r#"{
                "outputDir": "public",
                "publicPath": "/assets/",
                "prerender": { "rendererChunkName": "render" },
                "plugins": ["ignored"]
            }"#,
        )
        .unwrap();
        assert_eq!(config.output_dir, "public");
        assert_eq!(config.src_dir, "src");
        assert_eq!(config.public_path, "/assets/");
        assert_eq!(config.prerender.renderer_chunk_name.as_deref(), Some("render"));
        assert!(config.prerender.include_stylesheets);
    }

    #[test]
    fn test_macro_options() {
        let config = SteadyConfig {
            target: "es2017".into(),
            macro_module: "@site/macro".into(),
            ..SteadyConfig::default()
        };
        let opts = config.macro_options(BuildMode::Development);
        assert_eq!(opts.mode, BuildMode::Development);
        assert_eq!(opts.target, "es2017");
        assert_eq!(opts.macro_module, "@site/macro");
    }
}
