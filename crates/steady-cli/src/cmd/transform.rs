use anyhow::{bail, Context, Result};
use console::style;
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use steady_context::project::SteadyProject;
use steady_macro::{transform_module, BuildMode, MacroError, MacroOptions, ModuleOutput};

use crate::report;

pub fn run(config: Option<&Path>, mode: BuildMode) -> Result<()> {
    let project = SteadyProject::load_cwd(config)?;
    transform_project(&project, mode)?;
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct TransformSummary {
    pub modules: usize,
    pub changed: usize,
    pub scripts: usize,
    pub failed: usize,
}

/// Transform every module under `srcDir` into the work directory.
///
/// Modules are independent: one failing does not stop the others, but any
/// failure makes the whole run an error.
pub fn transform_project(project: &SteadyProject, mode: BuildMode) -> Result<TransformSummary> {
    let files = project.collect_sources()?;
    let options = project.config.macro_options(mode);
    let out_dir = project.transformed_dir();

    println!(
        "{} {} module(s) in {} mode",
        style("Transforming").bold().cyan(),
        files.len(),
        mode
    );

    let results: Vec<(&String, Result<ModuleOutput, MacroError>)> = files
        .par_iter()
        .map(|(rel, source)| (rel, transform_source(rel, source, &options)))
        .collect();

    let mut summary = TransformSummary {
        modules: files.len(),
        ..TransformSummary::default()
    };
    for (rel, result) in results {
        match result {
            Ok(output) => {
                write_output(&out_dir, rel, &output.code)?;
                if output.changed {
                    summary.changed += 1;
                    summary.scripts += output.scripts_generated;
                    println!(
                        "  {}  {} {}",
                        style("~").green().bold(),
                        rel,
                        style(format!("({} script(s))", output.scripts_generated)).dim()
                    );
                }
            }
            Err(err) => {
                summary.failed += 1;
                eprint!("{}", report::render(rel, &files[rel], &err));
            }
        }
    }

    for rel in project.static_files()? {
        let target = out_dir.join(&rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(project.src_dir().join(&rel), &target)
            .with_context(|| format!("Failed to copy {rel}"))?;
    }

    if summary.failed > 0 {
        bail!("{} of {} module(s) failed to transform", summary.failed, summary.modules);
    }

    println!(
        "{} {} module(s) rewritten, {} script(s) generated -> {}",
        style("Done.").green().bold(),
        summary.changed,
        summary.scripts,
        out_dir
            .strip_prefix(&project.root)
            .unwrap_or(&out_dir)
            .display()
    );
    Ok(summary)
}

pub fn transform_source(rel: &str, source: &str, options: &MacroOptions) -> Result<ModuleOutput, MacroError> {
    tracing::debug!(module = rel, "transforming");
    transform_module(source, Some(Path::new(rel)), options)
}

pub fn write_output(out_dir: &Path, rel: &str, code: &str) -> Result<()> {
    let path = out_dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, code).with_context(|| format!("Failed to write {}", path.display()))
}
