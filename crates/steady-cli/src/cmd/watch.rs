use anyhow::Result;
use console::style;
use notify::{Event, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use steady_context::project::{is_source_file, SteadyProject};
use steady_macro::{BuildMode, MacroOptions};
use tokio::sync::mpsc;

use crate::cmd::transform::{transform_project, transform_source, write_output};
use crate::report;

const SETTLE: Duration = Duration::from_millis(100);

pub async fn run(config: Option<&Path>) -> Result<()> {
    let project = SteadyProject::load_cwd(config)?;
    let mode = BuildMode::Development;
    if let Err(e) = transform_project(&project, mode) {
        eprintln!("{} {e:#}", style("Error:").red().bold());
    }

    let src_dir = project.src_dir();
    let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
    let mut watcher = notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
        if let Ok(event) = res {
            for path in event.paths {
                let _ = tx.send(path);
            }
        }
    })?;
    watcher.watch(&src_dir, RecursiveMode::Recursive)?;

    println!(
        "{} {} {}",
        style("Watching").bold().cyan(),
        src_dir.strip_prefix(&project.root).unwrap_or(&src_dir).display(),
        style("(Ctrl+C to stop)").dim()
    );

    let options = project.config.macro_options(mode);
    loop {
        let first = tokio::select! {
            path = rx.recv() => path,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(first) = first else {
            break;
        };

        // Editors emit bursts of events per save; take them as one batch.
        tokio::time::sleep(SETTLE).await;
        let mut changed = BTreeSet::from([first]);
        while let Ok(path) = rx.try_recv() {
            changed.insert(path);
        }

        for path in changed {
            if let Err(e) = refresh(&project, &options, &path) {
                eprintln!("{} {e:#}", style("Error:").red().bold());
            }
        }
    }

    println!("{}", style("Stopped.").dim());
    Ok(())
}

/// Bring the transformed copy of one changed source path up to date.
fn refresh(project: &SteadyProject, options: &MacroOptions, path: &Path) -> Result<()> {
    let src_dir = project.src_dir();
    let Ok(rel) = path.strip_prefix(&src_dir) else {
        return Ok(());
    };
    let rel = rel.to_string_lossy().replace('\\', "/");
    let target = project.transformed_dir().join(&rel);

    if !path.exists() {
        if target.is_file() {
            fs::remove_file(&target)?;
            println!("  {}  {}", style("-").red().bold(), rel);
        }
        return Ok(());
    }
    if path.is_dir() {
        return Ok(());
    }

    if !is_source_file(path) {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &target)?;
        println!("  {}  {}", style("=").dim(), rel);
        return Ok(());
    }

    let source = fs::read_to_string(path)?;
    match transform_source(&rel, &source, options) {
        Ok(output) => {
            write_output(&project.transformed_dir(), &rel, &output.code)?;
            println!(
                "  {}  {} {}",
                style("~").green().bold(),
                rel,
                style(format!("({} script(s))", output.scripts_generated)).dim()
            );
        }
        Err(err) => eprint!("{}", report::render(&rel, &source, &err)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_tracks_source_changes() {
        let dir = std::env::temp_dir().join(format!("steady-cli-watch-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("src")).unwrap();
        let project = SteadyProject::load(&dir, None).unwrap();
        let options = project.config.macro_options(BuildMode::Development);

        let page = dir.join("src/page.jsx");
        fs::write(&page, "import { Window } from \"steady/macro\";\nexport default () => <Window onLoad={f}><p /></Window>;\n").unwrap();
        refresh(&project, &options, &page).unwrap();
        let out = fs::read_to_string(dir.join(".steady/src/page.jsx")).unwrap();
        assert!(out.contains("window.addEventListener"));

        fs::remove_file(&page).unwrap();
        refresh(&project, &options, &page).unwrap();
        assert!(!dir.join(".steady/src/page.jsx").exists());

        // Paths outside srcDir are ignored.
        refresh(&project, &options, &dir.join("steady.config.json")).unwrap();
    }
}
