use anyhow::{Context, Result};
use clap::ValueEnum;
use isle_sfc::{AnnotateOptions, ComponentRegistry};
use isle_ssr::Options;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, mpsc};
use std::thread;

/// Logged for every file a batch could not process.
pub const FAILURE_MESSAGE: &str = "could not process island render output";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TreeFormat {
    Json,
    Outline,
}

impl TreeFormat {
    fn extension(self) -> &'static str {
        match self {
            TreeFormat::Json => "tree.json",
            TreeFormat::Outline => "tree.txt",
        }
    }
}

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Written(PathBuf),
    /// Nothing to do for this file: not an island, no slots, no render function.
    Unchanged,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    /// Failed inputs with the rendered error chain.
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Where the outputs of a batch go: each input's directory, relative to the
/// deepest directory shared by all inputs, is mirrored under `dir`.
#[derive(Debug)]
pub struct OutputLayout {
    dir: PathBuf,
    base: PathBuf,
    claimed: Mutex<HashSet<PathBuf>>,
}

impl OutputLayout {
    pub fn new(dir: impl Into<PathBuf>, inputs: &[PathBuf]) -> Self {
        Self {
            dir: dir.into(),
            base: common_base(inputs),
            claimed: Mutex::new(HashSet::new()),
        }
    }

    /// Output path of `input` under the name `file_name`. Fails when another
    /// input of the batch already maps to the same path.
    pub fn path_for(&self, input: &Path, file_name: &OsStr) -> Result<PathBuf> {
        let parent = input.parent().unwrap_or(Path::new(""));
        let relative: PathBuf = parent
            .strip_prefix(&self.base)
            .unwrap_or(parent)
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        let path = self.dir.join(relative).join(file_name);

        let mut claimed = self
            .claimed
            .lock()
            .map_err(|_| anyhow::anyhow!("output registry poisoned"))?;
        if !claimed.insert(path.clone()) {
            anyhow::bail!("output {} is also written by another input", path.display());
        }
        Ok(path)
    }
}

fn common_base(inputs: &[PathBuf]) -> PathBuf {
    let mut parents = inputs.iter().map(|p| p.parent().unwrap_or(Path::new("")));
    let Some(first) = parents.next() else {
        return PathBuf::new();
    };
    parents.fold(first.to_path_buf(), |base, parent| {
        base.components()
            .zip(parent.components())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a)
            .collect()
    })
}

/// Loads helper names from a JSON file, or the defaults.
pub fn load_options(path: Option<&Path>) -> Result<Options> {
    let Some(path) = path else {
        return Ok(Options::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

pub fn load_registry(path: &Path) -> Result<ComponentRegistry> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let registry = ComponentRegistry::from_json(&text)
        .with_context(|| format!("invalid component registry {}", path.display()))?;
    log::debug!(
        "{} component(s), {} island(s)",
        registry.components().len(),
        registry.islands().count()
    );
    Ok(registry)
}

/// Annotates the slots of one SFC. Without a registry every input is
/// treated as an island.
pub fn annotate_file(
    input: &Path,
    registry: Option<&ComponentRegistry>,
    options: &AnnotateOptions,
    layout: &OutputLayout,
) -> Result<Outcome> {
    let src =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;
    let id = input.to_string_lossy();
    let annotated = match registry {
        Some(registry) => isle_sfc::annotate_slots(&src, &id, registry, options),
        None => isle_sfc::rewrite_slots(&src, options),
    }
    .with_context(|| format!("failed to annotate {}", input.display()))?;

    let Some(code) = annotated else {
        return Ok(Outcome::Unchanged);
    };
    let file_name = input.file_name().unwrap_or(input.as_os_str());
    write_output(&layout.path_for(input, file_name)?, &code)
}

/// Reconstructs the render tree of one compiled module.
pub fn tree_file(
    input: &Path,
    options: &Options,
    format: TreeFormat,
    layout: &OutputLayout,
) -> Result<Outcome> {
    let src =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;
    let tree = isle_ssr::reconstruct(&src, options)
        .with_context(|| format!("failed to reconstruct {}", input.display()))?;
    let Some(tree) = tree else {
        return Ok(Outcome::Unchanged);
    };

    let rendered = match format {
        TreeFormat::Json => serde_json::to_string_pretty(&tree).context("serialize tree")?,
        TreeFormat::Outline => tree.outline(),
    };
    let name = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("component");
    let file_name = format!("{name}.{}", format.extension());
    write_output(&layout.path_for(input, OsStr::new(&file_name))?, &rendered)
}

fn write_output(out_path: &Path, content: &str) -> Result<Outcome> {
    if let Some(dir) = out_path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    fs::write(out_path, content)
        .with_context(|| format!("failed to write {}", out_path.display()))?;
    Ok(Outcome::Written(out_path.to_path_buf()))
}

/// Runs `work` over `inputs` on `jobs` worker threads.
///
/// A failing file is logged and recorded; the remaining files are still
/// processed. The report lists files in input order.
pub fn run_batch<F>(inputs: &[PathBuf], jobs: usize, work: F) -> BatchReport
where
    F: Fn(&Path) -> Result<Outcome> + Sync,
{
    let jobs = jobs.clamp(1, inputs.len().max(1));
    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, Result<Outcome>)>();

    let mut results: Vec<Option<Result<Outcome>>> = Vec::new();
    results.resize_with(inputs.len(), || None);
    thread::scope(|scope| {
        for _ in 0..jobs {
            let tx = tx.clone();
            let (next, work) = (&next, &work);
            scope.spawn(move || {
                loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(input) = inputs.get(index) else {
                        break;
                    };
                    log::debug!("processing {}", input.display());
                    let result = panic::catch_unwind(AssertUnwindSafe(|| work(input.as_path())))
                        .unwrap_or_else(|_| Err(anyhow::anyhow!("panicked while processing")));
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);
        for (index, result) in rx {
            results[index] = Some(result);
        }
    });

    let mut report = BatchReport::default();
    for (input, result) in inputs.iter().zip(results) {
        match result {
            Some(Ok(Outcome::Written(path))) => {
                log::info!("{} -> {}", input.display(), path.display());
                report.written.push(path);
            }
            Some(Ok(Outcome::Unchanged)) => {
                log::debug!("{}: nothing to do", input.display());
                report.unchanged.push(input.clone());
            }
            Some(Err(err)) => {
                log::error!("{}: {FAILURE_MESSAGE}: {err:#}", input.display());
                report.failed.push((input.clone(), format!("{err:#}")));
            }
            None => {
                log::error!("{}: {FAILURE_MESSAGE}: worker stopped", input.display());
                report
                    .failed
                    .push((input.clone(), "worker stopped".to_string()));
            }
        }
    }
    report
}

/// Worker count when none is requested.
pub fn default_jobs() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}
