// CLI command implementations
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde_json::{json, Value};
use tagstream::{AudioFile, DecodeOptions, Metadata, StandardField};

use crate::cli::config::parse_fields;
use crate::cli::output::{OutputFormatter, ProgressBar};

fn open(path: &Path, options: &DecodeOptions) -> anyhow::Result<AudioFile> {
    AudioFile::open_with_options(path, options.clone()).with_context(|| format!("cannot read {}", path.display()))
}

/// Metadata as JSON, optionally reduced to the requested fields.
fn metadata_value(path: &Path, metadata: &Metadata, fields: Option<&[StandardField]>) -> anyhow::Result<Value> {
    let mut value = serde_json::to_value(metadata)?;
    if let (Some(fields), Some(obj)) = (fields, value.as_object_mut()) {
        let keep: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
        obj.retain(|key, _| key == "origin" || key == "file_type" || keep.contains(&key.as_str()));
    }
    if let Some(obj) = value.as_object_mut() {
        obj.entry("origin").or_insert_with(|| json!(path.display().to_string()));
    }
    Ok(value)
}

/// Read metadata from files
pub fn command_read(
    files: &[PathBuf],
    fields: Option<&str>,
    output: Option<&Path>,
    options: &DecodeOptions,
    formatter: &OutputFormatter,
) -> anyhow::Result<()> {
    let fields = fields.map(parse_fields).transpose()?;

    let mut writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout()),
    };

    let mut failures = 0;
    for path in files {
        let result = open(path, options).and_then(|audio| Ok(audio.read_metadata()?));
        match result {
            Ok(metadata) => {
                let value = metadata_value(path, &metadata, fields.as_deref())?;
                formatter.output_value(&value, &mut *writer)?;
            }
            Err(e) => {
                formatter.print_error(&format!("{:#}", e));
                failures += 1;
            }
        }
    }
    writer.flush()?;

    if failures > 0 {
        bail!("{} of {} files could not be read", failures, files.len());
    }
    Ok(())
}

/// Detect file format
pub fn command_detect(files: &[PathBuf], options: &DecodeOptions, formatter: &OutputFormatter) -> anyhow::Result<()> {
    for path in files {
        match open(path, options) {
            Ok(audio) => {
                let version = audio.version()?.unwrap_or_else(|| "N/A".to_string());
                println!("{}: {} (version: {})", path.display(), audio.file_type(), version);
            }
            Err(e) => formatter.print_error(&format!("{:#}", e)),
        }
    }
    Ok(())
}

/// Show file information
pub fn command_info(
    files: &[PathBuf],
    detailed: bool,
    options: &DecodeOptions,
    formatter: &OutputFormatter,
) -> anyhow::Result<()> {
    for path in files {
        let stat = match std::fs::metadata(path) {
            Ok(stat) => stat,
            Err(e) => {
                formatter.print_error(&format!("{}: {}", path.display(), e));
                continue;
            }
        };

        let mut info = json!({
            "path": path.display().to_string(),
            "size": stat.len(),
        });
        if let Ok(modified) = stat.modified() {
            let modified = chrono::DateTime::<chrono::Local>::from(modified);
            info["modified"] = json!(modified.format("%Y-%m-%d %H:%M:%S %z").to_string());
        }

        let audio = open(path, options)?;
        info["format"] = json!(audio.file_type().as_str());
        if let Some(version) = audio.version()? {
            info["version"] = json!(version);
        }

        if detailed {
            let metadata = audio.read_metadata()?;
            if let Some(stream) = &metadata.stream {
                info["stream"] = serde_json::to_value(stream)?;
            }
            info["pictures"] = json!(metadata.pictures.len());
            info["extra_fields"] = json!(metadata.extra.len());
        }

        formatter.output_value(&info, &mut io::stdout())?;
    }
    Ok(())
}

/// Export cover art
pub fn command_export_cover(
    file: &Path,
    output_dir: &Path,
    index: Option<usize>,
    options: &DecodeOptions,
    formatter: &OutputFormatter,
) -> anyhow::Result<()> {
    let metadata = open(file, options)?.read_metadata()?;
    let cover = match index {
        Some(index) => metadata
            .pictures
            .get(index)
            .with_context(|| format!("picture {} not found ({} present)", index, metadata.pictures.len()))?,
        None => metadata.cover().context("no cover art found")?,
    };

    let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or("cover");
    let name = match index {
        Some(index) => format!("{}.{}.{}", stem, index, cover.extension()),
        None => format!("{}.cover.{}", stem, cover.extension()),
    };
    std::fs::create_dir_all(output_dir).with_context(|| format!("cannot create {}", output_dir.display()))?;
    let target = output_dir.join(name);
    cover
        .save(&target)
        .with_context(|| format!("cannot write {}", target.display()))?;

    formatter.print_success(&format!("{} -> {} ({})", file.display(), target.display(), cover));
    Ok(())
}

/// Files in `directory` matching `pattern`; plain names match recursively.
pub fn find_files(directory: &Path, pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let glob_pattern = if pattern.contains('*') || pattern.contains('?') {
        directory.join(pattern)
    } else {
        directory.join("**").join(pattern)
    };
    let glob_pattern = glob_pattern.to_string_lossy().into_owned();

    let mut files = Vec::new();
    for entry in glob::glob(&glob_pattern).with_context(|| format!("invalid glob pattern {}", glob_pattern))? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => log::warn!("skipping unreadable path: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Batch process directory
pub fn command_batch(
    directory: &Path,
    pattern: &str,
    options: &DecodeOptions,
    formatter: &OutputFormatter,
) -> anyhow::Result<()> {
    let files = find_files(directory, pattern)?;
    if files.is_empty() {
        formatter.print_info("No files found matching pattern");
        return Ok(());
    }

    let mut progress = ProgressBar::new(files.len(), !formatter.quiet);
    let mut results = Vec::with_capacity(files.len());
    let mut errors = 0;
    for path in &files {
        progress.increment(&path.display().to_string());
        match open(path, options).and_then(|audio| Ok(audio.read_metadata()?)) {
            Ok(metadata) => results.push(metadata_value(path, &metadata, None)?),
            Err(e) => {
                formatter.print_error(&format!("{:#}", e));
                errors += 1;
            }
        }
    }

    let mut stdout = io::stdout();
    for value in &results {
        formatter.output_value(value, &mut stdout)?;
    }
    formatter.print_info(&format!("Completed: {} successful, {} errors", results.len(), errors));
    Ok(())
}
