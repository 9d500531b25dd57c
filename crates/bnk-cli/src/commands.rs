use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use bnk_codec::{BankConfig, BankDocument, MediaEntry, ObjectKind, SoundMetadata};
use bnk_types::{MediaId, ObjectId};
use colored::Colorize;
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Info(args) => cmd_info(&args.bank, &config, format),
        Command::List(args) => cmd_list(&args.bank, &config, format),
        Command::Objects(args) => cmd_objects(args, &config, format),
        Command::Extract(args) => cmd_extract(args, &config),
        Command::Replace(args) => cmd_replace(args, &config),
        Command::Verify(args) => cmd_verify(&args.bank, &config, format),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<BankConfig> {
    let mut config = match &cli.config {
        Some(path) => BankConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BankConfig::default(),
    };
    if let Some(endian) = cli.endian {
        config.endian = endian.into();
    }
    debug!(?config, "effective config");
    Ok(config)
}

fn open_bank(path: &Path, config: &BankConfig) -> anyhow::Result<BankDocument> {
    BankDocument::open(path, config.clone())
        .with_context(|| format!("reading bank {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_info(path: &Path, config: &BankConfig, format: OutputFormat) -> anyhow::Result<()> {
    let doc = open_bank(path, config)?;
    let summary = doc.summary()?;
    if format == OutputFormat::Json {
        return print_json(&summary);
    }
    println!("{} {}", "Bank".bold(), path.display());
    println!("  Byte order: {}", summary.endian.name().cyan());
    println!("  Header:     {} bytes", summary.header_len);
    println!(
        "  Media:      {} entries, {} bytes of data",
        summary.media_count.to_string().bold(),
        summary.data_len
    );
    println!("  Objects:    {}", summary.object_count.to_string().bold());
    println!("  Trailing:   {} bytes", summary.trailing_len);
    Ok(())
}

fn cmd_list(path: &Path, config: &BankConfig, format: OutputFormat) -> anyhow::Result<()> {
    let doc = open_bank(path, config)?;
    let entries = doc.entries()?;
    if format == OutputFormat::Json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No embedded media.");
        return Ok(());
    }
    println!("{:>12}  {:>10}  {:>10}", "ID".bold(), "OFFSET".bold(), "SIZE".bold());
    for MediaEntry { id, offset, size } in entries {
        println!("{:>12}  {:>10}  {:>10}", id.to_string().yellow(), offset, size);
    }
    Ok(())
}

#[derive(Serialize)]
struct ObjectRow {
    id: ObjectId,
    kind: &'static str,
    code: u8,
    size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sound: Option<SoundMetadata>,
}

fn cmd_objects(args: ObjectsArgs, config: &BankConfig, format: OutputFormat) -> anyhow::Result<()> {
    let filter = match &args.kind {
        Some(name) => Some(
            ObjectKind::from_name(name)
                .with_context(|| format!("unknown object kind {name:?}"))?,
        ),
        None => None,
    };
    let doc = open_bank(&args.bank, config)?;
    let rows = doc
        .hierarchy()?
        .objects()
        .iter()
        .filter(|obj| filter.map_or(true, |kind| obj.kind == kind))
        .map(|obj| -> anyhow::Result<ObjectRow> {
            Ok(ObjectRow {
                id: obj.id,
                kind: obj.kind.name(),
                code: obj.kind.code(),
                size: obj.size(),
                sound: doc.sound_metadata(obj.id)?,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if format == OutputFormat::Json {
        return print_json(&rows);
    }
    for row in &rows {
        println!(
            "{:>12}  {:<24} {:>8} bytes",
            row.id.to_string().yellow(),
            row.kind.cyan(),
            row.size
        );
        if let Some(sound) = &row.sound {
            let size = sound
                .media_size
                .map_or_else(|| "-".to_string(), |s| s.to_string());
            println!(
                "{:>14}media {} ({:?}), source {}, offset {}, size {}",
                "",
                sound.media_id.to_string().yellow(),
                sound.fetch_mode,
                sound.source_id,
                sound.media_offset,
                size
            );
        }
    }
    println!("{} objects", rows.len().to_string().bold());
    Ok(())
}

fn cmd_extract(args: ExtractArgs, config: &BankConfig) -> anyhow::Result<()> {
    let doc = open_bank(&args.bank, config)?;
    if let Some(id) = args.id {
        let bytes = doc.get(id)?;
        fs::write(&args.output, &bytes)
            .with_context(|| format!("writing {}", args.output.display()))?;
        println!(
            "{} media {} ({} bytes) -> {}",
            "✓".green().bold(),
            id.to_string().yellow(),
            bytes.len(),
            args.output.display()
        );
        return Ok(());
    }

    fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let entries = doc.entries()?;
    for entry in entries {
        let dest = args.output.join(format!("{}.wem", entry.id));
        fs::write(&dest, doc.get(entry.id)?)
            .with_context(|| format!("writing {}", dest.display()))?;
        debug!(id = %entry.id, path = %dest.display(), "extracted");
    }
    println!(
        "{} extracted {} media into {}",
        "✓".green().bold(),
        entries.len(),
        args.output.display()
    );
    Ok(())
}

/// Files named `<id>.wem` under `dir`, keyed by id.
fn scan_replacement_dir(dir: &Path) -> anyhow::Result<BTreeMap<MediaId, PathBuf>> {
    let mut found = BTreeMap::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.with_context(|| format!("scanning {}", dir.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some("wem")
        {
            continue;
        }
        let Some(id) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<MediaId>().ok())
        else {
            warn!(path = %path.display(), "skipping file without a media id name");
            continue;
        };
        found.insert(id, path.to_path_buf());
    }
    Ok(found)
}

fn cmd_replace(args: ReplaceArgs, config: &BankConfig) -> anyhow::Result<()> {
    let mut doc = open_bank(&args.bank, config)?;

    let mut sources = BTreeMap::new();
    if let Some(dir) = &args.from_dir {
        for (id, path) in scan_replacement_dir(dir)? {
            if doc.bank()?.resources().contains(id) {
                sources.insert(id, path);
            } else {
                warn!(%id, path = %path.display(), "no such media in bank, skipping");
            }
        }
    }
    // Explicit pairs win over directory matches.
    for spec in &args.replacements {
        sources.insert(spec.id, spec.path.clone());
    }
    if sources.is_empty() {
        bail!("nothing to replace: pass -r ID=FILE or --from-dir");
    }

    for (id, path) in &sources {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let old = doc.get(*id)?.len();
        let new = bytes.len();
        doc.set_replacement(*id, bytes)?;
        println!(
            "  {} {}  {} -> {} bytes  ({})",
            "replace".green(),
            id.to_string().yellow(),
            old,
            new,
            path.display()
        );
    }

    doc.save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!(
        "{} wrote {} with {} replaced media",
        "✓".green().bold(),
        args.output.display(),
        sources.len()
    );
    Ok(())
}

#[derive(Serialize)]
struct VerifyReport {
    identical: bool,
    original_len: usize,
    rewritten_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_difference: Option<usize>,
}

fn cmd_verify(path: &Path, config: &BankConfig, format: OutputFormat) -> anyhow::Result<()> {
    let original = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let doc = open_bank(path, config)?;
    let rewritten = doc.to_bytes()?;

    let first_difference = original
        .iter()
        .zip(&rewritten)
        .position(|(a, b)| a != b)
        .or_else(|| (original.len() != rewritten.len()).then(|| original.len().min(rewritten.len())));
    let report = VerifyReport {
        identical: first_difference.is_none(),
        original_len: original.len(),
        rewritten_len: rewritten.len(),
        first_difference,
    };

    if format == OutputFormat::Json {
        print_json(&report)?;
    } else if report.identical {
        println!("{} {} rewrites byte for byte", "✓".green().bold(), path.display());
    } else {
        println!(
            "{} {} differs after rewrite ({} vs {} bytes)",
            "✗".red().bold(),
            path.display(),
            report.original_len,
            report.rewritten_len
        );
    }
    if let Some(offset) = report.first_difference {
        bail!("rewrite differs from source at byte {offset}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_bank() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(b"BKHD\x04\0\0\0\x8c\0\0\0");
        b.extend_from_slice(b"DIDX\x18\0\0\0");
        for v in [7u32, 0, 3, 8, 16, 2] {
            b.extend_from_slice(&v.to_le_bytes());
        }
        b.extend_from_slice(b"DATA\x12\0\0\0");
        b.extend_from_slice(b"abc");
        b.extend_from_slice(&[0; 13]);
        b.extend_from_slice(b"de");
        b.extend_from_slice(b"HIRC\x04\0\0\0\0\0\0\0");
        b
    }

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["bnkw"];
        argv.extend_from_slice(args);
        clap::Parser::try_parse_from(argv).unwrap()
    }

    #[test]
    fn extract_replace_verify() {
        let dir = tempfile::tempdir().unwrap();
        let bank = dir.path().join("a.bnk");
        fs::write(&bank, tiny_bank()).unwrap();
        let bank_str = bank.to_str().unwrap();

        let media = dir.path().join("media");
        let media_str = media.to_str().unwrap();
        run_command(cli(&["extract", bank_str, "--all", "-o", media_str])).unwrap();
        assert_eq!(fs::read(media.join("7.wem")).unwrap(), b"abc");
        assert_eq!(fs::read(media.join("8.wem")).unwrap(), b"de");

        run_command(cli(&["verify", bank_str])).unwrap();

        fs::write(media.join("8.wem"), b"a longer replacement").unwrap();
        fs::write(media.join("notes.txt"), b"ignored").unwrap();
        let out = dir.path().join("b.bnk");
        let out_str = out.to_str().unwrap();
        run_command(cli(&["replace", bank_str, "--from-dir", media_str, "-o", out_str])).unwrap();

        let doc = BankDocument::open(&out, BankConfig::default()).unwrap();
        assert_eq!(doc.get(MediaId::new(7)).unwrap().as_ref(), b"abc");
        assert_eq!(doc.get(MediaId::new(8)).unwrap().as_ref(), b"a longer replacement");
    }

    #[test]
    fn replace_without_sources_fails() {
        let dir = tempfile::tempdir().unwrap();
        let bank = dir.path().join("a.bnk");
        fs::write(&bank, tiny_bank()).unwrap();
        let out = dir.path().join("b.bnk");
        let err = run_command(cli(&[
            "replace",
            bank.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("nothing to replace"));
        assert!(!out.exists());
    }

    #[test]
    fn unknown_kind_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let bank = dir.path().join("a.bnk");
        fs::write(&bank, tiny_bank()).unwrap();
        let err = run_command(cli(&["objects", bank.to_str().unwrap(), "--kind", "Nope"]))
            .unwrap_err();
        assert!(err.to_string().contains("unknown object kind"));
    }

    #[test]
    fn missing_bank_has_context() {
        let err = run_command(cli(&["info", "/nonexistent/x.bnk"])).unwrap_err();
        assert!(err.to_string().contains("reading bank"));
    }
}
