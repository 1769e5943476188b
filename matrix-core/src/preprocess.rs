//! File Preprocessor (spec.md §4.2), grounded on
//! `original_source/brokerage/file_utils.py`. Each transformation returns a
//! new readable file inside a scoped temp directory; the directory is
//! released deterministically on drop, as `tempfile::TempDir` already
//! guarantees (the source does the same with testfixtures' `TempDirectory`
//! and an explicit `__del__`).

use crate::error::{CoreError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::warn;

/// Invokes a headless office-suite subprocess to convert an Office file to
/// a target variant the spreadsheet reader can open (e.g. old-style xls).
/// libreoffice's `--convert-to` exits 0 even when conversion silently
/// failed, so success additionally requires the expected output file to
/// exist on disk — `original_source`'s `Converter.convert_file` checks
/// both for the same reason.
pub struct OfficeConverter {
    soffice_path: PathBuf,
    dir: TempDir,
}

impl OfficeConverter {
    pub fn new(soffice_path: impl Into<PathBuf>) -> Result<Self> {
        Ok(OfficeConverter {
            soffice_path: soffice_path.into(),
            dir: TempDir::new()?,
        })
    }

    /// Converts `input` to `destination_extension` (e.g. `"xls"`),
    /// returning the path of the converted file inside this converter's
    /// scoped temp directory.
    pub fn convert(&self, input: &Path, destination_extension: &str, destination_filter: &str) -> Result<PathBuf> {
        let status = Command::new(&self.soffice_path)
            .arg("--headless")
            .arg("--convert-to")
            .arg(format!("{destination_extension}:{destination_filter}"))
            .arg("--outdir")
            .arg(self.dir.path())
            .arg(input)
            .status()
            .map_err(|e| CoreError::preprocessing(format!("failed to launch office converter: {e}")))?;

        let stem = input
            .file_stem()
            .ok_or_else(|| CoreError::preprocessing("input file has no name"))?;
        let output = self.dir.path().join(stem).with_extension(destination_extension);

        if !status.success() || !output.is_file() {
            return Err(CoreError::preprocessing(format!(
                "office conversion of {} produced no output (exit status: {status})",
                input.display()
            )));
        }
        Ok(output)
    }
}

/// Invokes a bundled PDF-to-table subprocess (Tabula in the source);
/// output is a CSV the spreadsheet reader can open directly.
pub struct PdfTabularizer {
    tabula_jar_path: PathBuf,
    dir: TempDir,
}

impl PdfTabularizer {
    pub fn new(tabula_jar_path: impl Into<PathBuf>) -> Result<Self> {
        Ok(PdfTabularizer {
            tabula_jar_path: tabula_jar_path.into(),
            dir: TempDir::new()?,
        })
    }

    pub fn tabularize(&self, input: &Path) -> Result<PathBuf> {
        let output = self.dir.path().join("table.csv");
        let status = Command::new("java")
            .arg("-jar")
            .arg(&self.tabula_jar_path)
            .arg("--pages")
            .arg("all")
            .arg("-o")
            .arg(&output)
            .arg(input)
            .status()
            .map_err(|e| CoreError::preprocessing(format!("failed to launch tabula: {e}")))?;

        if !status.success() || !output.is_file() {
            return Err(CoreError::preprocessing(format!(
                "pdf tabularisation of {} produced no output (exit status: {status})",
                input.display()
            )));
        }
        Ok(output)
    }
}

/// Opens a zip archive and returns the path of its single entry,
/// extracted into a scoped temp directory. Fails unless the archive
/// contains exactly one entry.
pub fn extract_zip(bytes: &[u8]) -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)?;

    if archive.len() != 1 {
        let names: Vec<String> = (0..archive.len())
            .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
            .collect();
        return Err(CoreError::preprocessing(format!(
            "expected exactly one entry in zip archive, found {}: {:?}",
            archive.len(),
            names
        )));
    }

    let mut entry = archive.by_index(0)?;
    let name = entry.name().to_string();
    let out_path = dir.path().join(&name);
    let mut out_file = std::fs::File::create(&out_path)?;
    std::io::copy(&mut entry, &mut out_file)?;
    out_file.flush()?;
    warn_if_nested(&name);
    Ok((dir, out_path))
}

fn warn_if_nested(name: &str) {
    if name.contains('/') || name.contains('\\') {
        warn!(entry = name, "zip's single entry is nested in a directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn extract_zip_rejects_multiple_entries() {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options = zip::write::FileOptions::default();
            writer.start_file("a.txt", options).unwrap();
            writer.write_all(b"a").unwrap();
            writer.start_file("b.txt", options).unwrap();
            writer.write_all(b"b").unwrap();
            writer.finish().unwrap();
        }
        let result = extract_zip(&buf);
        assert!(result.is_err());
    }

    #[test]
    fn extract_zip_returns_single_entry() {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options = zip::write::FileOptions::default();
            writer.start_file("only.csv", options).unwrap();
            writer.write_all(b"a,b\n1,2\n").unwrap();
            writer.finish().unwrap();
        }
        let (_dir, path) = extract_zip(&buf).unwrap();
        assert_eq!(path.file_name().unwrap(), "only.csv");
        assert!(path.is_file());
    }
}
