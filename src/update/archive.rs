//! Pull the replacement executable out of an archived artifact.

use std::fs::File;
use std::io;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{Result, UpdateError};

/// Archive formats releases are published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar.gz`
    TarGz,
}

/// Extract the first regular file named `file_name` (at any depth) from
/// `archive` into `dest`.
///
/// # Errors
///
/// Returns [`UpdateError::Archive`] if the archive cannot be read or holds
/// no such entry.
pub fn extract_executable(
    archive: &Path,
    format: ArchiveFormat,
    file_name: &str,
    dest: &Path,
) -> Result<()> {
    let found = match format {
        ArchiveFormat::Zip => extract_from_zip(archive, file_name, dest),
        ArchiveFormat::TarGz => extract_from_tar_gz(archive, file_name, dest),
    }
    .map_err(|e| UpdateError::Archive(format!("cannot read {}: {e}", archive.display())))?;

    if !found {
        return Err(UpdateError::Archive(format!(
            "{} does not contain {file_name}",
            archive.display()
        )));
    }
    tracing::debug!(entry = file_name, dest = %dest.display(), "extracted executable");
    Ok(())
}

fn matches_name(entry: &Path, file_name: &str) -> bool {
    entry
        .file_name()
        .is_some_and(|name| name.eq_ignore_ascii_case(file_name))
}

fn extract_from_zip(archive: &Path, file_name: &str, dest: &Path) -> io::Result<bool> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?).map_err(io::Error::other)?;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(io::Error::other)?;
        if !entry.is_file() {
            continue;
        }
        let Some(path) = entry.enclosed_name() else {
            continue;
        };
        if matches_name(&path, file_name) {
            let mut out = File::create(dest)?;
            io::copy(&mut entry, &mut out)?;
            return Ok(true);
        }
    }
    Ok(false)
}

fn extract_from_tar_gz(archive: &Path, file_name: &str, dest: &Path) -> io::Result<bool> {
    let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive)?));
    for entry in tar.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        if matches_name(&entry.path()?, file_name) {
            let mut out = File::create(dest)?;
            io::copy(&mut entry, &mut out)?;
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn extracts_nested_tar_gz_entry() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("farmland-update.tar.gz");
        write_tar_gz(
            &archive,
            &[
                ("farmland-linux-amd64/README.md", b"docs"),
                ("farmland-linux-amd64/farmland", b"new-binary"),
            ],
        );
        let dest = dir.path().join("staged");
        extract_executable(&archive, ArchiveFormat::TarGz, "farmland", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new-binary");
    }

    #[test]
    fn extracts_app_bundle_binary_from_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("farmland-update.zip");
        write_zip(
            &archive,
            &[
                ("Farmland.app/Contents/Info.plist", b"<plist/>"),
                ("Farmland.app/Contents/MacOS/farmland", b"mac-binary"),
            ],
        );
        let dest = dir.path().join("staged");
        extract_executable(&archive, ArchiveFormat::Zip, "farmland", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"mac-binary");
    }

    #[test]
    fn missing_entry_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("farmland-update.zip");
        write_zip(&archive, &[("other", b"x")]);
        let dest = dir.path().join("staged");
        let err = extract_executable(&archive, ArchiveFormat::Zip, "farmland", &dest).unwrap_err();
        assert!(matches!(err, UpdateError::Archive(ref m) if m.contains("does not contain")));
        assert!(!dest.exists());
    }

    #[test]
    fn corrupt_archive_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("farmland-update.tar.gz");
        std::fs::write(&archive, b"not gzip").unwrap();
        let dest = dir.path().join("staged");
        assert!(matches!(
            extract_executable(&archive, ArchiveFormat::TarGz, "farmland", &dest),
            Err(UpdateError::Archive(_))
        ));
    }
}
