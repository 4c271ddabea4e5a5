//! Archive extraction for downloaded SteamCMD packages.
//!
//! Valve ships SteamCMD as tar.gz on Linux/macOS and zip on Windows. Entries
//! that would land outside the destination directory are skipped, and unix
//! permission bits are carried over so `steamcmd.sh` and `linux32/steamcmd`
//! stay runnable.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path};
use tracing::{debug, info, warn};

use super::types::ArchiveFormat;

/// Extracts `archive_path` into `dest_dir` and returns the number of files written.
///
/// # Arguments
///
/// * `archive_path` - The downloaded archive.
/// * `dest_dir` - SteamCMD binary directory. Entries may not escape it.
/// * `format` - How the archive is packed.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or decoded, an entry
/// points outside `dest_dir`, or a file cannot be written.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path, format: ArchiveFormat) -> Result<usize> {
    info!(
        "Extracting {:?} archive {} to {}",
        format,
        archive_path.display(),
        dest_dir.display()
    );

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    let written = match format {
        ArchiveFormat::Zip => extract_zip(archive_path, dest_dir)?,
        ArchiveFormat::TarGz => {
            let file = File::open(archive_path)
                .with_context(|| format!("Failed to open tar.gz: {}", archive_path.display()))?;
            let decoder = flate2::read::GzDecoder::new(BufReader::new(file));
            extract_tar(decoder, dest_dir)?
        }
    };

    debug!(files = written, "Extraction complete");
    Ok(written)
}

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<usize> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open zip: {}", archive_path.display()))?;

    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read zip: {}", archive_path.display()))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe path in zip: {}", entry.name());
            continue;
        };
        let dest_path = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&dest_path)
            .with_context(|| format!("Failed to create: {}", dest_path.display()))?;
        io::copy(&mut entry, &mut outfile)?;

        #[cfg(unix)]
        carry_exec_bit(&dest_path, entry.unix_mode())?;

        written += 1;
    }

    Ok(written)
}

fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<usize> {
    let mut archive = tar::Archive::new(reader);
    let root = dest_dir
        .canonicalize()
        .unwrap_or_else(|_| dest_dir.to_path_buf());

    let mut written = 0;
    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_type = entry.header().entry_type();

        // links could point anywhere on disk
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            warn!("Skipping link entry in tar archive");
            continue;
        }

        let relative = entry.path()?.into_owned();
        if !is_contained(&relative) {
            warn!("Skipping unsafe path in tar: {:?}", relative);
            continue;
        }

        let dest_path = dest_dir.join(&relative);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
            let parent_canonical = parent.canonicalize()?;
            if !parent_canonical.starts_with(&root) {
                warn!("Skipping path that escapes {}: {:?}", root.display(), relative);
                continue;
            }
        }

        if entry_type.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else if entry_type.is_file() {
            let mut outfile = File::create(&dest_path)
                .with_context(|| format!("Failed to create: {}", dest_path.display()))?;
            io::copy(&mut entry, &mut outfile)?;
            outfile.flush()?;

            #[cfg(unix)]
            carry_exec_bit(&dest_path, entry.header().mode().ok())?;

            written += 1;
        }
    }

    Ok(written)
}

/// True when a relative archive path cannot climb out of the destination.
fn is_contained(path: &Path) -> bool {
    !path.is_absolute()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(unix)]
fn carry_exec_bit(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode.filter(|m| m & 0o111 != 0) {
        fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o755))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }
    Ok(())
}

/// Sets the executable permission on a file. No-op on Windows.
///
/// # Errors
///
/// Returns an error if the file's metadata cannot be read or its mode
/// cannot be changed.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)
            .with_context(|| format!("Failed to get metadata for {}", path.display()))?
            .permissions();
        permissions.set_mode(permissions.mode() | 0o755);

        fs::set_permissions(path, permissions).with_context(|| {
            format!("Failed to set executable permission on {}", path.display())
        })?;

        debug!("Set executable permission on {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_tar_gz(path: &Path, entries: &[(&str, &[u8], u32)]) {
        let file = File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data, mode) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append(&header, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_extract_steamcmd_tar_gz_layout() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("steamcmd.tar.gz");
        let extract_dir = temp_dir.path().join("steamcmd");

        write_tar_gz(
            &archive_path,
            &[
                ("steamcmd.sh", b"#!/bin/sh\nexit 0\n", 0o755),
                ("linux32/steamcmd", b"ELF", 0o755),
                ("linux32/libstdc++.so.6", b"lib", 0o644),
            ],
        );

        let written = extract_archive(&archive_path, &extract_dir, ArchiveFormat::TarGz).unwrap();

        assert_eq!(written, 3);
        assert!(extract_dir.join("steamcmd.sh").is_file());
        assert!(extract_dir.join("linux32/steamcmd").is_file());
        assert_eq!(
            fs::read_to_string(extract_dir.join("steamcmd.sh")).unwrap(),
            "#!/bin/sh\nexit 0\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_tar_gz_keeps_exec_bit() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("steamcmd.tar.gz");
        let extract_dir = temp_dir.path().join("out");

        write_tar_gz(
            &archive_path,
            &[("steamcmd.sh", b"#!/bin/sh\n", 0o755), ("readme.txt", b"hi", 0o644)],
        );
        extract_archive(&archive_path, &extract_dir, ArchiveFormat::TarGz).unwrap();

        let script = fs::metadata(extract_dir.join("steamcmd.sh")).unwrap();
        assert_ne!(script.permissions().mode() & 0o111, 0);
        let readme = fs::metadata(extract_dir.join("readme.txt")).unwrap();
        assert_eq!(readme.permissions().mode() & 0o111, 0);
    }

    #[test]
    fn test_extract_zip() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("steamcmd.zip");
        let extract_dir = temp_dir.path().join("steamcmd");

        {
            let file = File::create(&archive_path).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);

            zip.start_file("steamcmd.exe", options).unwrap();
            zip.write_all(b"MZ").unwrap();
            zip.start_file("package/readme.txt", options).unwrap();
            zip.write_all(b"nested").unwrap();
            zip.finish().unwrap();
        }

        let written = extract_archive(&archive_path, &extract_dir, ArchiveFormat::Zip).unwrap();

        assert_eq!(written, 2);
        assert_eq!(fs::read(extract_dir.join("steamcmd.exe")).unwrap(), b"MZ");
        assert!(extract_dir.join("package/readme.txt").exists());
    }

    #[test]
    fn test_tar_symlink_escape_blocked() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("malicious.tar.gz");
        let extract_dir = temp_dir.path().join("extracted");
        let escape_target = temp_dir.path().join("escaped_file.txt");

        {
            let file = File::create(&archive_path).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);

            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_mode(0o777);
            builder
                .append_link(&mut header, "escape_link", "../escaped_file.txt")
                .unwrap();

            let data = b"must stay inside";
            let mut file_header = tar::Header::new_gnu();
            file_header.set_path("escape_link").unwrap();
            file_header.set_size(data.len() as u64);
            file_header.set_mode(0o644);
            file_header.set_cksum();
            builder.append(&file_header, &data[..]).unwrap();

            builder.into_inner().unwrap().finish().unwrap();
        }

        extract_archive(&archive_path, &extract_dir, ArchiveFormat::TarGz).unwrap();

        assert!(!escape_target.exists());
        assert!(extract_dir.join("escape_link").is_file());
    }

    #[test]
    fn test_is_contained() {
        assert!(is_contained(Path::new("steamcmd.sh")));
        assert!(is_contained(Path::new("./linux32/steamcmd")));
        assert!(!is_contained(Path::new("../outside")));
        assert!(!is_contained(Path::new("linux32/../../outside")));
        assert!(!is_contained(Path::new("/etc/passwd")));
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("steamcmd.sh");
        fs::write(&file_path, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o644)).unwrap();

        make_executable(&file_path).unwrap();

        let mode = fs::metadata(&file_path).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }
}
