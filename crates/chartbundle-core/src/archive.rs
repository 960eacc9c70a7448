//! Extraction of bundled chart payloads
//!
//! The artifact store hands out the chart resource as a tar archive, either
//! plain or gzip-compressed. Helm only looks at file names and contents, so
//! permissions, ownership and timestamps are not restored.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path};
use tar::{Archive, EntryType};

use crate::error::{CoreError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Unpack a chart archive into `dest`, creating it if necessary
///
/// Returns the number of extracted regular files.
pub fn unpack_chart_tarball(buf: &[u8], dest: &Path) -> Result<usize> {
    if buf.starts_with(&GZIP_MAGIC) {
        unpack_entries(Archive::new(GzDecoder::new(buf)), dest)
    } else {
        unpack_entries(Archive::new(buf), dest)
    }
}

fn unpack_entries<R: Read>(mut archive: Archive<R>, dest: &Path) -> Result<usize> {
    std::fs::create_dir_all(dest)?;

    let mut files = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.into_owned();
        tracing::debug!("unpacking {}...", name.display());

        if !is_local(&name) {
            return Err(CoreError::UnsafeArchivePath {
                path: name.display().to_string(),
            });
        }
        let target = dest.join(&name);

        match entry.header().entry_type() {
            EntryType::Regular | EntryType::Continuous => {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let mut file = File::create(&target)?;
                io::copy(&mut entry, &mut file)?;
                files += 1;
            }
            EntryType::Directory => {
                std::fs::create_dir_all(&target)?;
            }
            // pax and GNU metadata records describe the following entry
            EntryType::XGlobalHeader | EntryType::XHeader | EntryType::GNULongName => {}
            _ => {
                return Err(CoreError::UnsupportedArchiveEntry {
                    path: target.display().to_string(),
                });
            }
        }
    }
    Ok(files)
}

/// Whether `path` stays below the directory it is joined onto
fn is_local(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}
