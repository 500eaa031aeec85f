use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub fn read_file_content(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
}

pub fn write_file_content(path: &Path, content: &str, atomic: bool) -> io::Result<()> {
    if atomic {
        replace_atomically(path, content)
    } else {
        fs::write(path, content)
    }
}

/// Writes `content` to a sibling temp file and renames it over `path`,
/// carrying over the permissions of the file being replaced. Symlinks are
/// resolved first so the link target is replaced, not the link.
fn replace_atomically(path: &Path, content: &str) -> io::Result<()> {
    let resolved = match fs::canonicalize(path) {
        Ok(real) => real,
        Err(e) if e.kind() == io::ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(e),
    };
    let path = resolved.as_path();

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), metadata.permissions())?;
    }

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
