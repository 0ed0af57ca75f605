use std::path::Path;

/// Ensure a directory exists, creating it and any parents if needed.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Write `data` to `<path>.part` and atomically rename it onto `path`.
///
/// A loser of a cross-process race simply finds `path` already present
/// after its own rename and can treat that as the canonical file.
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let part_path = part_path_for(path);
    std::fs::write(&part_path, data)?;
    std::fs::rename(&part_path, path)?;
    Ok(())
}

fn part_path_for(path: &Path) -> std::path::PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".part");
    os.into()
}
