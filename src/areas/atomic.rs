use anyhow::Context;
use std::io::Write;
use std::path::Path;

/// Replace the file at `path` with `content` in a single rename.
///
/// The content goes to a temporary file next to `path` first; missing parent
/// directories are created. `mode` is applied as unix permission bits.
pub(crate) fn write_atomic(path: &Path, content: &[u8], mode: u32) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("Invalid file path {}", path.display()))?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Unable to create directory {}", parent.display()))?;

    let mut temp_file = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(parent)
        .with_context(|| format!("Unable to create temporary file in {}", parent.display()))?;
    temp_file
        .write_all(content)
        .with_context(|| format!("Unable to write temporary file for {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(mode))
            .with_context(|| format!("Unable to set permissions for {}", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    temp_file
        .persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("Unable to rename temporary file to {}", path.display()))?;

    Ok(())
}
