//! Path utilities.

use std::path::{Path, PathBuf};

/// Expands a leading `~` in a path to the user's home directory.
///
/// Needed for paths typed at the output prompt, and for `--output=~/path`
/// where the shell does not expand the tilde.
pub fn expand_tilde<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if let Ok(stripped) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    path.to_path_buf()
}
