use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
}

/// Resolve the output and temp directory settings.
///
/// Output paths are relative to the directory the user started in, while
/// temp paths are relative to the process working directory.
pub fn resolve(
    output_dir_setting: &str,
    temp_dir_setting: &str,
    original_cwd: &Path,
    current_dir: &Path,
) -> ResolvedPaths {
    let output_dir = if output_dir_setting == "." {
        original_cwd.to_path_buf()
    } else if Path::new(output_dir_setting).is_absolute() {
        PathBuf::from(output_dir_setting)
    } else {
        original_cwd.join(output_dir_setting)
    };

    let temp_dir = if Path::new(temp_dir_setting).is_absolute() {
        PathBuf::from(temp_dir_setting)
    } else {
        current_dir.join(temp_dir_setting)
    };

    ResolvedPaths {
        output_dir,
        temp_dir,
    }
}
