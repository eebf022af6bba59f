//! System font discovery for the text pipeline.

use std::path::PathBuf;

/// Find a usable system font file.
///
/// Probes, in order: the configured extra paths, a platform-specific list
/// of well-known files, then every font file in the platform font
/// directories (sorted by name). Returns the checked candidates on
/// failure so init errors stay diagnosable.
pub fn resolve_system_font_path(extra_paths: &[String]) -> Result<PathBuf, Vec<String>> {
    let mut checked = Vec::new();
    for candidate in font_candidates(extra_paths) {
        checked.push(candidate.display().to_string());
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    checked.truncate(64);
    Err(checked)
}

fn font_candidates(extra_paths: &[String]) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = extra_paths.iter().map(PathBuf::from).collect();
    candidates.extend(platform_font_files());

    for directory in platform_font_directories() {
        let Ok(entries) = std::fs::read_dir(&directory) else {
            continue;
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|extension| extension.to_str())
                    .is_some_and(|extension| {
                        matches!(extension.to_lowercase().as_str(), "ttf" | "otf" | "ttc")
                    })
            })
            .collect();
        files.sort();
        candidates.extend(files);
    }
    candidates
}

fn platform_font_files() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        vec![
            PathBuf::from(r"C:\Windows\Fonts\segoeui.ttf"),
            PathBuf::from(r"C:\Windows\Fonts\arial.ttf"),
            PathBuf::from(r"C:\Windows\Fonts\tahoma.ttf"),
            PathBuf::from(r"C:\Windows\Fonts\calibri.ttf"),
        ]
    } else if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/System/Library/Fonts/SFNS.ttf"),
            PathBuf::from("/System/Library/Fonts/Supplemental/Arial.ttf"),
            PathBuf::from("/Library/Fonts/Arial.ttf"),
        ]
    } else {
        vec![
            PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            PathBuf::from("/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf"),
            PathBuf::from("/usr/share/fonts/TTF/DejaVuSans.ttf"),
        ]
    }
}

fn platform_font_directories() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        vec![PathBuf::from(r"C:\Windows\Fonts")]
    } else if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/System/Library/Fonts"),
            PathBuf::from("/System/Library/Fonts/Supplemental"),
            PathBuf::from("/Library/Fonts"),
        ]
    } else {
        let mut directories = vec![
            PathBuf::from("/usr/share/fonts"),
            PathBuf::from("/usr/local/share/fonts"),
        ];
        if let Some(home) = std::env::var_os("HOME") {
            directories.push(PathBuf::from(home).join(".fonts"));
        }
        directories
    }
}
