//! Steam Workshop folder detection.
//!
//! Workshop items synced by the Steam client live at
//! `{library}/steamapps/workshop/content/{app_id}/{item_id}/`. Libraries
//! are the Steam install root plus any extra folders listed in
//! `steamapps/libraryfolders.vdf`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

/// Steam app id of Wallpaper Engine.
pub const WALLPAPER_ENGINE_APP_ID: &str = "431960";

#[cfg(target_os = "windows")]
fn default_steam_roots() -> Vec<PathBuf> {
    let mut roots = vec![
        PathBuf::from("C:\\Program Files (x86)\\Steam"),
        PathBuf::from("C:\\Program Files\\Steam"),
    ];
    for var in ["ProgramFiles(x86)", "ProgramFiles"] {
        if let Ok(p) = std::env::var(var) {
            roots.push(PathBuf::from(p).join("Steam"));
        }
    }
    roots
}

#[cfg(target_os = "macos")]
fn default_steam_roots() -> Vec<PathBuf> {
    dirs::home_dir()
        .map(|home| vec![home.join("Library").join("Application Support").join("Steam")])
        .unwrap_or_default()
}

#[cfg(target_os = "linux")]
fn default_steam_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(home) = dirs::home_dir() {
        roots.push(home.join(".steam").join("steam"));
        roots.push(home.join(".local").join("share").join("Steam"));
        roots.push(
            home.join(".var")
                .join("app")
                .join("com.valvesoftware.Steam")
                .join(".local")
                .join("share")
                .join("Steam"),
        );
    }
    roots
}

#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
fn default_steam_roots() -> Vec<PathBuf> {
    Vec::new()
}

/// Extract library paths from the contents of `libraryfolders.vdf`.
///
/// Only `"path"` keys are read; the rest of the KeyValues document is
/// ignored.
pub fn parse_library_folders(content: &str) -> Vec<PathBuf> {
    content
        .lines()
        .filter(|line| line.trim_start().starts_with("\"path\""))
        .filter_map(|line| line.split('"').nth(3))
        .filter(|path| !path.is_empty())
        .map(|path| PathBuf::from(path.replace("\\\\", "\\")))
        .collect()
}

/// Every Steam library on this machine, deduplicated.
pub fn steam_roots() -> Vec<PathBuf> {
    libraries_from(default_steam_roots())
}

fn libraries_from(roots: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut libraries = Vec::new();
    let mut seen = HashSet::new();

    for root in roots {
        if seen.insert(dedup_key(&root)) {
            libraries.push(root.clone());
        }
        let library_file = root.join("steamapps").join("libraryfolders.vdf");
        let Ok(content) = fs::read_to_string(&library_file) else {
            trace!(path = %library_file.display(), "No library folder list");
            continue;
        };
        for library in parse_library_folders(&content) {
            if seen.insert(dedup_key(&library)) {
                libraries.push(library);
            }
        }
    }

    libraries
}

fn dedup_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

/// Existing workshop content directories for `app_id` across all libraries.
pub fn workshop_content_dirs(app_id: &str) -> Vec<PathBuf> {
    content_dirs_in(&steam_roots(), app_id)
}

fn content_dirs_in(libraries: &[PathBuf], app_id: &str) -> Vec<PathBuf> {
    if app_id.trim().is_empty() {
        return Vec::new();
    }

    let dirs: Vec<PathBuf> = libraries
        .iter()
        .map(|lib| {
            lib.join("steamapps")
                .join("workshop")
                .join("content")
                .join(app_id)
        })
        .filter(|dir| dir.is_dir())
        .collect();

    debug!(app_id = %app_id, found = dirs.len(), "Detected workshop content folders");
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VDF: &str = r#"
"libraryfolders"
{
	"0"
	{
		"path"		"/home/me/.local/share/Steam"
		"label"		""
		"apps"
		{
			"431960"		"123456"
		}
	}
	"1"
	{
		"path"		"D:\\SteamLibrary"
	}
}
"#;

    #[test]
    fn test_parse_library_folders() {
        let libs = parse_library_folders(VDF);
        assert_eq!(
            libs,
            vec![
                PathBuf::from("/home/me/.local/share/Steam"),
                PathBuf::from("D:\\SteamLibrary"),
            ]
        );
    }

    #[test]
    fn test_parse_ignores_other_keys() {
        assert!(parse_library_folders("\"label\" \"path\"\n\"apps\" {}").is_empty());
    }

    #[test]
    fn test_libraries_follow_vdf_and_dedupe() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("Steam");
        let extra = temp.path().join("Extra");
        fs::create_dir_all(root.join("steamapps")).unwrap();
        let vdf = format!(
            "\"path\"\t\t\"{}\"\n\"path\"\t\t\"{}\"\n",
            root.display(),
            extra.display()
        );
        fs::write(root.join("steamapps").join("libraryfolders.vdf"), vdf).unwrap();

        let libs = libraries_from(vec![root.clone(), root.clone()]);
        assert_eq!(libs, vec![root, extra]);
    }

    #[test]
    fn test_content_dirs_only_existing() {
        let temp = TempDir::new().unwrap();
        let with = temp.path().join("A");
        let without = temp.path().join("B");
        let content = with
            .join("steamapps")
            .join("workshop")
            .join("content")
            .join(WALLPAPER_ENGINE_APP_ID);
        fs::create_dir_all(&content).unwrap();
        fs::create_dir_all(&without).unwrap();

        let dirs = content_dirs_in(&[with, without], WALLPAPER_ENGINE_APP_ID);
        assert_eq!(dirs, vec![content]);
        assert!(content_dirs_in(&[temp.path().to_path_buf()], " ").is_empty());
    }
}
