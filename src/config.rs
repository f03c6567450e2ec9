//! Saved command-line defaults.
//!
//! Defaults are stored as flag tokens, one or more per line, in a global
//! config file and an optional `.shareditrc` in the working directory.
//! A line starting with `--doc` or `--out` holds a single flag whose value
//! is the rest of the line, so names and paths may contain spaces.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::editor::Theme;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub theme: Option<Theme>,
    pub doc: Option<String>,
    pub out: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge `other` over `self`: booleans are OR-ed, options from `other` win.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            theme: other.theme.or(self.theme),
            doc: other.doc.clone().or_else(|| self.doc.clone()),
            out: other.out.clone().or_else(|| self.out.clone()),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("sharedit").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("sharedit")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("sharedit").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("sharedit")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".shareditrc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(line_tokens)
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

const VALUE_FLAGS: [&str; 2] = ["--doc", "--out"];

fn line_tokens(line: &str) -> Vec<String> {
    for flag in VALUE_FLAGS {
        let Some(rest) = line.strip_prefix(flag) else {
            continue;
        };
        if rest.starts_with('=') {
            return vec![line.to_owned()];
        }
        if rest.starts_with(char::is_whitespace) {
            return vec![flag.to_owned(), rest.trim().to_owned()];
        }
    }
    line.split_whitespace().map(ToOwned::to_owned).collect()
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# sharedit defaults (saved with --save)".to_string()];
    if flags.watch {
        lines.push("--watch".to_string());
    }
    if let Some(theme) = flags.theme {
        lines.push(format!("--theme {}", theme_name(theme)));
    }
    if let Some(doc) = &flags.doc {
        lines.push(format!("--doc {doc}"));
    }
    if let Some(out) = &flags.out {
        lines.push(format!("--out {}", out.display()));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick known flags out of a token list, ignoring everything else.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let next = tokens.get(i + 1);
        match token {
            "--watch" | "-w" => flags.watch = true,
            "--theme" => {
                if let Some(value) = next {
                    flags.theme = parse_theme(value);
                    i += 1;
                }
            }
            "--doc" => {
                if let Some(value) = next {
                    flags.doc = Some(value.clone());
                    i += 1;
                }
            }
            "--out" => {
                if let Some(value) = next {
                    flags.out = Some(PathBuf::from(value));
                    i += 1;
                }
            }
            _ => {
                if let Some(value) = token.strip_prefix("--theme=") {
                    flags.theme = parse_theme(value);
                } else if let Some(value) = token.strip_prefix("--doc=") {
                    flags.doc = Some(value.to_string());
                } else if let Some(value) = token.strip_prefix("--out=") {
                    flags.out = Some(PathBuf::from(value));
                }
            }
        }
        i += 1;
    }
    flags
}

const fn theme_name(theme: Theme) -> &'static str {
    match theme {
        Theme::Snow => "snow",
        Theme::Bubble => "bubble",
    }
}

fn parse_theme(s: &str) -> Option<Theme> {
    match s {
        "snow" => Some(Theme::Snow),
        "bubble" => Some(Theme::Bubble),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let args = vec![
            "sharedit".to_string(),
            "--watch".to_string(),
            "--theme".to_string(),
            "bubble".to_string(),
            "--doc=plans".to_string(),
            "--out".to_string(),
            "preview.html".to_string(),
            "README.md".to_string(),
        ];
        let flags = parse_flag_tokens(&args);
        assert!(flags.watch);
        assert_eq!(flags.theme, Some(Theme::Bubble));
        assert_eq!(flags.doc.as_deref(), Some("plans"));
        assert_eq!(flags.out, Some(PathBuf::from("preview.html")));
    }

    #[test]
    fn test_unknown_theme_is_dropped() {
        let args = vec!["--theme=neon".to_string()];
        assert_eq!(parse_flag_tokens(&args).theme, None);
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            watch: true,
            theme: Some(Theme::Bubble),
            doc: Some("from-file".to_string()),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            theme: Some(Theme::Snow),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.watch);
        assert_eq!(merged.theme, Some(Theme::Snow));
        assert_eq!(merged.doc.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(".shareditrc");
        let flags = ConfigFlags {
            watch: true,
            theme: Some(Theme::Bubble),
            doc: Some("roadmap".to_string()),
            out: Some(PathBuf::from("out.html")),
        };

        save_config_flags(&path, &flags).unwrap();
        assert_eq!(load_config_flags(&path).unwrap(), flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(load_config_flags(&path).unwrap(), ConfigFlags::default());
    }

    #[test]
    fn test_saved_values_with_spaces_load_intact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".shareditrc");
        let flags = ConfigFlags {
            doc: Some("team notes".to_string()),
            out: Some(PathBuf::from("my preview.html")),
            ..ConfigFlags::default()
        };

        save_config_flags(&path, &flags).unwrap();
        assert_eq!(load_config_flags(&path).unwrap(), flags);
    }

    #[test]
    fn test_equals_form_keeps_spaces_and_other_lines_split() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".shareditrc");
        std::fs::write(&path, "--watch --theme bubble\n--out=site/live preview.html\n").unwrap();

        let flags = load_config_flags(&path).unwrap();
        assert!(flags.watch);
        assert_eq!(flags.theme, Some(Theme::Bubble));
        assert_eq!(flags.out, Some(PathBuf::from("site/live preview.html")));
    }
}
