//! Host and credential resolution.
//!
//! Each value comes from the command-line flag, then the environment. The
//! password alone falls back to an interactive prompt.

use std::fmt;

use anyhow::{bail, Context};
use clap::ValueEnum;

use phpbb_sl::Folder;

pub const HOST_ENV: &str = "PHPBB_HOST";
pub const USERNAME_ENV: &str = "PHPBB_USERNAME";
pub const PASSWORD_ENV: &str = "PHPBB_PASSWORD";

/// Explicit value first, then the environment value. Blank counts as unset.
fn pick(explicit: Option<String>, env: Option<String>) -> Option<String> {
    explicit
        .filter(|v| !v.trim().is_empty())
        .or_else(|| env.filter(|v| !v.trim().is_empty()))
}

fn from_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Resolve the forum root URL.
pub fn resolve_host(explicit: Option<String>) -> anyhow::Result<String> {
    let Some(host) = pick(explicit, from_env(HOST_ENV)) else {
        bail!("no forum host: pass --host or set {HOST_ENV}");
    };
    let host = host.trim().to_string();
    if !(host.starts_with("http://") || host.starts_with("https://")) {
        bail!("forum host must be an http(s) URL, got {host:?}");
    }
    Ok(host)
}

pub fn resolve_username(explicit: Option<String>) -> anyhow::Result<String> {
    pick(explicit, from_env(USERNAME_ENV))
        .ok_or_else(|| anyhow::anyhow!("no username: pass --username or set {USERNAME_ENV}"))
}

/// Resolve the password, prompting on the terminal as a last resort.
pub fn resolve_password(explicit: Option<String>, username: &str) -> anyhow::Result<String> {
    if let Some(password) = pick(explicit, from_env(PASSWORD_ENV)) {
        return Ok(password);
    }
    rpassword::prompt_password(format!("Password for {username}: "))
        .context("reading password from terminal")
}

/// Everything needed to open a session.
#[derive(Clone)]
pub struct Settings {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl Settings {
    pub fn resolve(
        host: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> anyhow::Result<Self> {
        let host = resolve_host(host)?;
        let username = resolve_username(username)?;
        let password = resolve_password(password, &username)?;
        Ok(Self {
            host,
            username,
            password,
        })
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Folder argument on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FolderArg {
    Unread,
    Read,
    Sent,
}

impl From<FolderArg> for Folder {
    fn from(arg: FolderArg) -> Self {
        match arg {
            FolderArg::Unread => Folder::Unread,
            FolderArg::Read => Folder::Read,
            FolderArg::Sent => Folder::Sent,
        }
    }
}

/// Folders `clean` visits: every folder with `all`, the given ones
/// (duplicates dropped, order kept) otherwise, and the read inbox when none
/// is given.
pub fn cleaning_folders(folders: &[FolderArg], all: bool) -> Vec<Folder> {
    if all {
        return vec![Folder::Unread, Folder::Read, Folder::Sent];
    }
    if folders.is_empty() {
        return vec![Folder::Read];
    }
    let mut picked: Vec<Folder> = Vec::with_capacity(folders.len());
    for &arg in folders {
        let folder = Folder::from(arg);
        if !picked.contains(&folder) {
            picked.push(folder);
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_wins_over_env() {
        assert_eq!(
            pick(Some("flag".into()), Some("env".into())).as_deref(),
            Some("flag")
        );
    }

    #[test]
    fn test_env_used_when_flag_missing_or_blank() {
        assert_eq!(pick(None, Some("env".into())).as_deref(), Some("env"));
        assert_eq!(
            pick(Some("  ".into()), Some("env".into())).as_deref(),
            Some("env")
        );
        assert_eq!(pick(None, Some(String::new())), None);
    }

    #[test]
    fn test_host_must_be_http() {
        assert!(resolve_host(Some("forum.example.org".into())).is_err());
        assert_eq!(
            resolve_host(Some(" https://forum.example.org/ ".into())).unwrap(),
            "https://forum.example.org/"
        );
    }

    #[test]
    fn test_debug_hides_password() {
        let settings = Settings {
            host: "https://forum.example.org/".into(),
            username: "alice".into(),
            password: "hunter2".into(),
        };
        let shown = format!("{settings:?}");
        assert!(shown.contains("alice"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_folder_arg_maps_to_folder() {
        assert_eq!(Folder::from(FolderArg::Sent), Folder::Sent);
        assert_eq!(Folder::from(FolderArg::Unread).box_name(), "inbox");
    }

    #[test]
    fn test_cleaning_folders() {
        assert_eq!(cleaning_folders(&[], false), [Folder::Read]);
        assert_eq!(
            cleaning_folders(&[FolderArg::Read], true),
            [Folder::Unread, Folder::Read, Folder::Sent]
        );
        assert_eq!(
            cleaning_folders(&[FolderArg::Sent, FolderArg::Unread, FolderArg::Sent], false),
            [Folder::Sent, Folder::Unread]
        );
    }
}
