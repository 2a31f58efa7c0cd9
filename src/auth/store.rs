use super::Session;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

const KEY_TOKEN: &str = "appToken";
const KEY_EMAIL: &str = "userEmail";
const KEY_NAME: &str = "userName";
const KEY_ROLE: &str = "userRole";

/// Every key written on sign-in and removed on sign-out.
pub const SESSION_KEYS: [&str; 4] = [KEY_TOKEN, KEY_EMAIL, KEY_NAME, KEY_ROLE];

/// Small JSON key/value file standing in for browser local storage.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/temple-admin/session.json`
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("no config directory for this platform")?;
        Ok(base.join("temple-admin").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&data).with_context(|| format!("parse {}", self.path.display()))
    }

    /// Like `read_map`, but an unparseable file counts as empty.
    fn read_map_or_empty(&self) -> Result<(BTreeMap<String, String>, bool)> {
        match self.read_map() {
            Ok(map) => Ok((map, false)),
            Err(e) if e.downcast_ref::<serde_json::Error>().is_some() => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring corrupt session file");
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let data = serde_json::to_vec_pretty(map)?;
        let mut opts = std::fs::OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        let mut file = opts
            .open(&self.path)
            .with_context(|| format!("write {}", self.path.display()))?;
        // `mode` only applies on creation; an existing file keeps its old bits.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("chmod {}", self.path.display()))?;
        }
        file.write_all(&data)
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }

    /// Raw value for one key; mostly useful for inspection.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map()?.remove(key))
    }

    /// The stored session, present only when token, email and role are all set.
    /// A corrupt file is treated as signed out.
    pub fn load(&self) -> Result<Option<Session>> {
        let (mut map, _) = self.read_map_or_empty()?;
        let mut take = |k: &str| map.remove(k).filter(|v| !v.is_empty());
        let token = take(KEY_TOKEN);
        let email = take(KEY_EMAIL);
        let name = take(KEY_NAME);
        let role = take(KEY_ROLE);
        Ok(match (token, email, role) {
            (Some(token), Some(email), Some(role)) => Some(Session {
                token,
                email,
                name: name.unwrap_or_default(),
                role,
            }),
            _ => None,
        })
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        let (mut map, _) = self.read_map_or_empty()?;
        map.insert(KEY_TOKEN.into(), session.token.clone());
        map.insert(KEY_EMAIL.into(), session.email.clone());
        map.insert(KEY_NAME.into(), session.name.clone());
        map.insert(KEY_ROLE.into(), session.role.clone());
        self.write_map(&map)
    }

    /// Remove the four session keys, leaving unrelated keys in place.
    /// A corrupt file is removed outright.
    pub fn clear(&self) -> Result<()> {
        let (mut map, corrupt) = self.read_map_or_empty()?;
        for key in SESSION_KEYS {
            map.remove(key);
        }
        if map.is_empty() || corrupt {
            if self.path.exists() {
                std::fs::remove_file(&self.path)
                    .with_context(|| format!("remove {}", self.path.display()))?;
            }
            Ok(())
        } else {
            self.write_map(&map)
        }
    }
}
