use crate::db::Db;
use crate::mapping;
use crate::session::SessionClient;
use crate::types::ProfileRecord;

/// Profile persistence policy over the local store and the server session:
/// writes land locally first and are mirrored to the session; reads prefer
/// the session when reachable and fall back to the local copy.
pub struct ProfileStore<'a> {
    db: &'a Db,
}

impl<'a> ProfileStore<'a> {
    pub fn new(db: &'a Db) -> Self {
        ProfileStore { db }
    }

    /// Validate and write the local copy. No network involved.
    pub fn save_local(&self, record: &ProfileRecord) -> Result<(), String> {
        let missing: Vec<&str> = mapping::REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| {
                record
                    .get(*key)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .map(|key| mapping::wire_name(key).unwrap_or(key))
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "Please fill all required fields: {}",
                missing.join(", ")
            ));
        }
        self.db.save_profile(record)
    }

    /// Save: local write first (synchronous), then mirror to the server
    /// session. A mirror failure is surfaced but the local write stands.
    pub fn save(&self, record: &ProfileRecord) -> Result<(), String> {
        self.save_local(record)?;
        let client = SessionClient::new()?;
        client.push_profile(record)
    }

    /// Load: prefer the server session when reachable, writing through to
    /// the local cache; otherwise fall back to the local copy.
    pub fn load(&self) -> Result<ProfileRecord, String> {
        if let Ok(client) = SessionClient::new() {
            match client.fetch_profile() {
                Ok(remote) if !remote.is_empty() => {
                    self.db.save_profile(&remote)?;
                    return Ok(remote);
                }
                Ok(_) => {}
                Err(e) => eprintln!("[store] session load failed, using local copy: {}", e),
            }
        }
        self.db.load_profile()
    }

    /// Clear both stores. The server-side clear is best-effort: a failure
    /// is logged and does not block clearing the local copy.
    pub fn clear(&self) -> Result<(), String> {
        self.db.clear_profile()?;
        if let Err(e) = SessionClient::new().and_then(|c| c.clear_profile()) {
            eprintln!("[store] session clear failed: {}", e);
        }
        Ok(())
    }

    pub fn has_profile(&self) -> Result<bool, String> {
        self.db.has_profile()
    }
}
