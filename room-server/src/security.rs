//! Bans, IP blacklist, and the op set, JSON-persisted. Grounded on
//! `original_source/utils/security.py`'s `SecurityStore`; ported field for
//! field, including the "save after every mutation" behaviour.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BanType {
    Id,
    Ip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanRecord {
    #[serde(rename = "type")]
    pub ban_type: BanType,
    pub target: String,
    pub expire_at: Option<f64>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub created_at: f64,
}

impl BanRecord {
    fn is_expired(&self, now: f64) -> bool {
        match self.expire_at {
            Some(expire_at) => now >= expire_at,
            None => false,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SecurityDocument {
    #[serde(default)]
    ops: Vec<String>,
    #[serde(default)]
    blacklist_ips: HashMap<String, Option<f64>>,
    #[serde(default)]
    bans: Vec<BanRecord>,
}

fn now_unix() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// In-memory store with JSON persistence on every mutation, matching the
/// original's `save()`-after-every-write behaviour rather than batching.
pub struct SecurityStore {
    path: String,
    bans: Vec<BanRecord>,
    blacklist_ips: HashMap<String, Option<f64>>,
    ops: std::collections::HashSet<String>,
}

impl SecurityStore {
    pub async fn load(path: impl Into<String>) -> Self {
        let path = path.into();
        let doc = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str::<SecurityDocument>(&text).unwrap_or_else(|e| {
                tracing::error!(error = %e, path, "failed to parse security store, starting empty");
                SecurityDocument::default()
            }),
            Err(_) => SecurityDocument::default(),
        };
        Self {
            path,
            bans: doc.bans,
            blacklist_ips: doc.blacklist_ips,
            ops: doc.ops.into_iter().collect(),
        }
    }

    async fn save(&self) {
        let doc = SecurityDocument {
            ops: {
                let mut ops: Vec<_> = self.ops.iter().cloned().collect();
                ops.sort();
                ops
            },
            blacklist_ips: self.blacklist_ips.clone(),
            bans: self
                .bans
                .iter()
                .filter(|b| !b.is_expired(now_unix()))
                .cloned()
                .collect(),
        };
        match serde_json::to_string_pretty(&doc) {
            Ok(text) => {
                if let Err(e) = tokio::fs::write(&self.path, text).await {
                    tracing::error!(error = %e, path = %self.path, "failed to save security store");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize security store"),
        }
    }

    /// Drops ban/blacklist entries whose TTL has passed. Called at the top
    /// of every read per the lazy-purge invariant.
    fn cleanup(&mut self) {
        let now = now_unix();
        self.bans.retain(|b| !b.is_expired(now));
        self.blacklist_ips
            .retain(|_, exp| exp.is_none_or(|e| now < e));
    }

    pub async fn add_ban(
        &mut self,
        ban_type: BanType,
        target: impl Into<String>,
        ttl_secs: Option<u64>,
        reason: impl Into<String>,
    ) {
        let target = target.into();
        let now = now_unix();
        self.bans
            .retain(|b| !(b.ban_type == ban_type && b.target == target));
        self.bans.push(BanRecord {
            ban_type,
            target,
            expire_at: ttl_secs.map(|s| now + s as f64),
            reason: reason.into(),
            created_at: now,
        });
        self.save().await;
    }

    pub async fn remove_ban(&mut self, ban_type: BanType, target: &str) -> bool {
        let before = self.bans.len();
        self.bans
            .retain(|b| !(b.ban_type == ban_type && b.target == target));
        let changed = self.bans.len() != before;
        if changed {
            self.save().await;
        }
        changed
    }

    pub fn is_banned(&mut self, ban_type: BanType, target: &str) -> Option<BanRecord> {
        self.cleanup();
        self.bans
            .iter()
            .find(|b| b.ban_type == ban_type && b.target == target)
            .cloned()
    }

    pub fn list_bans(&mut self) -> Vec<BanRecord> {
        self.cleanup();
        self.bans.clone()
    }

    pub async fn add_blacklist_ip(&mut self, ip: impl Into<String>, ttl_secs: Option<u64>) {
        let now = now_unix();
        self.blacklist_ips
            .insert(ip.into(), ttl_secs.map(|s| now + s as f64));
        self.save().await;
    }

    pub async fn remove_blacklist_ip(&mut self, ip: &str) -> bool {
        let existed = self.blacklist_ips.remove(ip).is_some();
        if existed {
            self.save().await;
        }
        existed
    }

    pub fn is_blacklisted_ip(&mut self, ip: &str) -> bool {
        self.cleanup();
        self.blacklist_ips.contains_key(ip)
    }

    pub fn list_blacklist_ips(&mut self) -> HashMap<String, Option<f64>> {
        self.cleanup();
        self.blacklist_ips.clone()
    }

    pub async fn op(&mut self, user_id: impl Into<String>) {
        self.ops.insert(user_id.into());
        self.save().await;
    }

    pub async fn deop(&mut self, user_id: &str) -> bool {
        let existed = self.ops.remove(user_id);
        if existed {
            self.save().await;
        }
        existed
    }

    pub fn is_op(&self, user_id: &str) -> bool {
        self.ops.contains(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("room-server-security-test-{name}-{}.json", std::process::id()))
            .to_string_lossy()
            .into_owned()
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let store = SecurityStore::load(tmp_path("missing")).await;
        assert!(store.ops.is_empty());
        assert!(store.bans.is_empty());
    }

    #[tokio::test]
    async fn ban_roundtrips_through_disk() {
        let path = tmp_path("roundtrip");
        let mut store = SecurityStore::load(&path).await;
        store.add_ban(BanType::Id, "42", None, "cheating").await;

        let mut reloaded = SecurityStore::load(&path).await;
        let ban = reloaded.is_banned(BanType::Id, "42").unwrap();
        assert_eq!(ban.reason, "cheating");
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn expired_ban_is_not_reported_as_active() {
        let path = tmp_path("expired");
        let mut store = SecurityStore::load(&path).await;
        store.add_ban(BanType::Ip, "1.2.3.4", Some(0), "temp").await;
        // expire_at == now; a moment later it must read as not-banned.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(store.is_banned(BanType::Ip, "1.2.3.4").is_none());
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn remove_ban_reports_whether_it_existed() {
        let path = tmp_path("remove");
        let mut store = SecurityStore::load(&path).await;
        assert!(!store.remove_ban(BanType::Id, "7").await);
        store.add_ban(BanType::Id, "7", None, "").await;
        assert!(store.remove_ban(BanType::Id, "7").await);
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn op_and_deop_roundtrip() {
        let path = tmp_path("ops");
        let mut store = SecurityStore::load(&path).await;
        store.op("1").await;
        assert!(store.is_op("1"));
        assert!(store.deop("1").await);
        assert!(!store.is_op("1"));
        let _ = tokio::fs::remove_file(&path).await;
    }
}
