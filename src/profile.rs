//! Signed-in admin profile and its cache.
//!
//! The profile is cached in an explicit, typed [`ProfileCache`] owned by an
//! [`AdminSession`]. Entries expire after a TTL and are dropped as soon as the backend
//! answers 401.

use crate::clock::{Clock, MonotonicClock};
use crate::error::DashboardError;
use crate::source::ProfileSource;
use crate::telemetry::{emit_best_effort, DashboardEvent, NullSink, ProfileEvent, TelemetrySink};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The admin the current session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    initials: Option<String>,
}

impl AdminProfile {
    pub fn new(user_id: impl Into<String>, full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            full_name: full_name.into(),
            email: email.into(),
            created_at: None,
            initials: None,
        }
    }

    /// Decode a profile body. Login responses wrap it next to a `message`, which is ignored.
    pub fn from_json(body: &[u8]) -> Result<Self, DashboardError> {
        serde_json::from_slice(body).map_err(|e| DashboardError::MalformedPayload(e.to_string()))
    }

    /// Avatar initials: backend value if sent, else derived from the full name.
    pub fn initials(&self) -> String {
        match self.initials.as_deref().map(str::trim) {
            Some(sent) if !sent.is_empty() => sent.to_string(),
            _ => derive_initials(&self.full_name),
        }
    }
}

/// `"Ada Lovelace"` → `"AL"`, `"root"` → `"RO"`, blank → `"AD"`.
fn derive_initials(full_name: &str) -> String {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    match parts.as_slice() {
        [] => "AD".to_string(),
        [only] => only.chars().take(2).collect::<String>().to_uppercase(),
        [first, second, ..] => first
            .chars()
            .take(1)
            .chain(second.chars().take(1))
            .collect::<String>()
            .to_uppercase(),
    }
}

#[derive(Debug, Clone)]
struct Entry {
    profile: AdminProfile,
    stored_at_millis: u64,
}

/// TTL cache holding at most one profile.
#[derive(Debug, Clone)]
pub struct ProfileCache {
    entry: Arc<Mutex<Option<Entry>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ProfileCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entry: Arc::new(Mutex::new(None)), ttl, clock: Arc::new(MonotonicClock::default()) }
    }

    /// Override the clock (useful for deterministic tests).
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached profile, only while younger than the TTL.
    pub fn get(&self) -> Option<AdminProfile> {
        let now = self.clock.now_millis();
        let ttl = u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX);
        self.lock()
            .as_ref()
            .filter(|entry| now.saturating_sub(entry.stored_at_millis) < ttl)
            .map(|entry| entry.profile.clone())
    }

    /// The cached profile regardless of age.
    pub fn get_stale(&self) -> Option<AdminProfile> {
        self.lock().as_ref().map(|entry| entry.profile.clone())
    }

    pub fn store(&self, profile: AdminProfile) {
        let stored_at_millis = self.clock.now_millis();
        *self.lock() = Some(Entry { profile, stored_at_millis });
    }

    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Entry>> {
        self.entry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Session context: profile source plus its cache.
#[derive(Debug, Clone)]
pub struct AdminSession<P, T = NullSink> {
    source: P,
    cache: ProfileCache,
    sink: T,
}

impl<P: ProfileSource> AdminSession<P, NullSink> {
    pub fn new(source: P, cache: ProfileCache) -> Self {
        Self { source, cache, sink: NullSink }
    }
}

impl<P, T> AdminSession<P, T>
where
    P: ProfileSource,
    T: TelemetrySink,
    T::Future: Send + 'static,
{
    /// Attach a telemetry sink.
    pub fn with_sink<S: TelemetrySink>(self, sink: S) -> AdminSession<P, S> {
        AdminSession { source: self.source, cache: self.cache, sink }
    }

    pub fn cache(&self) -> &ProfileCache {
        &self.cache
    }

    /// Current admin.
    ///
    /// - fresh cache entry: returned without a request
    /// - backend 401: cache dropped, error returned
    /// - any other failure: expired entry returned if there is one
    pub async fn current(&self) -> Result<AdminProfile, DashboardError> {
        if let Some(profile) = self.cache.get() {
            self.emit(ProfileEvent::CacheHit).await;
            return Ok(profile);
        }

        match self.source.fetch_profile().await {
            Ok(profile) => {
                self.cache.store(profile.clone());
                self.emit(ProfileEvent::Refreshed).await;
                Ok(profile)
            }
            Err(err) if err.is_unauthorized() => {
                self.cache.invalidate();
                self.emit(ProfileEvent::Invalidated).await;
                Err(err)
            }
            Err(err) => match self.cache.get_stale() {
                Some(profile) => {
                    tracing::warn!(error = %err, "profile refresh failed; serving cached profile");
                    self.emit(ProfileEvent::StaleServed).await;
                    Ok(profile)
                }
                None => Err(err),
            },
        }
    }

    /// Drop the cached profile, e.g. after logout.
    pub fn sign_out(&self) {
        self.cache.invalidate();
    }

    async fn emit(&self, event: ProfileEvent) {
        emit_best_effort(self.sink.clone(), DashboardEvent::from(event)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn initials_follow_name_shape() {
        assert_eq!(derive_initials("Ada Lovelace"), "AL");
        assert_eq!(derive_initials("  root "), "RO");
        assert_eq!(derive_initials("x"), "X");
        assert_eq!(derive_initials(""), "AD");
        assert_eq!(derive_initials("grace brewster hopper"), "GB");
    }

    #[test]
    fn backend_initials_win() {
        let profile: AdminProfile =
            serde_json::from_str(r#"{"userId":"admin","fullName":"System Admin","initials":"SY"}"#).unwrap();
        assert_eq!(profile.initials(), "SY");
        assert_eq!(AdminProfile::new("a", "System Admin", "").initials(), "SA");
    }

    #[test]
    fn login_body_with_message_decodes() {
        let body = br#"{"userId":"admin","fullName":"System Admin","email":"admin@ratelimiter.local",
                        "createdAt":"2024-01-01T00:00:00Z","message":"Login successful"}"#;
        let profile = AdminProfile::from_json(body).unwrap();
        assert_eq!(profile.user_id, "admin");
        assert_eq!(profile.created_at.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn cache_expires_after_ttl() {
        let clock = ManualClock::new();
        let cache = ProfileCache::new(Duration::from_secs(60)).with_clock(clock.clone());
        cache.store(AdminProfile::new("admin", "System Admin", "a@b"));

        clock.advance(Duration::from_secs(59));
        assert!(cache.get().is_some());
        clock.advance(Duration::from_secs(1));
        assert!(cache.get().is_none());
        assert!(cache.get_stale().is_some());

        cache.invalidate();
        assert!(cache.get_stale().is_none());
    }
}
