//! The credential store: exclusive owner of worker account records.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use tacklebox_auth::{WorkerAccount, WorkerIdentity, WorkerProfile, password};
use tacklebox_core::{DomainError, DomainResult, WorkerId};

#[derive(Debug, Default)]
struct Directory {
    rows: HashMap<WorkerId, Arc<Mutex<WorkerAccount>>>,
    by_email: HashMap<String, WorkerId>,
}

/// In-memory worker credential store.
///
/// # Invariants
/// - Emails are unique; the check and the insert share one write lock.
/// - Password hashes never leave the store except to the login path's
///   verifier; every outward shape is a [`WorkerProfile`].
/// - Per-worker mutations (login history, salary, revenue) serialize on the
///   worker's own row lock; different workers never contend.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    directory: RwLock<Directory>,
}

fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(email)
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker. The plaintext password is hashed before the store
    /// lock is taken; no lock is ever held across hashing work.
    pub fn create_worker(
        &self,
        email: &str,
        password_plaintext: &str,
        monthly_salary_cents: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<WorkerProfile> {
        let email = normalize_email(email)?;
        if password_plaintext.len() < 8 {
            return Err(DomainError::validation(
                "password must be at least 8 characters",
            ));
        }
        if monthly_salary_cents < 0 {
            return Err(DomainError::validation("salary cannot be negative"));
        }

        let password_hash = password::hash(password_plaintext)
            .map_err(|_| DomainError::invariant("password hashing failed"))?;

        let mut dir = self.write_directory()?;
        if dir.by_email.contains_key(&email) {
            return Err(DomainError::conflict("email already registered"));
        }

        let worker_id = WorkerId::new();
        let account = WorkerAccount::new(
            worker_id,
            email.clone(),
            password_hash,
            monthly_salary_cents,
            now,
        );
        let profile = account.profile();

        dir.by_email.insert(email, worker_id);
        dir.rows.insert(worker_id, Arc::new(Mutex::new(account)));

        tracing::info!(%worker_id, "worker registered");
        Ok(profile)
    }

    /// Credentials for the login path: worker id plus stored hash.
    ///
    /// Returns `None` for unknown emails; the login service collapses that
    /// and a failed verify into one generic outcome.
    pub fn credentials_by_email(&self, email: &str) -> Option<(WorkerId, String)> {
        let email = normalize_email(email).ok()?;
        let row = {
            let dir = self.directory.read().ok()?;
            let worker_id = *dir.by_email.get(&email)?;
            Arc::clone(dir.rows.get(&worker_id)?)
        };
        let account = row.lock().ok()?;
        Some((account.worker_id, account.password_hash.clone()))
    }

    pub fn identity(&self, worker_id: WorkerId) -> DomainResult<WorkerIdentity> {
        let row = self.row(worker_id)?;
        let account = Self::lock_row(&row)?;
        Ok(account.identity())
    }

    /// Append one successful login to the worker's bounded history.
    ///
    /// Serialized per worker via the row lock: concurrent logins for the same
    /// worker commit one at a time and nothing is lost or duplicated.
    pub fn record_login(&self, worker_id: WorkerId, now: DateTime<Utc>) -> DomainResult<()> {
        let row = self.row(worker_id)?;
        let mut account = Self::lock_row(&row)?;
        account.login_history.record(now);
        Ok(())
    }

    pub fn profile(&self, worker_id: WorkerId) -> DomainResult<WorkerProfile> {
        let row = self.row(worker_id)?;
        let account = Self::lock_row(&row)?;
        Ok(account.profile())
    }

    /// All worker profiles, ordered by email.
    pub fn list_profiles(&self) -> Vec<WorkerProfile> {
        let rows: Vec<Arc<Mutex<WorkerAccount>>> = match self.directory.read() {
            Ok(dir) => dir.rows.values().map(Arc::clone).collect(),
            Err(_) => return Vec::new(),
        };

        let mut profiles: Vec<WorkerProfile> = rows
            .iter()
            .filter_map(|row| row.lock().ok().map(|a| a.profile()))
            .collect();
        profiles.sort_by(|a, b| a.email.cmp(&b.email));
        profiles
    }

    /// Apply an approved salary change.
    pub fn set_salary(
        &self,
        worker_id: WorkerId,
        monthly_salary_cents: i64,
    ) -> DomainResult<WorkerProfile> {
        if monthly_salary_cents < 0 {
            return Err(DomainError::validation("salary cannot be negative"));
        }
        let row = self.row(worker_id)?;
        let mut account = Self::lock_row(&row)?;
        account.monthly_salary_cents = monthly_salary_cents;
        Ok(account.profile())
    }

    /// Attribute sale revenue to the recording worker.
    pub fn add_revenue(&self, worker_id: WorkerId, cents: i64) -> DomainResult<()> {
        let row = self.row(worker_id)?;
        let mut account = Self::lock_row(&row)?;
        account.revenue_cents += cents;
        Ok(())
    }

    fn row(&self, worker_id: WorkerId) -> DomainResult<Arc<Mutex<WorkerAccount>>> {
        let dir = self
            .directory
            .read()
            .map_err(|_| DomainError::invariant("credential store lock poisoned"))?;
        dir.rows
            .get(&worker_id)
            .map(Arc::clone)
            .ok_or(DomainError::NotFound)
    }

    fn lock_row(
        row: &Arc<Mutex<WorkerAccount>>,
    ) -> DomainResult<std::sync::MutexGuard<'_, WorkerAccount>> {
        row.lock()
            .map_err(|_| DomainError::invariant("worker row lock poisoned"))
    }

    fn write_directory(&self) -> DomainResult<std::sync::RwLockWriteGuard<'_, Directory>> {
        self.directory
            .write()
            .map_err(|_| DomainError::invariant("credential store lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use tacklebox_auth::LOGIN_HISTORY_CAPACITY;

    fn store_with_worker() -> (InMemoryCredentialStore, WorkerId) {
        let store = InMemoryCredentialStore::new();
        let profile = store
            .create_worker("a@x.com", "password123", 350_000, Utc::now())
            .unwrap();
        (store, profile.worker_id)
    }

    #[test]
    fn email_uniqueness_is_enforced() {
        let store = InMemoryCredentialStore::new();
        store
            .create_worker("a@x.com", "password123", 350_000, Utc::now())
            .unwrap();

        // Same address modulo case/whitespace.
        let dup = store.create_worker("  A@X.com ", "otherpass99", 100, Utc::now());
        assert!(matches!(dup, Err(DomainError::Conflict(_))));
    }

    #[test]
    fn stored_hash_verifies_but_never_serializes() {
        let (store, worker_id) = store_with_worker();

        let (_, hash) = store.credentials_by_email("a@x.com").unwrap();
        assert!(password::verify("password123", &hash));
        assert!(!password::verify("wrong", &hash));

        let profile = store.profile(worker_id).unwrap();
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn unknown_email_yields_nothing() {
        let (store, _) = store_with_worker();
        assert!(store.credentials_by_email("b@x.com").is_none());
    }

    #[test]
    fn concurrent_logins_for_one_worker_neither_lose_nor_duplicate() {
        let (store, worker_id) = store_with_worker();
        let store = Arc::new(store);
        let base = Utc::now();

        let handles: Vec<_> = (0..25i64)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .record_login(worker_id, base + chrono::Duration::seconds(i))
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let profile = store.profile(worker_id).unwrap();
        assert_eq!(profile.recent_logins.len(), LOGIN_HISTORY_CAPACITY);

        let mut sorted = profile.recent_logins.clone();
        sorted.sort();
        assert_eq!(profile.recent_logins, sorted);

        // The ten most recent of the 25 committed logins.
        let expected: Vec<_> = (15..25i64)
            .map(|i| base + chrono::Duration::seconds(i))
            .collect();
        assert_eq!(profile.recent_logins, expected);
    }

    #[test]
    fn salary_and_revenue_mutations() {
        let (store, worker_id) = store_with_worker();

        store.set_salary(worker_id, 400_000).unwrap();
        store.add_revenue(worker_id, 12_500).unwrap();
        store.add_revenue(worker_id, 2_500).unwrap();

        let profile = store.profile(worker_id).unwrap();
        assert_eq!(profile.monthly_salary_cents, 400_000);
        assert_eq!(profile.revenue_cents, 15_000);
    }

    #[test]
    fn weak_password_rejected() {
        let store = InMemoryCredentialStore::new();
        let result = store.create_worker("a@x.com", "short", 100, Utc::now());
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
