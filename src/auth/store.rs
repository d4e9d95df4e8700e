//! Identity Store
//! Mission: Account rows, provisioning, and session lifecycle over SQLite

use crate::auth::models::{Account, Role};
use crate::db::{Database, StoreError};
use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use rusqlite::{params, Row};
use tracing::{info, warn};
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, username, name, email, password_hash, specialization, \
                               is_staff, is_superuser, is_active, created_at";

fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
        username: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        specialization: row.get(5)?,
        is_staff: row.get::<_, i64>(6)? != 0,
        is_superuser: row.get::<_, i64>(7)? != 0,
        is_active: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
    })
}

/// Account provisioning failures.
///
/// `DuplicateEmail` is the only constraint the API interprets; everything
/// else is reported as a generic server fault.
#[derive(Debug)]
pub enum ProvisionError {
    DuplicateEmail,
    Hash(bcrypt::BcryptError),
    Store(StoreError),
}

impl std::fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisionError::DuplicateEmail => write!(f, "Email already exists"),
            ProvisionError::Hash(e) => write!(f, "Password hashing failed: {}", e),
            ProvisionError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ProvisionError {}

impl From<StoreError> for ProvisionError {
    fn from(err: StoreError) -> Self {
        ProvisionError::Store(err)
    }
}

impl From<bcrypt::BcryptError> for ProvisionError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ProvisionError::Hash(err)
    }
}

/// Specialization recorded for a provisioned account: role "doctor" gets the
/// supplied specialization (or "Doctor" when none given), every other role
/// gets an empty string. The superuser flag is never set on this path.
fn specialization_for(role: &str, supplied: Option<&str>) -> String {
    if role.eq_ignore_ascii_case("doctor") {
        match supplied {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => "Doctor".to_string(),
        }
    } else {
        String::new()
    }
}

impl Database {
    /// Create the initial superuser if none exists yet.
    pub fn bootstrap_superuser(&self, email: &str, password: &str) -> Result<()> {
        let conn = self.conn.lock();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM accounts WHERE is_superuser = 1",
                [],
                |row| row.get(0),
            )
            .context("Failed to check for superuser accounts")?;

        if count > 0 {
            return Ok(());
        }

        let password_hash = hash(password, DEFAULT_COST).context("Failed to hash password")?;

        conn.execute(
            "INSERT INTO accounts (id, username, name, email, password_hash, specialization,
                                   is_staff, is_superuser, is_active, created_at)
             VALUES (?1, 'admin', 'Administrator', ?2, ?3, '', 1, 1, 1, ?4)",
            params![
                Uuid::new_v4().to_string(),
                email,
                password_hash,
                Utc::now().to_rfc3339(),
            ],
        )
        .context("Failed to insert superuser account")?;

        info!("🔐 Superuser account created (username: admin)");
        warn!("⚠️  CHANGE THE DEFAULT ADMIN PASSWORD IN PRODUCTION!");

        Ok(())
    }

    pub fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE username = ?1",
            ACCOUNT_COLUMNS
        ))?;

        match stmt.query_row(params![username], account_from_row) {
            Ok(account) => Ok(Some(account)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn account_by_id(&self, id: &Uuid) -> Result<Option<Account>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE id = ?1",
            ACCOUNT_COLUMNS
        ))?;

        match stmt.query_row(params![id.to_string()], account_from_row) {
            Ok(account) => Ok(Some(account)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify credentials and return the matching account.
    pub fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Account>> {
        match self.account_by_username(username).map_err(anyhow::Error::from)? {
            Some(account) => {
                let valid = verify(password, &account.password_hash)
                    .context("Failed to verify password")?;
                Ok(valid.then_some(account))
            }
            None => Ok(None),
        }
    }

    fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM accounts WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// First unused username for the given email local-part: the bare
    /// local-part, then with suffixes 1, 2, 3, ...
    fn next_free_username(&self, base: &str) -> Result<String, StoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT COUNT(*) FROM accounts WHERE username = ?1")?;

        let mut candidate = base.to_string();
        let mut counter = 1u32;
        loop {
            let count: i64 = stmt.query_row(params![candidate], |row| row.get(0))?;
            if count == 0 {
                return Ok(candidate);
            }
            candidate = format!("{}{}", base, counter);
            counter += 1;
        }
    }

    fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO accounts (id, username, name, email, password_hash, specialization,
                                   is_staff, is_superuser, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                account.id.to_string(),
                account.username,
                account.name,
                account.email,
                account.password_hash,
                account.specialization,
                account.is_staff as i64,
                account.is_superuser as i64,
                account.is_active as i64,
                account.created_at,
            ],
        )?;
        Ok(())
    }

    /// Provision a staff or doctor account.
    ///
    /// The username is derived from the email local-part with an increasing
    /// integer suffix on collision. The unique index is the source of truth:
    /// losing a race on the username constraint reruns the suffix search,
    /// losing it on the email constraint is a `DuplicateEmail`.
    pub fn provision_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
        specialization: Option<&str>,
    ) -> Result<Account, ProvisionError> {
        if self.email_exists(email)? {
            return Err(ProvisionError::DuplicateEmail);
        }

        let password_hash = hash(password, DEFAULT_COST)?;
        let base = email.split('@').next().unwrap_or(email);

        loop {
            let username = self.next_free_username(base)?;
            let account = Account {
                id: Uuid::new_v4(),
                username,
                name: name.to_string(),
                email: email.to_string(),
                password_hash: password_hash.clone(),
                specialization: specialization_for(role, specialization),
                is_staff: true,
                is_superuser: false,
                is_active: true,
                created_at: Utc::now().to_rfc3339(),
            };

            match self.insert_account(&account) {
                Ok(()) => {
                    info!(
                        "✅ Provisioned account: {} ({})",
                        account.username,
                        Role::resolve(&account).map_or("none", |r| r.as_str())
                    );
                    return Ok(account);
                }
                // Lost the race for this username, pick the next free one
                Err(e) if e.violates("accounts.username") => continue,
                Err(e) if e.violates("accounts.email") => {
                    return Err(ProvisionError::DuplicateEmail)
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Staff accounts ordered by name.
    pub fn list_staff(&self) -> Result<Vec<Account>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE is_staff = 1 ORDER BY name",
            ACCOUNT_COLUMNS
        ))?;

        let accounts = stmt
            .query_map([], account_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    /// Accounts that can act as the clinician on an appointment.
    pub fn list_doctors(&self) -> Result<Vec<Account>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE is_staff = 1 AND specialization != '' ORDER BY name",
            ACCOUNT_COLUMNS
        ))?;

        let accounts = stmt
            .query_map([], account_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    /// Admin edit of a staff account: name, email, and role selection, where
    /// choosing "doctor" rewrites the specialization and anything else
    /// clears it.
    pub fn update_staff(
        &self,
        id: &Uuid,
        name: &str,
        email: &str,
        role: &str,
        specialization: Option<&str>,
    ) -> Result<Account, ProvisionError> {
        let spec = specialization_for(role, specialization);

        {
            let conn = self.conn.lock();
            let changed = conn
                .execute(
                    "UPDATE accounts SET name = ?1, email = ?2, specialization = ?3
                     WHERE id = ?4",
                    params![name, email, spec, id.to_string()],
                )
                .map_err(StoreError::from)
                .map_err(|e| {
                    if e.violates("accounts.email") {
                        ProvisionError::DuplicateEmail
                    } else {
                        ProvisionError::Store(e)
                    }
                })?;

            if changed == 0 {
                return Err(ProvisionError::Store(StoreError::NotFound));
            }
        }

        self.account_by_id(id)?
            .ok_or(ProvisionError::Store(StoreError::NotFound))
    }

    /// Delete an account. Its appointments and sessions cascade away.
    pub fn delete_account(&self, id: &Uuid) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "DELETE FROM accounts WHERE id = ?1",
            params![id.to_string()],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound);
        }

        info!("🗑️  Deleted account: {}", id);
        Ok(())
    }

    // ----- sessions -----

    /// Open a new session bound to an account id.
    pub fn create_session(&self, account_id: &Uuid) -> Result<Uuid, StoreError> {
        let session_id = Uuid::new_v4();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (id, account_id, created_at) VALUES (?1, ?2, ?3)",
            params![
                session_id.to_string(),
                account_id.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(session_id)
    }

    /// Revoke a session unconditionally. Revoking an already-revoked or
    /// missing session is not an error.
    pub fn revoke_session(&self, session_id: &Uuid) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE sessions SET revoked = 1 WHERE id = ?1",
            params![session_id.to_string()],
        )?;
        Ok(())
    }

    pub fn session_active(&self, session_id: &Uuid) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE id = ?1 AND revoked = 0",
            params![session_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_db() -> (Database, NamedTempFile) {
        let temp = NamedTempFile::new().unwrap();
        let db = Database::new(temp.path().to_str().unwrap()).unwrap();
        (db, temp)
    }

    #[test]
    fn test_bootstrap_superuser_once() {
        let (db, _temp) = create_test_db();
        db.bootstrap_superuser("admin@clinic.local", "admin123").unwrap();
        db.bootstrap_superuser("admin@clinic.local", "admin123").unwrap();

        let admin = db.account_by_username("admin").unwrap().unwrap();
        assert!(admin.is_superuser);
        assert_eq!(Role::resolve(&admin), Some(Role::Admin));
    }

    #[test]
    fn test_credential_verification() {
        let (db, _temp) = create_test_db();
        db.bootstrap_superuser("admin@clinic.local", "admin123").unwrap();

        assert!(db.verify_credentials("admin", "admin123").unwrap().is_some());
        assert!(db.verify_credentials("admin", "wrong").unwrap().is_none());
        assert!(db.verify_credentials("nobody", "admin123").unwrap().is_none());
    }

    #[test]
    fn test_provision_doctor_sets_flags() {
        let (db, _temp) = create_test_db();

        let doctor = db
            .provision_account("Jane Doe", "jane@clinic.com", "password123", "doctor", None)
            .unwrap();

        assert_eq!(doctor.username, "jane");
        assert!(doctor.is_staff);
        assert!(!doctor.is_superuser);
        assert_eq!(doctor.specialization, "Doctor");
        assert_eq!(Role::resolve(&doctor), Some(Role::Doctor));
    }

    #[test]
    fn test_provision_staff_clears_specialization() {
        let (db, _temp) = create_test_db();

        let staff = db
            .provision_account(
                "Bob",
                "bob@clinic.com",
                "password123",
                "staff",
                Some("ignored"),
            )
            .unwrap();

        assert_eq!(staff.specialization, "");
        assert_eq!(Role::resolve(&staff), Some(Role::Staff));
    }

    #[test]
    fn test_username_suffix_on_local_part_collision() {
        let (db, _temp) = create_test_db();

        let first = db
            .provision_account("A", "a@x.com", "password123", "staff", None)
            .unwrap();
        let second = db
            .provision_account("A", "a@y.com", "password123", "staff", None)
            .unwrap();
        let third = db
            .provision_account("A", "a@z.com", "password123", "staff", None)
            .unwrap();

        assert_eq!(first.username, "a");
        assert_eq!(second.username, "a1");
        assert_eq!(third.username, "a2");
    }

    #[test]
    fn test_duplicate_email_rejected_before_mutation() {
        let (db, _temp) = create_test_db();

        db.provision_account("A", "a@x.com", "password123", "staff", None)
            .unwrap();
        let err = db
            .provision_account("B", "a@x.com", "password123", "doctor", None)
            .unwrap_err();

        assert!(matches!(err, ProvisionError::DuplicateEmail));
        // No second account was created under a suffixed username
        assert_eq!(db.list_staff().unwrap().len(), 1);
    }

    #[test]
    fn test_update_staff_role_rewrites_specialization() {
        let (db, _temp) = create_test_db();

        let acct = db
            .provision_account("A", "a@x.com", "password123", "staff", None)
            .unwrap();

        let updated = db
            .update_staff(&acct.id, "A", "a@x.com", "doctor", None)
            .unwrap();
        assert_eq!(updated.specialization, "Doctor");

        let back = db
            .update_staff(&acct.id, "A", "a@x.com", "staff", None)
            .unwrap();
        assert_eq!(back.specialization, "");
    }

    #[test]
    fn test_session_lifecycle() {
        let (db, _temp) = create_test_db();
        db.bootstrap_superuser("admin@clinic.local", "admin123").unwrap();
        let admin = db.account_by_username("admin").unwrap().unwrap();

        let sid = db.create_session(&admin.id).unwrap();
        assert!(db.session_active(&sid).unwrap());

        db.revoke_session(&sid).unwrap();
        assert!(!db.session_active(&sid).unwrap());

        // Revoking again is harmless
        db.revoke_session(&sid).unwrap();
    }

    #[test]
    fn test_delete_account_cascades_sessions() {
        let (db, _temp) = create_test_db();

        let acct = db
            .provision_account("A", "a@x.com", "password123", "staff", None)
            .unwrap();
        let sid = db.create_session(&acct.id).unwrap();

        db.delete_account(&acct.id).unwrap();

        assert!(!db.session_active(&sid).unwrap());
        assert!(matches!(
            db.delete_account(&acct.id),
            Err(StoreError::NotFound)
        ));
    }
}
