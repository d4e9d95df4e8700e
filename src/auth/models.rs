//! Authentication Models
//! Mission: Define account, role, and session data structures

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Login-capable identity (admin, doctor, or staff member)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub specialization: String, // non-empty marks a doctor
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub created_at: String,
}

/// Derived role for RBAC.
///
/// Never stored: always recomputed from the account's primitive flags so the
/// displayed role cannot drift from them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin, // Full access, including staff management
    #[serde(rename = "doctor")]
    Doctor, // Staff account with a specialization
    #[serde(rename = "staff")]
    Staff, // Staff account without a specialization
}

impl Role {
    /// Derive the effective role from account flags.
    ///
    /// Accounts that are neither superuser nor staff resolve to `None` and
    /// must be rejected at login.
    pub fn resolve(account: &Account) -> Option<Role> {
        if account.is_superuser {
            Some(Role::Admin)
        } else if account.is_staff && !account.specialization.is_empty() {
            Some(Role::Doctor)
        } else if account.is_staff {
            Some(Role::Staff)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Staff => "staff",
        }
    }

    /// Title used when prefixing display names ("Admin Jane Doe")
    pub fn title(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Doctor => "Doctor",
            Role::Staff => "Staff",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "doctor" => Some(Role::Doctor),
            "staff" => Some(Role::Staff),
            _ => None,
        }
    }
}

/// JWT Claims payload.
///
/// The role is deliberately absent: the middleware reloads the account and
/// re-resolves it on every request instead of trusting a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject (account id)
    pub sid: String, // session id, revocable via logout
    pub username: String,
    pub exp: usize, // expiration timestamp
}

/// Authenticated request context, inserted into request extensions by the
/// auth middleware and passed explicitly into every authorization check.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub account_id: Uuid,
    pub username: String,
    pub name: String,
    pub role: Role,
    pub session_id: Uuid,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Role the caller claims to hold; must match the resolved role
    pub role: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: usize, // seconds until expiration
    pub role: Role,
    pub user: AccountResponse,
}

/// Account response (sanitized)
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: Option<Role>,
    pub specialization: String,
    pub is_active: bool,
    pub created_at: String,
}

impl AccountResponse {
    pub fn from_account(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            username: account.username.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            role: Role::resolve(account),
            specialization: account.specialization.clone(),
            is_active: account.is_active,
            created_at: account.created_at.clone(),
        }
    }
}

/// Staff creation request (admin only)
#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub specialization: Option<String>,
}

/// Staff update request (admin only)
#[derive(Debug, Deserialize)]
pub struct UpdateStaffRequest {
    pub name: String,
    pub email: String,
    pub role: String,
    pub specialization: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(is_superuser: bool, is_staff: bool, specialization: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "u".to_string(),
            name: "U".to_string(),
            email: "u@clinic.local".to_string(),
            password_hash: "hash".to_string(),
            specialization: specialization.to_string(),
            is_staff,
            is_superuser,
            is_active: true,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_role_resolution_is_exhaustive() {
        // Superuser wins regardless of the other fields
        assert_eq!(Role::resolve(&account(true, false, "")), Some(Role::Admin));
        assert_eq!(
            Role::resolve(&account(true, true, "Cardiology")),
            Some(Role::Admin)
        );

        // Staff with a specialization is a doctor
        assert_eq!(
            Role::resolve(&account(false, true, "Doctor")),
            Some(Role::Doctor)
        );

        // Staff without one is generic staff
        assert_eq!(Role::resolve(&account(false, true, "")), Some(Role::Staff));

        // Neither flag: no dashboard role
        assert_eq!(Role::resolve(&account(false, false, "")), None);
        assert_eq!(Role::resolve(&account(false, false, "Doctor")), None);
    }

    #[test]
    fn test_role_serialization() {
        let admin = Role::Admin;
        let json = serde_json::to_string(&admin).unwrap();
        assert_eq!(json, r#""admin""#);

        let doctor: Role = serde_json::from_str(r#""doctor""#).unwrap();
        assert_eq!(doctor, Role::Doctor);
    }

    #[test]
    fn test_role_string_conversion() {
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::Doctor.as_str(), "doctor");
        assert_eq!(Role::Staff.as_str(), "staff");

        assert_eq!(Role::from_str("admin"), Some(Role::Admin));
        assert_eq!(Role::from_str("DOCTOR"), Some(Role::Doctor));
        assert_eq!(Role::from_str("nurse"), None);
    }

    #[test]
    fn test_account_response_hides_hash() {
        let acct = account(false, true, "Doctor");
        let json = serde_json::to_string(&acct).unwrap();
        assert!(!json.contains("hash"));

        let resp = AccountResponse::from_account(&acct);
        assert_eq!(resp.role, Some(Role::Doctor));
    }
}
