//! Patient Models
//! Mission: Patient record data structures and intake validation

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Patient demographics and medical history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub medical_history: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
}

impl Gender {
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "O",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            "O" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// Intake / edit form for a patient record
#[derive(Debug, Deserialize)]
pub struct PatientForm {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    #[serde(default)]
    pub medical_history: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl PatientForm {
    /// Field validation; failures are redisplayed to the client as a
    /// message, never surfaced as a fault.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name is required".to_string());
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err("A valid email is required".to_string());
        }
        if self.age == 0 || self.age > 150 {
            return Err("Age must be between 1 and 150".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> PatientForm {
        PatientForm {
            name: "Alice".to_string(),
            age: 30,
            gender: Gender::Female,
            medical_history: String::new(),
            email: "alice@example.com".to_string(),
            phone: String::new(),
            address: String::new(),
        }
    }

    #[test]
    fn test_gender_codes() {
        assert_eq!(Gender::Male.code(), "M");
        assert_eq!(Gender::from_code("O"), Some(Gender::Other));
        assert_eq!(Gender::from_code("X"), None);

        let json = serde_json::to_string(&Gender::Female).unwrap();
        assert_eq!(json, r#""F""#);
    }

    #[test]
    fn test_form_validation() {
        assert!(form().validate().is_ok());

        let mut bad = form();
        bad.name = "  ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = form();
        bad.email = "not-an-email".to_string();
        assert!(bad.validate().is_err());

        let mut bad = form();
        bad.age = 0;
        assert!(bad.validate().is_err());
    }
}
