//! Patient Registry
//! Mission: Patient record CRUD over SQLite

use crate::db::{Database, StoreError};
use crate::patients::models::{Gender, Patient, PatientForm};
use chrono::Utc;
use rusqlite::{params, Row};
use tracing::info;
use uuid::Uuid;

const PATIENT_COLUMNS: &str =
    "id, name, age, gender, medical_history, email, phone, address, created_at";

fn patient_from_row(row: &Row) -> rusqlite::Result<Patient> {
    let gender_code: String = row.get(3)?;
    Ok(Patient {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
        name: row.get(1)?,
        age: row.get::<_, i64>(2)? as u32,
        gender: Gender::from_code(&gender_code).unwrap_or(Gender::Other),
        medical_history: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        address: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl Database {
    /// Create a patient record from an intake form.
    pub fn insert_patient(&self, form: &PatientForm) -> Result<Patient, StoreError> {
        let patient = Patient {
            id: Uuid::new_v4(),
            name: form.name.trim().to_string(),
            age: form.age,
            gender: form.gender,
            medical_history: form.medical_history.clone(),
            email: form.email.trim().to_string(),
            phone: form.phone.clone(),
            address: form.address.clone(),
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO patients (id, name, age, gender, medical_history, email, phone,
                                   address, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                patient.id.to_string(),
                patient.name,
                patient.age as i64,
                patient.gender.code(),
                patient.medical_history,
                patient.email,
                patient.phone,
                patient.address,
                patient.created_at,
            ],
        )?;

        info!("✅ Registered patient: {}", patient.name);
        Ok(patient)
    }

    /// All patients ordered by name.
    pub fn list_patients(&self) -> Result<Vec<Patient>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM patients ORDER BY name",
            PATIENT_COLUMNS
        ))?;

        let patients = stmt
            .query_map([], patient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(patients)
    }

    pub fn patient_by_id(&self, id: &Uuid) -> Result<Option<Patient>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM patients WHERE id = ?1",
            PATIENT_COLUMNS
        ))?;

        match stmt.query_row(params![id.to_string()], patient_from_row) {
            Ok(patient) => Ok(Some(patient)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_patient(&self, id: &Uuid, form: &PatientForm) -> Result<Patient, StoreError> {
        {
            let conn = self.conn.lock();
            let changed = conn.execute(
                "UPDATE patients SET name = ?1, age = ?2, gender = ?3, medical_history = ?4,
                                     email = ?5, phone = ?6, address = ?7
                 WHERE id = ?8",
                params![
                    form.name.trim(),
                    form.age as i64,
                    form.gender.code(),
                    form.medical_history,
                    form.email.trim(),
                    form.phone,
                    form.address,
                    id.to_string(),
                ],
            )?;

            if changed == 0 {
                return Err(StoreError::NotFound);
            }
        }

        self.patient_by_id(id)?.ok_or(StoreError::NotFound)
    }

    /// Delete a patient. Their appointments cascade away.
    pub fn delete_patient(&self, id: &Uuid) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "DELETE FROM patients WHERE id = ?1",
            params![id.to_string()],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound);
        }

        info!("🗑️  Deleted patient: {}", id);
        Ok(())
    }
}
