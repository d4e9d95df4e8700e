//! Appointment Ledger
//! Mission: Appointment CRUD and status transitions over SQLite

use crate::appointments::models::{
    Appointment, AppointmentDetail, AppointmentStatus, BookAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::db::{Database, StoreError};
use crate::policy::AppointmentScope;
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Row};
use tracing::info;
use uuid::Uuid;

const DETAIL_SELECT: &str = "SELECT a.id, a.account_id, acc.name, a.patient_id, p.name, \
                             a.date, a.time, a.status, a.notes \
                             FROM appointments a \
                             JOIN accounts acc ON acc.id = a.account_id \
                             JOIN patients p ON p.id = a.patient_id";

fn appointment_from_row(row: &Row) -> rusqlite::Result<Appointment> {
    let date_s: String = row.get(3)?;
    let time_s: String = row.get(4)?;
    let status_s: String = row.get(5)?;
    Ok(Appointment {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
        account_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap(),
        patient_id: Uuid::parse_str(&row.get::<_, String>(2)?).unwrap(),
        date: NaiveDate::parse_from_str(&date_s, "%Y-%m-%d").unwrap(),
        time: NaiveTime::parse_from_str(&time_s, "%H:%M:%S").unwrap(),
        status: AppointmentStatus::from_code(&status_s).unwrap_or(AppointmentStatus::Scheduled),
        notes: row.get(6)?,
    })
}

fn detail_from_row(row: &Row) -> rusqlite::Result<AppointmentDetail> {
    let date_s: String = row.get(5)?;
    let time_s: String = row.get(6)?;
    let status_s: String = row.get(7)?;
    let status =
        AppointmentStatus::from_code(&status_s).unwrap_or(AppointmentStatus::Scheduled);
    Ok(AppointmentDetail {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
        doctor_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap(),
        doctor_name: row.get(2)?,
        patient_id: Uuid::parse_str(&row.get::<_, String>(3)?).unwrap(),
        patient_name: row.get(4)?,
        date: NaiveDate::parse_from_str(&date_s, "%Y-%m-%d").unwrap(),
        time: NaiveTime::parse_from_str(&time_s, "%H:%M:%S").unwrap(),
        status,
        status_label: status.label().to_string(),
        notes: row.get(8)?,
    })
}

impl Database {
    /// Book an appointment. Status always starts at Scheduled.
    pub fn insert_appointment(
        &self,
        clinician_id: &Uuid,
        req: &BookAppointmentRequest,
    ) -> Result<Appointment, StoreError> {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            account_id: *clinician_id,
            patient_id: req.patient_id,
            date: req.date,
            time: req.time,
            status: AppointmentStatus::Scheduled,
            notes: req.notes.clone(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO appointments (id, account_id, patient_id, date, time, status, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                appointment.id.to_string(),
                appointment.account_id.to_string(),
                appointment.patient_id.to_string(),
                appointment.date.to_string(),
                appointment.time.format("%H:%M:%S").to_string(),
                appointment.status.code(),
                appointment.notes,
            ],
        )?;

        info!(
            "✅ Booked appointment {} on {} {}",
            appointment.id, appointment.date, appointment.time
        );
        Ok(appointment)
    }

    /// Fetch an appointment within the caller's scope. Out-of-scope rows are
    /// indistinguishable from missing ones.
    pub fn appointment_by_id(
        &self,
        id: &Uuid,
        scope: AppointmentScope,
    ) -> Result<Option<Appointment>, StoreError> {
        let conn = self.conn.lock();
        let result = match scope {
            AppointmentScope::All => conn.query_row(
                "SELECT id, account_id, patient_id, date, time, status, notes
                 FROM appointments WHERE id = ?1",
                params![id.to_string()],
                appointment_from_row,
            ),
            AppointmentScope::Own(account_id) => conn.query_row(
                "SELECT id, account_id, patient_id, date, time, status, notes
                 FROM appointments WHERE id = ?1 AND account_id = ?2",
                params![id.to_string(), account_id.to_string()],
                appointment_from_row,
            ),
        };

        match result {
            Ok(appointment) => Ok(Some(appointment)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Scoped fetch joined with clinician and patient names.
    pub fn appointment_detail(
        &self,
        id: &Uuid,
        scope: AppointmentScope,
    ) -> Result<Option<AppointmentDetail>, StoreError> {
        let conn = self.conn.lock();
        let result = match scope {
            AppointmentScope::All => conn.query_row(
                &format!("{} WHERE a.id = ?1", DETAIL_SELECT),
                params![id.to_string()],
                detail_from_row,
            ),
            AppointmentScope::Own(account_id) => conn.query_row(
                &format!("{} WHERE a.id = ?1 AND a.account_id = ?2", DETAIL_SELECT),
                params![id.to_string(), account_id.to_string()],
                detail_from_row,
            ),
        };

        match result {
            Ok(detail) => Ok(Some(detail)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Every appointment, most recent first.
    pub fn list_appointments(&self) -> Result<Vec<AppointmentDetail>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY a.date DESC, a.time DESC",
            DETAIL_SELECT
        ))?;

        let appointments = stmt
            .query_map([], detail_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(appointments)
    }

    /// One clinician's appointments, most recent first.
    pub fn list_appointments_for_account(
        &self,
        account_id: &Uuid,
    ) -> Result<Vec<AppointmentDetail>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE a.account_id = ?1 ORDER BY a.date DESC, a.time DESC",
            DETAIL_SELECT
        ))?;

        let appointments = stmt
            .query_map(params![account_id.to_string()], detail_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(appointments)
    }

    /// Appointments linking one clinician to one patient.
    pub fn list_appointments_for_account_and_patient(
        &self,
        account_id: &Uuid,
        patient_id: &Uuid,
    ) -> Result<Vec<AppointmentDetail>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE a.account_id = ?1 AND a.patient_id = ?2
             ORDER BY a.date DESC, a.time DESC",
            DETAIL_SELECT
        ))?;

        let appointments = stmt
            .query_map(
                params![account_id.to_string(), patient_id.to_string()],
                detail_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(appointments)
    }

    /// Scoped full edit.
    pub fn update_appointment(
        &self,
        id: &Uuid,
        scope: AppointmentScope,
        req: &UpdateAppointmentRequest,
    ) -> Result<Appointment, StoreError> {
        {
            let conn = self.conn.lock();
            let changed = match scope {
                AppointmentScope::All => conn.execute(
                    "UPDATE appointments
                     SET account_id = ?1, patient_id = ?2, date = ?3, time = ?4,
                         status = ?5, notes = ?6
                     WHERE id = ?7",
                    params![
                        req.doctor_id.to_string(),
                        req.patient_id.to_string(),
                        req.date.to_string(),
                        req.time.format("%H:%M:%S").to_string(),
                        req.status.code(),
                        req.notes,
                        id.to_string(),
                    ],
                )?,
                AppointmentScope::Own(account_id) => conn.execute(
                    "UPDATE appointments
                     SET account_id = ?1, patient_id = ?2, date = ?3, time = ?4,
                         status = ?5, notes = ?6
                     WHERE id = ?7 AND account_id = ?8",
                    params![
                        req.doctor_id.to_string(),
                        req.patient_id.to_string(),
                        req.date.to_string(),
                        req.time.format("%H:%M:%S").to_string(),
                        req.status.code(),
                        req.notes,
                        id.to_string(),
                        account_id.to_string(),
                    ],
                )?,
            };

            if changed == 0 {
                return Err(StoreError::NotFound);
            }
        }

        self.appointment_by_id(id, AppointmentScope::All)?
            .ok_or(StoreError::NotFound)
    }

    /// Scoped status transition. The status code is validated by the caller
    /// before this runs; the row is untouched when out of scope.
    pub fn set_appointment_status(
        &self,
        id: &Uuid,
        scope: AppointmentScope,
        status: AppointmentStatus,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = match scope {
            AppointmentScope::All => conn.execute(
                "UPDATE appointments SET status = ?1 WHERE id = ?2",
                params![status.code(), id.to_string()],
            )?,
            AppointmentScope::Own(account_id) => conn.execute(
                "UPDATE appointments SET status = ?1 WHERE id = ?2 AND account_id = ?3",
                params![status.code(), id.to_string(), account_id.to_string()],
            )?,
        };

        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Scoped delete.
    pub fn delete_appointment(
        &self,
        id: &Uuid,
        scope: AppointmentScope,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = match scope {
            AppointmentScope::All => conn.execute(
                "DELETE FROM appointments WHERE id = ?1",
                params![id.to_string()],
            )?,
            AppointmentScope::Own(account_id) => conn.execute(
                "DELETE FROM appointments WHERE id = ?1 AND account_id = ?2",
                params![id.to_string(), account_id.to_string()],
            )?,
        };

        if changed == 0 {
            return Err(StoreError::NotFound);
        }

        info!("🗑️  Deleted appointment: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patients::models::{Gender, PatientForm};
    use tempfile::NamedTempFile;

    fn create_test_db() -> (Database, NamedTempFile) {
        let temp = NamedTempFile::new().unwrap();
        let db = Database::new(temp.path().to_str().unwrap()).unwrap();
        (db, temp)
    }

    fn seed(db: &Database) -> (Uuid, Uuid) {
        let doctor = db
            .provision_account("Jane Doe", "jane@clinic.com", "password123", "doctor", None)
            .unwrap();
        let patient = db
            .insert_patient(&PatientForm {
                name: "Alice".to_string(),
                age: 30,
                gender: Gender::Female,
                medical_history: String::new(),
                email: "alice@example.com".to_string(),
                phone: String::new(),
                address: String::new(),
            })
            .unwrap();
        (doctor.id, patient.id)
    }

    fn booking(patient_id: Uuid, date: &str, time: &str) -> BookAppointmentRequest {
        BookAppointmentRequest {
            doctor_id: None,
            patient_id,
            date: date.parse().unwrap(),
            time: NaiveTime::parse_from_str(time, "%H:%M:%S").unwrap(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_booking_starts_scheduled() {
        let (db, _temp) = create_test_db();
        let (doctor_id, patient_id) = seed(&db);

        let appt = db
            .insert_appointment(&doctor_id, &booking(patient_id, "2024-06-01", "09:00:00"))
            .unwrap();

        assert_eq!(appt.status, AppointmentStatus::Scheduled);

        let fetched = db
            .appointment_by_id(&appt.id, AppointmentScope::All)
            .unwrap()
            .unwrap();
        assert_eq!(fetched.date.to_string(), "2024-06-01");
        assert_eq!(fetched.status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn test_scoped_access_hides_other_clinicians_rows() {
        let (db, _temp) = create_test_db();
        let (doctor_id, patient_id) = seed(&db);
        let other = db
            .provision_account("Bob", "bob@clinic.com", "password123", "doctor", None)
            .unwrap();

        let appt = db
            .insert_appointment(&doctor_id, &booking(patient_id, "2024-06-01", "09:00:00"))
            .unwrap();

        // Owner and admin scope see it
        assert!(db
            .appointment_by_id(&appt.id, AppointmentScope::Own(doctor_id))
            .unwrap()
            .is_some());
        assert!(db
            .appointment_by_id(&appt.id, AppointmentScope::All)
            .unwrap()
            .is_some());

        // Another clinician gets the same answer as for a missing row
        assert!(db
            .appointment_by_id(&appt.id, AppointmentScope::Own(other.id))
            .unwrap()
            .is_none());
        assert!(matches!(
            db.delete_appointment(&appt.id, AppointmentScope::Own(other.id)),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_status_transitions() {
        let (db, _temp) = create_test_db();
        let (doctor_id, patient_id) = seed(&db);

        let appt = db
            .insert_appointment(&doctor_id, &booking(patient_id, "2024-06-01", "09:00:00"))
            .unwrap();

        db.set_appointment_status(&appt.id, AppointmentScope::All, AppointmentStatus::Completed)
            .unwrap();
        let fetched = db
            .appointment_by_id(&appt.id, AppointmentScope::All)
            .unwrap()
            .unwrap();
        assert_eq!(fetched.status, AppointmentStatus::Completed);

        // Back to Scheduled is allowed
        db.set_appointment_status(&appt.id, AppointmentScope::All, AppointmentStatus::Scheduled)
            .unwrap();
        let fetched = db
            .appointment_by_id(&appt.id, AppointmentScope::All)
            .unwrap()
            .unwrap();
        assert_eq!(fetched.status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn test_listing_order_is_most_recent_first() {
        let (db, _temp) = create_test_db();
        let (doctor_id, patient_id) = seed(&db);

        db.insert_appointment(&doctor_id, &booking(patient_id, "2024-06-01", "09:00:00"))
            .unwrap();
        db.insert_appointment(&doctor_id, &booking(patient_id, "2024-06-02", "08:00:00"))
            .unwrap();
        db.insert_appointment(&doctor_id, &booking(patient_id, "2024-06-02", "14:00:00"))
            .unwrap();

        let all = db.list_appointments().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].date.to_string(), "2024-06-02");
        assert_eq!(all[0].time.format("%H:%M:%S").to_string(), "14:00:00");
        assert_eq!(all[2].date.to_string(), "2024-06-01");
        assert_eq!(all[0].doctor_name, "Jane Doe");
        assert_eq!(all[0].patient_name, "Alice");
    }

    #[test]
    fn test_deleting_account_cascades_appointments() {
        let (db, _temp) = create_test_db();
        let (doctor_id, patient_id) = seed(&db);

        let appt = db
            .insert_appointment(&doctor_id, &booking(patient_id, "2024-06-01", "09:00:00"))
            .unwrap();

        db.delete_account(&doctor_id).unwrap();

        assert!(db
            .appointment_by_id(&appt.id, AppointmentScope::All)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_deleting_patient_cascades_appointments() {
        let (db, _temp) = create_test_db();
        let (doctor_id, patient_id) = seed(&db);

        let appt = db
            .insert_appointment(&doctor_id, &booking(patient_id, "2024-06-01", "09:00:00"))
            .unwrap();

        db.delete_patient(&patient_id).unwrap();

        assert!(db
            .appointment_by_id(&appt.id, AppointmentScope::All)
            .unwrap()
            .is_none());
    }
}
