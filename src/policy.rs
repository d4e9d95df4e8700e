//! Access Policy
//! Mission: Gate every exposed operation by the caller's resolved role

use crate::auth::models::{CurrentUser, Role};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

/// Every operation the service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    PatientIntake,
    AddStaff,
    EditStaff,
    DeleteStaff,
    ListStaff,
    AddAppointment,
    ViewAppointment,
    EditAppointment,
    DeleteAppointment,
    SetAppointmentStatus,
    ManageAppointments,
    ListPatients,
    EditPatient,
    DeletePatient,
    PatientDetail,
    Dashboard,
}

/// Denials carry no entity information; ownership misses on appointments are
/// reported as NotFound by the callers instead (no existence leakage).
#[derive(Debug, PartialEq, Eq)]
pub enum PolicyError {
    Unauthenticated,
    Forbidden,
}

impl IntoResponse for PolicyError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            PolicyError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Authentication required")
            }
            PolicyError::Forbidden => (StatusCode::FORBIDDEN, "Insufficient permissions"),
        };
        (status, message).into_response()
    }
}

/// Authorize an action for the (possibly anonymous) caller.
///
/// Rules, in evaluation order:
/// - anonymous callers may only log in or submit patient intake
/// - staff management requires Admin
/// - booking requires Doctor or Staff
/// - everything else is open to any authenticated account; per-row
///   appointment access is additionally scoped via [`appointment_scope`]
pub fn authorize(caller: Option<&CurrentUser>, action: Action) -> Result<(), PolicyError> {
    let Some(user) = caller else {
        return match action {
            Action::Login | Action::PatientIntake => Ok(()),
            _ => Err(PolicyError::Unauthenticated),
        };
    };

    match action {
        Action::AddStaff | Action::EditStaff | Action::DeleteStaff => {
            if user.role == Role::Admin {
                Ok(())
            } else {
                Err(PolicyError::Forbidden)
            }
        }
        Action::AddAppointment => match user.role {
            Role::Doctor | Role::Staff => Ok(()),
            Role::Admin => Err(PolicyError::Forbidden),
        },
        _ => Ok(()),
    }
}

/// Row scope for appointment view/edit/delete/status operations: admins see
/// every appointment, doctors and staff only their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentScope {
    All,
    Own(Uuid),
}

pub fn appointment_scope(user: &CurrentUser) -> AppointmentScope {
    match user.role {
        Role::Admin => AppointmentScope::All,
        Role::Doctor | Role::Staff => AppointmentScope::Own(user.account_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            account_id: Uuid::new_v4(),
            username: "u".to_string(),
            name: "U".to_string(),
            role,
            session_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_anonymous_callers() {
        assert_eq!(authorize(None, Action::Login), Ok(()));
        assert_eq!(authorize(None, Action::PatientIntake), Ok(()));

        for action in [
            Action::AddStaff,
            Action::ListPatients,
            Action::ManageAppointments,
            Action::Dashboard,
        ] {
            assert_eq!(authorize(None, action), Err(PolicyError::Unauthenticated));
        }
    }

    #[test]
    fn test_staff_management_is_admin_only() {
        for action in [Action::AddStaff, Action::EditStaff, Action::DeleteStaff] {
            assert_eq!(authorize(Some(&user(Role::Admin)), action), Ok(()));
            assert_eq!(
                authorize(Some(&user(Role::Doctor)), action),
                Err(PolicyError::Forbidden)
            );
            assert_eq!(
                authorize(Some(&user(Role::Staff)), action),
                Err(PolicyError::Forbidden)
            );
        }
    }

    #[test]
    fn test_booking_requires_staff_flag() {
        assert_eq!(
            authorize(Some(&user(Role::Doctor)), Action::AddAppointment),
            Ok(())
        );
        assert_eq!(
            authorize(Some(&user(Role::Staff)), Action::AddAppointment),
            Ok(())
        );
        assert_eq!(
            authorize(Some(&user(Role::Admin)), Action::AddAppointment),
            Err(PolicyError::Forbidden)
        );
    }

    #[test]
    fn test_patient_operations_open_to_authenticated() {
        for role in [Role::Admin, Role::Doctor, Role::Staff] {
            for action in [
                Action::ListPatients,
                Action::EditPatient,
                Action::DeletePatient,
                Action::PatientDetail,
                Action::ListStaff,
                Action::ManageAppointments,
                Action::Dashboard,
            ] {
                assert_eq!(authorize(Some(&user(role)), action), Ok(()));
            }
        }
    }

    #[test]
    fn test_appointment_scope() {
        let admin = user(Role::Admin);
        assert_eq!(appointment_scope(&admin), AppointmentScope::All);

        let doctor = user(Role::Doctor);
        assert_eq!(
            appointment_scope(&doctor),
            AppointmentScope::Own(doctor.account_id)
        );

        let staff = user(Role::Staff);
        assert_eq!(
            appointment_scope(&staff),
            AppointmentScope::Own(staff.account_id)
        );
    }
}
