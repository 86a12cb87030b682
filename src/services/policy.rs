//! Who may do what.
//!
//! Every action asks the table below once instead of comparing role strings
//! inline. `Scope::Own` means the resource must belong to the caller: for a
//! patient, the resource's patient id is theirs; for a doctor, the resource's
//! doctor id is theirs.

use crate::errors::AppError;
use crate::models::Role;
use crate::services::identity::Caller;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateAppointment,
    ReadAppointment,
    UpdateAppointment,
    CancelAppointment,
    ViewSlots,
    ManageUsers,
    ManageDepartments,
    ManageProviders,
    CreatePatient,
    ReadPatient,
    UpdatePatient,
    ListDoctors,
    WriteRecord,
    ReadRecord,
    Prescribe,
    ReadMedication,
    UpdateMedication,
    OrderLab,
    ReadLab,
    UpdateLab,
    SubmitFeedback,
    ReadFeedback,
    ManageFeedback,
    ViewClinicReports,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Any,
    Own,
    Deny,
}

/// Appointment fields a patient may change on their own booking.
pub const PATIENT_APPOINTMENT_FIELDS: &[&str] = &["reason", "symptoms"];

pub fn scope(role: Role, op: Operation) -> Scope {
    use Operation::*;

    match role {
        Role::Admin => match op {
            SubmitFeedback => Scope::Deny,
            _ => Scope::Any,
        },
        Role::Staff => match op {
            ManageUsers | ManageDepartments | ManageProviders | SubmitFeedback | Prescribe => {
                Scope::Deny
            }
            _ => Scope::Any,
        },
        Role::Doctor => match op {
            ViewSlots | ListDoctors => Scope::Any,
            CreateAppointment | ReadAppointment | UpdateAppointment | CancelAppointment
            | ReadPatient | WriteRecord | ReadRecord | Prescribe | ReadMedication
            | UpdateMedication | OrderLab | ReadLab | UpdateLab | ReadFeedback => Scope::Own,
            ManageUsers | ManageDepartments | ManageProviders | CreatePatient | UpdatePatient
            | SubmitFeedback | ManageFeedback | ViewClinicReports => Scope::Deny,
        },
        Role::Patient => match op {
            ViewSlots | ListDoctors => Scope::Any,
            CreateAppointment | ReadAppointment | UpdateAppointment | CancelAppointment
            | ReadPatient | UpdatePatient | ReadRecord | ReadMedication | ReadLab
            | SubmitFeedback | ReadFeedback => Scope::Own,
            ManageUsers | ManageDepartments | ManageProviders | CreatePatient | WriteRecord
            | Prescribe | UpdateMedication | OrderLab | UpdateLab | ManageFeedback
            | ViewClinicReports => Scope::Deny,
        },
    }
}

/// `None` means every field may be updated.
pub fn updatable_appointment_fields(role: Role) -> Option<&'static [&'static str]> {
    match role {
        Role::Patient => Some(PATIENT_APPOINTMENT_FIELDS),
        Role::Doctor | Role::Staff | Role::Admin => None,
    }
}

/// The parties a resource belongs to.
#[derive(Debug, Clone, Copy, Default)]
pub struct Owners {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
}

impl Owners {
    pub fn new(patient_id: i64, doctor_id: i64) -> Self {
        Self {
            patient_id: Some(patient_id),
            doctor_id: Some(doctor_id),
        }
    }

    pub fn patient(patient_id: i64) -> Self {
        Self {
            patient_id: Some(patient_id),
            doctor_id: None,
        }
    }
}

impl Caller {
    /// The caller's scope for `op`; Deny becomes Forbidden.
    pub fn scope_for(&self, op: Operation) -> Result<Scope, AppError> {
        match scope(self.role, op) {
            Scope::Deny => {
                tracing::warn!(user_id = self.user_id, role = self.role.as_str(), ?op, "operation denied");
                Err(AppError::forbidden(format!(
                    "{} accounts cannot perform this action",
                    self.role.as_str()
                )))
            }
            scope => Ok(scope),
        }
    }

    pub fn owns(&self, owners: &Owners) -> bool {
        match self.role {
            Role::Patient => self.patient_id.is_some() && self.patient_id == owners.patient_id,
            Role::Doctor => self.doctor_id.is_some() && self.doctor_id == owners.doctor_id,
            Role::Admin | Role::Staff => false,
        }
    }

    /// Checks `op` against a specific resource.
    pub fn authorize(&self, op: Operation, owners: &Owners) -> Result<(), AppError> {
        match self.scope_for(op)? {
            Scope::Any => Ok(()),
            Scope::Own if self.owns(owners) => Ok(()),
            _ => {
                tracing::warn!(user_id = self.user_id, ?op, "access to another party's resource denied");
                Err(AppError::forbidden("you do not have access to this resource"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role) -> Caller {
        Caller {
            user_id: 1,
            name: "Test".to_string(),
            role,
            patient_id: (role == Role::Patient).then_some(10),
            doctor_id: (role == Role::Doctor).then_some(20),
        }
    }

    #[test]
    fn test_staff_and_admin_reach_any_appointment() {
        for role in [Role::Staff, Role::Admin] {
            let c = caller(role);
            for op in [
                Operation::CreateAppointment,
                Operation::ReadAppointment,
                Operation::UpdateAppointment,
                Operation::CancelAppointment,
            ] {
                assert!(c.authorize(op, &Owners::new(99, 98)).is_ok());
            }
        }
    }

    #[test]
    fn test_patient_only_own_appointments() {
        let c = caller(Role::Patient);
        assert!(c.authorize(Operation::ReadAppointment, &Owners::new(10, 98)).is_ok());
        assert!(matches!(
            c.authorize(Operation::ReadAppointment, &Owners::new(11, 98)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_doctor_only_own_appointments() {
        let c = caller(Role::Doctor);
        assert!(c.authorize(Operation::CancelAppointment, &Owners::new(1, 20)).is_ok());
        assert!(c.authorize(Operation::CancelAppointment, &Owners::new(1, 21)).is_err());
    }

    #[test]
    fn test_denied_operations() {
        assert!(caller(Role::Patient).scope_for(Operation::WriteRecord).is_err());
        assert!(caller(Role::Doctor).scope_for(Operation::ManageUsers).is_err());
        assert!(caller(Role::Staff).scope_for(Operation::ManageUsers).is_err());
        assert!(caller(Role::Admin).scope_for(Operation::SubmitFeedback).is_err());
        assert_eq!(
            caller(Role::Patient).scope_for(Operation::ViewSlots).unwrap(),
            Scope::Any
        );
    }

    #[test]
    fn test_missing_profile_never_owns() {
        let c = Caller {
            user_id: 1,
            name: "No profile".to_string(),
            role: Role::Patient,
            patient_id: None,
            doctor_id: None,
        };
        assert!(!c.owns(&Owners::default()));
    }

    #[test]
    fn test_updatable_fields() {
        assert_eq!(
            updatable_appointment_fields(Role::Patient),
            Some(PATIENT_APPOINTMENT_FIELDS)
        );
        assert_eq!(updatable_appointment_fields(Role::Doctor), None);
        assert_eq!(updatable_appointment_fields(Role::Staff), None);
    }
}
