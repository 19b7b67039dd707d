use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use secrecy::Secret;
use uuid::Uuid;

use crate::domain::{
    Company, Drive, Eligibility, NewCompany, NewDrive, RecipientEmail, Student,
    StudentFlags, StudentProfile,
};
use crate::records::{RecordError, RecordStore, DUPLICATE_EMAIL, DUPLICATE_ROLL_NO};

struct StoredStudent {
    student: Student,
    password_hash: Secret<String>,
}

#[derive(Default)]
struct Tables {
    students: Vec<StoredStudent>,
    companies: Vec<Company>,
    drives: Vec<Drive>,
}

/// Process-local record store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryRecords {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RecordError> {
        self.tables
            .lock()
            .map_err(|_| RecordError::Unexpected(anyhow!("record tables lock is poisoned")))
    }
}

// Postgres compares `lower(email)`.
fn same_email(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn ensure_unique_roll_no(
    tables: &Tables,
    profile: &StudentProfile,
    except: Option<Uuid>,
) -> Result<(), RecordError> {
    let taken = tables.students.iter().any(|s| {
        Some(s.student.id) != except && s.student.profile.roll_no == profile.roll_no
    });
    if taken {
        Err(RecordError::Conflict(DUPLICATE_ROLL_NO.to_string()))
    } else {
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecords {
    async fn insert_student(
        &self,
        email: &RecipientEmail,
        profile: &StudentProfile,
        password_hash: Secret<String>,
    ) -> Result<Student, RecordError> {
        let mut tables = self.lock()?;

        let email_taken = tables
            .students
            .iter()
            .any(|s| same_email(s.student.email.as_ref(), email.as_ref()));
        if email_taken {
            return Err(RecordError::Conflict(DUPLICATE_EMAIL.to_string()));
        }
        ensure_unique_roll_no(&tables, profile, None)?;

        let student = Student {
            id: Uuid::new_v4(),
            email: email.clone(),
            profile: profile.clone(),
            is_verified: false,
            is_blacklisted: false,
            last_updated: Utc::now(),
        };
        tables.students.push(StoredStudent {
            student: student.clone(),
            password_hash,
        });

        Ok(student)
    }

    async fn get_student(&self, id: Uuid) -> Result<Student, RecordError> {
        self.lock()?
            .students
            .iter()
            .find(|s| s.student.id == id)
            .map(|s| s.student.clone())
            .ok_or(RecordError::NotFound("student"))
    }

    async fn update_student_profile(
        &self,
        id: Uuid,
        profile: &StudentProfile,
    ) -> Result<Student, RecordError> {
        let mut tables = self.lock()?;
        ensure_unique_roll_no(&tables, profile, Some(id))?;

        let stored = tables
            .students
            .iter_mut()
            .find(|s| s.student.id == id)
            .ok_or(RecordError::NotFound("student"))?;
        stored.student.profile = profile.clone();
        stored.student.last_updated = Utc::now();

        Ok(stored.student.clone())
    }

    async fn get_student_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(Uuid, Secret<String>)>, RecordError> {
        Ok(self
            .lock()?
            .students
            .iter()
            .find(|s| same_email(s.student.email.as_ref(), email.trim()))
            .map(|s| (s.student.id, s.password_hash.clone())))
    }

    async fn set_student_flags(
        &self,
        id: Uuid,
        flags: &StudentFlags,
    ) -> Result<Student, RecordError> {
        let mut tables = self.lock()?;
        let stored = tables
            .students
            .iter_mut()
            .find(|s| s.student.id == id)
            .ok_or(RecordError::NotFound("student"))?;

        if let Some(is_verified) = flags.is_verified {
            stored.student.is_verified = is_verified;
        }
        if let Some(is_blacklisted) = flags.is_blacklisted {
            stored.student.is_blacklisted = is_blacklisted;
        }
        Ok(stored.student.clone())
    }

    async fn list_students(&self) -> Result<Vec<Student>, RecordError> {
        Ok(self
            .lock()?
            .students
            .iter()
            .map(|s| s.student.clone())
            .collect())
    }

    async fn eligible_students(
        &self,
        eligibility: &Eligibility,
    ) -> Result<Vec<Student>, RecordError> {
        Ok(self
            .lock()?
            .students
            .iter()
            .filter(|s| eligibility.admits(&s.student))
            .map(|s| s.student.clone())
            .collect())
    }

    async fn insert_company(&self, company: &NewCompany) -> Result<Company, RecordError> {
        let company = Company {
            id: Uuid::new_v4(),
            name: company.name.clone(),
            hr_name: company.hr_name.clone(),
            hr_email: company.hr_email.clone(),
            is_approved: false,
        };
        self.lock()?.companies.push(company.clone());
        Ok(company)
    }

    async fn get_company(&self, id: Uuid) -> Result<Company, RecordError> {
        self.lock()?
            .companies
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(RecordError::NotFound("company"))
    }

    async fn approve_company(&self, id: Uuid) -> Result<Company, RecordError> {
        let mut tables = self.lock()?;
        let company = tables
            .companies
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RecordError::NotFound("company"))?;
        company.is_approved = true;
        Ok(company.clone())
    }

    async fn insert_drive(&self, drive: &NewDrive) -> Result<Drive, RecordError> {
        let mut tables = self.lock()?;
        if !tables.companies.iter().any(|c| c.id == drive.company_id) {
            return Err(RecordError::NotFound("company"));
        }

        let drive = Drive {
            id: Uuid::new_v4(),
            company_id: drive.company_id,
            role: drive.role.clone(),
            ctc: drive.ctc.clone(),
            deadline: drive.deadline,
            eligibility: drive.eligibility.clone(),
        };
        tables.drives.push(drive.clone());
        Ok(drive)
    }

    async fn get_drive(&self, id: Uuid) -> Result<Drive, RecordError> {
        self.lock()?
            .drives
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or(RecordError::NotFound("drive"))
    }
}
