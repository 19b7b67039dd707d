//! Record access for students, companies and drives.
//!
//! Handlers only see the [`RecordStore`] trait. [`PostgresRecords`] backs
//! the running service; [`InMemoryRecords`] keeps everything in process and
//! is what the test-suite and local demos run against.

mod memory;
mod postgres;

use async_trait::async_trait;
use secrecy::Secret;
use uuid::Uuid;

use crate::domain::{
    Company, Drive, Eligibility, NewCompany, NewDrive, RecipientEmail, Student,
    StudentFlags, StudentProfile,
};

pub use memory::InMemoryRecords;
pub use postgres::PostgresRecords;

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub(crate) const DUPLICATE_EMAIL: &str = "Account with this email already exists.";
pub(crate) const DUPLICATE_ROLL_NO: &str =
    "A student with this roll number already exists.";

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_student(
        &self,
        email: &RecipientEmail,
        profile: &StudentProfile,
        password_hash: Secret<String>,
    ) -> Result<Student, RecordError>;

    async fn get_student(&self, id: Uuid) -> Result<Student, RecordError>;

    async fn update_student_profile(
        &self,
        id: Uuid,
        profile: &StudentProfile,
    ) -> Result<Student, RecordError>;

    /// Id and password hash of the student registered under `email`,
    /// matched case-insensitively.
    async fn get_student_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(Uuid, Secret<String>)>, RecordError>;

    async fn set_student_flags(
        &self,
        id: Uuid,
        flags: &StudentFlags,
    ) -> Result<Student, RecordError>;

    async fn list_students(&self) -> Result<Vec<Student>, RecordError>;

    /// Students satisfying every constraint of `eligibility`.
    async fn eligible_students(
        &self,
        eligibility: &Eligibility,
    ) -> Result<Vec<Student>, RecordError>;

    async fn insert_company(&self, company: &NewCompany) -> Result<Company, RecordError>;

    async fn get_company(&self, id: Uuid) -> Result<Company, RecordError>;

    async fn approve_company(&self, id: Uuid) -> Result<Company, RecordError>;

    /// Fails with `NotFound` when the owning company does not exist.
    async fn insert_drive(&self, drive: &NewDrive) -> Result<Drive, RecordError>;

    async fn get_drive(&self, id: Uuid) -> Result<Drive, RecordError>;
}
