use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use secrecy::{ExposeSecret, Secret};
use sqlx::postgres::PgDatabaseError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Company, Drive, Eligibility, NewCompany, NewDrive, PersonName, RecipientEmail,
    Student, StudentFlags, StudentProfile,
};
use crate::records::{RecordError, RecordStore, DUPLICATE_EMAIL, DUPLICATE_ROLL_NO};

const STUDENT_COLUMNS: &str = "id, email, name, roll_no, course, branch, year, cgpa, \
     backlogs, skills, certifications, is_verified, is_blacklisted, last_updated";
const DRIVE_COLUMNS: &str = "id, company_id, role, ctc, deadline, eligible_branches, \
     eligible_years, min_cgpa, max_backlogs";

pub struct PostgresRecords {
    pool: PgPool,
}

impl PostgresRecords {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct StudentRow {
    id: Uuid,
    email: String,
    name: String,
    roll_no: String,
    course: String,
    branch: String,
    year: i32,
    cgpa: f64,
    backlogs: i32,
    skills: Vec<String>,
    certifications: Vec<String>,
    is_verified: bool,
    is_blacklisted: bool,
    last_updated: DateTime<Utc>,
}

impl TryFrom<StudentRow> for Student {
    type Error = anyhow::Error;

    fn try_from(row: StudentRow) -> Result<Self, Self::Error> {
        let backlogs = u32::try_from(row.backlogs)
            .context("stored backlog count is negative")?;
        let profile = StudentProfile::parse(
            row.name,
            row.roll_no,
            row.course,
            row.branch,
            row.year,
            row.cgpa,
            backlogs,
            row.skills,
            row.certifications,
        )
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("student {} holds an invalid profile", row.id))?;

        Ok(Student {
            id: row.id,
            email: RecipientEmail::parse(row.email).map_err(|e| anyhow!(e))?,
            profile,
            is_verified: row.is_verified,
            is_blacklisted: row.is_blacklisted,
            last_updated: row.last_updated,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    name: String,
    hr_name: String,
    hr_email: String,
    is_approved: bool,
}

impl TryFrom<CompanyRow> for Company {
    type Error = anyhow::Error;

    fn try_from(row: CompanyRow) -> Result<Self, Self::Error> {
        Ok(Company {
            id: row.id,
            name: row.name,
            hr_name: PersonName::parse(row.hr_name).map_err(|e| anyhow!(e))?,
            hr_email: RecipientEmail::parse(row.hr_email).map_err(|e| anyhow!(e))?,
            is_approved: row.is_approved,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DriveRow {
    id: Uuid,
    company_id: Uuid,
    role: String,
    ctc: String,
    deadline: NaiveDate,
    eligible_branches: Vec<String>,
    eligible_years: Vec<i32>,
    min_cgpa: Option<f64>,
    max_backlogs: Option<i32>,
}

impl TryFrom<DriveRow> for Drive {
    type Error = anyhow::Error;

    fn try_from(row: DriveRow) -> Result<Self, Self::Error> {
        let max_backlogs = row
            .max_backlogs
            .map(u32::try_from)
            .transpose()
            .context("stored backlog threshold is negative")?;

        Ok(Drive {
            id: row.id,
            company_id: row.company_id,
            role: row.role,
            ctc: row.ctc,
            deadline: row.deadline,
            eligibility: Eligibility {
                branches: row.eligible_branches,
                graduation_years: row.eligible_years,
                min_cgpa: row.min_cgpa,
                max_backlogs,
            },
        })
    }
}

fn students_from_rows(rows: Vec<StudentRow>) -> Result<Vec<Student>, RecordError> {
    rows.into_iter()
        .map(|row| Student::try_from(row).map_err(RecordError::Unexpected))
        .collect()
}

/// Maps unique and foreign key violations onto domain errors.
fn classify(e: sqlx::Error, context: &'static str) -> RecordError {
    if let sqlx::Error::Database(db_error) = &e {
        if let Some(pg_error) = db_error.try_downcast_ref::<PgDatabaseError>() {
            match (pg_error.code(), pg_error.constraint()) {
                ("23505", Some("students_email_key")) => {
                    return RecordError::Conflict(DUPLICATE_EMAIL.to_string())
                }
                ("23505", Some("students_roll_no_key")) => {
                    return RecordError::Conflict(DUPLICATE_ROLL_NO.to_string())
                }
                ("23503", Some("drives_company_id_fkey")) => {
                    return RecordError::NotFound("company")
                }
                _ => {}
            }
        }
    }
    RecordError::Unexpected(anyhow::Error::new(e).context(context))
}

fn backlogs_to_db(backlogs: u32) -> Result<i32, RecordError> {
    i32::try_from(backlogs)
        .context("backlog count does not fit the database column")
        .map_err(RecordError::Unexpected)
}

#[async_trait]
impl RecordStore for PostgresRecords {
    #[tracing::instrument(name = "saving new student", skip(self, profile, password_hash))]
    async fn insert_student(
        &self,
        email: &RecipientEmail,
        profile: &StudentProfile,
        password_hash: Secret<String>,
    ) -> Result<Student, RecordError> {
        let query = format!(
            r#"
            INSERT INTO students (id, email, password_hash, name, roll_no, course,
                branch, year, cgpa, backlogs, skills, certifications, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {STUDENT_COLUMNS}
            "#
        );
        let row: StudentRow = sqlx::query_as(&query)
            .bind(Uuid::new_v4())
            .bind(email.as_ref())
            .bind(password_hash.expose_secret())
            .bind(profile.name.as_ref())
            .bind(profile.roll_no.as_ref())
            .bind(&profile.course)
            .bind(&profile.branch)
            .bind(profile.year)
            .bind(profile.cgpa.value())
            .bind(backlogs_to_db(profile.backlogs)?)
            .bind(&profile.skills)
            .bind(&profile.certifications)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "failed to insert student"))?;

        Student::try_from(row).map_err(RecordError::Unexpected)
    }

    #[tracing::instrument(name = "fetching student", skip(self))]
    async fn get_student(&self, id: Uuid) -> Result<Student, RecordError> {
        let query = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1");
        let row: Option<StudentRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "failed to fetch student"))?;

        let row = row.ok_or(RecordError::NotFound("student"))?;
        Student::try_from(row).map_err(RecordError::Unexpected)
    }

    #[tracing::instrument(name = "updating student profile", skip(self, profile))]
    async fn update_student_profile(
        &self,
        id: Uuid,
        profile: &StudentProfile,
    ) -> Result<Student, RecordError> {
        let query = format!(
            r#"
            UPDATE students
            SET name = $2, roll_no = $3, course = $4, branch = $5, year = $6,
                cgpa = $7, backlogs = $8, skills = $9, certifications = $10,
                last_updated = $11
            WHERE id = $1
            RETURNING {STUDENT_COLUMNS}
            "#
        );
        let row: Option<StudentRow> = sqlx::query_as(&query)
            .bind(id)
            .bind(profile.name.as_ref())
            .bind(profile.roll_no.as_ref())
            .bind(&profile.course)
            .bind(&profile.branch)
            .bind(profile.year)
            .bind(profile.cgpa.value())
            .bind(backlogs_to_db(profile.backlogs)?)
            .bind(&profile.skills)
            .bind(&profile.certifications)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "failed to update student profile"))?;

        let row = row.ok_or(RecordError::NotFound("student"))?;
        Student::try_from(row).map_err(RecordError::Unexpected)
    }

    #[tracing::instrument(name = "fetching stored student credentials", skip(self))]
    async fn get_student_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(Uuid, Secret<String>)>, RecordError> {
        let row: Option<(Uuid, String)> = sqlx::query_as(
            "SELECT id, password_hash FROM students WHERE lower(email) = lower($1)",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to fetch stored credentials"))?;

        Ok(row.map(|(id, hash)| (id, Secret::new(hash))))
    }

    #[tracing::instrument(name = "updating student flags", skip(self))]
    async fn set_student_flags(
        &self,
        id: Uuid,
        flags: &StudentFlags,
    ) -> Result<Student, RecordError> {
        let query = format!(
            r#"
            UPDATE students
            SET is_verified = COALESCE($2, is_verified),
                is_blacklisted = COALESCE($3, is_blacklisted)
            WHERE id = $1
            RETURNING {STUDENT_COLUMNS}
            "#
        );
        let row: Option<StudentRow> = sqlx::query_as(&query)
            .bind(id)
            .bind(flags.is_verified)
            .bind(flags.is_blacklisted)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "failed to update student flags"))?;

        let row = row.ok_or(RecordError::NotFound("student"))?;
        Student::try_from(row).map_err(RecordError::Unexpected)
    }

    #[tracing::instrument(name = "listing students", skip(self))]
    async fn list_students(&self) -> Result<Vec<Student>, RecordError> {
        let query = format!("SELECT {STUDENT_COLUMNS} FROM students ORDER BY roll_no");
        let rows: Vec<StudentRow> = sqlx::query_as(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify(e, "failed to list students"))?;

        students_from_rows(rows)
    }

    #[tracing::instrument(name = "querying eligible students", skip(self))]
    async fn eligible_students(
        &self,
        eligibility: &Eligibility,
    ) -> Result<Vec<Student>, RecordError> {
        let branches: Vec<String> = eligibility
            .branches
            .iter()
            .map(|b| b.trim().to_lowercase())
            .collect();
        let max_backlogs = eligibility.max_backlogs.map(backlogs_to_db).transpose()?;

        let query = format!(
            r#"
            SELECT {STUDENT_COLUMNS} FROM students
            WHERE NOT is_blacklisted
              AND (cardinality($1::text[]) = 0 OR lower(branch) = ANY($1))
              AND (cardinality($2::int4[]) = 0 OR year = ANY($2))
              AND ($3::float8 IS NULL OR cgpa >= $3)
              AND ($4::int4 IS NULL OR backlogs <= $4)
            ORDER BY roll_no
            "#
        );
        let rows: Vec<StudentRow> = sqlx::query_as(&query)
            .bind(&branches)
            .bind(&eligibility.graduation_years)
            .bind(eligibility.min_cgpa)
            .bind(max_backlogs)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify(e, "failed to query eligible students"))?;

        students_from_rows(rows)
    }

    #[tracing::instrument(name = "saving new company", skip(self, company), fields(company_name = %company.name))]
    async fn insert_company(&self, company: &NewCompany) -> Result<Company, RecordError> {
        let row: CompanyRow = sqlx::query_as(
            r#"
            INSERT INTO companies (id, name, hr_name, hr_email, is_approved)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING id, name, hr_name, hr_email, is_approved
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&company.name)
        .bind(company.hr_name.as_ref())
        .bind(company.hr_email.as_ref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to insert company"))?;

        Company::try_from(row).map_err(RecordError::Unexpected)
    }

    #[tracing::instrument(name = "fetching company", skip(self))]
    async fn get_company(&self, id: Uuid) -> Result<Company, RecordError> {
        let row: Option<CompanyRow> = sqlx::query_as(
            "SELECT id, name, hr_name, hr_email, is_approved FROM companies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to fetch company"))?;

        let row = row.ok_or(RecordError::NotFound("company"))?;
        Company::try_from(row).map_err(RecordError::Unexpected)
    }

    #[tracing::instrument(name = "approving company", skip(self))]
    async fn approve_company(&self, id: Uuid) -> Result<Company, RecordError> {
        let row: Option<CompanyRow> = sqlx::query_as(
            r#"
            UPDATE companies SET is_approved = TRUE WHERE id = $1
            RETURNING id, name, hr_name, hr_email, is_approved
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to approve company"))?;

        let row = row.ok_or(RecordError::NotFound("company"))?;
        Company::try_from(row).map_err(RecordError::Unexpected)
    }

    #[tracing::instrument(name = "saving new drive", skip(self, drive), fields(company_id = %drive.company_id))]
    async fn insert_drive(&self, drive: &NewDrive) -> Result<Drive, RecordError> {
        let eligibility = &drive.eligibility;
        let max_backlogs = eligibility.max_backlogs.map(backlogs_to_db).transpose()?;

        let query = format!(
            r#"
            INSERT INTO drives (id, company_id, role, ctc, deadline, eligible_branches,
                eligible_years, min_cgpa, max_backlogs)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {DRIVE_COLUMNS}
            "#
        );
        let row: DriveRow = sqlx::query_as(&query)
            .bind(Uuid::new_v4())
            .bind(drive.company_id)
            .bind(&drive.role)
            .bind(&drive.ctc)
            .bind(drive.deadline)
            .bind(&eligibility.branches)
            .bind(&eligibility.graduation_years)
            .bind(eligibility.min_cgpa)
            .bind(max_backlogs)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "failed to insert drive"))?;

        Drive::try_from(row).map_err(RecordError::Unexpected)
    }

    #[tracing::instrument(name = "fetching drive", skip(self))]
    async fn get_drive(&self, id: Uuid) -> Result<Drive, RecordError> {
        let query = format!("SELECT {DRIVE_COLUMNS} FROM drives WHERE id = $1");
        let row: Option<DriveRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "failed to fetch drive"))?;

        let row = row.ok_or(RecordError::NotFound("drive"))?;
        Drive::try_from(row).map_err(RecordError::Unexpected)
    }
}
