use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{parse_non_blank, PersonName, RecipientEmail};

/// A registered student, as exposed to callers. The password hash is kept
/// by the record store and never leaves it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Student {
    pub id: Uuid,
    pub email: RecipientEmail,
    #[serde(flatten)]
    pub profile: StudentProfile,
    pub is_verified: bool,
    pub is_blacklisted: bool,
    pub last_updated: DateTime<Utc>,
}

/// Operator controlled flags. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
pub struct StudentFlags {
    #[serde(default)]
    pub is_verified: Option<bool>,
    #[serde(default)]
    pub is_blacklisted: Option<bool>,
}

/// The fields a student may edit after registration.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StudentProfile {
    pub name: PersonName,
    pub roll_no: RollNumber,
    pub course: String,
    pub branch: String,
    pub year: i32,
    pub cgpa: Cgpa,
    pub backlogs: u32,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
}

impl StudentProfile {
    #[allow(clippy::too_many_arguments)]
    pub fn parse(
        name: String,
        roll_no: String,
        course: String,
        branch: String,
        year: i32,
        cgpa: f64,
        backlogs: u32,
        skills: Vec<String>,
        certifications: Vec<String>,
    ) -> Result<StudentProfile, String> {
        if !(2000..=2100).contains(&year) {
            return Err(format!("{} is not a valid graduation year.", year));
        }

        Ok(StudentProfile {
            name: PersonName::parse(name)?,
            roll_no: RollNumber::parse(roll_no)?,
            course: parse_non_blank("course", course, 64)?,
            branch: parse_non_blank("branch", branch, 64)?,
            year,
            cgpa: Cgpa::parse(cgpa)?,
            backlogs,
            skills: normalize_tags(skills),
            certifications: normalize_tags(certifications),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct RollNumber(String);

impl RollNumber {
    pub fn parse(s: String) -> Result<RollNumber, String> {
        let s = parse_non_blank("roll number", s, 32)?;
        let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '/';
        if s.chars().all(allowed) {
            Ok(Self(s.to_uppercase()))
        } else {
            Err(format!("{} is not a valid roll number.", s))
        }
    }
}

impl AsRef<str> for RollNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Cumulative grade point average on a ten point scale.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, serde::Serialize)]
#[serde(transparent)]
pub struct Cgpa(f64);

impl Cgpa {
    pub fn parse(value: f64) -> Result<Cgpa, String> {
        if value.is_finite() && (0.0..=10.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!("{} is not a valid CGPA.", value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Trims every entry and drops the empty ones.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
