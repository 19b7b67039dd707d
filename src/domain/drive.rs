use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{parse_non_blank, Student};

/// A recruitment drive posted for a company.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Drive {
    pub id: Uuid,
    pub company_id: Uuid,
    pub role: String,
    pub ctc: String,
    pub deadline: NaiveDate,
    pub eligibility: Eligibility,
}

#[derive(Debug)]
pub struct NewDrive {
    pub company_id: Uuid,
    pub role: String,
    pub ctc: String,
    pub deadline: NaiveDate,
    pub eligibility: Eligibility,
}

impl NewDrive {
    pub fn parse(
        company_id: Uuid,
        role: String,
        ctc: String,
        deadline: NaiveDate,
        eligibility: Eligibility,
    ) -> Result<NewDrive, String> {
        if let Some(min_cgpa) = eligibility.min_cgpa {
            if !(0.0..=10.0).contains(&min_cgpa) {
                return Err(format!("{} is not a valid minimum CGPA.", min_cgpa));
            }
        }

        Ok(NewDrive {
            company_id,
            role: parse_non_blank("role", role, 256)?,
            ctc: parse_non_blank("CTC", ctc, 64)?,
            deadline,
            eligibility,
        })
    }
}

/// Constraints a student must meet to be notified about a drive.
/// Empty lists and missing thresholds do not constrain.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Eligibility {
    #[serde(default)]
    pub branches: Vec<String>,
    #[serde(default)]
    pub graduation_years: Vec<i32>,
    #[serde(default)]
    pub min_cgpa: Option<f64>,
    #[serde(default)]
    pub max_backlogs: Option<u32>,
}

impl Eligibility {
    pub fn admits(&self, student: &Student) -> bool {
        let profile = &student.profile;

        let branch = profile.branch.to_lowercase();
        let branch_ok = self.branches.is_empty()
            || self
                .branches
                .iter()
                .any(|b| b.trim().to_lowercase() == branch);
        let year_ok = self.graduation_years.is_empty()
            || self.graduation_years.contains(&profile.year);
        let cgpa_ok = self
            .min_cgpa
            .map_or(true, |min| profile.cgpa.value() >= min);
        let backlogs_ok = self
            .max_backlogs
            .map_or(true, |max| profile.backlogs <= max);

        !student.is_blacklisted && branch_ok && year_ok && cgpa_ok && backlogs_ok
    }
}
