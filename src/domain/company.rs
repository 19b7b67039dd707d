use uuid::Uuid;

use crate::domain::{parse_non_blank, PersonName, RecipientEmail};

#[derive(Debug, Clone, serde::Serialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub hr_name: PersonName,
    pub hr_email: RecipientEmail,
    pub is_approved: bool,
}

#[derive(Debug)]
pub struct NewCompany {
    pub name: String,
    pub hr_name: PersonName,
    pub hr_email: RecipientEmail,
}

impl NewCompany {
    pub fn parse(
        name: String,
        hr_name: String,
        hr_email: String,
    ) -> Result<NewCompany, String> {
        Ok(NewCompany {
            name: parse_non_blank("company name", name, 256)?,
            hr_name: PersonName::parse(hr_name)?,
            hr_email: RecipientEmail::parse(hr_email)?,
        })
    }
}
