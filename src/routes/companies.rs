use actix_web::{web, HttpResponse};

use crate::domain::NewCompany;
use crate::records::RecordStore;
use crate::routes::ApiError;

#[derive(serde::Deserialize)]
pub struct CompanyData {
    name: String,
    hr_name: String,
    hr_email: String,
}

impl TryFrom<CompanyData> for NewCompany {
    type Error = String;

    fn try_from(data: CompanyData) -> Result<Self, Self::Error> {
        NewCompany::parse(data.name, data.hr_name, data.hr_email)
    }
}

/// Companies start unapproved; the placement cell approves them separately.
#[tracing::instrument(
    name = "registering a new company",
    skip(data, records),
    fields(company_name = %data.name, hr_email = %data.hr_email)
)]
pub async fn register_company(
    data: web::Json<CompanyData>,
    records: web::Data<dyn RecordStore>,
) -> Result<HttpResponse, ApiError> {
    let new_company: NewCompany = data.into_inner().try_into().map_err(ApiError::Validation)?;
    let company = records.insert_company(&new_company).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "id": company.id })))
}
