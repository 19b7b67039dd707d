use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{Eligibility, NewDrive};
use crate::notifications::Notifier;
use crate::records::RecordStore;
use crate::routes::ApiError;

#[derive(serde::Deserialize)]
pub struct DriveData {
    company_id: Uuid,
    role: String,
    ctc: String,
    deadline: NaiveDate,
    #[serde(default)]
    eligibility: Eligibility,
}

impl TryFrom<DriveData> for NewDrive {
    type Error = String;

    fn try_from(data: DriveData) -> Result<Self, Self::Error> {
        NewDrive::parse(
            data.company_id,
            data.role,
            data.ctc,
            data.deadline,
            data.eligibility,
        )
    }
}

#[tracing::instrument(
    name = "creating a drive",
    skip(data, records),
    fields(company_id = %data.company_id, role = %data.role)
)]
pub async fn create_drive(
    data: web::Json<DriveData>,
    records: web::Data<dyn RecordStore>,
) -> Result<HttpResponse, ApiError> {
    let new_drive: NewDrive = data.into_inner().try_into().map_err(ApiError::Validation)?;

    let company = records.get_company(new_drive.company_id).await?;
    if !company.is_approved {
        return Err(ApiError::Validation(format!(
            "{} has not been approved yet.",
            company.name
        )));
    }

    let drive = records.insert_drive(&new_drive).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "id": drive.id })))
}

/// Announces a drive to every student it admits.
#[tracing::instrument(name = "notifying eligible students", skip(records, notifier))]
pub async fn notify_drive(
    drive_id: web::Path<Uuid>,
    records: web::Data<dyn RecordStore>,
    notifier: web::Data<Notifier>,
) -> Result<HttpResponse, ApiError> {
    let drive = records.get_drive(drive_id.into_inner()).await?;
    let company = records.get_company(drive.company_id).await?;

    let result = notifier
        .notify_eligible_students(records.get_ref(), &drive, &company)
        .await?;

    Ok(HttpResponse::Ok().json(result))
}
