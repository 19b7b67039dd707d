use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::domain::StudentFlags;
use crate::notifications::{Notifier, Recipient};
use crate::records::RecordStore;
use crate::routes::ApiError;

/// Re-sends the welcome email to every registered student.
#[tracing::instrument(name = "sending bulk welcome", skip(records, notifier))]
pub async fn send_bulk_welcome(
    records: web::Data<dyn RecordStore>,
    notifier: web::Data<Notifier>,
) -> Result<HttpResponse, ApiError> {
    let recipients: Vec<Recipient> = records
        .list_students()
        .await?
        .iter()
        .map(Recipient::from)
        .collect();

    let result = notifier.send_bulk_student_welcome(&recipients).await;
    Ok(HttpResponse::Ok().json(result))
}

/// Marks a student verified and/or blacklisted. Blacklisted students drop
/// out of every drive notification.
#[tracing::instrument(name = "updating student flags", skip(records))]
pub async fn set_student_flags(
    student_id: web::Path<Uuid>,
    flags: web::Json<StudentFlags>,
    records: web::Data<dyn RecordStore>,
) -> Result<HttpResponse, ApiError> {
    let student = records
        .set_student_flags(student_id.into_inner(), &flags)
        .await?;

    Ok(HttpResponse::Ok().json(student))
}
