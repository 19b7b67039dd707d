use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::notifications::Notifier;
use crate::records::RecordStore;
use crate::routes::ApiError;

#[tracing::instrument(name = "approving company", skip(records, notifier))]
pub async fn approve_company(
    company_id: web::Path<Uuid>,
    records: web::Data<dyn RecordStore>,
    notifier: web::Data<Notifier>,
) -> Result<HttpResponse, ApiError> {
    let company = records.approve_company(company_id.into_inner()).await?;

    let email_sent = match notifier.send_company_approval(&company).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                error.cause_chain = ?e,
                error.message = %e,
                "approval email could not be sent"
            );
            false
        }
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": company.id,
        "email_sent": email_sent,
    })))
}
