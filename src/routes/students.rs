use actix_web::{web, HttpRequest, HttpResponse};
use anyhow::Context;
use secrecy::Secret;
use uuid::Uuid;

use crate::authentication::{
    basic_authentication, compute_password_hash, validate_student_credentials,
};
use crate::domain::{confirm_password, NewStudent, RecipientEmail, StudentProfile};
use crate::notifications::{Notifier, Recipient};
use crate::records::RecordStore;
use crate::routes::ApiError;
use crate::telemetry::spawn_blocking_with_tracing;

#[derive(serde::Deserialize)]
pub struct ProfileData {
    name: String,
    roll_no: String,
    course: String,
    branch: String,
    year: i32,
    cgpa: f64,
    #[serde(default)]
    backlogs: u32,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    certifications: Vec<String>,
}

impl TryFrom<ProfileData> for StudentProfile {
    type Error = String;

    fn try_from(data: ProfileData) -> Result<Self, Self::Error> {
        StudentProfile::parse(
            data.name,
            data.roll_no,
            data.course,
            data.branch,
            data.year,
            data.cgpa,
            data.backlogs,
            data.skills,
            data.certifications,
        )
    }
}

#[derive(serde::Deserialize)]
pub struct RegistrationData {
    email: String,
    password: Secret<String>,
    confirm_password: Secret<String>,
    #[serde(flatten)]
    profile: ProfileData,
}

impl TryFrom<RegistrationData> for NewStudent {
    type Error = String;

    fn try_from(data: RegistrationData) -> Result<Self, Self::Error> {
        let password = confirm_password(data.password, &data.confirm_password)?;
        let email = RecipientEmail::parse(data.email)?;
        let profile = data.profile.try_into()?;

        Ok(NewStudent {
            email,
            password,
            profile,
        })
    }
}

/// Saves the student, then sends the welcome email. A failed send is
/// reported in the response but does not undo the registration.
#[tracing::instrument(
    name = "registering a new student",
    skip(data, records, notifier),
    fields(student_email = %data.email, roll_no = %data.profile.roll_no)
)]
pub async fn register_student(
    data: web::Json<RegistrationData>,
    records: web::Data<dyn RecordStore>,
    notifier: web::Data<Notifier>,
) -> Result<HttpResponse, ApiError> {
    let new_student: NewStudent =
        data.into_inner().try_into().map_err(ApiError::Validation)?;
    let NewStudent {
        email,
        password,
        profile,
    } = new_student;

    let password_hash = spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("failed to spawn blocking task.")??;

    let student = records.insert_student(&email, &profile, password_hash).await?;

    let welcome_email_sent = match notifier
        .send_student_welcome(&Recipient::from(&student))
        .await
    {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                error.cause_chain = ?e,
                error.message = %e,
                "welcome email could not be sent"
            );
            false
        }
    };

    Ok(HttpResponse::Created().json(serde_json::json!({
        "id": student.id,
        "welcome_email_sent": welcome_email_sent,
    })))
}

/// Resolves the caller's basic auth credentials (email and password) and
/// checks that they belong to `student_id`.
async fn authenticate_student(
    request: &HttpRequest,
    records: &dyn RecordStore,
    student_id: Uuid,
) -> Result<(), ApiError> {
    let credentials =
        basic_authentication(request.headers()).map_err(ApiError::Unauthorized)?;
    let caller = validate_student_credentials(credentials, records).await?;
    tracing::Span::current().record("caller_id", &tracing::field::display(&caller));

    if caller != student_id {
        return Err(ApiError::Forbidden(
            "Students may only access their own profile.".into(),
        ));
    }
    Ok(())
}

#[tracing::instrument(
    name = "fetching student profile",
    skip(request, records),
    fields(caller_id = tracing::field::Empty)
)]
pub async fn get_student(
    request: HttpRequest,
    student_id: web::Path<Uuid>,
    records: web::Data<dyn RecordStore>,
) -> Result<HttpResponse, ApiError> {
    let student_id = student_id.into_inner();
    authenticate_student(&request, records.get_ref(), student_id).await?;

    let student = records.get_student(student_id).await?;
    Ok(HttpResponse::Ok().json(student))
}

#[tracing::instrument(
    name = "updating student profile",
    skip(request, data, records),
    fields(caller_id = tracing::field::Empty)
)]
pub async fn update_student_profile(
    request: HttpRequest,
    student_id: web::Path<Uuid>,
    data: web::Json<ProfileData>,
    records: web::Data<dyn RecordStore>,
) -> Result<HttpResponse, ApiError> {
    let student_id = student_id.into_inner();
    authenticate_student(&request, records.get_ref(), student_id).await?;

    let profile: StudentProfile = data.into_inner().try_into().map_err(ApiError::Validation)?;
    let student = records.update_student_profile(student_id, &profile).await?;

    Ok(HttpResponse::Ok().json(student))
}
