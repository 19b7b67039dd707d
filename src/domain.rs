mod company;
mod drive;
mod new_student;
mod person_name;
mod recipient_email;
mod student;

pub use company::{Company, NewCompany};
pub use drive::{Drive, Eligibility, NewDrive};
pub use new_student::{
    confirm_password, NewStudent, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
};
pub use person_name::PersonName;
pub use recipient_email::RecipientEmail;
pub use student::{
    normalize_tags, Cgpa, RollNumber, Student, StudentFlags, StudentProfile,
};

/// Trims `s` and rejects it when blank or longer than `max_len` characters.
pub(crate) fn parse_non_blank(
    field: &str,
    s: String,
    max_len: usize,
) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(format!("{} must not be empty.", field));
    }
    if trimmed.chars().count() > max_len {
        return Err(format!(
            "{} must be at most {} characters long.",
            field, max_len
        ));
    }
    Ok(trimmed.to_string())
}
