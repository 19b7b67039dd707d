//! Subjects and HTML bodies for every notification the portal sends.
//! Caller supplied text is escaped before interpolation.

use htmlescape::encode_minimal;

use crate::domain::{Company, Drive};
use crate::notifications::Recipient;

pub struct Rendered {
    pub subject: String,
    pub html_body: String,
}

pub fn student_welcome(recipient: &Recipient, institution: &str, portal_url: &str) -> Rendered {
    let name = recipient
        .name
        .as_ref()
        .map(|n| encode_minimal(n.as_ref()))
        .unwrap_or_else(|| "Student".to_string());
    let roll_no = recipient
        .roll_no
        .as_ref()
        .map(|r| format!("<p><strong>Roll No:</strong> {}</p>", encode_minimal(r.as_ref())))
        .unwrap_or_default();

    Rendered {
        subject: format!(
            "🎓 Welcome to {} Placement Portal - Your Account is Ready!",
            institution
        ),
        html_body: format!(
            r#"<h2>Welcome to {institution}</h2>
<p>Dear {name},</p>
<p>Your account has been created. Sign in with the email address below and the password you chose at registration.</p>
<div style="background: #f0f9ff; padding: 15px; border-radius: 8px;">
    <p><strong>Email:</strong> {email}</p>
    {roll_no}
</div>
<p><a href="{portal_url}/login">Login Here</a></p>"#,
            institution = encode_minimal(institution),
            email = encode_minimal(recipient.email.as_ref()),
        ),
    }
}

pub fn company_approval(company: &Company, institution: &str, portal_url: &str) -> Rendered {
    Rendered {
        subject: format!("✅ Company Approved - {}", institution),
        html_body: format!(
            r#"<h2>Registration Successful</h2>
<p>Dear {hr_name},</p>
<p>Your company <strong>{company}</strong> has been approved. You can now login and manage recruitment drives.</p>
<p><a href="{portal_url}/recruiter-login">Recruiter Login</a></p>"#,
            hr_name = encode_minimal(company.hr_name.as_ref()),
            company = encode_minimal(&company.name),
        ),
    }
}

pub fn drive_announcement(drive: &Drive, company: &Company, portal_url: &str) -> Rendered {
    Rendered {
        subject: format!("🚀 Placement Drive: {} at {}", drive.role, company.name),
        html_body: format!(
            r#"<h2>New Placement Opportunity</h2>
<p>Dear Student,</p>
<div style="background: #f4f4f4; padding: 15px; border-radius: 5px;">
    <p><strong>Company:</strong> {company}</p>
    <p><strong>Role:</strong> {role}</p>
    <p><strong>CTC:</strong> {ctc}</p>
    <p><strong>Deadline:</strong> {deadline}</p>
</div>
<p><a href="{portal_url}/login">Click here to apply</a></p>"#,
            company = encode_minimal(&company.name),
            role = encode_minimal(&drive.role),
            ctc = encode_minimal(&drive.ctc),
            deadline = drive.deadline.format("%d %b %Y"),
        ),
    }
}

/// Wraps a plain text broadcast so its line breaks survive HTML rendering.
pub fn broadcast_body(text: &str) -> String {
    format!(
        r#"<div style="white-space: pre-wrap; font-family: monospace;">{}</div>"#,
        encode_minimal(text)
    )
}
