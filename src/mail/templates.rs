use super::OutgoingEmail;
use crate::constants::BRAND_NAME;
use crate::models::Purpose;

/// Render the email carrying a freshly issued passcode
pub fn passcode_email(
    purpose: Purpose,
    to: &str,
    code: &str,
    expires_in_minutes: i64,
) -> OutgoingEmail {
    let (subject, heading, lead, ignore_note, text) = match purpose {
        Purpose::Signup => (
            format!("Your {} verification code", BRAND_NAME),
            "Your verification code",
            format!("Use the code below to finish creating your {} account:", BRAND_NAME),
            "If you didn't request this, you can safely ignore this email.",
            format!(
                "Your {} verification code is {}. It expires in {} minutes.",
                BRAND_NAME, code, expires_in_minutes
            ),
        ),
        Purpose::PasswordReset => (
            format!("Reset your {} password", BRAND_NAME),
            "Reset your password",
            format!("Use the code below to reset your {} account password:", BRAND_NAME),
            "If you didn't request this password reset, you can safely ignore this email.",
            format!(
                "Your {} password reset code is {}. It expires in {} minutes.",
                BRAND_NAME, code, expires_in_minutes
            ),
        ),
    };

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; line-height: 1.6; color: #0f172a;">
  <h2 style="color: #1d4ed8;">{heading}</h2>
  <p>{lead}</p>
  <p style="font-size: 24px; font-weight: bold; letter-spacing: 6px;">{code}</p>
  <p style="margin-top: 16px;">This code expires in {expires_in_minutes} minutes.</p>
  <p>{ignore_note}</p>
</div>"#
    );

    OutgoingEmail {
        to: to.to_string(),
        subject,
        text,
        html,
    }
}
