//! Rendered bodies for outgoing mail

use crate::application::ports::EmailMessage;
use crate::domain::UserRole;

const PRODUCT_NAME: &str = "Hospital Management System";

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn otp_email(to: &str, full_name: &str, otp: &str, ttl_minutes: i64) -> EmailMessage {
    let name = escape_html(full_name);
    let html_body = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1>{product}</h1>
    <p>Secure Login Verification</p>
    <h2>Hello {name},</h2>
    <p>Your OTP is:</p>
    <div style="font-size: 36px; font-weight: bold; letter-spacing: 8px; font-family: monospace;">{otp}</div>
    <p>This OTP expires in {ttl} minutes. Do not share it.</p>
    <p style="font-size: 12px; color: #6c757d;">Automated email. Do not reply.</p>
  </div>
</body>
</html>"#,
        product = PRODUCT_NAME,
        name = name,
        otp = otp,
        ttl = ttl_minutes,
    );

    EmailMessage {
        to: to.to_string(),
        subject: format!("Your OTP for Login Verification - {}", PRODUCT_NAME),
        html_body,
        text_body: format!(
            "Hello {}, Your OTP is: {}. It expires in {} minutes.",
            full_name, otp, ttl_minutes
        ),
    }
}

pub fn welcome_email(to: &str, full_name: &str, role: UserRole) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Welcome to {}!", PRODUCT_NAME),
        html_body: format!(
            "<p>Hello {}, welcome to the system! Role: {}</p>",
            escape_html(full_name),
            role
        ),
        text_body: format!("Hello {}, welcome to the system! Role: {}", full_name, role),
    }
}
