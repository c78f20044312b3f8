use super::sendmail::send_email;

pub async fn send_activation_email(
    to_email: &str,
    username: &str,
    token: &str,
    frontend_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let subject = "Activate Your Account";
    let template_path = "src/mail/templates/Activation-email.html";
    let activation_link = format!("{}/auth/activate/{}", frontend_url, token);
    let placeholders = vec![
        ("{{username}}".to_string(), username.to_string()),
        ("{{activation_link}}".to_string(), activation_link),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}

pub async fn send_welcome_email(
    to_email: &str,
    username: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let subject = "Welcome to Crowdfund";
    let template_path = "src/mail/templates/Welcome-email.html";
    let placeholders = vec![("{{username}}".to_string(), username.to_string())];

    send_email(to_email, subject, template_path, &placeholders).await
}

pub async fn send_forgot_password_email(
    to_email: &str,
    reset_link: &str,
    username: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let subject = "Reset your Password";
    let template_path = "src/mail/templates/ResetPassword-email.html";
    let placeholders = vec![
        ("{{username}}".to_string(), username.to_string()),
        ("{{reset_link}}".to_string(), reset_link.to_string()),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}
