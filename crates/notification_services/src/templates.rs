use notification_store::NotificationType;

const STYLES: &str = r#"
    <style>
      body { font-family: Arial, sans-serif; color: #333; }
      .container { max-width: 600px; margin: 0 auto; padding: 20px; }
      .header { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 20px; border-radius: 5px 5px 0 0; }
      .content { background: #f9f9f9; padding: 20px; border: 1px solid #eee; }
      .footer { background: #f0f0f0; padding: 15px; text-align: center; font-size: 12px; color: #666; border-radius: 0 0 5px 5px; }
      .button { display: inline-block; background: #667eea; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; margin-top: 15px; }
      .notification-type { font-size: 12px; color: #eee; margin-top: 5px; }
    </style>
"#;

/// Subject, HTML and plain-text bodies for one notification email.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
    /// Plain-text body
    pub text: String,
}

/// Call-to-action link for a notification type: `(path, label)`.
fn action_for(notification_type: NotificationType) -> (&'static str, &'static str) {
    match notification_type {
        NotificationType::RequestApproved => ("/my-library", "View My Library"),
        NotificationType::DueDateReminder => ("/my-library", "View Borrowed Books"),
        NotificationType::RequestSent | NotificationType::BookReturned => {
            ("/requests", "View Requests")
        }
        NotificationType::RequestRejected | NotificationType::General => {
            ("", "Visit Book Swap Platform")
        }
    }
}

/// Escapes text for inclusion in HTML element content and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders the email for a notification.
pub fn render_email(
    title: &str,
    message: &str,
    notification_type: NotificationType,
    base_url: &str,
) -> RenderedEmail {
    let base_url = base_url.trim_end_matches('/');
    let (path, action_label) = action_for(notification_type);
    let action_url = format!("{}{}", base_url, path);
    let manage_url = format!("{}/notifications", base_url);

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
{styles}
</head>
<body>
  <div class="container">
    <div class="header">
      <h1>{title}</h1>
      <p class="notification-type">{label}</p>
    </div>
    <div class="content">
      <p>{message}</p>
      <p>Thank you for using the Book Swap &amp; Lending Platform!</p>
      <a href="{action_url}" class="button">{action_label}</a>
    </div>
    <div class="footer">
      <p>© 2025 Book Swap &amp; Lending Platform. All rights reserved.</p>
      <p><a href="{manage_url}" style="color: #667eea; text-decoration: none;">Manage Notifications</a></p>
    </div>
  </div>
</body>
</html>"#,
        styles = STYLES,
        title = escape_html(title),
        label = notification_type.label(),
        message = escape_html(message),
        action_url = escape_html(&action_url),
        action_label = action_label,
        manage_url = escape_html(&manage_url),
    );

    let text = format!(
        "{}\n{}\n\n{}\n\n{}: {}\n\nManage notifications: {}\n\n© 2025 Book Swap & Lending Platform",
        title,
        notification_type.label(),
        message,
        action_label,
        action_url,
        manage_url
    );

    RenderedEmail {
        subject: title.to_string(),
        html,
        text,
    }
}
