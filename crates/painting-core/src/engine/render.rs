//! Subject lines and HTML bodies for each notification kind

use crate::engine::rules::NotificationEvent;
use crate::model::{Painting, parse_date};
use crate::traits::OutgoingEmail;

const NOT_SPECIFIED: &str = "Not specified";

const STYLE: &str = r#"
    body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }
    .header { color: white; padding: 30px; border-radius: 10px 10px 0 0; text-align: center; }
    .header h1 { margin: 0; font-size: 26px; }
    .content { background: #f9fafb; padding: 30px; border-radius: 0 0 10px 10px; border: 1px solid #e5e7eb; border-top: none; }
    .painting-info { background: white; padding: 20px; border-radius: 8px; margin: 20px 0; }
    .info-row { padding: 8px 0; border-bottom: 1px solid #e5e7eb; }
    .info-row:last-child { border-bottom: none; }
    .info-label { font-weight: 600; color: #4b5563; display: inline-block; min-width: 120px; }
    .highlight { background: #fef3c7; padding: 2px 6px; border-radius: 4px; font-weight: 600; }
    .note { padding: 15px; margin: 20px 0; border-radius: 4px; }
    .footer { text-align: center; margin-top: 30px; padding-top: 20px; border-top: 2px solid #e5e7eb; color: #6b7280; font-size: 14px; }
"#;

/// Render a decided notification into a message for its recipient
///
/// Returns `None` when the painting has no recipient address.
pub fn render(event: &NotificationEvent, base_url: Option<&str>) -> Option<OutgoingEmail> {
    let painting = event.painting();
    let to = painting.recipient()?.to_string();

    let (subject, html) = match event {
        NotificationEvent::LendingConfirmation { painting } => {
            (lending_subject(painting), lending_body(painting, base_url))
        }
        NotificationEvent::ReminderDue {
            painting,
            days_remaining,
        } => (
            reminder_subject(painting, *days_remaining),
            reminder_body(painting, *days_remaining, base_url),
        ),
        NotificationEvent::OverdueNotice {
            painting,
            days_overdue,
        } => (
            overdue_subject(painting, *days_overdue),
            overdue_body(painting, *days_overdue, base_url),
        ),
    };

    Some(OutgoingEmail { to, subject, html })
}

pub fn lending_subject(painting: &Painting) -> String {
    format!("Painting Loan Confirmation: {}", painting.title)
}

pub fn reminder_subject(painting: &Painting, days_remaining: i64) -> String {
    format!("Reminder: {} is due in {} days", painting.title, days_remaining)
}

pub fn overdue_subject(painting: &Painting, days_overdue: i64) -> String {
    format!("Overdue: {} is {} {} overdue", painting.title, days_overdue, plural_days(days_overdue))
}

/// Long-form date such as "Monday, January 20, 2025"
///
/// Missing and unparseable dates both render as "Not specified".
pub fn format_date(raw: Option<&str>) -> String {
    raw.and_then(parse_date)
        .map(|date| date.format("%A, %B %-d, %Y").to_string())
        .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}

/// Escape text for inclusion in HTML element content and attribute values
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

/// Absolute image link for the painting, if one can be built
///
/// Absolute image URLs are used as-is. Relative ones need a base URL.
pub fn image_link(painting: &Painting, base_url: Option<&str>) -> Option<String> {
    let image = painting.image_url.as_deref().filter(|s| !s.is_empty())?;
    if image.starts_with("http://") || image.starts_with("https://") {
        return Some(image.to_string());
    }
    let base = base_url.map(str::trim).filter(|s| !s.is_empty())?;
    Some(format!(
        "{}/{}",
        base.trim_end_matches('/'),
        image.trim_start_matches('/')
    ))
}

fn plural_days(n: i64) -> &'static str {
    if n == 1 { "day" } else { "days" }
}

fn lending_body(painting: &Painting, base_url: Option<&str>) -> String {
    let due = escape_html(&format_date(painting.due_date.as_deref()));
    let intro = "This email confirms that you have borrowed the following painting from our collection:";
    let note = format!(
        "<p style=\"margin: 0;\"><strong>Important Reminder</strong></p>\
         <p style=\"margin: 10px 0 0 0;\">Please return the painting by <strong>{due}</strong>. \
         Take good care of the artwork and contact us if you have any questions.</p>"
    );
    page(
        "Painting Lent Confirmation",
        "#667eea",
        painting,
        base_url,
        intro,
        &note,
        "#fef2f2",
        "Thank you for borrowing from our collection!",
    )
}

fn reminder_body(painting: &Painting, days_remaining: i64, base_url: Option<&str>) -> String {
    let due = escape_html(&format_date(painting.due_date.as_deref()));
    let intro = format!(
        "This is a friendly reminder that the painting below is due back in <strong>{days_remaining} {}</strong>.",
        plural_days(days_remaining)
    );
    let note = format!(
        "<p style=\"margin: 0;\">Please arrange to return the painting by <strong>{due}</strong>.</p>"
    );
    page(
        "Painting Return Reminder",
        "#f59e0b",
        painting,
        base_url,
        &intro,
        &note,
        "#fffbeb",
        "Thank you for taking care of our collection!",
    )
}

fn overdue_body(painting: &Painting, days_overdue: i64, base_url: Option<&str>) -> String {
    let due = escape_html(&format_date(painting.due_date.as_deref()));
    let intro = format!(
        "The painting below was due back on <strong>{due}</strong> and is now <strong>{days_overdue} {}</strong> overdue.",
        plural_days(days_overdue)
    );
    let note = "<p style=\"margin: 0;\">Please return the painting as soon as possible, \
                or contact the collection owner to arrange a new due date.</p>";
    page(
        "Painting Overdue",
        "#ef4444",
        painting,
        base_url,
        &intro,
        note,
        "#fef2f2",
        "Thank you for your prompt attention.",
    )
}

#[allow(clippy::too_many_arguments)]
fn page(
    heading: &str,
    accent: &str,
    painting: &Painting,
    base_url: Option<&str>,
    intro: &str,
    note: &str,
    note_background: &str,
    closing: &str,
) -> String {
    let borrower = escape_html(painting.borrower_name.as_deref().unwrap_or_default());
    let image = image_link(painting, base_url)
        .map(|src| {
            format!(
                "<img src=\"{}\" alt=\"{}\" style=\"max-width: 100%; border-radius: 8px; margin-bottom: 15px;\">",
                escape_html(&src),
                escape_html(&painting.title)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <style>{STYLE}</style>
</head>
<body>
  <div class="header" style="background: {accent};">
    <h1>{heading}</h1>
  </div>
  <div class="content">
    <p>Hello <strong>{borrower}</strong>,</p>
    <p>{intro}</p>
    <div class="painting-info" style="border-left: 4px solid {accent};">
      {image}
      {details}
    </div>
    <div class="note" style="background: {note_background}; border-left: 4px solid {accent};">
      {note}
    </div>
    <p>{closing}</p>
    <div class="footer">
      <p>This is an automated message from Painting Manager</p>
      <p>If you have any questions, please contact the collection owner.</p>
    </div>
  </div>
</body>
</html>"#,
        details = detail_rows(painting),
    )
}

fn detail_rows(painting: &Painting) -> String {
    let mut rows = vec![row("Title", &format!("<strong>{}</strong>", escape_html(&painting.title)))];
    if let Some(category) = painting.category.as_deref() {
        rows.push(row("Category", &escape_html(category)));
    }
    if let Some(address) = painting.address.as_deref() {
        rows.push(row("Location", &escape_html(address)));
    }
    rows.push(row(
        "Lent Date",
        &escape_html(&format_date(painting.lent_date.as_deref())),
    ));
    rows.push(row(
        "Due Date",
        &format!(
            "<span class=\"highlight\">{}</span>",
            escape_html(&format_date(painting.due_date.as_deref()))
        ),
    ));
    if let Some(phone) = painting.borrower_phone.as_deref() {
        rows.push(row("Your Phone", &escape_html(phone)));
    }
    rows.join("\n      ")
}

fn row(label: &str, value_html: &str) -> String {
    format!(
        "<div class=\"info-row\"><span class=\"info-label\">{label}:</span><span>{value_html}</span></div>"
    )
}
