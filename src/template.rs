//! HTML body for the report email.

/// Renders the email body for a report.
///
/// Pure and deterministic: the same inputs always produce the same bytes.
/// The business date is escaped before it is embedded.
pub fn build_html_body(business_date: &str, row_count: usize) -> String {
    let date = escape_html(business_date);
    format!(
        r#"<html>
<body style="font-family:Arial, sans-serif; background:#f9f9f9; padding:20px; color:#333;">
    <div style="background:#fff; border-radius:8px; padding:20px; box-shadow:0 2px 6px rgba(0,0,0,0.1);">
        <h2 style="color:#2c3e50;">📊 Sales Report - {date}</h2>
        <p>Hello Team,</p>
        <p>Please find attached the sales report for <b>{date}</b>.</p>
        <p>The report contains <b>{row_count} records</b>.</p>
        <p>Regards,<br>Automated Reporting System</p>
        <hr>
        <p style="font-size:12px; color:#777;">This is an auto-generated email. Please do not reply.</p>
    </div>
</body>
</html>
"#
    )
}

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
