use std::fmt::Write;

use super::{Submission, SubmissionKind};

const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";
const NO_COMMENT: &str = "No comment";
const ANONYMOUS: &str = "Anonymous guest";

pub(super) struct Rendered {
    pub subject: String,
    pub html: String,
    pub text: String,
}

pub(super) fn render(submission: &Submission, restaurant_name: &str) -> Rendered {
    let customer = match submission.customer_name.trim() {
        "" => ANONYMOUS,
        name => name,
    };
    let comment = submission
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(NO_COMMENT);
    let date = submission.created_at.format(DATE_FORMAT).to_string();
    let label = match submission.kind {
        SubmissionKind::Feedback => "Feedback",
        SubmissionKind::Complaint => "Complaint",
    };

    let subject = format!(
        "Low rating alert - {:.1} stars",
        submission.average_rating
    );

    let mut text = String::new();
    let _ = writeln!(text, "{restaurant_name}: new low rated {}", submission.kind.as_str());
    let _ = writeln!(text);
    let _ = writeln!(text, "Customer: {customer}");
    let _ = writeln!(text, "Date: {date}");
    let _ = writeln!(text, "Average rating: {:.1}", submission.average_rating);
    let _ = writeln!(text, "Food: {}", submission.food_rating);
    let _ = writeln!(text, "Service: {}", submission.service_rating);
    let _ = writeln!(text, "Atmosphere: {}", submission.atmosphere_rating);
    let _ = writeln!(text, "Comment: {comment}");
    let _ = writeln!(text);
    let _ = write!(text, "{label} #{}", submission.id);

    let html = format!(
        concat!(
            "<html><body>",
            "<h2>{restaurant}</h2>",
            "<p>A guest left a low rated {kind}.</p>",
            "<table>",
            "<tr><td>Customer</td><td>{customer}</td></tr>",
            "<tr><td>Date</td><td>{date}</td></tr>",
            "<tr><td>Average rating</td><td>{average:.1}</td></tr>",
            "<tr><td>Food</td><td>{food}</td></tr>",
            "<tr><td>Service</td><td>{service}</td></tr>",
            "<tr><td>Atmosphere</td><td>{atmosphere}</td></tr>",
            "</table>",
            "<p><strong>Comment:</strong> {comment}</p>",
            "<p><small>{label} #{id}</small></p>",
            "</body></html>"
        ),
        restaurant = escape(restaurant_name),
        kind = submission.kind.as_str(),
        customer = escape(customer),
        date = date,
        average = submission.average_rating,
        food = submission.food_rating,
        service = submission.service_rating,
        atmosphere = submission.atmosphere_rating,
        comment = escape(comment),
        label = label,
        id = submission.id,
    );

    Rendered {
        subject,
        html,
        text,
    }
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}
