//! Message rendering, kept free of IO.

use lightkeeper_app::ports::LightOnNotice;
use serde::Serialize;

pub const SUBJECT: &str = "Your light has been ON too long";

/// Plain-text body addressed to the owner.
#[must_use]
pub fn render_body(notice: &LightOnNotice) -> String {
    let minutes = notice.on_for_secs / 60;
    let duration = match minutes {
        0 => "several minutes".to_string(),
        1 => "1 minute".to_string(),
        n => format!("{n} minutes"),
    };
    format!(
        "Hi {name},\n\n\
         Your light \"{label}\" has been ON for {duration}.\n\
         If this was unintentional, you can turn it off from the app.\n\n\
         Thanks,\n\
         lightkeeper",
        name = notice.display_name,
        label = notice.light_label(),
    )
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    kind: &'static str,
    value: String,
}

/// Request body of the v3 `mail/send` endpoint.
#[derive(Debug, Serialize)]
pub struct MailRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'static str,
    content: [Content; 1],
}

impl<'a> MailRequest<'a> {
    #[must_use]
    pub fn new(from: &'a str, notice: &'a LightOnNotice) -> Self {
        Self {
            personalizations: [Personalization {
                to: [Address {
                    email: &notice.email,
                }],
            }],
            from: Address { email: from },
            subject: SUBJECT,
            content: [Content {
                kind: "text/plain",
                value: render_body(notice),
            }],
        }
    }
}
