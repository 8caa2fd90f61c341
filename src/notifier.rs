use crate::{domain::SubscriberEmail, email_client::EmailClient};
use askama::Template;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

const SUBJECT: &str = "🎵 Amazing! New Grace Period subscriber!";

/// Outcome of a best-effort notification. Never an error: callers only log it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No email provider credentials are configured.
    Disabled,
    Failed,
}

/// Tells the artist, at a fixed address, about every new subscriber.
#[derive(Clone)]
pub struct SubscriberNotifier {
    email_client: Option<EmailClient>,
    recipient: SubscriberEmail,
}

impl SubscriberNotifier {
    pub fn new(email_client: Option<EmailClient>, recipient: SubscriberEmail) -> Self {
        if email_client.is_none() {
            tracing::warn!("Email provider api key is not set; notifications will not be sent");
        }

        Self {
            email_client,
            recipient,
        }
    }

    #[tracing::instrument(name = "Notify artist of new subscriber", skip(self))]
    pub async fn notify_new_subscriber(&self, subscriber: &SubscriberEmail) -> Delivery {
        let Some(email_client) = &self.email_client else {
            tracing::info!("Email skipped: email provider is not configured");
            return Delivery::Disabled;
        };

        let message = match NewSubscriberMessage::new(subscriber, OffsetDateTime::now_utc()) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Failed to render new subscriber notification"
                );
                return Delivery::Failed;
            }
        };

        match email_client
            .send_email(&self.recipient, SUBJECT, &message.html, &message.text)
            .await
        {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Failed to send new subscriber notification"
                );
                Delivery::Failed
            }
        }
    }
}

struct NewSubscriberMessage {
    text: String,
    html: String,
}

impl NewSubscriberMessage {
    fn new(subscriber: &SubscriberEmail, at: OffsetDateTime) -> Result<Self, askama::Error> {
        let time = at
            .format(&Rfc3339)
            .unwrap_or_else(|_| at.unix_timestamp().to_string());

        let text = NewSubscriberText {
            subscriber: subscriber.as_ref(),
            time: &time,
        }
        .render()?;

        let html = NewSubscriberHtml {
            subject: SUBJECT,
            subscriber: subscriber.as_ref(),
            time: &time,
        }
        .render()?;

        Ok(Self { text, html })
    }
}

#[derive(Template)]
#[template(path = "email/new_subscriber.txt")]
struct NewSubscriberText<'a> {
    subscriber: &'a str,
    time: &'a str,
}

#[derive(Template)]
#[template(path = "email/new_subscriber.html")]
struct NewSubscriberHtml<'a> {
    subject: &'a str,
    subscriber: &'a str,
    time: &'a str,
}
