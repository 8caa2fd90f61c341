use crate::{
    app_state::AppState,
    domain::{NewSubscriber, SubscriberEmail, Subscription},
    notifier::{Delivery, SubscriberNotifier},
    storage::StorageError,
    utils::{e500, error_response, HttpError, ValidationIssue},
};
use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/subscribe", post(subscribe))
        .route("/api/subscriptions", get(list_subscriptions))
}

#[tracing::instrument(
    name = "Adding a new subscriber",
    skip(app_state, body),
    fields(subscriber_email = tracing::field::Empty)
)]
async fn subscribe(
    State(app_state): State<AppState>,
    body: Result<Json<SubscribeBody>, JsonRejection>,
) -> Result<(StatusCode, Json<SubscribeResponse>), SubscribeError> {
    let Json(body) = body.map_err(|e| SubscribeError::MalformedBody(e.body_text()))?;
    let new_subscriber: NewSubscriber =
        body.try_into().map_err(SubscribeError::ValidationError)?;

    tracing::Span::current().record(
        "subscriber_email",
        tracing::field::display(&new_subscriber.email),
    );

    let existing = app_state
        .storage
        .get_email_subscription(new_subscriber.email.as_ref())
        .await
        .context("Failed to look up an existing subscription")?;
    if existing.is_some() {
        return Err(SubscribeError::AlreadySubscribed);
    }

    let subscription = match app_state
        .storage
        .create_email_subscription(&new_subscriber)
        .await
    {
        Ok(subscription) => subscription,
        // Lost a race against a concurrent request for the same email.
        Err(e) if e.is_unique_violation() => return Err(SubscribeError::AlreadySubscribed),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context("Failed to insert new subscriber")
                .into())
        }
    };

    spawn_notification(app_state.notifier.clone(), new_subscriber.email);

    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            message: "Successfully subscribed to updates!",
            subscription: CreatedSubscription {
                id: subscription.id,
                email: subscription.email,
            },
        }),
    ))
}

/// The response does not wait for the email; its outcome is only logged.
fn spawn_notification(notifier: SubscriberNotifier, email: SubscriberEmail) {
    tokio::spawn(
        async move {
            match notifier.notify_new_subscriber(&email).await {
                Delivery::Sent => tracing::info!("Notification sent about new subscriber"),
                Delivery::Disabled => {}
                Delivery::Failed => {
                    tracing::warn!("New subscriber was saved but the notification was not sent")
                }
            }
        }
        .in_current_span(),
    );
}

#[tracing::instrument(name = "Listing subscriptions", skip(app_state))]
async fn list_subscriptions(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Subscription>>, HttpError<StorageError>> {
    let subscriptions = app_state
        .storage
        .get_all_email_subscriptions()
        .await
        .map_err(e500("Failed to fetch subscriptions."))?;

    Ok(Json(subscriptions))
}

#[derive(Deserialize)]
struct SubscribeBody {
    email: String,
    location: Option<String>,
}

impl TryFrom<SubscribeBody> for NewSubscriber {
    type Error = String;

    fn try_from(body: SubscribeBody) -> Result<Self, Self::Error> {
        let email = SubscriberEmail::parse(body.email)?;
        let location = body.location.filter(|l| !l.trim().is_empty());

        Ok(Self { email, location })
    }
}

#[derive(Serialize)]
struct SubscribeResponse {
    message: &'static str,
    subscription: CreatedSubscription,
}

#[derive(Serialize)]
struct CreatedSubscription {
    id: i32,
    email: String,
}

#[derive(Debug, thiserror::Error)]
enum SubscribeError {
    #[error("Invalid email format.")]
    ValidationError(String),
    #[error("Invalid email format.")]
    MalformedBody(String),
    #[error("This email is already subscribed to our updates.")]
    AlreadySubscribed,
    #[error("Something went wrong. Please try again later.")]
    UnexpectedError(#[from] anyhow::Error),
}

impl IntoResponse for SubscribeError {
    fn into_response(self) -> Response {
        tracing::error!("{:#?}", self);

        let message = self.to_string();
        match self {
            Self::ValidationError(detail) => error_response(
                StatusCode::BAD_REQUEST,
                message,
                Some(vec![ValidationIssue {
                    path: vec!["email"],
                    message: detail,
                }]),
            ),
            Self::MalformedBody(detail) => error_response(
                StatusCode::BAD_REQUEST,
                message,
                Some(vec![ValidationIssue {
                    path: vec![],
                    message: detail,
                }]),
            ),
            Self::AlreadySubscribed => error_response(StatusCode::BAD_REQUEST, message, None),
            Self::UnexpectedError(_) => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, message, None)
            }
        }
    }
}
