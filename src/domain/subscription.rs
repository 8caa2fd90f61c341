use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// A stored mailing-list signup.
///
/// The email is kept as the raw stored text rather than a [`super::SubscriberEmail`]
/// so that listing never fails on rows written before validation was enforced.
#[derive(Clone, Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: i32,
    pub email: String,
    pub location: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub subscribed_at: OffsetDateTime,
}
