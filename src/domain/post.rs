use serde::Serialize;

/// An editorial post as shown in the feed, normalized from the content provider.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub published_date: Option<String>,
    pub url: String,
    pub cover_image: Option<String>,
}
