//! Creates the posts database under the configured content provider page,
//! with a welcome post, unless one already exists.

use anyhow::Context;
use graceperiod::{
    configuration::get_configuration,
    content_client::ContentClient,
    telemetry::{get_subscriber, init_subscriber},
};
use serde_json::{json, Value};
use time::{macros::format_description, OffsetDateTime};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("setup-content".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration().context("Failed to read configuration")?;
    let client = configuration.content.client()?;

    if let Err(e) = setup_posts_database(&client).await {
        tracing::error!(error.cause_chain = ?e, "Content setup failed");
        return Err(e);
    }

    Ok(())
}

#[tracing::instrument(skip_all, fields(page_id = client.page_id()))]
async fn setup_posts_database(client: &ContentClient) -> Result<(), anyhow::Error> {
    let page_id = client.page_id();

    client.retrieve_page(page_id).await.context(
        "Cannot access the configured page. Check that the integration has been \
        shared with the page and that the page url is correct",
    )?;
    tracing::info!("Connected to the content provider page");

    if let Some(existing) = client.find_database_titled(page_id, "post").await? {
        tracing::info!(
            database_id = %existing.id,
            "Posts database `{}` already exists",
            existing.title()
        );
        return Ok(());
    }

    let database = client
        .create_database(&posts_database(page_id))
        .await?;
    tracing::info!(database_id = %database.id, "Created posts database");

    let today = OffsetDateTime::now_utc()
        .format(format_description!("[year]-[month]-[day]"))
        .context("Failed to format today's date")?;
    client
        .create_page(&welcome_post(&database.id, &today))
        .await?;
    tracing::info!("Added welcome post");

    Ok(())
}

fn posts_database(page_id: &str) -> Value {
    json!({
        "parent": { "type": "page_id", "page_id": page_id },
        "title": [{ "type": "text", "text": { "content": "Posts" } }],
        "properties": {
            "Title": { "title": {} },
            "Body": { "rich_text": {} },
            "Tags": {
                "multi_select": {
                    "options": [
                        { "name": "Music", "color": "blue" },
                        { "name": "Updates", "color": "green" },
                        { "name": "News", "color": "orange" },
                        { "name": "Personal", "color": "purple" }
                    ]
                }
            },
            "PublishedDate": { "date": {} }
        }
    })
}

fn welcome_post(database_id: &str, date: &str) -> Value {
    json!({
        "parent": { "database_id": database_id },
        "properties": {
            "Title": { "title": [{ "text": { "content": "Welcome to Grace Period" } }] },
            "Body": {
                "rich_text": [{
                    "text": {
                        "content": "Thank you for joining the Grace Period community! \
                            Stay tuned for updates, new music, and behind-the-scenes content. \
                            This is just the beginning of our journey together."
                    }
                }]
            },
            "Tags": { "multi_select": [{ "name": "Updates" }, { "name": "Music" }] },
            "PublishedDate": { "date": { "start": date } }
        }
    })
}
