pub mod health_check;
pub mod posts;
pub mod subscriptions;
pub mod visitor_count;
