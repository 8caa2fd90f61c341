mod account;
mod new_subscriber;
mod post;
mod subscriber_email;
mod subscription;

pub use account::Account;
pub use new_subscriber::NewSubscriber;
pub use post::Post;
pub use subscriber_email::SubscriberEmail;
pub use subscription::Subscription;
