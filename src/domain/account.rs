use secrecy::Secret;

#[derive(Clone, Debug)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub password: Secret<String>,
}
