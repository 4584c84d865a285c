use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Context};
use async_trait::async_trait;
use aws_sdk_dynamodb::{types::AttributeValue, Client};

/// One user, keyed by email. `created_at` is set at signup and never
/// touched again; `profile_image_url` is the only mutable field.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub salt: String,
    pub profile_image_url: String,
    pub created_at: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Unconditional write. A record with the same email is overwritten;
    /// racing signups are last-write-wins.
    async fn put_user(&self, user: &UserRecord) -> anyhow::Result<()>;

    /// Absence is a normal outcome, not an error.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRecord>>;

    /// Partial update of the profile image URL, other attributes untouched.
    async fn set_profile_image(&self, email: &str, url: &str) -> anyhow::Result<()>;
}

pub struct DynamoUserStore {
    client: Client,
    table: String,
}

impl DynamoUserStore {
    pub fn new(client: Client, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
        }
    }
}

#[async_trait]
impl UserStore for DynamoUserStore {
    async fn put_user(&self, user: &UserRecord) -> anyhow::Result<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(to_item(user)))
            .send()
            .await
            .context("dynamodb put_item")?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRecord>> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("email", AttributeValue::S(email.to_string()))
            .send()
            .await
            .context("dynamodb get_item")?;
        out.item.map(from_item).transpose()
    }

    async fn set_profile_image(&self, email: &str, url: &str) -> anyhow::Result<()> {
        self.client
            .update_item()
            .table_name(&self.table)
            .key("email", AttributeValue::S(email.to_string()))
            .update_expression("SET profile_image = :url")
            .expression_attribute_values(":url", AttributeValue::S(url.to_string()))
            .send()
            .await
            .context("dynamodb update_item")?;
        Ok(())
    }
}

// Item attribute names predate this service and stay wire-compatible with
// the existing table: `password`, `profile_image`, `datetime`.
fn to_item(user: &UserRecord) -> HashMap<String, AttributeValue> {
    HashMap::from([
        ("email".into(), AttributeValue::S(user.email.clone())),
        ("name".into(), AttributeValue::S(user.name.clone())),
        (
            "password".into(),
            AttributeValue::S(user.password_hash.clone()),
        ),
        ("salt".into(), AttributeValue::S(user.salt.clone())),
        (
            "profile_image".into(),
            AttributeValue::S(user.profile_image_url.clone()),
        ),
        ("datetime".into(), AttributeValue::S(user.created_at.clone())),
    ])
}

fn from_item(mut item: HashMap<String, AttributeValue>) -> anyhow::Result<UserRecord> {
    Ok(UserRecord {
        email: take_s(&mut item, "email")?,
        name: take_s(&mut item, "name")?,
        password_hash: take_s(&mut item, "password")?,
        salt: take_s(&mut item, "salt")?,
        profile_image_url: take_s(&mut item, "profile_image")?,
        created_at: take_s(&mut item, "datetime")?,
    })
}

fn take_s(item: &mut HashMap<String, AttributeValue>, key: &str) -> anyhow::Result<String> {
    match item.remove(key) {
        Some(AttributeValue::S(v)) => Ok(v),
        _ => bail!("user item missing string attribute `{key}`"),
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, UserRecord>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn put_user(&self, user: &UserRecord) -> anyhow::Result<()> {
        self.users
            .lock()
            .unwrap()
            .insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRecord>> {
        Ok(self.users.lock().unwrap().get(email).cloned())
    }

    async fn set_profile_image(&self, email: &str, url: &str) -> anyhow::Result<()> {
        // Absent email is a silent no-op, matching the table's update
        // semantics as the handlers rely on them.
        if let Some(user) = self.users.lock().unwrap().get_mut(email) {
            user.profile_image_url = url.to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UserRecord {
        UserRecord {
            email: "a@b.com".into(),
            name: "A".into(),
            password_hash: "h".into(),
            salt: "s".into(),
            profile_image_url: "https://bucket.s3.amazonaws.com/img1.png".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn item_marshalling_roundtrip() {
        let user = sample();
        let back = from_item(to_item(&user)).unwrap();
        assert_eq!(back.email, user.email);
        assert_eq!(back.password_hash, user.password_hash);
        assert_eq!(back.salt, user.salt);
        assert_eq!(back.profile_image_url, user.profile_image_url);
        assert_eq!(back.created_at, user.created_at);
    }

    #[test]
    fn from_item_rejects_missing_attribute() {
        let mut item = to_item(&sample());
        item.remove("salt");
        let err = from_item(item).unwrap_err();
        assert!(err.to_string().contains("salt"));
    }

    #[tokio::test]
    async fn memory_store_put_get_update() {
        let store = MemoryUserStore::default();
        store.put_user(&sample()).await.unwrap();

        let user = store.find_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(user.name, "A");

        store
            .set_profile_image("a@b.com", "https://bucket.s3.amazonaws.com/img2.png")
            .await
            .unwrap();
        let user = store.find_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(
            user.profile_image_url,
            "https://bucket.s3.amazonaws.com/img2.png"
        );

        // Unknown email: no error, no record created.
        store
            .set_profile_image("nobody@b.com", "https://x/y.png")
            .await
            .unwrap();
        assert!(store.find_by_email("nobody@b.com").await.unwrap().is_none());
    }
}
