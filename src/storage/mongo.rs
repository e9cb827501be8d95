//! MongoDB backend
//!
//! One document per user in the `users` collection:
//!
//! ```text
//! {"user_id": "<id>", "categories": {"<name>": [{"message_id": 1, "file_type": "photo"}]}}
//! ```
//!
//! Every mutation is a single server-side update (`$push`, `$set`,
//! `$unset`, `$setOnInsert`), never a read-modify-write of the document, so
//! concurrent appends from any number of processes are all kept. Creating
//! a category additionally runs inside a per-user critical section.
//!
//! Category names are stored as field names under `categories`. `%`, `.`
//! and a leading `$` are percent-encoded there (see [`encode_category`]), so
//! any non-empty name is one addressable field.

use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::sync::{Client, Collection};
use mongodb::IndexModel;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{StoreError, StoreResult};
use crate::health::Liveness;
use crate::models::{user_key, validate_category_name, FileRecord, UserSnapshot};

use super::locks::UserLocks;
use super::CategoryStore;

/// Collection holding one document per user
pub const USERS_COLLECTION: &str = "users";

const DUPLICATE_KEY: i32 = 11000;

/// Store backed by a MongoDB collection
pub struct MongoStore {
    client: Client,
    users: Collection<UserSnapshot>,
    locks: UserLocks,
}

impl MongoStore {
    /// Connect, verify the server answers, and ensure the `user_id` index
    ///
    /// Any failure here is [`StoreError::ConnectionUnavailable`].
    pub fn connect(settings: &Settings) -> StoreResult<Self> {
        let uri = settings
            .mongo_uri
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| StoreError::ConnectionUnavailable("MONGO_URI is not configured".into()))?;

        let mut options = ClientOptions::parse(uri)
            .run()
            .map_err(|e| StoreError::ConnectionUnavailable(format!("Invalid connection string: {}", e)))?;
        options.server_selection_timeout = Some(settings.operation_timeout);
        options.connect_timeout = Some(settings.operation_timeout);
        options.app_name = Some("filestash".to_string());

        let client = Client::with_options(options)
            .map_err(|e| StoreError::ConnectionUnavailable(e.to_string()))?;

        ping(&client).map_err(|e| StoreError::ConnectionUnavailable(e.to_string()))?;

        let users = client
            .database(&settings.mongo_db)
            .collection::<UserSnapshot>(USERS_COLLECTION);

        let index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        users
            .create_index(index)
            .run()
            .map_err(|e| StoreError::ConnectionUnavailable(format!("Failed to create index: {}", e)))?;

        info!(database = %settings.mongo_db, "Connected to MongoDB");

        Ok(Self {
            client,
            users,
            locks: UserLocks::new(),
        })
    }

    /// Insert an empty user document if none exists
    fn ensure_user(&self, key: &str) -> StoreResult<()> {
        let update = doc! { "$setOnInsert": { "categories": {} } };
        self.upsert_with_retry(key, update)
    }

    /// Upsert on `user_id`, retrying once if a concurrent upsert inserted first
    fn upsert_with_retry(&self, key: &str, update: Document) -> StoreResult<()> {
        let filter = doc! { "user_id": key };

        match self
            .users
            .update_one(filter.clone(), update.clone())
            .upsert(true)
            .run()
        {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                self.users.update_one(filter, update).upsert(true).run()?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl CategoryStore for MongoStore {
    fn backend_name(&self) -> &'static str {
        "mongo"
    }

    fn backup_prefix(&self) -> &'static str {
        "mongodb"
    }

    fn user_categories(&self, user_id: i64) -> StoreResult<Vec<String>> {
        let key = user_key(user_id);

        match self.users.find_one(doc! { "user_id": key.as_str() }).run()? {
            Some(user) => Ok(decode_user(user).categories.into_keys().collect()),
            None => {
                self.ensure_user(&key)?;
                Ok(Vec::new())
            }
        }
    }

    fn add_file_to_category(
        &self,
        user_id: i64,
        category: &str,
        record: FileRecord,
    ) -> StoreResult<()> {
        validate_category_name(category)?;
        let key = user_key(user_id);

        let record = mongodb::bson::to_bson(&record)
            .map_err(|e| StoreError::Json(format!("Failed to encode record: {}", e)))?;

        let mut push = Document::new();
        push.insert(category_field(category), record);

        self.upsert_with_retry(&key, doc! { "$push": push })?;

        debug!(backend = "mongo", user_id = %key, category, "Added file");
        Ok(())
    }

    fn files_in_category(&self, user_id: i64, category: &str) -> StoreResult<Vec<FileRecord>> {
        // The empty name can never have been stored
        if validate_category_name(category).is_err() {
            return Ok(Vec::new());
        }

        let key = user_key(user_id);
        let mut projection = doc! { "_id": 0, "user_id": 1 };
        projection.insert(category_field(category), 1);

        let user = self
            .users
            .find_one(doc! { "user_id": key.as_str() })
            .projection(projection)
            .run()?;

        Ok(user
            .and_then(|mut u| u.categories.remove(&encode_category(category)))
            .unwrap_or_default())
    }

    fn create_category(&self, user_id: i64, category: &str) -> StoreResult<()> {
        validate_category_name(category)?;
        let key = user_key(user_id);

        let created = self.locks.with_lock(&key, || {
            self.ensure_user(&key)?;

            let field = category_field(category);
            let mut filter = doc! { "user_id": key.as_str() };
            filter.insert(field.clone(), doc! { "$exists": false });

            let mut set = Document::new();
            set.insert(field, Bson::Array(Vec::new()));

            let result = self.users.update_one(filter, doc! { "$set": set }).run()?;
            Ok(result.modified_count > 0)
        })?;

        if created {
            debug!(backend = "mongo", user_id = %key, category, "Created category");
        }
        Ok(())
    }

    fn delete_category(&self, user_id: i64, category: &str) -> StoreResult<bool> {
        if validate_category_name(category).is_err() {
            return Ok(false);
        }

        let key = user_key(user_id);
        let field = category_field(category);

        let mut filter = doc! { "user_id": key.as_str() };
        filter.insert(field.clone(), doc! { "$exists": true });

        let mut unset = Document::new();
        unset.insert(field, "");

        let result = self.users.update_one(filter, doc! { "$unset": unset }).run()?;
        let deleted = result.modified_count == 1;
        if deleted {
            debug!(backend = "mongo", user_id = %key, category, "Deleted category");
        }
        Ok(deleted)
    }

    fn liveness_check(&self) -> Liveness {
        match ping(&self.client) {
            Ok(()) => Liveness::reachable("ping ok"),
            Err(e) => Liveness::unreachable(e.to_string()),
        }
    }

    fn export_users(&self) -> StoreResult<Vec<UserSnapshot>> {
        let cursor = self
            .users
            .find(doc! {})
            .projection(doc! { "_id": 0 })
            .sort(doc! { "user_id": 1 })
            .run()?;

        let users = cursor.collect::<Result<Vec<_>, _>>()?;
        Ok(users.into_iter().map(decode_user).collect())
    }

    fn replace_all(&self, users: Vec<UserSnapshot>) -> StoreResult<()> {
        let removed = self.users.delete_many(doc! {}).run()?;

        let count = users.len();
        if !users.is_empty() {
            self.users
                .insert_many(users.into_iter().map(encode_user))
                .run()?;
        }

        info!(
            backend = "mongo",
            removed = removed.deleted_count,
            users = count,
            "Replaced store contents"
        );
        Ok(())
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        // Dropping the last client handle closes its connection pool
        drop(self);
        debug!("Closed MongoDB store");
        Ok(())
    }
}

fn ping(client: &Client) -> mongodb::error::Result<()> {
    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .run()
        .map(|_| ())
}

/// Field path of a category inside a user document
fn category_field(category: &str) -> String {
    format!("categories.{}", encode_category(category))
}

/// Field name for a category under `categories`
///
/// `%`, `.` and a leading `$` become `%25`, `%2E` and `%24`; everything
/// else is kept as is.
fn encode_category(category: &str) -> String {
    let mut encoded = String::with_capacity(category.len());
    for (i, c) in category.chars().enumerate() {
        match c {
            '%' => encoded.push_str("%25"),
            '.' => encoded.push_str("%2E"),
            '$' if i == 0 => encoded.push_str("%24"),
            _ => encoded.push(c),
        }
    }
    encoded
}

/// Inverse of [`encode_category`]; unknown escapes are left alone
fn decode_category(field: &str) -> String {
    let mut decoded = String::with_capacity(field.len());
    let mut rest = field;

    while let Some(pos) = rest.find('%') {
        decoded.push_str(&rest[..pos]);
        let escape = &rest[pos..];
        let (c, len) = match escape.get(..3) {
            Some("%25") => ('%', 3),
            Some("%2E") => ('.', 3),
            Some("%24") => ('$', 3),
            _ => ('%', 1),
        };
        decoded.push(c);
        rest = &escape[len..];
    }

    decoded.push_str(rest);
    decoded
}

fn encode_user(user: UserSnapshot) -> UserSnapshot {
    UserSnapshot {
        user_id: user.user_id,
        categories: user
            .categories
            .into_iter()
            .map(|(name, files)| (encode_category(&name), files))
            .collect(),
    }
}

fn decode_user(user: UserSnapshot) -> UserSnapshot {
    UserSnapshot {
        user_id: user.user_id,
        categories: user
            .categories
            .into_iter()
            .map(|(field, files)| (decode_category(&field), files))
            .collect(),
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_field() {
        assert_eq!(category_field("Receipts"), "categories.Receipts");
        assert_eq!(category_field("two words"), "categories.two words");
        assert_eq!(category_field("Photos 2024.01"), "categories.Photos 2024%2E01");
        assert_eq!(category_field("$where"), "categories.%24where");
    }

    #[test]
    fn test_category_encoding_reverses() {
        for name in ["plain", "a.b.c", "$set", "price$", "50% off", "%2E", "%24x", "..", "日本.語"] {
            let encoded = encode_category(name);
            assert!(!encoded.contains('.'), "{encoded}");
            assert!(!encoded.starts_with('$'), "{encoded}");
            assert_eq!(decode_category(&encoded), name);
        }
    }

    #[test]
    fn test_decode_keeps_stray_percent() {
        assert_eq!(decode_category("100%"), "100%");
        assert_eq!(decode_category("%zz"), "%zz");
    }

    #[test]
    fn test_user_encoding_round_trip() {
        let mut user = UserSnapshot {
            user_id: "3".into(),
            categories: Default::default(),
        };
        user.categories
            .insert("v1.2".into(), vec![FileRecord::new(1, "document")]);

        let stored = encode_user(user.clone());
        assert!(stored.categories.contains_key("v1%2E2"));
        assert_eq!(decode_user(stored), user);
    }

    #[test]
    fn test_record_encoding_omits_missing_name() {
        let encoded = mongodb::bson::to_document(&FileRecord::new(5, "photo")).unwrap();
        assert_eq!(encoded.get_i64("message_id").unwrap(), 5);
        assert_eq!(encoded.get_str("file_type").unwrap(), "photo");
        assert!(!encoded.contains_key("file_name"));
    }

    #[test]
    fn test_user_document_decodes_with_extra_fields() {
        let raw = doc! {
            "_id": mongodb::bson::oid::ObjectId::new(),
            "user_id": "12",
            "categories": {
                "docs": [
                    { "message_id": 3_i32, "file_type": "document", "file_name": "a.pdf" },
                ],
            },
        };
        let user: UserSnapshot = mongodb::bson::from_document(raw).unwrap();
        assert_eq!(user.user_id, "12");
        assert_eq!(
            user.categories["docs"],
            vec![FileRecord::with_name(3, "document", Some("a.pdf"))]
        );
    }

    #[test]
    fn test_connect_rejects_bad_uri() {
        let settings = Settings::mongo("not-a-mongo-uri", "db");
        let err = MongoStore::connect(&settings).err().unwrap();
        assert!(err.is_connection_unavailable());
    }
}
