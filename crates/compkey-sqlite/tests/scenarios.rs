//! End-to-end unique key validation against SQLite.
//!
//! Each test drives records through a small host layer that clears errors,
//! applies its own field rules, then validates unique keys, the way an
//! application's validation pipeline would.

use compkey_core::{Criteria, DynRecord, KeyRegistry, Record, UniqueKeyValidator, Value};
use compkey_sqlite::SqliteStore;

const KEYS: &str = r#"{
    "user": [
        {
            "attributes": "email, applicationId",
            "errorMessage": "This email is already registered",
            "errorAttributes": "email",
            "skipOnErrorIn": "email, applicationId"
        },
        {
            "attributes": "login, applicationId",
            "errorMessage": "Your login is already taken",
            "errorAttributes": "login"
        }
    ],
    "news": {
        "attributes": "title, categoryId",
        "errorMessage": "There is already news with such a title in this category!",
        "errorAttributes": "title, categoryId"
    },
    "user_rated_news": {
        "attributes": "userId, newsId",
        "errorMessage": "User cannot rate news twice!",
        "errorAttributes": "userId, newsId"
    }
}"#;

const SCHEMA: &str = r#"
    CREATE TABLE user (
        id INT(3) PRIMARY KEY NOT NULL,
        applicationId INT(3) NOT NULL,
        login VARCHAR(30),
        email VARCHAR(30)
    );
    CREATE TABLE news (
        id INT(3) PRIMARY KEY NOT NULL,
        categoryId INT(3) DEFAULT NULL,
        title TEXT,
        text TEXT
    );
    CREATE TABLE user_rated_news (
        userId INT(3) NOT NULL,
        newsId INT(3) NOT NULL,
        rating INT(1) NOT NULL
    );

    INSERT INTO user VALUES (1, 1, 'test1', 'test1@gmail.com');
    INSERT INTO user VALUES (2, 1, 'test2', 'test2@gmail.com');
    INSERT INTO user VALUES (3, 2, 'test3', 'test3@gmail.com');

    INSERT INTO news VALUES (1, NULL, 'Perpetual Motion Found!', 'no category');
    INSERT INTO news VALUES (2, 1, 'Perpetual Motion Found!', 'category one');
    INSERT INTO news VALUES (3, 2, 'Cold Fusion Confirmed', 'category two');

    INSERT INTO user_rated_news VALUES (1, 1, 5);
    INSERT INTO user_rated_news VALUES (1, 2, 4);
    INSERT INTO user_rated_news VALUES (2, 1, 3);
"#;

struct App {
    store: SqliteStore,
    keys: KeyRegistry,
}

impl App {
    fn new() -> Self {
        let store = SqliteStore::open_in_memory().unwrap();
        store.execute_batch(SCHEMA).unwrap();

        let keys = KeyRegistry::from_json(KEYS).unwrap();
        for entity in keys.entities() {
            store.check_keys(&keys.get(&entity).unwrap()).unwrap();
        }

        Self { store, keys }
    }

    fn new_record(&self, entity: &str, values: &[(&str, Value)]) -> DynRecord {
        let mut record = self.store.new_record(entity).unwrap();
        for (field, value) in values {
            record.set(*field, value.clone());
        }
        record
    }

    fn find(&self, entity: &str, criteria: Criteria) -> Option<DynRecord> {
        let keys = self.keys.get(entity).unwrap();
        self.store.load(&keys, &criteria).unwrap()
    }

    fn validate(&self, record: &mut DynRecord) -> bool {
        record.errors_mut().clear();
        self.store.coerce_record(record).unwrap();
        apply_field_rules(record);

        let keys = self.keys.get(record.entity()).unwrap();
        let report = UniqueKeyValidator::new(&keys, &self.store)
            .validate(record)
            .unwrap();

        report.is_valid() && record.errors().is_empty()
    }

    fn save(&self, record: &mut DynRecord, primary_key: &[&str]) -> bool {
        if !self.validate(record) {
            return false;
        }
        if record.is_new() {
            self.store.insert(record).unwrap();
            true
        } else {
            self.store.update(record, primary_key).unwrap() == 1
        }
    }
}

/// Host-side rules that run after column coercion and before the unique keys.
fn apply_field_rules(record: &mut DynRecord) {
    let mut errors = Vec::new();
    for (field, value) in record.fields() {
        let integer_field = matches!(
            field.as_str(),
            "id" | "applicationId" | "userId" | "newsId" | "rating"
        );
        if integer_field && !matches!(value, Value::Int(_)) {
            errors.push((field.clone(), format!("{} must be an integer.", field)));
        }
        if field == "email" {
            if let Value::String(email) = value {
                if !email.contains('@') {
                    errors.push((field.clone(), "Email is not a valid email address.".to_string()));
                }
            }
        }
    }
    for (field, message) in errors {
        record.add_error(&field, &message);
    }
}

#[test]
fn test_save_and_update_of_model_with_two_unique_keys() {
    let app = App::new();

    let mut user = app.new_record(
        "user",
        &[
            ("id", 4.into()),
            ("applicationId", 2.into()),
            ("login", "test2".into()),
            ("email", "test2@gmail.com".into()),
        ],
    );
    assert!(app.validate(&mut user));

    // already registered in application #1
    user.set("applicationId", 1);
    assert!(!app.validate(&mut user));
    assert_eq!(user.error("login"), Some("Your login is already taken"));
    assert_eq!(user.error("email"), Some("This email is already registered"));

    user.set("login", "Free_login");
    assert!(!app.validate(&mut user));
    assert_eq!(user.error("login"), None);
    assert_eq!(user.error("email"), Some("This email is already registered"));

    user.set("email", "Free.email@gmail.com");
    assert!(app.validate(&mut user));
    assert!(app.save(&mut user, &["id"]));

    let mut user = app.find("user", Criteria::new().with_value("id", 4)).unwrap();
    assert!(app.validate(&mut user));
    assert!(app.save(&mut user, &["id"]));
}

#[test]
fn test_save_and_update_of_model_with_one_unique_key() {
    let app = App::new();

    // news #1 has already been rated by user #1
    let mut rating = app.new_record(
        "user_rated_news",
        &[("userId", 1.into()), ("newsId", 1.into()), ("rating", 3.into())],
    );
    assert!(!app.validate(&mut rating));
    assert_eq!(rating.error("userId"), Some("User cannot rate news twice!"));
    assert_eq!(rating.error("newsId"), Some("User cannot rate news twice!"));

    rating.set("newsId", 3);
    assert!(app.validate(&mut rating));
    assert!(app.save(&mut rating, &["userId", "newsId"]));

    let mut rating = app
        .find(
            "user_rated_news",
            Criteria::new().with_value("userId", 1).with_value("newsId", 3),
        )
        .unwrap();
    rating.set("rating", 4);
    assert!(app.validate(&mut rating));
    assert!(app.save(&mut rating, &["userId", "newsId"]));

    let stored = app
        .find(
            "user_rated_news",
            Criteria::new().with_value("userId", 1).with_value("newsId", 3),
        )
        .unwrap();
    assert_eq!(stored.get("rating"), Some(&Value::Int(4)));
}

#[test]
fn test_unique_key_with_possible_null_attribute_value() {
    let app = App::new();

    // same title already exists without a category
    let mut news = app.new_record(
        "news",
        &[
            ("id", 5.into()),
            ("categoryId", Value::Null),
            ("title", "Perpetual Motion Found!".into()),
            ("text", "wow!".into()),
        ],
    );
    assert!(!app.validate(&mut news));
    assert!(news.error("title").is_some());
    assert_eq!(news.error("title"), news.error("categoryId"));

    // and in category #1
    news.set("categoryId", 1);
    assert!(!app.validate(&mut news));
    assert_eq!(news.error("title"), news.error("categoryId"));

    // but not in category #2
    news.set("categoryId", 2);
    assert!(app.validate(&mut news));
    assert!(app.save(&mut news, &["id"]));

    let mut news = app.find("news", Criteria::new().with_value("id", 5)).unwrap();
    news.set("text", "updated text");
    assert!(app.validate(&mut news));
    assert!(app.save(&mut news, &["id"]));
}

#[test]
fn test_save_and_update_with_skip_on_error_in() {
    let app = App::new();

    let mut user = app.new_record(
        "user",
        &[
            ("id", 42.into()),
            // taken in application #1
            ("login", "test1".into()),
            ("applicationId", "wrong_application_id".into()),
            ("email", "wrong_email_format".into()),
        ],
    );
    assert!(!app.validate(&mut user));
    assert!(user.error("email").is_some());
    assert_ne!(user.error("email"), Some("This email is already registered"));
    assert!(user.error("applicationId").is_some());
    assert_eq!(user.error("login"), None);

    user.set("applicationId", 1);
    user.set("email", "test1@gmail.com");
    assert!(!app.validate(&mut user));
    assert_eq!(user.error("email"), Some("This email is already registered"));
    assert_eq!(user.error("login"), Some("Your login is already taken"));

    user.set("applicationId", 3);
    assert!(app.validate(&mut user));
    assert!(app.save(&mut user, &["id"]));

    let mut user = app.find("user", Criteria::new().with_value("id", 42)).unwrap();
    assert!(app.validate(&mut user));
    assert!(app.save(&mut user, &["id"]));
}

#[test]
fn test_loaded_duplicates_flag_each_other() {
    let app = App::new();
    app.store
        .execute_batch("INSERT INTO news VALUES (9, NULL, 'Perpetual Motion Found!', 'dup');")
        .unwrap();

    for id in [1, 9] {
        let mut news = app.find("news", Criteria::new().with_value("id", id)).unwrap();
        assert!(!app.validate(&mut news), "news #{id} should collide");
    }

    let mut other = app.find("news", Criteria::new().with_value("id", 3)).unwrap();
    assert!(app.validate(&mut other));
}

#[test]
fn test_changed_key_on_loaded_record() {
    let app = App::new();

    let mut user = app.find("user", Criteria::new().with_value("id", 3)).unwrap();
    user.set("applicationId", 1);
    user.set("login", "test1");
    assert!(!app.validate(&mut user));
    assert_eq!(user.error("login"), Some("Your login is already taken"));
    assert_eq!(user.error("email"), None);

    user.set("login", "test3");
    assert!(app.validate(&mut user));
}

#[test]
fn test_loaded_record_keeps_key_under_other_value_types() {
    let app = App::new();

    let mut rating = app
        .find(
            "user_rated_news",
            Criteria::new().with_value("userId", 1).with_value("newsId", 2),
        )
        .unwrap();
    rating.set("userId", 1.0);
    rating.set("newsId", "2");
    assert!(app.validate(&mut rating));
    assert_eq!(rating.get("newsId"), Some(&Value::Int(2)));

    // news #1 of user #1 is rated already
    rating.set("newsId", "1");
    assert!(!app.validate(&mut rating));
    assert_eq!(rating.error("newsId"), Some("User cannot rate news twice!"));
}
