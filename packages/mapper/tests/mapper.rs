use std::rc::Rc;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use shelf_mapper::{
    event_name, path, BucketRemoval, CreateTime, CreationHook, Db, Error, Mutation, Options,
    Bytes, Params, Path, Publish, Record, UpdateHook, UpdateTime,
};
use shelf_validate::Validator;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Person {
    id: String,
    name: String,
    active: bool,
    #[serde(flatten)]
    created: CreateTime,
    #[serde(flatten)]
    updated: UpdateTime,
}

impl Person {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

impl Record for Person {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn creation_hook(&mut self) -> Option<&mut dyn CreationHook> {
        Some(&mut self.created)
    }

    fn update_hook(&mut self) -> Option<&mut dyn UpdateHook> {
        Some(&mut self.updated)
    }
}

fn db() -> Db {
    Db::in_memory(Options::default().log_operations(true)).unwrap()
}

fn save_all(db: &Db, path: &str, names: &[&str]) -> Vec<Person> {
    names
        .iter()
        .map(|name| {
            let mut p = Person::named(name);
            db.save(path, &mut p).unwrap();
            p
        })
        .collect()
}

// === Save and find ===

#[test]
fn test_save_assigns_sequential_ids() {
    let db = db();

    let mut p = Person::named("John Doe");
    db.save("people", &mut p).unwrap();
    assert_eq!(p.id, "1");
    assert!(!p.active);
    assert!(p.created.created > CreateTime::default().created);
    assert!(p.updated.updated >= p.created.created);

    let mut q = Person::named("Jane Doe");
    db.save("people", &mut q).unwrap();
    assert_eq!(q.id, "2");
}

#[test]
fn test_update_keeps_id_and_count() {
    let db = db();

    let mut p = Person::named("John Doe");
    db.save("people", &mut p).unwrap();
    let created = p.created;

    p.active = true;
    db.save("people", &mut p).unwrap();
    db.save("people", &mut p).unwrap();

    assert_eq!(p.id, "1");
    assert_eq!(p.created, created);
    assert!(p.updated.updated >= created.created);
    assert_eq!(db.count("people"), 1);

    let stored: Person = db.find("people", "1").unwrap().unwrap();
    assert!(stored.active);
}

#[test]
fn test_find_round_trip() {
    let db = db();

    let mut p = Person::named("John Doe");
    db.save("people", &mut p).unwrap();

    let mut found = Person::default();
    db.find_into("people", &p.id, &mut found).unwrap();
    assert_eq!(found, p);

    assert_eq!(db.find::<Person>("people", &p.id).unwrap(), Some(p));
}

#[test]
fn test_find_missing_key_leaves_destination() {
    let db = db();
    save_all(&db, "people", &["John Doe"]);

    let mut dest = Person::named("untouched");
    db.find_into("people", "999", &mut dest).unwrap();
    assert_eq!(dest.name, "untouched");
    assert!(db.find::<Person>("people", "999").unwrap().is_none());
}

#[test]
fn test_save_creates_nested_buckets() {
    let db = db();

    let mut p = Person::named("Nested");
    db.save(path!("tenants", "acme", "people"), &mut p).unwrap();
    assert_eq!(p.id, "1");

    assert_eq!(db.count("tenants/acme/people"), 1);
    assert_eq!(db.count("tenants/acme"), 0);
    assert_eq!(db.count(["tenants", "other"]), 0);

    // Sequences are per bucket.
    let mut q = Person::named("Elsewhere");
    db.save("tenants/globex/people", &mut q).unwrap();
    assert_eq!(q.id, "1");
}

#[test]
fn test_failed_save_leaves_record_untouched() {
    let db = db();
    db.save_value("people", "blocked", b"x").unwrap();

    // "blocked" is a value, so no bucket can be created under it.
    let mut p = Person::named("John Doe");
    let err = db.save("people/blocked", &mut p).unwrap_err();
    assert!(matches!(err, Error::Store { context: "create bucket", .. }));
    assert_eq!(p.id, "");
    assert_eq!(p.created, CreateTime::default());

    // The sequence was not consumed.
    let mut q = Person::named("Jane Doe");
    db.save("people", &mut q).unwrap();
    assert_eq!(q.id, "1");
}

// === Listing ===

#[test]
fn test_list_values_and_pointers() {
    let db = db();
    let saved = save_all(&db, "peoplelist", &["John Doe", "John1 Doe"]);

    let mut res: Vec<Person> = Vec::new();
    db.list("peoplelist", &mut res).unwrap();
    assert_eq!(res, saved);

    let mut shared: Vec<Arc<Person>> = Vec::new();
    db.list("peoplelist", &mut shared).unwrap();
    assert_eq!(*shared[0], saved[0]);
    assert_eq!(*shared[1], saved[1]);

    let mut local: Vec<Rc<Person>> = Vec::new();
    db.list("peoplelist", &mut local).unwrap();
    assert_eq!(local.len(), 2);
}

#[test]
fn test_list_appends_to_destination() {
    let db = db();
    save_all(&db, "people", &["a", "b"]);

    let mut res = vec![Person::named("already here")];
    db.list("people", &mut res).unwrap();
    assert_eq!(res.len(), 3);
    assert_eq!(res[0].name, "already here");
}

#[test]
fn test_list_window_and_reverse() {
    let db = db();
    save_all(&db, "people", &["a", "b", "c", "d", "e"]);

    let names = |params: Params| {
        let mut res: Vec<Person> = Vec::new();
        db.list_with("people", &mut res, params).unwrap();
        res.into_iter().map(|p| p.name).collect::<Vec<_>>()
    };

    assert_eq!(names(Params::new().limit(2)), ["a", "b"]);
    assert_eq!(names(Params::new().offset(1).limit(2)), ["b", "c"]);
    assert_eq!(names(Params::new().reverse()), ["e", "d", "c", "b", "a"]);
    assert_eq!(names(Params::new().offset(1).limit(2).reverse()), ["d", "c"]);
    assert!(names(Params::new().offset(5)).is_empty());
}

#[test]
fn test_keys_order_bytewise() {
    let db = db();
    let names: Vec<String> = (1..=11).map(|n| format!("p{n}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    save_all(&db, "people", &refs);

    let ids: Vec<Bytes> = db.list_items("people").unwrap().into_keys().collect();
    assert_eq!(
        &ids[..4],
        ["1", "10", "11", "2"].map(|id| Bytes::from(id.as_bytes().to_vec()))
    );
}

#[test]
fn test_default_limit_applies_to_plain_listings() {
    let db = Db::in_memory(Options::default().default_limit(3)).unwrap();
    save_all(&db, "people", &["a", "b", "c", "d"]);

    let mut res: Vec<Person> = Vec::new();
    db.list("people", &mut res).unwrap();
    assert_eq!(res.len(), 3);
    assert_eq!(db.values("people").unwrap().len(), 3);
    assert_eq!(db.list_items("people").unwrap().len(), 3);
    assert_eq!(db.count("people"), 4);
}

#[test]
fn test_list_skips_empty_values() {
    let db = db();
    save_all(&db, "people", &["a", "b"]);
    db.save_value("people", "0", b"").unwrap();

    let mut res: Vec<Person> = Vec::new();
    db.list("people", &mut res).unwrap();
    assert_eq!(res.len(), 2);

    let mut page: Vec<Person> = Vec::new();
    db.list_with("people", &mut page, Params::new().offset(1)).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "b");

    // Raw listings keep them.
    assert_eq!(db.values("people").unwrap().len(), 3);
    assert_eq!(db.list_items("people").unwrap()[&b"0"[..]].len(), 0);
}

#[test]
fn test_list_keys_in_given_order() {
    let db = db();
    let saved = save_all(&db, "list2", &["John Doe", "John1 Doe", "John2 Doe", "John3 Doe"]);

    let mut res: Vec<Person> = Vec::new();
    db.list_keys("list2", &[saved[0].id.as_str(), saved[3].id.as_str(), "11111"], &mut res)
        .unwrap();
    assert_eq!(res, vec![saved[0].clone(), saved[3].clone()]);

    let mut reversed: Vec<Person> = Vec::new();
    db.list_keys("list2", &[b"4".to_vec(), b"1".to_vec()], &mut reversed).unwrap();
    assert_eq!(reversed, vec![saved[3].clone(), saved[0].clone()]);
}

#[test]
fn test_list_items_and_values() {
    let db = db();
    save_all(&db, "peoplelist1", &["John Doe", "John1 Doe"]);

    let items = db.list_items("peoplelist1").unwrap();
    assert_eq!(items.len(), 2);
    let first: Person = serde_json::from_slice(&items[&b"1"[..]]).unwrap();
    assert_eq!(first.name, "John Doe");

    let values = db.values("peoplelist1").unwrap();
    assert_eq!(values.len(), 2);

    let last = db.values_with("peoplelist1", Params::new().limit(1).reverse()).unwrap();
    let last: Person = serde_json::from_slice(&last[0]).unwrap();
    assert_eq!(last.name, "John1 Doe");
}

#[test]
fn test_list_decode_failure_keeps_earlier_records() {
    let db = db();
    save_all(&db, "people", &["a"]);
    db.save_value("people", "2", b"not json").unwrap();

    let mut res: Vec<Person> = Vec::new();
    let err = db.list("people", &mut res).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(res.len(), 1);
}

/// The `offset..offset + limit` slice of `keys` in scan order.
fn window(mut keys: Vec<String>, params: Params) -> Vec<String> {
    keys.sort();
    if params.reverse {
        keys.reverse();
    }
    keys.into_iter().skip(params.offset).take(params.limit).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_pagination_window(n in 0usize..12, offset in 0usize..15, limit in 0usize..15, reverse in any::<bool>()) {
        let db = Db::in_memory(Options::default().event_workers(1)).unwrap();
        // An empty value: counted by raw listings, passed over by record listings.
        db.save_value("items", "~", b"").unwrap();
        let mut ids = Vec::new();
        for i in 0..n {
            let mut p = Person::named(&format!("p{i}"));
            db.save("items", &mut p).unwrap();
            ids.push(p.id);
        }

        let mut params = Params::new().offset(offset).limit(limit);
        if reverse {
            params = params.reverse();
        }

        let mut records: Vec<Person> = Vec::new();
        db.list_with("items", &mut records, params).unwrap();
        let listed: Vec<String> = records.into_iter().map(|p| p.id).collect();
        prop_assert_eq!(listed.len(), limit.min(n.saturating_sub(offset)));
        prop_assert_eq!(listed, window(ids.clone(), params));

        let mut raw_keys = ids;
        raw_keys.push("~".to_string());
        let mut expected = window(raw_keys, params);
        expected.sort();
        let items: Vec<String> = db
            .list_items_with("items", params)
            .unwrap()
            .into_keys()
            .map(|k| String::from_utf8_lossy(&k).into_owned())
            .collect();
        prop_assert_eq!(items, expected.clone());
        prop_assert_eq!(db.values_with("items", params).unwrap().len(), expected.len());
    }
}

// === Deleting ===

#[test]
fn test_delete_then_find() {
    let db = db();
    let mut p = Person::named("John Doe");
    db.save("people1", &mut p).unwrap();

    db.delete("people1", &p).unwrap();

    let mut found = Person::default();
    db.find_into("people1", &p.id, &mut found).unwrap();
    assert_eq!(found.id, "");
    assert_eq!(db.count("people1"), 0);
}

#[test]
fn test_delete_keys_ignores_missing() {
    let db = db();
    save_all(&db, "people", &["a", "b", "c"]);

    db.delete_keys("people", &["1", "3", "404"]).unwrap();
    let ids: Vec<Bytes> = db.list_items("people").unwrap().into_keys().collect();
    assert_eq!(ids, [Bytes::from_static(b"2")]);
}

#[test]
fn test_delete_buckets() {
    let db = db();
    db.save_value(["buck1", "buck2"], "1", b"2").unwrap();

    // "1" is a value, not a bucket.
    assert!(db.delete_buckets(["buck1", "buck2"], &["1"]).is_err());

    db.delete_buckets("buck1", &["buck2"]).unwrap();
    assert_eq!(db.count("buck1/buck2"), 0);
    assert!(db.get("buck1/buck2", "1").unwrap_err().is_not_found());
}

#[test]
fn test_delete_buckets_refuses_parents() {
    let db = db();
    db.save_value("root/parent/child", "k", b"v").unwrap();

    let err = db.delete_buckets("root", &["parent"]).unwrap_err();
    assert!(matches!(
        err,
        Error::Store {
            source: shelf_bucket_store::Error::BucketHasChildren,
            ..
        }
    ));
    assert_eq!(db.count("root/parent/child"), 1);
}

#[test]
fn test_delete_buckets_is_all_or_nothing() {
    let db = db();
    db.save_value("root/a", "k", b"v").unwrap();
    db.save_value("root/b/c", "k", b"v").unwrap();

    assert!(db.delete_buckets("root", &["a", "b"]).is_err());
    assert_eq!(db.count("root/a"), 1);
}

#[test]
fn test_delete_buckets_empty_policy() {
    let db = db();
    db.save_value("root/full", "k", b"v").unwrap();
    db.save_value("root/empty", "k", b"v").unwrap();
    db.delete_keys("root/empty", &["k"]).unwrap();

    let err = db
        .delete_buckets_with("root", &["full"], BucketRemoval::Empty)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Store {
            source: shelf_bucket_store::Error::BucketNotEmpty,
            ..
        }
    ));
    db.delete_buckets_with("root", &["empty"], BucketRemoval::Empty).unwrap();
}

// === Concurrency ===

#[test]
fn test_concurrent_creation() {
    let db = Db::in_memory(Options::default()).unwrap();

    std::thread::scope(|s| {
        for _ in 0..100 {
            s.spawn(|| {
                let mut p = Person::named("John Doe");
                db.save("pep31", &mut p).unwrap();
            });
        }
    });

    let mut res: Vec<Person> = Vec::new();
    db.list("pep31", &mut res).unwrap();
    assert_eq!(res.len(), 100);

    let mut ids: Vec<u64> = res.iter().map(|p| p.id.parse().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=100).collect::<Vec<_>>());
    assert_eq!(db.count("pep31"), 100);
}

// === Events ===

#[test]
fn test_event_names() {
    assert_eq!(event_name::<Person>(Mutation::Created), "PersonCreated");
    assert_eq!(event_name::<Person>(Mutation::Deleted), "PersonDeleted");
}

#[test]
fn test_mutations_are_published() {
    let db = db();
    let (tx, rx) = mpsc::channel();

    for mutation in [Mutation::Created, Mutation::Updated, Mutation::Deleted] {
        let tx = tx.clone();
        db.events().subscribe(event_name::<Person>(mutation), move |event| {
            let person = event.payload::<Person>().cloned();
            let _ = tx.send((event.name().to_string(), person));
        });
    }

    let mut p = Person::named("John Doe");
    db.save("people", &mut p).unwrap();
    let (name, payload) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(name, "PersonCreated");
    assert_eq!(payload, Some(p.clone()));

    p.active = true;
    db.save("people", &mut p).unwrap();
    let (name, payload) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(name, "PersonUpdated");
    assert!(payload.unwrap().active);

    db.delete("people", &p).unwrap();
    let (name, _) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(name, "PersonDeleted");

    // Each mutation was announced once.
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[derive(Default)]
struct Recorder {
    topics: Mutex<Vec<String>>,
}

impl Publish for Recorder {
    fn publish(&self, topic: &str, _payload: shelf_event_hub::Payload) {
        self.topics.lock().push(topic.to_string());
    }
}

#[test]
fn test_custom_publisher_and_failed_writes() {
    let recorder = Arc::new(Recorder::default());
    let db = db().with_publisher(recorder.clone());

    let mut p = Person::named("John Doe");
    db.save("people", &mut p).unwrap();
    db.save_value("people", "raw", b"{}").unwrap();
    assert!(db.save(Path::default(), &mut Person::default()).is_err());
    assert!(db.delete("missing", &p).is_err());
    assert_eq!(*recorder.topics.lock(), ["PersonCreated"]);

    p.active = true;
    db.save("people", &mut p).unwrap();
    db.delete("people", &p).unwrap();
    assert_eq!(
        *recorder.topics.lock(),
        ["PersonCreated", "PersonUpdated", "PersonDeleted"]
    );
}

// === Preconditions ===

#[test]
fn test_empty_path_is_rejected() {
    let db = db();
    assert!(matches!(db.get("", "k"), Err(Error::EmptyPath)));
    assert!(matches!(db.save_value("//", "k", b"v"), Err(Error::EmptyPath)));
    assert!(matches!(db.list_items(Path::default()), Err(Error::EmptyPath)));
    assert_eq!(db.count(""), 0);
}

#[test]
fn test_missing_bucket_is_reported() {
    let db = db();
    let err = db.find::<Person>("nobody", "1").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "bucket not found: nobody");

    let mut res: Vec<Person> = Vec::new();
    assert!(db.list("nobody", &mut res).unwrap_err().is_not_found());
    assert!(db.delete_keys("nobody", &["1"]).unwrap_err().is_not_found());
    assert_eq!(db.count("nobody"), 0);
}

#[test]
fn test_close() {
    let db = db();
    save_all(&db, "people", &["a"]);
    db.close().unwrap();

    assert!(matches!(db.find::<Person>("people", "1"), Err(Error::NotOpen)));
    assert!(matches!(db.save("people", &mut Person::default()), Err(Error::NotOpen)));
    assert_eq!(db.count("people"), 0);
}

#[test]
fn test_close_during_concurrent_saves() {
    let db = db();
    save_all(&db, "people", &["seed"]);

    std::thread::scope(|scope| {
        for t in 0..8 {
            let db = &db;
            scope.spawn(move || loop {
                let mut p = Person::named(&format!("worker {t}"));
                match db.save("people", &mut p) {
                    Ok(()) => assert!(!p.id.is_empty()),
                    Err(Error::NotOpen) => break,
                    Err(err) => panic!("unexpected save error: {err}"),
                }
            });
        }
        std::thread::sleep(Duration::from_millis(20));
        db.close().unwrap();
    });

    assert!(matches!(db.find::<Person>("people", "1"), Err(Error::NotOpen)));
    db.close().unwrap();
}

// === Files ===

#[test]
fn test_reopen_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("shelf.redb");

    {
        let db = Db::open(&file, Options::default()).unwrap();
        save_all(&db, "people", &["John Doe"]);
        db.close().unwrap();
    }

    let db = Db::open(&file, Options::default()).unwrap();
    let p: Person = db.find("people", "1").unwrap().unwrap();
    assert_eq!(p.name, "John Doe");

    let mut q = Person::named("Jane Doe");
    db.save("people", &mut q).unwrap();
    assert_eq!(q.id, "2");
}

#[test]
fn test_open_times_out_while_locked() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("shelf.redb");

    let _held = Db::open(&file, Options::default()).unwrap();
    let err = Db::open(&file, Options::default().timeout(Some(Duration::from_millis(100))))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Store {
            source: shelf_bucket_store::Error::Timeout,
            ..
        }
    ));
}

#[test]
fn test_list_items_keeps_raw_keys() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("shelf.redb");

    {
        let store = shelf_bucket_store::Store::open(&file, &Default::default()).unwrap();
        store
            .update(|tx| {
                let bucket = tx.create_bucket_if_not_exists(b"raw")?;
                bucket.put(&[0xff], b"first")?;
                bucket.put(&[0xfe], b"second")?;
                bucket.put(b"plain", b"third")?;
                Ok::<_, shelf_bucket_store::Error>(())
            })
            .unwrap();
    }

    let db = Db::open(&file, Options::default()).unwrap();
    let items = db.list_items("raw").unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[&[0xfe_u8][..]], &b"second"[..]);
    assert_eq!(items[&[0xff_u8][..]], &b"first"[..]);
    assert_eq!(items[&b"plain"[..]], &b"third"[..]);
}

// === Validation ===

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Account {
    id: String,
    email: String,
    #[serde(skip)]
    validator: Validator,
}

impl Record for Account {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Account {
    fn validate(&mut self) -> bool {
        self.validator.reset();
        self.validator.validate_presence("email", &self.email);
        self.validator.validate_format("email", &self.email, r"^[^@\s]+@[^@\s]+$");
        self.validator.is_valid()
    }
}

#[test]
fn test_validated_record() {
    let db = db();

    let mut bad = Account::default();
    assert!(!bad.validate());
    assert!(bad.validator.errors().contains_key("email"));

    let mut good = Account {
        email: "ada@example.com".into(),
        ..Default::default()
    };
    assert!(good.validate());
    db.save("accounts", &mut good).unwrap();

    let raw = db.get("accounts", &good.id).unwrap().unwrap();
    assert!(!String::from_utf8_lossy(&raw).contains("validator"));

    let stored: Account = db.find("accounts", &good.id).unwrap().unwrap();
    assert!(stored.validator.is_valid());
}
