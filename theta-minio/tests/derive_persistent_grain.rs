#![cfg(feature = "macros")]

mod common;

use serde::{Deserialize, Serialize};
use theta_minio::prelude::*;
use uuid::Uuid;

use common::initialized;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, PersistentGrain)]
struct Counter {
    value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Profile {
    display_name: String,
    followers: u32,
}

#[derive(PersistentGrain)]
#[grain_type("UserGrain")]
#[grain_state(Profile)]
struct UserGrain;

#[derive(PersistentGrain)]
#[grain_state(Vec<T>)]
struct Inbox<T>(Vec<T>)
where
    T: Serialize + for<'de> Deserialize<'de> + Send + Sync;

#[test]
fn test_grain_type_defaults_to_type_name() {
    assert_eq!(Counter::GRAIN_TYPE, "Counter");
    assert_eq!(<Inbox<String> as PersistentGrain>::GRAIN_TYPE, "Inbox");
}

#[test]
fn test_grain_type_attribute_overrides_name() {
    assert_eq!(UserGrain::GRAIN_TYPE, "UserGrain");
}

#[tokio::test]
async fn test_typed_round_trip_uses_grain_type() {
    let storage = initialized("grainstate").await;

    let mut state = GrainState::new(Profile {
        display_name: "Ada".to_string(),
        followers: 12,
    });
    storage.write::<UserGrain>("user-42", &mut state).await.unwrap();
    assert_eq!(state.etag.as_deref(), Some("0"));

    assert!(storage.storage().object("grainstate", "UserGrain-user-42").is_some());

    let mut read = GrainState::<Profile>::default();
    storage.read::<UserGrain>("user-42", &mut read).await.unwrap();
    assert_eq!(read, state);
}

#[tokio::test]
async fn test_state_defaults_to_self() {
    let storage = initialized("grainstate").await;
    let id = Uuid::new_v4();

    let mut state = GrainState::new(Counter { value: 1 });
    storage.write::<Counter>(&id, &mut state).await.unwrap();
    state.state.value += 1;
    storage.write::<Counter>(&id, &mut state).await.unwrap();

    let mut read = GrainState::new(Counter::default());
    storage.read::<Counter>(&id, &mut read).await.unwrap();
    assert_eq!(read.state, Counter { value: 2 });
    assert_eq!(read.etag.as_deref(), Some("1"));

    storage.clear::<Counter>(&id, &mut read).await.unwrap();
    assert_eq!(read.etag, None);
    assert_eq!(storage.storage().len("grainstate"), 0);
}

#[tokio::test]
async fn test_generic_grain() {
    let storage = initialized("grainstate").await;

    let mut state = GrainState::new(vec!["hello".to_string(), "world".to_string()]);
    storage
        .write::<Inbox<String>>(&7_u64, &mut state)
        .await
        .unwrap();

    let mut read = GrainState::new(Vec::<String>::new());
    storage
        .read::<Inbox<String>>(&7_u64, &mut read)
        .await
        .unwrap();
    assert_eq!(read.state, vec!["hello", "world"]);
    assert!(storage.storage().object("grainstate", "Inbox-7").is_some());
}
