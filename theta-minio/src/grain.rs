use std::{borrow::Cow, fmt::Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a grain with a canonical string form.
///
/// The key string is part of the object name, so two distinct identities of the
/// same grain type must never share a key string.
pub trait GrainIdentity {
    fn key_string(&self) -> Cow<'_, str>;
}

/// Composite identity made of a primary key and an optional extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrainKey<K> {
    pub primary: K,
    pub extension: Option<String>,
}

/// Caller owned view of a grain's persisted state.
///
/// `etag` is the string form of the stored record version, `None` until the
/// state has been read from or written to the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrainState<T> {
    pub state: T,
    pub etag: Option<String>,
}

/// The unit persisted for every grain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrainStateRecord<T> {
    pub version: u64,
    pub state: T,
}

/// A grain type whose state is stored through a grain storage provider.
///
/// Usually derived with `#[derive(PersistentGrain)]`.
pub trait PersistentGrain {
    /// Type tag used as the first half of the storage key.
    const GRAIN_TYPE: &'static str;

    type State: Serialize + for<'de> Deserialize<'de> + Send + Sync;
}

/// Object name holding the state of `grain_id` of type `grain_type`.
pub fn blob_name(grain_type: &str, grain_id: &(impl GrainIdentity + ?Sized)) -> String {
    format!("{grain_type}-{}", grain_id.key_string())
}

// Implementations

impl<T> GrainState<T> {
    pub fn new(state: T) -> Self {
        Self { state, etag: None }
    }

    /// Whether the state has a version in the store as far as this handle knows.
    pub fn record_exists(&self) -> bool {
        self.etag.as_deref().is_some_and(|e| !e.is_empty())
    }
}

impl<K> GrainKey<K> {
    pub fn new(primary: K) -> Self {
        Self {
            primary,
            extension: None,
        }
    }

    pub fn with_extension(primary: K, extension: impl Into<String>) -> Self {
        Self {
            primary,
            extension: Some(extension.into()),
        }
    }
}

impl GrainIdentity for str {
    fn key_string(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl GrainIdentity for String {
    fn key_string(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl GrainIdentity for Uuid {
    fn key_string(&self) -> Cow<'_, str> {
        Cow::Owned(self.as_hyphenated().to_string())
    }
}

impl<T: GrainIdentity + ?Sized> GrainIdentity for &T {
    fn key_string(&self) -> Cow<'_, str> {
        (**self).key_string()
    }
}

macro_rules! impl_integer_identity {
    ($($t:ty),*) => {
        $(
            impl GrainIdentity for $t {
                fn key_string(&self) -> Cow<'_, str> {
                    Cow::Owned(self.to_string())
                }
            }
        )*
    };
}

impl_integer_identity!(u32, u64, u128, i32, i64, i128);

/// `{primary}` or `{primary}+{extension}`.
///
/// `%` and `+` in the primary are percent encoded so the first `+` always
/// separates the extension. Integer and UUID primaries are never affected.
impl<K: Display> GrainIdentity for GrainKey<K> {
    fn key_string(&self) -> Cow<'_, str> {
        let primary = escape_primary(&self.primary.to_string());

        match &self.extension {
            Some(ext) => Cow::Owned(format!("{primary}+{ext}")),
            None => Cow::Owned(primary),
        }
    }
}

fn escape_primary(primary: &str) -> String {
    if !primary.contains(['%', '+']) {
        return primary.to_string();
    }

    primary.replace('%', "%25").replace('+', "%2B")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::uuid;

    #[test]
    fn test_blob_name_concatenates_type_and_key() {
        assert_eq!(blob_name("UserGrain", "user-42"), "UserGrain-user-42");
        assert_eq!(blob_name("Counter", &7_u64), "Counter-7");
    }

    #[test]
    fn test_uuid_key_is_hyphenated() {
        let id = uuid!("847d1a75-bf42-4690-b947-c3f206fda4cf");
        assert_eq!(
            blob_name("Counter", &id),
            "Counter-847d1a75-bf42-4690-b947-c3f206fda4cf"
        );
    }

    #[test]
    fn test_grain_key_extension() {
        let plain = GrainKey::new(42_u64);
        let extended = GrainKey::with_extension(42_u64, "eu-west");

        assert_eq!(plain.key_string(), "42");
        assert_eq!(extended.key_string(), "42+eu-west");
        assert_ne!(blob_name("Shard", &plain), blob_name("Shard", &extended));
    }

    #[test]
    fn test_grain_key_separator_in_primary() {
        let joined = GrainKey::new("a+b".to_string());
        let split = GrainKey::with_extension("a".to_string(), "b");

        assert_eq!(joined.key_string(), "a%2Bb");
        assert_eq!(split.key_string(), "a+b");

        let encoded = GrainKey::new("a%2Bb".to_string());
        assert_eq!(encoded.key_string(), "a%252Bb");
        assert_ne!(encoded.key_string(), joined.key_string());

        assert_eq!(
            GrainKey::with_extension(-7_i64, "x+y").key_string(),
            "-7+x+y"
        );
    }

    #[test]
    fn test_record_exists_tracks_etag() {
        let mut state = GrainState::new(0_i32);
        assert!(!state.record_exists());

        state.etag = Some(String::new());
        assert!(!state.record_exists());

        state.etag = Some("3".to_string());
        assert!(state.record_exists());
    }

    #[test]
    fn test_record_json_layout() {
        let record = GrainStateRecord {
            version: 0,
            state: serde_json::json!({ "balance": 100 }),
        };

        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"version":0,"state":{"balance":100}}"#
        );
    }
}
