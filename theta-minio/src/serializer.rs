//! Grain state record encoding.

use serde::{Deserialize, Serialize};

use crate::{base::JSON_CONTENT_TYPE, errors::GrainStorageError};

/// Encodes grain state records into the bytes stored in an object.
///
/// The encoding must be self describing, since records written by one build are
/// read back by later ones whose state types may have gained fields.
pub trait StateSerializer: Send + Sync + 'static {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, GrainStorageError>;

    fn deserialize<T: for<'de> Deserialize<'de>>(&self, data: &[u8])
    -> Result<T, GrainStorageError>;

    /// Content type recorded on uploaded objects.
    fn content_type(&self) -> &'static str;
}

/// `serde_json` backed serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

// Implementations

impl JsonSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent stored records, handy when objects are inspected by hand.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl StateSerializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, GrainStorageError> {
        let res = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };

        res.map_err(|e| GrainStorageError::Serialize(e.to_string()))
    }

    fn deserialize<T: for<'de> Deserialize<'de>>(
        &self,
        data: &[u8],
    ) -> Result<T, GrainStorageError> {
        serde_json::from_slice(data).map_err(|e| GrainStorageError::Deserialize(e.to_string()))
    }

    fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }
}
