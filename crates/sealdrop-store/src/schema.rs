//! Durable layout of a key pair.
//!
//! Two layouts exist. Both keep the public key under `myPublicKey`; they
//! differ in where the private key lives:
//!
//! | Schema  | Private key item   | Written? |
//! |---------|--------------------|----------|
//! | Legacy  | `user_private_key` | never    |
//! | Current | `myPrivateKey`     | yes      |

use zeroize::Zeroizing;

use sealdrop_core::{codec, KeyPair};

use crate::error::Result;

/// Item holding the public key in both schemas.
pub const PUBLIC_KEY_ITEM: &str = "myPublicKey";

/// Item holding the private key in the current schema.
pub const PRIVATE_KEY_ITEM: &str = "myPrivateKey";

/// Item holding the private key in the legacy schema.
pub const LEGACY_PRIVATE_KEY_ITEM: &str = "user_private_key";

/// Key record layouts, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeySchema {
    Legacy,
    Current,
}

impl KeySchema {
    /// Numeric version, for logs.
    pub const fn version(self) -> u32 {
        match self {
            KeySchema::Legacy => 1,
            KeySchema::Current => 2,
        }
    }

    /// Where this schema keeps the private key.
    pub const fn private_key_item(self) -> &'static str {
        match self {
            KeySchema::Legacy => LEGACY_PRIVATE_KEY_ITEM,
            KeySchema::Current => PRIVATE_KEY_ITEM,
        }
    }
}

/// A key pair in its stored, textual form.
#[derive(Clone)]
pub struct StoredKeyRecord {
    pub schema: KeySchema,
    pub public_key_pem: String,
    pub private_key_pem: Zeroizing<String>,
}

impl StoredKeyRecord {
    /// Encode a pair for writing. Always uses the current schema.
    pub fn from_pair(pair: &KeyPair) -> Result<Self> {
        let public_key_pem = codec::encode(pair.public_key())?.to_pem().to_string();
        let private_key_pem = codec::encode(pair.private_key())?.to_pem();
        Ok(Self {
            schema: KeySchema::Current,
            public_key_pem,
            private_key_pem,
        })
    }

    /// Decode both halves and check they match.
    pub fn to_pair(&self) -> Result<KeyPair> {
        let public_key = codec::decode(&self.public_key_pem)?;
        let private_key = codec::decode(&self.private_key_pem)?;
        Ok(KeyPair::from_parts(public_key, private_key)?)
    }

    /// Item/value pairs to write, in schema order.
    pub fn items(&self) -> [(&'static str, &str); 2] {
        [
            (PUBLIC_KEY_ITEM, self.public_key_pem.as_str()),
            (self.schema.private_key_item(), self.private_key_pem.as_str()),
        ]
    }
}

impl std::fmt::Debug for StoredKeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredKeyRecord")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}
