//! Wire messages for the two-message handshake

use std::fmt;

use crypto::{HybridKeyPair, PeerPqKey};
use serde::{Deserialize, Serialize};

/// Classical public key length on the wire
pub const X25519_PUBLIC_KEY_LEN: usize = 32;

/// Which side of the handshake a party plays
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Sends ClientHello, decapsulates
    Initiator,
    /// Answers with ServerHello, encapsulates
    Responder,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Initiator => "initiator",
            Role::Responder => "responder",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First message: initiator identity keys
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientHello {
    /// Free-form client identifier
    pub id: String,

    /// X25519 identity public key
    #[serde(rename = "x25519_pub", with = "hex_key")]
    pub classical_public: [u8; X25519_PUBLIC_KEY_LEN],

    /// Post-quantum encapsulation key, omitted for classical-only clients
    #[serde(
        rename = "pq_pub",
        default,
        skip_serializing_if = "Option::is_none",
        with = "hex_opt"
    )]
    pub pq_public: Option<Vec<u8>>,

    /// KEM the `pq_pub` key belongs to
    #[serde(rename = "pq_alg", default, skip_serializing_if = "Option::is_none")]
    pub pq_algorithm: Option<String>,
}

impl ClientHello {
    /// Build a hello advertising `keypair`, optionally withholding its PQ half.
    pub fn from_keypair(id: impl Into<String>, keypair: &HybridKeyPair, offer_pq: bool) -> Self {
        let (pq_public, pq_algorithm) = match (offer_pq, keypair.pq_public(), keypair.pq_algorithm())
        {
            (true, Some(public), Some(algorithm)) => {
                (Some(public.to_vec()), Some(algorithm.to_string()))
            }
            _ => (None, None),
        };

        Self {
            id: id.into(),
            classical_public: *keypair.classical_public(),
            pq_public,
            pq_algorithm,
        }
    }

    pub fn offers_pq(&self) -> bool {
        self.pq_public.as_ref().is_some_and(|key| !key.is_empty())
    }

    /// The offered PQ key, falling back to `default_scheme` when the hello
    /// does not name its KEM.
    pub fn peer_pq_key<'a>(&'a self, default_scheme: &'a str) -> Option<PeerPqKey<'a>> {
        let public_key = self.pq_public.as_deref().filter(|key| !key.is_empty())?;
        let algorithm = self
            .pq_algorithm
            .as_deref()
            .filter(|alg| !alg.is_empty())
            .unwrap_or(default_scheme);
        Some(PeerPqKey {
            algorithm,
            public_key,
        })
    }
}

/// Second message: responder ephemeral key and optional KEM ciphertext
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerHello {
    #[serde(rename = "x25519_ephemeral_pub", with = "hex_key")]
    pub classical_ephemeral_public: [u8; X25519_PUBLIC_KEY_LEN],

    #[serde(
        rename = "pq_ciphertext",
        default,
        skip_serializing_if = "Option::is_none",
        with = "hex_opt"
    )]
    pub pq_ciphertext: Option<Vec<u8>>,
}

impl ServerHello {
    pub fn has_ciphertext(&self) -> bool {
        self.pq_ciphertext.as_ref().is_some_and(|ct| !ct.is_empty())
    }
}

mod hex_key {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::X25519_PUBLIC_KEY_LEN;

    pub fn serialize<S: Serializer>(
        key: &[u8; X25519_PUBLIC_KEY_LEN],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(key))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; X25519_PUBLIC_KEY_LEN], D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let mut key = [0u8; X25519_PUBLIC_KEY_LEN];
        hex::decode_to_slice(&encoded, &mut key).map_err(D::Error::custom)?;
        Ok(key)
    }
}

mod hex_opt {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded.as_deref() {
            None | Some("") => Ok(None),
            Some(hex_str) => hex::decode(hex_str).map(Some).map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::ml_kem::ML_KEM_512;

    #[test]
    fn client_hello_uses_wire_key_names() {
        let hello = ClientHello {
            id: "client-1".into(),
            classical_public: [0xab; 32],
            pq_public: Some(vec![1, 2, 3]),
            pq_algorithm: Some("ML-KEM-768".into()),
        };
        let value = serde_json::to_value(&hello).unwrap();
        assert_eq!(value["id"], "client-1");
        assert_eq!(value["x25519_pub"], hex::encode([0xab; 32]));
        assert_eq!(value["pq_pub"], "010203");
        assert_eq!(value["pq_alg"], "ML-KEM-768");
    }

    #[test]
    fn absent_pq_fields_are_omitted() {
        let hello = ServerHello {
            classical_ephemeral_public: [1; 32],
            pq_ciphertext: None,
        };
        let json = serde_json::to_string(&hello).unwrap();
        assert!(!json.contains("pq_ciphertext"));
    }

    #[test]
    fn empty_optional_field_decodes_as_absent() {
        let json = format!(
            r#"{{"id":"c","x25519_pub":"{}","pq_pub":""}}"#,
            hex::encode([5u8; 32])
        );
        let hello: ClientHello = serde_json::from_str(&json).unwrap();
        assert!(hello.pq_public.is_none());
        assert!(!hello.offers_pq());
    }

    #[test]
    fn short_classical_key_is_rejected() {
        let json = r#"{"x25519_ephemeral_pub":"abcd"}"#;
        assert!(serde_json::from_str::<ServerHello>(json).is_err());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let json = format!(
            r#"{{"x25519_ephemeral_pub":"{}","extra":42}}"#,
            hex::encode([9u8; 32])
        );
        let hello: ServerHello = serde_json::from_str(&json).unwrap();
        assert!(!hello.has_ciphertext());
    }

    #[test]
    fn hello_from_keypair_respects_offer_flag() {
        let keypair = HybridKeyPair::generate(ML_KEM_512).unwrap();

        let offered = ClientHello::from_keypair("c", &keypair, true);
        assert_eq!(offered.pq_algorithm.as_deref(), Some(ML_KEM_512));
        assert_eq!(offered.pq_public.as_deref(), keypair.pq_public());

        let withheld = ClientHello::from_keypair("c", &keypair, false);
        assert!(!withheld.offers_pq());
        assert!(withheld.pq_algorithm.is_none());
    }

    #[test]
    fn missing_algorithm_falls_back_to_default() {
        let hello = ClientHello {
            id: "c".into(),
            classical_public: [0; 32],
            pq_public: Some(vec![7; 4]),
            pq_algorithm: None,
        };
        let key = hello.peer_pq_key("ML-KEM-1024").unwrap();
        assert_eq!(key.algorithm, "ML-KEM-1024");
    }
}
