//! Field-level encryption and log redaction.
//!
//! Key management lives outside this crate. Callers hand in a
//! [`FieldEncryptor`] and the helpers here apply it to the attributes an
//! entity marked `#[encrypted]`. Encrypted attributes are stored as `B`.

use crate::error::{KvError, KvResult};
use crate::traits::metadata::{AttributeKind, EntityMetadata};
use crate::value::{AttributeMap, AttributeValue};

/// Placeholder written over sensitive attributes in log output.
pub const REDACTED: &str = "***";

pub trait FieldEncryptor {
    fn encrypt(&self, attribute: &str, plaintext: &[u8]) -> Result<Vec<u8>, String>;

    fn decrypt(&self, attribute: &str, ciphertext: &[u8]) -> Result<Vec<u8>, String>;
}

/// Encrypt every `#[encrypted]` attribute present in `item` in place.
pub fn encrypt_item(
    item: &mut AttributeMap,
    metadata: &EntityMetadata,
    encryptor: &dyn FieldEncryptor,
) -> KvResult<()> {
    for attribute in metadata.encrypted_attributes() {
        let Some(value) = item.get_mut(attribute) else {
            continue;
        };
        let plaintext: &[u8] = match value {
            AttributeValue::S(s) => s.as_bytes(),
            AttributeValue::B(b) => b.as_slice(),
            other => {
                return Err(KvError::Encryption {
                    attribute: attribute.to_string(),
                    message: format!("cannot encrypt a {} attribute", other.tag()),
                });
            }
        };
        let ciphertext =
            encryptor
                .encrypt(attribute, plaintext)
                .map_err(|message| KvError::Encryption {
                    attribute: attribute.to_string(),
                    message,
                })?;
        *value = AttributeValue::B(ciphertext);
    }
    Ok(())
}

/// Reverse [`encrypt_item`], restoring each attribute to its declared kind.
pub fn decrypt_item(
    item: &mut AttributeMap,
    metadata: &EntityMetadata,
    encryptor: &dyn FieldEncryptor,
) -> KvResult<()> {
    for property in metadata.properties.iter().filter(|p| p.encrypted) {
        let attribute = property.attribute;
        let Some(value) = item.get_mut(attribute) else {
            continue;
        };
        let decryption_error = |message: String| KvError::Decryption {
            attribute: attribute.to_string(),
            message,
        };
        let AttributeValue::B(ciphertext) = value else {
            return Err(decryption_error(format!(
                "expected a B attribute, found {}",
                value.tag()
            )));
        };
        let plaintext = encryptor
            .decrypt(attribute, ciphertext)
            .map_err(decryption_error)?;
        *value = match property.kind {
            AttributeKind::String => AttributeValue::S(
                String::from_utf8(plaintext).map_err(|e| decryption_error(e.to_string()))?,
            ),
            _ => AttributeValue::B(plaintext),
        };
    }
    Ok(())
}

/// Copy of `item` with every `#[sensitive]` attribute replaced by [`REDACTED`].
pub fn redact(item: &AttributeMap, metadata: &EntityMetadata) -> AttributeMap {
    let mut redacted = item.clone();
    for attribute in metadata.sensitive_attributes() {
        if let Some(value) = redacted.get_mut(attribute) {
            *value = AttributeValue::S(REDACTED.to_string());
        }
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::metadata::{PropertyMetadata, QueryOperator};
    use assert_matches::assert_matches;

    struct Xor(u8);

    impl FieldEncryptor for Xor {
        fn encrypt(&self, _: &str, plaintext: &[u8]) -> Result<Vec<u8>, String> {
            Ok(plaintext.iter().map(|b| b ^ self.0).collect())
        }

        fn decrypt(&self, attribute: &str, ciphertext: &[u8]) -> Result<Vec<u8>, String> {
            self.encrypt(attribute, ciphertext)
        }
    }

    static PROPS: [PropertyMetadata; 2] = [
        PropertyMetadata {
            name: "card",
            attribute: "card",
            kind: AttributeKind::String,
            nullable: false,
            key_role: None,
            key_format: None,
            operations: QueryOperator::PRESENCE,
            indexes: &[],
            sensitive: true,
            encrypted: true,
        },
        PropertyMetadata {
            name: "note",
            attribute: "note",
            kind: AttributeKind::String,
            nullable: true,
            key_role: None,
            key_format: None,
            operations: QueryOperator::STRING,
            indexes: &[],
            sensitive: false,
            encrypted: false,
        },
    ];

    static META: EntityMetadata = EntityMetadata {
        type_name: "Payment",
        table: Some("payments"),
        properties: &PROPS,
        discriminator: None,
        relations: &[],
    };

    fn item() -> AttributeMap {
        AttributeMap::from([
            ("card".to_string(), AttributeValue::S("4111".into())),
            ("note".to_string(), AttributeValue::S("hi".into())),
        ])
    }

    #[test]
    fn encrypt_then_decrypt_restores_strings() {
        let mut stored = item();
        encrypt_item(&mut stored, &META, &Xor(0x5a)).unwrap();
        assert_matches!(stored.get("card"), Some(AttributeValue::B(_)));
        assert_eq!(stored.get("note"), Some(&AttributeValue::S("hi".into())));

        decrypt_item(&mut stored, &META, &Xor(0x5a)).unwrap();
        assert_eq!(stored, item());
    }

    #[test]
    fn decrypting_plaintext_fails() {
        let mut stored = item();
        assert_matches!(
            decrypt_item(&mut stored, &META, &Xor(1)),
            Err(KvError::Decryption { attribute, .. }) if attribute == "card"
        );
    }

    #[test]
    fn redaction_hides_sensitive_values() {
        let redacted = redact(&item(), &META);
        assert_eq!(redacted["card"], AttributeValue::S(REDACTED.into()));
        assert_eq!(redacted["note"], AttributeValue::S("hi".into()));
    }
}
