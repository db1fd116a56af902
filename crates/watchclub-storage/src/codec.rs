//! Blob encoding for the durable backend.
//!
//! Layout: one format-version byte followed by the serde_json body. A reader
//! only ever needs the format it was built with to decode what it wrote;
//! fields added later carry `#[serde(default)]` so older blobs still decode.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Result, StorageError};

pub const CODEC_VERSION: u8 = 1;

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = vec![CODEC_VERSION];
    serde_json::to_writer(&mut out, value).map_err(|e| StorageError::Codec(e.to_string()))?;
    Ok(out)
}

pub fn decode<T: DeserializeOwned>(blob: &[u8]) -> Result<T> {
    match blob.split_first() {
        Some((&CODEC_VERSION, body)) => {
            serde_json::from_slice(body).map_err(|e| StorageError::Codec(e.to_string()))
        }
        Some((version, _)) => Err(StorageError::Codec(format!(
            "unknown blob format version {version}"
        ))),
        None => Err(StorageError::Codec("empty blob".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchclub_core::types::Pick;

    #[test]
    fn blob_starts_with_version_byte() {
        let blob = encode(&vec![1u32, 2, 3]).unwrap();
        assert_eq!(blob[0], CODEC_VERSION);
        assert_eq!(&blob[1..], b"[1,2,3]");
    }

    #[test]
    fn unknown_version_rejected() {
        let err = decode::<Vec<u32>>(&[9, b'[', b']']).unwrap_err();
        assert!(matches!(err, StorageError::Codec(_)));
    }

    #[test]
    fn empty_blob_rejected() {
        assert!(decode::<Vec<u32>>(&[]).is_err());
    }

    #[test]
    fn older_pick_without_optional_fields_decodes() {
        let mut blob = vec![CODEC_VERSION];
        blob.extend_from_slice(
            br#"{"id":"p1","club_id":"c1","user_id":"u1","title":"Alien","created_at":"2024-01-01T00:00:00Z"}"#,
        );
        let pick: Pick = decode(&blob).unwrap();
        assert_eq!(pick.title, "Alien");
        assert_eq!(pick.year, None);
        assert_eq!(pick.link, None);
    }
}
