//! JSON encoding for stored entities.
//!
//! Records are stored as compact JSON objects. Exports are a bare JSON array
//! of the same objects, with no envelope or schema version.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// A record the store can persist under its own identifier.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human-readable kind, used in errors and logs
    const KIND: &'static str;

    /// Caller-assigned identifier; the store never generates one
    fn id(&self) -> &str;
}

pub fn encode<T: Entity>(entity: &T) -> Result<String> {
    Ok(serde_json::to_string(entity)?)
}

pub fn decode<T: Entity>(key: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|err| Error::DecodeFailure {
        key: key.to_string(),
        reason: err.to_string(),
    })
}

/// Decode a stored record, logging and discarding it if it is unreadable.
pub fn decode_or_skip<T: Entity>(collection: &str, key: &str, text: &str) -> Option<T> {
    match decode(key, text) {
        Ok(entity) => Some(entity),
        Err(err) => {
            tracing::warn!(
                collection,
                key,
                kind = T::KIND,
                error = %err,
                "skipping undecodable record"
            );
            None
        }
    }
}

pub fn encode_array<T: Entity>(entities: &[T]) -> Result<String> {
    Ok(serde_json::to_string_pretty(entities)?)
}

/// Parse an export payload. Any problem rejects the whole payload.
pub fn decode_array<T: Entity>(text: &str) -> Result<Vec<T>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(text)
        .map_err(|err| Error::ParseFailure(format!("expected a JSON array: {err}")))?;

    let mut entities = Vec::with_capacity(values.len());
    for (idx, value) in values.into_iter().enumerate() {
        let entity: T = serde_json::from_value(value)
            .map_err(|err| Error::ParseFailure(format!("element {idx}: {err}")))?;
        if entity.id().trim().is_empty() {
            return Err(Error::ParseFailure(format!(
                "element {idx}: {} has an empty id",
                T::KIND
            )));
        }
        entities.push(entity);
    }
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        text: String,
    }

    impl Entity for Note {
        const KIND: &'static str = "note";

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str) -> Note {
        Note {
            id: id.to_string(),
            text: format!("text for {id}"),
        }
    }

    #[test]
    fn decode_failure_names_the_key() {
        let err = decode::<Note>("n1", "{not json").unwrap_err();
        assert!(matches!(err, Error::DecodeFailure { ref key, .. } if key == "n1"));
        assert!(decode_or_skip::<Note>("notes", "n1", "{not json").is_none());
        assert_eq!(
            decode_or_skip::<Note>("notes", "n1", &encode(&note("n1")).unwrap()),
            Some(note("n1"))
        );
    }

    #[test]
    fn decode_array_accepts_export() {
        let exported = encode_array(&[note("a"), note("b")]).unwrap();
        let parsed: Vec<Note> = decode_array(&exported).unwrap();
        assert_eq!(parsed, vec![note("a"), note("b")]);
        assert!(decode_array::<Note>("[]").unwrap().is_empty());
    }

    #[test]
    fn decode_array_rejects_non_array() {
        for payload in ["", "{}", "\"tasks\"", "[{\"id\":\"a\",\"text\":\"x\"}"] {
            let err = decode_array::<Note>(payload).unwrap_err();
            assert!(matches!(err, Error::ParseFailure(_)), "payload {payload:?}");
        }
    }

    #[test]
    fn decode_array_rejects_any_bad_element() {
        let missing_field = r#"[{"id":"a","text":"x"},{"id":"b"}]"#;
        let err = decode_array::<Note>(missing_field).unwrap_err();
        assert!(err.to_string().contains("element 1"));

        let blank_id = r#"[{"id":"  ","text":"x"}]"#;
        assert!(matches!(
            decode_array::<Note>(blank_id),
            Err(Error::ParseFailure(_))
        ));
    }
}
