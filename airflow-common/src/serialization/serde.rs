cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
    } else {
        extern crate alloc;
        use alloc::string::String;
    }
}

pub type JsonValue = serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct JsonSerdeError(#[from] serde_json::Error);

/// Types which can be turned into a JSON document, e.g. XCom values or trigger kwargs.
pub trait JsonSerialize {
    fn serialize(&self) -> Result<String, JsonSerdeError>;
}

impl<T> JsonSerialize for T
where
    T: serde::Serialize,
{
    fn serialize(&self) -> Result<String, JsonSerdeError> {
        Ok(serde_json::to_string(self)?)
    }
}

pub trait JsonDeserialize {
    fn deserialize(s: &str) -> Result<Self, JsonSerdeError>
    where
        Self: Sized;
}

impl<T> JsonDeserialize for T
where
    T: serde::de::DeserializeOwned,
{
    fn deserialize(s: &str) -> Result<Self, JsonSerdeError> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Serialize an object into a representation consisting only of valid JSON types.
pub fn serialize<T: JsonSerialize>(value: &T) -> Result<JsonValue, JsonSerdeError> {
    let serialized = value.serialize()?;
    Ok(serde_json::from_str(&serialized)?)
}

/// Deserialize an object from a representation consisting only of valid JSON types.
pub fn deserialize<T: serde::de::DeserializeOwned>(value: &JsonValue) -> Result<T, JsonSerdeError> {
    Ok(<T as serde::Deserialize>::deserialize(value)?)
}
