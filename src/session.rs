use std::borrow::Cow;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value;

use crate::{
    backend::{RequestContext, TempDataBackend},
    error::{Error, Result},
    format,
    value::TempMap,
};

/// Session slot that holds the encoded mapping.
pub const DEFAULT_SESSION_KEY: &str = "__tempdata";

/// Keeps temp data on the server in one slot of the request's `tower_sessions` session.
///
/// Requires a session layer outside the temp data layer; without it every operation fails
/// with [`Error::SessionUnavailable`].
#[derive(Debug, Clone)]
pub struct SessionBackend {
    key: Cow<'static, str>,
}

impl Default for SessionBackend {
    fn default() -> Self {
        Self {
            key: DEFAULT_SESSION_KEY.into(),
        }
    }
}

impl SessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_key<K: Into<Cow<'static, str>>>(mut self, key: K) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn decode_slot(value: Value) -> Result<TempMap> {
        let Value::String(encoded) = value else {
            return Err(Error::CorruptData);
        };
        let bytes = STANDARD.decode(encoded).map_err(|_| Error::CorruptData)?;
        format::decode(&bytes)
    }
}

#[async_trait]
impl TempDataBackend for SessionBackend {
    async fn load(&self, ctx: &RequestContext) -> Result<TempMap> {
        let session = ctx.session()?;
        let Some(value) = session.get_value(&self.key).await? else {
            return Ok(TempMap::new());
        };

        match Self::decode_slot(value) {
            Ok(values) => Ok(values),
            Err(err) => {
                tracing::warn!(err = %err, key = %self.key, "temp data session slot rejected");
                Ok(TempMap::new())
            }
        }
    }

    async fn save(&self, ctx: &RequestContext, values: &TempMap) -> Result<()> {
        let session = ctx.session()?;

        if values.is_empty() {
            session.remove_value(&self.key).await?;
            return Ok(());
        }

        let bytes = format::encode(values)?;
        session
            .insert_value(&self.key, Value::String(STANDARD.encode(bytes)))
            .await?;
        Ok(())
    }
}
