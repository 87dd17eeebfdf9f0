use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::{
    backend::{RequestContext, TempDataBackend},
    config::CookieTempDataConfig,
    error::{Error, Result},
    format,
    protector::Protector,
    value::TempMap,
};

/// Keeps temp data on the client in a single protected cookie.
#[derive(Debug)]
pub struct CookieBackend<P: Protector> {
    protector: P,
    config: CookieTempDataConfig,
}

impl<P: Protector> CookieBackend<P> {
    pub fn new(protector: P) -> Self {
        Self {
            protector,
            config: CookieTempDataConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: CookieTempDataConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CookieTempDataConfig {
        &self.config
    }

    /// Like [`TempDataBackend::load`] but reports why the cookie was rejected.
    pub fn try_load(&self, ctx: &RequestContext) -> Result<TempMap> {
        let Some(cookie) = ctx.cookies()?.get(&self.config.name) else {
            return Ok(TempMap::new());
        };

        let protected = URL_SAFE_NO_PAD
            .decode(cookie.value())
            .map_err(|_| Error::CorruptData)?;
        let bytes = self
            .protector
            .unprotect(&protected)
            .map_err(|_| Error::AuthenticationFailed)?;

        format::decode(&bytes)
    }

    fn write(&self, ctx: &RequestContext, values: &TempMap) -> Result<()> {
        let cookies = ctx.cookies()?;
        let path = self.config.cookie_path(ctx.path_base());

        if values.is_empty() {
            cookies.remove(self.config.removal_cookie(path));
            return Ok(());
        }

        let bytes = format::encode(values)?;
        let value = URL_SAFE_NO_PAD.encode(self.protector.protect(&bytes)?);
        if value.len() > self.config.max_cookie_bytes {
            return Err(Error::CookieTooLarge {
                size: value.len(),
                max: self.config.max_cookie_bytes,
            });
        }

        cookies.add(self.config.build_cookie(value, path));
        Ok(())
    }
}

#[cfg(feature = "private")]
impl CookieBackend<crate::PrivateProtector> {
    pub fn private(key: crate::Key) -> Self {
        Self::new(crate::PrivateProtector::new(key))
    }
}

#[cfg(feature = "signed")]
impl CookieBackend<crate::SignedProtector> {
    pub fn signed(key: crate::Key) -> Self {
        Self::new(crate::SignedProtector::new(key))
    }
}

#[cfg(feature = "dangerous-plaintext")]
impl CookieBackend<crate::DangerousPlaintext> {
    pub fn dangerous_plaintext() -> Self {
        Self::new(crate::DangerousPlaintext)
    }
}

#[async_trait]
impl<P: Protector> TempDataBackend for CookieBackend<P> {
    /// The cookie is client input: every decode failure yields an empty mapping.
    async fn load(&self, ctx: &RequestContext) -> Result<TempMap> {
        match self.try_load(ctx) {
            Ok(values) => Ok(values),
            Err(err) if err.is_data_error() => {
                tracing::warn!(err = %err, "temp data cookie rejected");
                Ok(TempMap::new())
            }
            Err(err) => Err(err),
        }
    }

    async fn save(&self, ctx: &RequestContext, values: &TempMap) -> Result<()> {
        self.write(ctx, values)
    }
}
