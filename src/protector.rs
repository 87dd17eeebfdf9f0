use std::{borrow::Cow, fmt::Debug};

#[cfg(feature = "private")]
use base64::engine::general_purpose::STANDARD;
#[cfg(any(feature = "signed", feature = "private"))]
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
#[cfg(any(feature = "signed", feature = "private"))]
use tower_cookies::{Cookie, cookie::CookieJar};

#[cfg(any(feature = "signed", feature = "private"))]
use crate::error::Error;
use crate::error::Result;

/// Purpose string that scopes protected payloads to temp data cookies.
pub const DEFAULT_PURPOSE: &str = "tower-tempdata.cookie.v1";

/// Protects the encoded temp data before it leaves the server.
///
/// `unprotect` must fail with [`crate::Error::AuthenticationFailed`] when the input was
/// tampered with or produced under a different key or purpose.
pub trait Protector: Debug + Send + Sync + 'static {
    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>>;
    fn unprotect(&self, protected: &[u8]) -> Result<Vec<u8>>;
}

/// Authenticated encryption using the private cookie jar of `tower_cookies`.
///
/// The purpose is bound into the ciphertext as associated data.
#[cfg(feature = "private")]
#[derive(Debug, Clone)]
pub struct PrivateProtector {
    key: crate::Key,
    purpose: Cow<'static, str>,
}

#[cfg(feature = "private")]
impl PrivateProtector {
    pub fn new(key: crate::Key) -> Self {
        Self {
            key,
            purpose: DEFAULT_PURPOSE.into(),
        }
    }

    #[must_use]
    pub fn with_purpose<P: Into<Cow<'static, str>>>(mut self, purpose: P) -> Self {
        self.purpose = purpose.into();
        self
    }
}

#[cfg(feature = "private")]
impl Protector for PrivateProtector {
    /// Returns the raw nonce, ciphertext and tag; the jar's own base64 layer is stripped.
    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut jar = CookieJar::new();
        jar.private_mut(&self.key).add(Cookie::new(
            self.purpose.clone(),
            URL_SAFE_NO_PAD.encode(plaintext),
        ));
        let sealed = jar
            .get(&self.purpose)
            .ok_or_else(|| Error::Encode("private jar produced no sealed value".into()))?;
        STANDARD
            .decode(sealed.value())
            .map_err(|err| Error::Encode(err.to_string()))
    }

    fn unprotect(&self, protected: &[u8]) -> Result<Vec<u8>> {
        let opened = CookieJar::new()
            .private(&self.key)
            .decrypt(Cookie::new(self.purpose.clone(), STANDARD.encode(protected)))
            .ok_or(Error::AuthenticationFailed)?;
        URL_SAFE_NO_PAD
            .decode(opened.value())
            .map_err(|_| Error::AuthenticationFailed)
    }
}

/// HMAC signing using the signed cookie jar of `tower_cookies`.
///
/// Detects tampering but leaves the payload readable by the client.
#[cfg(feature = "signed")]
#[derive(Debug, Clone)]
pub struct SignedProtector {
    key: crate::Key,
    purpose: Cow<'static, str>,
}

#[cfg(feature = "signed")]
impl SignedProtector {
    pub fn new(key: crate::Key) -> Self {
        Self {
            key,
            purpose: DEFAULT_PURPOSE.into(),
        }
    }

    #[must_use]
    pub fn with_purpose<P: Into<Cow<'static, str>>>(mut self, purpose: P) -> Self {
        self.purpose = purpose.into();
        self
    }
}

#[cfg(feature = "signed")]
impl Protector for SignedProtector {
    /// Returns the jar's text form: the base64 digest followed by the payload text.
    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut jar = CookieJar::new();
        jar.signed_mut(&self.key).add(Cookie::new(
            self.purpose.clone(),
            URL_SAFE_NO_PAD.encode(plaintext),
        ));
        jar.get(&self.purpose)
            .map(|signed| signed.value().as_bytes().to_vec())
            .ok_or_else(|| Error::Encode("signed jar produced no signed value".into()))
    }

    fn unprotect(&self, protected: &[u8]) -> Result<Vec<u8>> {
        let signed = std::str::from_utf8(protected).map_err(|_| Error::AuthenticationFailed)?;
        let verified = CookieJar::new()
            .signed(&self.key)
            .verify(Cookie::new(self.purpose.clone(), signed.to_owned()))
            .ok_or(Error::AuthenticationFailed)?;
        URL_SAFE_NO_PAD
            .decode(verified.value())
            .map_err(|_| Error::AuthenticationFailed)
    }
}

/// Passes bytes through unchanged. Offers **no tamper resistance**; testing and debugging only.
#[cfg(feature = "dangerous-plaintext")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DangerousPlaintext;

#[cfg(feature = "dangerous-plaintext")]
impl Protector for DangerousPlaintext {
    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(plaintext.to_vec())
    }

    fn unprotect(&self, protected: &[u8]) -> Result<Vec<u8>> {
        Ok(protected.to_vec())
    }
}
