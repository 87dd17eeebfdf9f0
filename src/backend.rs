use std::{borrow::Cow, fmt::Debug};

use async_trait::async_trait;
use http::Extensions;
use tower_cookies::Cookies;
use tower_sessions_core::Session;

use crate::{
    error::{Error, Result},
    value::TempMap,
};

/// Storage strategy for the encoded temp data mapping.
///
/// Backends are shared across requests and must not hold per-request state.
#[async_trait]
pub trait TempDataBackend: Debug + Send + Sync + 'static {
    async fn load(&self, ctx: &RequestContext) -> Result<TempMap>;

    /// An empty mapping clears whatever the backend persisted previously.
    async fn save(&self, ctx: &RequestContext, values: &TempMap) -> Result<()>;
}

/// Mount point of the application, inserted into request extensions by the host.
///
/// The cookie backend scopes its cookie to this path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathBase(pub Cow<'static, str>);

impl PathBase {
    pub fn new<P: Into<Cow<'static, str>>>(path: P) -> Self {
        Self(path.into())
    }
}

/// The request-scoped I/O handles a backend reads from and writes to.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cookies: Option<Cookies>,
    session: Option<Session>,
    path_base: Option<Cow<'static, str>>,
}

impl RequestContext {
    pub fn from_extensions(extensions: &Extensions) -> Self {
        Self {
            cookies: extensions.get::<Cookies>().cloned(),
            session: extensions.get::<Session>().cloned(),
            path_base: extensions.get::<PathBase>().map(|base| base.0.clone()),
        }
    }

    pub fn cookies(&self) -> Result<&Cookies> {
        self.cookies
            .as_ref()
            .ok_or_else(|| Error::Backend("cookie manager is not installed".into()))
    }

    /// Fails with [`Error::SessionUnavailable`] unless a session layer ran before this request.
    pub fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(Error::SessionUnavailable)
    }

    pub fn path_base(&self) -> Option<&str> {
        self.path_base.as_deref()
    }
}
