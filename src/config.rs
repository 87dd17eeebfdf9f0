use std::borrow::Cow;

use tower_cookies::Cookie;

use crate::SameSite;

/// Default name of the cookie that carries the protected temp data payload.
pub const DEFAULT_COOKIE_NAME: &str = ".tempdata";

#[derive(Debug, Clone)]
pub struct CookieTempDataConfig {
    pub(crate) name: Cow<'static, str>,
    pub(crate) path: Option<Cow<'static, str>>,
    pub(crate) http_only: bool,
    pub(crate) secure: bool,
    pub(crate) same_site: Option<SameSite>,
    pub(crate) domain: Option<Cow<'static, str>>,
    pub(crate) max_cookie_bytes: usize,
}

impl Default for CookieTempDataConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.into(),
            path: None,
            http_only: true,
            secure: true,
            same_site: None,
            domain: None,
            max_cookie_bytes: 4096,
        }
    }
}

impl CookieTempDataConfig {
    #[must_use]
    pub fn with_name<N: Into<Cow<'static, str>>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Pins the cookie path. Without it the request's [`crate::PathBase`] is used, or `/`.
    #[must_use]
    pub fn with_path<P: Into<Cow<'static, str>>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    #[must_use]
    pub fn with_domain<D: Into<Cow<'static, str>>>(mut self, domain: D) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn without_domain(mut self) -> Self {
        self.domain = None;
        self
    }

    #[must_use]
    pub fn with_max_cookie_bytes(mut self, max_cookie_bytes: usize) -> Self {
        self.max_cookie_bytes = max_cookie_bytes;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn cookie_path(&self, path_base: Option<&str>) -> Cow<'static, str> {
        match (&self.path, path_base) {
            (Some(path), _) => path.clone(),
            (None, Some(base)) if !base.is_empty() => Cow::Owned(base.to_owned()),
            _ => Cow::Borrowed("/"),
        }
    }

    /// Session-scoped: no `Expires` or `Max-Age` is ever set.
    pub(crate) fn build_cookie(&self, value: String, path: Cow<'static, str>) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((self.name.clone(), value))
            .http_only(self.http_only)
            .secure(self.secure)
            .path(path);

        if let Some(same_site) = self.same_site {
            cookie_builder = cookie_builder.same_site(same_site);
        }

        if let Some(domain) = self.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        cookie_builder.build()
    }

    pub(crate) fn removal_cookie(&self, path: Cow<'static, str>) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.clone(), "");
        cookie.set_path(path);
        if let Some(domain) = self.domain.clone() {
            cookie.set_domain(domain);
        }
        cookie
    }
}
