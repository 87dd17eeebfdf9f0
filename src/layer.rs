use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use http::{Request, Response};
use tower_cookies::CookieManager;
use tower_layer::Layer;
use tower_service::Service;

use crate::{
    backend::{RequestContext, TempDataBackend},
    filter::{PersistenceFilter, SaveContext},
    response::{RequestItems, ResponseStart, ResultKind},
    session::SessionBackend,
    store::TempData,
};

/// Inserts [`TempData`], [`ResponseStart`] and [`RequestItems`] into request extensions and
/// saves the temp data exactly once per request through the configured backend.
#[derive(Debug)]
pub struct TempDataLayer<B: TempDataBackend> {
    backend: Arc<B>,
}

impl<B: TempDataBackend> Clone for TempDataLayer<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
        }
    }
}

impl<B: TempDataBackend> TempDataLayer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }
}

#[cfg(feature = "private")]
impl TempDataLayer<crate::CookieBackend<crate::PrivateProtector>> {
    #[must_use]
    pub fn private(key: crate::Key) -> Self {
        Self::new(crate::CookieBackend::private(key))
    }
}

#[cfg(feature = "signed")]
impl TempDataLayer<crate::CookieBackend<crate::SignedProtector>> {
    #[must_use]
    pub fn signed(key: crate::Key) -> Self {
        Self::new(crate::CookieBackend::signed(key))
    }
}

#[cfg(feature = "dangerous-plaintext")]
impl TempDataLayer<crate::CookieBackend<crate::DangerousPlaintext>> {
    #[must_use]
    pub fn dangerous_plaintext() -> Self {
        Self::new(crate::CookieBackend::dangerous_plaintext())
    }
}

impl TempDataLayer<SessionBackend> {
    /// Requires a `tower_sessions` session layer wrapping this one.
    #[must_use]
    pub fn session() -> Self {
        Self::new(SessionBackend::new())
    }
}

#[derive(Debug)]
pub struct TempDataManager<S, B: TempDataBackend> {
    inner: S,
    backend: Arc<B>,
}

impl<S: Clone, B: TempDataBackend> Clone for TempDataManager<S, B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            backend: self.backend.clone(),
        }
    }
}

impl<S, B: TempDataBackend> Layer<S> for TempDataLayer<B> {
    type Service = CookieManager<TempDataManager<S, B>>;

    fn layer(&self, inner: S) -> Self::Service {
        CookieManager::new(TempDataManager {
            inner,
            backend: self.backend.clone(),
        })
    }
}

impl<ReqBody, ResBody, S, B> Service<Request<ReqBody>> for TempDataManager<S, B>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send,
    B: TempDataBackend,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let backend: Arc<dyn TempDataBackend> = self.backend.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let ctx = RequestContext::from_extensions(req.extensions());
            let save_cx = SaveContext {
                temp_data: TempData::new(backend, ctx),
                response: ResponseStart::new(),
                items: RequestItems::new(),
            };
            req.extensions_mut().insert(save_cx.temp_data.clone());
            req.extensions_mut().insert(save_cx.response.clone());
            req.extensions_mut().insert(save_cx.items.clone());

            PersistenceFilter::arm(&save_cx);

            let res = inner.call(req).await?;
            let kind = ResultKind::of(&res);

            if let Err(err) = PersistenceFilter::on_result_executed(&save_cx, kind).await {
                tracing::error!(err = %err, "temp data save failed");
                let mut res = Response::default();
                *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                return Ok(res);
            }

            // Headers go out after this. The save is already claimed, so the hook only checks
            // the marker.
            if let Err(err) = save_cx.response.start(kind).await {
                tracing::error!(err = %err, "temp data save on response start failed");
            }

            Ok(res)
        })
    }
}
