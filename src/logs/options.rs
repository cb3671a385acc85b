//! Cross-cutting options shared by every logger a factory hands out

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use super::field::Field;

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "content";

/// Extracts fields from a caller-supplied context value
pub type CtxHandler = Arc<dyn Fn(&dyn Any) -> Vec<Field> + Send + Sync>;

/// Extracts fields from an error
pub type ErrHandler = Arc<dyn Fn(&(dyn Error + 'static)) -> Vec<Field> + Send + Sync>;

#[derive(Clone)]
pub struct Options {
    pub(crate) namespace: String,
    pub(crate) ctx_handler: Option<CtxHandler>,
    pub(crate) err_handler: Option<ErrHandler>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ctx_handler: None,
            err_handler: Some(Arc::new(|err: &(dyn Error + 'static)| vec![Field::error(err)])),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("namespace", &self.namespace)
            .field("ctx_handler", &self.ctx_handler.is_some())
            .field("err_handler", &self.err_handler.is_some())
            .finish()
    }
}

impl Options {
    /// Name of the namespace marker prepended to call-site fields
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Set the function that turns a context value into fields
    pub fn with_ctx_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&dyn Any) -> Vec<Field> + Send + Sync + 'static,
    {
        self.ctx_handler = Some(Arc::new(handler));
        self
    }

    /// Set the function that turns an error into fields
    pub fn with_err_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> Vec<Field> + Send + Sync + 'static,
    {
        self.err_handler = Some(Arc::new(handler));
        self
    }

    /// Drop the error handler so `err` derives nothing
    pub fn without_err_handler(mut self) -> Self {
        self.err_handler = None;
        self
    }

    pub(crate) fn ctx_fields(&self, ctx: &dyn Any) -> Vec<Field> {
        self.ctx_handler
            .as_ref()
            .map(|handler| handler(ctx))
            .unwrap_or_default()
    }

    pub(crate) fn err_fields(&self, err: &(dyn Error + 'static)) -> Vec<Field> {
        self.err_handler
            .as_ref()
            .map(|handler| handler(err))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RequestCtx {
        id: u64,
    }

    #[test]
    fn test_default_options() {
        let opts = Options::default();
        assert_eq!(opts.namespace(), "content");
        assert!(opts.ctx_handler.is_none());
        assert!(opts.err_handler.is_some());
    }

    #[test]
    fn test_default_err_handler_wraps_error() {
        let opts = Options::default();
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let fields = opts.err_fields(&err);
        assert_eq!(fields, vec![Field::error(&err)]);
    }

    #[test]
    fn test_ctx_handler_downcasts_context() {
        let opts = Options::default().with_ctx_handler(|ctx| {
            ctx.downcast_ref::<RequestCtx>()
                .map(|req| vec![Field::uint("request_id", req.id)])
                .unwrap_or_default()
        });

        assert_eq!(
            opts.ctx_fields(&RequestCtx { id: 7 }),
            vec![Field::uint("request_id", 7)]
        );
        assert!(opts.ctx_fields(&"not a request").is_empty());
    }

    #[test]
    fn test_no_ctx_handler_yields_nothing() {
        assert!(Options::default().ctx_fields(&1u8).is_empty());
    }

    #[test]
    fn test_without_err_handler() {
        let opts = Options::default().without_err_handler();
        let err = std::io::Error::new(std::io::ErrorKind::Other, "x");
        assert!(opts.err_fields(&err).is_empty());
    }

    #[test]
    fn test_with_namespace() {
        assert_eq!(Options::default().with_namespace("svc").namespace(), "svc");
    }
}
