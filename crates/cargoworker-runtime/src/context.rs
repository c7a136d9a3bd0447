use cargoworker_types::{CancelToken, Event, PlanContext, Stats};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Span, debug, info_span, warn};
use uuid::Uuid;

use crate::{Error, EventSink, Result, Store};

#[derive(Debug, Clone, Copy, Default)]
pub struct Limits {
    pub concurrency: usize,
    pub mem_mb: usize,
}

type Closer = Box<dyn FnOnce() -> Result<()> + Send>;

/// Everything one run needs, passed explicitly down the call chain.
///
/// Built once per run; [`RunContext::close`] runs the registered closers in
/// reverse order at the end.
pub struct RunContext {
    pub run_id: Uuid,
    pub input_path: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub tool_version: String,
    pub ir_schema: String,
    pub limits: Limits,
    /// Parent span for every log line emitted on behalf of this run
    pub span: Span,
    pub store: Option<Arc<dyn Store>>,
    pub events: Option<EventSink>,
    pub stats: Stats,
    pub cancel: CancelToken,
    pub plan_context: Option<PlanContext>,
    closers: Vec<(String, Closer)>,
}

impl RunContext {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            input_path: None,
            out_dir: PathBuf::new(),
            tool_version: String::new(),
            ir_schema: String::new(),
            limits: Limits::default(),
            span: info_span!("run", run_id = %run_id),
            store: None,
            events: None,
            stats: Stats::new().with_run_id(&run_id.to_string()),
            cancel: CancelToken::new(),
            plan_context: None,
            closers: Vec::new(),
        }
    }

    pub fn with_input_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.stats = self.stats.with_input_path(&path.to_string_lossy());
        self.input_path = Some(path);
        self
    }

    pub fn with_out_dir(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.stats = self.stats.with_out_dir(&path.to_string_lossy());
        self.out_dir = path;
        self
    }

    pub fn with_versions(mut self, tool_version: &str, ir_schema: &str) -> Self {
        self.tool_version = tool_version.to_string();
        self.ir_schema = ir_schema.to_string();
        self.stats = self
            .stats
            .with_tool_version(tool_version)
            .with_ir_schema(ir_schema);
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_events(mut self, sink: EventSink) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn input_path(&self) -> Option<&Path> {
        self.input_path.as_deref()
    }

    /// Register cleanup to run at [`RunContext::close`]; last registered runs first
    pub fn add_closer<F>(&mut self, name: impl Into<String>, closer: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.closers.push((name.into(), Box::new(closer)));
    }

    /// Best-effort publish. A run without a bus, or with a closed one, keeps going.
    pub fn publish(&self, event: Event) {
        if let Some(sink) = &self.events
            && let Err(err) = sink.publish(event)
        {
            debug!(parent: &self.span, error = %err, "Dropping run event");
        }
    }

    /// Run every closer in reverse registration order. Failures are logged and
    /// returned together; a failing closer does not stop the others.
    pub fn close(mut self) -> Result<()> {
        let mut failures = Vec::new();

        while let Some((name, closer)) = self.closers.pop() {
            if let Err(err) = closer() {
                warn!(parent: &self.span, closer = %name, error = %err, "Close error");
                failures.push(err);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Teardown(failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closers_run_in_reverse_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = RunContext::new(Uuid::new_v4());

        for name in ["logger", "store", "bus"] {
            let order = Arc::clone(&order);
            ctx.add_closer(name, move || {
                order.lock().unwrap().push(name);
                Ok(())
            });
        }

        ctx.close().unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["bus", "store", "logger"]);
    }

    #[test]
    fn test_failing_closers_are_joined() {
        let ran = Arc::new(Mutex::new(0));
        let mut ctx = RunContext::new(Uuid::new_v4());

        ctx.add_closer("first", || Err(Error::Config("first failed".to_string())));
        {
            let ran = Arc::clone(&ran);
            ctx.add_closer("middle", move || {
                *ran.lock().unwrap() += 1;
                Ok(())
            });
        }
        ctx.add_closer("last", || Err(Error::BusClosed));

        let err = ctx.close().unwrap_err();
        match err {
            Error::Teardown(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected teardown error, got {other}"),
        }
        assert_eq!(*ran.lock().unwrap(), 1);
    }

    #[test]
    fn test_builder_feeds_run_stats() {
        let run_id = Uuid::new_v4();
        let ctx = RunContext::new(run_id)
            .with_input_path("/repo")
            .with_out_dir("/out/run")
            .with_versions("v1", "v1");

        assert_eq!(ctx.input_path(), Some(Path::new("/repo")));
        assert_eq!(ctx.stats.run.run_id, run_id.to_string());
        assert_eq!(ctx.stats.run.input_path, "/repo");
        assert_eq!(ctx.stats.run.out_dir, "/out/run");
        assert_eq!(ctx.stats.run.ir_schema, "v1");
        assert!(ctx.store.is_none());
    }

    #[test]
    fn test_publish_without_bus_is_noop() {
        let ctx = RunContext::new(Uuid::nil());
        ctx.publish(Event::new(
            Uuid::nil(),
            cargoworker_types::EventScope::Run,
            cargoworker_types::EventState::Start,
            "plan",
        ));
    }
}
