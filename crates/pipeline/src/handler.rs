//! Invocation Handler - one pipeline run per source batch
//!
//! The handler is built once from [`Config`]: every source becomes a route
//! (name, source-name pattern, [`Pipeline`]) and the transport factory is
//! resolved through the transport registry. Every event carries `source`
//! and `route` metadata for the configured wrapper. Each call to
//! [`Handler::process`] is one invocation with its own queue, dispatch
//! service and counters.
//!
//! # Failure handling
//!
//! - The record source is always closed, whatever happened before
//! - On failure the [`ExceptionHook`] runs, the error is logged, then it is
//!   returned (`fail_on_exception = true`, default) or swallowed into the
//!   report
//! - A dispatch rejection is replaced by the aggregated flush error, which
//!   names the send that actually failed
//!
//! # Example
//!
//! ```ignore
//! let config = Config::from_file("sluice.toml")?;
//! let handler = Handler::from_config(&config)?;
//!
//! let source = ReaderSource::new(std::io::stdin().lock());
//! let report = handler.process("app", Box::new(source)).await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;
use sluice_config::{Config, HandlerConfig, SourceConfig};
use sluice_protocol::{RecordSource, now_millis};
use sluice_transform::{
    ChainBuilder, CodecRegistry, OperationRegistry, PartitionSpec, Serializer, Wrapper,
    default_codecs, default_registry,
};
use sluice_transport::{TransportFactory, TransportRegistry, default_transports};

use crate::stages::{DeserializerProcessor, PreFilter, SerializerProcessor};
use crate::{
    DispatchError, DispatchService, DispatchStats, IngestionQueue, Pipeline, PipelineError,
    PipelineMetrics, PipelineStats, SourceHandle,
};

#[cfg(test)]
#[path = "handler_test.rs"]
mod tests;

/// Error type returned by an [`ExceptionHook`]
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Cleanup run when an invocation fails, before the error is re-raised or
/// swallowed
pub trait ExceptionHook: Send + Sync {
    /// Errors returned here are logged and otherwise ignored
    fn on_exception(&self, source_name: &str, error: &PipelineError) -> Result<(), HookError>;
}

/// Hook that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl ExceptionHook for NoopHook {
    fn on_exception(&self, _source_name: &str, _error: &PipelineError) -> Result<(), HookError> {
        Ok(())
    }
}

/// Outcome of one invocation
#[derive(Debug, Clone)]
pub struct InvocationReport {
    /// Source name the invocation was started with
    pub source: String,

    /// Configured source that matched, if any
    pub route: Option<String>,

    pub pipeline: PipelineStats,
    pub dispatch: DispatchStats,

    /// Milliseconds between the oldest dispatched arrival time and the end
    /// of the invocation
    pub arrival_lag_ms: Option<i64>,

    /// Same, for occurrence time
    pub occurrence_lag_ms: Option<i64>,

    pub runtime: Duration,

    /// Set when the invocation failed and the failure was swallowed
    pub error: Option<String>,
}

impl InvocationReport {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    fn log(&self) {
        tracing::info!(
            source = %self.source,
            route = self.route.as_deref().unwrap_or("-"),
            events_seen = self.pipeline.events_seen,
            filtered = self.pipeline.filtered,
            deserialize_errors = self.pipeline.deserialize_errors,
            serialize_errors = self.pipeline.serialize_errors,
            dispatched = self.pipeline.dispatched,
            sends_succeeded = self.dispatch.sends_succeeded,
            sends_failed = self.dispatch.sends_failed,
            arrival_lag_ms = self.arrival_lag_ms,
            occurrence_lag_ms = self.occurrence_lag_ms,
            runtime_ms = self.runtime.as_millis() as u64,
            success = self.is_success(),
            "invocation finished"
        );
    }
}

struct Route {
    name: String,
    pattern: Regex,
    pipeline: Pipeline,
}

/// Runs invocations against the configured sources and transport
pub struct Handler {
    routes: Vec<Route>,
    factory: Arc<dyn TransportFactory>,
    settings: HandlerConfig,
    hook: Arc<dyn ExceptionHook>,
}

impl Handler {
    /// Build with the built-in operations, codecs and transports
    ///
    /// # Errors
    /// - `PipelineError::Config` if the configuration is invalid
    /// - `PipelineError::Build` if a component cannot be created
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        HandlerBuilder::new(config).build()
    }

    /// Start building with custom registries, transport or hook
    pub fn builder(config: &Config) -> HandlerBuilder<'_> {
        HandlerBuilder::new(config)
    }

    /// Configured source names, in match order
    pub fn route_names(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.name.as_str()).collect()
    }

    /// Pipeline of the first route matching `source_name`
    pub fn pipeline(&self, source_name: &str) -> Option<&Pipeline> {
        self.route(source_name).map(|r| &r.pipeline)
    }

    pub fn transport(&self) -> &Arc<dyn TransportFactory> {
        &self.factory
    }

    fn route(&self, source_name: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|r| r.pattern.is_match(source_name))
    }

    /// Run one invocation over `source`
    ///
    /// # Errors
    /// Any invocation failure when `fail_on_exception` is set; otherwise
    /// failures are reported in [`InvocationReport::error`]
    pub async fn process(
        &self,
        source_name: &str,
        source: Box<dyn RecordSource>,
    ) -> Result<InvocationReport, PipelineError> {
        let started = Instant::now();
        let source = SourceHandle::new(source);
        let metrics = Arc::new(PipelineMetrics::new());
        let dispatch = DispatchService::new(Arc::clone(&self.factory));

        let route = self.route(source_name);
        let result = match route {
            Some(route) => {
                self.invoke(source_name, route, &source, &dispatch, &metrics)
                    .await
            }
            None => Err(PipelineError::NoMatchingSource(source_name.to_string())),
        };

        if let Err(e) = source.close() {
            tracing::warn!(source = source_name, error = %e, "failed to close record source");
        }

        let pipeline = metrics.snapshot();
        let now = now_millis();
        let report = InvocationReport {
            source: source_name.to_string(),
            route: route.map(|r| r.name.clone()),
            pipeline,
            dispatch: dispatch.stats(),
            arrival_lag_ms: pipeline.oldest_arrival_ms.map(|ms| now - ms),
            occurrence_lag_ms: pipeline.oldest_occurrence_ms.map(|ms| now - ms),
            runtime: started.elapsed(),
            error: result.as_ref().err().map(ToString::to_string),
        };
        report.log();

        let Err(error) = result else {
            return Ok(report);
        };

        if let Err(e) = self.hook.on_exception(source_name, &error) {
            tracing::error!(source = source_name, error = %e, "exception hook failed");
        }
        tracing::error!(source = source_name, error = %error, "invocation failed");

        if self.settings.fail_on_exception {
            Err(error)
        } else {
            Ok(report)
        }
    }

    async fn invoke(
        &self,
        source_name: &str,
        route: &Route,
        source: &SourceHandle,
        dispatch: &DispatchService,
        metrics: &Arc<PipelineMetrics>,
    ) -> Result<(), PipelineError> {
        let metadata = vec![
            ("source".to_string(), source_name.to_string()),
            ("route".to_string(), route.name.clone()),
        ];
        let queue =
            IngestionQueue::start_with_metadata(source.clone(), self.settings.queue_size, metadata);
        let run = route
            .pipeline
            .run_with_metrics(queue, dispatch, Arc::clone(metrics))
            .await;

        match run {
            Ok(()) => {
                let flushed = dispatch.flush().await;
                dispatch.release();
                flushed.map_err(PipelineError::from)
            }
            Err(rejected @ PipelineError::Dispatch(DispatchError::Rejected(_))) => {
                let flushed = dispatch.flush().await;
                dispatch.release();
                Err(flushed.err().map_or(rejected, PipelineError::from))
            }
            Err(e) => {
                dispatch.shutdown().await;
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("routes", &self.route_names())
            .field("transport", &self.factory.name())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Builder for [`Handler`]
///
/// Anything not supplied falls back to the built-in registries.
pub struct HandlerBuilder<'a> {
    config: &'a Config,
    operations: Option<OperationRegistry>,
    codecs: Option<CodecRegistry>,
    transports: Option<TransportRegistry>,
    factory: Option<Arc<dyn TransportFactory>>,
    hook: Arc<dyn ExceptionHook>,
}

impl<'a> HandlerBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            operations: None,
            codecs: None,
            transports: None,
            factory: None,
            hook: Arc::new(NoopHook),
        }
    }

    /// Use a custom operation registry
    #[must_use]
    pub fn with_operations(mut self, registry: OperationRegistry) -> Self {
        self.operations = Some(registry);
        self
    }

    /// Use a custom codec registry
    #[must_use]
    pub fn with_codecs(mut self, registry: CodecRegistry) -> Self {
        self.codecs = Some(registry);
        self
    }

    /// Use a custom transport registry
    #[must_use]
    pub fn with_transports(mut self, registry: TransportRegistry) -> Self {
        self.transports = Some(registry);
        self
    }

    /// Use this transport factory; `[transport]` type and options are ignored
    #[must_use]
    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Run `hook` when an invocation fails
    #[must_use]
    pub fn with_exception_hook(mut self, hook: Arc<dyn ExceptionHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Validate the config and build every route and the transport
    pub fn build(self) -> Result<Handler, PipelineError> {
        let config = self.config;
        config.validate()?;

        let operations = self.operations.unwrap_or_else(default_registry);
        let codecs = self.codecs.unwrap_or_else(default_codecs);
        let chains = ChainBuilder::new(&operations, config.handler.fork_buffer_size);

        let serializer: Arc<dyn Serializer> = Arc::from(
            codecs
                .serializer(&config.serializer)
                .map_err(|e| PipelineError::build("serializer", e))?,
        );
        let wrapper: Arc<dyn Wrapper> = Arc::from(
            codecs
                .wrapper(&config.wrapper)
                .map_err(|e| PipelineError::build("wrapper", e))?,
        );

        let routes = config
            .sources
            .iter()
            .map(|source| build_route(source, &chains, &codecs, &wrapper, &serializer))
            .collect::<Result<Vec<_>, _>>()?;

        let factory = match self.factory {
            Some(factory) => factory,
            None => self
                .transports
                .unwrap_or_else(default_transports)
                .create(&config.transport)
                .map_err(|e| {
                    PipelineError::build(
                        format!("transport '{}'", config.transport.transport_type),
                        e,
                    )
                })?,
        };

        tracing::debug!(
            sources = routes.len(),
            transport = factory.name(),
            threads = factory.max_threads(),
            "handler built"
        );

        Ok(Handler {
            routes,
            factory,
            settings: config.handler.clone(),
            hook: self.hook,
        })
    }
}

fn build_route(
    source: &SourceConfig,
    chains: &ChainBuilder<'_>,
    codecs: &CodecRegistry,
    wrapper: &Arc<dyn Wrapper>,
    serializer: &Arc<dyn Serializer>,
) -> Result<Route, PipelineError> {
    let component = format!("source '{}'", source.name);

    let pattern = Regex::new(&format!("^(?:{})$", source.source_regex))
        .map_err(|e| PipelineError::build(&component, e))?;
    let prefilter = PreFilter::from_config(source).map_err(|e| PipelineError::build(&component, e))?;
    let deserializer = codecs
        .deserializer(&source.deserializer)
        .map_err(|e| PipelineError::build(&component, e))?;
    let chain = chains
        .build(&source.operations)
        .map_err(|e| PipelineError::build(&component, e))?;
    let partitions = source.partitions.iter().map(PartitionSpec::from).collect();

    Ok(Route {
        name: source.name.clone(),
        pattern,
        pipeline: Pipeline::new(
            prefilter,
            DeserializerProcessor::new(Arc::from(deserializer), partitions),
            chain,
            SerializerProcessor::new(Arc::clone(serializer)).with_wrapper(Arc::clone(wrapper)),
        ),
    })
}
