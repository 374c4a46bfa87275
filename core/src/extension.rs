//! Line-stream extensions run alongside the GC parser.
//!
//! Every registered extension sees every line of a run, in order, whether or not the GC
//! parser claimed it. Selection only decides which output a front end presents.

use crate::access::AccessLogParser;
use crate::config::{AccessLogConfig, Config, ServiceLogConfig};
use crate::error::AnalysisError;
use crate::event::{AccessEvent, LegendEntry, ServiceCallEvent};
use crate::service::ServiceLogParser;
use crate::timestamp::LogContext;
use serde::Serialize;

/// A secondary log parser driven by the analyzer
pub trait LogExtension: Send {
    /// Unique registry name
    fn name(&self) -> &str;

    /// Drop all state from a previous run.
    fn reset(&mut self);

    /// Offer one line. Returns true when the extension consumed it.
    fn parse(&mut self, line: &str, ctx: &LogContext) -> bool;

    /// Post-process after the last line, using the final detected offset.
    fn finish(&mut self, ctx: &LogContext);

    /// Snapshot of the extension's results
    fn output(&self) -> ExtensionOutput;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AccessLogOutput {
    pub events: Vec<AccessEvent>,
    pub legend: Vec<LegendEntry>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceLogOutput {
    pub events: Vec<ServiceCallEvent>,
}

/// Serializable extension results
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtensionOutput {
    AccessLog(AccessLogOutput),
    ServiceLog(ServiceLogOutput),
    ServiceAccessLog {
        access: AccessLogOutput,
        service: ServiceLogOutput,
    },
}

impl ExtensionOutput {
    /// Total number of events across every stream in the output.
    pub fn event_count(&self) -> usize {
        match self {
            Self::AccessLog(out) => out.events.len(),
            Self::ServiceLog(out) => out.events.len(),
            Self::ServiceAccessLog { access, service } => access.events.len() + service.events.len(),
        }
    }

    pub fn access(&self) -> Option<&AccessLogOutput> {
        match self {
            Self::AccessLog(out) => Some(out),
            Self::ServiceAccessLog { access, .. } => Some(access),
            Self::ServiceLog(_) => None,
        }
    }

    pub fn service(&self) -> Option<&ServiceLogOutput> {
        match self {
            Self::ServiceLog(out) => Some(out),
            Self::ServiceAccessLog { service, .. } => Some(service),
            Self::AccessLog(_) => None,
        }
    }
}

impl AccessLogParser {
    fn snapshot(&self) -> AccessLogOutput {
        AccessLogOutput {
            events: self.events().to_vec(),
            legend: self.legend().to_vec(),
        }
    }
}

impl ServiceLogParser {
    fn snapshot(&self) -> ServiceLogOutput {
        ServiceLogOutput {
            events: self.events().to_vec(),
        }
    }
}

impl LogExtension for AccessLogParser {
    fn name(&self) -> &str {
        "AccessLog"
    }

    fn reset(&mut self) {
        AccessLogParser::reset(self);
    }

    fn parse(&mut self, line: &str, _ctx: &LogContext) -> bool {
        AccessLogParser::parse(self, line)
    }

    fn finish(&mut self, _ctx: &LogContext) {
        AccessLogParser::finish(self);
    }

    fn output(&self) -> ExtensionOutput {
        ExtensionOutput::AccessLog(self.snapshot())
    }
}

impl LogExtension for ServiceLogParser {
    fn name(&self) -> &str {
        "ServiceLog"
    }

    fn reset(&mut self) {
        ServiceLogParser::reset(self);
    }

    fn parse(&mut self, line: &str, ctx: &LogContext) -> bool {
        ServiceLogParser::parse(self, line, ctx)
    }

    fn finish(&mut self, ctx: &LogContext) {
        ServiceLogParser::finish(self, ctx);
    }

    fn output(&self) -> ExtensionOutput {
        ExtensionOutput::ServiceLog(self.snapshot())
    }
}

/// Access and service logs from the same file, each line offered to both parsers.
#[derive(Debug, Clone)]
pub struct ServiceAccessLog {
    access_config: AccessLogConfig,
    service_config: ServiceLogConfig,
    access: AccessLogParser,
    service: ServiceLogParser,
}

impl ServiceAccessLog {
    pub fn new(access_config: AccessLogConfig, service_config: ServiceLogConfig) -> Self {
        Self {
            access: AccessLogParser::new(access_config.clone()),
            service: ServiceLogParser::new(service_config.clone()),
            access_config,
            service_config,
        }
    }

    pub fn access(&self) -> &AccessLogParser {
        &self.access
    }

    pub fn service(&self) -> &ServiceLogParser {
        &self.service
    }
}

impl LogExtension for ServiceAccessLog {
    fn name(&self) -> &str {
        "ServiceAccessLog"
    }

    fn reset(&mut self) {
        self.access = AccessLogParser::new(self.access_config.clone());
        self.service = ServiceLogParser::new(self.service_config.clone());
    }

    fn parse(&mut self, line: &str, ctx: &LogContext) -> bool {
        let access = self.access.parse(line);
        let service = self.service.parse(line, ctx);
        access || service
    }

    fn finish(&mut self, ctx: &LogContext) {
        self.access.finish();
        self.service.finish(ctx);
    }

    fn output(&self) -> ExtensionOutput {
        ExtensionOutput::ServiceAccessLog {
            access: self.access.snapshot(),
            service: self.service.snapshot(),
        }
    }
}

/// Ordered set of extensions with unique names
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Box<dyn LogExtension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `AccessLog`, `ServiceLog` and `ServiceAccessLog`, in that order.
    pub fn with_defaults(config: &Config) -> Self {
        let mut registry = Self::new();
        let defaults: [Box<dyn LogExtension>; 3] = [
            Box::new(AccessLogParser::new(config.access_log.clone())),
            Box::new(ServiceLogParser::new(config.service_log.clone())),
            Box::new(ServiceAccessLog::new(
                config.access_log.clone(),
                config.service_log.clone(),
            )),
        ];
        for extension in defaults {
            registry
                .register(extension)
                .expect("default extension names are distinct");
        }
        registry
    }

    pub fn register(&mut self, extension: Box<dyn LogExtension>) -> Result<(), AnalysisError> {
        if self.get(extension.name()).is_some() {
            return Err(AnalysisError::DuplicateExtension {
                name: extension.name().to_string(),
            });
        }
        tracing::debug!(name = extension.name(), "registered extension");
        self.extensions.push(extension);
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.extensions.iter().map(|e| e.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn LogExtension> {
        self.extensions
            .iter()
            .find(|e| e.name() == name)
            .map(|e| e.as_ref())
    }

    /// Name of the extension presented when none is chosen: the first registered.
    pub fn default_name(&self) -> Option<&str> {
        self.extensions.first().map(|e| e.name())
    }

    /// Resolve a requested name, falling back to the default selection.
    pub fn select(&self, name: Option<&str>) -> Result<Option<&str>, AnalysisError> {
        match name {
            None => Ok(self.default_name()),
            Some(name) => match self.get(name) {
                Some(extension) => Ok(Some(extension.name())),
                None => Err(AnalysisError::UnknownExtension {
                    name: name.to_string(),
                    available: self.names().join(", "),
                }),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn LogExtension>> {
        self.extensions.iter_mut()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &dyn LogExtension> {
        self.extensions.iter().map(|e| e.as_ref())
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.names())
            .finish()
    }
}
