use std::fmt;
use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDomain {
    UrlParse,
    Fit,
    Persist,
    Config,
    Score,
}

impl EventDomain {
    pub fn as_str(self) -> &'static str {
        match self {
            EventDomain::UrlParse => "url.parse",
            EventDomain::Fit => "pipeline.fit",
            EventDomain::Persist => "pipeline.persist",
            EventDomain::Config => "runtime.config",
            EventDomain::Score => "ml.score",
        }
    }
}

impl fmt::Display for EventDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured log record emitted by the pipeline.
///
/// `detail` carries the offending input (a URL, a path, a config key) and
/// `count` a size where one applies (rows, vocabulary terms).
#[derive(Debug, Clone, Copy)]
pub struct PipelineEvent<'a> {
    pub level: Level,
    pub domain: EventDomain,
    pub kind: &'a str,
    pub detail: Option<&'a str>,
    pub count: Option<usize>,
    pub message: &'a str,
}

impl<'a> PipelineEvent<'a> {
    pub fn new(level: Level, domain: EventDomain, kind: &'a str, message: &'a str) -> Self {
        Self {
            level,
            domain,
            kind,
            detail: None,
            count: None,
            message,
        }
    }

    pub fn detail(mut self, detail: &'a str) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn emit(self) {
        match self.level {
            Level::TRACE => tracing::event!(
                Level::TRACE,
                domain = %self.domain,
                kind = self.kind,
                detail = self.detail,
                count = self.count,
                "{message}",
                message = self.message
            ),
            Level::DEBUG => tracing::event!(
                Level::DEBUG,
                domain = %self.domain,
                kind = self.kind,
                detail = self.detail,
                count = self.count,
                "{message}",
                message = self.message
            ),
            Level::INFO => tracing::event!(
                Level::INFO,
                domain = %self.domain,
                kind = self.kind,
                detail = self.detail,
                count = self.count,
                "{message}",
                message = self.message
            ),
            Level::WARN => tracing::event!(
                Level::WARN,
                domain = %self.domain,
                kind = self.kind,
                detail = self.detail,
                count = self.count,
                "{message}",
                message = self.message
            ),
            Level::ERROR => tracing::event!(
                Level::ERROR,
                domain = %self.domain,
                kind = self.kind,
                detail = self.detail,
                count = self.count,
                "{message}",
                message = self.message
            ),
        }
    }
}
