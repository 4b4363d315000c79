use std::fmt::{Debug, Write};
use std::{borrow::Cow, panic::Location};

/// poolprobe failed to set itself up before starting the inventory.
#[derive(Debug, Eq, thiserror::Error, PartialEq)]
pub enum InitializationError {
    #[error("Failed to load configuration from '{path}'")]
    LoadConfiguration { path: String },
    #[error("Failed to parse configuration")]
    ParseConfiguration,
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
    #[error("Failed to build worker pool")]
    WorkerPool,
}

/// User provided input was invalid.
#[derive(Debug, Eq, thiserror::Error, PartialEq)]
pub enum InvalidInputError {
    #[error("Invalid pool '{pool}', available pools: {}", format_pools(.available))]
    UnknownPool {
        pool: String,
        available: Vec<String>,
    },
}

fn format_pools(pools: &[String]) -> String {
    if pools.is_empty() {
        "(none)".into()
    } else {
        pools.join(", ")
    }
}

#[derive(Debug, Eq, thiserror::Error, PartialEq)]
pub enum InternalError {
    #[error("Failed to serialize inventory")]
    SerializeInventory,
    #[error("Failed to write report")]
    WriteReport,
}

/// Each variant of `ErrorKind` corresponds to a different category of error.
#[derive(Debug, Eq, thiserror::Error, PartialEq)]
pub enum ErrorKind {
    /// poolprobe failed to initialize.
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    /// poolprobe was given a pool selector that does not exist.
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    /// A bug was encountered.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Debug)]
struct ProbeErrorInner {
    kind: ErrorKind,
    location: &'static Location<'static>,
    source: Option<anyhow::Error>,
    context: Vec<(Cow<'static, str>, &'static Location<'static>)>,
}

pub struct ProbeError(Box<ProbeErrorInner>);

impl ProbeError {
    #[track_caller]
    pub fn new(kind: impl Into<ErrorKind>) -> Self {
        ProbeError(Box::new(ProbeErrorInner {
            kind: kind.into(),
            location: Location::caller(),
            source: None,
            context: Vec::new(),
        }))
    }

    #[track_caller]
    fn with_source(kind: impl Into<ErrorKind>, source: anyhow::Error) -> Self {
        ProbeError(Box::new(ProbeErrorInner {
            kind: kind.into(),
            location: Location::caller(),
            source: Some(source),
            context: Vec::new(),
        }))
    }

    /// Returns a reference to the inner ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.0.kind
    }

    /// Returns the list of valid pools when this error was caused by an
    /// unknown pool name.
    pub fn available_pools(&self) -> Option<&[String]> {
        match &self.0.kind {
            ErrorKind::InvalidInput(InvalidInputError::UnknownPool { available, .. }) => {
                Some(available)
            }
            _ => None,
        }
    }
}

pub trait ReportError<T, K> {
    /// Convert this error into a structured ProbeError.
    fn structured(self, kind: K) -> Result<T, ProbeError>;
}

impl<T, K> ReportError<T, K> for Option<T>
where
    K: Into<ErrorKind>,
{
    #[track_caller]
    fn structured(self, kind: K) -> Result<T, ProbeError> {
        match self {
            Some(t) => Ok(t),
            None => Err(ProbeError::new(kind)),
        }
    }
}

impl<T, E, K> ReportError<T, K> for Result<T, E>
where
    E: Into<anyhow::Error>,
    K: Into<ErrorKind>,
{
    #[track_caller]
    fn structured(self, kind: K) -> Result<T, ProbeError> {
        match self {
            Ok(o) => Ok(o),
            Err(e) => Err(ProbeError::with_source(kind, e.into())),
        }
    }
}

pub trait ProbeResultExt<T> {
    /// Attach a context message to the error.
    fn message(self, context: impl Into<Cow<'static, str>>) -> Result<T, ProbeError>;
}

impl<T> ProbeResultExt<T> for Result<T, ProbeError> {
    #[track_caller]
    fn message(mut self, context: impl Into<Cow<'static, str>>) -> Result<T, ProbeError> {
        if let Err(ref mut e) = self {
            e.0.context.push((context.into(), Location::caller()));
        }
        self
    }
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.kind)
    }
}

impl Debug for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.0.kind,
            self.0.location.file(),
            self.0.location.line()
        )?;

        if !self.0.context.is_empty() {
            writeln!(f, "\n\nContext:")?;
            for (i, (context, location)) in self.0.context.iter().enumerate() {
                write!(f, "{: >5}: {context}", i)?;
                writeln!(f, " at {}:{}", location.file(), location.line())?;
            }
        }

        if let Some(ref source) = self.0.source {
            writeln!(f, "\n\nCaused by:")?;
            let mut index = 0;
            let mut source: Option<&dyn std::error::Error> = Some(source.as_ref());
            while let Some(e) = source {
                for (i, line) in e.to_string().split('\n').enumerate() {
                    if i == 0 {
                        write!(f, "{: >5}: ", index)?;
                    } else {
                        f.write_str("\n       ")?;
                    }
                    f.write_str(line)?;
                }
                f.write_char('\n')?;
                source = e.source();
                index += 1;
            }
        }
        Ok(())
    }
}
