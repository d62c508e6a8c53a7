//! Error types for the Verity system.
//!
//! Uses `thiserror` for ergonomic error definition. All failures across
//! registration, graph validation, and evaluation flow through one tagged
//! [`ErrorKind`], so hosts can match on the variant while still getting the
//! conventional `"<reason> [<code>]"` rendering.

use std::fmt;

use thiserror::Error as ThisError;

/// Result alias used throughout Verity.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The main error type for Verity operations.
///
/// Renders as `"<reason> [<code>]"`, e.g. `Verifier failed: isAdult [412]`.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{} [{}]", .kind, .kind.code())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a cycle error for a closed chain found during graph validation.
    ///
    /// `path` is the ancestor chain of the walk, root first, ending at the
    /// rule whose `uses` edge closed the chain.
    #[must_use]
    pub fn graph_cycle(dependency: impl Into<String>, path: Vec<String>) -> Self {
        Self::new(ErrorKind::Cycle(CyclePath {
            site: CycleSite::Graph,
            name: dependency.into(),
            path,
        }))
    }

    /// Creates a cycle error for a rule re-entered while already being verified.
    #[must_use]
    pub fn verify_cycle(rule: impl Into<String>, path: Vec<String>) -> Self {
        Self::new(ErrorKind::Cycle(CyclePath {
            site: CycleSite::Verify,
            name: rule.into(),
            path,
        }))
    }

    /// Creates a cycle error for a data key re-entered while already being fetched.
    #[must_use]
    pub fn fetch_cycle(key: impl Into<String>, path: Vec<String>) -> Self {
        Self::new(ErrorKind::Cycle(CyclePath {
            site: CycleSite::Fetch,
            name: key.into(),
            path,
        }))
    }

    /// Creates an unknown rule error.
    #[must_use]
    pub fn unknown_rule(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownRule(name.into()))
    }

    /// Creates a predicate failure error.
    #[must_use]
    pub fn predicate_failure(rule: impl Into<String>) -> Self {
        Self::new(ErrorKind::PredicateFailure(rule.into()))
    }

    /// Creates a missing data error.
    #[must_use]
    pub fn missing_data(key: impl Into<String>, verifier: Option<String>) -> Self {
        Self::new(ErrorKind::MissingData {
            key: key.into(),
            verifier,
        })
    }

    /// Creates a fetch error wrapping an external cause.
    #[must_use]
    pub fn fetch_failed(key: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fetch {
            key: key.into(),
            cause: cause.into(),
        })
    }

    /// Host-facing numeric code for this error.
    #[must_use]
    pub fn code(&self) -> u16 {
        self.kind.code()
    }

    /// Human-readable reason, without the trailing code.
    #[must_use]
    pub fn reason(&self) -> String {
        self.kind.to_string()
    }

    /// Whether this error belongs to the soft, downgradable class.
    ///
    /// `Context::verifies` converts exactly this class into `false`;
    /// everything else is re-raised unchanged.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::PredicateFailure(_) | ErrorKind::MissingData { .. }
        )
    }

    /// The ancestor path of a cycle error, if this is one.
    #[must_use]
    pub fn cycle_path(&self) -> Option<&[String]> {
        match &self.kind {
            ErrorKind::Cycle(cycle) => Some(&cycle.path),
            _ => None,
        }
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ErrorKind {
    /// A closed chain in rule dependencies or fetcher resolution.
    /// Always fatal, never downgraded to a boolean.
    #[error("{0}")]
    Cycle(CyclePath),

    /// A requested rule name is not registered.
    #[error("Verifier not found: {0}")]
    UnknownRule(String),

    /// A rule's predicate returned false.
    #[error("Verifier failed: {0}")]
    PredicateFailure(String),

    /// A data key had no set value, no fetcher-provided value, and no default.
    #[error(
        "Verifier {} requires unresolvable data: {}",
        .verifier.as_deref().unwrap_or("<none>"),
        .key
    )]
    MissingData {
        /// The unresolvable data key.
        key: String,
        /// The rule that was executing when resolution failed, if any.
        verifier: Option<String>,
    },

    /// A registered fetcher itself failed.
    #[error("Couldn't fetch data for {key}: {cause}")]
    Fetch {
        /// The data key being fetched.
        key: String,
        /// Description of the originating failure.
        cause: String,
    },
}

impl ErrorKind {
    /// Host-facing numeric code: 404 for unresolvable data, 412 for
    /// predicate and fetch failures, 500 for cycles and unknown rules.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::Cycle(_) | Self::UnknownRule(_) => 500,
            Self::PredicateFailure(_) | Self::Fetch { .. } => 412,
            Self::MissingData { .. } => 404,
        }
    }
}

/// Where a cycle was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleSite {
    /// Startup walk over the registered rule graph.
    Graph,
    /// Re-entry of a rule already on the verify path.
    Verify,
    /// Re-entry of a data key already on the fetch path.
    Fetch,
}

/// The exact ancestor chain of a detected cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePath {
    /// Which walk detected the cycle.
    pub site: CycleSite,
    /// The node that closed the chain.
    pub name: String,
    /// The ancestor chain at the moment of detection, root first.
    pub path: Vec<String>,
}

impl fmt::Display for CyclePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.path.join(" -> ");
        match self.site {
            CycleSite::Graph => {
                // The last ancestor is the rule whose edge closed the chain.
                let required_by = self.path.last().map_or("", String::as_str);
                write!(
                    f,
                    "Circular dependency \"{}\" is required by \"{required_by}\": {joined}",
                    self.name
                )
            }
            CycleSite::Verify => write!(
                f,
                "Circular dependency while verifying '{}', verify path: {joined} -> {}",
                self.name, self.name
            ),
            CycleSite::Fetch => write!(
                f,
                "Circular dependency while fetching '{}', fetch path: {joined} -> {}",
                self.name, self.name
            ),
        }
    }
}

/// Failure raised from inside a fetcher body.
///
/// Nested resolution inside a fetcher (`context.get(..)?`) produces
/// engine-structured [`Error`]s which must propagate unchanged — a cycle
/// detected three fetchers deep is still a cycle. Failures of the fetcher's
/// own external lookup are wrapped by the engine into [`ErrorKind::Fetch`]
/// with the originating key.
#[derive(Debug)]
pub enum FetchFailure {
    /// An engine error from nested resolution; propagates unchanged.
    Engine(Error),
    /// An external failure; wrapped into [`ErrorKind::Fetch`].
    External(String),
}

impl FetchFailure {
    /// Creates an external failure from any displayable cause.
    pub fn external(cause: impl fmt::Display) -> Self {
        Self::External(cause.to_string())
    }
}

impl From<Error> for FetchFailure {
    fn from(err: Error) -> Self {
        Self::Engine(err)
    }
}

// =============================================================================
// Tests
// =============================================================================
