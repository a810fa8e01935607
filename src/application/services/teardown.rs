//! Ordered release of everything a session acquired.
//!
//! Every acquisition step pushes its compensating action immediately after
//! the resource is acknowledged. [`TeardownStack::run_all`] pops them in
//! reverse, isolating failures so one stuck resource never blocks the rest.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;

use crate::application::ports::ProgressReporter;

type TeardownFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a>>;
type TeardownAction<'a> = Box<dyn FnOnce() -> TeardownFuture<'a> + 'a>;

struct Entry<'a> {
    label: String,
    action: TeardownAction<'a>,
}

/// Outcome of [`TeardownStack::run_all`], in execution order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TeardownReport {
    /// Labels of actions that completed.
    pub released: Vec<String>,
    /// Labels of actions that failed, with the error text.
    pub failed: Vec<(String, String)>,
}

impl TeardownReport {
    /// `true` when every registered action succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// LIFO registry of release actions for resources currently owned.
///
/// The stack's contents are the resources that still need releasing.
/// Entries are consumed by `run_all`, so no action can ever run twice.
#[derive(Default)]
pub struct TeardownStack<'a> {
    entries: Vec<Entry<'a>>,
}

impl<'a> TeardownStack<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a release action for a resource that now exists.
    pub fn push<F, Fut>(&mut self, label: impl Into<String>, action: F)
    where
        F: FnOnce() -> Fut + 'a,
        Fut: Future<Output = Result<()>> + 'a,
    {
        let label = label.into();
        tracing::debug!(%label, depth = self.entries.len() + 1, "teardown registered");
        self.entries.push(Entry {
            label,
            action: Box::new(move || Box::pin(action())),
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels in registration order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    /// Run every registered action, newest first, exactly once.
    ///
    /// A failing action is logged and reported; the remaining actions still
    /// run. The stack is empty afterwards.
    pub async fn run_all(&mut self, reporter: &impl ProgressReporter) -> TeardownReport {
        let mut report = TeardownReport::default();
        while let Some(Entry { label, action }) = self.entries.pop() {
            reporter.step(&format!("{label}..."));
            match action().await {
                Ok(()) => {
                    tracing::info!(%label, "released");
                    report.released.push(label);
                }
                Err(e) => {
                    tracing::warn!(%label, error = %format!("{e:#}"), "teardown step failed");
                    reporter.warn(&format!("{label} failed: {e:#}"));
                    report.failed.push((label, format!("{e:#}")));
                }
            }
        }
        report
    }
}

impl Drop for TeardownStack<'_> {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            tracing::error!(
                leaked = ?self.labels(),
                "teardown stack dropped with unreleased resources"
            );
        }
    }
}
