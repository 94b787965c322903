//! Error-message normalization.
//!
//! Turns opaque engine issues into concise log lines: known-noisy reasons are
//! suppressed outright, terse mode drops location detail, and namespace URIs
//! in the composed text are rewritten to the schema's short prefixes.

use std::path::Path;

use indexmap::IndexMap;
use log::{debug, error};

use crate::engine::{Issue, IssueDetail};
use crate::error::ToolError;

/// Reasons treated as validator noise and suppressed unconditionally.
///
/// The first is spurious and always paired with a preceding error; the
/// second fires constantly against older data-model schemas and drowns out
/// real diagnostics.
const IGNORED_REASONS: [&str; 2] = [
    "unavailable namespace ''",
    "XsdFieldSelector(path='@name | @base') field selects multiple values!",
];

/// Clark-wrapped namespace -> short prefix, e.g. `{urn:ns1}` -> `n1:`.
pub type NamespaceMap = IndexMap<String, String>;

/// Render an engine issue as a human message.
///
/// An empty return means "suppress entirely": the caller counts it as
/// ignored rather than reported.
pub fn issue_message(issue: &Issue, namespaces: &NamespaceMap, terse: bool) -> String {
    if IGNORED_REASONS.contains(&issue.reason.as_str()) {
        debug!("ignored error: {}", issue.reason);
        return String::new();
    }

    if terse {
        return issue.reason.clone();
    }

    let detail = match &issue.detail {
        IssueDetail::Element(text) | IssueDetail::Owner(text) | IssueDetail::Value(text) => {
            text.trim().to_string()
        }
        IssueDetail::Absent => String::new(),
    };

    let composed = if detail.is_empty() {
        issue.reason.clone()
    } else {
        format!("{} in {}", issue.reason, detail)
    };
    ns_fix(&composed, namespaces)
}

/// Replace the first mapped namespace URI found in `text` with its prefix.
///
/// Only one mapping is applied; if declared namespace URIs overlap as
/// substrings the outcome depends on map order.
fn ns_fix(text: &str, namespaces: &NamespaceMap) -> String {
    if text.contains('{') {
        for (ns, pfx) in namespaces {
            if text.contains(ns.as_str()) {
                return text.replace(ns.as_str(), pfx);
            }
        }
    }
    text.to_string()
}

fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Log one issue as `<basename>[:<line>]: <message>`.
///
/// Returns whether the issue counted (false means it was suppressed).
pub fn report_issue(path: &str, issue: &Issue, namespaces: &NamespaceMap, terse: bool) -> bool {
    let message = issue_message(issue, namespaces, terse);
    if message.is_empty() {
        return false;
    }
    let line = issue.line.map(|l| format!(":{}", l)).unwrap_or_default();
    error!("{}{}: {}", base_name(path), line, message);
    true
}

/// Log a file-level failure (engine exception, I/O) in the same shape.
///
/// These are not validation-engine issues, so their string form is used
/// unchanged and no suppression applies.
pub fn report_failure(path: &str, failure: &ToolError) -> bool {
    error!("{}: {}", base_name(path), failure);
    true
}
