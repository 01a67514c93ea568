//! Citation extraction and syntactic validation.
//!
//! A citation is either a URL or a textual attribution ("according to X",
//! "Source: X", a regulation reference). Attributions cannot be checked
//! offline and count as valid. URLs are valid when well formed; the runtime
//! can replace this with a reachability check.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::scoring::CitationReport;
use crate::types::{Severity, Violation, ViolationDetail, ViolationKind};

lazy_static! {
    static ref URL_PATTERN: Regex = Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).unwrap();

    static ref ACCORDING_TO: Regex = Regex::new(r"(?i)according to\s+([^.,;:!?\n]+)").unwrap();

    static ref SOURCE_LINE: Regex = Regex::new(r"(?i)source:\s*([^\n]+)").unwrap();

    static ref REGULATION: Regex =
        Regex::new(r"(?i)\b(SEC|CFPB|EU|GDPR|Article\s+\d+)[\s\w-]*\d{4}-?\d*").unwrap();
}

/// URLs in order of appearance, trailing punctuation removed.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| {
            m.as_str()
                .trim_end_matches(['.', ',', ';', ':', '!', '?', ')'])
                .to_string()
        })
        .collect()
}

/// Textual attributions: "according to", "Source:" lines that are not bare
/// URLs, and regulation references.
pub fn extract_attributions(text: &str) -> Vec<String> {
    let mut found = Vec::new();

    for caps in ACCORDING_TO.captures_iter(text) {
        if let Some(source) = caps.get(1) {
            found.push(source.as_str().trim().to_string());
        }
    }

    for caps in SOURCE_LINE.captures_iter(text) {
        if let Some(source) = caps.get(1) {
            let source = source.as_str().trim();
            if !URL_PATTERN.is_match(source) {
                found.push(source.to_string());
            }
        }
    }

    for m in REGULATION.find_iter(text) {
        found.push(m.as_str().trim().to_string());
    }

    found
}

/// An http(s) URL with a dotted host whose labels are non-empty and whose
/// top-level label is alphabetic, or an IP address.
pub fn is_well_formed_url(candidate: &str) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    match url.host() {
        Some(url::Host::Domain(domain)) => {
            let labels: Vec<&str> = domain.split('.').collect();
            labels.len() >= 2
                && labels.iter().all(|l| !l.is_empty())
                && labels
                    .last()
                    .map(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()))
                    .unwrap_or(false)
        }
        Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_)) => true,
        None => false,
    }
}

/// Build a report from per-URL verdicts and attributions.
pub fn build_report(
    url_checks: impl IntoIterator<Item = (String, bool)>,
    attributions: Vec<String>,
) -> CitationReport {
    let mut total = attributions.len();
    let mut valid = attributions.len();
    let mut invalid_urls = Vec::new();

    for (url, ok) in url_checks {
        total += 1;
        if ok {
            valid += 1;
        } else {
            invalid_urls.push(url);
        }
    }

    CitationReport {
        total,
        valid,
        invalid_urls,
        attributions,
    }
}

/// Extract citations and validate URLs syntactically.
pub fn check_citations(text: &str) -> CitationReport {
    let checks = extract_urls(text).into_iter().map(|url| {
        let ok = is_well_formed_url(&url);
        (url, ok)
    });
    build_report(checks, extract_attributions(text))
}

/// A high-severity citation violation when any URL failed validation.
pub fn invalid_citation_violation(report: &CitationReport) -> Option<Violation> {
    if report.invalid_urls.is_empty() {
        return None;
    }
    Some(
        Violation::new(
            ViolationKind::Citation,
            Severity::High,
            format!(
                "Found {} invalid/fake citations",
                report.invalid_urls.len()
            ),
        )
        .with_detail(ViolationDetail {
            matched: report.invalid_urls.clone(),
            ..Default::default()
        }),
    )
}
