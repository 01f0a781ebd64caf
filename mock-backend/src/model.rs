//! Stub classifier
//!
//! Rule-based stand-in for the real model: keyword patterns on the URL and on
//! the submitted text. Deterministic so tests can rely on it.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

pub const MODEL_VERSION: &str = "1.0.0";

static URL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"ip\s*address",
        r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}",
        r"password",
        r"login",
        r"account",
        r"update",
        r"verify",
        r"paypal",
        r"bank",
        r"secure",
        r"security",
    ])
});

static CONTENT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"verify\s*your\s*account",
        r"update\s*your\s*information",
        r"suspicious\s*activity",
        r"click\s*here",
        r"urgent\s*action",
        r"your\s*account\s*will\s*be\s*suspended",
        r"password\s*expired",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| RegexBuilder::new(p).case_insensitive(true).build().ok())
        .collect()
}

/// Verdict produced by the stub model
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub prediction: &'static str,
    pub confidence: f64,
    pub features_analyzed: Vec<String>,
}

/// Classify a URL and/or text body
pub fn classify(url: Option<&str>, content: Option<&str>) -> Verdict {
    let mut verdict = Verdict {
        prediction: "legitimate",
        confidence: 0.5,
        features_analyzed: Vec::new(),
    };

    if let Some(url) = url.filter(|u| !u.is_empty()) {
        verdict.features_analyzed.push("url_analysis".to_string());
        if URL_PATTERNS.iter().any(|re| re.is_match(url)) {
            verdict.prediction = "phishing";
            verdict.confidence = 0.75;
        }
    }

    if let Some(content) = content.filter(|c| !c.is_empty()) {
        verdict.features_analyzed.push("content_analysis".to_string());
        if CONTENT_PATTERNS.iter().any(|re| re.is_match(content)) {
            verdict.prediction = "phishing";
            verdict.confidence = 0.85;
        }
    }

    verdict
}
