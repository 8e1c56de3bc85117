//! Deterministic, regex-based entity extraction.
//!
//! Every pattern here is a direct port of the reference entity extractor:
//! file paths, URLs, ports, HTTP status codes, exceptions, function/class
//! names, packages, shell commands, and environment variables, each carrying
//! a fixed importance weight used by the EITF and SetCover scorers.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Entity type names paired with their importance weight.
pub const ENTITY_TYPES: &[(&str, f64)] = &[
    ("file_path", 1.0),
    ("error", 1.0),
    ("exception", 0.9),
    ("url", 0.8),
    ("port", 0.8),
    ("command", 0.7),
    ("package", 0.7),
    ("function", 0.5),
    ("class_name", 0.4),
    ("env_var", 0.4),
    ("http_status", 0.6),
];

/// Default weight applied to an entity type not found in [`ENTITY_TYPES`].
pub const DEFAULT_ENTITY_WEIGHT: f64 = 0.3;

/// Look up the importance weight for an entity type.
pub fn entity_weight(entity_type: &str) -> f64 {
    ENTITY_TYPES
        .iter()
        .find(|(name, _)| *name == entity_type)
        .map(|(_, weight)| *weight)
        .unwrap_or(DEFAULT_ENTITY_WEIGHT)
}

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"'`\])]+"#).expect("valid regex"));

static PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[./~])?(?:/[\w.\-]+){2,}").expect("valid regex"));

static PORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:(?:[Pp]ort|PORT)[= ]+(\d{2,5}))|(?::(\d{2,5})(?:[/\s,\)]|$))")
        .expect("valid regex")
});

static HTTP_STATUS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b((?:1|2|3|4|5)\d{2})\b(?:\s+(?:Unauthorized|Forbidden|Not Found|Internal Server Error|Bad Request|OK|Created|Accepted|No Content|Bad Gateway|Service Unavailable|Gateway Timeout|error|Error|ERROR))",
    )
    .expect("valid regex")
});

static EXCEPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-zA-Z]*(?:Error|Exception|Warning|Fault))\b").expect("valid regex"));

static FUNC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([a-z_][a-z0-9_]*(?:\.[a-z_][a-z0-9_]*)*)\s*\(").expect("valid regex"));

static CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-z]+(?:[A-Z][a-z]+)+)\b").expect("valid regex"));

static PACKAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:pip install|pip3 install|npm install|yarn add|pacman -S|yay -S|cargo install|gem install|go install)\s+([a-zA-Z][a-zA-Z0-9_\-]{1,})",
    )
    .expect("valid regex")
});

static COMMAND_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"(?:^|\$\s+)((?:git|docker|npm|pip|python|node|cargo|make|curl|wget|ssh|scp|rsync|kubectl|uv|hyprctl|systemctl)\s+[a-z][a-z0-9_\- ]{2,40})",
    )
    .multi_line(true)
    .build()
    .expect("valid regex")
});

static ENV_VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][A-Z0-9_]{2,})(?:=|\b)").expect("valid regex"));

const SKIP_FUNCS: &[&str] = &[
    "print", "len", "str", "int", "list", "dict", "set", "type", "range", "open", "super",
    "self", "init", "main", "test", "run", "get", "put", "post",
];

const SKIP_ENVS: &[&str] = &[
    "HOME", "PATH", "USER", "SHELL", "PWD", "TRUE", "FALSE", "NULL", "NONE", "TODO", "NOTE",
    "WARN", "INFO", "DEBUG", "ERROR", "PASS", "FAIL", "TYPE", "NAME", "FILE", "DATA", "TEST",
    "SELF", "ARGS", "KWARGS", "ALSO", "WITH", "FROM", "THEN", "WHEN", "THAT", "THIS", "WILL",
    "HAVE", "BEEN", "DOES", "WHAT", "EACH", "SOME", "ONLY", "JUST", "MORE", "MOST", "VERY",
    "INTO", "OVER", "SUCH", "THAN", "THEM", "THESE", "THOSE", "AFTER", "BEFORE", "BETWEEN",
    "SHOULD",
];

const ENV_KNOWN_PREFIXES: &[&str] = &[
    "CUDA",
    "OPENROUTER",
    "SIGNAL",
    "DOCKER",
    "KUBECONFIG",
    "PYTHONPATH",
    "NODE",
    "RUST",
    "CARGO",
    "GOPATH",
];

/// Typed entity occurrences extracted from a piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySet {
    entities: HashMap<String, HashSet<String>>,
}

impl EntitySet {
    fn add(&mut self, entity_type: &str, value: &str) {
        let normalized = value.trim().to_lowercase();
        if normalized.chars().count() < 2 {
            return;
        }
        self.entities
            .entry(entity_type.to_string())
            .or_default()
            .insert(normalized);
    }

    /// Total number of (type, value) occurrences across all types.
    pub fn total_count(&self) -> usize {
        self.entities.values().map(HashSet::len).sum()
    }

    /// All (type, value) pairs as an owned set.
    pub fn all_entities(&self) -> HashSet<(String, String)> {
        self.entities
            .iter()
            .flat_map(|(etype, values)| values.iter().map(move |v| (etype.clone(), v.clone())))
            .collect()
    }

    /// Values present for a single entity type, if any were extracted.
    pub fn values_of(&self, entity_type: &str) -> Option<&HashSet<String>> {
        self.entities.get(entity_type)
    }

    /// Iterate over every entity type that has at least one value.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}

/// Extract structured entities from `text`.
///
/// Pure, deterministic, and O(n) in text length after the first call (regex
/// patterns are compiled once into process-lifetime statics).
pub fn extract_entities(text: &str) -> EntitySet {
    let mut result = EntitySet::default();

    // URLs first, tracking spans so overlapping file-path matches are
    // skipped below — a URL's scheme segments would otherwise also match
    // the file-path pattern.
    let mut url_spans: Vec<(usize, usize)> = Vec::new();
    for m in URL_RE.find_iter(text) {
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':', ')']);
        result.add("url", url);
        url_spans.push((m.start(), m.end()));
    }

    // Emulate the source's negative lookbehind for ":/" and "//" immediately
    // preceding the match (the regex crate has no lookbehind). A real
    // lookbehind failure doesn't skip the whole candidate span — the engine
    // retries one character later, which can surface a shorter valid match
    // nested inside it (e.g. "//a/b/c" excludes "/a/b/c" at the lookbehind
    // boundary but still matches "a/b/c" one position on). `find_at` lets us
    // reproduce that retry explicitly instead of jumping to the next
    // `find_iter` match and losing the nested one.
    let mut search_start = 0;
    while let Some(m) = PATH_RE.find_at(text, search_start) {
        if url_spans.iter().any(|(s, e)| *s <= m.start() && m.start() < *e) {
            search_start = m.end().max(m.start() + 1);
            continue;
        }
        let prefix = &text[..m.start()];
        if prefix.ends_with(":/") || prefix.ends_with("//") {
            search_start = m.start() + 1;
            continue;
        }
        let path = m.as_str().trim_end_matches(['.', ',', ';', ':', ')']);
        result.add("file_path", path);
        search_start = m.end();
    }

    for caps in PORT_RE.captures_iter(text) {
        let port_str = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
        if let Some(port_str) = port_str {
            if let Ok(port) = port_str.parse::<u32>() {
                if (80..=99).contains(&port) || (1024..=65535).contains(&port) {
                    result.add("port", port_str);
                }
            }
        }
    }

    for caps in HTTP_STATUS_RE.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            result.add("http_status", m.as_str());
        }
    }

    for caps in EXCEPTION_RE.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            result.add("exception", m.as_str());
        }
    }

    for caps in FUNC_RE.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            let fname = m.as_str();
            if !SKIP_FUNCS.contains(&fname) && fname.chars().count() >= 4 {
                result.add("function", fname);
            }
        }
    }

    for caps in CLASS_RE.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            result.add("class_name", m.as_str());
        }
    }

    for caps in PACKAGE_RE.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            result.add("package", m.as_str());
        }
    }

    for caps in COMMAND_RE.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            result.add("command", m.as_str());
        }
    }

    for caps in ENV_VAR_RE.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            let var = m.as_str();
            let has_known_prefix = ENV_KNOWN_PREFIXES.iter().any(|p| var.starts_with(p));
            if !SKIP_ENVS.contains(&var)
                && var.chars().count() >= 4
                && (var.contains('_') || has_known_prefix)
            {
                result.add("env_var", var);
            }
        }
    }

    result
}
