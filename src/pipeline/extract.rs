use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;

use super::error::PipelineError;
use super::normalize::normalize_heading;

/// Section table used when no `--section` override is given. Patterns apply
/// to normalized heading text.
pub const DEFAULT_SECTIONS: &[(&str, &str)] = &[
    ("rules_globales", r"regles\s+globales"),
    ("conventions_sorties", r"conventions\s+sorties"),
    ("A_structure", r"\ba\b.*(structure|tests?)"),
    ("B_metrologie", r"\bb\b.*(metrologie)"),
];

pub const DEFAULT_PRE_KEY: &str = "A_structure";
pub const DEFAULT_POST_KEY: &str = "B_metrologie";
pub const HEADING_SOURCE: &str = "heading pattern";

const UNASSIGNED_PREVIEW_LIMIT: usize = 20;
const LIST_ITEM_PATTERN: &str = r"^\s{0,3}(-|\*|\d+\.)\s+";
const HEADING_PATTERN: &str = r"^\s{0,3}#{1,6}\s+";
const FENCE_PATTERN: &str = r"^\s{0,3}(`{3,}|~{3,})";

#[derive(Debug, Clone)]
pub struct SectionDetector {
    pub key: String,
    pub pattern: Regex,
}

impl SectionDetector {
    pub fn new(key: &str, pattern: &str) -> Result<Self, PipelineError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(PipelineError::InvalidInput(
                "section key must not be empty".to_string(),
            ));
        }

        let pattern = Regex::new(pattern).map_err(|err| {
            PipelineError::InvalidInput(format!("invalid pattern for section {key}: {err}"))
        })?;

        Ok(Self {
            key: key.to_string(),
            pattern,
        })
    }

    pub fn parse_assignment(raw: &str) -> Result<Self, PipelineError> {
        let (key, pattern) = raw.split_once('=').ok_or_else(|| {
            PipelineError::InvalidInput(format!("expected KEY=REGEX, got {raw:?}"))
        })?;
        Self::new(key, pattern)
    }
}

#[derive(Debug, Clone)]
struct LineGrammar {
    list_item: Regex,
    heading: Regex,
    fence: Regex,
}

impl LineGrammar {
    fn new() -> Result<Self, PipelineError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|err| {
                PipelineError::InvalidInput(format!("failed to compile line pattern: {err}"))
            })
        };

        Ok(Self {
            list_item: compile(LIST_ITEM_PATTERN)?,
            heading: compile(HEADING_PATTERN)?,
            fence: compile(FENCE_PATTERN)?,
        })
    }

    fn fence_token<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.fence
            .captures(line)
            .and_then(|captures| captures.get(1))
            .map(|token| token.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub detectors: Vec<SectionDetector>,
    pub reset_on_blank_line: bool,
    grammar: LineGrammar,
}

impl ExtractionConfig {
    pub fn new(
        detectors: Vec<SectionDetector>,
        reset_on_blank_line: bool,
    ) -> Result<Self, PipelineError> {
        if detectors.is_empty() {
            return Err(PipelineError::InvalidInput(
                "at least one section detector is required".to_string(),
            ));
        }

        Ok(Self {
            detectors,
            reset_on_blank_line,
            grammar: LineGrammar::new()?,
        })
    }

    pub fn with_default_sections(reset_on_blank_line: bool) -> Result<Self, PipelineError> {
        let detectors = DEFAULT_SECTIONS
            .iter()
            .map(|(key, pattern)| SectionDetector::new(key, pattern))
            .collect::<Result<Vec<SectionDetector>, PipelineError>>()?;
        Self::new(detectors, reset_on_blank_line)
    }

    fn match_section(&self, normalized_title: &str) -> Option<&str> {
        self.detectors
            .iter()
            .find(|detector| detector.pattern.is_match(normalized_title))
            .map(|detector| detector.key.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseMeta {
    pub total_lines: usize,
    pub scanned_lines: usize,
    pub ignored_fenced_lines: usize,
    pub unterminated_fence: bool,
    pub reset_on_blank_line: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub detected_sections: Vec<String>,
    pub counts: BTreeMap<String, usize>,
    pub assigned_items_count: usize,
    pub total_list_items_count: usize,
    pub unassigned_items_count: usize,
    pub unassigned_items_ratio: f64,
    pub unassigned_items_preview: Vec<String>,
    pub warnings: Vec<String>,
    pub parsing_meta: ParseMeta,
}

impl ExtractionResult {
    pub fn from_counts(
        counts: BTreeMap<String, usize>,
        unassigned_count: usize,
        unassigned_preview: Vec<String>,
    ) -> Self {
        let detected_sections = counts.keys().cloned().collect::<Vec<String>>();
        Self::assemble(
            detected_sections,
            counts,
            unassigned_count,
            unassigned_preview,
            ParseMeta::default(),
        )
    }

    fn assemble(
        detected_sections: Vec<String>,
        counts: BTreeMap<String, usize>,
        unassigned_count: usize,
        unassigned_preview: Vec<String>,
        parsing_meta: ParseMeta,
    ) -> Self {
        let assigned = counts.values().sum::<usize>();
        let total = assigned + unassigned_count;

        Self {
            detected_sections,
            counts,
            assigned_items_count: assigned,
            total_list_items_count: total,
            unassigned_items_count: unassigned_count,
            unassigned_items_ratio: unassigned_ratio(unassigned_count, total),
            unassigned_items_preview: unassigned_preview,
            warnings: Vec::new(),
            parsing_meta,
        }
    }

    pub fn count_for(&self, key: &str) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn warn_missing_sections(&mut self, keys: &[&str], source: &str) {
        for key in keys {
            if !self.detected_sections.iter().any(|detected| detected == key) {
                self.warnings
                    .push(format!("section {key} not detected ({source})"));
            }
        }
    }
}

pub fn unassigned_ratio(unassigned: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        unassigned as f64 / total as f64
    }
}

pub fn extract_sections(text: &str, config: &ExtractionConfig) -> ExtractionResult {
    let grammar = &config.grammar;
    let mut counts = config
        .detectors
        .iter()
        .map(|detector| (detector.key.clone(), 0_usize))
        .collect::<BTreeMap<String, usize>>();
    let mut detected_sections = Vec::<String>::new();
    let mut unassigned_count = 0_usize;
    let mut unassigned_preview = Vec::<String>::new();
    let mut meta = ParseMeta {
        reset_on_blank_line: config.reset_on_blank_line,
        ..ParseMeta::default()
    };

    let mut current: Option<String> = None;
    let mut open_fence: Option<String> = None;

    for line in text.lines() {
        meta.total_lines += 1;

        if let Some(token) = &open_fence {
            let closes = grammar.fence_token(line) == Some(token.as_str());
            meta.ignored_fenced_lines += 1;
            if closes {
                open_fence = None;
            }
            continue;
        }

        if let Some(token) = grammar.fence_token(line) {
            open_fence = Some(token.to_string());
            meta.ignored_fenced_lines += 1;
            continue;
        }

        meta.scanned_lines += 1;

        if line.trim().is_empty() {
            if config.reset_on_blank_line {
                current = None;
            }
            continue;
        }

        if grammar.heading.is_match(line) {
            let title = grammar.heading.replace(line, "");
            let normalized = normalize_heading(title.trim());
            current = config.match_section(&normalized).map(ToOwned::to_owned);
            if let Some(key) = &current {
                if !detected_sections.contains(key) {
                    detected_sections.push(key.clone());
                }
            }
            continue;
        }

        if grammar.list_item.is_match(line) {
            match current.as_ref().and_then(|key| counts.get_mut(key)) {
                Some(count) => *count += 1,
                None => {
                    unassigned_count += 1;
                    if unassigned_preview.len() < UNASSIGNED_PREVIEW_LIMIT {
                        unassigned_preview.push(line.trim().to_string());
                    }
                }
            }
        }
    }

    meta.unterminated_fence = open_fence.is_some();

    let mut result = ExtractionResult::assemble(
        detected_sections,
        counts,
        unassigned_count,
        unassigned_preview,
        meta,
    );
    if result.parsing_meta.unterminated_fence {
        result
            .warnings
            .push("unterminated fenced block: remainder of document ignored".to_string());
    }
    result
}
