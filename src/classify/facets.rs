use crate::rules::{FacetRules, Family, SuitabilityRules};

/// Sentinel for facets that matched nothing. Downstream CSV consumers expect
/// a string in every column, never an empty field.
pub const UNSPECIFIED: &str = "Not specified";
/// Sentinel for free-text fields that could not be located.
pub const UNKNOWN: &str = "N/A";

/// Descriptive attributes extracted from a product page. Every field is
/// total over its input: no match yields a sentinel, not an absence.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetSet {
    pub category_type: String,
    pub body_parts: String,
    pub function: String,
    pub baby: String,
    pub eczema: String,
    pub country: String,
    pub ingredient: String,
}

/// Pure function of (name, page text); no I/O.
pub fn extract(rules: &FacetRules, name: &str, page_text: &str) -> FacetSet {
    let name_l = name.to_lowercase();
    let text_l = page_text.to_lowercase();

    FacetSet {
        category_type: category_type(&rules.categories, &name_l, &text_l),
        body_parts: body_parts(rules, &name_l, &text_l),
        function: functions(&rules.functions, &text_l),
        baby: yes_no(&rules.baby_keywords, &text_l),
        eczema: suitability(&rules.suitability, rules.context_window, &text_l),
        country: country(rules, page_text, &text_l),
        ingredient: ingredient(page_text),
    }
}

/// First matching family wins; the name participates alongside the page text.
fn category_type(categories: &[Family], name_l: &str, text_l: &str) -> String {
    for family in categories {
        for kw in &family.keywords {
            if name_l.contains(kw.as_str()) || text_l.contains(kw.as_str()) {
                return family.label.clone();
            }
        }
    }
    UNSPECIFIED.to_string()
}

/// Multi-valued: every matching family is reported, joined in declaration
/// order.
fn functions(functions: &[Family], text_l: &str) -> String {
    let detected: Vec<&str> = functions
        .iter()
        .filter(|f| f.keywords.iter().any(|kw| text_l.contains(kw.as_str())))
        .map(|f| f.label.as_str())
        .collect();
    if detected.is_empty() {
        UNSPECIFIED.to_string()
    } else {
        detected.join(", ")
    }
}

fn yes_no(keywords: &[String], text_l: &str) -> String {
    if keywords.iter().any(|kw| text_l.contains(kw.as_str())) {
        "Yes".to_string()
    } else {
        "No".to_string()
    }
}

/// Three-tier context rule around the first suitability keyword found, in
/// list order: positive framing beats negative framing beats the default.
/// Real product copy can carry both framings at once, so the order must not
/// change.
fn suitability(rules: &SuitabilityRules, window: usize, text_l: &str) -> String {
    for kw in &rules.keywords {
        let Some(idx) = text_l.find(kw.as_str()) else {
            continue;
        };
        let context = slice_around(text_l, idx, kw.len(), window);

        if rules.positive.iter().any(|p| context.contains(p.as_str())) {
            return "Yes".to_string();
        }
        if rules.negative.iter().any(|n| context.contains(n.as_str())) {
            return "No".to_string();
        }
        // Listed among other conditions rather than treated: a
        // contraindication, not an indication.
        if rules.condition_terms.iter().any(|c| context.contains(c.as_str())) {
            return "No".to_string();
        }
        // A symptom keyword counts only when the surrounding copy talks
        // about relieving it.
        if rules.symptom_terms.iter().any(|s| kw.contains(s.as_str())) {
            if rules.treatment_terms.iter().any(|t| context.contains(t.as_str())) {
                return "Yes".to_string();
            }
            return "No".to_string();
        }
        return "No".to_string();
    }
    "No".to_string()
}

fn body_parts(rules: &FacetRules, name_l: &str, text_l: &str) -> String {
    let mut detected: Vec<&str> = Vec::new();

    // The product name is the most reliable signal.
    for family in &rules.body_parts {
        if family.keywords.iter().any(|kw| name_l.contains(kw.as_str())) {
            push_unique(&mut detected, &family.label);
        }
    }

    // Cleansing products with no stated target default to the face.
    if detected.is_empty()
        && rules
            .cleansing_indicators
            .iter()
            .any(|c| name_l.contains(c.as_str()))
    {
        detected.push("face");
    }

    // Page-text mentions count only in a usage context.
    for family in &rules.body_parts {
        for kw in &family.keywords {
            let Some(idx) = text_l.find(kw.as_str()) else {
                continue;
            };
            let context = slice_around(text_l, idx, kw.len(), rules.usage_window);

            let cleansing_context = rules
                .cleansing_indicators
                .iter()
                .any(|c| context.contains(c.as_str()));
            if family.label == "face" && cleansing_context {
                push_unique(&mut detected, &family.label);
                break;
            }

            let usage = rules
                .usage_indicators
                .iter()
                .any(|u| context.contains(u.as_str()));
            let non_usage = rules
                .non_usage_indicators
                .iter()
                .any(|n| context.contains(n.as_str()));
            if usage && !non_usage {
                push_unique(&mut detected, &family.label);
                break;
            }
        }
    }

    if detected.is_empty() {
        UNSPECIFIED.to_string()
    } else {
        detected.join(", ")
    }
}

fn push_unique<'a>(detected: &mut Vec<&'a str>, label: &'a str) {
    if !detected.iter().any(|d| *d == label) {
        detected.push(label);
    }
}

/// Origin-heading line first (the label and its value sit on adjacent
/// lines in rendered page text), then indicator phrases scanned against the
/// known-country list.
fn country(rules: &FacetRules, page_text: &str, text_l: &str) -> String {
    let mut lines = page_text.lines();
    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        if trimmed.len() <= 30 && trimmed.to_lowercase().contains("origin") {
            for value in lines.by_ref() {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                if value.len() < 50 {
                    return value.to_string();
                }
                break;
            }
            break;
        }
    }

    for indicator in &rules.country.indicators {
        let Some(idx) = text_l.find(indicator.as_str()) else {
            continue;
        };
        let end = ceil_boundary(text_l, idx + indicator.len() + rules.country_window);
        let context = &text_l[idx..end];
        for c in &rules.country.countries {
            if context.contains(c.as_str()) {
                return title_case(c);
            }
        }
    }

    UNSPECIFIED.to_string()
}

/// The ingredients list follows its heading line in rendered page text.
fn ingredient(page_text: &str) -> String {
    let mut lines = page_text.lines();
    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        let lower = trimmed.to_lowercase();
        if trimmed.len() < 60 && (lower.contains("ingredient") || lower.contains("composition")) {
            for value in lines.by_ref() {
                let value = value.trim();
                if !value.is_empty() {
                    return value.to_string();
                }
            }
            break;
        }
    }
    UNKNOWN.to_string()
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Byte window of `pad` on each side of the match, clamped to char
/// boundaries so multi-byte text cannot split a codepoint.
fn slice_around(text: &str, idx: usize, kw_len: usize, pad: usize) -> &str {
    let start = floor_boundary(text, idx.saturating_sub(pad));
    let end = ceil_boundary(text, idx + kw_len + pad);
    &text[start..end]
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(text: &str, mut idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
