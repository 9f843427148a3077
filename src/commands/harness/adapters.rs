use serde_json::Value;

use super::*;

pub fn extract_with_adapter(
    profile: &HarnessProfile,
    fixture_path: &Path,
) -> Result<ExtractionResult> {
    let raw = read_input_text(fixture_path)?;

    let mut extraction = match profile.adapter_id {
        AdapterId::Docs => {
            let config =
                ExtractionConfig::with_default_sections(profile.resolved_reset_on_blank_line())?;
            extract_sections(&raw, &config)
        }
        AdapterId::Tickets => count_ticket_groups(&raw, profile.group_column())
            .with_context(|| format!("failed to read tickets fixture {}", fixture_path.display()))?,
        AdapterId::Generic => count_generic_groups(&raw)
            .with_context(|| format!("failed to read generic fixture {}", fixture_path.display()))?,
    };

    let source = match profile.adapter_id {
        AdapterId::Docs => HEADING_SOURCE.to_string(),
        AdapterId::Tickets => format!("group column {}", profile.group_column()),
        AdapterId::Generic => "fixture groups".to_string(),
    };
    extraction.warn_missing_sections(
        &[profile.pre_key.as_str(), profile.post_key.as_str()],
        &source,
    );
    Ok(extraction)
}

/// One row per ticket; rows with an empty group cell are unassigned.
pub fn count_ticket_groups(
    raw: &str,
    group_column: &str,
) -> Result<ExtractionResult, PipelineError> {
    let mut lines = raw.lines().filter(|line| !line.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| PipelineError::InvalidInput("tickets CSV has no header".to_string()))?;

    let group_index = header
        .split(',')
        .position(|column| column.trim() == group_column)
        .ok_or_else(|| {
            PipelineError::InvalidInput(format!("tickets CSV has no column {group_column:?}"))
        })?;

    let mut groups = BTreeMap::<String, usize>::new();
    for line in lines {
        let key = line
            .split(',')
            .nth(group_index)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(UNASSIGNED_GROUP);
        *groups.entry(key.to_string()).or_insert(0) += 1;
    }

    Ok(split_unassigned(groups))
}

/// Accepts `{"groups": {"A": 3}}` or `{"rows": [...], "group_col": "group"}`.
pub fn count_generic_groups(raw: &str) -> Result<ExtractionResult, PipelineError> {
    let data: Value = serde_json::from_str(raw)
        .map_err(|err| PipelineError::InvalidInput(format!("invalid generic fixture: {err}")))?;

    let mut groups = BTreeMap::<String, usize>::new();

    if let Some(declared) = data.get("groups").and_then(Value::as_object) {
        for (key, count) in declared {
            let count = count.as_u64().ok_or_else(|| {
                PipelineError::InvalidInput(format!(
                    "group {key} must be a non-negative integer count"
                ))
            })?;
            groups.insert(key.clone(), count as usize);
        }
        return Ok(split_unassigned(groups));
    }

    let group_column = data
        .get("group_col")
        .and_then(Value::as_str)
        .unwrap_or("group");
    let rows = data
        .get("rows")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for row in rows {
        let key = match row.get(group_column) {
            None | Some(Value::Null) => UNASSIGNED_GROUP.to_string(),
            Some(Value::String(value)) => value.clone(),
            Some(other) => other.to_string(),
        };
        *groups.entry(key).or_insert(0) += 1;
    }

    Ok(split_unassigned(groups))
}

fn split_unassigned(mut groups: BTreeMap<String, usize>) -> ExtractionResult {
    let unassigned = groups.remove(UNASSIGNED_GROUP).unwrap_or(0);
    ExtractionResult::from_counts(groups, unassigned, Vec::new())
}
