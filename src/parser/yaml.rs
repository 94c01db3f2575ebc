use super::types::{VerificationFlow, VerificationStep};
use anyhow::{Context, Result};
use std::path::Path;

/// Parse a YAML flow file into a [`VerificationFlow`].
pub fn parse_flow_file(path: &Path) -> Result<VerificationFlow> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read flow file: {}", path.display()))?;

    let mut flow = parse_flow_content(&content)
        .with_context(|| format!("Failed to parse flow file: {}", path.display()))?;

    if flow.name.is_none() {
        flow.name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string());
    }

    Ok(flow)
}

/// Parse YAML content. Three layouts are accepted:
///
/// 1. header + `---` + step sequence (the canonical form)
/// 2. a bare step sequence with no header
/// 3. a single mapping with a `steps:` key
pub fn parse_flow_content(content: &str) -> Result<VerificationFlow> {
    if let Some((header, body)) = split_document(content) {
        let mut flow: VerificationFlow = if header.trim().is_empty() {
            VerificationFlow::default()
        } else {
            serde_yaml::from_str(header).context("Failed to parse flow header")?
        };
        flow.steps = parse_steps(&body)?;
        return Ok(flow);
    }

    // Bare sequence of steps.
    let value: serde_yaml::Value =
        serde_yaml::from_str(content).context("Failed to parse YAML content")?;

    match value {
        serde_yaml::Value::Sequence(_) => {
            let mut flow = VerificationFlow::default();
            flow.steps = parse_steps(content)?;
            Ok(flow)
        }
        serde_yaml::Value::Mapping(_) => {
            let flow: VerificationFlow =
                serde_yaml::from_value(value).context("Failed to parse flow mapping")?;
            if flow.steps.is_empty() {
                anyhow::bail!("Flow has no steps");
            }
            Ok(flow)
        }
        _ => anyhow::bail!("Invalid flow file: expected a mapping or a step sequence"),
    }
}

/// Split `header --- steps` documents. Returns `None` when the content has no
/// document separator, which is also valid (bare step list).
fn split_document(content: &str) -> Option<(&str, String)> {
    // A separator line must be exactly "---" to avoid tripping on strings.
    let mut offset = 0usize;
    for line in content.lines() {
        if line.trim_end() == "---" {
            let header = &content[..offset];
            let body = content[offset + line.len()..].to_string();
            return Some((header, body));
        }
        offset += line.len() + 1;
    }
    None
}

fn parse_steps(body: &str) -> Result<Vec<VerificationStep>> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(body).context("Failed to parse steps section")?;

    let seq = match value {
        serde_yaml::Value::Sequence(seq) => seq,
        serde_yaml::Value::Null => Vec::new(),
        _ => anyhow::bail!("Steps section must be a YAML sequence"),
    };

    let mut steps = Vec::with_capacity(seq.len());
    for (i, item) in seq.into_iter().enumerate() {
        let step = parse_step_value(item)
            .with_context(|| format!("Invalid step at index {}", i))?;
        steps.push(step);
    }

    if steps.is_empty() {
        anyhow::bail!("Flow has no steps");
    }

    Ok(steps)
}

/// Parse one sequence item. Bare strings (`- screenshot`) are promoted to the
/// map form with a null payload so serde's enum deserializer accepts them.
fn parse_step_value(value: serde_yaml::Value) -> Result<VerificationStep> {
    let value = match value {
        serde_yaml::Value::String(name) => {
            let mut map = serde_yaml::Mapping::new();
            map.insert(serde_yaml::Value::String(name), serde_yaml::Value::Null);
            serde_yaml::Value::Mapping(map)
        }
        other => other,
    };

    serde_yaml::from_value(value).context("Unknown or malformed step")
}
