// src/macros/expand.rs

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{Result, SoapCiError};
use crate::macros::MacroContext;

/// Upper bound on substitutions performed by one [`expand`] call.
///
/// Cycles between definitions are rejected when the context is built, so this
/// only trips when placeholders are spliced together across substitution
/// boundaries (e.g. one value ending in `${x` and the next text starting with `}`).
pub const MAX_SUBSTITUTIONS: usize = 10_000;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)\}").expect("placeholder regex is valid"));

/// Expand every `${name}` in `template` against `names`.
///
/// The leftmost placeholder is replaced first and scanning restarts from the
/// beginning of the result, so placeholders inside substituted values are
/// expanded transitively. There is no escape for a literal `${`.
pub fn expand(template: &str, names: &MacroContext) -> Result<String> {
    let mut result = template.to_string();
    let mut substitutions = 0usize;

    loop {
        let Some((range, name)) = PLACEHOLDER
            .captures(&result)
            .map(|caps| (caps.get(0).map_or(0..0, |m| m.range()), caps[1].to_string()))
        else {
            break;
        };

        let value = names.get(&name).ok_or_else(|| SoapCiError::UndefinedMacro {
            name: name.clone(),
            template: template.to_string(),
            known: names.names().map(str::to_string).collect(),
        })?;

        if substitutions == MAX_SUBSTITUTIONS {
            return Err(SoapCiError::ExpansionLimitExceeded {
                template: template.to_string(),
                limit: MAX_SUBSTITUTIONS,
            });
        }
        substitutions += 1;

        result.replace_range(range, value);
    }

    Ok(result)
}

/// Names referenced directly by `text`, in order of appearance.
pub fn placeholder_names(text: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}
