//! Variable interpolation for strings
//!
//! Templates reference run-level variables with the `${var}` syntax. A
//! variable may hold a placeholder for a task output, which resolves at
//! render time; templates can therefore be written before the tasks they
//! reference have produced anything.

use crate::error::{ConveyorError, InterpolationError, Result};
use crate::runner::task::Fields;
use regex::Regex;
use serde_json::Value;

/// Interpolate `${var}` references in a string
pub fn interpolate(template: &str, vars: &Fields) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

    let mut result = String::with_capacity(template.len());
    let mut last = 0;
    for caps in re.captures_iter(template) {
        let matched = caps.get(0).unwrap();
        result.push_str(&template[last..matched.start()]);
        result.push_str(&render_var(&caps[1], vars)?);
        last = matched.end();
    }
    result.push_str(&template[last..]);
    Ok(result)
}

fn render_var(name: &str, vars: &Fields) -> Result<String> {
    let value = match vars.resolve(name) {
        Ok(value) => value,
        // an absent variable is an interpolation problem, not a task problem
        Err(ConveyorError::Task(_)) => {
            return Err(InterpolationError::UndefinedVariable(name.to_string()).into())
        }
        Err(err) => return Err(err),
    };
    Ok(match value {
        Value::String(s) => s,
        other => other.to_string(),
    })
}
