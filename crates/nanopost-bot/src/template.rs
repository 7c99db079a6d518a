//! Prompt template rendering

use minijinja::Environment;
use std::collections::BTreeMap;
use tracing::debug;

/// Substitute named string fields into a minijinja template
///
/// Fields the template references but `fields` lacks render empty. A
/// template that fails to parse or render comes back unchanged.
pub fn render_template(template: &str, fields: &[(&str, &str)]) -> String {
    let context: BTreeMap<&str, &str> = fields.iter().copied().collect();
    let env = Environment::new();

    match env.render_str(template, &context) {
        Ok(rendered) => rendered,
        Err(e) => {
            debug!("Template render failed, using it verbatim: {}", e);
            template.to_string()
        }
    }
}
