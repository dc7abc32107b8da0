//! Instruction templates loaded from disk at startup.

use std::collections::HashMap;
use std::path::Path;

use tera::{Context, Tera};
use tracing::debug;

use crate::constants::{IMAGE_PROMPT_TEMPLATE_FILE, LAYOUT_ANALYSIS_PROMPT_FILE};
use crate::error::BannerError;

/// Reads a prompt file, failing if it is missing or not UTF-8.
pub fn load_prompt(path: &Path) -> Result<String, BannerError> {
    if !path.exists() {
        return Err(BannerError::StartupConfig(format!(
            "Prompt file not found: {}",
            path.display()
        )));
    }
    let contents = std::fs::read_to_string(path).map_err(|err| {
        BannerError::StartupConfig(format!(
            "Failed to read prompt file ({}): {err}",
            path.display()
        ))
    })?;
    debug!("Loaded {} ({} bytes)", path.display(), contents.len());
    Ok(contents)
}

/// Both instruction templates, loaded once.
#[derive(Clone, Debug)]
pub struct PromptTemplates {
    /// Fixed instruction sent along with the sketch
    pub layout_analysis: String,
    /// Instruction with `{{ size }}`, `{{ layout_info }}`, `{{ impression }}` and `{{ details }}` variables
    pub image_prompt_instruction: String,
}

impl PromptTemplates {
    /// Loads both templates from `dir`. The error names the missing file.
    pub fn load(dir: &Path) -> Result<Self, BannerError> {
        let layout_analysis = load_prompt(&dir.join(LAYOUT_ANALYSIS_PROMPT_FILE))?;
        let image_prompt_instruction = load_prompt(&dir.join(IMAGE_PROMPT_TEMPLATE_FILE))?;
        Ok(Self {
            layout_analysis,
            image_prompt_instruction,
        })
    }
}

/// Renders `template` with tera, autoescaping off, so values go in as typed.
///
/// An unknown variable or a malformed tag is an error, the template is not
/// partially rendered.
pub fn render_template(
    template: &str,
    values: &HashMap<&str, &str>,
) -> Result<String, BannerError> {
    let mut context = Context::new();
    for (name, value) in values {
        context.insert(*name, value);
    }
    Tera::one_off(template, &context, false)
        .map_err(|err| BannerError::Template(error_chain(&err)))
}

/// tera puts the useful part (which variable, which line) in the source chain.
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values<'a>(pairs: &[(&'a str, &'a str)]) -> HashMap<&'a str, &'a str> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn missing_prompt_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_prompt(&dir.path().join("nope.txt")).expect_err("missing file");
        assert!(matches!(err, BannerError::StartupConfig(_)));
        assert!(err.to_string().contains("nope.txt"));
    }

    #[test]
    fn load_names_the_missing_template() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(LAYOUT_ANALYSIS_PROMPT_FILE), "describe it")
            .expect("write layout prompt");
        let err = PromptTemplates::load(dir.path()).expect_err("second file missing");
        assert!(err.to_string().contains(IMAGE_PROMPT_TEMPLATE_FILE));

        std::fs::write(dir.path().join(IMAGE_PROMPT_TEMPLATE_FILE), "{{ details }}")
            .expect("write template");
        let templates = PromptTemplates::load(dir.path()).expect("both files present");
        assert_eq!(templates.layout_analysis, "describe it");
    }

    #[test]
    fn non_utf8_prompt_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("binary.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).expect("write");
        assert!(load_prompt(&path).is_err());
    }

    #[test]
    fn user_text_is_substituted_verbatim() {
        let details = "A: logo {top-left}\nB: headline \"セール\" 50% off {{ size }}";
        let impression = "  bright and modern }{ <b>&</b>  ";
        let rendered = render_template(
            "Size {{ size }}\nLayout: {{ layout_info }}\nMood: {{ impression }}\nDetails:\n{{ details }}",
            &values(&[
                ("size", "1024x1024"),
                ("layout_info", "two columns"),
                ("impression", impression),
                ("details", details),
            ]),
        )
        .expect("render");
        assert!(rendered.contains(details));
        assert!(rendered.contains(impression));
        assert!(rendered.starts_with("Size 1024x1024\n"));
    }

    #[test]
    fn single_braces_are_literal() {
        let rendered = render_template(
            "{\"size\": \"{{ size }}\"} {size}",
            &values(&[("size", "1792x1024")]),
        )
        .expect("render");
        assert_eq!(rendered, "{\"size\": \"1792x1024\"} {size}");
    }

    #[test]
    fn malformed_templates_fail() {
        let v = values(&[("size", "1024x1024")]);
        for template in [
            "{{ colour }}",
            "{{ size",
            "{% if %}",
            "{{ size | no_such_filter }}",
        ] {
            assert!(
                matches!(render_template(template, &v), Err(BannerError::Template(_))),
                "{template} should not render"
            );
        }
    }

    #[test]
    fn unknown_variable_is_named() {
        let err = render_template("{{ colour }}", &values(&[])).expect_err("unknown");
        assert!(err.to_string().contains("colour"), "{err}");
    }
}
