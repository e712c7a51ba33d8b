use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::slug::slugify;

pub fn handle(text: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let slug = slugify(text);
    if slug.is_empty() {
        anyhow::bail!("'{text}' has no characters usable in a slug");
    }
    output_success(&output_format, &slug, Some(json!({ "input": text, "slug": slug })))
}
