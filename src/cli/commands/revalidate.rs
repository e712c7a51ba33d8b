use clap::Args;
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Args)]
pub struct RevalidateArgs {
    #[arg(
        long = "type",
        default_value = "all",
        value_parser = ["blog", "portfolio", "settings", "tag", "path", "all"],
        help = "What to revalidate"
    )]
    pub kind: String,

    #[arg(long, help = "Post or portfolio slug (blog/portfolio)")]
    pub slug: Option<String>,

    #[arg(long = "tag", help = "Tag to revalidate (repeatable)")]
    pub tags: Vec<String>,

    #[arg(long, help = "Page path, e.g. /blog")]
    pub path: Option<String>,

    #[arg(long, help = "Server base URL (defaults to http://localhost:PORT)")]
    pub url: Option<String>,

    #[arg(long, env = "REVALIDATE_SECRET", hide_env_values = true, help = "Webhook bearer secret")]
    pub secret: String,
}

impl RevalidateArgs {
    fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("type".to_string(), json!(self.kind));
        if let Some(slug) = &self.slug {
            body.insert("slug".to_string(), json!(slug));
        }
        if !self.tags.is_empty() {
            body.insert("tags".to_string(), json!(self.tags));
        }
        if let Some(path) = &self.path {
            body.insert("path".to_string(), json!(path));
        }
        Value::Object(body)
    }

    fn endpoint(&self) -> String {
        let base = match &self.url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", config().server.port),
        };
        format!("{base}/api/revalidate")
    }
}

pub async fn handle(args: RevalidateArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .post(args.endpoint())
        .bearer_auth(&args.secret)
        .json(&args.body())
        .timeout(Duration::from_secs(10))
        .send()
        .await?;

    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = body.get("message").and_then(Value::as_str).unwrap_or_default().to_string();

    if !status.is_success() {
        output_error(&output_format, &format!("Revalidation failed ({status}): {message}"))?;
        anyhow::bail!("revalidation webhook returned {status}");
    }
    output_success(&output_format, &message, Some(json!({ "response": body })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RevalidateArgs,
    }

    #[test]
    fn builds_webhook_body() {
        let harness = Harness::try_parse_from([
            "cms", "--type", "tag", "--tag", "blog", "--tag", "path:/", "--secret", "s", "--url", "http://cms.local/",
        ])
        .unwrap();
        assert_eq!(harness.args.body(), json!({ "type": "tag", "tags": ["blog", "path:/"] }));
        assert_eq!(harness.args.endpoint(), "http://cms.local/api/revalidate");
    }
}
