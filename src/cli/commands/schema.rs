use clap::Subcommand;
use serde_json::{json, Map, Value};

use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::database::schema::{SchemaProbe, SchemaProber};

#[derive(Subcommand)]
pub enum SchemaCommands {
    #[command(about = "Report whether a table and the given columns exist")]
    Probe {
        #[arg(help = "Table name, e.g. posts")]
        table: String,
        #[arg(help = "Columns to check")]
        columns: Vec<String>,
    },
}

pub async fn handle(cmd: SchemaCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SchemaCommands::Probe { table, columns } => {
            let prober = SchemaProber::new(connect().await?);
            let exists = prober.table_exists(&table).await?;

            let mut present = Map::new();
            if exists {
                let names: Vec<&str> = columns.iter().map(String::as_str).collect();
                for (column, found) in prober.detect_columns(&table, &names).await?.iter() {
                    present.insert(column.to_string(), Value::Bool(found));
                }
            }

            if let OutputFormat::Text = output_format {
                for (column, found) in &present {
                    println!("  {:<24} {}", column, if found.as_bool() == Some(true) { "yes" } else { "no" });
                }
            }
            let state = if exists { "exists" } else { "does not exist" };
            output_success(
                &output_format,
                &format!("Table {table} {state}"),
                Some(json!({ "table": table, "exists": exists, "columns": present })),
            )
        }
    }
}
