use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use routeflow::flow::{
    BranchIsolation, FlowLoader, FlowRuntime, GraphCompiler, ParameterEncoding,
    RouteDescriptorConverter,
};
use routeflow::pipeline::trace::TraceStepFactory;
use routeflow::pipeline::Message;
use routeflow::RuntimeConfig;
use serde_json::{json, Value};

use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a flow and print its route descriptors as JSON
    Compile {
        /// Path to the flow file (YAML or JSON)
        #[arg(short, long)]
        file: String,

        /// Parameter encoding: percent or legacy
        #[arg(short, long)]
        encoding: Option<ParameterEncoding>,
    },
    /// Deploy a flow with tracing stages and run one message through it
    Run {
        /// Path to the flow file (YAML or JSON)
        #[arg(short, long)]
        file: String,

        /// Message body as JSON
        #[arg(short, long, default_value = "{}")]
        payload: String,

        /// Message header as key=value; repeatable
        #[arg(long = "header", value_name = "KEY=VALUE")]
        headers: Vec<String>,

        /// Branch isolation: shared or snapshot
        #[arg(short, long)]
        isolation: Option<BranchIsolation>,
    },
}

/// Header values that parse as JSON keep their type; anything else is a string
fn parse_header(raw: &str) -> anyhow::Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Header '{}' must look like key=value", raw))?;
    let value = match serde_json::from_str(value) {
        Ok(parsed) => parsed,
        Err(_) => Value::String(value.to_string()),
    };
    Ok((key.trim().to_string(), value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let mut config = RuntimeConfig::from_env()?;

    match args.command {
        Commands::Compile { file, encoding } => {
            if let Some(encoding) = encoding {
                config.encoding = encoding;
            }

            let document = FlowLoader::new().load(&file)?;
            let catalog = document.catalog();
            let graph = GraphCompiler::new(&catalog).compile(&document.flow)?;
            let descriptors = RouteDescriptorConverter::new(config.encoding).convert(&graph);

            println!("{}", serde_json::to_string_pretty(&descriptors)?);
        }
        Commands::Run {
            file,
            payload,
            headers,
            isolation,
        } => {
            if let Some(isolation) = isolation {
                config.isolation = isolation;
            }

            let document = FlowLoader::new().load(&file)?;
            let runtime = FlowRuntime::new(
                Arc::new(document.catalog()),
                Arc::new(TraceStepFactory),
                &config,
            )?;
            runtime.deploy(&document.flow).await?;

            let body: Value = serde_json::from_str(&payload).context("Payload is not valid JSON")?;
            let mut message = Message::new(body);
            for raw in &headers {
                let (key, value) = parse_header(raw)?;
                message.set_header(key, value);
            }

            log::info!(
                "Running message {} through flow '{}'",
                message.id(),
                document.flow.id
            );
            let engine = runtime.engine(&document.flow.id).await?;
            let completion = engine.process(&mut message).await;

            let output = json!({
                "completion": format!("{:?}", completion),
                "message": message,
                "error": message.error().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
