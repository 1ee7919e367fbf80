use std::env;
use std::path::PathBuf;

use seedwright_core::DataModel;
use seedwright_generate::{GenerateOptions, Seeder};
use seedwright_plan::load_plan;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut plan_path: Option<PathBuf> = None;
    let mut data_model_path: Option<PathBuf> = None;
    let mut seed: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--plan" => plan_path = args.next().map(PathBuf::from),
            "--data-model" => data_model_path = args.next().map(PathBuf::from),
            "--seed" => seed = args.next(),
            _ => {
                if plan_path.is_none() {
                    plan_path = Some(PathBuf::from(arg));
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let plan_path = plan_path.ok_or("missing --plan path")?;
    let data_model_path = data_model_path.ok_or("missing --data-model path")?;
    let data_model = DataModel::from_json_str(&std::fs::read_to_string(&data_model_path)?)?;
    let plan_json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&plan_path)?)?;
    let plan = load_plan(&plan_json, &data_model)
        .map_err(|report| report.render_errors())?
        .plan;

    let mut options = GenerateOptions::default();
    if let Some(seed) = seed {
        options.seed = seed;
    }

    let mut seeder = Seeder::new(data_model, options)?;
    let store = seeder.generate(&plan).await?;
    for statement in seeder.to_sql(&store)? {
        println!("{statement}");
    }
    for statement in seeder.sequence_sync_statements() {
        println!("{statement}");
    }
    Ok(())
}
