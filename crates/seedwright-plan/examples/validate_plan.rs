use std::env;
use std::path::{Path, PathBuf};

use seedwright_core::DataModel;
use seedwright_plan::{ValidationReport, load_plan};
use serde_json::Value;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let mut plan_path: Option<PathBuf> = None;
    let mut data_model_path: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data-model" => {
                data_model_path = args.next().map(PathBuf::from);
            }
            _ => {
                if plan_path.is_none() {
                    plan_path = Some(PathBuf::from(arg));
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let plan_path = plan_path.ok_or("missing plan path")?;
    let data_model_path = data_model_path.unwrap_or_else(|| PathBuf::from("dataModel.json"));

    let plan_json = load_json(&plan_path)?;
    let data_model = DataModel::from_json_str(&std::fs::read_to_string(&data_model_path)?)?;

    let validated = match load_plan(&plan_json, &data_model) {
        Ok(validated) => validated,
        Err(report) => {
            eprintln!("plan validation failed");
            print_report(&report);
            std::process::exit(1);
        }
    };

    if !validated.warnings.is_empty() {
        eprintln!("plan validated with warnings:");
        print_report(&ValidationReport {
            errors: Vec::new(),
            warnings: validated.warnings,
        });
    } else {
        println!("plan validated successfully");
    }

    Ok(())
}

fn load_json(path: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let json = serde_json::from_str(&contents)?;
    Ok(json)
}

fn print_report(report: &ValidationReport) {
    for issue in report.errors.iter().chain(&report.warnings) {
        eprintln!("{:?} {} {}: {}", issue.severity, issue.code, issue.path, issue.message);
        if let Some(hint) = &issue.hint {
            eprintln!("  hint: {hint}");
        }
    }
}
