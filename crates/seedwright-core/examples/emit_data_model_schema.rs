use schemars::schema_for;
use seedwright_core::DataModel;

fn main() {
    let schema = schema_for!(DataModel);
    let json = serde_json::to_string_pretty(&schema).expect("serialize json schema");
    println!("{json}");
}
