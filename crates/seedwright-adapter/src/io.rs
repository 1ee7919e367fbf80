use std::fs;
use std::path::Path;

use seedwright_core::{DataModel, validate_data_model};

use crate::errors::Result;

/// Load and validate a `dataModel.json` snapshot.
pub fn read_data_model(path: &Path) -> Result<DataModel> {
    let data_model = DataModel::from_json_str(&fs::read_to_string(path)?)?;
    validate_data_model(&data_model)?;
    Ok(data_model)
}

pub fn write_data_model(path: &Path, data_model: &DataModel) -> Result<()> {
    let mut json = data_model.to_json_pretty()?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}
