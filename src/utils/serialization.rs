use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

fn options() -> impl Options {
    bincode::DefaultOptions::new().with_no_limit()
}

pub fn save_to_disk<T: Serialize, TPath: AsRef<Path>>(data: &T, path: TPath) -> Result<(), StoreError> {
    let mut writer = BufWriter::new(File::create(path)?);
    options().serialize_into(&mut writer, data)?;
    writer.flush()?;
    Ok(())
}

pub fn load_from_disk<T: DeserializeOwned, TPath: AsRef<Path>>(path: TPath) -> Result<T, StoreError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(options().deserialize_from(reader)?)
}
