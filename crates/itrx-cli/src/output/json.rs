use itrx_core::error::ItrxError;
use serde::Serialize;

pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), ItrxError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
