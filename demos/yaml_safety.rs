//! Loading tagged YAML with and without safe mode.
//!
//! Run with: cargo run --example yaml_safety

use ndserial::{yaml, DecodeOptions, Error as NdError, Value};
use std::error::Error;

const DOC: &str = "\
name: rig
origin: !Point
  x: 1
  y: 2
";

fn main() -> Result<(), Box<dyn Error>> {
    // Safe mode refuses any application tag
    match yaml::loads(DOC, &DecodeOptions::new().safe()) {
        Err(e) if e.is_safety_violation() => println!("Safe load refused: {}\n", e),
        other => println!("Unexpected: {:?}\n", other),
    }

    // Unsafe mode with a constructor for the tag
    let options = DecodeOptions::new()
        .with_safe_mode(false)
        .with_constructor("Point", |v| {
            let x = v.get("x").and_then(Value::as_i64).ok_or_else(|| NdError::custom("x"))?;
            let y = v.get("y").and_then(Value::as_i64).ok_or_else(|| NdError::custom("y"))?;
            Ok(Value::Array(vec![Value::from(x), Value::from(y)]))
        });
    let doc = yaml::loads(DOC, &options)?;
    println!("Constructed: {:?}", doc.get("origin"));

    Ok(())
}
