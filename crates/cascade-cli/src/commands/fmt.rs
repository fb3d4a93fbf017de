//! Fmt command: print a file as canonical Verilog.

use std::path::Path;

use cascade_util::errors::CascadeError;
use cascade_util::fs::read_source;
use cascade_verilog::{parse, SourceFile};
use miette::Result;

pub fn exec(path: &Path, check: bool) -> Result<i32> {
    let text = read_source(path).map_err(CascadeError::Io)?;
    let source = SourceFile::new(path.display().to_string(), text.as_str());
    let elements = parse(&source)?;

    let mut formatted = elements
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    if !formatted.is_empty() {
        formatted.push('\n');
    }

    if check {
        if formatted == text {
            return Ok(0);
        }
        cascade_util::progress::status_warn("Unformatted", &path.display().to_string());
        return Ok(1);
    }
    print!("{formatted}");
    Ok(0)
}
