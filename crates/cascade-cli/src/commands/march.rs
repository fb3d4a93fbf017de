//! March command: list available targets.

use cascade_core::march::March;
use miette::Result;

pub fn exec() -> Result<i32> {
    for march in March::ALL {
        println!("{:<10} {}", march.name(), march.description());
    }
    Ok(0)
}
