use crate::error::Result;
use crate::scheme::{Scheme, SchemeRegistry};

/// List the available encryption schemes
pub fn schemes() -> Result<()> {
    println!("Available encryption schemes:\n");
    for scheme in SchemeRegistry::builtin().schemes() {
        let default = if scheme == Scheme::DEFAULT {
            " (default)"
        } else {
            ""
        };
        println!("  {:<26}{:<25}{}", scheme.name(), scheme.label(), default);
        println!("  {:<26}aliases: {}", "", scheme.aliases().join(", "));
    }
    Ok(())
}
