use crate::error::Result;
use crate::vault::read_headers;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Print the header block of a sealed file. No key is needed.
pub fn headers(file: &Path) -> Result<()> {
    let mut reader = BufReader::new(File::open(file)?);
    let headers = read_headers(&mut reader)?;

    for (name, value) in headers.iter() {
        println!("{name}: {value}");
    }
    Ok(())
}
