use crate::address::LogicalAddress;
use crate::error::{Error, Result};
use crate::translator::AccessResult;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

// Similar to `address::AddressReader`, `ValidationReader` is used to read expected results into
// memory. Where the former is used to read the raw address, the latter is used to validate whether
// an implementation accessed and returned data from the correct segment of virtual memory.
//
// Lines look like `Virtual address: 16916 Physical address: 20 Value: 0`.
pub struct ValidationReader<R = BufReader<File>> {
    reader: R,
    pub line_number: u64,
}

impl ValidationReader {
    /// Create a new `ValidationReader` instance for checking virtual memory implementation
    /// results.
    ///
    /// # Errors
    ///
    /// Fails if the file at the provided path cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> ValidationReader<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
        }
    }

    fn parse_line(&self, line: &str) -> Result<AccessResult> {
        let values = line.split_whitespace().collect::<Vec<&str>>();
        if values.len() != 8 {
            return Err(self.malformed(format!("expected 8 fields, found {}", values.len())));
        }
        let virtual_address = values[2]
            .parse::<u32>()
            .map_err(|e| self.malformed(format!("virtual address {:?}: {e}", values[2])))?;
        let physical_address = values[5]
            .parse::<u64>()
            .map_err(|e| self.malformed(format!("physical address {:?}: {e}", values[5])))?;
        let value = values[7]
            .parse::<i8>()
            .map_err(|e| self.malformed(format!("value {:?}: {e}", values[7])))?;

        Ok(AccessResult {
            virtual_address: LogicalAddress::from(virtual_address),
            physical_address,
            value,
        })
    }

    fn malformed(&self, reason: String) -> Error {
        Error::Parse {
            line: self.line_number,
            reason,
        }
    }
}

impl<R: BufRead> Iterator for ValidationReader<R> {
    type Item = Result<AccessResult>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buffer = String::new();
        loop {
            buffer.clear();
            match self.reader.read_line(&mut buffer) {
                Err(err) => return Some(Err(err.into())),
                Ok(0) => return None,
                Ok(_) => {
                    self.line_number += 1;
                    let line = buffer.trim();
                    if line.is_empty() {
                        continue;
                    }
                    return Some(self.parse_line(line));
                }
            }
        }
    }
}
