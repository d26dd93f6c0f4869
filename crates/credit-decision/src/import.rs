//! Batch intake of credit applications from CSV exports.

use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::decisioning::CreditApplication;

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read application batch: {}", err),
            ImportError::Csv(err) => write!(f, "invalid application CSV data: {}", err),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Read applications whose headers use the field vocabulary. Extra columns are ignored and an
/// empty `application_id` cell leaves the id unassigned.
pub fn read_applications<R: Read>(reader: R) -> Result<Vec<CreditApplication>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut applications = Vec::new();

    for row in csv_reader.deserialize::<CreditApplication>() {
        applications.push(row?);
    }

    Ok(applications)
}

pub fn read_applications_from_path<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<CreditApplication>, ImportError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let applications = read_applications(file)?;
    info!(
        path = %path.display(),
        applications = applications.len(),
        "imported application batch"
    );
    Ok(applications)
}
