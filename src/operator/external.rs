use std::fmt::Formatter;

use crate::error::OptResult;
use crate::operator::{
    DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
};
use crate::optimizer::Optimizer;

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Binary,
}

/// Scan of an external file. Shared by the logical and physical sets; like a
/// sequential scan it provides no properties.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ExternalScan {
    format: FileFormat,
    location: String,
    delimiter: char,
    quote: char,
    escape: char,
}

impl ExternalScan {
    pub fn new<S: Into<String>>(
        format: FileFormat,
        location: S,
        delimiter: char,
        quote: char,
        escape: char,
    ) -> Self {
        Self {
            format,
            location: location.into(),
            delimiter,
            quote,
            escape,
        }
    }

    pub fn csv<S: Into<String>>(location: S) -> Self {
        Self::new(FileFormat::Csv, location, ',', '"', '\\')
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl PhysicalOperatorTrait for ExternalScan {
    fn derive_properties<O: Optimizer>(
        &self,
        _context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult::passthrough_none(0)])
    }
}

impl DisplayFields for ExternalScan {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("format", &self.format)
            .field("location", &self.location)
            .finish()
    }
}

/// Export of the child's rows into an external file.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ExportFile {
    format: FileFormat,
    location: String,
    delimiter: char,
    quote: char,
    escape: char,
}

impl ExportFile {
    pub fn new<S: Into<String>>(
        format: FileFormat,
        location: S,
        delimiter: char,
        quote: char,
        escape: char,
    ) -> Self {
        Self {
            format,
            location: location.into(),
            delimiter,
            quote,
            escape,
        }
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl PhysicalOperatorTrait for ExportFile {
    fn derive_properties<O: Optimizer>(
        &self,
        context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult::passthrough_required(
            context.required_prop,
        )])
    }
}

impl DisplayFields for ExportFile {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("format", &self.format)
            .field("location", &self.location)
            .finish()
    }
}
