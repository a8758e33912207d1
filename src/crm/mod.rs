//! The CRM as an external collaborator.
//!
//! The pipeline only needs two calls: a batched property update and a
//! one-time option registration. [`CrmWriter`] is that seam; the HubSpot
//! client lives behind the `crm` feature and [`JsonLinesWriter`] covers dry
//! runs and tests.

use std::io::Write;

use serde::Serialize;

use crate::algo::payload::{PropertyDefinition, PropertyUpdate};
use crate::error::{Error, Result};

#[cfg(feature = "crm")]
pub mod hubspot;
pub mod rate_limit;

/// CRM object type a property belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Company,
    Contact,
}

impl ObjectKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "company" | "companies" => Some(Self::Company),
            "contact" | "contacts" => Some(Self::Contact),
            _ => None,
        }
    }

    /// Path segment used by the CRM API.
    pub fn api_path(self) -> &'static str {
        match self {
            Self::Company => "companies",
            Self::Contact => "contacts",
        }
    }
}

/// Remote side of the pipeline. Implementations surface rejections as
/// [`Error::ExternalWrite`] and never retry.
pub trait CrmWriter {
    fn write_property_batch(&mut self, kind: ObjectKind, updates: &[PropertyUpdate]) -> Result<()>;

    fn register_property_options(&mut self, kind: ObjectKind, definition: &PropertyDefinition) -> Result<()>;
}

/// Writes one JSON line per call instead of talking to a CRM.
pub struct JsonLinesWriter<W: Write> {
    out: W,
}

#[derive(Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
enum Call<'a> {
    BatchUpdate {
        kind: ObjectKind,
        inputs: &'a [PropertyUpdate],
    },
    RegisterProperty {
        kind: ObjectKind,
        property: &'a PropertyDefinition,
    },
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, call: &Call<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.out, call)?;
        self.out.write_all(b"\n").map_err(Error::from)
    }
}

impl<W: Write> CrmWriter for JsonLinesWriter<W> {
    fn write_property_batch(&mut self, kind: ObjectKind, updates: &[PropertyUpdate]) -> Result<()> {
        self.emit(&Call::BatchUpdate { kind, inputs: updates })
    }

    fn register_property_options(&mut self, kind: ObjectKind, definition: &PropertyDefinition) -> Result<()> {
        self.emit(&Call::RegisterProperty {
            kind,
            property: definition,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn kind_from_str() {
        assert_eq!(ObjectKind::from_str("Companies"), Some(ObjectKind::Company));
        assert_eq!(ObjectKind::from_str("contact").map(ObjectKind::api_path), Some("contacts"));
        assert_eq!(ObjectKind::from_str("deal"), None);
    }

    #[test]
    fn json_lines_writer_emits_one_line_per_call() {
        let mut writer = JsonLinesWriter::new(Vec::new());
        let mut properties = BTreeMap::new();
        properties.insert("pf_inds".to_string(), ";saas".to_string());
        let updates = vec![PropertyUpdate {
            id: "7".into(),
            properties,
        }];
        writer.write_property_batch(ObjectKind::Company, &updates).unwrap();
        let def = PropertyDefinition::checkbox("pf_inds", "Portfolio Industries", "companyinformation", vec![]);
        writer.register_property_options(ObjectKind::Company, &def).unwrap();

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["call"], "batch_update");
        assert_eq!(lines[0]["kind"], "company");
        assert_eq!(lines[0]["inputs"][0]["id"], "7");
        assert_eq!(lines[1]["property"]["name"], "pf_inds");
    }
}
