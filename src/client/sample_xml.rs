//! Single-pass reader for Webin sample XML.
//!
//! K_i: Documents carry one `SAMPLE` record with a `SAMPLE_NAME` block and
//! any number of `SAMPLE_ATTRIBUTE` elements.
//!
//! ```xml
//! <SAMPLE_SET>
//!   <SAMPLE alias="test_custom" accession="ERS7118926">
//!     <SAMPLE_NAME>
//!       <TAXON_ID>9606</TAXON_ID>
//!       <SCIENTIFIC_NAME>Homo sapiens</SCIENTIFIC_NAME>
//!     </SAMPLE_NAME>
//!     <SAMPLE_ATTRIBUTES>
//!       <SAMPLE_ATTRIBUTE><TAG>age</TAG><VALUE>30</VALUE><UNITS>years</UNITS></SAMPLE_ATTRIBUTE>
//!     </SAMPLE_ATTRIBUTES>
//!   </SAMPLE>
//! </SAMPLE_SET>
//! ```

use crate::models::{Attribute, Sample};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

/// Why a sample document was rejected.
#[derive(Debug, Error)]
pub enum SampleXmlError {
    #[error("malformed XML: {0}")]
    Malformed(#[from] quick_xml::Error),

    #[error("document has no SAMPLE element")]
    MissingSample,

    #[error("SAMPLE_ATTRIBUTE without TAG")]
    MissingTag,

    #[error("invalid TAXON_ID '{0}'")]
    InvalidTaxon(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    TaxonId,
    ScientificName,
    Tag,
    Value,
    Units,
}

impl Field {
    fn element(self) -> &'static [u8] {
        match self {
            Self::TaxonId => b"TAXON_ID",
            Self::ScientificName => b"SCIENTIFIC_NAME",
            Self::Tag => b"TAG",
            Self::Value => b"VALUE",
            Self::Units => b"UNITS",
        }
    }
}

#[derive(Debug, Default)]
struct PendingAttribute {
    tag: Option<String>,
    value: Option<String>,
    units: Option<String>,
}

#[derive(Debug, Default)]
struct Walk {
    sample: Option<Sample>,
    in_sample_name: bool,
    seen_sample_name: bool,
    attribute: Option<PendingAttribute>,
    attributes: Vec<Attribute>,
    field: Option<Field>,
    text: String,
}

impl Walk {
    fn open(&mut self, element: &BytesStart<'_>) -> Result<(), SampleXmlError> {
        match element.name().as_ref() {
            b"SAMPLE" if self.sample.is_none() => {
                self.sample = Some(Sample {
                    name: attribute_value(element, "alias")?,
                    sra_sample_id: attribute_value(element, "accession")?,
                    ..Default::default()
                });
            }
            b"SAMPLE_NAME" if !self.seen_sample_name => self.in_sample_name = true,
            b"SAMPLE_ATTRIBUTE" => self.attribute = Some(PendingAttribute::default()),
            b"TAXON_ID" if self.in_sample_name => self.capture(Field::TaxonId),
            b"SCIENTIFIC_NAME" if self.in_sample_name => self.capture(Field::ScientificName),
            b"TAG" if self.attribute.is_some() => self.capture(Field::Tag),
            b"VALUE" if self.attribute.is_some() => self.capture(Field::Value),
            b"UNITS" if self.attribute.is_some() => self.capture(Field::Units),
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) -> Result<(), SampleXmlError> {
        if let Some(field) = self.field.filter(|f| f.element() == name) {
            self.field = None;
            let text = std::mem::take(&mut self.text).trim().to_string();
            self.store(field, text)?;
            return Ok(());
        }

        match name {
            b"SAMPLE_NAME" if self.in_sample_name => {
                self.in_sample_name = false;
                self.seen_sample_name = true;
            }
            b"SAMPLE_ATTRIBUTE" => {
                if let Some(pending) = self.attribute.take() {
                    let tag = pending.tag.ok_or(SampleXmlError::MissingTag)?;
                    self.attributes
                        .push(Attribute::new(tag, pending.value, pending.units));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn capture(&mut self, field: Field) {
        self.field = Some(field);
        self.text.clear();
    }

    fn store(&mut self, field: Field, text: String) -> Result<(), SampleXmlError> {
        match field {
            Field::TaxonId => {
                let sample = self.sample.get_or_insert_with(Sample::default);
                if sample.tax_id.is_none() {
                    let tax_id = text
                        .parse::<u32>()
                        .map_err(|_| SampleXmlError::InvalidTaxon(text.clone()))?;
                    sample.tax_id = Some(tax_id);
                }
            }
            Field::ScientificName => {
                let sample = self.sample.get_or_insert_with(Sample::default);
                if sample.organism.is_none() {
                    sample.organism = Some(text);
                }
            }
            Field::Tag | Field::Value | Field::Units => {
                if let Some(pending) = self.attribute.as_mut() {
                    let slot = match field {
                        Field::Tag => &mut pending.tag,
                        Field::Value => &mut pending.value,
                        _ => &mut pending.units,
                    };
                    if slot.is_none() {
                        *slot = Some(text);
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Sample, SampleXmlError> {
        let mut sample = self.sample.ok_or(SampleXmlError::MissingSample)?;
        sample.attributes = self.attributes;
        Ok(sample)
    }
}

fn attribute_value(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, SampleXmlError> {
    let Some(attr) = element
        .try_get_attribute(name)
        .map_err(quick_xml::Error::from)?
    else {
        return Ok(None);
    };
    let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
    Ok(Some(value.into_owned()))
}

/// Parse a Webin sample XML document into a [`Sample`].
///
/// `name` comes from `SAMPLE@alias`, `tax_id`/`organism` from the first
/// `SAMPLE_NAME` block, and every `SAMPLE_ATTRIBUTE` becomes one attribute.
pub fn parse_sample_xml(xml: &str) -> Result<Sample, SampleXmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut walk = Walk::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => walk.open(&e)?,
            Event::Empty(e) => {
                walk.open(&e)?;
                walk.close(e.name().as_ref())?;
            }
            Event::End(e) => walk.close(e.name().as_ref())?,
            Event::Text(e) => {
                if walk.field.is_some() {
                    walk.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if walk.field.is_some() {
                    walk.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    walk.finish()
}
