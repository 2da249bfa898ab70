//! Fixed-shape extraction: page title, anchor targets and meta pairs.

use crate::markup::{scan, MarkupVisitor};
use crate::model::PageRecord;

/// Selector rules for future extraction modes. Accepted everywhere, consulted
/// nowhere yet: today's extraction is the fixed title/links/meta walk.
#[derive(Debug, Clone, Default)]
pub struct ExtractRules {
    pub selectors: Vec<(String, String)>,
}

/// Extract a [`PageRecord`] from raw page bytes.
///
/// Bytes are decoded as UTF-8 with replacement characters, then scanned
/// once. Extraction never fails: unparseable input just yields an emptier
/// record. `rules` is reserved (see [`ExtractRules`]).
pub fn extract(document: &[u8], _rules: Option<&ExtractRules>) -> PageRecord {
    let html = String::from_utf8_lossy(document);
    let mut builder = RecordBuilder::default();
    scan(&html, &mut builder);
    builder.record
}

/// Accumulates the record while the scanner walks the document.
///
/// Title policy: opening `<title>` arms capture, opening any other tag
/// disarms it, and the first text event while armed becomes the title
/// (trimmed). Later `<title>` tags may overwrite.
#[derive(Default)]
struct RecordBuilder {
    record: PageRecord,
    title_pending: bool,
}

impl MarkupVisitor for RecordBuilder {
    fn tag_open(&mut self, name: &str, attrs: &[(String, String)]) {
        match name {
            "a" => {
                for (attr, value) in attrs {
                    if attr == "href" {
                        self.record.links.push(value.clone());
                    }
                }
            }
            "meta" => {
                let mut meta_name = None;
                let mut content = None;
                for (attr, value) in attrs {
                    match attr.as_str() {
                        "name" => meta_name = Some(value),
                        "content" => content = Some(value),
                        _ => {}
                    }
                }
                if let (Some(meta_name), Some(content)) = (meta_name, content) {
                    self.record.meta.insert(meta_name.clone(), content.clone());
                }
            }
            _ => {}
        }
        self.title_pending = name == "title";
    }

    fn text(&mut self, text: &str) {
        if self.title_pending {
            self.record.title = text.trim().to_string();
            self.title_pending = false;
        }
    }
}
