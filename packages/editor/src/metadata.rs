//! `office:meta` access and the edit bookkeeping done after each operation.

use crate::document::OdtDocument;
use crate::errors::EditorError;
use crate::ops::Operation;
use crate::signals::Signal;
use chrono::{SecondsFormat, TimeZone, Utc};
use odfkit_dom::{ns, DomError, DomResult, QName};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const EDITING_CYCLES: &str = "meta:editing-cycles";

/// Metadata that can no longer be kept accurate once the document was
/// edited here.
const UNSUPPORTED_METADATA: [&str; 2] = ["meta:editing-duration", "meta:document-statistic"];

/// ISO 8601 form of a millisecond timestamp, e.g. `2024-01-01T10:00:00.000Z`.
pub fn format_timestamp(timestamp: i64) -> String {
    Utc.timestamp_millis_opt(timestamp)
        .single()
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl OdtDocument {
    /// Text of the `office:meta` child named `name` (for example `dc:creator`).
    pub fn metadata(&self, name: &str) -> Option<String> {
        let qname = QName::parse_prefixed(name).ok()?;
        self.tree()
            .child_element(self.meta(), &qname.ns, &qname.local)
            .map(|element| self.tree().text_content(element))
    }

    /// Removes `removed`, then writes every entry of `set` as a child of
    /// `office:meta`.
    pub fn set_metadata(&mut self, set: &BTreeMap<String, String>, removed: &[String]) -> DomResult<()> {
        let meta = self.meta();
        let tree = self.tree_mut();
        for name in removed {
            let qname = QName::parse_prefixed(name)?;
            if let Some(element) = tree.child_element(meta, &qname.ns, &qname.local) {
                tree.remove(element)?;
            }
        }
        for (name, value) in set {
            let qname = QName::parse_prefixed(name)?;
            let element = match tree.child_element(meta, &qname.ns, &qname.local) {
                Some(existing) => existing,
                None => tree.append_element(meta, &qname.ns, &qname.local)?,
            };
            tree.set_text_content(element, value)?;
        }
        Ok(())
    }

    /// Rewrites the text of every `dc:creator` tagged with `member_id`.
    pub(crate) fn update_creators(&mut self, member_id: &str, full_name: &str) -> Result<(), DomError> {
        let creators: Vec<_> = self
            .tree()
            .descendants(self.body())
            .filter(|&node| {
                self.tree().is_named(node, ns::DC, "creator")
                    && self.tree().attribute(node, ns::EDITINFO, "memberid") == Some(member_id)
            })
            .collect();
        for creator in creators {
            self.tree_mut().set_text_content(creator, full_name)?;
        }
        Ok(())
    }

    /// Stamps author and date of an executed edit into the metadata. The
    /// first edit of a session also bumps `meta:editing-cycles` and drops
    /// metadata that is no longer accurate.
    pub fn handle_operation_executed(&mut self, op: &dyn Operation) -> Result<(), EditorError> {
        if !op.is_edit() {
            return Ok(());
        }
        let member_id = op.memberid();
        let creator = match self.get_member(member_id) {
            Some(member) => member.properties.full_name.clone(),
            None => {
                warn!(member_id, optype = op.optype(), "Edit by unknown member");
                member_id.to_string()
            }
        };

        let mut set = BTreeMap::new();
        set.insert("dc:creator".to_string(), creator);
        set.insert("dc:date".to_string(), format_timestamp(op.timestamp()));
        let mut removed = Vec::new();
        if !self.edited_in_session() {
            let cycles = self
                .metadata(EDITING_CYCLES)
                .and_then(|value| value.trim().parse::<u64>().ok())
                .unwrap_or(0);
            set.insert(EDITING_CYCLES.to_string(), (cycles + 1).to_string());
            removed.extend(UNSUPPORTED_METADATA.iter().map(|name| name.to_string()));
            self.mark_edited();
        }

        self.set_metadata(&set, &removed)?;
        debug!(optype = op.optype(), member_id, "Updated document metadata");
        self.emit(Signal::MetadataUpdated {
            set_properties: set,
            removed_properties: removed,
        });
        Ok(())
    }
}
