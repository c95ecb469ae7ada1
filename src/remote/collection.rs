//! Ordered document collection shared by the bundled store adapters.

use super::adapter::{Fields, Precondition, Revision, StoredDocument, Write};
use crate::types::ItemId;
use serde::{Deserialize, Serialize};

/// Documents in insertion order plus the revision counter.
///
/// Replacing or merging an existing document keeps its position.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct Collection {
    documents: Vec<StoredDocument>,
    next_revision: u64,
}

impl Collection {
    pub(crate) fn new() -> Self {
        Self {
            documents: Vec::new(),
            next_revision: 1,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.documents.len()
    }

    pub(crate) fn list(&self) -> Vec<StoredDocument> {
        self.documents.clone()
    }

    pub(crate) fn get(&self, key: &ItemId) -> Option<StoredDocument> {
        self.position(key).map(|i| self.documents[i].clone())
    }

    pub(crate) fn satisfies(&self, key: &ItemId, precondition: Precondition) -> bool {
        match (precondition, self.position(key)) {
            (Precondition::Absent, None) => true,
            (Precondition::Revision(rev), Some(i)) => self.documents[i].revision == rev,
            _ => false,
        }
    }

    pub(crate) fn apply(&mut self, key: &ItemId, write: Write) {
        match write {
            Write::Put(fields) => self.upsert(key, fields, true),
            Write::Merge(fields) => self.upsert(key, fields, false),
            Write::Delete => {
                if let Some(i) = self.position(key) {
                    self.documents.remove(i);
                }
            }
        }
    }

    fn upsert(&mut self, key: &ItemId, fields: Fields, replace: bool) {
        let revision = self.bump();
        match self.position(key) {
            Some(i) => {
                let doc = &mut self.documents[i];
                if replace {
                    doc.fields = fields;
                } else {
                    doc.fields.extend(fields);
                }
                doc.revision = revision;
            }
            None => self.documents.push(StoredDocument {
                key: key.clone(),
                revision,
                fields,
            }),
        }
    }

    fn bump(&mut self) -> Revision {
        // A default-constructed collection starts at zero; revisions are never zero.
        let rev = self.next_revision.max(1);
        self.next_revision = rev + 1;
        Revision(rev)
    }

    fn position(&self, key: &ItemId) -> Option<usize> {
        self.documents.iter().position(|d| &d.key == key)
    }
}
