//! Single-document store kept in memory and, optionally, mirrored to a JSON
//! file after every write.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Repository;
use crate::domain::{Member, Operator, PaymentEntry, SchemeSettings, SchemeType};
use crate::error::LedgerError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Document {
    members: Vec<Member>,
    payments: Vec<PaymentEntry>,
    operators: Vec<Operator>,
    settings: Option<SchemeSettings>,
    /// Last issued member sequence, keyed by scheme prefix.
    sequences: BTreeMap<String, u32>,
}

pub struct LocalStore {
    path: Option<PathBuf>,
    doc: Mutex<Document>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            doc: Mutex::new(Document::default()),
        }
    }

    /// Loads `path` if it exists; the file is created on the first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        let doc = if path.exists() {
            let raw = fs::read(&path)?;
            let doc: Document = serde_json::from_slice(&raw)?;
            info!(
                path = %path.display(),
                members = doc.members.len(),
                payments = doc.payments.len(),
                operators = doc.operators.len(),
                "loaded local store"
            );
            doc
        } else {
            Document::default()
        };
        Ok(Self {
            path: Some(path),
            doc: Mutex::new(doc),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Document>, LedgerError> {
        self.doc
            .lock()
            .map_err(|_| LedgerError::persistence("local store lock poisoned"))
    }

    fn read<T>(&self, f: impl FnOnce(&Document) -> T) -> Result<T, LedgerError> {
        Ok(f(&*self.lock()?))
    }

    // mutations run on a copy which replaces the live document only once it
    // has been written out
    fn write<T>(&self, f: impl FnOnce(&mut Document) -> Result<T, LedgerError>) -> Result<T, LedgerError> {
        let mut doc = self.lock()?;
        let mut next = doc.clone();
        let out = f(&mut next)?;
        if let Some(path) = &self.path {
            persist(path, &next)?;
        }
        *doc = next;
        Ok(out)
    }
}

fn persist(path: &Path, doc: &Document) -> Result<(), LedgerError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(doc)?)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), "local store written");
    Ok(())
}

impl Repository for LocalStore {
    fn list_members(&self, scheme: SchemeType) -> Result<Vec<Member>, LedgerError> {
        self.read(|doc| {
            doc.members
                .iter()
                .filter(|m| m.scheme_type == scheme)
                .cloned()
                .collect()
        })
    }

    fn list_all_members(&self) -> Result<Vec<Member>, LedgerError> {
        self.read(|doc| doc.members.clone())
    }

    fn find_member(&self, id: &str) -> Result<Option<Member>, LedgerError> {
        self.read(|doc| doc.members.iter().find(|m| m.id == id).cloned())
    }

    fn count_members(&self, scheme: SchemeType) -> Result<u32, LedgerError> {
        self.read(|doc| doc.members.iter().filter(|m| m.scheme_type == scheme).count() as u32)
    }

    fn next_member_sequence(&self, scheme: SchemeType, floor: u32) -> Result<u32, LedgerError> {
        self.write(|doc| {
            let last = doc.sequences.entry(scheme.prefix().to_string()).or_insert(0);
            *last = (*last).max(floor) + 1;
            Ok(*last)
        })
    }

    fn create_member(&self, member: &Member) -> Result<Member, LedgerError> {
        self.write(|doc| {
            if doc.members.iter().any(|m| m.id == member.id) {
                return Err(LedgerError::Conflict(format!("member id {} already exists", member.id)));
            }
            doc.members.push(member.clone());
            Ok(member.clone())
        })
    }

    fn update_member(&self, member: &Member) -> Result<Member, LedgerError> {
        self.write(|doc| {
            let slot = doc
                .members
                .iter_mut()
                .find(|m| m.id == member.id)
                .ok_or_else(|| LedgerError::not_found("member", &member.id))?;
            *slot = member.clone();
            Ok(member.clone())
        })
    }

    fn delete_member(&self, id: &str) -> Result<(), LedgerError> {
        self.write(|doc| {
            let before = doc.members.len();
            doc.members.retain(|m| m.id != id);
            if doc.members.len() == before {
                return Err(LedgerError::not_found("member", id));
            }
            Ok(())
        })
    }

    fn list_payment_entries(&self, member_id: &str) -> Result<Vec<PaymentEntry>, LedgerError> {
        let mut entries = self.read(|doc| {
            doc.payments
                .iter()
                .filter(|p| p.member_id == member_id)
                .cloned()
                .collect::<Vec<_>>()
        })?;
        entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    fn append_payment_entry(&self, entry: &PaymentEntry) -> Result<PaymentEntry, LedgerError> {
        self.write(|doc| {
            doc.payments.push(entry.clone());
            Ok(entry.clone())
        })
    }

    fn delete_payment_entries(&self, member_id: &str) -> Result<usize, LedgerError> {
        self.write(|doc| {
            let before = doc.payments.len();
            doc.payments.retain(|p| p.member_id != member_id);
            Ok(before - doc.payments.len())
        })
    }

    fn list_operators(&self) -> Result<Vec<Operator>, LedgerError> {
        self.read(|doc| doc.operators.clone())
    }

    fn find_operator(&self, id: i64) -> Result<Option<Operator>, LedgerError> {
        self.read(|doc| doc.operators.iter().find(|o| o.id == id).cloned())
    }

    fn find_operator_by_username(&self, username: &str) -> Result<Option<Operator>, LedgerError> {
        self.read(|doc| doc.operators.iter().find(|o| o.username == username).cloned())
    }

    fn create_operator(&self, operator: &Operator) -> Result<Operator, LedgerError> {
        self.write(|doc| {
            if doc.operators.iter().any(|o| o.username == operator.username) {
                return Err(LedgerError::Conflict(format!(
                    "username {} is already taken",
                    operator.username
                )));
            }
            doc.operators.push(operator.clone());
            Ok(operator.clone())
        })
    }

    fn update_operator(&self, operator: &Operator) -> Result<Operator, LedgerError> {
        self.write(|doc| {
            if doc
                .operators
                .iter()
                .any(|o| o.id != operator.id && o.username == operator.username)
            {
                return Err(LedgerError::Conflict(format!(
                    "username {} is already taken",
                    operator.username
                )));
            }
            let slot = doc
                .operators
                .iter_mut()
                .find(|o| o.id == operator.id)
                .ok_or_else(|| LedgerError::not_found("operator", operator.id))?;
            *slot = operator.clone();
            Ok(operator.clone())
        })
    }

    fn delete_operator(&self, id: i64) -> Result<(), LedgerError> {
        self.write(|doc| {
            let before = doc.operators.len();
            doc.operators.retain(|o| o.id != id);
            if doc.operators.len() == before {
                return Err(LedgerError::not_found("operator", id));
            }
            Ok(())
        })
    }

    fn load_settings(&self) -> Result<SchemeSettings, LedgerError> {
        self.read(|doc| doc.settings.clone().unwrap_or_default())
    }

    fn save_settings(&self, settings: &SchemeSettings) -> Result<SchemeSettings, LedgerError> {
        self.write(|doc| {
            doc.settings = Some(settings.clone());
            Ok(settings.clone())
        })
    }
}
