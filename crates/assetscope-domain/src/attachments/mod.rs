//! Sorting and grouping of submission attachments for report views.
//!
//! Attachments are materialized in memory, sorted, and optionally merged
//! into one row per question or per submission. Rows serialize flat: the
//! question (or submission) fields, then `attachments` and `index`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::params::QueryParams;

/// A JSON object as stored on questions and submissions.
pub type JsonObject = Map<String, Value>;

/// Key set on a question row when that question exists in the latest form
/// version.
pub const IN_LATEST_VERSION: &str = "in_latest_version";

/// The submission an attachment belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: i64,
    pub uuid: String,
    #[serde(default)]
    pub submission: Option<JsonObject>,
}

/// A file attached to a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub mimetype: String,
    pub question_index: i64,
    #[serde(default)]
    pub question: Option<JsonObject>,
    pub instance: Instance,
}

/// One group of attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedRow {
    #[serde(flatten)]
    pub data: JsonObject,
    pub attachments: Vec<Attachment>,
    /// Position of the group in the sorted run, counting excluded groups.
    pub index: usize,
}

impl GroupedRow {
    fn new(mut data: JsonObject, attachments: Vec<Attachment>, index: usize) -> Self {
        data.remove("attachments");
        data.remove("index");
        Self {
            data,
            attachments,
            index,
        }
    }
}

/// Result of a projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttachmentView {
    Grouped(Vec<GroupedRow>),
    Sorted(Vec<Attachment>),
}

impl AttachmentView {
    /// Number of rows or attachments.
    pub fn len(&self) -> usize {
        match self {
            AttachmentView::Grouped(rows) => rows.len(),
            AttachmentView::Sorted(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Grouping dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKey {
    Question,
    Submission,
}

impl AttachmentKey {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "question" => Some(AttachmentKey::Question),
            "submission" => Some(AttachmentKey::Submission),
            _ => None,
        }
    }
}

/// Options for [`AttachmentGroupingEngine::project`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentQuery {
    /// Case-insensitive mimetype prefix.
    pub type_filter: Option<String>,
    pub group_by: Option<String>,
    pub order_by: Option<String>,
    pub descending: bool,
    /// Keep question rows that are not in the latest form version.
    pub include_all: bool,
}

impl Default for AttachmentQuery {
    fn default() -> Self {
        Self {
            type_filter: None,
            group_by: None,
            order_by: None,
            descending: false,
            include_all: true,
        }
    }
}

impl AttachmentQuery {
    /// `all` is true unless present with a value other than `true`.
    pub fn from_params(params: &QueryParams) -> Self {
        Self {
            type_filter: params.type_filter.clone(),
            group_by: params.group_by.clone(),
            order_by: params.order_by.clone(),
            descending: params.sort.as_deref() == Some("desc"),
            include_all: params.all.as_deref().map_or(true, |all| all == "true"),
        }
    }

    pub fn group_by(mut self, key: impl Into<String>) -> Self {
        self.group_by = Some(key.into());
        self
    }

    pub fn order_by(mut self, key: impl Into<String>) -> Self {
        self.order_by = Some(key.into());
        self
    }

    /// Sort key; `group_by` takes precedence over `order_by`.
    fn sort_key(&self) -> Option<AttachmentKey> {
        self.group_by
            .as_deref()
            .or(self.order_by.as_deref())
            .and_then(AttachmentKey::parse)
    }

    fn group_key(&self) -> Option<AttachmentKey> {
        self.group_by.as_deref().and_then(AttachmentKey::parse)
    }
}

/// Stateless projection of attachments into report rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttachmentGroupingEngine;

impl AttachmentGroupingEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn project(&self, attachments: Vec<Attachment>, query: &AttachmentQuery) -> AttachmentView {
        let mut items: Vec<Attachment> = match &query.type_filter {
            Some(prefix) => {
                let prefix = prefix.to_lowercase();
                attachments
                    .into_iter()
                    .filter(|a| a.mimetype.to_lowercase().starts_with(&prefix))
                    .collect()
            }
            None => attachments,
        };

        if query.descending {
            items.sort_by(|a, b| b.id.cmp(&a.id));
        } else {
            items.sort_by_key(|a| a.id);
        }

        match query.sort_key() {
            Some(AttachmentKey::Question) => items.sort_by_key(|a| a.question_index),
            Some(AttachmentKey::Submission) => {
                items.sort_by_key(|a| (a.instance.id, a.question_index))
            }
            None => {}
        }

        let rows = match query.group_key() {
            Some(AttachmentKey::Question) => group_by_question(items, query.include_all),
            Some(AttachmentKey::Submission) => group_by_submission(items),
            None => return AttachmentView::Sorted(items),
        };
        debug!(rows = rows.len(), "attachments grouped");
        AttachmentView::Grouped(rows)
    }
}

fn group_by_question(items: Vec<Attachment>, include_all: bool) -> Vec<GroupedRow> {
    runs(items, |a| (a.question_index, a.question.clone()))
        .into_iter()
        .enumerate()
        .filter_map(|(index, ((question_index, question), members))| {
            let data = question.unwrap_or_else(|| {
                let mut synthetic = JsonObject::new();
                synthetic.insert("number".to_string(), Value::from(question_index));
                synthetic
            });
            let keep = include_all || data.get(IN_LATEST_VERSION).map_or(false, is_truthy);
            keep.then(|| GroupedRow::new(data, members, index))
        })
        .collect()
}

fn group_by_submission(items: Vec<Attachment>) -> Vec<GroupedRow> {
    runs(items, |a| (a.instance.uuid.clone(), a.instance.submission.clone()))
        .into_iter()
        .enumerate()
        .map(|(index, ((uuid, submission), members))| {
            let data = submission.unwrap_or_else(|| {
                let mut synthetic = JsonObject::new();
                synthetic.insert("instance_uuid".to_string(), Value::from(uuid));
                synthetic
            });
            GroupedRow::new(data, members, index)
        })
        .collect()
}

/// Splits `items` into maximal runs of consecutive elements with equal keys.
fn runs<K, F>(items: Vec<Attachment>, key: F) -> Vec<(K, Vec<Attachment>)>
where
    K: PartialEq,
    F: Fn(&Attachment) -> K,
{
    let mut out: Vec<(K, Vec<Attachment>)> = Vec::new();
    for item in items {
        let k = key(&item);
        match out.last_mut() {
            Some((last, members)) if *last == k => members.push(item),
            _ => out.push((k, vec![item])),
        }
    }
    out
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
