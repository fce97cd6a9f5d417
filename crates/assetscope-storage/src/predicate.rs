//! Composable record predicates and lazy query sets.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{StorageError, StorageResult};
use crate::record::{FieldValue, ObjectId, Record, Schema};

/// Read access to schemas and records needed to evaluate predicates that
/// cross reference fields.
pub trait RecordLookup {
    fn lookup_schema(&self, content_type: &str) -> Option<Arc<Schema>>;
    fn lookup_record(&self, content_type: &str, pk: &ObjectId) -> Option<Record>;
}

/// A filter over records of one content type.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every record.
    All,
    /// Matches no record.
    Nothing,
    Eq {
        field: String,
        value: FieldValue,
    },
    In {
        field: String,
        values: Vec<FieldValue>,
    },
    /// Case-insensitive prefix match on a text field.
    IStartsWith {
        field: String,
        prefix: String,
    },
    /// Field is missing or null.
    IsNull {
        field: String,
    },
    PkIn(BTreeSet<ObjectId>),
    /// Follows a reference field and evaluates the inner predicate on the target.
    /// Null references never match.
    Related {
        field: String,
        predicate: Box<Predicate>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<FieldValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Predicate::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn istartswith(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Predicate::IStartsWith {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Predicate::IsNull {
            field: field.into(),
        }
    }

    pub fn pk_in(pks: impl IntoIterator<Item = ObjectId>) -> Self {
        Predicate::PkIn(pks.into_iter().collect())
    }

    pub fn related(field: impl Into<String>, predicate: Predicate) -> Self {
        Predicate::Related {
            field: field.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Conjunction, folding away trivial operands.
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Nothing, _) | (_, Predicate::Nothing) => Predicate::Nothing,
            (Predicate::All, p) | (p, Predicate::All) => p,
            (Predicate::And(mut a), Predicate::And(b)) => {
                a.extend(b);
                Predicate::And(a)
            }
            (Predicate::And(mut a), p) => {
                a.push(p);
                Predicate::And(a)
            }
            (p, Predicate::And(mut b)) => {
                b.insert(0, p);
                Predicate::And(b)
            }
            (a, b) => Predicate::And(vec![a, b]),
        }
    }

    /// Disjunction, folding away trivial operands.
    pub fn or(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::All, _) | (_, Predicate::All) => Predicate::All,
            (Predicate::Nothing, p) | (p, Predicate::Nothing) => p,
            (Predicate::Or(mut a), Predicate::Or(b)) => {
                a.extend(b);
                Predicate::Or(a)
            }
            (Predicate::Or(mut a), p) => {
                a.push(p);
                Predicate::Or(a)
            }
            (p, Predicate::Or(mut b)) => {
                b.insert(0, p);
                Predicate::Or(b)
            }
            (a, b) => Predicate::Or(vec![a, b]),
        }
    }

    /// Checks every field the predicate names against the schema, following
    /// reference fields into their target schemas.
    pub fn validate<L: RecordLookup + ?Sized>(
        &self,
        schema: &Schema,
        lookup: &L,
    ) -> StorageResult<()> {
        match self {
            Predicate::All | Predicate::Nothing | Predicate::PkIn(_) => Ok(()),
            Predicate::Eq { field, .. }
            | Predicate::In { field, .. }
            | Predicate::IStartsWith { field, .. }
            | Predicate::IsNull { field } => require_field(schema, field),
            Predicate::Related { field, predicate } => {
                let target = related_schema(schema, field, lookup)?;
                predicate.validate(&target, lookup)
            }
            Predicate::And(parts) | Predicate::Or(parts) => {
                parts.iter().try_for_each(|p| p.validate(schema, lookup))
            }
        }
    }

    /// Evaluates the predicate against one record.
    pub fn matches<L: RecordLookup + ?Sized>(
        &self,
        schema: &Schema,
        record: &Record,
        lookup: &L,
    ) -> StorageResult<bool> {
        match self {
            Predicate::All => Ok(true),
            Predicate::Nothing => Ok(false),
            Predicate::Eq { field, value } => {
                require_field(schema, field)?;
                Ok(record.get(field).as_ref() == Some(value))
            }
            Predicate::In { field, values } => {
                require_field(schema, field)?;
                Ok(record.get(field).is_some_and(|v| values.contains(&v)))
            }
            Predicate::IStartsWith { field, prefix } => {
                require_field(schema, field)?;
                Ok(record
                    .get(field)
                    .as_ref()
                    .and_then(FieldValue::as_str)
                    .is_some_and(|s| s.to_lowercase().starts_with(&prefix.to_lowercase())))
            }
            Predicate::IsNull { field } => {
                require_field(schema, field)?;
                Ok(record.get(field).map_or(true, |v| v.is_null()))
            }
            Predicate::PkIn(pks) => Ok(pks.contains(&record.pk)),
            Predicate::Related { field, predicate } => {
                let target_schema = related_schema(schema, field, lookup)?;
                let Some(target_pk) = record.reference(field) else {
                    return Ok(false);
                };
                match lookup.lookup_record(&target_schema.content_type, &target_pk) {
                    Some(target) => predicate.matches(&target_schema, &target, lookup),
                    None => Ok(false),
                }
            }
            Predicate::And(parts) => {
                for part in parts {
                    if !part.matches(schema, record, lookup)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(parts) => {
                for part in parts {
                    if part.matches(schema, record, lookup)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

fn require_field(schema: &Schema, field: &str) -> StorageResult<()> {
    if schema.has_field(field) {
        Ok(())
    } else {
        Err(StorageError::UnknownField {
            content_type: schema.content_type.clone(),
            field: field.to_string(),
        })
    }
}

fn related_schema<L: RecordLookup + ?Sized>(
    schema: &Schema,
    field: &str,
    lookup: &L,
) -> StorageResult<Arc<Schema>> {
    let target = schema
        .field(field)
        .and_then(|f| f.target())
        .ok_or_else(|| StorageError::UnknownField {
            content_type: schema.content_type.clone(),
            field: field.to_string(),
        })?;
    lookup
        .lookup_schema(target)
        .ok_or_else(|| StorageError::SchemaNotFound {
            content_type: target.to_string(),
        })
}

/// A lazy, composable view over the records of one content type.
///
/// Nothing is read until a repository evaluates the set.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySet {
    content_type: String,
    predicate: Predicate,
}

impl QuerySet {
    /// Every record of the content type.
    pub fn all(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            predicate: Predicate::All,
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Narrows the set.
    pub fn filter(&self, predicate: Predicate) -> Self {
        Self {
            content_type: self.content_type.clone(),
            predicate: self.predicate.clone().and(predicate),
        }
    }

    /// Restricts the set to the given primary keys.
    pub fn pk_in(&self, pks: impl IntoIterator<Item = ObjectId>) -> Self {
        self.filter(Predicate::pk_in(pks))
    }

    /// The empty set of the same content type.
    pub fn none(&self) -> Self {
        Self {
            content_type: self.content_type.clone(),
            predicate: Predicate::Nothing,
        }
    }

    /// Distinct union of two sets of the same content type.
    pub fn union(&self, other: &QuerySet) -> Self {
        debug_assert_eq!(self.content_type, other.content_type);
        Self {
            content_type: self.content_type.clone(),
            predicate: self.predicate.clone().or(other.predicate.clone()),
        }
    }

    /// True when the set is statically known to be empty.
    pub fn is_none(&self) -> bool {
        self.predicate == Predicate::Nothing
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::record::FieldKind;

    struct Fixture {
        schemas: HashMap<String, Arc<Schema>>,
        records: HashMap<(String, ObjectId), Record>,
    }

    impl RecordLookup for Fixture {
        fn lookup_schema(&self, content_type: &str) -> Option<Arc<Schema>> {
            self.schemas.get(content_type).cloned()
        }

        fn lookup_record(&self, content_type: &str, pk: &ObjectId) -> Option<Record> {
            self.records
                .get(&(content_type.to_string(), pk.clone()))
                .cloned()
        }
    }

    fn fixture() -> Fixture {
        let collection = Schema::new("kpi", "collection").with_field("uid", FieldKind::Text);
        let asset = Schema::new("kpi", "asset")
            .with_field("asset_type", FieldKind::Text)
            .with_reference("parent", "collection");
        let mut schemas = HashMap::new();
        schemas.insert("collection".to_string(), Arc::new(collection));
        schemas.insert("asset".to_string(), Arc::new(asset));
        let mut records = HashMap::new();
        records.insert(
            ("collection".to_string(), ObjectId::Int(1)),
            Record::new(1).with("uid", "abc123"),
        );
        Fixture { schemas, records }
    }

    #[test]
    fn test_and_or_fold_trivial_operands() {
        let p = Predicate::eq("a", 1);
        assert_eq!(Predicate::All.and(p.clone()), p);
        assert_eq!(p.clone().and(Predicate::Nothing), Predicate::Nothing);
        assert_eq!(Predicate::Nothing.or(p.clone()), p);
        assert_eq!(p.clone().or(Predicate::All), Predicate::All);
    }

    #[test]
    fn test_related_predicate_follows_reference() {
        let fx = fixture();
        let schema = fx.lookup_schema("asset").unwrap();
        let pred = Predicate::related("parent", Predicate::eq("uid", "abc123"));

        let child = Record::new(10).with("parent", 1);
        let orphan = Record::new(11).with("parent", FieldValue::Null);
        assert!(pred.matches(&schema, &child, &fx).unwrap());
        assert!(!pred.matches(&schema, &orphan, &fx).unwrap());
    }

    #[test]
    fn test_unknown_field_is_reported() {
        let fx = fixture();
        let schema = fx.lookup_schema("collection").unwrap();
        let err = Predicate::eq("asset_type", "survey")
            .validate(&schema, &fx)
            .unwrap_err();
        assert!(err.is_unknown_field());

        let err = Predicate::related("parent", Predicate::All)
            .validate(&schema, &fx)
            .unwrap_err();
        assert!(err.is_unknown_field());
    }

    #[test]
    fn test_istartswith_is_case_insensitive() {
        let schema = Schema::new("logger", "attachment").with_field("mimetype", FieldKind::Text);
        let fx = fixture();
        let record = Record::new(1).with("mimetype", "Image/JPEG");
        assert!(Predicate::istartswith("mimetype", "image")
            .matches(&schema, &record, &fx)
            .unwrap());
    }

    #[test]
    fn test_queryset_union_and_none() {
        let qs = QuerySet::all("asset");
        let a = qs.pk_in([ObjectId::Int(1)]);
        let b = qs.pk_in([ObjectId::Int(2)]);
        let union = a.union(&b);
        assert!(matches!(union.predicate(), Predicate::Or(parts) if parts.len() == 2));
        assert!(qs.none().is_none());
        assert!(!union.is_none());
    }
}
