//! Items, keys and key schemas.
//!
//! An [`Item`] is a map of attribute names to values and a [`Key`] is the
//! projection of an item onto its table's key attributes. [`KeySchema`] is a
//! validated key schema (one HASH, at most one RANGE) and [`TableSchema`]
//! bundles a table's key schema with those of its secondary indexes.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use crate::attribute_value::{AttributeValue, canonical_number};
use crate::error::ValidationError;
use crate::types::{KeySchemaElement, KeyType, TableDescription};

/// A DynamoDB item represented as a map of attribute names to values.
pub type Item = HashMap<String, AttributeValue>;

/// A DynamoDB key represented as a map of key attribute names to values.
pub type Key = HashMap<String, AttributeValue>;

/// Order-independent identity of a key, usable in sets.
///
/// Numbers are held in canonical form, so `{"N": "1"}` and `{"N": "1.0"}`
/// identify the same key.
pub type KeyIdentity<'a> = BTreeMap<&'a str, Cow<'a, AttributeValue>>;

/// Borrow a key (or item) as an order-independent identity.
#[must_use]
pub fn key_identity(key: &Key) -> KeyIdentity<'_> {
    key.iter().map(|(k, v)| (k.as_str(), identity_value(v))).collect()
}

/// The form of one key attribute used for identity comparisons.
#[must_use]
pub fn identity_value(value: &AttributeValue) -> Cow<'_, AttributeValue> {
    match value {
        AttributeValue::N(n) => match canonical_number(n) {
            Some(canonical) => Cow::Owned(AttributeValue::N(canonical)),
            None => Cow::Borrowed(value),
        },
        _ => Cow::Borrowed(value),
    }
}

/// A validated key schema: one partition key and an optional sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    hash: String,
    range: Option<String>,
}

impl KeySchema {
    /// A schema with only a partition key.
    pub fn hash_only(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            range: None,
        }
    }

    /// A schema with a partition and a sort key.
    pub fn composite(hash: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            range: Some(range.into()),
        }
    }

    /// Build from wire elements, requiring exactly one HASH and at most one
    /// RANGE element on distinct attributes.
    pub fn from_elements(elements: &[KeySchemaElement]) -> Result<Self, ValidationError> {
        let mut hash = None;
        let mut range = None;
        for element in elements {
            let slot = match element.key_type {
                KeyType::Hash => &mut hash,
                KeyType::Range => &mut range,
            };
            if slot.replace(element.attribute_name.clone()).is_some() {
                return Err(ValidationError(format!(
                    "key schema has more than one {} element",
                    element.key_type
                )));
            }
        }
        let Some(hash) = hash else {
            return Err(ValidationError::new("key schema must have exactly one HASH element"));
        };
        if range.as_deref() == Some(hash.as_str()) {
            return Err(ValidationError(format!(
                "attribute {hash} cannot be both HASH and RANGE key"
            )));
        }
        Ok(Self { hash, range })
    }

    /// The partition key attribute name.
    #[must_use]
    pub fn hash_key(&self) -> &str {
        &self.hash
    }

    /// The sort key attribute name, if any.
    #[must_use]
    pub fn range_key(&self) -> Option<&str> {
        self.range.as_deref()
    }

    /// Key attribute names, partition key first.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.hash.as_str()).chain(self.range.as_deref())
    }

    /// Wire elements for this schema.
    #[must_use]
    pub fn to_elements(&self) -> Vec<KeySchemaElement> {
        let mut elements = vec![KeySchemaElement::hash(&self.hash)];
        if let Some(range) = &self.range {
            elements.push(KeySchemaElement::range(range));
        }
        elements
    }

    /// Extract the key of `item`, or `None` if a key attribute is missing.
    #[must_use]
    pub fn project(&self, item: &Item) -> Option<Key> {
        self.attribute_names()
            .map(|name| item.get(name).map(|v| (name.to_owned(), v.clone())))
            .collect()
    }

    /// Returns `true` if `key` names exactly the key attributes.
    #[must_use]
    pub fn matches_key(&self, key: &Key) -> bool {
        key.len() == self.attribute_names().count()
            && self.attribute_names().all(|name| key.contains_key(name))
    }
}

/// A table's key schema plus the key schemas of its secondary indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// The table name.
    pub table_name: String,
    /// The table's primary key schema.
    pub key_schema: KeySchema,
    /// Global secondary indexes by name.
    pub global_indexes: HashMap<String, KeySchema>,
    /// Local secondary indexes by name.
    pub local_indexes: HashMap<String, KeySchema>,
}

impl TableSchema {
    /// A schema with no secondary indexes.
    pub fn new(table_name: impl Into<String>, key_schema: KeySchema) -> Self {
        Self {
            table_name: table_name.into(),
            key_schema,
            global_indexes: HashMap::new(),
            local_indexes: HashMap::new(),
        }
    }

    /// Register a global secondary index.
    #[must_use]
    pub fn with_global_index(mut self, name: impl Into<String>, schema: KeySchema) -> Self {
        self.global_indexes.insert(name.into(), schema);
        self
    }

    /// Register a local secondary index.
    #[must_use]
    pub fn with_local_index(mut self, name: impl Into<String>, schema: KeySchema) -> Self {
        self.local_indexes.insert(name.into(), schema);
        self
    }

    /// Build from a `DescribeTable`/`CreateTable` description.
    pub fn from_description(desc: &TableDescription) -> Result<Self, ValidationError> {
        let table_name = desc
            .table_name
            .clone()
            .ok_or_else(|| ValidationError::new("table description has no TableName"))?;
        let mut schema = Self::new(table_name, KeySchema::from_elements(&desc.key_schema)?);
        for gsi in &desc.global_secondary_indexes {
            if let Some(name) = &gsi.index_name {
                schema
                    .global_indexes
                    .insert(name.clone(), KeySchema::from_elements(&gsi.key_schema)?);
            }
        }
        for lsi in &desc.local_secondary_indexes {
            if let Some(name) = &lsi.index_name {
                schema
                    .local_indexes
                    .insert(name.clone(), KeySchema::from_elements(&lsi.key_schema)?);
            }
        }
        Ok(schema)
    }

    /// Returns `true` if `index_name` is a registered global secondary index.
    #[must_use]
    pub fn is_global_index(&self, index_name: &str) -> bool {
        self.global_indexes.contains_key(index_name)
    }

    /// The key schema queried when targeting `index_name` (or the table).
    #[must_use]
    pub fn key_schema_for(&self, index_name: Option<&str>) -> Option<&KeySchema> {
        match index_name {
            None => Some(&self.key_schema),
            Some(name) => self
                .global_indexes
                .get(name)
                .or_else(|| self.local_indexes.get(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GlobalSecondaryIndexDescription;

    fn item(pairs: &[(&str, &str)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), AttributeValue::S((*v).to_owned())))
            .collect()
    }

    #[test]
    fn test_should_build_schema_from_elements() {
        let schema = KeySchema::from_elements(&[
            KeySchemaElement::range("sk"),
            KeySchemaElement::hash("pk"),
        ])
        .unwrap();
        assert_eq!(schema.hash_key(), "pk");
        assert_eq!(schema.range_key(), Some("sk"));
        assert_eq!(schema.to_elements()[0], KeySchemaElement::hash("pk"));
    }

    #[test]
    fn test_should_reject_bad_key_schemas() {
        assert!(KeySchema::from_elements(&[]).is_err());
        assert!(KeySchema::from_elements(&[KeySchemaElement::range("sk")]).is_err());
        assert!(
            KeySchema::from_elements(&[KeySchemaElement::hash("a"), KeySchemaElement::hash("b")])
                .is_err()
        );
        assert!(
            KeySchema::from_elements(&[KeySchemaElement::hash("a"), KeySchemaElement::range("a")])
                .is_err()
        );
    }

    #[test]
    fn test_should_project_key_from_item() {
        let schema = KeySchema::composite("pk", "sk");
        let full = item(&[("pk", "p"), ("sk", "s"), ("other", "o")]);
        let key = schema.project(&full).unwrap();
        assert_eq!(key.len(), 2);
        assert!(schema.matches_key(&key));
        assert!(!schema.matches_key(&full));

        assert!(schema.project(&item(&[("pk", "p")])).is_none());
    }

    #[test]
    fn test_should_compare_key_identity_regardless_of_order() {
        let a = item(&[("pk", "p"), ("sk", "s")]);
        let mut b = Key::new();
        b.insert("sk".to_owned(), AttributeValue::S("s".to_owned()));
        b.insert("pk".to_owned(), AttributeValue::S("p".to_owned()));
        assert_eq!(key_identity(&a), key_identity(&b));
    }

    #[test]
    fn test_should_treat_equal_numbers_as_one_key_identity() {
        let one = Key::from([("id".to_owned(), AttributeValue::N("1".to_owned()))]);
        let one_point_zero = Key::from([("id".to_owned(), AttributeValue::N("1.0".to_owned()))]);
        let ten = Key::from([("id".to_owned(), AttributeValue::N("10".to_owned()))]);
        assert_eq!(key_identity(&one), key_identity(&one_point_zero));
        assert_ne!(key_identity(&one), key_identity(&ten));

        let text = Key::from([("id".to_owned(), AttributeValue::S("1".to_owned()))]);
        assert_ne!(key_identity(&one), key_identity(&text));
    }

    #[test]
    fn test_should_build_table_schema_from_description() {
        let desc = TableDescription {
            table_name: Some("orders".to_owned()),
            key_schema: vec![KeySchemaElement::hash("id")],
            global_secondary_indexes: vec![GlobalSecondaryIndexDescription {
                index_name: Some("by-customer".to_owned()),
                key_schema: vec![
                    KeySchemaElement::hash("customer"),
                    KeySchemaElement::range("placed"),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let schema = TableSchema::from_description(&desc).unwrap();
        assert!(schema.is_global_index("by-customer"));
        assert!(!schema.is_global_index("orders"));
        assert_eq!(
            schema.key_schema_for(Some("by-customer")).map(KeySchema::hash_key),
            Some("customer")
        );
        assert_eq!(schema.key_schema_for(None).map(KeySchema::hash_key), Some("id"));
        assert!(schema.key_schema_for(Some("missing")).is_none());
    }
}
