//! A configuration-driven content model and JSON-backed content items.
//!
//! [`JsonSchema`] is loaded from a JSON document and answers both [`ContentModel`] and
//! [`AspectStore`] queries. [`JsonContent`] exposes a `serde_json` object as [`Content`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    model::{AspectDefinition, AspectStore, Content, ContentModel, DataType, FieldSetting},
    value::Value,
};

/// Static properties of one named type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeSchema {
    #[serde(default)]
    pub properties: BTreeMap<String, DataType>,
}

/// Schema of the content items a filter is compiled against.
///
/// ```json
/// {
///   "root": "Content",
///   "content_types": ["Folder", "File"],
///   "types": {
///     "Content": { "properties": { "Name": "string", "ContentType": "ContentType" } },
///     "ContentType": { "properties": { "Name": "string" } }
///   },
///   "fields": { "Price": "decimal" },
///   "aspects": { "Review": { "Rating": "int" } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Type of the content item itself
    pub root: String,
    /// Content type names that share the root type's members
    #[serde(default)]
    pub content_types: BTreeSet<String>,
    #[serde(default)]
    pub types: BTreeMap<String, TypeSchema>,
    /// Dynamic fields of the root type
    #[serde(default)]
    pub fields: BTreeMap<String, DataType>,
    /// Aspect name to field name to data type
    #[serde(default)]
    pub aspects: BTreeMap<String, BTreeMap<String, DataType>>,
}

impl Default for JsonSchema {
    fn default() -> Self {
        let content = [
            ("Id", DataType::Int32),
            ("Name", DataType::String),
            ("DisplayName", DataType::String),
            ("Path", DataType::String),
            ("Index", DataType::Int32),
            ("CreationDate", DataType::DateTime),
            ("ModificationDate", DataType::DateTime),
            ("ContentType", DataType::Object("ContentType".to_string())),
        ];

        JsonSchema {
            root: "Content".to_string(),
            content_types: ["GenericContent", "Folder", "File"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            types: BTreeMap::new(),
            fields: BTreeMap::new(),
            aspects: BTreeMap::new(),
        }
        .with_type("Content", content)
        .with_type("ContentType", [("Name", DataType::String)])
    }
}

impl JsonSchema {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn with_type<'n>(
        mut self,
        name: &str,
        properties: impl IntoIterator<Item = (&'n str, DataType)>,
    ) -> Self {
        let schema = self.types.entry(name.to_string()).or_default();
        schema.properties.extend(
            properties
                .into_iter()
                .map(|(property, data_type)| (property.to_string(), data_type)),
        );
        self
    }

    pub fn with_field(mut self, name: &str, data_type: DataType) -> Self {
        self.fields.insert(name.to_string(), data_type);
        self
    }

    pub fn with_aspect<'n>(
        mut self,
        name: &str,
        fields: impl IntoIterator<Item = (&'n str, DataType)>,
    ) -> Self {
        let aspect = self.aspects.entry(name.to_string()).or_default();
        aspect.extend(
            fields
                .into_iter()
                .map(|(field, data_type)| (field.to_string(), data_type)),
        );
        self
    }

    pub fn with_content_type(mut self, name: &str) -> Self {
        self.content_types.insert(name.to_string());
        self
    }

    fn declares(&self, name: &str) -> Option<String> {
        if self.types.contains_key(name) {
            return Some(name.to_string());
        }
        if name.eq_ignore_ascii_case(&self.root)
            || self
                .content_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(name))
        {
            return Some(self.root.clone());
        }
        None
    }
}

impl ContentModel for JsonSchema {
    fn root_type(&self) -> &str {
        &self.root
    }

    /// Namespaces are not modelled: `Sys.Folder` resolves like `Folder`.
    fn resolve_type(&self, name: &str) -> Option<String> {
        self.declares(name).or_else(|| {
            name.rsplit_once('.')
                .and_then(|(_, short)| self.declares(short))
        })
    }

    fn static_member(&self, type_name: &str, name: &str) -> Option<DataType> {
        self.types.get(type_name)?.properties.get(name).cloned()
    }

    fn dynamic_field_type(&self, type_name: &str, name: &str) -> Option<DataType> {
        if type_name != self.root {
            return None;
        }
        self.fields.get(name).cloned()
    }
}

impl AspectStore for JsonSchema {
    fn load_aspect_by_name(&self, name: &str) -> Option<AspectDefinition> {
        let fields = self.aspects.get(name)?;
        Some(AspectDefinition {
            name: name.to_string(),
            field_settings: fields
                .iter()
                .map(|(field, data_type)| FieldSetting {
                    name: field.clone(),
                    data_type: data_type.clone(),
                })
                .collect(),
        })
    }
}

/// A content item backed by a JSON object.
///
/// The type name comes from `ContentType.Name`, then `Type`, and defaults to `Content`.
#[derive(Debug, Clone, Copy)]
pub struct JsonContent<'a> {
    object: &'a serde_json::Map<String, serde_json::Value>,
}

impl<'a> JsonContent<'a> {
    pub fn new(object: &'a serde_json::Map<String, serde_json::Value>) -> Self {
        JsonContent { object }
    }

    pub fn object(&self) -> &'a serde_json::Map<String, serde_json::Value> {
        self.object
    }
}

impl Content for JsonContent<'_> {
    fn type_name(&self) -> &str {
        let content_type = self
            .object
            .get("ContentType")
            .and_then(|ct| ct.get("Name"))
            .and_then(serde_json::Value::as_str);
        content_type
            .or_else(|| self.object.get("Type").and_then(serde_json::Value::as_str))
            .unwrap_or("Content")
    }

    fn property(&self, name: &str) -> Option<Value> {
        self.object.get(name).map(json_to_value)
    }

    fn field(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.object.get(name) {
            return Some(json_to_value(value));
        }
        let (aspect, field) = name.split_once('.')?;
        self.object
            .get(aspect)?
            .as_object()?
            .get(field)
            .map(json_to_value)
    }
}

/// Convert a JSON value into a filter value.
///
/// Integers that fit are `int`, other integers `long`, other numbers `double`.
/// Arrays have no filter representation and read as null.
pub fn json_to_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i32::try_from(i).map_or(Value::Int64(i), Value::Int32)
            } else if let Some(f) = n.as_f64() {
                Value::Double(f)
            } else {
                Value::Null
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(_) => Value::Null,
        serde_json::Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect(),
        ),
    }
}
