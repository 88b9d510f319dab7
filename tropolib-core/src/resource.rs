//! Resource - Representing template resources and their property values

use std::collections::BTreeMap;

use serde_json::json;

/// Pseudo parameters resolved by CloudFormation at deploy time
pub mod pseudo {
    pub const REGION: &str = "AWS::Region";
    pub const ACCOUNT_ID: &str = "AWS::AccountId";
    pub const STACK_NAME: &str = "AWS::StackName";

    /// Returns true if the name refers to a pseudo parameter rather than a resource
    pub fn is_pseudo(name: &str) -> bool {
        name.starts_with("AWS::")
    }
}

/// Property value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// `Ref` to a resource title or pseudo parameter
    Ref(String),
    /// `Fn::GetAtt` (resource title, attribute name)
    GetAtt(String, String),
    /// `Fn::Join` (delimiter, values)
    Join(String, Vec<Value>),
    /// `Fn::Sub` with an inline template string
    Sub(String),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn join(delimiter: impl Into<String>, values: Vec<Value>) -> Self {
        Value::Join(delimiter.into(), values)
    }

    pub fn sub(template: impl Into<String>) -> Self {
        Value::Sub(template.into())
    }

    pub fn region() -> Self {
        Value::Ref(pseudo::REGION.to_string())
    }

    pub fn account_id() -> Self {
        Value::Ref(pseudo::ACCOUNT_ID.to_string())
    }

    pub fn stack_name() -> Self {
        Value::Ref(pseudo::STACK_NAME.to_string())
    }

    /// True for `Ref`, `Fn::GetAtt`, `Fn::Join` and `Fn::Sub`
    pub fn is_intrinsic(&self) -> bool {
        matches!(
            self,
            Value::Ref(_) | Value::GetAtt(_, _) | Value::Join(_, _) | Value::Sub(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Titles of the resources this value points at (pseudo parameters excluded)
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Value::Ref(name) if !pseudo::is_pseudo(name) => refs.push(name),
            Value::GetAtt(name, _) => refs.push(name),
            Value::List(items) | Value::Join(_, items) => {
                for item in items {
                    item.collect_references(refs);
                }
            }
            Value::Map(map) => {
                for value in map.values() {
                    value.collect_references(refs);
                }
            }
            _ => {}
        }
    }

    /// CloudFormation JSON representation
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => json!(s),
            Value::Int(n) => json!(n),
            Value::Bool(b) => json!(b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Ref(name) => json!({ "Ref": name }),
            Value::GetAtt(name, attr) => json!({ "Fn::GetAtt": [name, attr] }),
            Value::Join(delimiter, items) => {
                let items: Vec<serde_json::Value> = items.iter().map(Value::to_json).collect();
                json!({ "Fn::Join": [delimiter, items] })
            }
            Value::Sub(template) => json!({ "Fn::Sub": template }),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// A resource tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn name(value: impl Into<String>) -> Self {
        Self::new("Name", value)
    }

    fn to_value(&self) -> Value {
        Value::Map(BTreeMap::from([
            ("Key".to_string(), Value::String(self.key.clone())),
            ("Value".to_string(), Value::String(self.value.clone())),
        ]))
    }
}

/// A resource declared in a template
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Logical ID inside the template (e.g., "PubRouteTable")
    pub title: String,
    /// CloudFormation type name (e.g., "AWS::EC2::RouteTable")
    pub resource_type: String,
    pub properties: BTreeMap<String, Value>,
    pub metadata: BTreeMap<String, Value>,
    pub depends_on: Vec<String>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            resource_type: resource_type.into(),
            properties: BTreeMap::new(),
            metadata: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Sets the property only when a value is present
    pub fn with_optional_property(
        self,
        key: impl Into<String>,
        value: Option<impl Into<Value>>,
    ) -> Self {
        match value {
            Some(value) => self.with_property(key, value),
            None => self,
        }
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Appends a tag to the `Tags` property
    pub fn with_tag(mut self, tag: Tag) -> Self {
        match self.properties.get_mut("Tags") {
            Some(Value::List(tags)) => tags.push(tag.to_value()),
            _ => {
                self.properties
                    .insert("Tags".to_string(), Value::List(vec![tag.to_value()]));
            }
        }
        self
    }

    pub fn with_name_tag(self, name: impl Into<String>) -> Self {
        self.with_tag(Tag::name(name))
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn depends_on(mut self, title: impl Into<String>) -> Self {
        self.depends_on.push(title.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Value of the `Name` tag, if any
    pub fn name_tag(&self) -> Option<&str> {
        let Some(Value::List(tags)) = self.properties.get("Tags") else {
            return None;
        };
        tags.iter().find_map(|tag| match tag {
            Value::Map(map) if map.get("Key").and_then(Value::as_str) == Some("Name") => {
                map.get("Value").and_then(Value::as_str)
            }
            _ => None,
        })
    }

    /// `Ref` pointing at this resource
    pub fn reference(&self) -> Value {
        Value::Ref(self.title.clone())
    }

    /// `Fn::GetAtt` for one of this resource's attributes
    pub fn get_att(&self, attribute: impl Into<String>) -> Value {
        Value::GetAtt(self.title.clone(), attribute.into())
    }

    /// Titles of the resources this one refers to, in property order
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self
            .properties
            .values()
            .flat_map(|value| value.references())
            .collect();
        refs.extend(self.depends_on.iter().map(String::as_str));
        refs
    }

    /// The resource body as it appears under `Resources`
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert("Type".to_string(), json!(self.resource_type));
        if !self.properties.is_empty() {
            body.insert(
                "Properties".to_string(),
                Value::Map(self.properties.clone()).to_json(),
            );
        }
        if !self.metadata.is_empty() {
            body.insert(
                "Metadata".to_string(),
                Value::Map(self.metadata.clone()).to_json(),
            );
        }
        if !self.depends_on.is_empty() {
            body.insert("DependsOn".to_string(), json!(self.depends_on));
        }
        serde_json::Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intrinsic_functions_render_in_long_form() {
        assert_eq!(
            Value::Ref("MyVpc".to_string()).to_json(),
            json!({ "Ref": "MyVpc" })
        );
        assert_eq!(
            Value::GetAtt("MyVpc".to_string(), "CidrBlock".to_string()).to_json(),
            json!({ "Fn::GetAtt": ["MyVpc", "CidrBlock"] })
        );
        assert_eq!(
            Value::join("/", vec!["integrations".into(), Value::Ref("Int".to_string())])
                .to_json(),
            json!({ "Fn::Join": ["/", ["integrations", { "Ref": "Int" }]] })
        );
        assert_eq!(
            Value::sub("${AWS::StackName}-vpc-id").to_json(),
            json!({ "Fn::Sub": "${AWS::StackName}-vpc-id" })
        );
    }

    #[test]
    fn references_skip_pseudo_parameters() {
        let value = Value::join(
            ":",
            vec![
                Value::region(),
                Value::account_id(),
                Value::Ref("Api".to_string()),
                Value::GetAtt("Eip".to_string(), "AllocationId".to_string()),
            ],
        );
        assert_eq!(value.references(), vec!["Api", "Eip"]);
    }

    #[test]
    fn tags_accumulate_in_order() {
        let resource = Resource::new("AWS::EC2::VPC", "MainVpc")
            .with_name_tag("main")
            .with_tag(Tag::new("Env", "prod"));

        assert_eq!(resource.name_tag(), Some("main"));
        let Some(Value::List(tags)) = resource.property("Tags") else {
            panic!("Tags should be a list");
        };
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn resource_body_omits_empty_sections() {
        let resource = Resource::new("AWS::EC2::InternetGateway", "Igw");
        assert_eq!(resource.to_json(), json!({ "Type": "AWS::EC2::InternetGateway" }));

        let resource = Resource::new("AWS::EC2::Subnet", "Public1")
            .with_property("VpcId", Value::Ref("MainVpc".to_string()))
            .with_metadata("suffix", 1)
            .depends_on("IgwAttachment");
        assert_eq!(
            resource.to_json(),
            json!({
                "Type": "AWS::EC2::Subnet",
                "Properties": { "VpcId": { "Ref": "MainVpc" } },
                "Metadata": { "suffix": 1 },
                "DependsOn": ["IgwAttachment"],
            })
        );
        assert_eq!(resource.references(), vec!["MainVpc", "IgwAttachment"]);
    }

    #[test]
    fn optional_property_is_skipped_when_absent() {
        let resource = Resource::new("AWS::ApiGatewayV2::Api", "ShopHTTPApi")
            .with_optional_property("Description", None::<String>)
            .with_optional_property("Name", Some("shop"));
        assert!(resource.property("Description").is_none());
        assert_eq!(resource.property("Name"), Some(&Value::from("shop")));
    }
}
