//! # Operation Factory
//!
//! Turns wire specs (flat JSON objects keyed by `optype`) back into
//! executable operations. Every built-in operation is registered by
//! [`OperationFactory::default`]; embedders may register more.

use crate::errors::FactoryError;
use crate::ops::*;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

pub type OperationConstructor = fn(&Value) -> Result<Box<dyn Operation>, serde_json::Error>;

fn construct<T>(spec: &Value) -> Result<Box<dyn Operation>, serde_json::Error>
where
    T: Operation + DeserializeOwned + 'static,
{
    let op: T = T::deserialize(spec)?;
    Ok(Box::new(op))
}

pub struct OperationFactory {
    constructors: HashMap<String, OperationConstructor>,
}

impl OperationFactory {
    /// Factory without any registered operation.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registers `constructor` for `optype`, replacing any earlier one.
    pub fn register(&mut self, optype: impl Into<String>, constructor: OperationConstructor) {
        self.constructors.insert(optype.into(), constructor);
    }

    pub fn is_registered(&self, optype: &str) -> bool {
        self.constructors.contains_key(optype)
    }

    /// Builds the operation described by `spec`.
    pub fn create(&self, spec: &Value) -> Result<Box<dyn Operation>, FactoryError> {
        let optype = spec
            .get("optype")
            .and_then(Value::as_str)
            .ok_or(FactoryError::MissingOptype)?;
        let constructor = self
            .constructors
            .get(optype)
            .ok_or_else(|| FactoryError::UnknownOperation(optype.to_string()))?;
        constructor(spec).map_err(|source| FactoryError::InvalidSpec {
            optype: optype.to_string(),
            source,
        })
    }
}

impl Default for OperationFactory {
    fn default() -> Self {
        let mut factory = Self::empty();
        factory.register("AddMember", construct::<AddMember>);
        factory.register("UpdateMember", construct::<UpdateMember>);
        factory.register("RemoveMember", construct::<RemoveMember>);
        factory.register("AddCursor", construct::<AddCursor>);
        factory.register("RemoveCursor", construct::<RemoveCursor>);
        factory.register("MoveCursor", construct::<MoveCursor>);
        factory.register("InsertText", construct::<InsertText>);
        factory.register("RemoveText", construct::<RemoveText>);
        factory.register("SplitParagraph", construct::<SplitParagraph>);
        factory.register("MergeParagraph", construct::<MergeParagraph>);
        factory.register("SetParagraphStyle", construct::<SetParagraphStyle>);
        factory.register("AddStyle", construct::<AddStyle>);
        factory.register("RemoveStyle", construct::<RemoveStyle>);
        factory.register("UpdateParagraphStyle", construct::<UpdateParagraphStyle>);
        factory.register("ApplyDirectStyling", construct::<ApplyDirectStyling>);
        factory.register("ApplyHyperlink", construct::<ApplyHyperlink>);
        factory.register("RemoveHyperlink", construct::<RemoveHyperlink>);
        factory.register("AddAnnotation", construct::<AddAnnotation>);
        factory.register("RemoveAnnotation", construct::<RemoveAnnotation>);
        factory.register("InsertImage", construct::<InsertImage>);
        factory.register("SetBlob", construct::<SetBlob>);
        factory.register("RemoveBlob", construct::<RemoveBlob>);
        factory.register("UpdateMetadata", construct::<UpdateMetadata>);
        factory
    }
}
