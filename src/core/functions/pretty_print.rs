use crate::errors::ExpressionError;
use crate::types::Value;

use super::{EnvFunction, ParamSignature, ParamType};

/// `json(value)`: pretty printed JSON of a list or map.
pub struct PrettyPrintFunction;

impl EnvFunction for PrettyPrintFunction {
    fn call(&self, args: Vec<Value>) -> Result<Value, ExpressionError> {
        let pretty_output = serde_json::to_string_pretty(&args[0].to_json())
            .map_err(|e| ExpressionError::Evaluation(format!("json() failed: {}", e)))?;

        Ok(Value::String(pretty_output))
    }

    fn signature(&self) -> (String, Vec<ParamSignature>) {
        let input_param = ParamSignature::new(
            "input",
            ParamType::Any(vec![ParamType::List, ParamType::Map]),
            "The input to pretty print",
        );

        ("json".to_string(), vec![input_param])
    }
}
