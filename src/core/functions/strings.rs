use crate::errors::ExpressionError;
use crate::types::Value;

use super::{EnvFunction, ParamSignature, ParamType};

pub struct UpperFunction;

impl EnvFunction for UpperFunction {
    fn call(&self, args: Vec<Value>) -> Result<Value, ExpressionError> {
        Ok(Value::String(args[0].to_text().to_uppercase()))
    }

    fn signature(&self) -> (String, Vec<ParamSignature>) {
        let input = ParamSignature::new("input", ParamType::String, "The string to upper-case");
        ("upper".to_string(), vec![input])
    }
}

pub struct LowerFunction;

impl EnvFunction for LowerFunction {
    fn call(&self, args: Vec<Value>) -> Result<Value, ExpressionError> {
        Ok(Value::String(args[0].to_text().to_lowercase()))
    }

    fn signature(&self) -> (String, Vec<ParamSignature>) {
        let input = ParamSignature::new("input", ParamType::String, "The string to lower-case");
        ("lower".to_string(), vec![input])
    }
}
