use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{input_rows, labeled, output_rows};
use crate::ops;
use crate::SectorsPlugin;

pub struct Explode;

impl PluginCommand for Explode {
    type Plugin = SectorsPlugin;

    fn name(&self) -> &str {
        "sectors explode"
    }

    fn description(&self) -> &str {
        "Split a delimited free-text field into one normalized token per row"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::table())
            .named(
                "field",
                SyntaxShape::String,
                "Field to split (default: industries)",
                Some('f'),
            )
            .named("id", SyntaxShape::String, "Id column (default: id)", None)
            .named(
                "delimiter",
                SyntaxShape::String,
                "Regex between phrases; surrounding whitespace is absorbed (default: ,)",
                Some('d'),
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["explode", "split", "tokenize", "industry", "tags"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![Example {
            example: r#"[[id industries]; [1 "Food & Beverage, SaaS"]] | sectors explode"#,
            description: "One row per normalized industry phrase",
            result: None,
        }]
    }

    fn run(
        &self,
        _plugin: &SectorsPlugin,
        _engine: &EngineInterface,
        call: &EvaluatedCall,
        input: PipelineData,
    ) -> Result<PipelineData, LabeledError> {
        let field: String = call
            .get_flag::<String>("field")?
            .unwrap_or_else(|| "industries".into());
        let id: String = call.get_flag::<String>("id")?.unwrap_or_else(|| "id".into());
        let delimiter: String = call
            .get_flag::<String>("delimiter")?
            .unwrap_or_else(|| ",".into());
        let head = call.head;

        let rows = input_rows(input);
        if rows.is_empty() {
            return Ok(output_rows(serde_json::Value::Null, head));
        }
        let out = ops::op_explode(&rows, &id, &field, &delimiter).map_err(labeled)?;
        Ok(output_rows(out, head))
    }
}
